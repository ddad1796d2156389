//! Inflation of compressed request bodies (`Content-Encoding`).

use crate::ExtractError;
use bytes::Bytes;
use flate2::read::{GzDecoder, ZlibDecoder};
use http::HeaderMap;
use http::header::CONTENT_ENCODING;
use std::io::Read;
use tracing::warn;

/// The `Content-Encoding` of a request body.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
    Br,
}

impl ContentEncoding {
    /// Reads the encoding from the request headers. With `inflate` off only identity is accepted.
    pub fn from_headers(headers: &HeaderMap, inflate: bool) -> Result<Self, ExtractError> {
        let Some(value) = headers.get(CONTENT_ENCODING) else {
            return Ok(ContentEncoding::Identity);
        };

        let name = value
            .to_str()
            .map_err(|_e| ExtractError::UnsupportedEncoding { encoding: String::from_utf8_lossy(value.as_bytes()).into_owned() })?
            .trim()
            .to_ascii_lowercase();

        let encoding = match name.as_str() {
            "identity" | "" => return Ok(ContentEncoding::Identity),
            "gzip" | "x-gzip" => ContentEncoding::Gzip,
            "deflate" => ContentEncoding::Deflate,
            "br" => ContentEncoding::Br,
            _ => return Err(ExtractError::UnsupportedEncoding { encoding: name }),
        };

        if inflate { Ok(encoding) } else { Err(ExtractError::UnsupportedEncoding { encoding: name }) }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Br => "br",
        }
    }

    /// Decompresses `bytes`, refusing output larger than `limit`.
    pub fn inflate(self, bytes: Bytes, limit: usize) -> Result<Bytes, ExtractError> {
        let reader: Box<dyn Read + '_> = match self {
            ContentEncoding::Identity => return Ok(bytes),
            ContentEncoding::Gzip => Box::new(GzDecoder::new(bytes.as_ref())),
            ContentEncoding::Deflate => Box::new(ZlibDecoder::new(bytes.as_ref())),
            ContentEncoding::Br => Box::new(brotli::Decompressor::new(bytes.as_ref(), 4096)),
        };

        // one byte over the limit is enough to tell
        let mut inflated = Vec::with_capacity(bytes.len().saturating_mul(2).min(limit));
        reader
            .take((limit as u64).saturating_add(1))
            .read_to_end(&mut inflated)
            .map_err(|source| ExtractError::MalformedEncoding { encoding: self.name(), source })?;

        if inflated.len() > limit {
            warn!(limit, encoding = self.name(), "inflated request body exceeds the limit");
            return Err(ExtractError::limit_exceeded(limit));
        }

        Ok(Bytes::from(inflated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use http::HeaderValue;
    use std::io::Write;

    fn headers(encoding: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding));
        headers
    }

    fn gzip(data: &[u8]) -> Bytes {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        Bytes::from(encoder.finish().unwrap())
    }

    #[test]
    fn reads_encoding_header() {
        assert_eq!(ContentEncoding::from_headers(&HeaderMap::new(), true).unwrap(), ContentEncoding::Identity);
        assert_eq!(ContentEncoding::from_headers(&headers("GZIP"), true).unwrap(), ContentEncoding::Gzip);
        assert_eq!(ContentEncoding::from_headers(&headers("br"), true).unwrap(), ContentEncoding::Br);
        assert!(matches!(
            ContentEncoding::from_headers(&headers("zstd"), true),
            Err(ExtractError::UnsupportedEncoding { encoding }) if encoding == "zstd"
        ));
    }

    #[test]
    fn inflate_off_only_accepts_identity() {
        assert_eq!(ContentEncoding::from_headers(&headers("identity"), false).unwrap(), ContentEncoding::Identity);
        assert!(ContentEncoding::from_headers(&headers("gzip"), false).is_err());
    }

    #[test]
    fn inflates_gzip() {
        let body = ContentEncoding::Gzip.inflate(gzip(b"{\"name\":\"John\"}"), 1024).unwrap();
        assert_eq!(body, Bytes::from_static(b"{\"name\":\"John\"}"));
    }

    #[test]
    fn inflates_deflate() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"name=John").unwrap();
        let compressed = Bytes::from(encoder.finish().unwrap());

        assert_eq!(ContentEncoding::Deflate.inflate(compressed, 1024).unwrap(), Bytes::from_static(b"name=John"));
    }

    #[test]
    fn inflates_brotli() {
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
            writer.write_all(b"hello brotli").unwrap();
        }

        let body = ContentEncoding::Br.inflate(Bytes::from(compressed), 1024).unwrap();
        assert_eq!(body, Bytes::from_static(b"hello brotli"));
    }

    #[test]
    fn inflated_size_is_limited() {
        let compressed = gzip(&[b'a'; 4096]);
        assert!(compressed.len() < 100);

        let result = ContentEncoding::Gzip.inflate(compressed, 1000);
        assert!(matches!(result, Err(ExtractError::LimitExceeded { limit: 1000 })));
    }

    #[test]
    fn corrupt_body_is_reported() {
        let result = ContentEncoding::Gzip.inflate(Bytes::from_static(b"definitely not gzip"), 1024);
        assert!(matches!(result, Err(ExtractError::MalformedEncoding { encoding: "gzip", .. })));
    }
}
