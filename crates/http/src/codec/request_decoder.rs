//! Request decoding: a head, then the body's payload items.

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::warn;

/// Decodes a stream of requests.
///
/// While `payload_decoder` is `None` the decoder looks for the next request head;
/// after a head with a body it yields that body's chunks until the end signal.
#[derive(Debug, Default)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
    received: u64,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(PayloadItem::Chunk(bytes)) => {
                    self.received += bytes.len() as u64;
                    Some(Message::Payload(PayloadItem::Chunk(bytes)))
                }
                Some(PayloadItem::Eof) => {
                    self.payload_decoder = None;
                    Some(Message::Payload(PayloadItem::Eof))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode(src)? {
            Some((header, payload_size)) => {
                // a request without body has nothing to stream, its head is the whole message
                if !payload_size.is_empty() {
                    self.payload_decoder = Some(payload_size.into());
                    self.received = 0;
                }
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }

        if self.payload_decoder.is_some() {
            warn!(received = self.received, "peer closed the connection in the middle of a request body");
            self.payload_decoder = None;
            return Err(ParseError::connection_aborted(self.received));
        }

        if src.is_empty() {
            Ok(None)
        } else {
            Err(ParseError::invalid_header("connection closed in the middle of a request header"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn head_then_chunks_then_eof() {
        let mut src = BytesMut::from("POST /user HTTP/1.1\r\nContent-Length: 9\r\n\r\nname=");
        let mut decoder = RequestDecoder::new();

        let Some(Message::Header((header, payload_size))) = decoder.decode(&mut src).unwrap() else {
            panic!("expect request header");
        };
        assert_eq!(header.path(), "/user");
        assert_eq!(payload_size, PayloadSize::Length(9));

        let item = decoder.decode(&mut src).unwrap().and_then(Message::into_payload_item).unwrap();
        assert_eq!(item, PayloadItem::Chunk(Bytes::from_static(b"name=")));
        assert!(decoder.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(b"John");
        let item = decoder.decode(&mut src).unwrap().and_then(Message::into_payload_item).unwrap();
        assert_eq!(item, PayloadItem::Chunk(Bytes::from_static(b"John")));

        let item = decoder.decode(&mut src).unwrap().and_then(Message::into_payload_item).unwrap();
        assert!(item.is_eof());
    }

    #[test]
    fn bodyless_request_is_only_a_head() {
        let mut src = BytesMut::from("GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n");
        let mut decoder = RequestDecoder::new();

        for path in ["/a", "/b"] {
            match decoder.decode(&mut src).unwrap() {
                Some(Message::Header((header, _))) => assert_eq!(header.path(), path),
                _ => panic!("expect request header"),
            }
        }
        assert!(decoder.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn eof_inside_body_is_an_abort() {
        let mut src = BytesMut::from("POST /user HTTP/1.1\r\nContent-Length: 24\r\n\r\n{\"name\":");
        let mut decoder = RequestDecoder::new();

        assert!(decoder.decode(&mut src).unwrap().is_some_and(|m| m.is_header()));
        assert!(decoder.decode(&mut src).unwrap().is_some_and(|m| m.is_payload()));

        let result = decoder.decode_eof(&mut src);
        assert!(matches!(result, Err(ParseError::ConnectionAborted { received: 8 })));
    }

    #[test]
    fn eof_between_requests_is_clean() {
        let mut src = BytesMut::new();
        assert!(RequestDecoder::new().decode_eof(&mut src).unwrap().is_none());
    }
}
