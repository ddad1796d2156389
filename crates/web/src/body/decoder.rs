//! Decodes a fully received body according to its media type.

use crate::ExtractError;
use crate::body::{BodyConfig, BodyKind, FormMode, MediaType};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The structured value of a request body.
///
/// Only built from a complete body; an aborted or oversized body never becomes a `ParsedBody`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Form(Map<String, Value>),
    Raw(Bytes),
    /// The request had no body bytes at all.
    Absent,
}

impl ParsedBody {
    pub fn is_absent(&self) -> bool {
        matches!(self, ParsedBody::Absent)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParsedBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&Map<String, Value>> {
        match self {
            ParsedBody::Form(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Bytes> {
        match self {
            ParsedBody::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Body decoding with the options of a [`BodyConfig`].
#[derive(Debug, Copy, Clone)]
pub struct BodyDecoder<'a> {
    config: &'a BodyConfig,
}

impl<'a> BodyDecoder<'a> {
    pub fn new(config: &'a BodyConfig) -> Self {
        Self { config }
    }

    /// Decodes `bytes` with the strategy selected by `media_type`.
    ///
    /// ```
    /// use bytes::Bytes;
    /// use ingest_web::body::{BodyConfig, BodyDecoder, MediaType, ParsedBody};
    /// use http::HeaderValue;
    ///
    /// let config = BodyConfig::default();
    /// let media_type = MediaType::from_header(Some(&HeaderValue::from_static("application/x-www-form-urlencoded")));
    /// let parsed = BodyDecoder::new(&config).decode(&media_type, Bytes::from_static(b"name=John&age=30")).unwrap();
    ///
    /// let form = parsed.as_form().unwrap();
    /// assert_eq!(form["name"], "John");
    /// assert_eq!(form["age"], "30");
    /// ```
    pub fn decode(&self, media_type: &MediaType, bytes: Bytes) -> Result<ParsedBody, ExtractError> {
        if bytes.is_empty() {
            return Ok(ParsedBody::Absent);
        }

        match media_type.kind() {
            BodyKind::Json => {
                media_type.ensure_utf8()?;
                self.decode_json(&bytes).map(ParsedBody::Json)
            }
            BodyKind::Form => {
                media_type.ensure_utf8()?;
                self.decode_form(&bytes).map(ParsedBody::Form)
            }
            BodyKind::Raw => Ok(ParsedBody::Raw(bytes)),
        }
    }

    /// Parses a JSON body; in strict mode a valid document whose root is not an object or
    /// an array is [`ExtractError::UnsupportedJsonRoot`], not malformed.
    pub fn decode_json<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ExtractError> {
        let text = std::str::from_utf8(bytes).map_err(|_e| ExtractError::InvalidUtf8)?;
        let value: Value = serde_json::from_str(text).map_err(|source| ExtractError::MalformedJson { source })?;

        if self.config.strict() {
            ensure_object_or_array(&value)?;
        }

        serde_json::from_value(value).map_err(|source| ExtractError::MalformedJson { source })
    }

    /// Parses a url-encoded body.
    ///
    /// Both modes split parameters alike: empty pieces and parameters with an empty name are
    /// ignored, and a piece without `=` is a name with an empty value. A name given more than
    /// once keeps its last value in simple mode and collects every value into an array in
    /// extended mode, so `a=1&a=2` reads as `a[]=1&a[]=2` there.
    pub fn decode_form<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ExtractError> {
        let text = std::str::from_utf8(bytes).map_err(|_e| ExtractError::InvalidUtf8)?;
        let pairs: Vec<(&str, &str)> = form_pairs(text).collect();

        let limit = self.config.parameter_limit();
        if pairs.len() > limit {
            return Err(ExtractError::TooManyParameters { limit });
        }

        match self.config.form_mode() {
            FormMode::Simple => serde_urlencoded::from_str(&join_pairs(&pairs, false)).map_err(ExtractError::malformed_form),
            FormMode::Extended => serde_qs::from_str(&join_pairs(&pairs, true)).map_err(ExtractError::malformed_form),
        }
    }
}

fn ensure_object_or_array(value: &Value) -> Result<(), ExtractError> {
    let found = match value {
        Value::Object(_) | Value::Array(_) => return Ok(()),
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
    };
    Err(ExtractError::UnsupportedJsonRoot { found })
}

/// Still percent-encoded `(name, value)` pairs of a url-encoded text.
fn form_pairs(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.split('&')
        .filter(|piece| !piece.is_empty())
        .map(|piece| piece.split_once('=').unwrap_or((piece, "")))
        .filter(|(name, _value)| !name.is_empty())
}

/// Joins `pairs` back into a query string; with `collect_repeated` a name that appears more
/// than once and has no trailing `[]` gets one.
fn join_pairs(pairs: &[(&str, &str)], collect_repeated: bool) -> String {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    if collect_repeated {
        for (name, _value) in pairs {
            *occurrences.entry(*name).or_default() += 1;
        }
    }

    let mut joined = String::new();
    for (name, value) in pairs {
        if !joined.is_empty() {
            joined.push('&');
        }
        joined.push_str(name);
        if occurrences.get(name).is_some_and(|&count| count > 1) && !name.ends_with("[]") {
            joined.push_str("[]");
        }
        joined.push('=');
        joined.push_str(value);
    }
    joined
}
