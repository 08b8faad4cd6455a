//! `application/x-www-form-urlencoded` parsing.
//!
//! Parsing is strict: malformed percent escapes and `;` separators are
//! errors rather than being passed through, so a handler can answer
//! `400 Bad Request` instead of acting on half-decoded input.

use http::header::CONTENT_TYPE;
use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::request::Request;

/// Largest body [`Form::parse`] accepts.
pub const MAX_FORM_BODY: usize = 10 << 20;

const URLENCODED: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("request has no content type")]
    MissingContentType,

    #[error("unsupported content type `{0}`")]
    UnsupportedContentType(String),

    #[error("form body exceeds {MAX_FORM_BODY} bytes")]
    TooLarge,

    #[error("invalid percent escape in `{0}`")]
    InvalidEscape(String),

    #[error("invalid semicolon separator")]
    Semicolon,

    #[error("form value is not valid UTF-8")]
    InvalidUtf8,
}

/// Decoded form fields in arrival order: body fields first, then query
/// fields. A key may appear more than once.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Form {
    pairs: Vec<(String, String)>,
}

impl Form {
    pub(crate) fn parse(req: &Request) -> Result<Self, FormError> {
        let mut pairs = Vec::new();

        if carries_form_body(req.method()) {
            check_content_type(req)?;
            if req.body().len() > MAX_FORM_BODY {
                return Err(FormError::TooLarge);
            }
            let body = std::str::from_utf8(req.body()).map_err(|_| FormError::InvalidUtf8)?;
            decode_into(body, &mut pairs)?;
        }

        if let Some(query) = req.query() {
            decode_into(query, &mut pairs)?;
        }

        Ok(Self { pairs })
    }

    /// First value for `key`. Body values shadow query values.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Form::get), but an absent key reads as `""`.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

fn carries_form_body(method: &http::Method) -> bool {
    matches!(*method, http::Method::POST | http::Method::PUT | http::Method::PATCH)
}

fn check_content_type(req: &Request) -> Result<(), FormError> {
    let raw = req.headers().get(CONTENT_TYPE).ok_or(FormError::MissingContentType)?;
    let raw = raw
        .to_str()
        .map_err(|_| {
            FormError::UnsupportedContentType(String::from_utf8_lossy(raw.as_bytes()).into_owned())
        })?;
    let essence = raw.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case(URLENCODED) {
        Ok(())
    } else {
        Err(FormError::UnsupportedContentType(essence.to_owned()))
    }
}

fn decode_into(input: &str, out: &mut Vec<(String, String)>) -> Result<(), FormError> {
    for pair in input.split('&') {
        if pair.contains(';') {
            return Err(FormError::Semicolon);
        }
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        out.push((decode(key)?, decode(value)?));
    }
    Ok(())
}

fn decode(raw: &str) -> Result<String, FormError> {
    validate_escapes(raw)?;
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| FormError::InvalidUtf8)
}

fn validate_escapes(raw: &str) -> Result<(), FormError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !valid {
                return Err(FormError::InvalidEscape(raw.to_owned()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
