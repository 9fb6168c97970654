//! Placeholder substitution over recorded interactions
//!
//! Substitution is literal, applied to every header value, both bodies,
//! the request URI and the response URL. Bodies stored as base64 are left
//! alone: rewriting base64 text would corrupt the bytes it encodes, so
//! secrets inside gzip or exact-bytes bodies are not scrubbed.

use super::format::{BodyContent, Headers, InteractionData};
use crate::config::Placeholder;

/// Which way placeholders are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Writing a cassette: real values become tokens
    Mask,
    /// Reading a cassette: tokens become real values
    Unmask,
}

impl Direction {
    fn serializing(self) -> bool {
        matches!(self, Self::Mask)
    }
}

/// Apply every placeholder, in order, to one interaction
pub fn apply_all(data: &mut InteractionData, placeholders: &[Placeholder], direction: Direction) {
    for placeholder in placeholders {
        let (search, substitute) = placeholder.unpack(direction.serializing());
        replace(data, search, substitute);
    }
}

/// Replace `text` with `substitute` in every substitutable field
pub fn replace(data: &mut InteractionData, text: &str, substitute: &str) {
    if text.is_empty() {
        return;
    }

    replace_in_headers(&mut data.request.headers, text, substitute);
    replace_in_headers(&mut data.response.headers, text, substitute);

    replace_in_body(&mut data.request.body.content, text, substitute);
    replace_in_body(&mut data.response.body.content, text, substitute);

    replace_in_place(&mut data.request.uri, text, substitute);
    replace_in_place(&mut data.response.url, text, substitute);
}

fn replace_in_headers(headers: &mut Headers, text: &str, substitute: &str) {
    for value in headers.values_mut().flatten() {
        replace_in_place(value, text, substitute);
    }
}

fn replace_in_body(content: &mut BodyContent, text: &str, substitute: &str) {
    match content {
        BodyContent::Text(body) => replace_in_place(body, text, substitute),
        BodyContent::Base64(_) => {}
    }
}

fn replace_in_place(target: &mut String, text: &str, substitute: &str) {
    if target.contains(text) {
        *target = target.replace(text, substitute);
    }
}
