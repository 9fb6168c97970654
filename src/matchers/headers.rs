//! Headers matcher

use std::collections::BTreeMap;

use super::Matcher;
use crate::cassette::format::RecordedRequest;
use crate::message::Request;

/// Matches when both requests carry the same header names and values
///
/// Names compare case-insensitively. Only the first value of a repeated
/// header takes part in the comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadersMatcher;

type Normalized = BTreeMap<String, String>;

fn live_headers(request: &Request) -> Normalized {
    let mut normalized = Normalized::new();
    for (name, value) in &request.headers {
        normalized
            .entry(name.as_str().to_ascii_lowercase())
            .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    normalized
}

fn recorded_headers(recorded: &RecordedRequest) -> Normalized {
    recorded
        .headers
        .iter()
        .filter_map(|(name, values)| Some((name.to_ascii_lowercase(), values.first()?.clone())))
        .collect()
}

impl Matcher for HeadersMatcher {
    fn name(&self) -> &str {
        "headers"
    }

    fn matches(&self, request: &Request, recorded: &RecordedRequest) -> bool {
        live_headers(request) == recorded_headers(recorded)
    }
}
