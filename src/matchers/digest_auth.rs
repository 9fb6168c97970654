//! Digest authentication matcher

use http::header::AUTHORIZATION;

use super::Matcher;
use crate::cassette::format::RecordedRequest;
use crate::message::Request;

/// Parameters that change on every digest exchange
const VOLATILE_PARAMS: [&str; 2] = ["cnonce", "response"];

/// Matches the stable parts of a `Digest` `Authorization` header
///
/// `cnonce` and `response` are ignored since a client generates them fresh
/// for every request. Two requests without the header match.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestAuthMatcher;

fn digest_parts(header: Option<&str>) -> Option<Vec<String>> {
    let header = header?.trim();
    let params = header
        .strip_prefix("Digest ")
        .or_else(|| header.strip_prefix("digest "))
        .unwrap_or(header);

    Some(
        params
            .split(", ")
            .map(str::trim)
            .filter(|part| {
                let key = part.split('=').next().unwrap_or_default();
                !VOLATILE_PARAMS.contains(&key)
            })
            .map(str::to_string)
            .collect(),
    )
}

impl Matcher for DigestAuthMatcher {
    fn name(&self) -> &str {
        "digest-auth"
    }

    fn matches(&self, request: &Request, recorded: &RecordedRequest) -> bool {
        let live = request
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let stored = recorded
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION.as_str()))
            .and_then(|(_, values)| values.first())
            .map(String::as_str);

        digest_parts(live) == digest_parts(stored)
    }
}
