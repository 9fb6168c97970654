//! Body matcher

use tracing::debug;

use super::Matcher;
use crate::cassette::codec::decode_body;
use crate::cassette::format::RecordedRequest;
use crate::message::Request;

/// Matches on the exact request body bytes
///
/// A missing live body compares equal to an empty recorded one.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyMatcher;

impl Matcher for BodyMatcher {
    fn name(&self) -> &str {
        "body"
    }

    fn matches(&self, request: &Request, recorded: &RecordedRequest) -> bool {
        match decode_body(&recorded.body) {
            Ok(stored) => request.body_bytes() == stored.as_slice(),
            Err(e) => {
                debug!("Recorded body unreadable, treating as mismatch: {}", e);
                false
            }
        }
    }
}
