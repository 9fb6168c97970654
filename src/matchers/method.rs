//! Method matcher

use super::Matcher;
use crate::cassette::format::RecordedRequest;
use crate::message::Request;

/// Matches on the exact HTTP method
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodMatcher;

impl Matcher for MethodMatcher {
    fn name(&self) -> &str {
        "method"
    }

    fn matches(&self, request: &Request, recorded: &RecordedRequest) -> bool {
        request.method.as_str() == recorded.method
    }
}
