//! One recorded request/response pair

use chrono::NaiveDateTime;

use super::codec;
use super::format::InteractionData;
use super::placeholder::{self, Direction};
use crate::config::Placeholder;
use crate::matchers::BoundMatchers;
use crate::message::{Request, Response};
use crate::Result;

/// A recorded exchange plus its per-session state
///
/// `used`, `ignored` and `fresh` live only in memory and are never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    data: InteractionData,
    used: bool,
    ignored: bool,
    fresh: bool,
}

impl Interaction {
    /// Wrap stored data
    #[must_use]
    pub fn new(data: InteractionData) -> Self {
        Self {
            data,
            used: false,
            ignored: false,
            fresh: false,
        }
    }

    /// Stored data
    #[must_use]
    pub fn data(&self) -> &InteractionData {
        &self.data
    }

    /// Mutable stored data, for hooks
    pub fn data_mut(&mut self) -> &mut InteractionData {
        &mut self.data
    }

    /// Unwrap into the stored data
    #[must_use]
    pub fn into_data(self) -> InteractionData {
        self.data
    }

    /// Exclude this interaction from storage and playback
    pub fn ignore(&mut self) {
        self.ignored = true;
    }

    /// Whether [`ignore`](Self::ignore) was called
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Whether this interaction already satisfied a request
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.used
    }

    pub(crate) fn mark_used(&mut self) {
        self.used = true;
    }

    /// Whether this interaction was recorded by the current session rather
    /// than loaded from storage
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub(crate) fn mark_fresh(&mut self) {
        self.fresh = true;
    }

    /// Whether this interaction may be handed out
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.used && !self.ignored
    }

    /// When the exchange was recorded
    #[must_use]
    pub fn recorded_at(&self) -> NaiveDateTime {
        self.data.recorded_at
    }

    /// Whether every bound matcher accepts the recorded request
    #[must_use]
    pub fn matches(&self, matchers: &BoundMatchers<'_>) -> bool {
        matchers.all_match(&self.data.request)
    }

    /// Replace `text` with `substitute` throughout the stored data
    pub fn replace(&mut self, text: &str, substitute: &str) {
        placeholder::replace(&mut self.data, text, substitute);
    }

    /// Apply placeholders in order
    pub fn replace_all(&mut self, placeholders: &[Placeholder], direction: Direction) {
        placeholder::apply_all(&mut self.data, placeholders, direction);
    }

    /// The recorded request, rebuilt
    ///
    /// # Errors
    ///
    /// Returns error if the stored request is malformed
    pub fn as_request(&self) -> Result<Request> {
        codec::deserialize_request(&self.data.request)
    }

    /// The recorded response, rebuilt with its request attached
    ///
    /// # Errors
    ///
    /// Returns error if the stored request or response is malformed
    pub fn as_response(&self) -> Result<Response> {
        let mut response = codec::deserialize_response(&self.data.response)?;
        response.request = Some(self.as_request()?);
        Ok(response)
    }
}

impl From<InteractionData> for Interaction {
    fn from(data: InteractionData) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::now;
    use crate::matchers::MatcherRegistry;
    use http::{HeaderMap, StatusCode};

    fn recorded(url: &str, body: &'static str) -> Interaction {
        let request = Request::get(url).with_header("authorization", "secret-token").unwrap();
        let response = Response::new(StatusCode::OK, url, HeaderMap::new(), body);

        Interaction::new(InteractionData {
            request: codec::serialize_request(&request, false),
            response: codec::serialize_response(&response, false),
            recorded_at: now(),
        })
    }

    #[test]
    fn test_flags_start_clear() {
        let mut interaction = recorded("https://example.com/", "ok");
        assert!(interaction.is_available());
        assert!(!interaction.is_fresh());

        interaction.mark_used();
        assert!(interaction.is_used());
        assert!(!interaction.is_available());

        let mut other = recorded("https://example.com/", "ok");
        other.ignore();
        assert!(other.is_ignored());
        assert!(!other.is_available());
    }

    #[test]
    fn test_as_response_attaches_request() {
        let interaction = recorded("https://example.com/a", "body");
        let response = interaction.as_response().unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content(), b"body");
        let request = response.request.unwrap();
        assert_eq!(request.url, "https://example.com/a");
        assert_eq!(request.headers["authorization"], "secret-token");
    }

    #[test]
    fn test_matches_with_bound_matchers() {
        let interaction = recorded("https://example.com/a?x=1", "ok");
        let matchers = MatcherRegistry::default()
            .resolve(&["method".to_string(), "uri".to_string()])
            .unwrap();

        let hit = Request::get("https://example.com/a?x=1");
        let miss = Request::get("https://example.com/a?x=2");
        assert!(interaction.matches(&BoundMatchers::new(&hit, &matchers)));
        assert!(!interaction.matches(&BoundMatchers::new(&miss, &matchers)));
    }

    #[test]
    fn test_replace_all_round_trip() {
        let mut interaction = recorded("https://example.com/", "ok");
        let original = interaction.clone();
        let placeholders = [Placeholder::new("<TOKEN>", "secret-token")];

        interaction.replace_all(&placeholders, Direction::Mask);
        assert_eq!(
            interaction.data().request.headers["authorization"],
            vec!["<TOKEN>"]
        );

        interaction.replace_all(&placeholders, Direction::Unmask);
        assert_eq!(interaction, original);
    }

    #[test]
    fn test_replace_single_value() {
        let mut interaction = recorded("https://example.com/", "ok");
        interaction.replace("example.com", "example.org");

        assert_eq!(interaction.data().request.uri, "https://example.org/");
        assert_eq!(interaction.data().response.url, "https://example.org/");
    }
}
