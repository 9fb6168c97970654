//! Cassette data structures
//!
//! This is the storage-neutral shape of a cassette. Older cassettes wrote
//! scalar header values, a bare `status_code`, and plain-string bodies;
//! those shapes are accepted on read and normalized here, so everything
//! downstream sees only the current shape. Writers always emit the current
//! shape.

use chrono::{NaiveDateTime, Timelike, Utc};
use http::StatusCode;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Format of `recorded_at`: ISO-8601, seconds precision, no timezone
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Header name to every value sent under that name
pub type Headers = IndexMap<String, Vec<String>>;

/// The whole contents of a cassette file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CassetteData {
    /// Recorded interactions, in recording order
    #[serde(default)]
    pub http_interactions: Vec<InteractionData>,
    /// Library and version that wrote the file
    #[serde(default)]
    pub recorded_with: String,
}

impl CassetteData {
    /// Whether the cassette holds no interactions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.http_interactions.is_empty()
    }
}

/// One recorded exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    /// The request as sent
    pub request: RecordedRequest,
    /// The response as received
    pub response: RecordedResponse,
    /// When the exchange was recorded (UTC)
    #[serde(with = "timestamp")]
    pub recorded_at: NaiveDateTime,
}

/// A serialized request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Full URI including the query string
    pub uri: String,
    /// Headers
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub headers: Headers,
    /// Body
    #[serde(default)]
    pub body: Body,
}

/// Status line of a recorded response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Status code
    pub code: u16,
    /// Reason phrase
    pub message: String,
}

impl Status {
    /// Status for a code whose reason phrase was not recorded
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        Self {
            code,
            message: reason_for(code),
        }
    }
}

/// A serialized response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireResponse")]
pub struct RecordedResponse {
    /// Status code and reason
    pub status: Status,
    /// Final URL after redirects
    pub url: String,
    /// Headers
    pub headers: Headers,
    /// Body
    pub body: Body,
}

/// Stored body content: text or base64, fixed when first serialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyContent {
    /// Decoded text, stored under `string`
    Text(String),
    /// Raw bytes as base64, stored under `base64_string`
    Base64(String),
}

/// A serialized request or response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// Declared text encoding
    pub encoding: Option<String>,
    /// Content
    pub content: BodyContent,
}

impl Default for Body {
    fn default() -> Self {
        Self::text(Some("utf-8".to_string()), String::new())
    }
}

impl Body {
    /// Text body
    #[must_use]
    pub fn text(encoding: Option<String>, text: String) -> Self {
        Self {
            encoding,
            content: BodyContent::Text(text),
        }
    }

    /// Base64 body
    #[must_use]
    pub fn base64(encoding: Option<String>, encoded: String) -> Self {
        Self {
            encoding,
            content: BodyContent::Base64(encoded),
        }
    }

    /// Text content, `None` when stored as base64
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            BodyContent::Text(text) => Some(text),
            BodyContent::Base64(_) => None,
        }
    }

    /// Whether the body is stored as base64
    #[must_use]
    pub fn is_base64(&self) -> bool {
        matches!(self.content, BodyContent::Base64(_))
    }
}

#[derive(Serialize)]
struct BodyRepr<'a> {
    encoding: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    string: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base64_string: Option<&'a str>,
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (string, base64_string) = match &self.content {
            BodyContent::Text(text) => (Some(text.as_str()), None),
            BodyContent::Base64(encoded) => (None, Some(encoded.as_str())),
        };

        BodyRepr {
            encoding: &self.encoding,
            string,
            base64_string,
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireBody {
    Current {
        #[serde(default)]
        encoding: Option<String>,
        #[serde(default)]
        string: Option<String>,
        #[serde(default)]
        base64_string: Option<String>,
    },
    Bare(String),
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireBody::deserialize(deserializer)? {
            WireBody::Current {
                encoding,
                base64_string: Some(encoded),
                ..
            } => Self::base64(encoding, encoded),
            WireBody::Current {
                encoding, string, ..
            } => Self::text(encoding, string.unwrap_or_default()),
            WireBody::Bare(text) => Self::text(None, text),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireHeaderValue {
    Many(Vec<String>),
    One(String),
}

fn deserialize_headers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Headers, D::Error> {
    let wire = IndexMap::<String, WireHeaderValue>::deserialize(deserializer)?;
    Ok(wire
        .into_iter()
        .map(|(name, value)| match value {
            WireHeaderValue::Many(values) => (name, values),
            WireHeaderValue::One(value) => (name, vec![value]),
        })
        .collect())
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    status: Option<Status>,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    url: String,
    #[serde(default, deserialize_with = "deserialize_headers")]
    headers: Headers,
    #[serde(default)]
    body: Body,
}

impl TryFrom<WireResponse> for RecordedResponse {
    type Error = String;

    fn try_from(wire: WireResponse) -> Result<Self, Self::Error> {
        let status = match (wire.status, wire.status_code) {
            (Some(status), _) => status,
            (None, Some(code)) => Status::from_code(code),
            (None, None) => return Err("response has neither status nor status_code".to_string()),
        };

        Ok(Self {
            status,
            url: wire.url,
            headers: wire.headers,
            body: wire.body,
        })
    }
}

/// Reason phrase for a bare status code, in the upper snake case style of
/// old cassettes (`404` becomes `NOT_FOUND`).
#[must_use]
pub fn reason_for(code: u16) -> String {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .map(|reason| reason.to_uppercase().replace([' ', '-'], "_"))
        .unwrap_or_default()
}

/// Current UTC time truncated to whole seconds
#[must_use]
pub fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        // Older writers kept fractional seconds
        let trimmed = text.split('.').next().unwrap_or(&text);
        NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn current_interaction() -> serde_json::Value {
        json!({
            "request": {
                "method": "GET",
                "uri": "https://example.com/path?q=1",
                "headers": {"User-Agent": ["my-client/1.0"]},
                "body": {"encoding": "utf-8", "string": ""}
            },
            "response": {
                "status": {"code": 200, "message": "OK"},
                "url": "https://example.com/path?q=1",
                "headers": {"Set-Cookie": ["a=1", "b=2"]},
                "body": {"encoding": "utf-8", "string": "{\"ok\":true}"}
            },
            "recorded_at": "2013-08-31T00:00:00"
        })
    }

    #[test]
    fn test_parse_current_shape() {
        let data: InteractionData = serde_json::from_value(current_interaction()).unwrap();

        assert_eq!(data.request.method, "GET");
        assert_eq!(data.response.status, Status { code: 200, message: "OK".to_string() });
        assert_eq!(data.response.headers["Set-Cookie"], vec!["a=1", "b=2"]);
        assert_eq!(data.response.body.as_text(), Some("{\"ok\":true}"));
        assert_eq!(data.recorded_at.format(TIMESTAMP_FORMAT).to_string(), "2013-08-31T00:00:00");
    }

    #[test]
    fn test_writes_current_shape() {
        let data: InteractionData = serde_json::from_value(current_interaction()).unwrap();
        assert_eq!(serde_json::to_value(&data).unwrap(), current_interaction());
    }

    #[test]
    fn test_parse_legacy_shapes() {
        let legacy = json!({
            "request": {
                "method": "POST",
                "uri": "http://example.com/",
                "headers": {"Accept": "*/*"},
                "body": "a=b"
            },
            "response": {
                "status_code": 404,
                "url": "http://example.com/",
                "headers": {"Content-Type": "text/plain"},
                "body": {"encoding": null, "string": "missing"}
            },
            "recorded_at": "2013-08-31T00:00:00.123456"
        });

        let data: InteractionData = serde_json::from_value(legacy).unwrap();
        assert_eq!(data.request.headers["Accept"], vec!["*/*"]);
        assert_eq!(data.request.body, Body::text(None, "a=b".to_string()));
        assert_eq!(data.response.status.code, 404);
        assert_eq!(data.response.status.message, "NOT_FOUND");
        assert_eq!(data.response.headers["Content-Type"], vec!["text/plain"]);
    }

    #[test]
    fn test_base64_body_round_trips_its_shape() {
        let body: Body =
            serde_json::from_value(json!({"encoding": null, "base64_string": "AAEC"})).unwrap();
        assert!(body.is_base64());
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"encoding": null, "base64_string": "AAEC"})
        );
    }

    #[test]
    fn test_response_without_status_is_rejected() {
        let mut value = current_interaction();
        value["response"].as_object_mut().unwrap().remove("status");
        assert!(serde_json::from_value::<InteractionData>(value).is_err());
    }

    #[test]
    fn test_reason_for() {
        assert_eq!(reason_for(200), "OK");
        assert_eq!(reason_for(404), "NOT_FOUND");
        assert_eq!(reason_for(999), "");
    }
}
