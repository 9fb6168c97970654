//! Binary backend using bincode
//!
//! bincode is not self-describing, so the canonical types, which accept
//! several legacy shapes on read, are mirrored here by plain structs with
//! one fixed layout.

use chrono::{DateTime, NaiveDateTime};

use super::Serializer;
use crate::cassette::format::{
    Body, BodyContent, CassetteData, Headers, InteractionData, RecordedRequest, RecordedResponse,
    Status,
};
use crate::{Result, RewindError};

/// Compact binary cassettes
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredCassette {
    interactions: Vec<StoredInteraction>,
    recorded_with: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredInteraction {
    method: String,
    uri: String,
    request_headers: Vec<(String, Vec<String>)>,
    request_body: StoredBody,
    status: u16,
    reason: String,
    url: String,
    response_headers: Vec<(String, Vec<String>)>,
    response_body: StoredBody,
    recorded_at: i64,
}

#[derive(serde::Serialize, serde::Deserialize)]
enum StoredContent {
    Text(String),
    Base64(String),
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredBody {
    encoding: Option<String>,
    content: StoredContent,
}

impl From<&Body> for StoredBody {
    fn from(body: &Body) -> Self {
        Self {
            encoding: body.encoding.clone(),
            content: match &body.content {
                BodyContent::Text(text) => StoredContent::Text(text.clone()),
                BodyContent::Base64(encoded) => StoredContent::Base64(encoded.clone()),
            },
        }
    }
}

impl From<StoredBody> for Body {
    fn from(stored: StoredBody) -> Self {
        match stored.content {
            StoredContent::Text(text) => Self::text(stored.encoding, text),
            StoredContent::Base64(encoded) => Self::base64(stored.encoding, encoded),
        }
    }
}

fn flatten(headers: &Headers) -> Vec<(String, Vec<String>)> {
    headers
        .iter()
        .map(|(name, values)| (name.clone(), values.clone()))
        .collect()
}

impl From<&InteractionData> for StoredInteraction {
    fn from(data: &InteractionData) -> Self {
        Self {
            method: data.request.method.clone(),
            uri: data.request.uri.clone(),
            request_headers: flatten(&data.request.headers),
            request_body: StoredBody::from(&data.request.body),
            status: data.response.status.code,
            reason: data.response.status.message.clone(),
            url: data.response.url.clone(),
            response_headers: flatten(&data.response.headers),
            response_body: StoredBody::from(&data.response.body),
            recorded_at: data.recorded_at.and_utc().timestamp(),
        }
    }
}

impl TryFrom<StoredInteraction> for InteractionData {
    type Error = RewindError;

    fn try_from(stored: StoredInteraction) -> Result<Self> {
        let recorded_at: NaiveDateTime = DateTime::from_timestamp(stored.recorded_at, 0)
            .ok_or_else(|| {
                RewindError::InvalidFormat(format!("timestamp {} out of range", stored.recorded_at))
            })?
            .naive_utc();

        Ok(Self {
            request: RecordedRequest {
                method: stored.method,
                uri: stored.uri,
                headers: stored.request_headers.into_iter().collect(),
                body: stored.request_body.into(),
            },
            response: RecordedResponse {
                status: Status {
                    code: stored.status,
                    message: stored.reason,
                },
                url: stored.url,
                headers: stored.response_headers.into_iter().collect(),
                body: stored.response_body.into(),
            },
            recorded_at,
        })
    }
}

impl Serializer for BinarySerializer {
    fn name(&self) -> &str {
        "binary"
    }

    fn extension(&self) -> &str {
        "bincode"
    }

    fn stored_as_binary(&self) -> bool {
        true
    }

    fn serialize(&self, data: &CassetteData) -> Result<Vec<u8>> {
        let stored = StoredCassette {
            interactions: data.http_interactions.iter().map(StoredInteraction::from).collect(),
            recorded_with: data.recorded_with.clone(),
        };

        bincode::serde::encode_to_vec(&stored, bincode::config::standard())
            .map_err(|e| RewindError::InvalidFormat(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<CassetteData> {
        let (stored, _): (StoredCassette, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| RewindError::InvalidFormat(e.to_string()))?;

        Ok(CassetteData {
            http_interactions: stored
                .interactions
                .into_iter()
                .map(InteractionData::try_from)
                .collect::<Result<_>>()?,
            recorded_with: stored.recorded_with,
        })
    }
}
