//! Conversion between live requests/responses and their stored form

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use http::header::CONTENT_ENCODING;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use tracing::debug;

use super::format::{Body, BodyContent, Headers, RecordedRequest, RecordedResponse, Status};
use crate::message::{CookieJar, RawBody, Request, Response};
use crate::{Result, RewindError};

/// Encoding assumed when none is declared
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Serialize a live request
#[must_use]
pub fn serialize_request(request: &Request, preserve_exact_body_bytes: bool) -> RecordedRequest {
    RecordedRequest {
        method: request.method.as_str().to_string(),
        uri: request.url.clone(),
        headers: headers_to_map(&request.headers),
        body: encode_body(
            request.body_bytes(),
            Some(DEFAULT_ENCODING.to_string()),
            &request.headers,
            preserve_exact_body_bytes,
        ),
    }
}

/// Rebuild a request from its stored form
///
/// # Errors
///
/// Returns error if the method, a header, or a base64 body is malformed
pub fn deserialize_request(recorded: &RecordedRequest) -> Result<Request> {
    let method = Method::from_bytes(recorded.method.as_bytes())
        .map_err(|e| RewindError::InvalidFormat(format!("method {:?}: {e}", recorded.method)))?;

    Ok(Request {
        method,
        url: recorded.uri.clone(),
        headers: map_to_headers(&recorded.headers)?,
        body: Some(Bytes::from(decode_body(&recorded.body)?)),
    })
}

/// Serialize a live response
#[must_use]
pub fn serialize_response(response: &Response, preserve_exact_body_bytes: bool) -> RecordedResponse {
    RecordedResponse {
        status: Status {
            code: response.status.as_u16(),
            message: response.reason.clone(),
        },
        url: response.url.clone(),
        headers: headers_to_map(&response.headers),
        body: encode_body(
            response.content(),
            response.encoding.clone(),
            &response.headers,
            preserve_exact_body_bytes,
        ),
    }
}

/// Rebuild a response from its stored form
///
/// The body is exposed through a buffered, never-chunked [`RawBody`], and
/// cookies are extracted from `Set-Cookie` just as for a live response.
///
/// # Errors
///
/// Returns error if the status code, a header, or a base64 body is malformed
pub fn deserialize_response(recorded: &RecordedResponse) -> Result<Response> {
    let status = StatusCode::from_u16(recorded.status.code).map_err(|e| {
        RewindError::InvalidFormat(format!("status code {}: {e}", recorded.status.code))
    })?;
    let headers = map_to_headers(&recorded.headers)?;
    let body = decode_body(&recorded.body)?;

    let mut cookies = CookieJar::new();
    cookies.extract(&headers);

    Ok(Response {
        status,
        reason: recorded.status.message.clone(),
        url: recorded.url.clone(),
        headers,
        encoding: recorded.body.encoding.clone(),
        raw: RawBody::buffered(body),
        cookies,
        request: None,
    })
}

/// Decoded bytes of a stored body
///
/// # Errors
///
/// Returns error if a base64 body is not valid base64
pub fn decode_body(body: &Body) -> Result<Vec<u8>> {
    match &body.content {
        BodyContent::Text(text) => Ok(encode_text(text, body.encoding.as_deref())),
        BodyContent::Base64(encoded) => BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| RewindError::InvalidFormat(format!("base64 body: {e}"))),
    }
}

fn encode_body(
    bytes: &[u8],
    encoding: Option<String>,
    headers: &HeaderMap,
    preserve_exact_body_bytes: bool,
) -> Body {
    if preserve_exact_body_bytes || is_gzipped(headers) {
        Body::base64(encoding, BASE64.encode(bytes))
    } else {
        let text = decode_text(bytes, encoding.as_deref());
        Body::text(encoding, text)
    }
}

fn is_gzipped(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .any(|value| String::from_utf8_lossy(value.as_bytes()).contains("gzip"))
}

fn is_latin1(encoding: &str) -> bool {
    matches!(
        encoding.to_ascii_lowercase().as_str(),
        "iso-8859-1" | "iso8859-1" | "latin-1" | "latin1" | "l1"
    )
}

/// Decode bytes using `encoding`, replacing anything undecodable
#[must_use]
pub fn decode_text(bytes: &[u8], encoding: Option<&str>) -> String {
    match encoding {
        Some(name) if is_latin1(name) => bytes.iter().map(|&b| char::from(b)).collect(),
        Some(name) if name.eq_ignore_ascii_case("ascii") || name.eq_ignore_ascii_case("us-ascii") => {
            bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { char::REPLACEMENT_CHARACTER })
                .collect()
        }
        Some(name) if !is_utf8(name) => {
            debug!("Unsupported body encoding {name:?}, decoding as utf-8");
            String::from_utf8_lossy(bytes).into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Encode text back into bytes using `encoding`
#[must_use]
pub fn encode_text(text: &str, encoding: Option<&str>) -> Vec<u8> {
    match encoding {
        Some(name) if is_latin1(name) => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect(),
        _ => text.as_bytes().to_vec(),
    }
}

fn is_utf8(encoding: &str) -> bool {
    matches!(encoding.to_ascii_lowercase().as_str(), "utf-8" | "utf8")
}

fn headers_to_map(headers: &HeaderMap) -> Headers {
    let mut map = Headers::new();
    for (name, value) in headers {
        map.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}

fn map_to_headers(map: &Headers) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, values) in map {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RewindError::InvalidFormat(format!("header name {name:?}: {e}")))?;
        for value in values {
            let header_value = HeaderValue::from_bytes(value.as_bytes())
                .map_err(|e| RewindError::InvalidFormat(format!("header {name}: {e}")))?;
            headers.append(header_name.clone(), header_value);
        }
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, SET_COOKIE};
    use proptest::prelude::*;

    fn json_response(body: &'static str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        Response::new(StatusCode::OK, "https://example.com/final", headers, body)
    }

    #[test]
    fn test_serialize_request() {
        let request = Request::get("https://example.com/path?q=1")
            .with_header("user-agent", "my-client/1.0")
            .unwrap()
            .with_header("accept", "application/json")
            .unwrap();

        let recorded = serialize_request(&request, false);
        assert_eq!(recorded.method, "GET");
        assert_eq!(recorded.uri, "https://example.com/path?q=1");
        assert_eq!(recorded.headers["user-agent"], vec!["my-client/1.0"]);
        assert_eq!(
            recorded.body,
            Body::text(Some("utf-8".to_string()), String::new())
        );
    }

    #[test]
    fn test_serialize_response_captures_status_and_url() {
        let response = json_response("{\"ok\":true}").with_reason("Everything Fine");
        let recorded = serialize_response(&response, false);

        assert_eq!(recorded.status.code, 200);
        assert_eq!(recorded.status.message, "Everything Fine");
        assert_eq!(recorded.url, "https://example.com/final");
        assert_eq!(recorded.body.as_text(), Some("{\"ok\":true}"));
        assert_eq!(recorded.body.encoding.as_deref(), Some("utf-8"));
    }

    #[test]
    fn test_preserve_exact_body_bytes_uses_base64() {
        let request = Request::get("https://example.com/").with_body("hello");
        let recorded = serialize_request(&request, true);

        assert_eq!(recorded.body.content, BodyContent::Base64("aGVsbG8=".to_string()));
    }

    #[test]
    fn test_gzip_body_uses_base64() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let compressed: &'static [u8] = &[0x1f, 0x8b, 0x08, 0x00, 0xff];
        let response = Response::new(StatusCode::OK, "https://example.com/", headers, compressed);

        let recorded = serialize_response(&response, false);
        assert!(recorded.body.is_base64());

        let replayed = deserialize_response(&recorded).unwrap();
        assert_eq!(replayed.content(), compressed);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_in_text_mode() {
        let request = Request::get("https://example.com/").with_body(&b"ok\xff"[..]);
        let recorded = serialize_request(&request, false);

        assert_eq!(recorded.body.as_text(), Some("ok\u{fffd}"));
    }

    #[test]
    fn test_repeated_headers_survive() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("first=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("second=2; Path=/"));
        let response = Response::new(StatusCode::OK, "https://example.com/", headers, "");

        let recorded = serialize_response(&response, false);
        assert_eq!(recorded.headers["set-cookie"].len(), 2);

        let replayed = deserialize_response(&recorded).unwrap();
        let values: Vec<_> = replayed.headers.get_all(SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], "first=1; Path=/");
        assert_eq!(values[1], "second=2; Path=/");
        assert_eq!(replayed.cookies.len(), 2);
        assert_eq!(replayed.cookies.get("second"), Some("2"));
    }

    #[test]
    fn test_deserialized_response_is_not_chunked() {
        let mut response = json_response("{}");
        response.raw = RawBody::new("{}", true);

        let replayed = deserialize_response(&serialize_response(&response, false)).unwrap();
        assert!(!replayed.raw.is_chunked());
    }

    #[test]
    fn test_latin1_round_trip() {
        let bytes = [0x63, 0x61, 0x66, 0xe9];
        let text = decode_text(&bytes, Some("ISO-8859-1"));
        assert_eq!(text, "café");
        assert_eq!(encode_text(&text, Some("ISO-8859-1")), bytes);
    }

    #[test]
    fn test_bad_base64_is_an_error() {
        let body = Body::base64(None, "not base64!".to_string());
        assert!(matches!(decode_body(&body), Err(RewindError::InvalidFormat(_))));
    }

    proptest! {
        #[test]
        fn prop_text_body_round_trip(body in ".*", code in 200u16..600) {
            let status = StatusCode::from_u16(code).unwrap();
            let response = Response::new(
                status,
                "https://example.com/r",
                HeaderMap::new(),
                body.clone().into_bytes(),
            );

            let replayed = deserialize_response(&serialize_response(&response, false)).unwrap();
            prop_assert_eq!(replayed.status, status);
            prop_assert_eq!(&replayed.reason, &response.reason);
            prop_assert_eq!(&replayed.url, "https://example.com/r");
            prop_assert_eq!(replayed.content(), body.as_bytes());
        }

        #[test]
        fn prop_exact_bytes_round_trip(body in proptest::collection::vec(any::<u8>(), 0..512)) {
            let request = Request::new(Method::POST, "https://example.com/upload")
                .with_body(body.clone());

            let replayed = deserialize_request(&serialize_request(&request, true)).unwrap();
            prop_assert_eq!(&replayed.method, &Method::POST);
            prop_assert_eq!(replayed.body_bytes(), &body[..]);
        }
    }
}
