//! Live HTTP request and response values
//!
//! These are what a transport hands to a cassette when recording and what a
//! cassette hands back on playback. Headers use [`http::HeaderMap`], which
//! keeps repeated header names as separate values.

use std::io::{self, Cursor, Read};

use bytes::Bytes;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::{Result, RewindError};

/// An outgoing HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Full URL including the query string
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body, `None` when the request has none
    pub body: Option<Bytes>,
}

impl Request {
    /// Create a request without headers or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Add a header value, keeping existing values of the same name
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::InvalidFormat`] if the name or value is not a
    /// valid header
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RewindError::InvalidFormat(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RewindError::InvalidFormat(format!("header {name}: {e}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Body bytes, empty when there is no body
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }
}

/// Buffered response body exposed as a readable stream
///
/// Replayed bodies are always fully buffered, so they are never chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBody {
    data: Bytes,
    chunked: bool,
}

impl RawBody {
    /// Wrap bytes received from a transport
    pub fn new(data: impl Into<Bytes>, chunked: bool) -> Self {
        Self {
            data: data.into(),
            chunked,
        }
    }

    /// Wrap bytes reconstituted from a cassette
    pub fn buffered(data: impl Into<Bytes>) -> Self {
        Self::new(data, false)
    }

    /// Whether the body arrived with chunked transfer encoding
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// All body bytes
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// A fresh reader over the body
    #[must_use]
    pub fn reader(&self) -> RawBodyReader {
        RawBodyReader {
            cursor: Cursor::new(self.data.clone()),
        }
    }
}

/// Reader returned by [`RawBody::reader`]
#[derive(Debug)]
pub struct RawBodyReader {
    cursor: Cursor<Bytes>,
}

impl Read for RawBodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

/// One cookie set by a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// `Domain` attribute
    pub domain: Option<String>,
    /// `Path` attribute
    pub path: Option<String>,
}

impl Cookie {
    /// Parse a single `Set-Cookie` header value
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            domain: None,
            path: None,
        };

        for attribute in parts {
            let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
            match key.trim().to_ascii_lowercase().as_str() {
                "domain" => cookie.domain = Some(val.trim().trim_start_matches('.').to_string()),
                "path" => cookie.path = Some(val.trim().to_string()),
                _ => {}
            }
        }

        Some(cookie)
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

/// Cookies extracted from responses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Create an empty jar
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store every `Set-Cookie` value from `headers`
    pub fn extract(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let text = String::from_utf8_lossy(value.as_bytes());
            if let Some(cookie) = Cookie::parse(&text) {
                self.insert(cookie);
            }
        }
    }

    /// Insert a cookie, replacing one with the same name, domain and path
    pub fn insert(&mut self, cookie: Cookie) {
        if let Some(existing) = self.cookies.iter_mut().find(|c| c.same_slot(&cookie)) {
            *existing = cookie;
        } else {
            self.cookies.push(cookie);
        }
    }

    /// Merge another jar into this one
    pub fn update(&mut self, other: &Self) {
        for cookie in &other.cookies {
            self.insert(cookie.clone());
        }
    }

    /// Value of the first cookie with this name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Number of cookies
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether the jar is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Iterate over the cookies
    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.iter()
    }
}

/// An HTTP response, either live or reconstituted from a cassette
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Reason phrase as sent by the server
    pub reason: String,
    /// Final URL, after redirects
    pub url: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Text encoding of the body, if known
    pub encoding: Option<String>,
    /// Body stream
    pub raw: RawBody,
    /// Cookies set by this response
    pub cookies: CookieJar,
    /// The request that produced this response
    pub request: Option<Request>,
}

impl Response {
    /// Build a response the way an HTTP client would after reading it off
    /// the wire: encoding from `Content-Type`, cookies from `Set-Cookie`.
    pub fn new(
        status: StatusCode,
        url: impl Into<String>,
        headers: HeaderMap,
        body: impl Into<Bytes>,
    ) -> Self {
        let encoding = encoding_from_headers(&headers);
        let mut cookies = CookieJar::new();
        cookies.extract(&headers);

        Self {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            url: url.into(),
            headers,
            encoding,
            raw: RawBody::new(body, false),
            cookies,
            request: None,
        }
    }

    /// Override the reason phrase
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Body bytes
    #[must_use]
    pub fn content(&self) -> &[u8] {
        self.raw.bytes()
    }

    /// Body decoded as text with the response encoding
    #[must_use]
    pub fn text(&self) -> String {
        crate::cassette::codec::decode_text(self.content(), self.encoding.as_deref())
    }
}

/// Charset from `Content-Type`, falling back to ISO-8859-1 for `text/*`
#[must_use]
pub fn encoding_from_headers(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?;
    let content_type = String::from_utf8_lossy(content_type.as_bytes());
    let mut params = content_type.split(';');
    let mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();

    for param in params {
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("charset") {
                return Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string());
            }
        }
    }

    if mime.starts_with("text/") {
        Some("ISO-8859-1".to_string())
    } else {
        None
    }
}
