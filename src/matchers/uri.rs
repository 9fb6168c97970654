//! URI, host, path and query matchers

use std::collections::HashMap;

use url::Url;

use super::Matcher;
use crate::cassette::format::RecordedRequest;
use crate::message::Request;

/// Components of a URI the matchers compare
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct UriParts {
    scheme: String,
    netloc: String,
    path: String,
    query: String,
    fragment: String,
}

impl UriParts {
    fn parse(uri: &str) -> Self {
        match Url::parse(uri) {
            Ok(url) => Self::from_url(&url, has_explicit_port(uri)),
            // Not absolute: treat the whole thing as a path plus query
            Err(_) => {
                let (rest, fragment) = uri.split_once('#').unwrap_or((uri, ""));
                let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
                Self {
                    path: path.to_string(),
                    query: query.to_string(),
                    fragment: fragment.to_string(),
                    ..Self::default()
                }
            }
        }
    }

    fn from_url(url: &Url, explicit_port: bool) -> Self {
        let mut netloc = String::new();
        if !url.username().is_empty() {
            netloc.push_str(url.username());
            if let Some(password) = url.password() {
                netloc.push(':');
                netloc.push_str(password);
            }
            netloc.push('@');
        }
        netloc.push_str(url.host_str().unwrap_or_default());
        // `Url` drops a scheme's default port, but `:443` written out is
        // still part of the authority
        let port = if explicit_port {
            url.port_or_known_default()
        } else {
            url.port()
        };
        if let Some(port) = port {
            netloc.push(':');
            netloc.push_str(&port.to_string());
        }

        Self {
            scheme: url.scheme().to_string(),
            netloc,
            path: url.path().to_string(),
            query: url.query().unwrap_or_default().to_string(),
            fragment: url.fragment().unwrap_or_default().to_string(),
        }
    }
}

/// Whether the authority of `uri` carries a `:port`
fn has_explicit_port(uri: &str) -> bool {
    let Some((_, rest)) = uri.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    host_port
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

/// Parse a query string into key to values, keeping blank values
fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
    let mut parsed: HashMap<String, Vec<String>> = HashMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        parsed
            .entry(decode_component(key))
            .or_default()
            .push(decode_component(value));
    }
    parsed
}

fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced).map_or_else(
        |_| String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned(),
        |decoded| decoded.into_owned(),
    )
}

/// Matches scheme, host, path and fragment exactly, and the query
/// regardless of parameter order
#[derive(Debug, Clone, Copy, Default)]
pub struct UriMatcher;

impl Matcher for UriMatcher {
    fn name(&self) -> &str {
        "uri"
    }

    fn matches(&self, request: &Request, recorded: &RecordedRequest) -> bool {
        let live = UriParts::parse(&request.url);
        let stored = UriParts::parse(&recorded.uri);

        live.scheme == stored.scheme
            && live.netloc == stored.netloc
            && live.path == stored.path
            && live.fragment == stored.fragment
            && QueryMatcher.matches(request, recorded)
    }
}

/// Matches on `host[:port]` only
#[derive(Debug, Clone, Copy, Default)]
pub struct HostMatcher;

impl Matcher for HostMatcher {
    fn name(&self) -> &str {
        "host"
    }

    fn matches(&self, request: &Request, recorded: &RecordedRequest) -> bool {
        UriParts::parse(&request.url).netloc == UriParts::parse(&recorded.uri).netloc
    }
}

/// Matches on the path only
#[derive(Debug, Clone, Copy, Default)]
pub struct PathMatcher;

impl Matcher for PathMatcher {
    fn name(&self) -> &str {
        "path"
    }

    fn matches(&self, request: &Request, recorded: &RecordedRequest) -> bool {
        UriParts::parse(&request.url).path == UriParts::parse(&recorded.uri).path
    }
}

/// Matches query parameters, ignoring their order
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryMatcher;

impl Matcher for QueryMatcher {
    fn name(&self) -> &str {
        "query"
    }

    fn matches(&self, request: &Request, recorded: &RecordedRequest) -> bool {
        let live = UriParts::parse(&request.url);
        let stored = UriParts::parse(&recorded.uri);
        parse_query(&live.query) == parse_query(&stored.query)
    }
}
