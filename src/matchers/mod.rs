//! Request matchers
//!
//! A matcher decides, along one dimension, whether a live request is the
//! same as a recorded one. A cassette requires every matcher named in its
//! options to agree.

mod body;
mod digest_auth;
mod headers;
mod method;
mod uri;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use body::BodyMatcher;
pub use digest_auth::DigestAuthMatcher;
pub use headers::HeadersMatcher;
pub use method::MethodMatcher;
pub use uri::{HostMatcher, PathMatcher, QueryMatcher, UriMatcher};

use crate::cassette::format::RecordedRequest;
use crate::message::Request;
use crate::{Result, RewindError};

/// A named request predicate
pub trait Matcher: Send + Sync {
    /// Name used to select this matcher in `match_requests_on`
    fn name(&self) -> &str;

    /// Whether `request` matches `recorded` along this matcher's dimension
    fn matches(&self, request: &Request, recorded: &RecordedRequest) -> bool;
}

/// Matchers available by name
#[derive(Clone)]
pub struct MatcherRegistry {
    matchers: HashMap<String, Arc<dyn Matcher>>,
}

impl MatcherRegistry {
    /// A registry with no matchers at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            matchers: HashMap::new(),
        }
    }

    /// Register a matcher, replacing any with the same name
    pub fn register(&mut self, matcher: impl Matcher + 'static) {
        self.matchers
            .insert(matcher.name().to_string(), Arc::new(matcher));
    }

    /// Look up a matcher by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Matcher>> {
        self.matchers.get(name).cloned()
    }

    /// Whether a matcher is registered under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.matchers.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.matchers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a list of names into matchers
    ///
    /// # Errors
    ///
    /// Returns error naming the first unregistered matcher
    pub fn resolve(&self, names: &[String]) -> Result<Vec<Arc<dyn Matcher>>> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| RewindError::UnknownMatcher(name.clone()))
            })
            .collect()
    }
}

impl Default for MatcherRegistry {
    /// A registry with every built-in matcher
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(BodyMatcher);
        registry.register(DigestAuthMatcher);
        registry.register(HeadersMatcher);
        registry.register(HostMatcher);
        registry.register(MethodMatcher);
        registry.register(PathMatcher);
        registry.register(QueryMatcher);
        registry.register(UriMatcher);
        registry
    }
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("matchers", &self.names())
            .finish()
    }
}

/// Matchers bound to one live request
pub struct BoundMatchers<'a> {
    request: &'a Request,
    matchers: &'a [Arc<dyn Matcher>],
}

impl<'a> BoundMatchers<'a> {
    /// Bind `matchers` to `request`
    #[must_use]
    pub fn new(request: &'a Request, matchers: &'a [Arc<dyn Matcher>]) -> Self {
        Self { request, matchers }
    }

    /// Whether every matcher accepts `recorded`
    #[must_use]
    pub fn all_match(&self, recorded: &RecordedRequest) -> bool {
        self.matchers
            .iter()
            .all(|matcher| matcher.matches(self.request, recorded))
    }
}
