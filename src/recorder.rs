//! Recording sessions
//!
//! A [`Recorder`] wraps the transport that performs real HTTP requests.
//! While a cassette is in use every request goes through it: recorded
//! interactions are replayed, anything else is sent and recorded when the
//! record mode allows.

use tracing::{debug, warn};

use crate::cassette::Cassette;
use crate::config::{Config, OptionOverrides};
use crate::hooks::Hooks;
use crate::matchers::{Matcher, MatcherRegistry};
use crate::message::{CookieJar, Request, Response};
use crate::serializers::{Serializer, SerializerRegistry};
use crate::{Result, RewindError};

/// Performs real HTTP requests
pub trait Transport {
    /// Send `request` over the network
    ///
    /// # Errors
    ///
    /// Returns error if the request could not be completed
    fn send(&mut self, request: &Request) -> Result<Response>;
}

impl<F> Transport for F
where
    F: FnMut(&Request) -> Result<Response>,
{
    fn send(&mut self, request: &Request) -> Result<Response> {
        self(request)
    }
}

/// A recording session over one transport
pub struct Recorder<T> {
    config: Config,
    overrides: OptionOverrides,
    matchers: MatcherRegistry,
    serializers: SerializerRegistry,
    hooks: Hooks,
    transport: T,
    cassette: Option<Cassette>,
    cookies: CookieJar,
}

impl<T: Transport> Recorder<T> {
    /// Create a recorder with the built-in matchers and serializers
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(config: Config, transport: T) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            overrides: OptionOverrides::default(),
            matchers: MatcherRegistry::default(),
            serializers: SerializerRegistry::default(),
            hooks: Hooks::new(),
            transport,
            cassette: None,
            cookies: CookieJar::new(),
        })
    }

    /// Options applied to every cassette this recorder opens, on top of
    /// the configuration defaults
    #[must_use]
    pub fn with_options(mut self, overrides: OptionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Make a matcher selectable by name
    pub fn register_matcher(&mut self, matcher: impl Matcher + 'static) {
        debug!("Registering matcher {}", matcher.name());
        self.matchers.register(matcher);
    }

    /// Make a serializer selectable by name
    pub fn register_serializer(&mut self, serializer: impl Serializer + 'static) {
        debug!("Registering serializer {}", serializer.name());
        self.serializers.register(serializer);
    }

    /// Hooks for cassettes opened after this call
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// The wrapped transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The wrapped transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Put the cassette `name` in use, ejecting any current one
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::CassetteNotFound`] for a playback-only
    /// cassette that does not exist, or any configuration error
    pub fn use_cassette(&mut self, name: &str, overrides: &OptionOverrides) -> Result<&mut Cassette> {
        self.stop()?;

        let options = self
            .config
            .default_cassette_options
            .merged(&self.overrides)
            .merged(overrides);
        let library_dir = &self.config.cassette_library_dir;

        if !Cassette::can_be_loaded(
            library_dir,
            name,
            &options.serialize_with,
            options.record_mode,
            &self.serializers,
        )? {
            let path = self
                .serializers
                .get(&options.serialize_with)?
                .cassette_path(library_dir, name);
            return Err(RewindError::CassetteNotFound(path));
        }

        let cassette = Cassette::load(
            name,
            library_dir,
            options,
            &self.matchers,
            &self.serializers,
            self.hooks.clone(),
        )?;
        self.hooks.run_after_start(&cassette);

        Ok(self.cassette.insert(cassette))
    }

    /// The cassette in use
    #[must_use]
    pub fn current_cassette(&self) -> Option<&Cassette> {
        self.cassette.as_ref()
    }

    /// Cookies set by every response this recorder returned, replayed or
    /// live
    #[must_use]
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Answer `request` through the cassette in use
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::NoCassette`] when no cassette is in use, or
    /// whatever the cassette reports
    pub fn send(&mut self, request: &Request) -> Result<Response> {
        let cassette = self.cassette.as_mut().ok_or(RewindError::NoCassette)?;
        let response = cassette.play(request, &mut self.transport)?;
        self.cookies.update(&response.cookies);
        Ok(response)
    }

    /// Eject the cassette in use, if any
    ///
    /// # Errors
    ///
    /// Returns error if the cassette cannot be written
    pub fn stop(&mut self) -> Result<()> {
        if let Some(cassette) = self.cassette.take() {
            self.hooks.run_before_stop(&cassette);
            cassette.eject()?;
        }
        Ok(())
    }
}

impl<T> Drop for Recorder<T> {
    fn drop(&mut self) {
        if let Some(cassette) = self.cassette.take() {
            self.hooks.run_before_stop(&cassette);
            if let Err(e) = cassette.eject() {
                warn!("Failed to save cassette on drop: {}", e);
            }
        }
    }
}

impl<T> std::fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("config", &self.config)
            .field("matchers", &self.matchers)
            .field("serializers", &self.serializers)
            .field("hooks", &self.hooks)
            .field("cassette", &self.cassette)
            .finish_non_exhaustive()
    }
}
