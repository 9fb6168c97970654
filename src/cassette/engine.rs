//! Cassette: interactions for one named recording and the record-mode rules

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::codec;
use super::format::{self, CassetteData, InteractionData};
use super::interaction::Interaction;
use super::placeholder::Direction;
use crate::config::{CassetteOptions, RecordMode};
use crate::hooks::Hooks;
use crate::matchers::{BoundMatchers, Matcher, MatcherRegistry};
use crate::message::{Request, Response};
use crate::recorder::Transport;
use crate::serializers::{SerializerProxy, SerializerRegistry};
use crate::{Result, RewindError};

/// Value written to `recorded_with`
pub const RECORDED_WITH: &str = concat!("rewind/", env!("CARGO_PKG_VERSION"));

/// A named, persisted collection of interactions
pub struct Cassette {
    name: String,
    options: CassetteOptions,
    serializer: SerializerProxy,
    matchers: Vec<Arc<dyn Matcher>>,
    hooks: Hooks,
    interactions: Vec<Interaction>,
    loaded_empty: bool,
}

impl Cassette {
    /// Whether a cassette can be opened with `record_mode`
    ///
    /// Modes that record accept a missing file; `none` requires one.
    ///
    /// # Errors
    ///
    /// Returns error if `serialize_with` is not registered
    pub fn can_be_loaded(
        library_dir: &Path,
        name: &str,
        serialize_with: &str,
        record_mode: RecordMode,
        serializers: &SerializerRegistry,
    ) -> Result<bool> {
        let path = serializers
            .get(serialize_with)?
            .cassette_path(library_dir, name);
        Ok(record_mode.permits_recording() || path.exists())
    }

    /// Open the cassette `name` in `library_dir`
    ///
    /// Stored interactions are passed through `before_playback` hooks and
    /// then unmasked. A cassette older than `re_record_interval` is wiped
    /// first.
    ///
    /// # Errors
    ///
    /// Returns error if the options are invalid, a matcher or serializer
    /// is not registered, or the library directory does not exist
    pub fn load(
        name: &str,
        library_dir: &Path,
        options: CassetteOptions,
        matchers: &MatcherRegistry,
        serializers: &SerializerRegistry,
        hooks: Hooks,
    ) -> Result<Self> {
        options.validate()?;
        let bound = matchers.resolve(&options.match_requests_on)?;
        let serializer =
            SerializerProxy::find(serializers, &options.serialize_with, library_dir, name)?;

        let data = serializer.deserialize()?;
        let mut cassette = Self {
            name: name.to_string(),
            loaded_empty: data.is_empty(),
            interactions: data.http_interactions.into_iter().map(Interaction::new).collect(),
            options,
            serializer,
            matchers: bound,
            hooks,
        };

        cassette.expire_if_stale()?;
        cassette.prepare_for_playback();
        cassette
            .serializer
            .set_allow_serialization(cassette.is_recording());

        info!(
            "Loaded cassette {} ({} interactions, record mode {})",
            cassette.path().display(),
            cassette.interactions.len(),
            cassette.options.record_mode
        );
        Ok(cassette)
    }

    fn expire_if_stale(&mut self) -> Result<()> {
        let Some(interval) = self.options.re_record_duration()? else {
            return Ok(());
        };
        let Some(earliest) = self.earliest_recorded_date() else {
            return Ok(());
        };

        let age = format::now() - earliest;
        let stale = chrono::Duration::from_std(interval).map_or(false, |limit| age > limit);
        if stale {
            info!(
                "Cassette {} recorded at {} is older than {}s, re-recording",
                self.name,
                earliest.format(format::TIMESTAMP_FORMAT),
                interval.as_secs()
            );
            self.interactions.clear();
            self.loaded_empty = true;
        }
        Ok(())
    }

    fn prepare_for_playback(&mut self) {
        let hooks = self.hooks.clone();
        let placeholders = self.options.placeholders.clone();

        for index in 0..self.interactions.len() {
            let mut interaction = self.interactions[index].clone();
            hooks.run_before_playback(&mut interaction, self);
            interaction.replace_all(&placeholders, Direction::Unmask);
            self.interactions[index] = interaction;
        }
    }

    /// Cassette name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the cassette file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.serializer.path()
    }

    /// Resolved options
    #[must_use]
    pub fn options(&self) -> &CassetteOptions {
        &self.options
    }

    /// Record mode
    #[must_use]
    pub fn record_mode(&self) -> RecordMode {
        self.options.record_mode
    }

    /// Names of the matchers in effect
    #[must_use]
    pub fn match_options(&self) -> &[String] {
        &self.options.match_requests_on
    }

    /// Interactions in recording order
    #[must_use]
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Whether the cassette held no interactions when it was loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded_empty
    }

    /// Whether unmatched requests are sent and recorded
    ///
    /// Fixed for the cassette's lifetime: `none` never records, `once`
    /// records only if the cassette was loaded empty, other modes always do.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        match self.options.record_mode {
            RecordMode::None => false,
            RecordMode::Once => self.loaded_empty,
            RecordMode::All | RecordMode::NewEpisodes => true,
        }
    }

    /// Timestamp of the oldest interaction
    #[must_use]
    pub fn earliest_recorded_date(&self) -> Option<NaiveDateTime> {
        self.interactions.iter().map(Interaction::recorded_at).min()
    }

    /// Claim the first available interaction matching `request`
    ///
    /// In `all` mode a stored match is removed instead, so it can be
    /// recorded again, and `None` is returned. Interactions recorded in
    /// this session are never candidates there. Otherwise the match is
    /// marked used unless playback repeats are allowed.
    pub fn find_match(&mut self, request: &Request) -> Option<&Interaction> {
        let rerecord = self.options.record_mode == RecordMode::All;
        let bound = BoundMatchers::new(request, &self.matchers);
        let index = self.interactions.iter().position(|interaction| {
            interaction.is_available()
                && !(rerecord && interaction.is_fresh())
                && interaction.matches(&bound)
        })?;

        if rerecord {
            debug!(
                "Dropping interaction {} for {} {} to re-record it",
                index, request.method, request.url
            );
            self.interactions.remove(index);
            return None;
        }

        debug!("Matched {} {} to interaction {}", request.method, request.url, index);
        let interaction = &mut self.interactions[index];
        if !self.options.allow_playback_repeats {
            interaction.mark_used();
        }
        Some(interaction)
    }

    /// Store a live exchange
    ///
    /// `before_record` hooks run first; if one ignores the interaction it
    /// is dropped and `None` is returned.
    pub fn save_interaction(&mut self, response: &Response, request: &Request) -> Option<&Interaction> {
        let preserve = self.options.preserve_exact_body_bytes;
        let mut interaction = Interaction::new(InteractionData {
            request: codec::serialize_request(request, preserve),
            response: codec::serialize_response(response, preserve),
            recorded_at: format::now(),
        });

        let hooks = self.hooks.clone();
        hooks.run_before_record(&mut interaction, self);

        if interaction.is_ignored() {
            debug!("Interaction for {} {} ignored by hook", request.method, request.url);
            return None;
        }

        debug!("Recorded {} {}", request.method, request.url);
        interaction.mark_fresh();
        self.interactions.push(interaction);
        self.interactions.last()
    }

    /// Answer `request` from the cassette, recording through `transport`
    /// when nothing matches and recording is allowed
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::UnhandledRequest`] when nothing matches and
    /// the cassette is not recording, or any transport or data error
    pub fn play(&mut self, request: &Request, transport: &mut dyn Transport) -> Result<Response> {
        if let Some(interaction) = self.find_match(request) {
            return interaction.as_response();
        }

        if !self.is_recording() {
            warn!("No recorded interaction for {} {}", request.method, request.url);
            return Err(self.unhandled(request));
        }

        let response = transport.send(request)?;
        match self.save_interaction(&response, request) {
            Some(interaction) => interaction.as_response(),
            None => Ok(response),
        }
    }

    fn unhandled(&self, request: &Request) -> RewindError {
        RewindError::UnhandledRequest {
            url: request.url.clone(),
            cassette_path: self.path().display().to_string(),
            record_mode: self.options.record_mode.to_string(),
            match_options: self.options.match_requests_on.clone(),
        }
    }

    /// Wipe every interaction and save the empty cassette
    ///
    /// # Errors
    ///
    /// Returns error if the cassette cannot be written
    pub fn clear(&mut self) -> Result<()> {
        info!("Clearing cassette {}", self.name);
        self.interactions.clear();
        self.save()
    }

    /// Save and release the cassette
    ///
    /// # Errors
    ///
    /// Returns error if the cassette cannot be written
    pub fn eject(self) -> Result<()> {
        self.save()?;
        info!(
            "Ejected cassette {} ({} interactions)",
            self.path().display(),
            self.interactions.len()
        );
        Ok(())
    }

    /// Masked copy of the interactions, as written on eject
    #[must_use]
    pub fn to_data(&self) -> CassetteData {
        let http_interactions = self
            .interactions
            .iter()
            .map(|interaction| {
                let mut interaction = interaction.clone();
                interaction.replace_all(&self.options.placeholders, Direction::Mask);
                interaction.into_data()
            })
            .collect();

        CassetteData {
            http_interactions,
            recorded_with: RECORDED_WITH.to_string(),
        }
    }

    fn save(&self) -> Result<()> {
        self.serializer.serialize(&self.to_data())
    }
}

impl std::fmt::Debug for Cassette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cassette")
            .field("name", &self.name)
            .field("serializer", &self.serializer)
            .field("options", &self.options)
            .field("interactions", &self.interactions.len())
            .field("loaded_empty", &self.loaded_empty)
            .finish_non_exhaustive()
    }
}
