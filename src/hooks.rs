//! Session hooks
//!
//! Hooks run in registration order. Interaction hooks may mutate the
//! interaction or call [`Interaction::ignore`].

use std::fmt;
use std::sync::Arc;

use crate::cassette::{Cassette, Interaction};

/// Hook run on one interaction
pub type InteractionHook = Arc<dyn Fn(&mut Interaction, &Cassette) + Send + Sync>;

/// Hook run on a whole cassette
pub type CassetteHook = Arc<dyn Fn(&Cassette) + Send + Sync>;

/// Registered hooks, by the point at which they run
#[derive(Clone, Default)]
pub struct Hooks {
    before_record: Vec<InteractionHook>,
    before_playback: Vec<InteractionHook>,
    after_start: Vec<CassetteHook>,
    before_stop: Vec<CassetteHook>,
}

impl Hooks {
    /// No hooks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` on every new interaction before it is stored
    pub fn before_record<F>(&mut self, hook: F)
    where
        F: Fn(&mut Interaction, &Cassette) + Send + Sync + 'static,
    {
        self.before_record.push(Arc::new(hook));
    }

    /// Run `hook` on every interaction loaded from storage, before
    /// placeholders are unmasked
    pub fn before_playback<F>(&mut self, hook: F)
    where
        F: Fn(&mut Interaction, &Cassette) + Send + Sync + 'static,
    {
        self.before_playback.push(Arc::new(hook));
    }

    /// Run `hook` once a cassette is in use
    pub fn after_start<F>(&mut self, hook: F)
    where
        F: Fn(&Cassette) + Send + Sync + 'static,
    {
        self.after_start.push(Arc::new(hook));
    }

    /// Run `hook` just before a cassette is ejected
    pub fn before_stop<F>(&mut self, hook: F)
    where
        F: Fn(&Cassette) + Send + Sync + 'static,
    {
        self.before_stop.push(Arc::new(hook));
    }

    pub(crate) fn run_before_record(&self, interaction: &mut Interaction, cassette: &Cassette) {
        for hook in &self.before_record {
            hook(interaction, cassette);
        }
    }

    pub(crate) fn run_before_playback(&self, interaction: &mut Interaction, cassette: &Cassette) {
        for hook in &self.before_playback {
            hook(interaction, cassette);
        }
    }

    pub(crate) fn run_after_start(&self, cassette: &Cassette) {
        for hook in &self.after_start {
            hook(cassette);
        }
    }

    pub(crate) fn run_before_stop(&self, cassette: &Cassette) {
        for hook in &self.before_stop {
            hook(cassette);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_record", &self.before_record.len())
            .field("before_playback", &self.before_playback.len())
            .field("after_start", &self.after_start.len())
            .field("before_stop", &self.before_stop.len())
            .finish()
    }
}
