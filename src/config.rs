//! Configuration types for Rewind
//!
//! Options resolve in three layers: the [`Config`] defaults, the
//! [`Recorder`](crate::recorder::Recorder) session overrides, and the
//! overrides passed when a cassette is put in use. Later layers win.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, RewindError};

/// Default directory cassettes are read from and written to
pub const DEFAULT_CASSETTE_LIBRARY_DIR: &str = "vcr/cassettes";

/// Default serializer backend
pub const DEFAULT_SERIALIZER: &str = "json";

/// Record mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// Record a cassette once; replay only after that
    #[default]
    Once,
    /// Re-record every interaction
    All,
    /// Replay what exists and record anything new
    NewEpisodes,
    /// Replay only, never touch the network
    None,
}

impl RecordMode {
    /// Name as it appears in configuration
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::All => "all",
            Self::NewEpisodes => "new_episodes",
            Self::None => "none",
        }
    }

    /// Whether a missing cassette file is acceptable in this mode
    #[must_use]
    pub fn permits_recording(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for RecordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordMode {
    type Err = RewindError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "once" => Ok(Self::Once),
            "all" => Ok(Self::All),
            "new_episodes" => Ok(Self::NewEpisodes),
            "none" => Ok(Self::None),
            other => Err(RewindError::InvalidRecordMode(other.to_string())),
        }
    }
}

/// A reversible substitution: `replace` is the real value, `placeholder`
/// the token written to disk in its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    /// Token stored in the cassette
    pub placeholder: String,
    /// Real value used at runtime
    pub replace: String,
}

impl Placeholder {
    /// Create a placeholder
    pub fn new(placeholder: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            replace: replace.into(),
        }
    }

    /// Returns `(search, substitute)` for the given direction.
    ///
    /// Writing a cassette swaps real values for tokens; reading swaps
    /// tokens back for real values.
    #[must_use]
    pub fn unpack(&self, serializing: bool) -> (&str, &str) {
        if serializing {
            (&self.replace, &self.placeholder)
        } else {
            (&self.placeholder, &self.replace)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.placeholder.is_empty() {
            return Err(RewindError::InvalidPlaceholder(format!(
                "empty placeholder token for value {:?}",
                self.replace
            )));
        }
        if self.replace.is_empty() {
            return Err(RewindError::InvalidPlaceholder(format!(
                "empty replacement for placeholder {:?}",
                self.placeholder
            )));
        }
        Ok(())
    }
}

/// Fully resolved options for one cassette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CassetteOptions {
    /// Record mode
    pub record_mode: RecordMode,
    /// Matchers that must all agree for a recorded request to match
    pub match_requests_on: Vec<String>,
    /// Ordered placeholder substitutions
    pub placeholders: Vec<Placeholder>,
    /// Always store bodies as base64
    pub preserve_exact_body_bytes: bool,
    /// Let one interaction satisfy more than one request
    pub allow_playback_repeats: bool,
    /// Maximum cassette age in seconds before it is wiped and re-recorded
    pub re_record_interval: Option<i64>,
    /// Serializer backend name
    pub serialize_with: String,
}

impl Default for CassetteOptions {
    fn default() -> Self {
        Self {
            record_mode: RecordMode::Once,
            match_requests_on: vec!["method".to_string(), "uri".to_string()],
            placeholders: Vec::new(),
            preserve_exact_body_bytes: false,
            allow_playback_repeats: false,
            re_record_interval: None,
            serialize_with: DEFAULT_SERIALIZER.to_string(),
        }
    }
}

impl CassetteOptions {
    /// Apply a layer of overrides on top of these options
    #[must_use]
    pub fn merged(&self, overrides: &OptionOverrides) -> Self {
        let mut merged = self.clone();

        if let Some(mode) = overrides.record_mode {
            merged.record_mode = mode;
        }
        if let Some(ref matchers) = overrides.match_requests_on {
            merged.match_requests_on.clone_from(matchers);
        }
        if let Some(ref placeholders) = overrides.placeholders {
            merged.placeholders = merge_placeholders(&self.placeholders, placeholders);
        }
        if let Some(preserve) = overrides.preserve_exact_body_bytes {
            merged.preserve_exact_body_bytes = preserve;
        }
        if let Some(repeats) = overrides.allow_playback_repeats {
            merged.allow_playback_repeats = repeats;
        }
        if let Some(interval) = overrides.re_record_interval {
            merged.re_record_interval = Some(interval);
        }
        if let Some(ref serializer) = overrides.serialize_with {
            merged.serialize_with.clone_from(serializer);
        }

        merged
    }

    /// Re-record interval as a duration
    ///
    /// # Errors
    ///
    /// Returns error if the interval is not positive
    pub fn re_record_duration(&self) -> Result<Option<Duration>> {
        match self.re_record_interval {
            None => Ok(None),
            Some(seconds) if seconds > 0 => Ok(Some(Duration::from_secs(seconds.unsigned_abs()))),
            Some(seconds) => Err(RewindError::InvalidInterval(seconds)),
        }
    }

    /// Validate the parts that do not depend on registries
    ///
    /// Matcher and serializer names are checked when a cassette is built,
    /// against the registries in use.
    ///
    /// # Errors
    ///
    /// Returns error if the interval or a placeholder is invalid
    pub fn validate(&self) -> Result<()> {
        self.re_record_duration()?;

        for placeholder in &self.placeholders {
            placeholder.validate()?;
        }

        if self.match_requests_on.is_empty() {
            return Err(RewindError::Config(
                "match_requests_on must name at least one matcher".to_string(),
            ));
        }

        Ok(())
    }
}

/// Defaults first; an override with the same token takes the default's
/// slot, new tokens go at the end.
fn merge_placeholders(defaults: &[Placeholder], overrides: &[Placeholder]) -> Vec<Placeholder> {
    let mut merged: Vec<Placeholder> = defaults
        .iter()
        .map(|default| {
            overrides
                .iter()
                .find(|o| o.placeholder == default.placeholder)
                .unwrap_or(default)
                .clone()
        })
        .collect();

    for placeholder in overrides {
        if !defaults.iter().any(|d| d.placeholder == placeholder.placeholder) {
            merged.push(placeholder.clone());
        }
    }

    merged
}

/// A partial set of cassette options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionOverrides {
    /// Record mode
    pub record_mode: Option<RecordMode>,
    /// Matchers
    pub match_requests_on: Option<Vec<String>>,
    /// Placeholders, merged into the lower layer's list
    pub placeholders: Option<Vec<Placeholder>>,
    /// Preserve exact body bytes
    pub preserve_exact_body_bytes: Option<bool>,
    /// Allow playback repeats
    pub allow_playback_repeats: Option<bool>,
    /// Re-record interval in seconds
    pub re_record_interval: Option<i64>,
    /// Serializer backend name
    pub serialize_with: Option<String>,
}

impl OptionOverrides {
    /// Override the record mode
    #[must_use]
    pub fn record_mode(mut self, mode: RecordMode) -> Self {
        self.record_mode = Some(mode);
        self
    }

    /// Override the matchers
    #[must_use]
    pub fn match_requests_on<I, S>(mut self, matchers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_requests_on = Some(matchers.into_iter().map(Into::into).collect());
        self
    }

    /// Add a placeholder
    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>, replace: impl Into<String>) -> Self {
        self.placeholders
            .get_or_insert_with(Vec::new)
            .push(Placeholder::new(placeholder, replace));
        self
    }

    /// Override body byte preservation
    #[must_use]
    pub fn preserve_exact_body_bytes(mut self, preserve: bool) -> Self {
        self.preserve_exact_body_bytes = Some(preserve);
        self
    }

    /// Override playback repeats
    #[must_use]
    pub fn allow_playback_repeats(mut self, allow: bool) -> Self {
        self.allow_playback_repeats = Some(allow);
        self
    }

    /// Override the re-record interval
    #[must_use]
    pub fn re_record_interval(mut self, seconds: i64) -> Self {
        self.re_record_interval = Some(seconds);
        self
    }

    /// Override the serializer
    #[must_use]
    pub fn serialize_with(mut self, name: impl Into<String>) -> Self {
        self.serialize_with = Some(name.into());
        self
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory for storing/loading cassettes
    #[serde(default = "default_library_dir")]
    pub cassette_library_dir: PathBuf,
    /// Options every cassette starts from
    #[serde(default)]
    pub default_cassette_options: CassetteOptions,
}

fn default_library_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CASSETTE_LIBRARY_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cassette_library_dir: default_library_dir(),
            default_cassette_options: CassetteOptions::default(),
        }
    }
}

impl Config {
    /// Configuration rooted at a cassette directory
    #[must_use]
    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cassette_library_dir: dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RewindError::Config(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| RewindError::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Define a placeholder on the default options
    pub fn define_cassette_placeholder(
        &mut self,
        placeholder: impl Into<String>,
        replace: impl Into<String>,
    ) {
        self.default_cassette_options
            .placeholders
            .push(Placeholder::new(placeholder, replace));
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.cassette_library_dir.as_os_str().is_empty() {
            return Err(RewindError::Config(
                "cassette_library_dir cannot be empty".to_string(),
            ));
        }

        self.default_cassette_options.validate()
    }
}
