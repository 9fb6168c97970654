//! Error types for Rewind

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for Rewind operations
pub type Result<T> = std::result::Result<T, RewindError>;

/// Errors that can occur in Rewind
#[derive(Debug, Error)]
pub enum RewindError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A matcher name that was never registered
    #[error("Unknown request matcher: {0}")]
    UnknownMatcher(String),

    /// A serializer name that was never registered
    #[error("No serializer registered for {0}")]
    UnknownSerializer(String),

    /// Record mode outside of once/all/new_episodes/none
    #[error("Invalid record mode: {0:?}")]
    InvalidRecordMode(String),

    /// Re-record interval that is zero or negative
    #[error("Invalid re-record interval: {0} seconds (must be > 0)")]
    InvalidInterval(i64),

    /// Placeholder entry with an empty token or value
    #[error("Invalid placeholder: {0}")]
    InvalidPlaceholder(String),

    /// Cassette library directory does not exist
    #[error("Configured cassette directory '{}' does not exist - try creating it", .0.display())]
    MissingDirectory(PathBuf),

    /// Playback-only cassette whose file does not exist
    #[error("Cassette file not found: {} (record mode 'none' requires an existing cassette)", .0.display())]
    CassetteNotFound(PathBuf),

    /// No recorded interaction satisfied the request and recording is off
    #[error(
        "A request was made that could not be handled.\n\n\
         A request was made to {url} that could not be found in {cassette_path}.\n\n\
         The settings on the cassette are:\n\n    \
         - record_mode: {record_mode}\n    \
         - match_options: {match_options:?}"
    )]
    UnhandledRequest {
        /// URL of the request that missed
        url: String,
        /// Path of the cassette that was searched
        cassette_path: String,
        /// Record mode in effect
        record_mode: String,
        /// Matchers in effect
        match_options: Vec<String>,
    },

    /// A request arrived while no cassette was in use
    #[error("No cassette was specified or found")]
    NoCassette,

    /// Recorded data could not be turned back into a request or response
    #[error("Invalid recorded data: {0}")]
    InvalidFormat(String),

    /// The underlying transport failed to perform a real request
    #[error("Transport error: {0}")]
    Transport(String),
}
