//! Rewind - record and replay HTTP interactions
//!
//! Requests made through a [`Recorder`] are answered from a cassette file
//! when a recorded interaction matches, and sent over the real transport
//! and recorded otherwise, depending on the cassette's record mode.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::multiple_crate_versions
)]

pub mod cassette;
pub mod config;
pub mod error;
pub mod hooks;
pub mod matchers;
pub mod message;
pub mod recorder;
pub mod serializers;

pub use cassette::{Cassette, Interaction};
pub use config::{CassetteOptions, Config, OptionOverrides, Placeholder, RecordMode};
pub use error::{Result, RewindError};
pub use hooks::Hooks;
pub use message::{Request, Response};
pub use recorder::{Recorder, Transport};
