//! Cassettes: the stored form of interactions and the engine that plays
//! them back

pub mod codec;
pub mod engine;
pub mod format;
pub mod interaction;
pub mod placeholder;

pub use engine::{Cassette, RECORDED_WITH};
pub use format::{CassetteData, InteractionData, RecordedRequest, RecordedResponse};
pub use interaction::Interaction;
pub use placeholder::Direction;
