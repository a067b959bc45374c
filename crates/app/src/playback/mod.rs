//! Playback: the session state machine, the synthesis worker, and the
//! controller that wires them to the document source, preview renderer, and
//! speech engine.

pub mod controller;
pub mod session;
pub mod worker;

pub use controller::{PlaybackController, PlaybackSettings, StuckProbe};
pub use session::{LoadedDocument, PlaybackSession, PlaybackState};
pub use worker::{PlaybackEvent, SynthesisJob, SynthesisWorker, WorkerId};

use papervox_document::DocumentError;
use papervox_tts::TtsError;
use thiserror::Error;

/// User-visible playback failures. Every variant is recovered where it
/// occurs: the session returns to idle (or, for a failed document load,
/// stays on the previous document) and the application keeps running.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("document is unreadable: {0}")]
    Document(#[from] DocumentError),

    #[error("the document has no readable text")]
    NoReadableText,

    #[error("speech engine failure: {0}")]
    Engine(#[from] TtsError),

    #[error("preview rendering failed for page {page}: {message}")]
    Preview { page: usize, message: String },

    #[error("no document loaded")]
    NothingLoaded,

    #[error("another synthesis is already in progress")]
    Busy,

    #[error("invalid playback transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: PlaybackState,
        to: PlaybackState,
    },
}
