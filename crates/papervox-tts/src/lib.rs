//! Text-to-speech abstraction layer for PaperVox.
//!
//! This crate provides the engine trait, configuration types, and errors
//! shared by the concrete engines, plus the utterance segmentation the
//! playback worker uses as its cancellation checkpoints.

pub mod engine;
pub mod error;
pub mod segment;
pub mod testing;
pub mod types;

pub use engine::{SharedEngine, TtsEngine};
pub use error::{TtsError, TtsResult};
pub use segment::{segment_utterances, Utterance};
pub use types::{SynthesisOptions, TtsConfig, VoiceGender, VoiceInfo};
