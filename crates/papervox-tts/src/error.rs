//! Error types for TTS functionality

use thiserror::Error;

/// TTS error types
#[derive(Error, Debug)]
pub enum TtsError {
    /// Engine binary is not installed or not on PATH
    #[error("TTS engine not available: {0}")]
    EngineNotAvailable(String),

    /// Engine initialization failed
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// A synthesis call failed
    #[error("Synthesis failed: {0}")]
    SynthesisError(String),

    /// Synthesized audio could not be played through the output device
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Voice or voice model not found
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    /// Invalid text input
    #[error("Invalid text input: {0}")]
    InvalidInput(String),

    /// IO error (file operations, process spawning)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for TTS operations
pub type TtsResult<T> = Result<T, TtsError>;
