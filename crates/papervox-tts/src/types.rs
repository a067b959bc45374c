//! Core types for text-to-speech functionality

use serde::{Deserialize, Serialize};

/// TTS synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Default voice to use
    pub default_voice: Option<String>,
    /// Speaking rate (words per minute, typically 100-300)
    pub speech_rate: Option<u32>,
    /// Voice pitch (0.0-2.0, 1.0 is normal)
    pub pitch: Option<f32>,
    /// Volume (0.0-1.0)
    pub volume: Option<f32>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            default_voice: None,
            speech_rate: Some(180),
            pitch: Some(1.0),
            volume: Some(0.8),
        }
    }
}

/// Per-request overrides for a single synthesis call
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    pub voice: Option<String>,
    pub speech_rate: Option<u32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
}

/// Voice information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Unique voice identifier
    pub id: String,
    /// Human-readable voice name
    pub name: String,
    /// Language code (e.g., "en-US")
    pub language: String,
    /// Gender (if the engine reports one)
    pub gender: Option<VoiceGender>,
}

/// Voice gender categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceGender {
    Male,
    Female,
    Unknown,
}
