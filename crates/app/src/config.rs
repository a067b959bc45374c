//! Application configuration.
//!
//! Settings come from an optional `papervox.toml`, with CLI flags layered on
//! top. Engine binaries can additionally be overridden per engine through
//! their `PAPERVOX_*_COMMAND` environment variables.

use crate::playback::PlaybackSettings;
use clap::ValueEnum;
use papervox_foundation::AppError;
use papervox_tts::TtsConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Local formant synthesis through espeak/espeak-ng
    Espeak,
    /// Neural synthesis through a Piper voice model
    Piper,
}

/// How much text one playback run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReadingScope {
    /// The currently previewed page
    Page,
    /// The whole document
    Document,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PapervoxConfig {
    pub engine: EngineKind,
    pub voice: Option<String>,
    /// Speaking rate in words per minute
    pub speech_rate: Option<u32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub scope: ReadingScope,
    /// Audio file written by `convert`, overwritten on each run
    pub output_path: PathBuf,
    pub preview_dir: PathBuf,
    pub preview_max_width: u32,
    pub preview_max_height: u32,
    /// Upper bound on one utterance; also the pause-granularity knob
    pub max_utterance_chars: usize,
    /// How long the synthesis worker may go silent before it is reported stuck
    pub stuck_timeout_secs: u64,
    pub piper: PiperSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PiperSettings {
    pub model_path: PathBuf,
    /// Command used to play synthesized WAV files, e.g. ["aplay", "-q"]
    pub player_command: Option<Vec<String>>,
}

impl Default for PiperSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("voices/default.onnx"),
            player_command: None,
        }
    }
}

impl Default for PapervoxConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Espeak,
            voice: None,
            speech_rate: None,
            pitch: None,
            volume: None,
            scope: ReadingScope::Page,
            output_path: PathBuf::from("output/audiobook.wav"),
            preview_dir: PathBuf::from("runtime/previews"),
            preview_max_width: 300,
            preview_max_height: 200,
            max_utterance_chars: 400,
            stuck_timeout_secs: 30,
            piper: PiperSettings::default(),
        }
    }
}

impl PapervoxConfig {
    /// Loads `path` if given, otherwise `papervox.toml` in the working
    /// directory if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new("papervox.toml");
                if fallback.exists() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("cannot read {}: {err}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|err| AppError::Config(format!("cannot parse {}: {err}", path.display())))
    }

    pub fn apply_cli(
        &mut self,
        engine: Option<EngineKind>,
        voice: Option<String>,
        rate: Option<u32>,
        scope: Option<ReadingScope>,
        output: Option<PathBuf>,
    ) {
        if let Some(engine) = engine {
            self.engine = engine;
        }
        if let Some(voice) = voice {
            self.voice = Some(voice);
        }
        if let Some(rate) = rate {
            self.speech_rate = Some(rate);
        }
        if let Some(scope) = scope {
            self.scope = scope;
        }
        if let Some(output) = output {
            self.output_path = output;
        }
    }

    pub fn tts_config(&self) -> TtsConfig {
        let defaults = TtsConfig::default();
        TtsConfig {
            default_voice: self.voice.clone(),
            speech_rate: self.speech_rate.or(defaults.speech_rate),
            pitch: self.pitch.or(defaults.pitch),
            volume: self.volume.or(defaults.volume),
        }
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            scope: self.scope,
            options: Default::default(),
            max_utterance_chars: self.max_utterance_chars,
            preview_dir: self.preview_dir.clone(),
            preview_max_width: self.preview_max_width,
            preview_max_height: self.preview_max_height,
            output_path: self.output_path.clone(),
            stuck_timeout: Duration::from_secs(self.stuck_timeout_secs),
        }
    }
}
