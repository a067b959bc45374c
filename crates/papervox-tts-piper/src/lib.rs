//! Piper neural TTS engine implementation for PaperVox.
//!
//! Piper reads text on stdin and writes a WAV file, so `synthesize_to_file`
//! is its native operation. `speak` synthesizes into a temporary WAV and
//! hands it to a player command (`aplay -q` unless configured otherwise),
//! blocking until playback finishes.

use papervox_tts::{
    SynthesisOptions, TtsConfig, TtsEngine, TtsError, TtsResult, VoiceGender, VoiceInfo,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};


/// Environment variable overriding the piper invocation, parsed with shell
/// quoting rules.
pub const PIPER_COMMAND_ENV: &str = "PAPERVOX_PIPER_COMMAND";

const DEFAULT_PLAYER: &[&str] = &["aplay", "-q"];

pub struct PiperEngine {
    config: TtsConfig,
    model_path: PathBuf,
    player_command: Vec<String>,
    is_initialized: bool,
}

impl PiperEngine {
    pub fn new(model_path: PathBuf, player_command: Option<Vec<String>>) -> Self {
        Self {
            config: TtsConfig::default(),
            model_path,
            player_command: player_command
                .filter(|parts| !parts.is_empty())
                .unwrap_or_else(|| DEFAULT_PLAYER.iter().map(|s| s.to_string()).collect()),
            is_initialized: false,
        }
    }

    fn resolve_command() -> Option<Vec<String>> {
        if let Ok(raw) = std::env::var(PIPER_COMMAND_ENV) {
            let parts: Vec<String> = shlex::Shlex::new(&raw).collect();
            if parts.is_empty() {
                warn!("{} is set but empty, ignoring", PIPER_COMMAND_ENV);
            } else {
                return Some(parts);
            }
        }
        Some(vec!["piper".to_string()])
    }

    fn ensure_initialized(&self) -> TtsResult<()> {
        if !self.is_initialized {
            return Err(TtsError::InitializationError(
                "engine not initialized".into(),
            ));
        }
        Ok(())
    }

    /// Maps speaking rate in words per minute onto piper's length scale,
    /// where 1.0 is the model's native pace (~180 wpm).
    fn length_scale(&self, options: &SynthesisOptions) -> Option<f32> {
        options
            .speech_rate
            .or(self.config.speech_rate)
            .filter(|&rate| rate > 0)
            .map(|rate| 180.0 / rate as f32)
    }

    fn run_piper(&self, text: &str, output: &Path, options: &SynthesisOptions) -> TtsResult<()> {
        if !self.model_path.exists() {
            return Err(TtsError::VoiceNotFound(format!(
                "piper voice model not found at {}",
                self.model_path.display()
            )));
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let command = Self::resolve_command()
            .ok_or_else(|| TtsError::EngineNotAvailable("piper command not resolved".into()))?;
        let mut invocation = Command::new(&command[0]);
        invocation
            .args(&command[1..])
            .arg("--model")
            .arg(&self.model_path)
            .arg("--output_file")
            .arg(output);
        if let Some(scale) = self.length_scale(options) {
            invocation.arg("--length_scale").arg(format!("{scale:.2}"));
        }
        debug!(
            "Running piper for model {} writing {}",
            self.model_path.display(),
            output.display()
        );

        let mut child = invocation
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        child
            .stdin
            .as_mut()
            .ok_or_else(|| TtsError::SynthesisError("failed to open piper stdin".into()))?
            .write_all(text.as_bytes())?;
        let result = child.wait_with_output()?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(TtsError::SynthesisError(format!(
                "piper exited with status {}: {}",
                result.status.code().unwrap_or(-1),
                stderr
            )));
        }
        if !output.exists() {
            warn!("piper succeeded but {:?} was not created", output);
        }
        Ok(())
    }

    fn play_file(&self, path: &Path) -> TtsResult<()> {
        let mut invocation = Command::new(&self.player_command[0]);
        invocation.args(&self.player_command[1..]).arg(path);
        let output = invocation
            .output()
            .map_err(|err| TtsError::AudioOutput(format!("failed to launch player: {err}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TtsError::AudioOutput(format!(
                "player exited with status {}: {}",
                output.status.code().unwrap_or(-1),
                stderr
            )));
        }
        Ok(())
    }
}

impl TtsEngine for PiperEngine {
    fn name(&self) -> &str {
        "piper"
    }

    fn initialize(&mut self, config: TtsConfig) -> TtsResult<()> {
        if !self.model_path.exists() {
            return Err(TtsError::VoiceNotFound(format!(
                "piper voice model not found at {}",
                self.model_path.display()
            )));
        }
        self.config = config;
        self.is_initialized = true;
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.model_path.exists()
    }

    fn speak(&mut self, text: &str, options: &SynthesisOptions) -> TtsResult<()> {
        self.ensure_initialized()?;
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text input".into()));
        }
        let scratch = tempfile::Builder::new()
            .prefix("papervox-utterance-")
            .suffix(".wav")
            .tempfile()?;
        self.run_piper(text, scratch.path(), options)?;
        self.play_file(scratch.path())
    }

    fn synthesize_to_file(
        &mut self,
        text: &str,
        output: &Path,
        options: &SynthesisOptions,
    ) -> TtsResult<()> {
        self.ensure_initialized()?;
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text input".into()));
        }
        self.run_piper(text, output, options)
    }

    fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        let id = self
            .model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "piper".to_string());
        Ok(vec![VoiceInfo {
            name: format!("Piper model {id}"),
            id,
            language: "unknown".into(),
            gender: Some(VoiceGender::Unknown),
        }])
    }

    fn set_voice(&mut self, voice_id: &str) -> TtsResult<()> {
        // One loaded model per engine; switching means pointing at a new file.
        let candidate = PathBuf::from(voice_id);
        if !candidate.exists() {
            return Err(TtsError::VoiceNotFound(voice_id.to_string()));
        }
        self.model_path = candidate;
        Ok(())
    }

    fn config(&self) -> &TtsConfig {
        &self.config
    }

    fn shutdown(&mut self) -> TtsResult<()> {
        self.is_initialized = false;
        debug!("piper engine shut down");
        Ok(())
    }
}
