//! eSpeak TTS engine implementation for PaperVox

use papervox_tts::{
    SynthesisOptions, TtsConfig, TtsEngine, TtsError, TtsResult, VoiceGender, VoiceInfo,
};
use regex::Regex;
use std::path::Path;
use std::process::{Command, Output};
use tracing::{debug, warn};

mod tests;

/// Environment variable overriding the espeak invocation, parsed with shell
/// quoting rules. Used by tests to substitute a stub script and by users
/// whose binary lives outside PATH.
pub const ESPEAK_COMMAND_ENV: &str = "PAPERVOX_ESPEAK_COMMAND";

pub struct EspeakEngine {
    config: TtsConfig,
    current_voice: Option<String>,
    available_voices: Vec<VoiceInfo>,
    command: Option<Vec<String>>,
    is_initialized: bool,
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EspeakEngine {
    pub fn new() -> Self {
        Self {
            config: TtsConfig::default(),
            current_voice: None,
            available_voices: Vec::new(),
            command: None,
            is_initialized: false,
        }
    }

    /// Resolve the espeak invocation: env override first, then `espeak`,
    /// then `espeak-ng`.
    fn resolve_command() -> Option<Vec<String>> {
        if let Ok(raw) = std::env::var(ESPEAK_COMMAND_ENV) {
            let parts: Vec<String> = shlex::Shlex::new(&raw).collect();
            if parts.is_empty() {
                warn!("{} is set but empty, ignoring", ESPEAK_COMMAND_ENV);
            } else {
                return Some(parts);
            }
        }
        for candidate in ["espeak", "espeak-ng"] {
            if Command::new(candidate).arg("--version").output().is_ok() {
                return Some(vec![candidate.to_string()]);
            }
        }
        None
    }

    fn run(&self, args: &[String], text: Option<&str>) -> TtsResult<Output> {
        let command = self
            .command
            .as_ref()
            .ok_or_else(|| TtsError::EngineNotAvailable("espeak command not resolved".into()))?;
        let mut invocation = Command::new(&command[0]);
        invocation.args(&command[1..]).args(args);
        if let Some(text) = text {
            invocation.arg(text);
        }
        debug!("Running espeak: {:?} {:?}", command, args);
        let output = invocation.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TtsError::SynthesisError(format!(
                "espeak exited with status {}: {}",
                output.status.code().unwrap_or(-1),
                stderr
            )));
        }
        Ok(output)
    }

    fn build_args(&self, options: &SynthesisOptions) -> Vec<String> {
        let mut args = Vec::new();

        let voice = options
            .voice
            .as_ref()
            .or(self.current_voice.as_ref())
            .or(self.config.default_voice.as_ref());
        if let Some(voice_id) = voice {
            args.push("-v".to_string());
            args.push(voice_id.clone());
        }

        let rate = options
            .speech_rate
            .or(self.config.speech_rate)
            .unwrap_or(180);
        args.push("-s".to_string());
        args.push(rate.to_string());

        let pitch = options.pitch.or(self.config.pitch).unwrap_or(1.0);
        // espeak pitch range is 0-99 with 50 as neutral.
        let pitch_value = ((pitch * 50.0) as u32).min(99);
        args.push("-p".to_string());
        args.push(pitch_value.to_string());

        let volume = options.volume.or(self.config.volume).unwrap_or(0.8);
        // espeak amplitude range is 0-200 with 100 as neutral.
        let volume_value = ((volume * 125.0) as u32).min(200);
        args.push("-a".to_string());
        args.push(volume_value.to_string());

        args
    }

    /// Parse `espeak --voices` output.
    ///
    /// Format: `Pty Language Age/Gender VoiceName File Other`, e.g.
    /// `5  en             M  en                 (en 2)`.
    fn parse_voice_list(output: &str) -> Vec<VoiceInfo> {
        let voice_regex = Regex::new(r"^\s*\d+\s+([\w-]+)\s+([MF-])\s+([\w\-+_]+)").unwrap();
        let mut voices = Vec::new();
        for line in output.lines().skip(1) {
            let Some(captures) = voice_regex.captures(line) else {
                continue;
            };
            let language = captures[1].to_string();
            let gender = match &captures[2] {
                "M" => Some(VoiceGender::Male),
                "F" => Some(VoiceGender::Female),
                _ => Some(VoiceGender::Unknown),
            };
            let id = captures[3].to_string();
            voices.push(VoiceInfo {
                name: format!("{} ({})", language, id),
                id,
                language,
                gender,
            });
        }
        voices
    }

    fn ensure_initialized(&self) -> TtsResult<()> {
        if !self.is_initialized {
            return Err(TtsError::InitializationError(
                "engine not initialized".into(),
            ));
        }
        Ok(())
    }

    fn check_text(text: &str) -> TtsResult<()> {
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text input".into()));
        }
        Ok(())
    }
}

impl TtsEngine for EspeakEngine {
    fn name(&self) -> &str {
        "espeak"
    }

    fn initialize(&mut self, config: TtsConfig) -> TtsResult<()> {
        let command = Self::resolve_command().ok_or_else(|| {
            TtsError::EngineNotAvailable(
                "espeak not found; install espeak or espeak-ng".to_string(),
            )
        })?;
        self.command = Some(command);
        self.config = config;
        self.is_initialized = true;

        match self.run(&["--voices".to_string()], None) {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                self.available_voices = Self::parse_voice_list(&stdout);
                debug!("Loaded {} espeak voices", self.available_voices.len());
            }
            Err(err) => {
                // A missing voice listing is not fatal; synthesis can still work.
                warn!("Failed to list espeak voices: {}", err);
                self.available_voices.clear();
            }
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        Self::resolve_command().is_some()
    }

    fn speak(&mut self, text: &str, options: &SynthesisOptions) -> TtsResult<()> {
        self.ensure_initialized()?;
        Self::check_text(text)?;
        let args = self.build_args(options);
        self.run(&args, Some(text)).map(|_| ())
    }

    fn synthesize_to_file(
        &mut self,
        text: &str,
        output: &Path,
        options: &SynthesisOptions,
    ) -> TtsResult<()> {
        self.ensure_initialized()?;
        Self::check_text(text)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut args = self.build_args(options);
        args.push("-w".to_string());
        args.push(output.to_string_lossy().into_owned());
        self.run(&args, Some(text))?;
        if !output.exists() {
            warn!("espeak succeeded but {:?} was not created", output);
        }
        Ok(())
    }

    fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        self.ensure_initialized()?;
        Ok(self.available_voices.clone())
    }

    fn set_voice(&mut self, voice_id: &str) -> TtsResult<()> {
        if !self.available_voices.is_empty()
            && !self.available_voices.iter().any(|v| v.id == voice_id)
        {
            return Err(TtsError::VoiceNotFound(voice_id.to_string()));
        }
        self.current_voice = Some(voice_id.to_string());
        Ok(())
    }

    fn config(&self) -> &TtsConfig {
        &self.config
    }

    fn shutdown(&mut self) -> TtsResult<()> {
        self.is_initialized = false;
        self.current_voice = None;
        self.available_voices.clear();
        debug!("espeak engine shut down");
        Ok(())
    }
}
