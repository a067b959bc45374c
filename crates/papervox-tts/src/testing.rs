//! A scripted in-memory engine for exercising playback logic in tests.
//!
//! The engine records every call and can be gated so that `speak` blocks
//! until the test hands out a permit, which makes pause/resume timing
//! deterministic without sleeping.

use crate::engine::TtsEngine;
use crate::error::{TtsError, TtsResult};
use crate::types::{SynthesisOptions, TtsConfig, VoiceGender, VoiceInfo};
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Default)]
struct ScriptState {
    spoken: Vec<String>,
    synthesized: Vec<(String, PathBuf)>,
    gated: bool,
    permits: usize,
    fail_next: bool,
}

struct Shared {
    state: Mutex<ScriptState>,
    released: Condvar,
}

/// Test-side view of a [`ScriptedEngine`].
#[derive(Clone)]
pub struct ScriptedHandle {
    shared: Arc<Shared>,
}

impl ScriptedHandle {
    /// Utterances spoken so far, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.shared.state.lock().spoken.clone()
    }

    /// (text, output path) pairs passed to `synthesize_to_file`.
    pub fn synthesized(&self) -> Vec<(String, PathBuf)> {
        self.shared.state.lock().synthesized.clone()
    }

    /// Allow `n` further gated `speak` calls to proceed.
    pub fn release(&self, n: usize) {
        let mut state = self.shared.state.lock();
        state.permits += n;
        self.shared.released.notify_all();
    }

    /// Disable gating entirely; all pending and future calls proceed.
    pub fn release_all(&self) {
        let mut state = self.shared.state.lock();
        state.gated = false;
        self.shared.released.notify_all();
    }

    /// Make the next synthesis call fail with `SynthesisError`.
    pub fn fail_next_call(&self) {
        self.shared.state.lock().fail_next = true;
    }
}

pub struct ScriptedEngine {
    shared: Arc<Shared>,
    config: TtsConfig,
    voice: Option<String>,
}

impl ScriptedEngine {
    /// An engine whose synthesis calls complete immediately.
    pub fn new() -> (Self, ScriptedHandle) {
        Self::build(false)
    }

    /// An engine whose `speak` calls block until the handle releases them.
    pub fn gated() -> (Self, ScriptedHandle) {
        Self::build(true)
    }

    fn build(gated: bool) -> (Self, ScriptedHandle) {
        let shared = Arc::new(Shared {
            state: Mutex::new(ScriptState {
                gated,
                ..ScriptState::default()
            }),
            released: Condvar::new(),
        });
        let handle = ScriptedHandle {
            shared: Arc::clone(&shared),
        };
        (
            Self {
                shared,
                config: TtsConfig::default(),
                voice: None,
            },
            handle,
        )
    }

    fn take_failure(state: &mut ScriptState) -> TtsResult<()> {
        if state.fail_next {
            state.fail_next = false;
            return Err(TtsError::SynthesisError("scripted failure".into()));
        }
        Ok(())
    }
}

impl TtsEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn initialize(&mut self, config: TtsConfig) -> TtsResult<()> {
        self.config = config;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn speak(&mut self, text: &str, _options: &SynthesisOptions) -> TtsResult<()> {
        let mut state = self.shared.state.lock();
        while state.gated && state.permits == 0 {
            self.shared.released.wait(&mut state);
        }
        if state.gated {
            state.permits -= 1;
        }
        Self::take_failure(&mut state)?;
        state.spoken.push(text.to_string());
        Ok(())
    }

    fn synthesize_to_file(
        &mut self,
        text: &str,
        output: &Path,
        _options: &SynthesisOptions,
    ) -> TtsResult<()> {
        let mut state = self.shared.state.lock();
        Self::take_failure(&mut state)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // A minimal stand-in artifact so callers can assert on the output path.
        std::fs::write(output, b"RIFF\0\0\0\0WAVE")?;
        state.synthesized.push((text.to_string(), output.to_path_buf()));
        Ok(())
    }

    fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        Ok(vec![VoiceInfo {
            id: "scripted".into(),
            name: "Scripted test voice".into(),
            language: "en".into(),
            gender: Some(VoiceGender::Unknown),
        }])
    }

    fn set_voice(&mut self, voice_id: &str) -> TtsResult<()> {
        self.voice = Some(voice_id.to_string());
        Ok(())
    }

    fn config(&self) -> &TtsConfig {
        &self.config
    }

    fn shutdown(&mut self) -> TtsResult<()> {
        self.shared.released.notify_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_spoken_text() {
        let (mut engine, handle) = ScriptedEngine::new();
        engine.speak("hello", &SynthesisOptions::default()).unwrap();
        engine.speak("world", &SynthesisOptions::default()).unwrap();
        assert_eq!(handle.spoken(), vec!["hello", "world"]);
    }

    #[test]
    fn injected_failure_fires_once() {
        let (mut engine, handle) = ScriptedEngine::new();
        handle.fail_next_call();
        assert!(engine.speak("boom", &SynthesisOptions::default()).is_err());
        assert!(engine.speak("fine", &SynthesisOptions::default()).is_ok());
        assert_eq!(handle.spoken(), vec!["fine"]);
    }

    #[test]
    fn gated_speak_waits_for_permit() {
        let (mut engine, handle) = ScriptedEngine::gated();
        handle.release(1);
        engine.speak("first", &SynthesisOptions::default()).unwrap();
        assert_eq!(handle.spoken(), vec!["first"]);
    }

    #[test]
    fn writes_synthesis_artifact() {
        let (mut engine, handle) = ScriptedEngine::new();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");
        engine
            .synthesize_to_file("text", &out, &SynthesisOptions::default())
            .unwrap();
        assert!(out.exists());
        assert_eq!(handle.synthesized()[0].0, "text");
    }
}
