//! TTS engine abstraction

use crate::error::TtsResult;
use crate::types::{SynthesisOptions, TtsConfig, VoiceInfo};
use std::path::Path;
use std::sync::Arc;

/// A speech engine shared between the control thread and the synthesis
/// worker. Exactly one synthesis call is in flight at a time by design, but
/// the lock also serializes any interleaved voice or config access.
pub type SharedEngine = Arc<parking_lot::Mutex<Box<dyn TtsEngine>>>;

/// Core TTS engine interface.
///
/// Both synthesis entry points block until the engine is done: `speak`
/// until the utterance has been played through the audio device,
/// `synthesize_to_file` until the audio file has been written. Callers that
/// must stay responsive run these on a dedicated worker thread.
pub trait TtsEngine: Send {
    /// Engine name/identifier
    fn name(&self) -> &str;

    /// Initialize the engine with configuration
    fn initialize(&mut self, config: TtsConfig) -> TtsResult<()>;

    /// Check if the engine is usable on this system
    fn is_available(&self) -> bool;

    /// Speak text through the audio output device, blocking until done
    fn speak(&mut self, text: &str, options: &SynthesisOptions) -> TtsResult<()>;

    /// Synthesize text into an audio file at `output`, blocking until done
    fn synthesize_to_file(
        &mut self,
        text: &str,
        output: &Path,
        options: &SynthesisOptions,
    ) -> TtsResult<()>;

    /// Voices the engine can speak with
    fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>>;

    /// Select the current voice
    fn set_voice(&mut self, voice_id: &str) -> TtsResult<()>;

    /// Current configuration
    fn config(&self) -> &TtsConfig;

    /// Shut down the engine and release resources
    fn shutdown(&mut self) -> TtsResult<()>;
}
