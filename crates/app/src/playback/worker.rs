//! The background synthesis worker.
//!
//! One dedicated thread per playback attempt. The worker owns nothing but a
//! cancel flag and an event sender: it never touches controller state, and
//! every outcome is marshaled back to the control thread as a
//! [`PlaybackEvent`]. Cancellation is cooperative and observed between
//! utterances, never mid-call.

use papervox_tts::{segment_utterances, SharedEngine, SynthesisOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Generation tag for worker events. A controller may briefly have a
/// cancelled worker winding down while a new one runs; events from stale
/// generations must not move the current session.
pub type WorkerId = u64;

#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// One utterance was fully spoken; `end_offset` is absolute within the
    /// session's queued text.
    UtteranceSpoken { worker: WorkerId, end_offset: usize },
    /// All queued text was spoken.
    Completed { worker: WorkerId },
    /// The worker observed its cancel flag and exited; `cursor` is the end
    /// of the last fully spoken utterance.
    Cancelled { worker: WorkerId, cursor: usize },
    Failed { worker: WorkerId, error: String },
    ConversionFinished { worker: WorkerId, output: PathBuf },
    ConversionFailed { worker: WorkerId, error: String },
    PreviewReady { page_index: usize, output: PathBuf },
    PreviewFailed { page_index: usize, error: String },
}

#[derive(Debug)]
pub enum SynthesisJob {
    /// Speak `text` through the audio device. Reported offsets are
    /// `base_offset` plus the position within `text`.
    Speak { text: String, base_offset: usize },
    /// Write the whole text as one audio file. There are no utterance
    /// checkpoints, so cancellation is only observed before the engine call.
    ConvertToFile { text: String, output: PathBuf },
}

pub struct SynthesisWorker {
    id: WorkerId,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl SynthesisWorker {
    pub fn spawn(
        id: WorkerId,
        engine: SharedEngine,
        job: SynthesisJob,
        options: SynthesisOptions,
        max_utterance_chars: usize,
        events: UnboundedSender<PlaybackEvent>,
    ) -> std::io::Result<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name(format!("synthesis-{id}"))
            .spawn(move || match job {
                SynthesisJob::Speak { text, base_offset } => run_speak(
                    id,
                    &engine,
                    &text,
                    base_offset,
                    &options,
                    max_utterance_chars,
                    &flag,
                    &events,
                ),
                SynthesisJob::ConvertToFile { text, output } => {
                    run_convert(id, &engine, &text, &output, &options, &flag, &events)
                }
            })?;
        Ok(Self { id, cancel, handle })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("synthesis worker {} panicked", self.id);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_speak(
    id: WorkerId,
    engine: &SharedEngine,
    text: &str,
    base_offset: usize,
    options: &SynthesisOptions,
    max_utterance_chars: usize,
    cancel: &AtomicBool,
    events: &UnboundedSender<PlaybackEvent>,
) {
    let utterances = segment_utterances(text, max_utterance_chars);
    debug!(
        "Worker {} speaking {} utterances from offset {}",
        id,
        utterances.len(),
        base_offset
    );
    let mut spoken_end = base_offset;
    for utterance in utterances {
        if cancel.load(Ordering::SeqCst) {
            debug!("Worker {} cancelled at offset {}", id, spoken_end);
            let _ = events.send(PlaybackEvent::Cancelled {
                worker: id,
                cursor: spoken_end,
            });
            return;
        }
        let result = engine.lock().speak(utterance.slice(text), options);
        if let Err(err) = result {
            let _ = events.send(PlaybackEvent::Failed {
                worker: id,
                error: err.to_string(),
            });
            return;
        }
        spoken_end = base_offset + utterance.end;
        let _ = events.send(PlaybackEvent::UtteranceSpoken {
            worker: id,
            end_offset: spoken_end,
        });
    }
    let _ = events.send(PlaybackEvent::Completed { worker: id });
}

fn run_convert(
    id: WorkerId,
    engine: &SharedEngine,
    text: &str,
    output: &Path,
    options: &SynthesisOptions,
    cancel: &AtomicBool,
    events: &UnboundedSender<PlaybackEvent>,
) {
    if cancel.load(Ordering::SeqCst) {
        let _ = events.send(PlaybackEvent::Cancelled {
            worker: id,
            cursor: 0,
        });
        return;
    }
    let result = engine.lock().synthesize_to_file(text, output, options);
    let event = match result {
        Ok(()) => PlaybackEvent::ConversionFinished {
            worker: id,
            output: output.to_path_buf(),
        },
        Err(err) => PlaybackEvent::ConversionFailed {
            worker: id,
            error: err.to_string(),
        },
    };
    let _ = events.send(event);
}
