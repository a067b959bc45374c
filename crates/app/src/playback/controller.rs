//! The playback controller.
//!
//! Runs on the control thread and owns the [`PlaybackSession`]. Anything
//! that blocks (speech synthesis, preview rendering) happens on worker
//! threads that report back through the event channel; `handle_event` is
//! the only place worker outcomes touch the session.

use super::session::{LoadedDocument, PlaybackSession, PlaybackState};
use super::worker::{PlaybackEvent, SynthesisJob, SynthesisWorker, WorkerId};
use super::PlaybackError;
use crate::config::ReadingScope;
use crate::telemetry::PlaybackMetrics;
use papervox_document::{PdfDocument, PreviewRenderer};
use papervox_foundation::HealthCheck;
use papervox_tts::{SharedEngine, SynthesisOptions};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub scope: ReadingScope,
    pub options: SynthesisOptions,
    pub max_utterance_chars: usize,
    pub preview_dir: PathBuf,
    pub preview_max_width: u32,
    pub preview_max_height: u32,
    pub output_path: PathBuf,
    pub stuck_timeout: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            scope: ReadingScope::Page,
            options: SynthesisOptions::default(),
            max_utterance_chars: 400,
            preview_dir: PathBuf::from("runtime/previews"),
            preview_max_width: 300,
            preview_max_height: 200,
            output_path: PathBuf::from("output/audiobook.wav"),
            stuck_timeout: Duration::from_secs(30),
        }
    }
}

/// Worker liveness shared with the health monitor.
struct WorkerWatch {
    busy: AtomicBool,
    last_event: Mutex<Instant>,
}

/// Health probe reporting a synthesis worker that has gone silent while a
/// run is active. There is no synthesis timeout, so a hung engine is
/// detected and reported rather than killed.
pub struct StuckProbe {
    watch: Arc<WorkerWatch>,
    timeout: Duration,
}

impl HealthCheck for StuckProbe {
    fn name(&self) -> &str {
        "synthesis-worker"
    }

    fn check(&self) -> Result<(), String> {
        if !self.watch.busy.load(Ordering::SeqCst) {
            return Ok(());
        }
        let elapsed = self.watch.last_event.lock().elapsed();
        if elapsed > self.timeout {
            Err(format!(
                "no synthesis progress for {}s; the engine may be stuck",
                elapsed.as_secs()
            ))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveJob {
    Speak,
    Convert,
}

pub struct PlaybackController {
    session: PlaybackSession,
    engine: SharedEngine,
    renderer: Arc<dyn PreviewRenderer>,
    settings: PlaybackSettings,
    events: UnboundedSender<PlaybackEvent>,
    active: Option<SynthesisWorker>,
    active_job: Option<ActiveJob>,
    retiring: Vec<SynthesisWorker>,
    next_worker_id: WorkerId,
    watch: Arc<WorkerWatch>,
    metrics: Arc<PlaybackMetrics>,
}

impl PlaybackController {
    pub fn new(
        engine: SharedEngine,
        renderer: Arc<dyn PreviewRenderer>,
        settings: PlaybackSettings,
        events: UnboundedSender<PlaybackEvent>,
        metrics: Arc<PlaybackMetrics>,
    ) -> Self {
        Self {
            session: PlaybackSession::default(),
            engine,
            renderer,
            settings,
            events,
            active: None,
            active_job: None,
            retiring: Vec::new(),
            next_worker_id: 0,
            watch: Arc::new(WorkerWatch {
                busy: AtomicBool::new(false),
                last_event: Mutex::new(Instant::now()),
            }),
            metrics,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn stuck_probe(&self) -> StuckProbe {
        StuckProbe {
            watch: Arc::clone(&self.watch),
            timeout: self.settings.stuck_timeout,
        }
    }

    /// Opens a document and resets the session to it. On failure the
    /// previous session, including any loaded document, is untouched.
    pub fn load_document(&mut self, path: &Path) -> Result<LoadedDocument, PlaybackError> {
        let document = PdfDocument::open(path)?;
        let loaded = LoadedDocument {
            path: document.path().to_path_buf(),
            page_count: document.page_count(),
        };
        drop(document);

        self.retire_active();
        self.session.install_document(loaded.clone());
        self.metrics.documents_loaded.fetch_add(1, Ordering::Relaxed);
        info!(
            "Loaded {} with {} pages",
            loaded.path.display(),
            loaded.page_count
        );
        self.spawn_preview(0);
        Ok(loaded)
    }

    /// Steps `delta` pages, clamping to the document bounds; an
    /// out-of-range request is not an error. Playback state and cursor are
    /// untouched: page navigation is decoupled from the queued text.
    pub fn go_to_page(&mut self, delta: i64) -> Result<usize, PlaybackError> {
        let target = self
            .session
            .clamped_page(delta)
            .ok_or(PlaybackError::NothingLoaded)?;
        if target != self.session.page_index() {
            self.session.set_page(target);
        }
        self.spawn_preview(target);
        Ok(target)
    }

    /// The play/pause/resume state machine. A call always toggles:
    /// Idle starts playback, Playing pauses, Paused resumes. A running file
    /// conversion has no pause checkpoints and is rejected as busy instead.
    pub fn toggle_playback(&mut self) -> Result<PlaybackState, PlaybackError> {
        if self.active_job == Some(ActiveJob::Convert) {
            return Err(PlaybackError::Busy);
        }
        match self.session.state() {
            PlaybackState::Idle => {
                let text = self.scope_text()?;
                self.session.begin_run(text)?;
                if let Err(err) = self.start_speak_worker(0) {
                    self.session.halt();
                    return Err(err);
                }
            }
            PlaybackState::Playing => {
                if let Some(worker) = &self.active {
                    worker.request_cancel();
                }
                self.session.pause()?;
                debug!(
                    "Pause requested; cursor currently {}",
                    self.session.cursor()
                );
            }
            PlaybackState::Paused => {
                self.session.resume()?;
                let cursor = self.session.cursor();
                if let Err(err) = self.start_speak_worker(cursor) {
                    self.session.halt();
                    return Err(err);
                }
            }
        }
        Ok(self.session.state())
    }

    /// Stops playback entirely: cancels any worker, returns to Idle,
    /// resets the cursor.
    pub fn stop(&mut self) {
        self.retire_active();
        self.session.halt();
    }

    /// Synthesizes the configured scope into the configured output file,
    /// overwriting it. Only allowed from Idle; the run occupies the Playing
    /// state until the worker reports back. A file conversion has no
    /// utterance checkpoints, so it cannot be paused mid-call.
    pub fn convert_to_file(&mut self) -> Result<PathBuf, PlaybackError> {
        if self.session.state() != PlaybackState::Idle || self.active.is_some() {
            return Err(PlaybackError::Busy);
        }
        let text = self.scope_text()?;
        let output = self.settings.output_path.clone();
        self.session.begin_run(text.clone())?;
        let job = SynthesisJob::ConvertToFile {
            text,
            output: output.clone(),
        };
        if let Err(err) = self.start_worker(job) {
            self.session.halt();
            return Err(err);
        }
        Ok(output)
    }

    /// Applies a worker event to the session. Returns a user-facing notice
    /// when there is something worth showing.
    pub fn handle_event(&mut self, event: PlaybackEvent) -> Option<String> {
        match event {
            PlaybackEvent::UtteranceSpoken { worker, end_offset } => {
                if self.is_current(worker) {
                    self.session.set_cursor(end_offset);
                    self.touch_watch();
                    self.metrics.utterances_spoken.fetch_add(1, Ordering::Relaxed);
                }
                self.reap_finished();
                None
            }
            PlaybackEvent::Completed { worker } => {
                if !self.is_current(worker) {
                    self.reap(worker);
                    return None;
                }
                self.clear_active();
                self.metrics
                    .playback_runs_completed
                    .fetch_add(1, Ordering::Relaxed);
                match self.session.state() {
                    PlaybackState::Playing => {
                        let _ = self.session.finish_run();
                        Some("Playback finished.".to_string())
                    }
                    _ => {
                        // The pause request lost the race against the final
                        // utterance; everything was spoken anyway.
                        self.session.halt();
                        Some("Playback finished before the pause took effect.".to_string())
                    }
                }
            }
            PlaybackEvent::Cancelled { worker, cursor } => {
                if !self.is_current(worker) {
                    self.reap(worker);
                    return None;
                }
                self.clear_active();
                if self.session.state() == PlaybackState::Paused {
                    self.session.set_cursor(cursor);
                    Some(format!("Paused at offset {}.", self.session.cursor()))
                } else {
                    // Cancelled for a reason other than pause (stop or a new
                    // document); the session was already reset.
                    self.session.halt();
                    None
                }
            }
            PlaybackEvent::Failed { worker, error } => {
                self.metrics.synthesis_failures.fetch_add(1, Ordering::Relaxed);
                if !self.is_current(worker) {
                    self.reap(worker);
                    return None;
                }
                self.clear_active();
                self.session.halt();
                Some(format!("Speech synthesis failed: {error}"))
            }
            PlaybackEvent::ConversionFinished { worker, output } => {
                if !self.is_current(worker) {
                    self.reap(worker);
                    return None;
                }
                self.clear_active();
                let _ = self.session.finish_run();
                self.metrics
                    .conversions_completed
                    .fetch_add(1, Ordering::Relaxed);
                Some(format!("Audio written to {}", output.display()))
            }
            PlaybackEvent::ConversionFailed { worker, error } => {
                self.metrics.synthesis_failures.fetch_add(1, Ordering::Relaxed);
                if !self.is_current(worker) {
                    self.reap(worker);
                    return None;
                }
                self.clear_active();
                self.session.halt();
                Some(format!("Audio conversion failed: {error}"))
            }
            PlaybackEvent::PreviewReady { page_index, output } => {
                self.metrics.previews_rendered.fetch_add(1, Ordering::Relaxed);
                Some(format!(
                    "Preview for page {} written to {}",
                    page_index + 1,
                    output.display()
                ))
            }
            PlaybackEvent::PreviewFailed { page_index, error } => {
                self.metrics.preview_failures.fetch_add(1, Ordering::Relaxed);
                let failure = PlaybackError::Preview {
                    page: page_index,
                    message: error,
                };
                warn!("{failure}");
                Some(failure.to_string())
            }
        }
    }

    /// One-line status for the interactive `status` command.
    pub fn status(&self) -> String {
        let engine = match self.engine.try_lock() {
            Some(engine) => engine.name().to_string(),
            None => "busy".to_string(),
        };
        match self.session.document() {
            Some(document) => format!(
                "{:?} | {} | page {}/{} | cursor {}/{} | engine {}",
                self.session.state(),
                document.path.display(),
                self.session.page_index() + 1,
                document.page_count,
                self.session.cursor(),
                self.session.full_text().len(),
                engine
            ),
            None => format!(
                "{:?} | no document loaded | engine {}",
                self.session.state(),
                engine
            ),
        }
    }

    /// Stops playback and releases the engine. Blocks until workers have
    /// acknowledged cancellation (at most one utterance).
    pub fn shutdown(&mut self) {
        self.stop();
        for worker in self.retiring.drain(..) {
            worker.join();
        }
        if let Err(err) = self.engine.lock().shutdown() {
            warn!("engine shutdown failed: {err}");
        }
    }

    fn scope_text(&self) -> Result<String, PlaybackError> {
        let loaded = self
            .session
            .document()
            .ok_or(PlaybackError::NothingLoaded)?;
        let document = PdfDocument::open(&loaded.path)?;
        let text = match self.settings.scope {
            ReadingScope::Page => document.page_text(self.session.page_index())?,
            ReadingScope::Document => document.full_text()?,
        };
        if text.trim().is_empty() {
            return Err(PlaybackError::NoReadableText);
        }
        Ok(text)
    }

    fn start_speak_worker(&mut self, from: usize) -> Result<(), PlaybackError> {
        let text = self.session.full_text()[from..].to_string();
        self.start_worker(SynthesisJob::Speak {
            text,
            base_offset: from,
        })
    }

    fn start_worker(&mut self, job: SynthesisJob) -> Result<(), PlaybackError> {
        self.retire_active();
        let kind = match &job {
            SynthesisJob::Speak { .. } => ActiveJob::Speak,
            SynthesisJob::ConvertToFile { .. } => ActiveJob::Convert,
        };
        self.next_worker_id += 1;
        let worker = SynthesisWorker::spawn(
            self.next_worker_id,
            Arc::clone(&self.engine),
            job,
            self.settings.options.clone(),
            self.settings.max_utterance_chars,
            self.events.clone(),
        )
        .map_err(|err| PlaybackError::Engine(err.into()))?;
        self.active = Some(worker);
        self.active_job = Some(kind);
        self.touch_watch();
        self.watch.busy.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Moves the active worker (if any) to the retiring list with its
    /// cancel flag set. Its remaining events are recognized as stale by
    /// generation id.
    fn retire_active(&mut self) {
        if let Some(worker) = self.active.take() {
            worker.request_cancel();
            self.retiring.push(worker);
        }
        self.active_job = None;
        self.watch.busy.store(false, Ordering::SeqCst);
        self.reap_finished();
    }

    fn clear_active(&mut self) {
        if let Some(worker) = self.active.take() {
            worker.join();
        }
        self.active_job = None;
        self.watch.busy.store(false, Ordering::SeqCst);
    }

    fn is_current(&self, worker: WorkerId) -> bool {
        self.active.as_ref().is_some_and(|w| w.id() == worker)
    }

    fn reap(&mut self, worker: WorkerId) {
        if let Some(position) = self.retiring.iter().position(|w| w.id() == worker) {
            self.retiring.swap_remove(position).join();
        }
    }

    fn reap_finished(&mut self) {
        let mut index = 0;
        while index < self.retiring.len() {
            if self.retiring[index].is_finished() {
                self.retiring.swap_remove(index).join();
            } else {
                index += 1;
            }
        }
    }

    fn touch_watch(&self) {
        *self.watch.last_event.lock() = Instant::now();
    }

    fn spawn_preview(&self, page_index: usize) {
        let Some(loaded) = self.session.document() else {
            return;
        };
        let renderer = Arc::clone(&self.renderer);
        let path = loaded.path.clone();
        let events = self.events.clone();
        let dir = self.settings.preview_dir.clone();
        let max_width = self.settings.preview_max_width;
        let max_height = self.settings.preview_max_height;
        let spawned = thread::Builder::new()
            .name("preview-render".to_string())
            .spawn(move || {
                let event =
                    match render_and_save(&*renderer, &path, page_index, max_width, max_height, &dir)
                    {
                        Ok(output) => PlaybackEvent::PreviewReady { page_index, output },
                        Err(message) => PlaybackEvent::PreviewFailed {
                            page_index,
                            error: message,
                        },
                    };
                let _ = events.send(event);
            });
        if let Err(err) = spawned {
            warn!("failed to spawn preview thread: {err}");
        }
    }
}

fn render_and_save(
    renderer: &dyn PreviewRenderer,
    path: &Path,
    page_index: usize,
    max_width: u32,
    max_height: u32,
    dir: &Path,
) -> Result<PathBuf, String> {
    let image = renderer
        .render_preview(path, page_index, max_width, max_height)
        .map_err(|err| err.to_string())?;
    std::fs::create_dir_all(dir).map_err(|err| err.to_string())?;
    let output = dir.join(format!("page_{:04}.png", page_index + 1));
    image.save(&output).map_err(|err| err.to_string())?;
    Ok(output)
}
