//! Counters shared between the controller and the runtime's stats tick.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PlaybackMetrics {
    pub documents_loaded: AtomicU64,
    pub utterances_spoken: AtomicU64,
    pub playback_runs_completed: AtomicU64,
    pub synthesis_failures: AtomicU64,
    pub conversions_completed: AtomicU64,
    pub previews_rendered: AtomicU64,
    pub preview_failures: AtomicU64,
}

impl PlaybackMetrics {
    pub fn log_summary(&self) {
        tracing::info!(
            documents = self.documents_loaded.load(Ordering::Relaxed),
            utterances = self.utterances_spoken.load(Ordering::Relaxed),
            runs = self.playback_runs_completed.load(Ordering::Relaxed),
            failures = self.synthesis_failures.load(Ordering::Relaxed),
            conversions = self.conversions_completed.load(Ordering::Relaxed),
            previews = self.previews_rendered.load(Ordering::Relaxed),
            preview_failures = self.preview_failures.load(Ordering::Relaxed),
            "Playback metrics"
        );
    }
}
