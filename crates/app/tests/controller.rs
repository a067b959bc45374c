//! End-to-end controller tests against a scripted engine and real PDF
//! fixtures. The gated engine variant blocks inside `speak` until the test
//! releases it, which pins down pause/resume timing without sleeps.

use papervox_app::config::ReadingScope;
use papervox_app::playback::{
    PlaybackController, PlaybackError, PlaybackEvent, PlaybackSettings, PlaybackState,
};
use papervox_app::telemetry::PlaybackMetrics;
use papervox_document::{fixtures, PlaceholderRenderer, PreviewRenderer};
use papervox_tts::testing::{ScriptedEngine, ScriptedHandle};
use papervox_tts::TtsEngine;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedReceiver};

const DEADLINE: Duration = Duration::from_secs(10);

struct Harness {
    controller: PlaybackController,
    events: UnboundedReceiver<PlaybackEvent>,
    engine: ScriptedHandle,
    metrics: Arc<PlaybackMetrics>,
    dir: TempDir,
}

impl Harness {
    fn new(gated: bool, scope: ReadingScope) -> Self {
        let dir = TempDir::new().unwrap();
        let (engine, handle) = if gated {
            ScriptedEngine::gated()
        } else {
            ScriptedEngine::new()
        };
        let shared = Arc::new(Mutex::new(Box::new(engine) as Box<dyn TtsEngine>));
        let renderer: Arc<dyn PreviewRenderer> = Arc::new(PlaceholderRenderer::new());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(PlaybackMetrics::default());
        let settings = PlaybackSettings {
            scope,
            preview_dir: dir.path().join("previews"),
            output_path: dir.path().join("audiobook.wav"),
            ..PlaybackSettings::default()
        };
        let controller = PlaybackController::new(
            shared,
            renderer,
            settings,
            events_tx,
            Arc::clone(&metrics),
        );
        Self {
            controller,
            events: events_rx,
            engine: handle,
            metrics,
            dir,
        }
    }

    fn pdf(&self, name: &str, pages: &[&str]) -> PathBuf {
        let path = self.dir.path().join(name);
        fixtures::write_pdf(&path, pages).unwrap();
        path
    }

    fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.controller.handle_event(event);
        }
    }

    fn wait_until(&mut self, predicate: impl Fn(&PlaybackController) -> bool) {
        let start = Instant::now();
        loop {
            self.drain();
            if predicate(&self.controller) {
                return;
            }
            assert!(
                start.elapsed() < DEADLINE,
                "condition not reached in time; state = {:?}",
                self.controller.session().state()
            );
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn wait_for_file(&mut self, path: &Path) {
        let start = Instant::now();
        loop {
            self.drain();
            if path.exists() {
                return;
            }
            assert!(
                start.elapsed() < DEADLINE,
                "file {} not created in time",
                path.display()
            );
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

#[test]
fn playing_a_page_runs_to_completion_and_returns_to_idle() {
    let mut h = Harness::new(false, ReadingScope::Page);
    let pdf = h.pdf("doc.pdf", &["Hello world. Goodbye moon.", "Second page."]);
    h.controller.load_document(&pdf).unwrap();
    assert_eq!(h.controller.session().state(), PlaybackState::Idle);

    assert_eq!(
        h.controller.toggle_playback().unwrap(),
        PlaybackState::Playing
    );
    h.wait_until(|c| c.session().state() == PlaybackState::Idle && !c.is_busy());

    let spoken = h.engine.spoken();
    assert!(!spoken.is_empty());
    assert!(spoken[0].contains("Hello world."));
    assert_eq!(h.controller.session().cursor(), 0);
    assert_eq!(h.metrics.playback_runs_completed.load(Ordering::Relaxed), 1);
}

#[test]
fn pause_keeps_cursor_on_an_utterance_boundary() {
    // Toggle to play, then toggle again immediately: the pause must leave
    // the cursor at an utterance boundary of the first sentence, which is
    // "Hello world." (so within [0, 12]).
    let mut h = Harness::new(true, ReadingScope::Page);
    let pdf = h.pdf("doc.pdf", &["Hello world. Something more.", "Second.", "Third."]);
    h.controller.load_document(&pdf).unwrap();

    assert_eq!(
        h.controller.toggle_playback().unwrap(),
        PlaybackState::Playing
    );
    assert_eq!(
        h.controller.toggle_playback().unwrap(),
        PlaybackState::Paused
    );
    let text_len = h.controller.session().full_text().len();
    assert!(h.controller.session().cursor() <= text_len);

    // Let any in-flight utterance finish; the worker then observes the
    // cancel at the next boundary and retires, never reaching sentence two.
    h.engine.release_all();
    h.wait_until(|c| !c.is_busy());
    assert_eq!(h.controller.session().state(), PlaybackState::Paused);
    let cursor = h.controller.session().cursor();
    assert!(
        cursor == 0 || cursor == 12,
        "cursor {cursor} is not an utterance boundary"
    );

    // Resuming speaks whatever follows the cursor and ends Idle.
    assert_eq!(
        h.controller.toggle_playback().unwrap(),
        PlaybackState::Playing
    );
    h.wait_until(|c| c.session().state() == PlaybackState::Idle && !c.is_busy());
    assert_eq!(h.controller.session().cursor(), 0);
}

#[test]
fn resume_never_respeaks_text_before_the_cursor() {
    let mut h = Harness::new(true, ReadingScope::Page);
    let pdf = h.pdf("doc.pdf", &["Hello world. Goodbye moon."]);
    h.controller.load_document(&pdf).unwrap();

    h.controller.toggle_playback().unwrap();
    h.controller.toggle_playback().unwrap();
    h.engine.release(1);
    h.wait_until(|c| !c.is_busy());
    assert_eq!(h.controller.session().state(), PlaybackState::Paused);

    let cursor = h.controller.session().cursor();
    let full = h.controller.session().full_text().to_string();
    assert!(cursor <= full.len());
    let spoken_before_resume = h.engine.spoken().len();

    h.engine.release_all();
    h.controller.toggle_playback().unwrap();
    h.wait_until(|c| c.session().state() == PlaybackState::Idle && !c.is_busy());

    let spoken = h.engine.spoken();
    let resumed = spoken[spoken_before_resume..].join(" ");
    let expected_tail = full[cursor..]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(resumed, expected_tail);
}

#[test]
fn loading_a_missing_document_leaves_the_session_unchanged() {
    let mut h = Harness::new(false, ReadingScope::Page);
    let pdf = h.pdf("doc.pdf", &["Some text."]);
    h.controller.load_document(&pdf).unwrap();

    let err = h
        .controller
        .load_document(Path::new("/no/such/missing.pdf"))
        .unwrap_err();
    assert!(matches!(err, PlaybackError::Document(_)));
    assert_eq!(h.controller.session().document().unwrap().path, pdf);
    assert_eq!(h.controller.session().state(), PlaybackState::Idle);
}

#[test]
fn an_image_only_page_reports_no_readable_text() {
    let mut h = Harness::new(false, ReadingScope::Page);
    let pdf = h.pdf("blank.pdf", &[""]);
    h.controller.load_document(&pdf).unwrap();

    let err = h.controller.toggle_playback().unwrap_err();
    assert!(matches!(err, PlaybackError::NoReadableText));
    assert_eq!(h.controller.session().state(), PlaybackState::Idle);
    assert!(!h.controller.is_busy());
    assert!(h.engine.spoken().is_empty());
}

#[test]
fn loading_a_new_document_cancels_playback_and_resets_the_session() {
    let mut h = Harness::new(true, ReadingScope::Page);
    let first = h.pdf("first.pdf", &["First document text.", "More."]);
    let second = h.pdf("second.pdf", &["Second document."]);
    h.controller.load_document(&first).unwrap();
    h.controller.go_to_page(1).unwrap();
    h.controller.toggle_playback().unwrap();
    assert_eq!(h.controller.session().state(), PlaybackState::Playing);

    h.controller.load_document(&second).unwrap();
    assert_eq!(h.controller.session().state(), PlaybackState::Idle);
    assert_eq!(h.controller.session().cursor(), 0);
    assert_eq!(h.controller.session().page_index(), 0);
    assert_eq!(h.controller.session().document().unwrap().path, second);

    // The stale worker winds down; its events must not disturb the session.
    h.engine.release_all();
    std::thread::sleep(Duration::from_millis(50));
    h.drain();
    assert_eq!(h.controller.session().state(), PlaybackState::Idle);
    assert_eq!(h.controller.session().cursor(), 0);
}

#[test]
fn stop_resets_cursor_and_state() {
    let mut h = Harness::new(true, ReadingScope::Page);
    let pdf = h.pdf("doc.pdf", &["Alpha beta gamma. Delta."]);
    h.controller.load_document(&pdf).unwrap();
    h.controller.toggle_playback().unwrap();

    h.controller.stop();
    assert_eq!(h.controller.session().state(), PlaybackState::Idle);
    assert_eq!(h.controller.session().cursor(), 0);
    assert!(!h.controller.is_busy());
    h.engine.release_all();
}

#[test]
fn page_navigation_clamps_for_any_delta() {
    let mut h = Harness::new(false, ReadingScope::Page);
    let pdf = h.pdf("doc.pdf", &["One.", "Two.", "Three."]);
    h.controller.load_document(&pdf).unwrap();

    assert_eq!(h.controller.go_to_page(100).unwrap(), 2);
    assert_eq!(h.controller.go_to_page(-1000).unwrap(), 0);
    assert_eq!(h.controller.go_to_page(i64::MAX).unwrap(), 2);
    assert_eq!(h.controller.go_to_page(i64::MIN).unwrap(), 0);

    let preview = h.dir.path().join("previews").join("page_0001.png");
    h.wait_for_file(&preview);
}

#[test]
fn page_navigation_does_not_disturb_playback() {
    let mut h = Harness::new(true, ReadingScope::Page);
    let pdf = h.pdf("doc.pdf", &["Queued text to speak.", "Other page."]);
    h.controller.load_document(&pdf).unwrap();
    h.controller.toggle_playback().unwrap();

    h.controller.go_to_page(1).unwrap();
    assert_eq!(h.controller.session().state(), PlaybackState::Playing);
    assert_eq!(h.controller.session().page_index(), 1);
    // The queued text is still the text captured at toggle time.
    assert!(h.controller.session().full_text().contains("Queued text"));
    h.engine.release_all();
    h.wait_until(|c| !c.is_busy());
}

#[test]
fn operations_without_a_document_are_rejected() {
    let mut h = Harness::new(false, ReadingScope::Page);
    assert!(matches!(
        h.controller.toggle_playback().unwrap_err(),
        PlaybackError::NothingLoaded
    ));
    assert!(matches!(
        h.controller.go_to_page(1).unwrap_err(),
        PlaybackError::NothingLoaded
    ));
    assert!(matches!(
        h.controller.convert_to_file().unwrap_err(),
        PlaybackError::NothingLoaded
    ));
}

#[test]
fn conversion_writes_and_overwrites_the_output_file() {
    let mut h = Harness::new(false, ReadingScope::Document);
    let pdf = h.pdf("doc.pdf", &["First page.", "Second page."]);
    h.controller.load_document(&pdf).unwrap();

    let output = h.controller.convert_to_file().unwrap();
    h.wait_until(|c| c.session().state() == PlaybackState::Idle && !c.is_busy());
    assert!(output.exists());
    let synthesized = h.engine.synthesized();
    assert_eq!(synthesized.len(), 1);
    assert!(synthesized[0].0.contains("First page."));
    assert!(synthesized[0].0.contains("Second page."));

    h.controller.convert_to_file().unwrap();
    h.wait_until(|c| c.session().state() == PlaybackState::Idle && !c.is_busy());
    assert_eq!(h.engine.synthesized().len(), 2);
    assert_eq!(h.metrics.conversions_completed.load(Ordering::Relaxed), 2);
}

#[test]
fn conversion_is_rejected_while_playing() {
    let mut h = Harness::new(true, ReadingScope::Page);
    let pdf = h.pdf("doc.pdf", &["Busy text."]);
    h.controller.load_document(&pdf).unwrap();
    h.controller.toggle_playback().unwrap();

    assert!(matches!(
        h.controller.convert_to_file().unwrap_err(),
        PlaybackError::Busy
    ));
    h.engine.release_all();
    h.wait_until(|c| !c.is_busy());
}

#[test]
fn an_engine_failure_returns_the_session_to_idle() {
    let mut h = Harness::new(false, ReadingScope::Page);
    let pdf = h.pdf("doc.pdf", &["Doomed text."]);
    h.controller.load_document(&pdf).unwrap();
    h.engine.fail_next_call();

    h.controller.toggle_playback().unwrap();
    h.wait_until(|c| c.session().state() == PlaybackState::Idle && !c.is_busy());
    assert_eq!(h.metrics.synthesis_failures.load(Ordering::Relaxed), 1);
    assert_eq!(h.controller.session().cursor(), 0);
}

#[test]
fn whole_document_scope_reads_every_page() {
    let mut h = Harness::new(false, ReadingScope::Document);
    let pdf = h.pdf("doc.pdf", &["Page one text.", "Page two text."]);
    h.controller.load_document(&pdf).unwrap();

    h.controller.toggle_playback().unwrap();
    h.wait_until(|c| c.session().state() == PlaybackState::Idle && !c.is_busy());

    let all_spoken = h.engine.spoken().join(" ");
    assert!(all_spoken.contains("Page one text."));
    assert!(all_spoken.contains("Page two text."));
}
