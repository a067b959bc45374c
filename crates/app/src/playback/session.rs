use super::PlaybackError;
use std::path::PathBuf;

/// Playback lifecycle of the loaded text. `Idle` is the terminal,
/// re-enterable state; `Playing` means exactly one synthesis worker is in
/// flight; `Paused` means none is and `cursor` marks the resume point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub page_count: usize,
}

/// The one entity of the application: which document is loaded, which page
/// is previewed, what text is queued for speech and how far it has been
/// spoken.
///
/// Invariants: `page_index < page_count` whenever a document is present;
/// `cursor <= full_text.len()` and always on a `char` boundary; `full_text`
/// is immutable for the duration of one playback run.
#[derive(Debug, Default)]
pub struct PlaybackSession {
    document: Option<LoadedDocument>,
    page_index: usize,
    full_text: String,
    cursor: usize,
    state: PlaybackState,
}

impl PlaybackSession {
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn transition(&mut self, to: PlaybackState) -> Result<(), PlaybackError> {
        let valid = matches!(
            (self.state, to),
            (PlaybackState::Idle, PlaybackState::Playing)
                | (PlaybackState::Playing, PlaybackState::Paused)
                | (PlaybackState::Playing, PlaybackState::Idle)
                | (PlaybackState::Paused, PlaybackState::Playing)
                | (PlaybackState::Paused, PlaybackState::Idle)
        );
        if !valid {
            return Err(PlaybackError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!("Playback transition: {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// Idle -> Playing with fresh text queued from offset 0.
    pub fn begin_run(&mut self, text: String) -> Result<(), PlaybackError> {
        self.transition(PlaybackState::Playing)?;
        self.full_text = text;
        self.cursor = 0;
        Ok(())
    }

    /// Playing -> Paused. The cursor keeps whatever the worker last
    /// reported; an in-flight utterance may still move it forward before
    /// the worker acknowledges the cancellation.
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        self.transition(PlaybackState::Paused)
    }

    /// Paused -> Playing, resuming at the current cursor.
    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        self.transition(PlaybackState::Playing)
    }

    /// Playing -> Idle after the worker's natural completion.
    pub fn finish_run(&mut self) -> Result<(), PlaybackError> {
        self.transition(PlaybackState::Idle)?;
        self.cursor = 0;
        self.full_text.clear();
        Ok(())
    }

    /// Forces Idle from any state; used by stop, document loads, and
    /// failure recovery.
    pub fn halt(&mut self) {
        if self.state != PlaybackState::Idle {
            tracing::debug!("Playback halted from {:?}", self.state);
        }
        self.state = PlaybackState::Idle;
        self.cursor = 0;
        self.full_text.clear();
    }

    /// Replaces the loaded document and resets the whole session.
    pub fn install_document(&mut self, document: LoadedDocument) {
        self.halt();
        self.page_index = 0;
        self.document = Some(document);
    }

    /// Moves the cursor to a worker-reported offset, clamped into the text.
    pub fn set_cursor(&mut self, offset: usize) {
        let clamped = offset.min(self.full_text.len());
        debug_assert!(self.full_text.is_char_boundary(clamped));
        self.cursor = clamped;
    }

    /// The page `delta` steps away, clamped to `[0, page_count - 1]`.
    /// Returns `None` when no document is loaded.
    pub fn clamped_page(&self, delta: i64) -> Option<usize> {
        let document = self.document.as_ref()?;
        let last = document.page_count.saturating_sub(1) as i64;
        let target = (self.page_index as i64).saturating_add(delta).clamp(0, last);
        Some(target as usize)
    }

    pub fn set_page(&mut self, page_index: usize) {
        debug_assert!(self
            .document
            .as_ref()
            .is_some_and(|d| page_index < d.page_count));
        self.page_index = page_index;
    }
}
