use crate::config::EngineConfig;
use crate::subtitle::Track;
use std::time::{Duration, Instant};

/// Load state of one transcript track, rendered by the host as-is.
///
/// `Unavailable` is terminal for the track it describes: the original track
/// is the primary artifact, so its loss blocks the learning view, while a
/// lost translation degrades the view to original-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptState {
    Loading,
    Ready,
    Unavailable,
}

/// Lifecycle of the single audio playback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioControl {
    Idle,
    Loading { index: usize, request_id: u64 },
    Playing { index: usize },
    Paused { index: usize },
}

/// State of one learning view: two tracks aligned to the playhead.
pub struct SyncedTranscriptView {
    pub(super) media_id: String,
    pub(super) voice: String,
    pub(super) scroll_suspend: Duration,
    pub(super) completion_threshold: f64,
    pub(super) max_tick_gap_seconds: f64,

    /// Loaded once, in full. The translation track lives in the pager and is
    /// passed into the reducer per call.
    pub(super) original: Track,
    pub(super) original_state: TranscriptState,
    pub(super) translation_state: TranscriptState,

    pub(super) active_original: Option<usize>,
    pub(super) active_translation: Option<usize>,

    /// Manual-scroll suspension deadline; auto-scroll resumes once the clock
    /// passes it. Restarted on every scroll event.
    pub(super) scroll_suspended_until: Option<Instant>,

    pub(super) audio: AudioControl,
    pub(super) audio_request_id: u64,

    // Per-lesson completion bookkeeping.
    pub(super) watched_seconds: f64,
    pub(super) last_position: Option<f64>,
    pub(super) completion_sent: bool,
}

impl SyncedTranscriptView {
    pub fn new(media_id: &str, config: &EngineConfig) -> Self {
        Self {
            media_id: media_id.to_string(),
            voice: config.voice.clone(),
            scroll_suspend: Duration::from_secs_f64(config.scroll_suspend_seconds.max(0.0)),
            completion_threshold: config.completion_threshold,
            max_tick_gap_seconds: config.max_tick_gap_seconds,
            original: Track::new("original"),
            original_state: TranscriptState::Loading,
            translation_state: TranscriptState::Loading,
            active_original: None,
            active_translation: None,
            scroll_suspended_until: None,
            audio: AudioControl::Idle,
            audio_request_id: 0,
            watched_seconds: 0.0,
            last_position: None,
            completion_sent: false,
        }
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn original(&self) -> &Track {
        &self.original
    }

    pub fn original_state(&self) -> TranscriptState {
        self.original_state
    }

    pub fn translation_state(&self) -> TranscriptState {
        self.translation_state
    }

    pub fn active_original(&self) -> Option<usize> {
        self.active_original
    }

    pub fn active_translation(&self) -> Option<usize> {
        self.active_translation
    }

    pub fn audio(&self) -> AudioControl {
        self.audio
    }

    pub fn watched_seconds(&self) -> f64 {
        self.watched_seconds
    }

    /// Install the fully-loaded original track.
    pub fn install_transcription(&mut self, track: Track) {
        self.original_state = if track.is_empty() {
            TranscriptState::Unavailable
        } else {
            TranscriptState::Ready
        };
        self.original = track;
    }

    /// The initial transcript fetch failed; the view renders a visible
    /// "transcription unavailable" state instead of silently showing nothing.
    pub fn transcription_unavailable(&mut self) {
        self.original_state = TranscriptState::Unavailable;
    }

    pub fn translation_ready(&mut self) {
        self.translation_state = TranscriptState::Ready;
    }

    /// Translation failed terminally; the view keeps serving the original
    /// track alone.
    pub fn translation_unavailable(&mut self) {
        self.translation_state = TranscriptState::Unavailable;
    }

    /// Whether auto-scroll is currently suspended by a manual scroll.
    pub fn scroll_suspended(&self, now: Instant) -> bool {
        self.scroll_suspended_until
            .is_some_and(|deadline| now < deadline)
    }

    /// Drop back to the idle toggle after a playback failure.
    pub(crate) fn reset_audio(&mut self) {
        self.audio = AudioControl::Idle;
    }

    pub(super) fn next_audio_request(&mut self, index: usize) -> u64 {
        self.audio_request_id = self.audio_request_id.wrapping_add(1);
        self.audio = AudioControl::Loading {
            index,
            request_id: self.audio_request_id,
        };
        self.audio_request_id
    }
}
