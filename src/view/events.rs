use crate::audio_cache::{AudioClip, ContentKey};
use crate::error::EngineError;
use crate::subtitle::SavedLine;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Original,
    Translation,
}

/// Inputs to the view reducer.
#[derive(Debug)]
pub enum ViewEvent {
    /// Periodic playhead sample from the timeline host.
    Tick {
        now: Instant,
        position: f64,
        playing: bool,
    },
    /// The learner scrolled a transcript list by hand.
    ManualScroll { now: Instant },
    /// The learner clicked a subtitle line.
    LineClicked { track: TrackKind, index: usize },
    /// The learner bookmarked an original line.
    SaveRequested { index: usize },
    /// The learner pressed the speaker control on an original line.
    PlayAudioRequested { index: usize },
    /// A speech resolve finished (delivered by the session driver).
    AudioResolved {
        index: usize,
        request_id: u64,
        result: Result<AudioClip, EngineError>,
    },
}

/// Commands the reducer asks the driver to perform.
#[derive(Debug)]
pub enum Effect {
    /// Jump the timeline and resume playback if it was paused.
    Seek { seconds: f64 },
    /// Let the pager decide whether the next translation page is due.
    EnsureCoverage { playhead: f64 },
    /// Bring a track's active line into view.
    ScrollTo { track: TrackKind, index: usize },
    /// Forward a bookmarked line to the study store.
    SaveLine(SavedLine),
    /// Resolve speech audio for a line through the shared cache.
    ResolveAudio {
        index: usize,
        request_id: u64,
        text: String,
        key: ContentKey,
    },
    /// Start playing a resolved clip, replacing any previous playback.
    StartPlayback { index: usize, clip: AudioClip },
    PausePlayback,
    ResumePlayback,
    StopPlayback,
    /// Report the lesson completed; emitted at most once per session.
    MarkCompleted,
    /// Transient, user-visible notification (audio/save failures).
    Notify { message: String },
}
