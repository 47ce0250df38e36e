//! Synchronized dual-subtitle playback engine for language learning.
//!
//! A learner watches a streamed video with two subtitle tracks overlaid: the
//! original transcription (loaded once, in full) and a translation that
//! arrives in pages as playback advances. This crate owns the parts with
//! real design pressure:
//!
//! - [`pager::TranscriptPager`] keeps translation coverage ahead of the
//!   playhead, one in-flight page at a time.
//! - [`view::SyncedTranscriptView`] resolves the active line on each track,
//!   drives auto-scroll around manual reading, and exposes seek/save/speak
//!   actions per line.
//! - [`audio_cache::AudioRequestCache`] deduplicates speech-synthesis
//!   requests behind stable content keys and persists the results across
//!   sessions.
//!
//! The UI shell, auth, and the transcription/translation/TTS services stay
//! outside, reached through the contracts in [`backend`] and
//! [`timeline::TimelineHandle`]. [`session::PlaybackSession`] is the driver
//! that wires one video session together on a tokio runtime.

pub mod audio_cache;
pub mod backend;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod logging;
pub mod pager;
pub mod session;
pub mod subtitle;
pub mod timeline;
pub mod view;

pub use audio_cache::{AudioClip, AudioRequestCache, ContentKey};
pub use backend::{AudioHandle, SpeechBackend, StudyStore, TranscriptBackend};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use pager::{PaginationState, TranscriptPager};
pub use session::{PlaybackSession, UiCommand};
pub use subtitle::{SavedLine, Subtitle, Track};
pub use timeline::TimelineHandle;
pub use view::{Effect, SyncedTranscriptView, TrackKind, ViewEvent};
