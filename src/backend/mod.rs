//! Collaborator contracts.
//!
//! The engine consumes three external services (transcription/translation,
//! speech synthesis, and the study store) through the traits below. Payload
//! shapes are the contract boundary; no wire protocol is owned here. The
//! default REST implementation lives in [`http`].

pub mod http;

use crate::audio_cache::ContentKey;
use crate::error::Result;
use crate::pager::PaginationState;
use crate::subtitle::{SavedLine, Subtitle, Track};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque token resolvable to a playable byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioHandle(pub String);

impl std::fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of the combined initial transcript call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedTranscript {
    pub transcription: Track,
    /// First translation page plus its pagination, when the backend produced
    /// a translation for the requested target language.
    pub translation: Option<TranslationPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationPayload {
    pub track: Track,
    pub pagination: PaginationState,
}

/// One page of translated subtitles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedPage {
    pub data: Vec<Subtitle>,
    pub pagination: PaginationState,
}

/// Transcription/translation service.
#[async_trait]
pub trait TranscriptBackend: Send + Sync {
    async fn process_transcript(
        &self,
        video_ref: &str,
        audio_lang: &str,
        target_lang: &str,
    ) -> Result<ProcessedTranscript>;

    async fn translate_page(
        &self,
        media_id: &str,
        source_lang: &str,
        target_lang: &str,
        page: u32,
    ) -> Result<TranslatedPage>;
}

/// Speech synthesis service.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn generate_audio(
        &self,
        text: &str,
        voice: &str,
        key: Option<&ContentKey>,
    ) -> Result<AudioHandle>;

    /// Fails with `NotFound` when the handle is unresolvable server-side.
    async fn fetch_audio_bytes(&self, handle: &AudioHandle) -> Result<Vec<u8>>;
}

/// Sentence/vocabulary bookmarking and lesson progress. Fire-and-forget from
/// the engine's perspective: failures are surfaced to the host, never retried.
#[async_trait]
pub trait StudyStore: Send + Sync {
    async fn save_line(&self, line: &SavedLine) -> Result<()>;

    async fn mark_completed(&self, media_id: &str) -> Result<()>;
}
