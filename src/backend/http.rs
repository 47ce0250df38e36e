//! Default REST implementation of the collaborator contracts.
//!
//! Thin JSON calls against the application backend; every method maps the
//! response status onto the engine error taxonomy so callers only ever see
//! typed failures.

use super::{
    AudioHandle, ProcessedTranscript, SpeechBackend, StudyStore, TranscriptBackend, TranslatedPage,
};
use crate::audio_cache::ContentKey;
use crate::error::{EngineError, Result};
use crate::subtitle::SavedLine;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

static SHARED_CLIENT: Lazy<Client> = Lazy::new(Client::new);

pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: SHARED_CLIENT.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map non-success statuses onto the error taxonomy before decoding.
    async fn check_status(response: Response, what: &str) -> Result<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(EngineError::SessionExpired),
            StatusCode::NOT_FOUND => Err(EngineError::NotFound {
                what: what.to_string(),
            }),
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(%status, what, "Backend returned non-success status");
                Err(EngineError::Fetch {
                    message: format!("{what}: status {status}: {body}"),
                })
            }
        }
    }
}

#[derive(Serialize)]
struct ProcessRequest<'a> {
    video_ref: &'a str,
    audio_language: &'a str,
    target_language: &'a str,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    text: &'a str,
    voice: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stable_key: Option<String>,
}

#[async_trait]
impl TranscriptBackend for HttpBackend {
    async fn process_transcript(
        &self,
        video_ref: &str,
        audio_lang: &str,
        target_lang: &str,
    ) -> Result<ProcessedTranscript> {
        debug!(video_ref, audio_lang, target_lang, "Requesting transcript processing");
        let response = self
            .client
            .post(self.url("/transcripts/process"))
            .json(&ProcessRequest {
                video_ref,
                audio_language: audio_lang,
                target_language: target_lang,
            })
            .send()
            .await?;
        let response = Self::check_status(response, "transcript processing").await?;
        Ok(response.json::<ProcessedTranscript>().await.map_err(|err| {
            EngineError::MalformedData {
                message: format!("transcript payload: {err}"),
            }
        })?)
    }

    async fn translate_page(
        &self,
        media_id: &str,
        source_lang: &str,
        target_lang: &str,
        page: u32,
    ) -> Result<TranslatedPage> {
        debug!(media_id, page, "Requesting translation page");
        let response = self
            .client
            .get(self.url(&format!("/transcripts/{media_id}/translation")))
            .query(&[
                ("source", source_lang),
                ("target", target_lang),
                ("page", &page.to_string()),
            ])
            .send()
            .await?;
        let response = Self::check_status(response, "translation page").await?;
        Ok(response.json::<TranslatedPage>().await.map_err(|err| {
            EngineError::MalformedData {
                message: format!("translation page payload: {err}"),
            }
        })?)
    }
}

#[async_trait]
impl SpeechBackend for HttpBackend {
    async fn generate_audio(
        &self,
        text: &str,
        voice: &str,
        key: Option<&ContentKey>,
    ) -> Result<AudioHandle> {
        debug!(voice, chars = text.len(), "Requesting speech generation");
        let response = self
            .client
            .post(self.url("/speech"))
            .json(&GenerateRequest {
                text,
                voice,
                stable_key: key.map(ContentKey::composite),
            })
            .send()
            .await?;
        let response = Self::check_status(response, "speech generation").await?;
        Ok(response.json::<AudioHandle>().await.map_err(|err| {
            EngineError::MalformedData {
                message: format!("speech handle payload: {err}"),
            }
        })?)
    }

    async fn fetch_audio_bytes(&self, handle: &AudioHandle) -> Result<Vec<u8>> {
        debug!(%handle, "Fetching audio bytes");
        let response = self
            .client
            .get(self.url(&format!("/speech/{handle}/audio")))
            .send()
            .await?;
        let response = Self::check_status(response, &format!("audio handle {handle}")).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl StudyStore for HttpBackend {
    async fn save_line(&self, line: &SavedLine) -> Result<()> {
        debug!(media_id = %line.media_id, timestamp = line.timestamp, "Saving line");
        let response = self
            .client
            .post(self.url("/study/lines"))
            .json(line)
            .send()
            .await?;
        Self::check_status(response, "saved line").await?;
        Ok(())
    }

    async fn mark_completed(&self, media_id: &str) -> Result<()> {
        debug!(media_id, "Marking lesson completed");
        let response = self
            .client
            .post(self.url(&format!("/study/{media_id}/complete")))
            .send()
            .await?;
        Self::check_status(response, "lesson completion").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let backend = HttpBackend::new("http://localhost:8080/api/v1/");
        assert_eq!(
            backend.url("/speech"),
            "http://localhost:8080/api/v1/speech"
        );
    }
}
