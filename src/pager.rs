//! Paginated retrieval of the translation track.
//!
//! The translation arrives in pages; the pager owns how far the retrieved
//! pages cover the timeline and requests the next page shortly before the
//! playhead reaches the edge of coverage, so network latency never opens a
//! visible gap during continuous playback.
//!
//! Pages are requested strictly in increasing order (page N+1 only after
//! page N is committed), so out-of-order arrival across pages cannot occur;
//! within a page the merge sort handles any disorder from the network layer.

use crate::backend::{TranscriptBackend, TranslatedPage, TranslationPayload};
use crate::error::{EngineError, Result};
use crate::subtitle::Track;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pagination bookkeeping for one translation track.
///
/// Invariants: `1 <= current_page <= total_pages`; `last_covered_timestamp`
/// equals the maximum `start + duration` across every line fetched so far,
/// or 0 before anything arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationState {
    pub current_page: u32,
    pub total_pages: u32,
    pub last_covered_timestamp: f64,
}

impl PaginationState {
    fn check(&self) -> Result<()> {
        if self.current_page < 1 || self.total_pages < 1 || self.current_page > self.total_pages {
            return Err(EngineError::MalformedData {
                message: format!(
                    "invalid pagination (current_page={}, total_pages={})",
                    self.current_page, self.total_pages
                ),
            });
        }
        Ok(())
    }
}

/// Owns the incrementally loaded translation track for one video session.
pub struct TranscriptPager {
    backend: Arc<dyn TranscriptBackend>,
    media_id: String,
    source_lang: String,
    target_lang: String,
    /// Look-ahead margin before the coverage edge at which the next page is
    /// requested.
    buffer_seconds: f64,
    track: Track,
    pagination: PaginationState,
    /// Page number currently being fetched, if any. At most one per track.
    in_flight: Option<u32>,
    /// Page whose fetch failed; cleared only by a manual retry. While set,
    /// `ensure_coverage` stays quiet so failures are never retried
    /// automatically.
    failed_page: Option<u32>,
    initialized: bool,
}

impl TranscriptPager {
    pub fn new(
        backend: Arc<dyn TranscriptBackend>,
        media_id: &str,
        source_lang: &str,
        target_lang: &str,
        buffer_seconds: f64,
    ) -> Self {
        Self {
            backend,
            media_id: media_id.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            buffer_seconds,
            track: Track::new(target_lang),
            pagination: PaginationState {
                current_page: 1,
                total_pages: 1,
                last_covered_timestamp: 0.0,
            },
            in_flight: None,
            failed_page: None,
            initialized: false,
        }
    }

    pub fn backend(&self) -> Arc<dyn TranscriptBackend> {
        Arc::clone(&self.backend)
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn in_flight(&self) -> Option<u32> {
        self.in_flight
    }

    pub fn failed_page(&self) -> Option<u32> {
        self.failed_page
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_exhausted(&self) -> bool {
        self.initialized && self.pagination.current_page >= self.pagination.total_pages
    }

    /// Install the first translation page delivered by the combined initial
    /// transcript call. `last_covered_timestamp` is recomputed from the
    /// merged lines rather than trusted from the wire.
    pub fn install_initial(&mut self, payload: TranslationPayload) -> Result<()> {
        payload.pagination.check()?;
        let track = Track::from_lines(&payload.track.source, payload.track.data)?;
        self.pagination = PaginationState {
            last_covered_timestamp: track.covered_until(),
            ..payload.pagination
        };
        self.track = track;
        self.in_flight = None;
        self.failed_page = None;
        self.initialized = true;
        info!(
            media_id = %self.media_id,
            lines = self.track.len(),
            total_pages = self.pagination.total_pages,
            covered = self.pagination.last_covered_timestamp,
            "Installed initial translation page"
        );
        Ok(())
    }

    /// Fetch page 1 directly, for sessions whose initial transcript call did
    /// not include a translation payload.
    pub async fn fetch_initial(&mut self) -> Result<()> {
        let page = self
            .backend
            .translate_page(&self.media_id, &self.source_lang, &self.target_lang, 1)
            .await?;
        self.install_initial(TranslationPayload {
            track: Track {
                source: self.target_lang.clone(),
                data: page.data,
            },
            pagination: page.pagination,
        })
    }

    /// Decide whether the playhead is close enough to the coverage edge to
    /// need the next page. Returns the page to fetch and reserves the
    /// in-flight slot for it; the caller must follow up with
    /// [`commit_page`](Self::commit_page) or
    /// [`fetch_failed`](Self::fetch_failed).
    ///
    /// A no-op while a fetch is outstanding, after a failure (manual retry
    /// only), and once every page is loaded, so repeated calls with the
    /// same playhead trigger at most one fetch.
    pub fn ensure_coverage(&mut self, playhead_seconds: f64) -> Option<u32> {
        if !self.initialized || self.in_flight.is_some() || self.failed_page.is_some() {
            return None;
        }
        if self.pagination.current_page >= self.pagination.total_pages {
            return None;
        }
        if playhead_seconds <= self.pagination.last_covered_timestamp - self.buffer_seconds {
            return None;
        }
        let next = self.pagination.current_page + 1;
        self.in_flight = Some(next);
        debug!(
            media_id = %self.media_id,
            page = next,
            playhead = playhead_seconds,
            covered = self.pagination.last_covered_timestamp,
            "Playhead near coverage edge; requesting next translation page"
        );
        Some(next)
    }

    /// Merge a fetched page. Committing an already-fetched page is a no-op,
    /// so duplicate deliveries can never corrupt the track.
    pub fn commit_page(&mut self, page: u32, payload: TranslatedPage) -> Result<()> {
        if self.in_flight == Some(page) {
            self.in_flight = None;
        }
        if page <= self.pagination.current_page {
            debug!(page, "Ignoring commit for already-fetched page");
            return Ok(());
        }
        payload.pagination.check()?;
        self.track.merge(payload.data)?;
        self.pagination = PaginationState {
            current_page: page,
            total_pages: payload.pagination.total_pages.max(page),
            last_covered_timestamp: self.track.covered_until(),
        };
        self.failed_page = None;
        info!(
            media_id = %self.media_id,
            page,
            covered = self.pagination.last_covered_timestamp,
            "Committed translation page"
        );
        Ok(())
    }

    /// Record a failed fetch. Pagination is left untouched (`current_page`
    /// only ever advances on success) and already-merged pages stay.
    pub fn fetch_failed(&mut self, page: u32) {
        if self.in_flight == Some(page) {
            self.in_flight = None;
        }
        warn!(media_id = %self.media_id, page, "Translation page fetch failed");
        self.failed_page = Some(page);
    }

    /// Manual retry of the failed page; reserves the in-flight slot again.
    pub fn retry_failed(&mut self) -> Option<u32> {
        let page = self.failed_page.take()?;
        self.in_flight = Some(page);
        info!(media_id = %self.media_id, page, "Retrying failed translation page");
        Some(page)
    }

    /// Inline fetch of the page reserved by [`ensure_coverage`] or
    /// [`retry_failed`]; hosts that want the fetch off the event loop spawn
    /// the backend call themselves and feed the result back through
    /// [`commit_page`] / [`fetch_failed`].
    pub async fn run_fetch(&mut self, page: u32) -> Result<()> {
        match self
            .backend
            .translate_page(&self.media_id, &self.source_lang, &self.target_lang, page)
            .await
        {
            Ok(payload) => self.commit_page(page, payload),
            Err(err) => {
                self.fetch_failed(page);
                Err(err)
            }
        }
    }

    /// Convenience for single-threaded hosts: decide and fetch in one await.
    pub async fn cover(&mut self, playhead_seconds: f64) -> Result<bool> {
        let Some(page) = self.ensure_coverage(playhead_seconds) else {
            return Ok(false);
        };
        self.run_fetch(page).await?;
        Ok(true)
    }
}
