//! One playback session: the driver wiring a view and a pager to the
//! collaborators.
//!
//! The host owns the UI loop and calls [`PlaybackSession::tick`] on a steady
//! cadence plus the interaction methods as the learner acts. All network
//! work runs on spawned tokio tasks; results come back through an internal
//! channel and are drained on the next tick, so every state transition stays
//! on the host thread. Late results are discarded by the session's
//! cancellation token and generation guard.

use crate::audio_cache::{AudioPlayback, AudioRequestCache};
use crate::backend::{ProcessedTranscript, StudyStore, TranscriptBackend, TranslatedPage, TranslationPayload};
use crate::cancellation::CancellationToken;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pager::TranscriptPager;
use crate::subtitle::Track;
use crate::timeline::TimelineHandle;
use crate::view::{Effect, SyncedTranscriptView, TrackKind, ViewEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Commands the host UI must act on after a tick or interaction.
#[derive(Debug, PartialEq)]
pub enum UiCommand {
    ScrollTo { track: TrackKind, index: usize },
    Notify { message: String },
    /// The auth collaborator wants re-authentication; propagated, not handled.
    SessionExpired,
}

enum SessionEvent {
    TranscriptLoaded {
        generation: u64,
        result: Result<ProcessedTranscript>,
    },
    PageFetched {
        generation: u64,
        page: u32,
        result: Result<TranslatedPage>,
    },
    AudioResolved {
        index: usize,
        request_id: u64,
        result: Result<crate::audio_cache::AudioClip>,
    },
    SaveFinished {
        timestamp: f64,
        result: Result<()>,
    },
    CompletionMarked {
        result: Result<()>,
    },
}

pub struct PlaybackSession {
    config: EngineConfig,
    media_id: String,
    audio_lang: String,
    target_lang: String,

    view: SyncedTranscriptView,
    pager: Option<TranscriptPager>,

    transcripts: Arc<dyn TranscriptBackend>,
    audio_cache: Arc<AudioRequestCache>,
    store: Arc<dyn StudyStore>,
    timeline: Box<dyn TimelineHandle>,

    /// The single active playback slot; replaced (and thereby released)
    /// whenever a new clip starts, dropped on teardown.
    playback: Option<AudioPlayback>,

    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    generation: u64,
    cancel: CancellationToken,
    runtime: tokio::runtime::Handle,
}

impl PlaybackSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        media_id: &str,
        audio_lang: &str,
        target_lang: &str,
        transcripts: Arc<dyn TranscriptBackend>,
        audio_cache: Arc<AudioRequestCache>,
        store: Arc<dyn StudyStore>,
        timeline: Box<dyn TimelineHandle>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let view = SyncedTranscriptView::new(media_id, &config);
        Self {
            config,
            media_id: media_id.to_string(),
            audio_lang: audio_lang.to_string(),
            target_lang: target_lang.to_string(),
            view,
            pager: None,
            transcripts,
            audio_cache,
            store,
            timeline,
            playback: None,
            events_tx,
            events_rx,
            generation: 0,
            cancel: CancellationToken::new(),
            runtime,
        }
    }

    pub fn view(&self) -> &SyncedTranscriptView {
        &self.view
    }

    pub fn translation_track(&self) -> Option<&Track> {
        self.pager.as_ref().map(TranscriptPager::track)
    }

    pub fn translation_failed_page(&self) -> Option<u32> {
        self.pager.as_ref().and_then(TranscriptPager::failed_page)
    }

    /// Kick off the combined initial transcript fetch.
    pub fn start(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let tx = self.events_tx.clone();
        let cancel = self.cancel.clone();
        let backend = Arc::clone(&self.transcripts);
        let media_id = self.media_id.clone();
        let audio_lang = self.audio_lang.clone();
        let target_lang = self.target_lang.clone();
        info!(media_id = %self.media_id, "Starting playback session");
        self.runtime.spawn(async move {
            if cancel.is_cancelled() {
                return;
            }
            let result = backend
                .process_transcript(&media_id, &audio_lang, &target_lang)
                .await;
            // Discard results arriving after navigation.
            if cancel.check_cancelled("initial-fetch").is_err() {
                return;
            }
            let _ = tx.send(SessionEvent::TranscriptLoaded { generation, result });
        });
    }

    /// Drain completed background work, sample the timeline, and run the
    /// reducer. Call on a steady cadence from the UI loop.
    pub fn tick(&mut self, now: Instant) -> Vec<UiCommand> {
        let mut commands = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_session_event(event, &mut commands);
        }

        let position = self.timeline.position();
        let playing = !self.timeline.is_paused();
        let effects = self.view.handle(
            ViewEvent::Tick {
                now,
                position,
                playing,
            },
            self.pager.as_ref().map(TranscriptPager::track),
        );
        self.execute(effects, &mut commands);
        commands
    }

    pub fn line_clicked(&mut self, track: TrackKind, index: usize) -> Vec<UiCommand> {
        self.run_view_event(ViewEvent::LineClicked { track, index })
    }

    pub fn save_line(&mut self, index: usize) -> Vec<UiCommand> {
        self.run_view_event(ViewEvent::SaveRequested { index })
    }

    pub fn play_line_audio(&mut self, index: usize) -> Vec<UiCommand> {
        self.run_view_event(ViewEvent::PlayAudioRequested { index })
    }

    pub fn manual_scroll(&mut self, now: Instant) -> Vec<UiCommand> {
        self.run_view_event(ViewEvent::ManualScroll { now })
    }

    /// Manual retry for a failed translation page fetch.
    pub fn retry_translation(&mut self) {
        if let Some(pager) = self.pager.as_mut() {
            if let Some(page) = pager.retry_failed() {
                self.spawn_page_fetch(page);
            }
        }
    }

    /// Cancel in-flight fetches and release the playback slot. Also runs on
    /// drop; explicit teardown lets hosts sequence it before navigation.
    pub fn teardown(&mut self) {
        info!(media_id = %self.media_id, "Tearing down playback session");
        self.cancel.cancel();
        self.playback = None;
    }

    fn run_view_event(&mut self, event: ViewEvent) -> Vec<UiCommand> {
        let mut commands = Vec::new();
        let effects = self
            .view
            .handle(event, self.pager.as_ref().map(TranscriptPager::track));
        self.execute(effects, &mut commands);
        commands
    }

    fn handle_session_event(&mut self, event: SessionEvent, commands: &mut Vec<UiCommand>) {
        match event {
            SessionEvent::TranscriptLoaded { generation, result } => {
                if generation != self.generation {
                    debug!(generation, "Dropping stale transcript result");
                    return;
                }
                self.on_transcript_loaded(result, commands);
            }
            SessionEvent::PageFetched {
                generation,
                page,
                result,
            } => {
                if generation != self.generation {
                    debug!(generation, page, "Dropping stale page result");
                    return;
                }
                self.on_page_fetched(page, result, commands);
            }
            SessionEvent::AudioResolved {
                index,
                request_id,
                result,
            } => {
                let effects = self.view.handle(
                    ViewEvent::AudioResolved {
                        index,
                        request_id,
                        result,
                    },
                    self.pager.as_ref().map(TranscriptPager::track),
                );
                self.execute(effects, commands);
            }
            SessionEvent::SaveFinished { timestamp, result } => {
                if let Err(err) = result {
                    warn!(timestamp, "Saving line failed: {err}");
                    self.push_error(err, "Could not save the line", commands);
                }
            }
            SessionEvent::CompletionMarked { result } => {
                // Fire-and-forget; a lost completion mark is only logged.
                if let Err(err) = result {
                    warn!(media_id = %self.media_id, "Marking lesson completed failed: {err}");
                }
            }
        }
    }

    fn on_transcript_loaded(
        &mut self,
        result: Result<ProcessedTranscript>,
        commands: &mut Vec<UiCommand>,
    ) {
        let processed = match result {
            Ok(processed) => processed,
            Err(err) => {
                // The original track is the primary artifact; this blocks the view.
                self.view.transcription_unavailable();
                self.push_error(err, "Transcription unavailable", commands);
                return;
            }
        };

        match Track::from_lines(&processed.transcription.source, processed.transcription.data) {
            Ok(track) => self.view.install_transcription(track),
            Err(err) => {
                self.view.transcription_unavailable();
                self.push_error(err, "Transcription unavailable", commands);
                return;
            }
        }

        let mut pager = TranscriptPager::new(
            Arc::clone(&self.transcripts),
            &self.media_id,
            &self.audio_lang,
            &self.target_lang,
            self.config.buffer_seconds,
        );
        match processed.translation {
            Some(payload) => match pager.install_initial(payload) {
                Ok(()) => self.view.translation_ready(),
                Err(err) => {
                    self.view.translation_unavailable();
                    self.push_error(err, "Translation unavailable", commands);
                }
            },
            None => {
                // No translation in the combined payload; fetch page 1 directly.
                self.spawn_initial_page_fetch();
            }
        }
        self.pager = Some(pager);
    }

    fn on_page_fetched(
        &mut self,
        page: u32,
        result: Result<TranslatedPage>,
        commands: &mut Vec<UiCommand>,
    ) {
        let target_lang = self.target_lang.clone();
        let Some(pager) = self.pager.as_mut() else {
            return;
        };
        match result {
            Ok(payload) => {
                let outcome = if pager.is_initialized() {
                    pager.commit_page(page, payload)
                } else {
                    pager.install_initial(TranslationPayload {
                        track: Track {
                            source: target_lang,
                            data: payload.data,
                        },
                        pagination: payload.pagination,
                    })
                };
                match outcome {
                    Ok(()) => self.view.translation_ready(),
                    Err(err) => {
                        if page == 1 {
                            self.view.translation_unavailable();
                        }
                        self.push_error(err, "Translation unavailable", commands);
                    }
                }
            }
            Err(err) => {
                pager.fetch_failed(page);
                if page == 1 && !pager.is_initialized() {
                    // Nothing was ever loaded; the track is terminally absent.
                    self.view.translation_unavailable();
                    self.push_error(err, "Translation unavailable", commands);
                } else {
                    self.push_error(err, "Could not load more of the translation", commands);
                }
            }
        }
    }

    fn execute(&mut self, effects: Vec<Effect>, commands: &mut Vec<UiCommand>) {
        for effect in effects {
            match effect {
                Effect::Seek { seconds } => {
                    self.timeline.seek(seconds);
                    // Clicking a line means "jump and play".
                    if self.timeline.is_paused() {
                        self.timeline.resume();
                    }
                }
                Effect::EnsureCoverage { playhead } => {
                    if let Some(pager) = self.pager.as_mut() {
                        if let Some(page) = pager.ensure_coverage(playhead) {
                            self.spawn_page_fetch(page);
                        }
                    }
                }
                Effect::ScrollTo { track, index } => {
                    commands.push(UiCommand::ScrollTo { track, index });
                }
                Effect::SaveLine(line) => {
                    let store = Arc::clone(&self.store);
                    let tx = self.events_tx.clone();
                    let cancel = self.cancel.clone();
                    self.runtime.spawn(async move {
                        let result = store.save_line(&line).await;
                        if cancel.is_cancelled() {
                            return;
                        }
                        let _ = tx.send(SessionEvent::SaveFinished {
                            timestamp: line.timestamp,
                            result,
                        });
                    });
                }
                Effect::ResolveAudio {
                    index,
                    request_id,
                    text,
                    key,
                } => {
                    let cache = Arc::clone(&self.audio_cache);
                    let tx = self.events_tx.clone();
                    let cancel = self.cancel.clone();
                    let voice = self.config.voice.clone();
                    self.runtime.spawn(async move {
                        let result = cache.resolve(&text, &voice, Some(&key)).await;
                        if cancel.is_cancelled() {
                            return;
                        }
                        let _ = tx.send(SessionEvent::AudioResolved {
                            index,
                            request_id,
                            result,
                        });
                    });
                }
                Effect::StartPlayback { index, clip } => {
                    // Replacing the slot drops (and releases) the old playback.
                    match AudioPlayback::start(&clip, index, self.config.playback_volume) {
                        Ok(playback) => self.playback = Some(playback),
                        Err(err) => {
                            self.view.reset_audio();
                            self.push_error(err, "Audio playback failed", commands);
                        }
                    }
                }
                Effect::PausePlayback => {
                    if let Some(playback) = self.playback.as_ref() {
                        playback.pause();
                    }
                }
                Effect::ResumePlayback => {
                    if let Some(playback) = self.playback.as_ref() {
                        playback.play();
                    }
                }
                Effect::StopPlayback => {
                    self.playback = None;
                }
                Effect::MarkCompleted => {
                    let store = Arc::clone(&self.store);
                    let tx = self.events_tx.clone();
                    let media_id = self.media_id.clone();
                    self.runtime.spawn(async move {
                        let result = store.mark_completed(&media_id).await;
                        let _ = tx.send(SessionEvent::CompletionMarked { result });
                    });
                }
                Effect::Notify { message } => {
                    commands.push(UiCommand::Notify { message });
                }
            }
        }
    }

    fn spawn_initial_page_fetch(&mut self) {
        self.spawn_page_fetch(1);
    }

    fn spawn_page_fetch(&self, page: u32) {
        let generation = self.generation;
        let tx = self.events_tx.clone();
        let cancel = self.cancel.clone();
        let backend = Arc::clone(&self.transcripts);
        let media_id = self.media_id.clone();
        let source_lang = self.audio_lang.clone();
        let target_lang = self.target_lang.clone();
        self.runtime.spawn(async move {
            if cancel.is_cancelled() {
                return;
            }
            let result = backend
                .translate_page(&media_id, &source_lang, &target_lang, page)
                .await;
            if cancel.check_cancelled("page-fetch").is_err() {
                return;
            }
            let _ = tx.send(SessionEvent::PageFetched {
                generation,
                page,
                result,
            });
        });
    }

    fn push_error(&self, err: EngineError, context: &str, commands: &mut Vec<UiCommand>) {
        if matches!(err, EngineError::SessionExpired) {
            commands.push(UiCommand::SessionExpired);
            return;
        }
        commands.push(UiCommand::Notify {
            message: format!("{context}: {err}"),
        });
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_cache::ContentKey;
    use crate::backend::{AudioHandle, SpeechBackend};
    use crate::pager::PaginationState;
    use crate::subtitle::{SavedLine, Subtitle};
    use crate::timeline::ManualTimeline;
    use crate::view::TranscriptState;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeWorld {
        page_fetches: AtomicUsize,
        saved: Mutex<Vec<SavedLine>>,
        completed: AtomicUsize,
        initial_delay: Duration,
        fail_initial: bool,
        fail_page: Option<u32>,
    }

    impl FakeWorld {
        fn new() -> Self {
            Self {
                page_fetches: AtomicUsize::new(0),
                saved: Mutex::new(Vec::new()),
                completed: AtomicUsize::new(0),
                initial_delay: Duration::ZERO,
                fail_initial: false,
                fail_page: None,
            }
        }

        fn lines(base: f64, count: usize, prefix: &str) -> Vec<Subtitle> {
            (0..count)
                .map(|i| Subtitle::new(base + i as f64 * 50.0, 50.0, &format!("{prefix}-{i}")))
                .collect()
        }
    }

    #[async_trait]
    impl TranscriptBackend for FakeWorld {
        async fn process_transcript(
            &self,
            _video_ref: &str,
            _audio_lang: &str,
            _target_lang: &str,
        ) -> Result<ProcessedTranscript> {
            if !self.initial_delay.is_zero() {
                tokio::time::sleep(self.initial_delay).await;
            }
            if self.fail_initial {
                return Err(EngineError::Fetch {
                    message: "processing failed".to_string(),
                });
            }
            Ok(ProcessedTranscript {
                transcription: Track {
                    source: "es".to_string(),
                    data: Self::lines(0.0, 9, "es"),
                },
                translation: Some(TranslationPayload {
                    track: Track {
                        source: "en".to_string(),
                        data: Self::lines(0.0, 3, "en"),
                    },
                    pagination: PaginationState {
                        current_page: 1,
                        total_pages: 3,
                        last_covered_timestamp: 150.0,
                    },
                }),
            })
        }

        async fn translate_page(
            &self,
            _media_id: &str,
            _source_lang: &str,
            _target_lang: &str,
            page: u32,
        ) -> Result<TranslatedPage> {
            self.page_fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_page == Some(page) {
                return Err(EngineError::Fetch {
                    message: format!("page {page} unavailable"),
                });
            }
            Ok(TranslatedPage {
                data: Self::lines((page - 1) as f64 * 150.0, 3, "en"),
                pagination: PaginationState {
                    current_page: page,
                    total_pages: 3,
                    last_covered_timestamp: page as f64 * 150.0,
                },
            })
        }
    }

    #[async_trait]
    impl SpeechBackend for FakeWorld {
        async fn generate_audio(
            &self,
            _text: &str,
            _voice: &str,
            _key: Option<&ContentKey>,
        ) -> Result<AudioHandle> {
            Ok(AudioHandle("h".to_string()))
        }

        async fn fetch_audio_bytes(&self, handle: &AudioHandle) -> Result<Vec<u8>> {
            Err(EngineError::NotFound {
                what: handle.to_string(),
            })
        }
    }

    #[async_trait]
    impl StudyStore for FakeWorld {
        async fn save_line(&self, line: &SavedLine) -> Result<()> {
            self.saved.lock().unwrap().push(line.clone());
            Ok(())
        }

        async fn mark_completed(&self, _media_id: &str) -> Result<()> {
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session_with(
        world: Arc<FakeWorld>,
        timeline: ManualTimeline,
        cache_dir: &std::path::Path,
    ) -> PlaybackSession {
        let cache = Arc::new(AudioRequestCache::new(world.clone(), cache_dir, 16));
        PlaybackSession::new(
            EngineConfig::default(),
            "media-1",
            "es",
            "en",
            world.clone(),
            cache,
            world,
            Box::new(timeline),
            tokio::runtime::Handle::current(),
        )
    }

    async fn settle(session: &mut PlaybackSession) -> Vec<UiCommand> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.tick(Instant::now())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_installs_both_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let world = Arc::new(FakeWorld::new());
        let mut session = session_with(world, ManualTimeline::new(), dir.path());

        session.start();
        settle(&mut session).await;

        assert_eq!(session.view().original_state(), TranscriptState::Ready);
        assert_eq!(session.view().translation_state(), TranscriptState::Ready);
        assert_eq!(session.translation_track().unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn playhead_near_coverage_edge_fetches_next_page() {
        let dir = tempfile::tempdir().unwrap();
        let world = Arc::new(FakeWorld::new());
        let timeline = ManualTimeline::new();
        let mut session = session_with(world.clone(), timeline.clone(), dir.path());

        session.start();
        settle(&mut session).await;

        // Covered until 150 with a 30s buffer: 100 stays quiet, 125 fetches.
        timeline.set_position(100.0);
        settle(&mut session).await;
        assert_eq!(world.page_fetches.load(Ordering::SeqCst), 0);

        timeline.set_position(125.0);
        settle(&mut session).await;
        settle(&mut session).await;
        assert_eq!(world.page_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(session.translation_track().unwrap().len(), 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn clicking_a_line_seeks_and_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let world = Arc::new(FakeWorld::new());
        let timeline = ManualTimeline::new();
        timeline.pause();
        let mut session = session_with(world, timeline.clone(), dir.path());

        session.start();
        settle(&mut session).await;

        session.line_clicked(TrackKind::Original, 1);
        assert_eq!(timeline.position(), 50.0);
        assert!(!timeline.is_paused(), "seeking a line must also resume playback");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn saving_a_line_reaches_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let world = Arc::new(FakeWorld::new());
        let mut session = session_with(world.clone(), ManualTimeline::new(), dir.path());

        session.start();
        settle(&mut session).await;

        session.save_line(1);
        settle(&mut session).await;

        let saved = world.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].original.text, "es-1");
        assert_eq!(saved[0].translation.as_ref().unwrap().text, "en-1");
        assert_eq!(saved[0].timestamp, 50.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_audio_resolve_notifies_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let world = Arc::new(FakeWorld::new());
        let mut session = session_with(world, ManualTimeline::new(), dir.path());

        session.start();
        settle(&mut session).await;

        session.play_line_audio(0);
        let commands = settle(&mut session).await;
        assert!(
            commands
                .iter()
                .any(|c| matches!(c, UiCommand::Notify { message } if message.contains("Audio"))),
            "audio failure must surface a transient notification"
        );
        assert_eq!(session.view().audio(), crate::view::AudioControl::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_page_fetch_waits_for_manual_retry() {
        let dir = tempfile::tempdir().unwrap();
        let world = Arc::new(FakeWorld {
            fail_page: Some(2),
            ..FakeWorld::new()
        });
        let timeline = ManualTimeline::new();
        let mut session = session_with(world.clone(), timeline.clone(), dir.path());

        session.start();
        settle(&mut session).await;
        timeline.set_position(125.0);
        let commands = settle(&mut session).await;
        let commands = if commands.is_empty() {
            settle(&mut session).await
        } else {
            commands
        };
        assert!(commands.iter().any(|c| matches!(c, UiCommand::Notify { .. })));
        assert_eq!(session.translation_failed_page(), Some(2));

        // No automatic retry while the playhead keeps advancing.
        let fetches = world.page_fetches.load(Ordering::SeqCst);
        timeline.set_position(140.0);
        settle(&mut session).await;
        assert_eq!(world.page_fetches.load(Ordering::SeqCst), fetches);

        session.retry_translation();
        settle(&mut session).await;
        assert_eq!(world.page_fetches.load(Ordering::SeqCst), fetches + 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn teardown_discards_late_results() {
        let dir = tempfile::tempdir().unwrap();
        let world = Arc::new(FakeWorld {
            initial_delay: Duration::from_millis(30),
            ..FakeWorld::new()
        });
        let mut session = session_with(world, ManualTimeline::new(), dir.path());

        session.start();
        session.teardown();
        tokio::time::sleep(Duration::from_millis(80)).await;
        session.tick(Instant::now());

        assert_eq!(
            session.view().original_state(),
            TranscriptState::Loading,
            "a cancelled session must not commit late results"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_initial_fetch_blocks_the_view() {
        let dir = tempfile::tempdir().unwrap();
        let world = Arc::new(FakeWorld {
            fail_initial: true,
            ..FakeWorld::new()
        });
        let mut session = session_with(world, ManualTimeline::new(), dir.path());

        session.start();
        let commands = settle(&mut session).await;

        assert_eq!(session.view().original_state(), TranscriptState::Unavailable);
        assert!(commands.iter().any(
            |c| matches!(c, UiCommand::Notify { message } if message.contains("Transcription"))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn watching_to_the_end_marks_completion_once() {
        let dir = tempfile::tempdir().unwrap();
        let world = Arc::new(FakeWorld::new());
        let timeline = ManualTimeline::new();
        let mut session = session_with(world.clone(), timeline.clone(), dir.path());

        session.start();
        settle(&mut session).await;

        // Original extent is 450s; walk the playhead past 90% of it.
        let mut position = 0.0;
        while position < 440.0 {
            position += 1.5;
            timeline.set_position(position);
            session.tick(Instant::now());
        }
        settle(&mut session).await;
        assert_eq!(world.completed.load(Ordering::SeqCst), 1);
    }
}
