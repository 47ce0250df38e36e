//! Content-keyed cache for generated speech audio.
//!
//! One instance is shared process-wide: the same sentence requested from any
//! view resolves to the same generated audio without a second synthesis
//! call. Entries persist across sessions under the configured cache
//! directory: a tiny TOML index plus one payload file per key, named by a
//! hash of the key so filenames stay filesystem-safe.
//!
//! Eviction policy: the index is bounded to `max_entries`; past the bound
//! the least-recently-used entry (failure sentinels included) is dropped
//! together with its payload file.

use crate::backend::{AudioHandle, SpeechBackend};
use crate::error::{EngineError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Stable identity of one generated utterance.
///
/// An explicit composite, not a hash of rendered text: two distinct lines can
/// never collide. Hashing appears only in [`ContentKey::file_stem`] to derive
/// a filesystem-safe payload name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentKey {
    pub media_id: String,
    pub line_index: usize,
    pub voice: String,
}

impl ContentKey {
    pub fn new(media_id: &str, line_index: usize, voice: &str) -> Self {
        Self {
            media_id: media_id.to_string(),
            line_index,
            voice: voice.to_string(),
        }
    }

    pub fn composite(&self) -> String {
        format!("{}:{}:{}", self.media_id, self.line_index, self.voice)
    }

    fn file_stem(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.composite().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A resolved utterance: the backend's handle plus its playable bytes.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub handle: AudioHandle,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Ready(AudioHandle),
    /// Generation or byte retrieval failed terminally; do not retry without
    /// an explicit force.
    Failed,
}

#[derive(Debug)]
struct CacheEntry {
    slot: Slot,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<ContentKey, CacheEntry>,
    /// Monotonic use counter backing the LRU order.
    tick: u64,
}

pub struct AudioRequestCache {
    speech: Arc<dyn SpeechBackend>,
    dir: PathBuf,
    max_entries: usize,
    state: Mutex<CacheState>,
    /// Per-key guards serializing concurrent resolves of the same content.
    flights: tokio::sync::Mutex<HashMap<ContentKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl AudioRequestCache {
    pub fn new(speech: Arc<dyn SpeechBackend>, dir: &Path, max_entries: usize) -> Self {
        let cache = Self {
            speech,
            dir: dir.to_path_buf(),
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState::default()),
            flights: tokio::sync::Mutex::new(HashMap::new()),
        };
        if let Err(err) = cache.load_index() {
            warn!("Failed to load audio cache index: {err:#}");
        }
        cache
    }

    /// Resolve a playable clip for `text` spoken by `voice`.
    ///
    /// With a key: a cached handle (or failure sentinel) wins before any
    /// network call; a fresh generation is stored under the key. Without a
    /// key there is no identity to deduplicate on, so the call goes straight
    /// to the backend.
    pub async fn resolve(
        &self,
        text: &str,
        voice: &str,
        key: Option<&ContentKey>,
    ) -> Result<AudioClip> {
        let Some(key) = key else {
            let handle = self.speech.generate_audio(text, voice, None).await?;
            let bytes = self.fetch_bytes(&handle).await?;
            return Ok(AudioClip {
                handle,
                bytes: bytes.into(),
            });
        };

        let guard = self.flight_guard(key).await;
        let result = {
            let _flight = guard.lock().await;
            self.resolve_keyed(text, voice, key).await
        };
        drop(guard);
        self.release_flight(key).await;
        result
    }

    /// Resolve ignoring a previous failure sentinel: the entry (and any stale
    /// payload) is dropped first, then generation runs as on a miss.
    pub async fn resolve_forced(
        &self,
        text: &str,
        voice: &str,
        key: &ContentKey,
    ) -> Result<AudioClip> {
        let guard = self.flight_guard(key).await;
        let result = {
            let _flight = guard.lock().await;
            info!(key = %key.composite(), "Forcing audio regeneration");
            self.remove_entry(key);
            self.resolve_keyed(text, voice, key).await
        };
        drop(guard);
        self.release_flight(key).await;
        result
    }

    async fn resolve_keyed(&self, text: &str, voice: &str, key: &ContentKey) -> Result<AudioClip> {
        match self.lookup(key) {
            Some(Slot::Failed) => {
                debug!(key = %key.composite(), "Hit failure sentinel");
                return Err(EngineError::AudioFailed);
            }
            Some(Slot::Ready(handle)) => {
                if let Some(bytes) = self.read_payload(key) {
                    debug!(key = %key.composite(), "Audio cache hit");
                    return Ok(AudioClip {
                        handle,
                        bytes: bytes.into(),
                    });
                }
                // Payload lost (evicted elsewhere or cleared by the OS);
                // the handle is still valid, so only the bytes are re-fetched.
                debug!(key = %key.composite(), "Cache hit without payload; re-fetching bytes");
                return self.fetch_and_store(key, handle).await;
            }
            None => {}
        }

        let handle = self
            .speech
            .generate_audio(text, voice, Some(key))
            .await?;
        self.insert(key, Slot::Ready(handle.clone()));
        self.fetch_and_store(key, handle).await
    }

    /// Byte retrieval for an already-generated handle. `NotFound` is terminal
    /// for this key and stores the sentinel; transient failures leave the
    /// handle cached so the next attempt skips regeneration.
    async fn fetch_and_store(&self, key: &ContentKey, handle: AudioHandle) -> Result<AudioClip> {
        match self.fetch_bytes(&handle).await {
            Ok(bytes) => {
                self.write_payload(key, &bytes);
                Ok(AudioClip {
                    handle,
                    bytes: bytes.into(),
                })
            }
            Err(EngineError::NotFound { what }) => {
                warn!(key = %key.composite(), "Generated handle unresolvable; storing sentinel");
                self.insert(key, Slot::Failed);
                Err(EngineError::NotFound { what })
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_bytes(&self, handle: &AudioHandle) -> Result<Vec<u8>> {
        match self.speech.fetch_audio_bytes(handle).await {
            Ok(bytes) => Ok(bytes),
            Err(EngineError::NotFound { what }) => Err(EngineError::NotFound { what }),
            Err(err) => Err(EngineError::AudioBytes {
                message: err.to_string(),
            }),
        }
    }

    fn lookup(&self, key: &ContentKey) -> Option<Slot> {
        let mut state = self.state.lock().expect("cache lock poisoned");
        state.tick += 1;
        let tick = state.tick;
        state.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            entry.slot.clone()
        })
    }

    fn insert(&self, key: &ContentKey, slot: Slot) {
        let evicted = {
            let mut state = self.state.lock().expect("cache lock poisoned");
            state.tick += 1;
            let tick = state.tick;
            state.entries.insert(
                key.clone(),
                CacheEntry {
                    slot,
                    last_used: tick,
                },
            );
            evict_over_bound(&mut state, self.max_entries)
        };
        for old in &evicted {
            debug!(key = %old.composite(), "Evicting least-recently-used audio entry");
            remove_file_logged(&self.payload_path(old));
        }
        self.persist_index();
    }

    fn remove_entry(&self, key: &ContentKey) {
        let removed = {
            let mut state = self.state.lock().expect("cache lock poisoned");
            state.entries.remove(key).is_some()
        };
        if removed {
            remove_file_logged(&self.payload_path(key));
            self.persist_index();
        }
    }

    fn payload_path(&self, key: &ContentKey) -> PathBuf {
        self.dir.join(format!("aud-{}.bin", key.file_stem()))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.toml")
    }

    fn read_payload(&self, key: &ContentKey) -> Option<Vec<u8>> {
        fs::read(self.payload_path(key)).ok().filter(|b| !b.is_empty())
    }

    fn write_payload(&self, key: &ContentKey, bytes: &[u8]) {
        let path = self.payload_path(key);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(err) = fs::write(&path, bytes) {
            // Persistence is best-effort; the clip in hand is still playable.
            warn!(path = %path.display(), "Failed to write audio payload: {err}");
        }
    }

    async fn flight_guard(&self, key: &ContentKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut flights = self.flights.lock().await;
        flights.entry(key.clone()).or_default().clone()
    }

    async fn release_flight(&self, key: &ContentKey) {
        let mut flights = self.flights.lock().await;
        if let Some(guard) = flights.get(key) {
            if Arc::strong_count(guard) == 1 {
                flights.remove(key);
            }
        }
    }

    fn load_index(&self) -> anyhow::Result<()> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(());
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let index: PersistedIndex =
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;

        let mut state = self.state.lock().expect("cache lock poisoned");
        for persisted in index.entries {
            state.tick = state.tick.max(persisted.last_used);
            let slot = match persisted.handle {
                Some(handle) if !persisted.failed => Slot::Ready(AudioHandle(handle)),
                _ => Slot::Failed,
            };
            state.entries.insert(
                ContentKey {
                    media_id: persisted.media_id,
                    line_index: persisted.line_index,
                    voice: persisted.voice,
                },
                CacheEntry {
                    slot,
                    last_used: persisted.last_used,
                },
            );
        }
        info!(entries = state.entries.len(), "Loaded audio cache index");
        Ok(())
    }

    /// Best-effort index write; a failed write only costs cache warmth on the
    /// next start.
    fn persist_index(&self) {
        let index = {
            let state = self.state.lock().expect("cache lock poisoned");
            PersistedIndex {
                entries: state
                    .entries
                    .iter()
                    .map(|(key, entry)| PersistedEntry {
                        media_id: key.media_id.clone(),
                        line_index: key.line_index,
                        voice: key.voice.clone(),
                        handle: match &entry.slot {
                            Slot::Ready(handle) => Some(handle.0.clone()),
                            Slot::Failed => None,
                        },
                        failed: entry.slot == Slot::Failed,
                        last_used: entry.last_used,
                    })
                    .collect(),
            }
        };
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), "Failed to create audio cache dir: {err}");
            return;
        }
        match toml::to_string(&index) {
            Ok(contents) => {
                if let Err(err) = fs::write(self.index_path(), contents) {
                    warn!("Failed to write audio cache index: {err}");
                }
            }
            Err(err) => warn!("Failed to serialize audio cache index: {err}"),
        }
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.state.lock().expect("cache lock poisoned").entries.len()
    }
}

fn evict_over_bound(state: &mut CacheState, max_entries: usize) -> Vec<ContentKey> {
    let mut evicted = Vec::new();
    while state.entries.len() > max_entries {
        let Some(oldest) = state
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())
        else {
            break;
        };
        state.entries.remove(&oldest);
        evicted.push(oldest);
    }
    evicted
}

fn remove_file_logged(path: &Path) {
    if path.exists() {
        if let Err(err) = fs::remove_file(path) {
            warn!(path = %path.display(), "Failed to remove audio payload: {err}");
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct PersistedIndex {
    #[serde(default)]
    entries: Vec<PersistedEntry>,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    media_id: String,
    line_index: usize,
    voice: String,
    #[serde(default)]
    handle: Option<String>,
    #[serde(default)]
    failed: bool,
    #[serde(default)]
    last_used: u64,
}

/// One active playback of a resolved clip; dropping it releases the output
/// stream and sink.
pub struct AudioPlayback {
    _stream: rodio::OutputStream,
    sink: rodio::Sink,
    line_index: usize,
}

impl AudioPlayback {
    pub fn start(clip: &AudioClip, line_index: usize, volume: f32) -> Result<Self> {
        let (_stream, handle) =
            rodio::OutputStream::try_default().map_err(|err| EngineError::Playback {
                message: format!("opening audio output: {err}"),
            })?;
        let sink = rodio::Sink::try_new(&handle).map_err(|err| EngineError::Playback {
            message: format!("creating sink: {err}"),
        })?;
        let reader = std::io::Cursor::new(Arc::clone(&clip.bytes));
        let source = rodio::Decoder::new(reader).map_err(|err| EngineError::Playback {
            message: format!("decoding audio: {err}"),
        })?;
        sink.append(source);
        sink.set_volume(volume);
        sink.play();
        debug!(line_index, bytes = clip.bytes.len(), "Started audio playback");
        Ok(Self {
            _stream,
            sink,
            line_index,
        })
    }

    pub fn line_index(&self) -> usize {
        self.line_index
    }

    pub fn pause(&self) {
        self.sink.pause();
    }

    pub fn play(&self) {
        self.sink.play();
    }

    pub fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    pub fn stop(self) {
        self.sink.stop();
        // stream dropped automatically
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSpeech {
        generations: AtomicUsize,
        byte_fetches: AtomicUsize,
        bytes_not_found: bool,
    }

    impl FakeSpeech {
        fn new() -> Self {
            Self {
                generations: AtomicUsize::new(0),
                byte_fetches: AtomicUsize::new(0),
                bytes_not_found: false,
            }
        }

        fn failing_bytes() -> Self {
            Self {
                bytes_not_found: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl SpeechBackend for FakeSpeech {
        async fn generate_audio(
            &self,
            text: &str,
            _voice: &str,
            _key: Option<&ContentKey>,
        ) -> Result<AudioHandle> {
            let n = self.generations.fetch_add(1, Ordering::SeqCst);
            Ok(AudioHandle(format!("handle-{n}-{}", text.len())))
        }

        async fn fetch_audio_bytes(&self, handle: &AudioHandle) -> Result<Vec<u8>> {
            self.byte_fetches.fetch_add(1, Ordering::SeqCst);
            if self.bytes_not_found {
                return Err(EngineError::NotFound {
                    what: handle.to_string(),
                });
            }
            Ok(handle.0.as_bytes().to_vec())
        }
    }

    fn cache_with(
        speech: FakeSpeech,
        dir: &Path,
        max_entries: usize,
    ) -> (Arc<FakeSpeech>, AudioRequestCache) {
        let speech = Arc::new(speech);
        let cache = AudioRequestCache::new(speech.clone(), dir, max_entries);
        (speech, cache)
    }

    #[tokio::test]
    async fn same_key_generates_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let (speech, cache) = cache_with(FakeSpeech::new(), dir.path(), 16);
        let key = ContentKey::new("lesson-1", 3, "alloy");

        let first = cache.resolve("hola mundo", "alloy", Some(&key)).await.unwrap();
        let second = cache.resolve("hola mundo", "alloy", Some(&key)).await.unwrap();

        assert_eq!(first.handle, second.handle);
        assert_eq!(
            speech.generations.load(Ordering::SeqCst),
            1,
            "second resolve must reuse the first handle"
        );
        assert_eq!(
            speech.byte_fetches.load(Ordering::SeqCst),
            1,
            "second resolve must be served from the persisted payload"
        );
    }

    #[tokio::test]
    async fn not_found_bytes_store_sentinel_and_block_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let (speech, cache) = cache_with(FakeSpeech::failing_bytes(), dir.path(), 16);
        let key = ContentKey::new("lesson-1", 0, "alloy");

        let err = cache.resolve("hola", "alloy", Some(&key)).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let err = cache.resolve("hola", "alloy", Some(&key)).await.unwrap_err();
        assert!(matches!(err, EngineError::AudioFailed));
        assert_eq!(
            speech.generations.load(Ordering::SeqCst),
            1,
            "sentinel must suppress a second generation call"
        );
    }

    #[tokio::test]
    async fn forced_resolve_clears_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let (speech, cache) = cache_with(FakeSpeech::failing_bytes(), dir.path(), 16);
        let key = ContentKey::new("lesson-1", 0, "alloy");

        let _ = cache.resolve("hola", "alloy", Some(&key)).await;
        let _ = cache.resolve_forced("hola", "alloy", &key).await;
        assert_eq!(
            speech.generations.load(Ordering::SeqCst),
            2,
            "forced resolve must re-issue generation past the sentinel"
        );
    }

    #[tokio::test]
    async fn keyless_resolve_always_hits_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let (speech, cache) = cache_with(FakeSpeech::new(), dir.path(), 16);

        cache.resolve("uno", "alloy", None).await.unwrap();
        cache.resolve("uno", "alloy", None).await.unwrap();
        assert_eq!(speech.generations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lru_eviction_respects_bound_and_removes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let (_, cache) = cache_with(FakeSpeech::new(), dir.path(), 2);
        let keys: Vec<ContentKey> = (0..3)
            .map(|i| ContentKey::new("lesson-1", i, "alloy"))
            .collect();

        cache.resolve("a", "alloy", Some(&keys[0])).await.unwrap();
        cache.resolve("b", "alloy", Some(&keys[1])).await.unwrap();
        // Touch key 0 so key 1 becomes the least recently used.
        cache.resolve("a", "alloy", Some(&keys[0])).await.unwrap();
        cache.resolve("c", "alloy", Some(&keys[2])).await.unwrap();

        assert_eq!(cache.entry_count(), 2);
        assert!(
            !cache.payload_path(&keys[1]).exists(),
            "evicted entry must drop its payload file"
        );
        assert!(cache.payload_path(&keys[0]).exists());
        assert!(cache.payload_path(&keys[2]).exists());
    }

    #[tokio::test]
    async fn index_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let key = ContentKey::new("lesson-1", 7, "alloy");
        {
            let (_, cache) = cache_with(FakeSpeech::new(), dir.path(), 16);
            cache.resolve("hola", "alloy", Some(&key)).await.unwrap();
        }

        let (speech, cache) = cache_with(FakeSpeech::new(), dir.path(), 16);
        cache.resolve("hola", "alloy", Some(&key)).await.unwrap();
        assert_eq!(
            speech.generations.load(Ordering::SeqCst),
            0,
            "a fresh instance over the same directory must reuse the index"
        );
    }

    #[test]
    fn distinct_composites_never_share_a_file_stem() {
        let a = ContentKey::new("lesson-1", 12, "alloy");
        let b = ContentKey::new("lesson-1", 12, "nova");
        let c = ContentKey::new("lesson-2", 12, "alloy");
        assert_ne!(a.file_stem(), b.file_stem());
        assert_ne!(a.file_stem(), c.file_stem());
    }
}
