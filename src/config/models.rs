use serde::Deserialize;

/// Engine configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct EngineConfig {
    /// Look-ahead margin (seconds) before the covered timeline runs out at
    /// which the next translation page is requested.
    #[serde(default = "crate::config::defaults::default_buffer_seconds")]
    pub buffer_seconds: f64,
    /// How long a manual scroll suspends auto-scroll, restarted on each new
    /// scroll event.
    #[serde(default = "crate::config::defaults::default_scroll_suspend_seconds")]
    pub scroll_suspend_seconds: f64,
    /// Voice identity passed to the speech synthesis collaborator.
    #[serde(default = "crate::config::defaults::default_voice")]
    pub voice: String,
    #[serde(default = "crate::config::defaults::default_api_base_url")]
    pub api_base_url: String,
    /// Directory for persisted speech audio, shared by every session.
    #[serde(default = "crate::config::defaults::default_audio_cache_dir")]
    pub audio_cache_dir: String,
    /// Upper bound on cached audio entries; least-recently-used entries are
    /// evicted past this, failure sentinels included.
    #[serde(default = "crate::config::defaults::default_audio_cache_max_entries")]
    pub audio_cache_max_entries: usize,
    #[serde(default = "crate::config::defaults::default_playback_volume")]
    pub playback_volume: f32,
    /// Fraction of the known timeline that must be watched before the lesson
    /// is reported completed.
    #[serde(default = "crate::config::defaults::default_completion_threshold")]
    pub completion_threshold: f64,
    /// Tick-to-tick playhead jumps larger than this are treated as seeks and
    /// do not count toward watched coverage.
    #[serde(default = "crate::config::defaults::default_max_tick_gap_seconds")]
    pub max_tick_gap_seconds: f64,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            buffer_seconds: crate::config::defaults::default_buffer_seconds(),
            scroll_suspend_seconds: crate::config::defaults::default_scroll_suspend_seconds(),
            voice: crate::config::defaults::default_voice(),
            api_base_url: crate::config::defaults::default_api_base_url(),
            audio_cache_dir: crate::config::defaults::default_audio_cache_dir(),
            audio_cache_max_entries: crate::config::defaults::default_audio_cache_max_entries(),
            playback_volume: crate::config::defaults::default_playback_volume(),
            completion_threshold: crate::config::defaults::default_completion_threshold(),
            max_tick_gap_seconds: crate::config::defaults::default_max_tick_gap_seconds(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
