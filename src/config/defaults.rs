pub(crate) fn default_buffer_seconds() -> f64 {
    30.0
}

pub(crate) fn default_scroll_suspend_seconds() -> f64 {
    5.0
}

pub(crate) fn default_voice() -> String {
    "alloy".to_string()
}

pub(crate) fn default_api_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

pub(crate) fn default_audio_cache_dir() -> String {
    ".cache/audio".to_string()
}

pub(crate) fn default_audio_cache_max_entries() -> usize {
    512
}

pub(crate) fn default_playback_volume() -> f32 {
    1.0
}

pub(crate) fn default_completion_threshold() -> f64 {
    0.9
}

pub(crate) fn default_max_tick_gap_seconds() -> f64 {
    2.0
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
