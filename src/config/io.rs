use crate::config::EngineConfig;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> EngineConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded engine config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return EngineConfig::default();
        }
    };

    parse_config(&contents).unwrap_or_else(|err| {
        warn!(path = %path.display(), "Invalid config TOML: {err}");
        EngineConfig::default()
    })
}

pub fn parse_config(contents: &str) -> Result<EngineConfig, toml::de::Error> {
    let cfg = toml::from_str::<EngineConfig>(contents)?;
    debug!("Parsed engine configuration");
    Ok(cfg)
}

pub fn serialize_config(config: &EngineConfig) -> Option<String> {
    match toml::to_string(config) {
        Ok(contents) => Some(contents),
        Err(err) => {
            warn!("Failed to serialize config: {err}");
            None
        }
    }
}
