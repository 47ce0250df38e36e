//! Configuration for the playback engine.
//!
//! All tunables are centralized here and loaded from a TOML file if present.
//! Any missing or invalid entries fall back to sensible defaults so a host
//! application can always construct a working engine.

mod defaults;
mod io;
mod models;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{EngineConfig, LogLevel};
