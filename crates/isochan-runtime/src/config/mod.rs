//! Configuration management with hierarchical layering.
//!
//! # Architecture
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌────────────────────────────────────────────┐
//! │  1. Environment Variables (ISOCHAN_*)      │  Runtime override
//! ├────────────────────────────────────────────┤
//! │  2. Project Config (.isochan/config.toml)  │  Project-specific
//! ├────────────────────────────────────────────┤
//! │  3. Global Config (~/.isochan/config.toml) │  User defaults
//! ├────────────────────────────────────────────┤
//! │  4. Default Values (compile-time)          │  Fallback
//! └────────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `ISOCHAN_UNBOUND_OP` | `channels.unbound_op` | `remove` / `error` / `replace` |
//! | `ISOCHAN_FALLBACK` | `channels.fallback` | `shareable_only` / `full` |
//! | `ISOCHAN_SEND_TIMEOUT_MS` | `wait.send_timeout_ms` | u64 |
//!
//! # Example Configuration
//!
//! ```toml
//! # ~/.isochan/config.toml
//!
//! [channels]
//! unbound_op = "replace"
//! fallback = "full"
//!
//! [wait]
//! send_timeout_ms = 0         # 0 = wait forever
//! release_spin_limit = 1000
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{ChannelsConfig, IsochanConfig, WaitConfig};

/// Default global config directory.
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".isochan")
}

/// Default global config file path.
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".isochan";

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "config.toml";
