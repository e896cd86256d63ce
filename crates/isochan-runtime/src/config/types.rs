//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use isochan_types::{ChannelDefaults, FallbackPolicy, UnboundOp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure.
///
/// # Example
///
/// ```
/// use isochan_runtime::config::IsochanConfig;
/// use isochan_types::UnboundOp;
///
/// let config = IsochanConfig::default();
/// assert_eq!(config.channels.unbound_op, UnboundOp::Replace);
/// assert!(config.wait.send_timeout().is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IsochanConfig {
    /// Defaults for newly created channels.
    pub channels: ChannelsConfig,

    /// Blocking-send settings.
    pub wait: WaitConfig,
}

impl IsochanConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Merges another config into this one.
    ///
    /// Values from `other` override values in `self` only if they
    /// differ from the default.
    pub fn merge(&mut self, other: &Self) {
        self.channels.merge(&other.channels);
        self.wait.merge(&other.wait);
    }
}

/// `[channels]`: policies used by `create_default`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelsConfig {
    pub unbound_op: UnboundOp,
    pub fallback: FallbackPolicy,
}

impl ChannelsConfig {
    /// The configured policies as channel defaults.
    #[must_use]
    pub fn defaults(&self) -> ChannelDefaults {
        ChannelDefaults::new(self.unbound_op, self.fallback)
    }

    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.unbound_op != default.unbound_op {
            self.unbound_op = other.unbound_op;
        }
        if other.fallback != default.fallback {
            self.fallback = other.fallback;
        }
    }
}

/// `[wait]`: blocking-send settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WaitConfig {
    /// Timeout for blocking sends that pass none. 0 waits forever.
    pub send_timeout_ms: u64,

    /// Yields a woken sender spends waiting for a receiver that is
    /// mid-release before it backs off to sleeping.
    pub release_spin_limit: u32,
}

impl WaitConfig {
    /// Default for [`release_spin_limit`](Self::release_spin_limit).
    pub const DEFAULT_RELEASE_SPIN_LIMIT: u32 = 1000;

    /// The send timeout, or `None` to wait forever.
    #[must_use]
    pub fn send_timeout(&self) -> Option<Duration> {
        (self.send_timeout_ms > 0).then(|| Duration::from_millis(self.send_timeout_ms))
    }

    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.send_timeout_ms != default.send_timeout_ms {
            self.send_timeout_ms = other.send_timeout_ms;
        }
        if other.release_spin_limit != default.release_spin_limit {
            self.release_spin_limit = other.release_spin_limit;
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: 0,
            release_spin_limit: Self::DEFAULT_RELEASE_SPIN_LIMIT,
        }
    }
}
