//! Channel policies: ends, unbound-item handling, conversion fallback.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One or both ends of a channel.
///
/// | Variant | Sends | Receives |
/// |---------|-------|----------|
/// | `Send` | yes | no |
/// | `Recv` | no | yes |
/// | `Both` | yes | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelEnd {
    /// The sending end.
    Send,
    /// The receiving end.
    Recv,
    /// Both ends.
    #[default]
    Both,
}

impl ChannelEnd {
    /// Builds an end selector from two flags.
    ///
    /// Neither flag set means both ends, matching the behaviour of a close
    /// or release call made without naming an end.
    #[must_use]
    pub fn from_flags(send: bool, recv: bool) -> Self {
        match (send, recv) {
            (true, false) => Self::Send,
            (false, true) => Self::Recv,
            _ => Self::Both,
        }
    }

    /// Returns `true` if the send end is selected.
    #[must_use]
    pub fn includes_send(self) -> bool {
        matches!(self, Self::Send | Self::Both)
    }

    /// Returns `true` if the receive end is selected.
    #[must_use]
    pub fn includes_recv(self) -> bool {
        matches!(self, Self::Recv | Self::Both)
    }
}

impl fmt::Display for ChannelEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Send => "send",
            Self::Recv => "recv",
            Self::Both => "both",
        })
    }
}

/// What happens to a queued item when the context that sent it is
/// destroyed before the item is received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnboundOp {
    /// Drop the item from the queue.
    Remove,
    /// Keep a placeholder; the receiver is told the value was lost.
    Error,
    /// Keep a placeholder; the receiver substitutes a stand-in value.
    #[default]
    Replace,
}

impl fmt::Display for UnboundOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remove => "remove",
            Self::Error => "error",
            Self::Replace => "replace",
        })
    }
}

impl FromStr for UnboundOp {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remove" => Ok(Self::Remove),
            "error" => Ok(Self::Error),
            "replace" => Ok(Self::Replace),
            other => Err(ParsePolicyError::new("unbound op", other)),
        }
    }
}

/// Whether a value without a registered conversion may still be shared
/// by serializing it by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Only kinds with a registered conversion are shareable.
    ShareableOnly,
    /// Fall back to serializing the value when no conversion exists.
    #[default]
    Full,
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ShareableOnly => "shareable_only",
            Self::Full => "full",
        })
    }
}

impl FromStr for FallbackPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shareable_only" | "shareable-only" => Ok(Self::ShareableOnly),
            "full" => Ok(Self::Full),
            other => Err(ParsePolicyError::new("fallback policy", other)),
        }
    }
}

/// Per-channel defaults, fixed when the channel is created.
///
/// Sends that do not specify a policy use these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelDefaults {
    /// Policy for items whose sender context goes away.
    pub unbound_op: UnboundOp,
    /// Conversion fallback for values without a registered conversion.
    pub fallback: FallbackPolicy,
}

impl ChannelDefaults {
    /// Creates defaults from explicit policies.
    #[must_use]
    pub fn new(unbound_op: UnboundOp, fallback: FallbackPolicy) -> Self {
        Self {
            unbound_op,
            fallback,
        }
    }
}

/// A policy name that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what}: '{value}'")]
pub struct ParsePolicyError {
    what: &'static str,
    value: String,
}

impl ParsePolicyError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}
