//! Channel introspection snapshots.

use isochan_types::{ChannelDefaults, ChannelId};
use serde::Serialize;

/// Lifecycle status of a channel.
///
/// ```text
/// ┌──────┐ close(send) while non-empty ┌─────────┐  queue drained  ┌────────┐
/// │ Open │ ──────────────────────────► │ Closing │ ──────────────► │ Closed │
/// └──┬───┘                             └─────────┘                 └────────┘
///    │          close / force close / last release                      ▲
///    └──────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Open,
    /// Sends are refused; receives drain the remaining items.
    Closing,
    Closed,
}

/// How one context relates to one end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Association {
    Associated,
    Released,
    #[default]
    Never,
}

/// Counts of contexts by the ends they use.
///
/// "Released" covers both explicit release and closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EndsSummary {
    pub send_only: usize,
    pub send_only_released: usize,
    pub recv_only: usize,
    pub recv_only_released: usize,
    pub both: usize,
    pub both_released: usize,
    pub both_send_released: usize,
    pub both_recv_released: usize,
    /// The asking context's send-end association.
    pub current_send: Association,
    /// The asking context's receive-end association.
    pub current_recv: Association,
}

/// Snapshot returned by `get_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub status: ChannelStatus,
    /// Queued items, unbound placeholders included.
    pub count: usize,
    pub defaults: ChannelDefaults,
    pub ends: EndsSummary,
}

impl ChannelInfo {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == ChannelStatus::Open
    }

    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.status == ChannelStatus::Closing
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == ChannelStatus::Closed
    }
}
