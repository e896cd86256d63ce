//! Channel layer errors.
//!
//! All errors implement [`ErrorCode`] for standardized handling.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ChannelError::NotFound`] | `CHANNEL_NOT_FOUND` | No |
//! | [`ChannelError::Closed`] | `CHANNEL_CLOSED` | No |
//! | [`ChannelError::EndClosed`] | `CHANNEL_END_CLOSED` | No |
//! | [`ChannelError::ClosedWhileWaiting`] | `CHANNEL_CLOSED_WHILE_WAITING` | No |
//! | [`ChannelError::Empty`] | `CHANNEL_EMPTY` | Yes |
//! | [`ChannelError::NotEmpty`] | `CHANNEL_NOT_EMPTY` | Yes |
//! | [`ChannelError::NotShareable`] | `CHANNEL_NOT_SHAREABLE` | No |
//! | [`ChannelError::Data`] | `CHANNEL_DATA` | No |
//! | [`ChannelError::Timeout`] | `CHANNEL_TIMEOUT` | Yes |
//! | [`ChannelError::WrongEnd`] | `CHANNEL_WRONG_END` | No |
//! | [`ChannelError::ResourceExhausted`] | `CHANNEL_RESOURCE_EXHAUSTED` | No |
//!
//! # Example
//!
//! ```
//! use isochan_runtime::ChannelError;
//! use isochan_types::{ChannelId, ErrorCode};
//!
//! let err = ChannelError::Empty(ChannelId::FIRST);
//!
//! assert_eq!(err.code(), "CHANNEL_EMPTY");
//! assert!(err.is_recoverable());
//! assert_eq!(err.to_string(), "channel 0 is empty");
//! ```

use isochan_data::DataError;
use isochan_types::{ChannelEnd, ChannelId, ErrorCode};
use std::time::Duration;
use thiserror::Error;

/// Channel layer error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    /// No channel with this id is registered.
    #[error("channel {} not found", .0.as_i64())]
    NotFound(ChannelId),

    /// The channel is closed, or closing and refusing sends.
    #[error("channel {} is closed", .0.as_i64())]
    Closed(ChannelId),

    /// The calling context's association with the channel was closed.
    #[error("channel {} is already closed for this context", .0.as_i64())]
    EndClosed(ChannelId),

    /// A blocking send was woken because the channel closed before its
    /// item was received.
    #[error("channel {} has closed", .0.as_i64())]
    ClosedWhileWaiting(ChannelId),

    /// Nothing to receive.
    #[error("channel {} is empty", .0.as_i64())]
    Empty(ChannelId),

    /// A non-forced close would drop queued items.
    #[error("channel {} may not be closed if not empty (try force)", .0.as_i64())]
    NotEmpty(ChannelId),

    /// The value could not be converted for sending.
    #[error("value not shareable: {0}")]
    NotShareable(#[source] DataError),

    /// A received token could not be reconstructed or released.
    #[error("channel {} data error: {source}", .channel.as_i64())]
    Data {
        channel: ChannelId,
        #[source]
        source: DataError,
    },

    /// A blocking send was not received in time. The item was withdrawn.
    #[error("timed out after {timeout:?} waiting for channel {} receiver", .channel.as_i64())]
    Timeout {
        channel: ChannelId,
        timeout: Duration,
    },

    /// The operation needs an end the handle does not carry.
    #[error("channel {} handle has no {needed} end", .channel.as_i64())]
    WrongEnd {
        channel: ChannelId,
        needed: ChannelEnd,
    },

    /// No more channel ids can be allocated.
    #[error("failed to get a channel id")]
    ResourceExhausted,
}

impl ChannelError {
    /// Returns `true` for the closed family: [`Closed`](Self::Closed),
    /// [`EndClosed`](Self::EndClosed) and
    /// [`ClosedWhileWaiting`](Self::ClosedWhileWaiting).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::Closed(_) | Self::EndClosed(_) | Self::ClosedWhileWaiting(_)
        )
    }
}

impl ErrorCode for ChannelError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "CHANNEL_NOT_FOUND",
            Self::Closed(_) => "CHANNEL_CLOSED",
            Self::EndClosed(_) => "CHANNEL_END_CLOSED",
            Self::ClosedWhileWaiting(_) => "CHANNEL_CLOSED_WHILE_WAITING",
            Self::Empty(_) => "CHANNEL_EMPTY",
            Self::NotEmpty(_) => "CHANNEL_NOT_EMPTY",
            Self::NotShareable(_) => "CHANNEL_NOT_SHAREABLE",
            Self::Data { .. } => "CHANNEL_DATA",
            Self::Timeout { .. } => "CHANNEL_TIMEOUT",
            Self::WrongEnd { .. } => "CHANNEL_WRONG_END",
            Self::ResourceExhausted => "CHANNEL_RESOURCE_EXHAUSTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Empty(_) | Self::NotEmpty(_) | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isochan_data::ValueKind;
    use isochan_types::assert_error_codes;

    fn id() -> ChannelId {
        ChannelId::from_raw(7)
    }

    fn all_variants() -> Vec<ChannelError> {
        let data = DataError::NotShareable {
            kind: ValueKind::Object,
        };
        vec![
            ChannelError::NotFound(id()),
            ChannelError::Closed(id()),
            ChannelError::EndClosed(id()),
            ChannelError::ClosedWhileWaiting(id()),
            ChannelError::Empty(id()),
            ChannelError::NotEmpty(id()),
            ChannelError::NotShareable(data.clone()),
            ChannelError::Data {
                channel: id(),
                source: data,
            },
            ChannelError::Timeout {
                channel: id(),
                timeout: Duration::from_millis(5),
            },
            ChannelError::WrongEnd {
                channel: id(),
                needed: ChannelEnd::Send,
            },
            ChannelError::ResourceExhausted,
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "CHANNEL_");
    }

    #[test]
    fn closed_family() {
        let closed: Vec<_> = all_variants()
            .into_iter()
            .filter(ChannelError::is_closed)
            .map(|e| e.code())
            .collect();
        assert_eq!(
            closed,
            vec!["CHANNEL_CLOSED", "CHANNEL_END_CLOSED", "CHANNEL_CLOSED_WHILE_WAITING"]
        );
    }

    #[test]
    fn messages() {
        assert_eq!(ChannelError::NotFound(id()).to_string(), "channel 7 not found");
        assert_eq!(ChannelError::Closed(id()).to_string(), "channel 7 is closed");
        assert_eq!(
            ChannelError::ClosedWhileWaiting(id()).to_string(),
            "channel 7 has closed"
        );
        assert_eq!(
            ChannelError::NotEmpty(id()).to_string(),
            "channel 7 may not be closed if not empty (try force)"
        );
    }

    #[test]
    fn recoverability() {
        assert!(ChannelError::Empty(id()).is_recoverable());
        assert!(!ChannelError::Closed(id()).is_recoverable());
        assert!(!ChannelError::ResourceExhausted.is_recoverable());
    }
}
