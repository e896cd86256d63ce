//! Shareable-data errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`DataError::NotShareable`] | `DATA_NOT_SHAREABLE` | No |
//! | [`DataError::Serialize`] | `DATA_SERIALIZE` | No |
//! | [`DataError::Deserialize`] | `DATA_DESERIALIZE` | No |
//! | [`DataError::ForeignToken`] | `DATA_FOREIGN_TOKEN` | No |

use crate::value::ValueKind;
use isochan_types::{ContextId, ErrorCode};
use thiserror::Error;

/// Failure at the shareable-data boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// The value has no registered conversion and the fallback policy
    /// does not allow serializing it.
    #[error("{kind} values are not shareable")]
    NotShareable {
        /// Kind of the rejected value.
        kind: ValueKind,
    },

    /// The full fallback could not serialize the value.
    #[error("failed to serialize {kind} value: {message}")]
    Serialize {
        /// Kind of the value being serialized.
        kind: ValueKind,
        /// Serializer message.
        message: String,
    },

    /// A serialized token could not be turned back into a value.
    #[error("failed to reconstruct value: {0}")]
    Deserialize(String),

    /// A token was released through a boundary that has no live tokens
    /// for its owner.
    #[error("token owned by {owner} was not issued by this boundary")]
    ForeignToken {
        /// Context recorded on the token.
        owner: ContextId,
    },
}

impl ErrorCode for DataError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotShareable { .. } => "DATA_NOT_SHAREABLE",
            Self::Serialize { .. } => "DATA_SERIALIZE",
            Self::Deserialize(_) => "DATA_DESERIALIZE",
            Self::ForeignToken { .. } => "DATA_FOREIGN_TOKEN",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isochan_types::assert_error_codes;

    fn all_variants() -> Vec<DataError> {
        vec![
            DataError::NotShareable {
                kind: ValueKind::Object,
            },
            DataError::Serialize {
                kind: ValueKind::Map,
                message: "x".into(),
            },
            DataError::Deserialize("eof".into()),
            DataError::ForeignToken {
                owner: ContextId::new(1),
            },
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "DATA_");
    }

    #[test]
    fn not_shareable_message() {
        let err = DataError::NotShareable {
            kind: ValueKind::Object,
        };
        assert_eq!(err.to_string(), "object values are not shareable");
        assert!(!err.is_recoverable());
    }
}
