//! Transferable tokens.
//!
//! A [`ShareableToken`] is the only thing that moves between contexts. It
//! owns immutable, thread-safe data ([`SharedData`]) and remembers which
//! context produced it. Tokens are not `Clone`: whoever holds the token
//! owns it, and releasing consumes it, so a token can be released at most
//! once.

use crate::value::ValueKind;
use isochan_types::ContextId;
use std::sync::Arc;

/// Context-independent payload of a token.
///
/// Every variant is immutable and `Send + Sync`, so the payload may be
/// read from any thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SharedData {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
    /// Buffer shared with the sender's value.
    Buffer(Arc<[u8]>),
    Tuple(Vec<SharedData>),
    /// A value serialized by the full fallback.
    Serialized(Vec<u8>),
}

/// An opaque, transferable representation of a value.
#[derive(Debug)]
pub struct ShareableToken {
    owner: ContextId,
    kind: ValueKind,
    data: SharedData,
}

impl ShareableToken {
    /// Creates a token owned by `owner`.
    #[must_use]
    pub fn new(owner: ContextId, kind: ValueKind, data: SharedData) -> Self {
        Self { owner, kind, data }
    }

    /// Context that converted the value.
    #[must_use]
    pub fn owner(&self) -> ContextId {
        self.owner
    }

    /// Kind of the converted value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Borrows the payload.
    #[must_use]
    pub fn data(&self) -> &SharedData {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_accessors() {
        let token = ShareableToken::new(ContextId::new(2), ValueKind::Int, SharedData::Int(7));
        assert_eq!(token.owner(), ContextId::new(2));
        assert_eq!(token.kind(), ValueKind::Int);
        assert_eq!(token.data(), &SharedData::Int(7));
    }

    #[test]
    fn token_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ShareableToken>();
    }
}
