//! Shareable-data boundary for isochan.
//!
//! Isolated contexts never share heap objects. Everything a channel carries
//! goes through this crate first: a value is converted into an immutable
//! [`ShareableToken`], queued, and reconstructed on the other side.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDK Layer                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  isochan-types   : ids, policies, ErrorCode                 │
//! │  isochan-data    : ShareableBoundary, tokens, Value ◄── HERE │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Main Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`ShareableBoundary`] | Trait the channel layer calls to convert, reconstruct, release |
//! | [`ValueBoundary`] | Default boundary over [`Value`] |
//! | [`ShareableToken`] | Owned, move-only transferable token |
//! | [`SharedData`] | Immutable payload inside a token |
//! | [`ConversionRegistry`] | Per-kind conversions, extensible by the host |
//!
//! # Fallback
//!
//! Kinds without a registered conversion are shareable only when the
//! fallback policy is [`FallbackPolicy::Full`](isochan_types::FallbackPolicy::Full);
//! they are then serialized by value with `serde_json`. Objects are never
//! shareable.

mod boundary;
mod error;
mod registry;
mod token;
mod value;

pub use boundary::{ShareableBoundary, ValueBoundary};
pub use error::DataError;
pub use registry::{reconstruct, ConversionRegistry, Converter};
pub use token::{ShareableToken, SharedData};
pub use value::{OpaqueObject, Value, ValueKind};
