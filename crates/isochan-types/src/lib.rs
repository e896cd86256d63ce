//! Core types for isochan.
//!
//! This crate holds the small, stable vocabulary shared by every other
//! isochan crate: identifiers, channel policies, and the [`ErrorCode`]
//! interface.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDK Layer                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  isochan-types   : ids, policies, ErrorCode   ◄── HERE       │
//! │  isochan-data    : ShareableBoundary, tokens, Value         │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Runtime Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  isochan-runtime : Channel, ChannelRegistry, Waiter, config │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use isochan_types::{ChannelDefaults, ChannelEnd, ChannelId, ContextId, UnboundOp};
//!
//! let main_ctx = ContextId::new(0);
//! let id = ChannelId::FIRST;
//! let defaults = ChannelDefaults::default();
//!
//! assert_eq!(defaults.unbound_op, UnboundOp::Replace);
//! assert!(ChannelEnd::Both.includes_send());
//! assert_eq!(format!("{main_ctx} -> {id}"), "ctx:0 -> chan:0");
//! ```

mod error;
mod id;
mod policy;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ChannelId, ContextId, ItemId};
pub use policy::{ChannelDefaults, ChannelEnd, FallbackPolicy, ParsePolicyError, UnboundOp};
