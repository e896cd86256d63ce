//! Cross-context channels.
//!
//! A channel is a FIFO queue of shareable tokens that any number of
//! isolated execution contexts can send into and receive from. Values
//! never cross directly: the sender's value is converted to a token on
//! the way in and reconstructed in the receiver on the way out.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         ChannelRegistry                              │
//! │   - id allocation, create / destroy / lookup                         │
//! │   - token conversion via ShareableBoundary (outside every lock)      │
//! │   - context teardown sweep, handle refcounts                         │
//! │                                                                      │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐             │
//! │   │ Channel 0    │   │ Channel 1    │   │ Channel 2    │   ...       │
//! │   │ ┌──────────┐ │   │              │   │              │             │
//! │   │ │  queue   │ │   │              │   │              │             │
//! │   │ ├──────────┤ │   │              │   │              │             │
//! │   │ │  ends    │ │   │              │   │              │             │
//! │   │ └──────────┘ │   │              │   │              │             │
//! │   └──────────────┘   └──────────────┘   └──────────────┘             │
//! └──────────────────────────────────────────────────────────────────────┘
//!         ▲  send                                  │  recv
//!         │                                        ▼
//!   ┌───────────┐   Waiter (blocking send)   ┌───────────┐
//!   │ context A │ ◄───────────────────────── │ context B │
//!   └───────────┘        release(received)   └───────────┘
//! ```
//!
//! # Core Concepts
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`ChannelRegistry`] | Owns all channels; entry point for every operation |
//! | [`Channel`] | One queue plus its end associations, under one lock |
//! | [`Waiter`] | One-shot rendezvous for a blocking send |
//! | [`ChannelHandle`] | Reference-counted view of one end |
//! | [`ChannelInfo`] | Status snapshot for introspection |
//!
//! # Unbound Items
//!
//! When a context is destroyed, items it sent are reconciled by their
//! [`UnboundOp`](isochan_types::UnboundOp):
//!
//! | Policy | Effect on the queued item |
//! |--------|---------------------------|
//! | `Remove` | Dropped from the queue |
//! | `Error` | Stays; receiving it reports [`Received::Unbound`] |
//! | `Replace` | Stays; receiving it reports [`Received::Unbound`] |
//!
//! The host decides what `Error` and `Replace` mean to its callers.
//!
//! # Example
//!
//! ```
//! use isochan_data::Value;
//! use isochan_runtime::{ChannelRegistry, ChannelError, Received, SendOptions};
//! use isochan_types::{ContextId, FallbackPolicy, UnboundOp};
//!
//! let registry = ChannelRegistry::new();
//! let (a, b) = (ContextId::new(1), ContextId::new(2));
//! let id = registry.create(UnboundOp::Replace, FallbackPolicy::Full)?;
//!
//! // b's first receive associates it with the receive end.
//! assert_eq!(registry.recv(b, id), Err(ChannelError::Empty(id)));
//! registry.send(a, id, &Value::Int(1), SendOptions::nowait())?;
//!
//! // Tearing down a leaves its item queued as a placeholder.
//! registry.clear_context(a);
//!
//! assert_eq!(registry.recv(b, id)?, Received::Unbound(UnboundOp::Replace));
//! assert_eq!(registry.recv(b, id), Err(ChannelError::Empty(id)));
//! # Ok::<(), ChannelError>(())
//! ```

#[allow(clippy::module_inception)]
mod channel;
mod ends;
mod error;
mod handle;
mod info;
mod queue;
mod registry;
mod waiter;

pub use channel::{Channel, CloseOutcome, SendRejected};
pub use ends::{ChannelEnds, EndClosed, EndState};
pub use error::ChannelError;
pub use handle::ChannelHandle;
pub use info::{Association, ChannelInfo, ChannelStatus, EndsSummary};
pub use queue::{ChannelQueue, Drained, Item};
pub use registry::{ChannelRegistry, Received, SendOptions};
pub use waiter::{Waiter, WaiterStatus};
