//! isochan runtime: cross-context channels.
//!
//! This crate implements channels that pass data between isolated
//! execution contexts (for example, sub-interpreters that share nothing
//! but the process). A context never touches another context's values:
//! everything crossing a channel goes through a
//! [`ShareableBoundary`](isochan_data::ShareableBoundary) as a token.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDK Layer                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  isochan-types   : ids, policies, ErrorCode                 │
//! │  isochan-data    : ShareableBoundary, tokens, Value         │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Runtime Layer (THIS CRATE)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  channel/  : Channel, ChannelRegistry, Waiter, handles      │
//! │  config/   : IsochanConfig, ConfigLoader                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! ## [`channel`] - Channels
//!
//! - [`ChannelRegistry`]: channel table and every operation on it
//! - [`Channel`]: one queue and its end associations
//! - [`Waiter`]: rendezvous for blocking sends
//! - [`ChannelHandle`]: reference-counted view of one end
//!
//! ## [`config`] - Configuration Management
//!
//! - [`IsochanConfig`](config::IsochanConfig): channel defaults and wait settings
//! - [`ConfigLoader`](config::ConfigLoader): layered loader
//!
//! Configuration priority: Environment > Project > Global > Default
//!
//! # Example
//!
//! ```
//! use isochan_data::Value;
//! use isochan_runtime::{ChannelRegistry, Received, SendOptions};
//! use isochan_types::{ContextId, FallbackPolicy, UnboundOp};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let registry = Arc::new(ChannelRegistry::new());
//! let id = registry.create(UnboundOp::Replace, FallbackPolicy::Full)?;
//!
//! let receiver = {
//!     let registry = Arc::clone(&registry);
//!     thread::spawn(move || loop {
//!         match registry.recv(ContextId::new(1), id) {
//!             Ok(Received::Value(v)) => return v,
//!             Ok(Received::Unbound(op)) => panic!("unexpected unbound item: {op}"),
//!             Err(e) if e.is_closed() => panic!("{e}"),
//!             Err(_) => thread::yield_now(),
//!         }
//!     })
//! };
//!
//! // Blocks until the receiver has taken the value.
//! registry.send(ContextId::new(0), id, &Value::from("eggs"), SendOptions::new())?;
//! assert_eq!(receiver.join().unwrap(), Value::from("eggs"));
//! # Ok::<(), isochan_runtime::ChannelError>(())
//! ```

pub mod channel;
pub mod config;

// Re-exports for convenience
pub use channel::{
    Association, Channel, ChannelError, ChannelHandle, ChannelInfo, ChannelRegistry,
    ChannelStatus, CloseOutcome, Drained, EndsSummary, Received, SendOptions, Waiter,
    WaiterStatus,
};
pub use config::{
    default_config_dir, default_config_path, ChannelsConfig, ConfigError, ConfigLoader,
    IsochanConfig, WaitConfig,
};
