//! The channel registry.
//!
//! [`ChannelRegistry`] owns every channel, allocates ids, and is the entry
//! point for all channel operations. It is a plain value: hosts create one
//! and share it (usually in an [`Arc`]) with every context that needs it.
//!
//! # Locking
//!
//! ```text
//! registry mutex ── lookup / insert / remove only
//!      │
//!      ▼  (Arc<Channel> cloned out, registry lock dropped)
//! channel mutex ─── one queue / ends mutation
//!      │
//!      ▼  (lock dropped)
//! boundary calls, waiter wake-ups, blocking waits
//! ```
//!
//! Neither lock is ever held across a wait or a boundary call.

use super::channel::{Channel, CloseOutcome, SendRejected};
use super::error::ChannelError;
use super::handle::ChannelHandle;
use super::info::ChannelInfo;
use super::queue::Drained;
use super::waiter::Waiter;
use crate::config::IsochanConfig;
use isochan_data::{ShareableBoundary, ValueBoundary};
use isochan_types::{
    ChannelDefaults, ChannelEnd, ChannelId, ContextId, FallbackPolicy, ItemId, UnboundOp,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a receive produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Received<V> {
    /// A value reconstructed in the receiving context.
    Value(V),
    /// The sender was torn down before the item was received. Carries the
    /// item's unbound policy so the host can substitute or raise.
    Unbound(UnboundOp),
}

impl<V> Received<V> {
    /// The received value, if any.
    pub fn value(self) -> Option<V> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unbound(_) => None,
        }
    }

    #[must_use]
    pub fn is_unbound(&self) -> bool {
        matches!(self, Self::Unbound(_))
    }
}

/// Options for [`ChannelRegistry::send`].
///
/// Unset policies come from the channel's defaults. A blocking send with
/// no timeout uses the registry's configured send timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub unbound_op: Option<UnboundOp>,
    pub fallback: Option<FallbackPolicy>,
    pub blocking: bool,
    pub timeout: Option<Duration>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            unbound_op: None,
            fallback: None,
            blocking: true,
            timeout: None,
        }
    }
}

impl SendOptions {
    /// Blocking send with channel defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking send with channel defaults.
    #[must_use]
    pub fn nowait() -> Self {
        Self {
            blocking: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn unbound_op(mut self, op: UnboundOp) -> Self {
        self.unbound_op = Some(op);
        self
    }

    #[must_use]
    pub fn fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = Some(fallback);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug)]
struct ChannelRef {
    channel: Arc<Channel>,
    /// Live [`ChannelHandle`]s. The channel is removed when this drops
    /// back to zero.
    handles: usize,
}

#[derive(Debug)]
struct RegistryState {
    refs: HashMap<ChannelId, ChannelRef>,
    /// `None` once the id space is used up.
    next_id: Option<ChannelId>,
}

/// Table of channels.
///
/// # Example
///
/// ```
/// use isochan_data::Value;
/// use isochan_runtime::{ChannelRegistry, Received, SendOptions};
/// use isochan_types::{ChannelEnd, ContextId, FallbackPolicy, UnboundOp};
///
/// let registry = ChannelRegistry::new();
/// let (main_ctx, worker) = (ContextId::new(0), ContextId::new(1));
///
/// let id = registry.create(UnboundOp::Replace, FallbackPolicy::Full)?;
/// registry.send(main_ctx, id, &Value::from("spam"), SendOptions::nowait())?;
/// assert_eq!(registry.get_count(id)?, 1);
///
/// let got = registry.recv(worker, id)?;
/// assert_eq!(got, Received::Value(Value::from("spam")));
///
/// registry.close(id, ChannelEnd::Both, false)?;
/// assert!(registry.get_info(main_ctx, id)?.is_closed());
/// # Ok::<(), isochan_runtime::ChannelError>(())
/// ```
pub struct ChannelRegistry<B: ShareableBoundary = ValueBoundary> {
    state: Mutex<RegistryState>,
    boundary: Arc<B>,
    config: IsochanConfig,
}

impl ChannelRegistry<ValueBoundary> {
    /// Creates a registry over the default [`ValueBoundary`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(Arc::new(ValueBoundary::new()))
    }
}

impl Default for ChannelRegistry<ValueBoundary> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ShareableBoundary> ChannelRegistry<B> {
    /// Creates a registry over `boundary` with default configuration.
    #[must_use]
    pub fn with_boundary(boundary: Arc<B>) -> Self {
        Self::with_config(boundary, IsochanConfig::default())
    }

    /// Creates a registry over `boundary` with explicit configuration.
    #[must_use]
    pub fn with_config(boundary: Arc<B>, config: IsochanConfig) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                refs: HashMap::new(),
                next_id: Some(ChannelId::FIRST),
            }),
            boundary,
            config,
        }
    }

    /// The boundary every send and receive goes through.
    #[must_use]
    pub fn boundary(&self) -> &Arc<B> {
        &self.boundary
    }

    #[must_use]
    pub fn config(&self) -> &IsochanConfig {
        &self.config
    }

    // === Lifecycle ===

    /// Creates a channel with the given default policies.
    ///
    /// # Errors
    ///
    /// [`ChannelError::ResourceExhausted`] when no id is left.
    pub fn create(
        &self,
        unbound_op: UnboundOp,
        fallback: FallbackPolicy,
    ) -> Result<ChannelId, ChannelError> {
        let defaults = ChannelDefaults::new(unbound_op, fallback);
        let mut state = self.state.lock();
        let id = state.next_id.ok_or(ChannelError::ResourceExhausted)?;
        state.next_id = id.next();
        state.refs.insert(
            id,
            ChannelRef {
                channel: Arc::new(Channel::new(id, defaults)),
                handles: 0,
            },
        );
        debug!(channel = %id, unbound_op = %unbound_op, fallback = %fallback, "channel created");
        Ok(id)
    }

    /// Creates a channel with the configured default policies.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub fn create_default(&self) -> Result<ChannelId, ChannelError> {
        let defaults = self.config.channels.defaults();
        self.create(defaults.unbound_op, defaults.fallback)
    }

    /// Removes a channel, open or closed, and drains it.
    ///
    /// Blocked senders are woken as not received.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`] if the id is not registered.
    pub fn destroy(&self, id: ChannelId) -> Result<(), ChannelError> {
        let channel = self.remove(id)?;
        self.shutdown(&channel);
        info!(channel = %id, "channel destroyed");
        Ok(())
    }

    /// Unlinks a channel from the table without draining it.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`] if the id is not registered.
    pub fn remove(&self, id: ChannelId) -> Result<Arc<Channel>, ChannelError> {
        self.state
            .lock()
            .refs
            .remove(&id)
            .map(|r| r.channel)
            .ok_or(ChannelError::NotFound(id))
    }

    /// Finds an open (or closing) channel.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::NotFound`] if the id is not registered
    /// - [`ChannelError::Closed`] if the channel is closed
    pub fn lookup(&self, id: ChannelId) -> Result<Arc<Channel>, ChannelError> {
        let channel = self.get(id)?;
        if !channel.is_open() {
            return Err(ChannelError::Closed(id));
        }
        Ok(channel)
    }

    fn get(&self, id: ChannelId) -> Result<Arc<Channel>, ChannelError> {
        self.state
            .lock()
            .refs
            .get(&id)
            .map(|r| Arc::clone(&r.channel))
            .ok_or(ChannelError::NotFound(id))
    }

    // === Send / receive ===

    /// Sends `value` from `ctx`.
    ///
    /// Blocking sends wait until the item is received; see
    /// [`send_wait`](Self::send_wait).
    ///
    /// # Errors
    ///
    /// See [`send_nowait`](Self::send_nowait) and
    /// [`send_wait`](Self::send_wait).
    pub fn send(
        &self,
        ctx: ContextId,
        id: ChannelId,
        value: &B::Value,
        options: SendOptions,
    ) -> Result<(), ChannelError> {
        if options.blocking {
            let timeout = options.timeout.or_else(|| self.config.wait.send_timeout());
            self.send_wait(ctx, id, value, options.unbound_op, options.fallback, timeout)
        } else {
            self.send_nowait(ctx, id, value, options.unbound_op, options.fallback)
        }
    }

    /// Queues `value` and returns immediately.
    ///
    /// The value is converted before the channel is locked; a value that
    /// cannot be converted leaves the channel untouched.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::NotFound`] / [`ChannelError::Closed`] from lookup,
    ///   or if the channel closed meanwhile
    /// - [`ChannelError::EndClosed`] if `ctx`'s send end was closed
    /// - [`ChannelError::NotShareable`] if conversion fails
    pub fn send_nowait(
        &self,
        ctx: ContextId,
        id: ChannelId,
        value: &B::Value,
        unbound_op: Option<UnboundOp>,
        fallback: Option<FallbackPolicy>,
    ) -> Result<(), ChannelError> {
        let channel = self.lookup(id)?;
        self.enqueue(&channel, ctx, value, unbound_op, fallback, None)
            .map(|_| ())
    }

    /// Queues `value` and blocks until a receiver takes it.
    ///
    /// `timeout` of `None` waits forever. On timeout the item is withdrawn
    /// from the queue; if a receiver took it in the meantime, the send
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Everything [`send_nowait`](Self::send_nowait) returns, plus:
    ///
    /// - [`ChannelError::Timeout`] if nobody received the item in time
    /// - [`ChannelError::ClosedWhileWaiting`] if the channel was closed or
    ///   destroyed with the item still queued
    pub fn send_wait(
        &self,
        ctx: ContextId,
        id: ChannelId,
        value: &B::Value,
        unbound_op: Option<UnboundOp>,
        fallback: Option<FallbackPolicy>,
        timeout: Option<Duration>,
    ) -> Result<(), ChannelError> {
        let channel = self.lookup(id)?;
        let waiter = Arc::new(Waiter::new());
        let item = self.enqueue(
            &channel,
            ctx,
            value,
            unbound_op,
            fallback,
            Some(Arc::clone(&waiter)),
        )?;

        if !waiter.wait(timeout) {
            match channel.remove(item) {
                Some(withdrawn) => {
                    let mut drained = Drained::default();
                    drained.absorb(withdrawn);
                    self.release_drained(id, drained);
                    if !channel.is_open() {
                        debug!(channel = %id, context = %ctx, %item, "channel closed under blocking send");
                        return Err(ChannelError::ClosedWhileWaiting(id));
                    }
                    debug!(channel = %id, context = %ctx, %item, "blocking send timed out");
                    return Err(ChannelError::Timeout {
                        channel: id,
                        // A timed-out wait always had a finite timeout.
                        timeout: timeout.unwrap_or_default(),
                    });
                }
                // Taken concurrently: the receiver is about to release us.
                None => {
                    waiter.wait(None);
                }
            }
        }

        if waiter.finish_release(self.config.wait.release_spin_limit) {
            Ok(())
        } else {
            Err(ChannelError::ClosedWhileWaiting(id))
        }
    }

    fn enqueue(
        &self,
        channel: &Channel,
        ctx: ContextId,
        value: &B::Value,
        unbound_op: Option<UnboundOp>,
        fallback: Option<FallbackPolicy>,
        waiter: Option<Arc<Waiter>>,
    ) -> Result<ItemId, ChannelError> {
        let defaults = channel.defaults();
        let unbound_op = unbound_op.unwrap_or(defaults.unbound_op);
        let fallback = fallback.unwrap_or(defaults.fallback);

        let token = self
            .boundary
            .convert(ctx, value, fallback)
            .map_err(ChannelError::NotShareable)?;

        channel
            .add(ctx, token, unbound_op, waiter)
            .map_err(|SendRejected { error, token }| {
                if let Err(e) = self.boundary.release(token) {
                    warn!(channel = %channel.id(), error = %e, "failed to release rejected token");
                }
                error
            })
    }

    /// Receives the head item in `ctx`.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::NotFound`] / [`ChannelError::Closed`]
    /// - [`ChannelError::EndClosed`] if `ctx`'s receive end was closed
    /// - [`ChannelError::Empty`] if nothing is queued, including once a
    ///   send-side close has drained the channel
    /// - [`ChannelError::Data`] if the token cannot be reconstructed or
    ///   released; the item is consumed either way
    pub fn recv(&self, ctx: ContextId, id: ChannelId) -> Result<Received<B::Value>, ChannelError> {
        let channel = self.get(id)?;
        let item = channel.next(ctx)?;

        let Some(token) = item.token else {
            if let Some(waiter) = &item.waiter {
                waiter.release(false);
            }
            debug!(channel = %id, context = %ctx, unbound_op = %item.unbound_op, "received unbound item");
            return Ok(Received::Unbound(item.unbound_op));
        };

        let value = match self.boundary.reconstruct(ctx, &token) {
            Ok(value) => value,
            Err(source) => {
                if let Err(e) = self.boundary.release(token) {
                    warn!(channel = %id, error = %e, "failed to release unreadable token");
                }
                if let Some(waiter) = &item.waiter {
                    waiter.release(false);
                }
                return Err(ChannelError::Data { channel: id, source });
            }
        };

        if let Err(source) = self.boundary.release(token) {
            if let Some(waiter) = &item.waiter {
                waiter.release(false);
            }
            return Err(ChannelError::Data { channel: id, source });
        }
        if let Some(waiter) = &item.waiter {
            waiter.release(true);
        }
        Ok(Received::Value(value))
    }

    /// Like [`recv`](Self::recv), but returns `default` instead of
    /// [`ChannelError::Empty`].
    ///
    /// # Errors
    ///
    /// Everything [`recv`](Self::recv) returns except `Empty`.
    pub fn recv_or(
        &self,
        ctx: ContextId,
        id: ChannelId,
        default: B::Value,
    ) -> Result<Received<B::Value>, ChannelError> {
        match self.recv(ctx, id) {
            Err(ChannelError::Empty(_)) => Ok(Received::Value(default)),
            other => other,
        }
    }

    // === Close / release ===

    /// Closes a channel; see [`Channel::close`] for the rules.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::NotFound`]
    /// - [`ChannelError::Closed`] if already closed (or already closing,
    ///   for a non-forced send close)
    /// - [`ChannelError::NotEmpty`] if items are queued and neither
    ///   `force` nor a send-only close applies
    pub fn close(&self, id: ChannelId, end: ChannelEnd, force: bool) -> Result<(), ChannelError> {
        let channel = self.get(id)?;
        match channel.close(end, force)? {
            CloseOutcome::Closed(drained) => self.release_drained(id, drained),
            CloseOutcome::Closing => {}
        }
        Ok(())
    }

    /// Releases `ctx`'s association with `end` without touching the queue.
    ///
    /// If this was the last open association the channel closes. Its items
    /// stay queued until the channel is destroyed, and blocked senders of
    /// those items are woken as not received. `_force` is accepted for
    /// parity with [`close`](Self::close) and has no effect.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`] or [`ChannelError::Closed`].
    pub fn release(
        &self,
        ctx: ContextId,
        id: ChannelId,
        end: ChannelEnd,
        _force: bool,
    ) -> Result<(), ChannelError> {
        let channel = self.lookup(id)?;
        let stranded = channel.release_context(ctx, end)?;
        self.release_drained(id, stranded);
        Ok(())
    }

    // === Introspection ===

    /// Number of queued items.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`] or [`ChannelError::Closed`].
    pub fn get_count(&self, id: ChannelId) -> Result<usize, ChannelError> {
        self.lookup(id)?.count()
    }

    /// Status snapshot as seen from `ctx`. Works on closed channels.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`] only.
    pub fn get_info(&self, ctx: ContextId, id: ChannelId) -> Result<ChannelInfo, ChannelError> {
        Ok(self.get(id)?.info(ctx))
    }

    /// The policies sends fall back to.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`] or [`ChannelError::Closed`].
    pub fn get_channel_defaults(&self, id: ChannelId) -> Result<ChannelDefaults, ChannelError> {
        Ok(self.lookup(id)?.defaults())
    }

    /// Every registered channel with its defaults, ordered by id.
    #[must_use]
    pub fn list_all(&self) -> Vec<(ChannelId, ChannelDefaults)> {
        let state = self.state.lock();
        let mut all: Vec<_> = state
            .refs
            .iter()
            .map(|(id, r)| (*id, r.channel.defaults()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    /// Contexts with an open association on `end`.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`], or [`ChannelError::Closed`] if the
    /// channel is closed, or closing and `end` includes send.
    pub fn list_contexts(
        &self,
        id: ChannelId,
        end: ChannelEnd,
    ) -> Result<Vec<ContextId>, ChannelError> {
        self.lookup(id)?.list_contexts(end)
    }

    /// Whether `ctx` holds an open association with `end`.
    ///
    /// # Errors
    ///
    /// Same as [`list_contexts`](Self::list_contexts).
    pub fn is_associated(
        &self,
        id: ChannelId,
        ctx: ContextId,
        end: ChannelEnd,
    ) -> Result<bool, ChannelError> {
        self.lookup(id)?.is_associated(ctx, end)
    }

    // === Context teardown ===

    /// Reconciles every channel with the destruction of `ctx`.
    ///
    /// Items `ctx` sent are removed or turned into unbound placeholders
    /// according to their policy, and its associations are closed. The
    /// sweep never fails: problems are logged and the sweep moves on.
    pub fn clear_context(&self, ctx: ContextId) {
        let channels: Vec<Arc<Channel>> = self
            .state
            .lock()
            .refs
            .values()
            .map(|r| Arc::clone(&r.channel))
            .collect();

        let mut cleared = 0;
        for channel in channels {
            let drained = channel.clear_context(ctx);
            if !drained.tokens.is_empty() {
                cleared += 1;
            }
            self.release_drained(channel.id(), drained);
        }
        info!(context = %ctx, channels = cleared, "context teardown sweep finished");
    }

    // === Handles ===

    /// Opens a reference-counted handle on `id`.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`] if the id is not registered.
    pub fn handle(self: &Arc<Self>, id: ChannelId, end: ChannelEnd) -> Result<ChannelHandle<B>, ChannelError> {
        self.add_ref(id)?;
        Ok(ChannelHandle::from_ref(Arc::clone(self), id, end))
    }

    /// Creates a channel with configured defaults and opens a handle on it.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub fn create_handle(self: &Arc<Self>) -> Result<ChannelHandle<B>, ChannelError> {
        let id = self.create_default()?;
        self.handle(id, ChannelEnd::Both)
    }

    /// Counts one more live handle on `id`.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`] if the id is not registered.
    pub fn add_ref(&self, id: ChannelId) -> Result<(), ChannelError> {
        let mut state = self.state.lock();
        let r = state.refs.get_mut(&id).ok_or(ChannelError::NotFound(id))?;
        r.handles += 1;
        Ok(())
    }

    /// Counts one handle on `id` as gone. At zero the channel is removed
    /// and drained. A channel that was already destroyed is ignored.
    pub fn release_ref(&self, id: ChannelId) {
        let removed = {
            let mut state = self.state.lock();
            let Some(r) = state.refs.get_mut(&id) else {
                debug!(channel = %id, "handle released after channel was destroyed");
                return;
            };
            r.handles = r.handles.saturating_sub(1);
            if r.handles > 0 {
                return;
            }
            state.refs.remove(&id).map(|r| r.channel)
        };
        if let Some(channel) = removed {
            self.shutdown(&channel);
            info!(channel = %id, "last handle released, channel removed");
        }
    }

    /// Number of live handles on `id`, or `None` if not registered.
    #[must_use]
    pub fn ref_count(&self, id: ChannelId) -> Option<usize> {
        self.state.lock().refs.get(&id).map(|r| r.handles)
    }

    // === Internals ===

    fn shutdown(&self, channel: &Channel) {
        let drained = channel.shutdown();
        self.release_drained(channel.id(), drained);
    }

    /// Releases drained tokens and wakes drained waiters as not received.
    /// Must be called without any lock held.
    fn release_drained(&self, id: ChannelId, drained: Drained) {
        for waiter in &drained.waiters {
            waiter.release(false);
        }
        for token in drained.tokens {
            if let Err(e) = self.boundary.release(token) {
                warn!(channel = %id, error = %e, "failed to release drained token");
            }
        }
    }

    #[cfg(test)]
    fn set_next_id(&self, next: Option<ChannelId>) {
        self.state.lock().next_id = next;
    }
}

impl<B: ShareableBoundary> std::fmt::Debug for ChannelRegistry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ChannelRegistry")
            .field("channels", &state.refs.len())
            .field("next_id", &state.next_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isochan_data::{OpaqueObject, Value};
    use isochan_types::ErrorCode;

    const MAIN: ContextId = ContextId::new(0);
    const WORKER: ContextId = ContextId::new(1);

    fn registry() -> ChannelRegistry {
        ChannelRegistry::new()
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let reg = registry();
        let a = reg.create_default().unwrap();
        reg.destroy(a).unwrap();
        let b = reg.create_default().unwrap();
        assert!(b > a);
        assert_eq!(reg.destroy(a).unwrap_err(), ChannelError::NotFound(a));
    }

    #[test]
    fn id_exhaustion_is_an_error() {
        let reg = registry();
        reg.set_next_id(Some(ChannelId::from_raw(i64::MAX)));
        let last = reg.create_default().expect("last id is still usable");
        assert_eq!(last.as_i64(), i64::MAX);
        let err = reg.create_default().unwrap_err();
        assert_eq!(err, ChannelError::ResourceExhausted);
        assert_eq!(err.code(), "CHANNEL_RESOURCE_EXHAUSTED");
    }

    #[test]
    fn send_resolves_channel_defaults() {
        let reg = registry();
        let id = reg
            .create(UnboundOp::Remove, FallbackPolicy::ShareableOnly)
            .unwrap();
        let list = Value::List(vec![Value::Int(1)]);

        let err = reg
            .send(MAIN, id, &list, SendOptions::nowait())
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotShareable(_)));
        assert_eq!(reg.get_count(id), Ok(0));

        reg.send(
            MAIN,
            id,
            &list,
            SendOptions::nowait().fallback(FallbackPolicy::Full),
        )
        .expect("explicit full fallback");
        assert_eq!(reg.recv(WORKER, id), Ok(Received::Value(list)));
    }

    #[test]
    fn object_never_crosses() {
        let reg = registry();
        let id = reg.create_default().unwrap();
        let err = reg
            .send(
                MAIN,
                id,
                &Value::Object(OpaqueObject::new(1_u8)),
                SendOptions::nowait(),
            )
            .unwrap_err();
        assert_eq!(err.code(), "CHANNEL_NOT_SHAREABLE");
        assert_eq!(reg.boundary().total_live_tokens(), 0);
    }

    #[test]
    fn rejected_send_releases_token() {
        let reg = registry();
        let id = reg.create_default().unwrap();
        reg.send(MAIN, id, &Value::Int(1), SendOptions::nowait())
            .unwrap();
        reg.close(id, ChannelEnd::Send, false).unwrap();

        let err = reg
            .send(MAIN, id, &Value::Int(2), SendOptions::nowait())
            .unwrap_err();
        assert!(err.is_closed());
        assert_eq!(reg.boundary().live_tokens(MAIN), 1);
    }

    #[test]
    fn recv_releases_token() {
        let reg = registry();
        let id = reg.create_default().unwrap();
        reg.send(MAIN, id, &Value::from("x"), SendOptions::nowait())
            .unwrap();
        assert_eq!(reg.boundary().live_tokens(MAIN), 1);
        reg.recv(WORKER, id).unwrap();
        assert_eq!(reg.boundary().live_tokens(MAIN), 0);
    }

    #[test]
    fn recv_or_default_on_empty() {
        let reg = registry();
        let id = reg.create_default().unwrap();
        assert_eq!(
            reg.recv_or(WORKER, id, Value::None),
            Ok(Received::Value(Value::None))
        );
    }

    #[test]
    fn destroy_drains_tokens() {
        let reg = registry();
        let id = reg.create_default().unwrap();
        for n in 0..3 {
            reg.send(MAIN, id, &Value::Int(n), SendOptions::nowait())
                .unwrap();
        }
        reg.destroy(id).unwrap();
        assert_eq!(reg.boundary().total_live_tokens(), 0);
        assert_eq!(reg.get_count(id), Err(ChannelError::NotFound(id)));
    }

    #[test]
    fn lookup_distinguishes_closed_from_missing() {
        let reg = registry();
        let id = reg.create_default().unwrap();
        reg.close(id, ChannelEnd::Both, false).unwrap();
        assert_eq!(reg.lookup(id).unwrap_err(), ChannelError::Closed(id));
        let missing = ChannelId::from_raw(99);
        assert_eq!(reg.lookup(missing).unwrap_err(), ChannelError::NotFound(missing));
    }

    #[test]
    fn list_all_includes_defaults() {
        let reg = registry();
        let a = reg.create(UnboundOp::Error, FallbackPolicy::Full).unwrap();
        let b = reg.create_default().unwrap();
        let all = reg.list_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], (a, ChannelDefaults::new(UnboundOp::Error, FallbackPolicy::Full)));
        assert_eq!(all[1].0, b);
        assert_eq!(reg.get_channel_defaults(a).unwrap().unbound_op, UnboundOp::Error);
    }

    #[test]
    fn create_default_uses_config() {
        let mut config = IsochanConfig::default();
        config.channels.unbound_op = UnboundOp::Remove;
        let reg = ChannelRegistry::with_config(Arc::new(ValueBoundary::new()), config);
        let id = reg.create_default().unwrap();
        assert_eq!(reg.get_channel_defaults(id).unwrap().unbound_op, UnboundOp::Remove);
    }

    #[test]
    fn configured_send_timeout_applies_to_blocking_sends() {
        let mut config = IsochanConfig::default();
        config.wait.send_timeout_ms = 10;
        let reg = ChannelRegistry::with_config(Arc::new(ValueBoundary::new()), config);
        let id = reg.create_default().unwrap();

        let err = reg
            .send(MAIN, id, &Value::Int(1), SendOptions::new())
            .unwrap_err();
        assert_eq!(
            err,
            ChannelError::Timeout {
                channel: id,
                timeout: Duration::from_millis(10)
            }
        );
        // The timed-out item was withdrawn and its token released.
        assert_eq!(reg.get_count(id), Ok(0));
        assert_eq!(reg.boundary().total_live_tokens(), 0);
    }

    #[test]
    fn handles_count_references() {
        let reg = Arc::new(registry());
        let id = reg.create_default().unwrap();
        let h1 = reg.handle(id, ChannelEnd::Send).unwrap();
        let h2 = h1.clone();
        assert_eq!(reg.ref_count(id), Some(2));
        drop(h1);
        assert_eq!(reg.ref_count(id), Some(1));
        drop(h2);
        assert_eq!(reg.ref_count(id), None);
    }

    #[test]
    fn release_ref_after_destroy_is_ignored() {
        let reg = registry();
        let id = reg.create_default().unwrap();
        reg.add_ref(id).unwrap();
        reg.destroy(id).unwrap();
        reg.release_ref(id);
        assert_eq!(reg.add_ref(id), Err(ChannelError::NotFound(id)));
    }
}
