//! A single channel: queue, end associations, status, all under one lock.
//!
//! Every method here takes the channel mutex for one short mutation and
//! never blocks or calls the shareable-data boundary while holding it.
//! Tokens and waiters taken out of the queue are handed back to the
//! caller, which releases them after the lock is dropped.

use super::ends::{ChannelEnds, EndClosed};
use super::error::ChannelError;
use super::info::{ChannelInfo, ChannelStatus};
use super::queue::{ChannelQueue, Drained, Item};
use super::waiter::Waiter;
use isochan_data::ShareableToken;
use isochan_types::{ChannelDefaults, ChannelEnd, ChannelId, ContextId, ItemId, UnboundOp};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// A send the channel refused. Carries the token back so the caller can
/// release it.
#[derive(Debug)]
pub struct SendRejected {
    pub error: ChannelError,
    pub token: ShareableToken,
}

/// Result of [`Channel::close`].
#[derive(Debug)]
pub enum CloseOutcome {
    /// The channel is closed. Holds whatever a forced close drained.
    Closed(Drained),
    /// The send end is closed; the channel closes once the queue drains.
    Closing,
}

#[derive(Debug)]
struct ChannelState {
    queue: ChannelQueue,
    ends: ChannelEnds,
    open: bool,
    closing: bool,
    /// Closed by draining after a send-side close. Receivers keep seeing
    /// an empty channel rather than a closed one.
    drained: bool,
}

impl ChannelState {
    /// Closing channels close for good the moment their queue is empty.
    fn finish_closing(&mut self, id: ChannelId) {
        if self.closing && self.queue.is_empty() {
            self.closing = false;
            self.open = false;
            self.drained = true;
            info!(channel = %id, "closing channel drained, now closed");
        }
    }

    fn status(&self) -> ChannelStatus {
        if !self.open {
            ChannelStatus::Closed
        } else if self.closing {
            ChannelStatus::Closing
        } else {
            ChannelStatus::Open
        }
    }
}

/// One channel.
#[derive(Debug)]
pub struct Channel {
    id: ChannelId,
    defaults: ChannelDefaults,
    state: Mutex<ChannelState>,
}

impl Channel {
    #[must_use]
    pub fn new(id: ChannelId, defaults: ChannelDefaults) -> Self {
        Self {
            id,
            defaults,
            state: Mutex::new(ChannelState {
                queue: ChannelQueue::new(),
                ends: ChannelEnds::new(),
                open: true,
                closing: false,
                drained: false,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    #[must_use]
    pub fn defaults(&self) -> ChannelDefaults {
        self.defaults
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        self.state.lock().status()
    }

    /// Queues a token sent by `ctx`, associating `ctx` with the send end.
    ///
    /// # Errors
    ///
    /// Rejected with [`ChannelError::Closed`] if the channel is closed or
    /// closing, or [`ChannelError::EndClosed`] if `ctx`'s send end was
    /// closed. The token comes back inside the rejection.
    pub fn add(
        &self,
        ctx: ContextId,
        token: ShareableToken,
        unbound_op: UnboundOp,
        waiter: Option<Arc<Waiter>>,
    ) -> Result<ItemId, SendRejected> {
        let mut state = self.state.lock();
        if !state.open || state.closing {
            return Err(SendRejected {
                error: ChannelError::Closed(self.id),
                token,
            });
        }
        if state.ends.associate(ctx, ChannelEnd::Send) == Err(EndClosed) {
            return Err(SendRejected {
                error: ChannelError::EndClosed(self.id),
                token,
            });
        }
        let item = state.queue.put(ctx, token, unbound_op, waiter);
        debug!(channel = %self.id, context = %ctx, %item, queued = state.queue.len(), "item queued");
        Ok(item)
    }

    /// Pops the head item for `ctx`, associating `ctx` with the receive end.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Empty`] if the channel closed by draining
    /// - [`ChannelError::Closed`] if the channel is otherwise closed
    /// - [`ChannelError::EndClosed`] if `ctx`'s receive end was closed
    /// - [`ChannelError::Empty`] if nothing is queued
    pub fn next(&self, ctx: ContextId) -> Result<Item, ChannelError> {
        let mut state = self.state.lock();
        if !state.open {
            if state.drained {
                return Err(ChannelError::Empty(self.id));
            }
            return Err(ChannelError::Closed(self.id));
        }
        if state.ends.associate(ctx, ChannelEnd::Recv).is_err() {
            return Err(ChannelError::EndClosed(self.id));
        }
        let item = state.queue.get();
        state.finish_closing(self.id);
        match item {
            Some(item) => {
                debug!(channel = %self.id, context = %ctx, item = %item.id, "item popped");
                Ok(item)
            }
            None => Err(ChannelError::Empty(self.id)),
        }
    }

    /// Withdraws a queued item, e.g. a blocking send that timed out.
    ///
    /// Returns `None` if the item was already taken.
    pub fn remove(&self, item: ItemId) -> Option<Item> {
        let mut state = self.state.lock();
        let removed = state.queue.remove(item);
        if removed.is_some() {
            debug!(channel = %self.id, %item, "item withdrawn");
            state.finish_closing(self.id);
        }
        removed
    }

    /// Releases `ctx` from the selected end(s) and recomputes whether the
    /// channel is still open.
    ///
    /// Queued items stay where they are. If this closes the channel, the
    /// waiters of those items are detached and returned so their senders
    /// can be woken as not received.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Closed`] if the channel is already closed.
    pub fn release_context(&self, ctx: ContextId, end: ChannelEnd) -> Result<Drained, ChannelError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(ChannelError::Closed(self.id));
        }
        state.ends.release_context(ctx, end);
        state.open = state.ends.is_open();
        debug!(channel = %self.id, context = %ctx, %end, open = state.open, "end released");

        let mut stranded = Drained::default();
        if !state.open {
            state.closing = false;
            stranded.waiters = state.queue.take_waiters();
            info!(
                channel = %self.id,
                queued = state.queue.len(),
                "last end released, channel closed"
            );
        }
        Ok(stranded)
    }

    /// Closes the channel.
    ///
    /// | Queue | `force` | `end` | Outcome |
    /// |-------|---------|-------|---------|
    /// | empty | any | any | closed |
    /// | non-empty | yes | any | drained, closed |
    /// | non-empty | no | send | closing |
    /// | non-empty | no | recv / both | `NotEmpty` |
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Closed`] if already closed, or if a non-forced
    ///   send close finds the channel already closing
    /// - [`ChannelError::NotEmpty`] per the table above
    pub fn close(&self, end: ChannelEnd, force: bool) -> Result<CloseOutcome, ChannelError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(ChannelError::Closed(self.id));
        }
        if !force && end == ChannelEnd::Send && state.closing {
            return Err(ChannelError::Closed(self.id));
        }
        if !force && !state.queue.is_empty() {
            if end != ChannelEnd::Send {
                return Err(ChannelError::NotEmpty(self.id));
            }
            state.closing = true;
            info!(channel = %self.id, queued = state.queue.len(), "channel closing");
            return Ok(CloseOutcome::Closing);
        }

        state.open = false;
        state.closing = false;
        state.ends.release_all();
        let drained = state.queue.drain_all();
        info!(channel = %self.id, %end, force, drained = drained.tokens.len(), "channel closed");
        Ok(CloseOutcome::Closed(drained))
    }

    /// Applies the unbound policy to items sent by a torn-down context and
    /// closes its associations.
    ///
    /// If this closes the channel, the waiters of items still queued are
    /// detached and returned along with the cleared tokens.
    pub fn clear_context(&self, ctx: ContextId) -> Drained {
        let mut state = self.state.lock();
        let mut drained = state.queue.clear_context(ctx);
        state.ends.clear_context(ctx);
        if state.open {
            state.open = state.ends.is_open();
            if !state.open {
                state.closing = false;
                drained.waiters.extend(state.queue.take_waiters());
                info!(channel = %self.id, context = %ctx, "context teardown closed channel");
            }
        }
        state.finish_closing(self.id);
        if !drained.is_empty() {
            debug!(
                channel = %self.id,
                context = %ctx,
                tokens = drained.tokens.len(),
                "context items cleared"
            );
        }
        drained
    }

    /// Closes the channel unconditionally and drains it. Used when the
    /// channel is removed from its registry.
    pub fn shutdown(&self) -> Drained {
        let mut state = self.state.lock();
        state.open = false;
        state.closing = false;
        state.ends.release_all();
        state.queue.drain_all()
    }

    /// Number of queued items.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Closed`] if the channel is closed.
    pub fn count(&self) -> Result<usize, ChannelError> {
        let state = self.state.lock();
        if !state.open {
            return Err(ChannelError::Closed(self.id));
        }
        Ok(state.queue.len())
    }

    /// Snapshot of the channel as seen from `ctx`. Works on closed channels.
    #[must_use]
    pub fn info(&self, ctx: ContextId) -> ChannelInfo {
        let state = self.state.lock();
        ChannelInfo {
            id: self.id,
            status: state.status(),
            count: state.queue.len(),
            defaults: self.defaults,
            ends: state.ends.summary(ctx),
        }
    }

    /// Whether `ctx` holds an open association with `end`.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Closed`] if the channel is closed, or closing and
    /// `end` includes send.
    pub fn is_associated(&self, ctx: ContextId, end: ChannelEnd) -> Result<bool, ChannelError> {
        let state = self.state.lock();
        self.check_end_usable(&state, end)?;
        Ok(state.ends.is_associated(ctx, end))
    }

    /// Contexts with an open association on `end`.
    ///
    /// # Errors
    ///
    /// Same as [`is_associated`](Self::is_associated).
    pub fn list_contexts(&self, end: ChannelEnd) -> Result<Vec<ContextId>, ChannelError> {
        let state = self.state.lock();
        self.check_end_usable(&state, end)?;
        Ok(state.ends.open_contexts(end))
    }

    fn check_end_usable(&self, state: &ChannelState, end: ChannelEnd) -> Result<(), ChannelError> {
        if !state.open || (state.closing && end.includes_send()) {
            return Err(ChannelError::Closed(self.id));
        }
        Ok(())
    }
}
