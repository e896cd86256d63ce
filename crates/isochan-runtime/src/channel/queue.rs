//! FIFO of queued items.
//!
//! The queue holds tokens and waiters but never calls the boundary: every
//! operation that takes a token out of the queue hands it back to the
//! caller, which releases it after dropping the channel lock.

use super::waiter::Waiter;
use isochan_data::ShareableToken;
use isochan_types::{ContextId, ItemId, UnboundOp};
use std::collections::VecDeque;
use std::sync::Arc;

/// One queued send.
#[derive(Debug)]
pub struct Item {
    /// Context that sent the item.
    pub owner: ContextId,
    pub id: ItemId,
    /// `None` once the owner was torn down: an unbound placeholder.
    pub token: Option<ShareableToken>,
    pub waiter: Option<Arc<Waiter>>,
    pub unbound_op: UnboundOp,
}

impl Item {
    /// Returns `true` if the item lost its data.
    #[must_use]
    pub fn is_unbound(&self) -> bool {
        self.token.is_none()
    }
}

/// Tokens and waiters taken out of a queue, to be released by the caller.
#[derive(Debug, Default)]
pub struct Drained {
    pub tokens: Vec<ShareableToken>,
    pub waiters: Vec<Arc<Waiter>>,
}

impl Drained {
    /// Returns `true` if nothing was taken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.waiters.is_empty()
    }

    /// Takes ownership of everything an unlinked item carries.
    pub fn absorb(&mut self, item: Item) {
        if let Some(token) = item.token {
            self.tokens.push(token);
        }
        if let Some(waiter) = item.waiter {
            self.waiters.push(waiter);
        }
    }
}

/// Ordered queue of items with per-channel item ids.
#[derive(Debug, Default)]
pub struct ChannelQueue {
    items: VecDeque<Item>,
    next_item: u64,
}

impl ChannelQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of linked items, placeholders included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends an item. If a waiter is given it is acquired for the item.
    pub fn put(
        &mut self,
        owner: ContextId,
        token: ShareableToken,
        unbound_op: UnboundOp,
        waiter: Option<Arc<Waiter>>,
    ) -> ItemId {
        let id = ItemId::new(self.next_item);
        self.next_item = self.next_item.wrapping_add(1);
        if let Some(waiter) = &waiter {
            waiter.acquire(id);
        }
        self.items.push_back(Item {
            owner,
            id,
            token: Some(token),
            waiter,
            unbound_op,
        });
        id
    }

    /// Pops the head item.
    pub fn get(&mut self) -> Option<Item> {
        self.items.pop_front()
    }

    /// Unlinks the item with `id`, wherever it is.
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|item| item.id == id)?;
        self.items.remove(index)
    }

    /// Applies each item's unbound policy to everything `ctx` sent.
    ///
    /// `Remove` items are unlinked. `Error` and `Replace` items lose their
    /// token but stay queued as placeholders, keeping their waiter.
    pub fn clear_context(&mut self, ctx: ContextId) -> Drained {
        let mut drained = Drained::default();
        let mut kept = VecDeque::with_capacity(self.items.len());
        for mut item in self.items.drain(..) {
            if item.owner != ctx {
                kept.push_back(item);
                continue;
            }
            match item.unbound_op {
                UnboundOp::Remove => drained.absorb(item),
                UnboundOp::Error | UnboundOp::Replace => {
                    if let Some(token) = item.token.take() {
                        drained.tokens.push(token);
                    }
                    kept.push_back(item);
                }
            }
        }
        self.items = kept;
        drained
    }

    /// Detaches every waiter, leaving the items queued.
    pub fn take_waiters(&mut self) -> Vec<Arc<Waiter>> {
        self.items
            .iter_mut()
            .filter_map(|item| item.waiter.take())
            .collect()
    }

    /// Unlinks every item.
    pub fn drain_all(&mut self) -> Drained {
        let mut drained = Drained::default();
        for item in self.items.drain(..) {
            drained.absorb(item);
        }
        drained
    }
}
