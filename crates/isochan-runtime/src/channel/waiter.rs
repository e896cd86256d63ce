//! One-shot send/receive handshake.
//!
//! A blocking sender attaches a [`Waiter`] to its item and sleeps on it.
//! Whoever takes the item out of the queue releases the waiter exactly
//! once, saying whether the item was actually received.
//!
//! # Status
//!
//! ```text
//! None ──acquire()──► Acquired ──release()──► Releasing ──► Released
//! ```
//!
//! The releasing side fires the event while in `Releasing` and records
//! `received` before moving to `Released`. A woken sender that still sees
//! `Releasing` yields until `Released` before reading the outcome.

use isochan_types::ItemId;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

const RELEASE_BACKOFF: Duration = Duration::from_micros(100);

/// Waiter lifecycle status. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WaiterStatus {
    None = 0,
    Acquired = 1,
    Releasing = 2,
    Released = 3,
}

impl WaiterStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Acquired,
            2 => Self::Releasing,
            _ => Self::Released,
        }
    }
}

/// One-shot handshake between a blocking sender and a receiver.
#[derive(Debug)]
pub struct Waiter {
    status: AtomicU8,
    received: AtomicBool,
    item: Mutex<Option<ItemId>>,
    fired: Mutex<bool>,
    event: Condvar,
}

impl Waiter {
    /// Creates an unacquired waiter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(WaiterStatus::None as u8),
            received: AtomicBool::new(false),
            item: Mutex::new(None),
            fired: Mutex::new(false),
            event: Condvar::new(),
        }
    }

    /// Binds the waiter to the item it waits on.
    ///
    /// Called by the queue when the item is enqueued. Returns `false` if
    /// the waiter was already acquired.
    pub fn acquire(&self, item: ItemId) -> bool {
        let acquired = self
            .status
            .compare_exchange(
                WaiterStatus::None as u8,
                WaiterStatus::Acquired as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if acquired {
            *self.item.lock() = Some(item);
        }
        acquired
    }

    /// Wakes the sender. Only the first call has any effect.
    ///
    /// Returns `true` if this call released the waiter.
    pub fn release(&self, received: bool) -> bool {
        if self
            .status
            .compare_exchange(
                WaiterStatus::Acquired as u8,
                WaiterStatus::Releasing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        {
            let mut fired = self.fired.lock();
            *fired = true;
            self.event.notify_all();
        }
        self.received.store(received, Ordering::Release);
        self.status
            .store(WaiterStatus::Released as u8, Ordering::Release);
        true
    }

    /// Blocks until the waiter is released or `timeout` elapses.
    ///
    /// `None` waits forever. Returns `true` if the waiter was released.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut fired = self.fired.lock();
        match timeout {
            None => {
                while !*fired {
                    self.event.wait(&mut fired);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                loop {
                    if *fired {
                        return true;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let remain = deadline.saturating_duration_since(now);
                    let _ = self.event.wait_for(&mut fired, remain);
                }
            }
        }
    }

    /// Waits out a releasing side that has fired the event but not yet
    /// recorded the outcome, then returns whether the item was received.
    ///
    /// Yields up to `spin_limit` times, then backs off to short sleeps.
    pub fn finish_release(&self, spin_limit: u32) -> bool {
        let mut spins: u32 = 0;
        while self.status() == WaiterStatus::Releasing {
            if spins < spin_limit {
                std::thread::yield_now();
            } else {
                if spins == spin_limit {
                    debug!(spins, "waiter still releasing, backing off");
                }
                std::thread::sleep(RELEASE_BACKOFF);
            }
            spins = spins.saturating_add(1);
        }
        self.received()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> WaiterStatus {
        WaiterStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Whether the item was received. Meaningful once released.
    #[must_use]
    pub fn received(&self) -> bool {
        self.received.load(Ordering::Acquire)
    }

    /// Item this waiter is bound to, once acquired.
    #[must_use]
    pub fn item_id(&self) -> Option<ItemId> {
        *self.item.lock()
    }
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}
