//! Reference-counted channel handles.

use super::error::ChannelError;
use super::registry::{ChannelRegistry, Received, SendOptions};
use isochan_data::ShareableBoundary;
use isochan_types::{ChannelEnd, ChannelId, ContextId};
use std::sync::Arc;
use tracing::warn;

/// A view of one channel with a fixed end.
///
/// Every live handle holds a reference on its channel. Cloning adds one,
/// dropping removes one, and the channel is destroyed when the last
/// handle goes away. Handles made for [`ChannelEnd::Send`] cannot
/// receive and vice versa.
///
/// ```
/// use isochan_data::Value;
/// use isochan_runtime::{ChannelError, ChannelRegistry, Received};
/// use isochan_types::{ChannelEnd, ContextId};
/// use std::sync::Arc;
///
/// let registry = Arc::new(ChannelRegistry::new());
/// let id = registry.create_default()?;
/// let tx = registry.handle(id, ChannelEnd::Send)?;
/// let rx = registry.handle(id, ChannelEnd::Recv)?;
///
/// tx.send(ContextId::new(0), &Value::Int(1))?;
/// assert_eq!(rx.recv(ContextId::new(1))?, Received::Value(Value::Int(1)));
/// assert!(matches!(tx.recv(ContextId::new(0)), Err(ChannelError::WrongEnd { .. })));
///
/// drop((tx, rx));
/// assert!(registry.get_count(id).is_err());
/// # Ok::<(), ChannelError>(())
/// ```
pub struct ChannelHandle<B: ShareableBoundary> {
    registry: Arc<ChannelRegistry<B>>,
    id: ChannelId,
    end: ChannelEnd,
}

impl<B: ShareableBoundary> ChannelHandle<B> {
    /// Wraps a reference the caller has already counted.
    pub(crate) fn from_ref(registry: Arc<ChannelRegistry<B>>, id: ChannelId, end: ChannelEnd) -> Self {
        Self { registry, id, end }
    }

    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    #[must_use]
    pub fn end(&self) -> ChannelEnd {
        self.end
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ChannelRegistry<B>> {
        &self.registry
    }

    fn require(&self, needed: ChannelEnd) -> Result<(), ChannelError> {
        let ok = match needed {
            ChannelEnd::Send => self.end.includes_send(),
            ChannelEnd::Recv => self.end.includes_recv(),
            ChannelEnd::Both => self.end == ChannelEnd::Both,
        };
        if ok {
            Ok(())
        } else {
            Err(ChannelError::WrongEnd {
                channel: self.id,
                needed,
            })
        }
    }

    /// Non-blocking send with channel defaults.
    ///
    /// # Errors
    ///
    /// [`ChannelError::WrongEnd`] on a receive-only handle, otherwise as
    /// [`ChannelRegistry::send`].
    pub fn send(&self, ctx: ContextId, value: &B::Value) -> Result<(), ChannelError> {
        self.send_with(ctx, value, SendOptions::nowait())
    }

    /// Send with explicit options.
    ///
    /// # Errors
    ///
    /// [`ChannelError::WrongEnd`] on a receive-only handle, otherwise as
    /// [`ChannelRegistry::send`].
    pub fn send_with(
        &self,
        ctx: ContextId,
        value: &B::Value,
        options: SendOptions,
    ) -> Result<(), ChannelError> {
        self.require(ChannelEnd::Send)?;
        self.registry.send(ctx, self.id, value, options)
    }

    /// # Errors
    ///
    /// [`ChannelError::WrongEnd`] on a send-only handle, otherwise as
    /// [`ChannelRegistry::recv`].
    pub fn recv(&self, ctx: ContextId) -> Result<Received<B::Value>, ChannelError> {
        self.require(ChannelEnd::Recv)?;
        self.registry.recv(ctx, self.id)
    }

    /// # Errors
    ///
    /// [`ChannelError::WrongEnd`] on a send-only handle, otherwise as
    /// [`ChannelRegistry::recv_or`].
    pub fn recv_or(
        &self,
        ctx: ContextId,
        default: B::Value,
    ) -> Result<Received<B::Value>, ChannelError> {
        self.require(ChannelEnd::Recv)?;
        self.registry.recv_or(ctx, self.id, default)
    }

    /// Closes this handle's end of the channel for every context.
    ///
    /// # Errors
    ///
    /// As [`ChannelRegistry::close`].
    pub fn close(&self, force: bool) -> Result<(), ChannelError> {
        self.registry.close(self.id, self.end, force)
    }

    /// Releases `ctx`'s association with this handle's end.
    ///
    /// # Errors
    ///
    /// As [`ChannelRegistry::release`].
    pub fn release(&self, ctx: ContextId, force: bool) -> Result<(), ChannelError> {
        self.registry.release(ctx, self.id, self.end, force)
    }
}

impl<B: ShareableBoundary> Clone for ChannelHandle<B> {
    fn clone(&self) -> Self {
        if let Err(e) = self.registry.add_ref(self.id) {
            warn!(channel = %self.id, error = %e, "cloned handle of a destroyed channel");
        }
        Self::from_ref(Arc::clone(&self.registry), self.id, self.end)
    }
}

impl<B: ShareableBoundary> Drop for ChannelHandle<B> {
    fn drop(&mut self) {
        self.registry.release_ref(self.id);
    }
}

impl<B: ShareableBoundary> std::fmt::Debug for ChannelHandle<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("id", &self.id)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}
