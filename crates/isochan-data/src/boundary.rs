//! The shareable-data boundary.
//!
//! Channels never look inside a value. They call a [`ShareableBoundary`]
//! to turn a sender's value into a [`ShareableToken`], queue the token, and
//! call the boundary again to rebuild a value inside the receiving context.
//!
//! ```text
//!   context A                    channel                    context B
//! ┌──────────┐  convert   ┌──────────────────┐  reconstruct ┌──────────┐
//! │  Value   │ ─────────► │ ShareableToken … │ ───────────► │  Value   │
//! └──────────┘            └──────────────────┘   release    └──────────┘
//! ```
//!
//! Boundary calls are made outside every channel lock.

use crate::error::DataError;
use crate::registry::{reconstruct, ConversionRegistry};
use crate::token::ShareableToken;
use crate::value::Value;
use isochan_types::{ContextId, FallbackPolicy};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::trace;

/// Converts values to tokens and back.
///
/// Implementations must be usable from any thread.
pub trait ShareableBoundary: Send + Sync {
    /// The host value type.
    type Value: Send;

    /// Converts a value owned by `ctx` into a token.
    ///
    /// # Errors
    ///
    /// [`DataError::NotShareable`] if the value cannot cross contexts under
    /// `fallback`.
    fn convert(
        &self,
        ctx: ContextId,
        value: &Self::Value,
        fallback: FallbackPolicy,
    ) -> Result<ShareableToken, DataError>;

    /// Builds an equivalent value inside `ctx`.
    ///
    /// The token stays owned by the caller and must still be released.
    ///
    /// # Errors
    ///
    /// Returns an error if the token payload cannot be decoded.
    fn reconstruct(&self, ctx: ContextId, token: &ShareableToken) -> Result<Self::Value, DataError>;

    /// Releases a token. Consumes it, so each token is released once.
    ///
    /// # Errors
    ///
    /// Returns an error if the token was not issued by this boundary.
    fn release(&self, token: ShareableToken) -> Result<(), DataError>;
}

/// The default boundary for [`Value`].
///
/// Conversions come from a [`ConversionRegistry`]. The boundary counts live
/// tokens per owning context, which lets hosts (and tests) check that every
/// token was released.
///
/// # Example
///
/// ```
/// use isochan_data::{ShareableBoundary, Value, ValueBoundary};
/// use isochan_types::{ContextId, FallbackPolicy};
///
/// let boundary = ValueBoundary::new();
/// let (a, b) = (ContextId::new(1), ContextId::new(2));
///
/// let token = boundary.convert(a, &Value::from("spam"), FallbackPolicy::Full)?;
/// assert_eq!(boundary.live_tokens(a), 1);
///
/// let value = boundary.reconstruct(b, &token)?;
/// boundary.release(token)?;
///
/// assert_eq!(value, Value::from("spam"));
/// assert_eq!(boundary.live_tokens(a), 0);
/// # Ok::<(), isochan_data::DataError>(())
/// ```
#[derive(Debug, Default)]
pub struct ValueBoundary {
    conversions: ConversionRegistry,
    live: Mutex<HashMap<ContextId, usize>>,
}

impl ValueBoundary {
    /// Creates a boundary with the built-in conversions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_conversions(ConversionRegistry::new())
    }

    /// Creates a boundary over a custom conversion table.
    #[must_use]
    pub fn with_conversions(conversions: ConversionRegistry) -> Self {
        Self {
            conversions,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// The conversion table, for registering more kinds.
    #[must_use]
    pub fn conversions(&self) -> &ConversionRegistry {
        &self.conversions
    }

    /// Number of unreleased tokens owned by `ctx`.
    #[must_use]
    pub fn live_tokens(&self, ctx: ContextId) -> usize {
        self.live.lock().get(&ctx).copied().unwrap_or(0)
    }

    /// Number of unreleased tokens across all contexts.
    #[must_use]
    pub fn total_live_tokens(&self) -> usize {
        self.live.lock().values().sum()
    }
}

impl ShareableBoundary for ValueBoundary {
    type Value = Value;

    fn convert(
        &self,
        ctx: ContextId,
        value: &Value,
        fallback: FallbackPolicy,
    ) -> Result<ShareableToken, DataError> {
        let data = self.conversions.convert(value, fallback)?;
        *self.live.lock().entry(ctx).or_insert(0) += 1;
        trace!(context = %ctx, kind = %value.kind(), "converted value");
        Ok(ShareableToken::new(ctx, value.kind(), data))
    }

    fn reconstruct(&self, _ctx: ContextId, token: &ShareableToken) -> Result<Value, DataError> {
        reconstruct(token.data())
    }

    fn release(&self, token: ShareableToken) -> Result<(), DataError> {
        let owner = token.owner();
        let mut live = self.live.lock();
        match live.get_mut(&owner) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    live.remove(&owner);
                }
                Ok(())
            }
            _ => Err(DataError::ForeignToken { owner }),
        }
    }
}
