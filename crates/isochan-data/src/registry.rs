//! Per-kind conversion table.
//!
//! The [`ConversionRegistry`] decides how a [`Value`] becomes
//! [`SharedData`]. Built-in conversions cover the natively shareable kinds;
//! hosts can [`register`](ConversionRegistry::register) more.
//!
//! # Lookup Order
//!
//! ```text
//! convert(value, fallback)
//!   │
//!   ├─ converter registered for value.kind()? ──► run it
//!   │
//!   ├─ kind == object ──────────────────────────► NotShareable
//!   │
//!   ├─ fallback == Full ────────────────────────► serialize by value
//!   │
//!   └─ otherwise ───────────────────────────────► NotShareable
//! ```

use crate::error::DataError;
use crate::token::SharedData;
use crate::value::{Value, ValueKind};
use isochan_types::FallbackPolicy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A conversion for one kind of value.
///
/// Receives the registry so compound kinds can convert their elements.
pub type Converter =
    Arc<dyn Fn(&ConversionRegistry, &Value, FallbackPolicy) -> Result<SharedData, DataError> + Send + Sync>;

/// Table of conversions keyed by [`ValueKind`].
///
/// # Example
///
/// ```
/// use isochan_data::{ConversionRegistry, SharedData, Value, ValueKind};
/// use isochan_types::FallbackPolicy;
/// use std::sync::Arc;
///
/// let registry = ConversionRegistry::new();
/// let list = Value::List(vec![Value::Int(1)]);
/// assert!(registry.convert(&list, FallbackPolicy::ShareableOnly).is_err());
///
/// // Share lists as tuples.
/// registry.register(
///     ValueKind::List,
///     Arc::new(|reg: &ConversionRegistry, value: &Value, fallback: FallbackPolicy| match value {
///         Value::List(items) => items
///             .iter()
///             .map(|item| reg.convert(item, fallback))
///             .collect::<Result<Vec<_>, _>>()
///             .map(SharedData::Tuple),
///         _ => unreachable!("registered for lists only"),
///     }),
/// );
/// assert!(registry.convert(&list, FallbackPolicy::ShareableOnly).is_ok());
/// ```
pub struct ConversionRegistry {
    converters: RwLock<HashMap<ValueKind, Converter>>,
}

impl ConversionRegistry {
    /// Creates a registry with the built-in conversions.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        for kind in [
            ValueKind::None,
            ValueKind::Bool,
            ValueKind::Int,
            ValueKind::Float,
            ValueKind::Str,
            ValueKind::Bytes,
            ValueKind::Buffer,
            ValueKind::Tuple,
        ] {
            registry.register(kind, Arc::new(builtin));
        }
        registry
    }

    /// Creates a registry with no conversions at all.
    ///
    /// Every value then depends on the fallback policy.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converters: RwLock::new(HashMap::new()),
        }
    }

    /// Registers (or replaces) the conversion for `kind`.
    pub fn register(&self, kind: ValueKind, converter: Converter) {
        self.converters.write().insert(kind, converter);
    }

    /// Returns `true` if `kind` has a conversion.
    #[must_use]
    pub fn is_registered(&self, kind: ValueKind) -> bool {
        self.converters.read().contains_key(&kind)
    }

    /// Converts `value` into shareable data.
    ///
    /// # Errors
    ///
    /// - [`DataError::NotShareable`] if no conversion applies
    /// - [`DataError::Serialize`] if the full fallback fails, including on a
    ///   NaN or infinite float
    pub fn convert(&self, value: &Value, fallback: FallbackPolicy) -> Result<SharedData, DataError> {
        let kind = value.kind();
        // Clone out so a compound converter may re-enter the registry.
        let converter = self.converters.read().get(&kind).cloned();
        if let Some(converter) = converter {
            return converter(self, value, fallback);
        }
        match (kind, fallback) {
            (ValueKind::Object, _) | (_, FallbackPolicy::ShareableOnly) => {
                Err(DataError::NotShareable { kind })
            }
            (_, FallbackPolicy::Full) => {
                // JSON writes NaN and infinities as null, which would not
                // come back as a float.
                if let Some(v) = find_non_finite(value) {
                    debug!(%kind, value = v, "non-finite float refused by fallback");
                    return Err(DataError::Serialize {
                        kind,
                        message: format!("non-finite float {v} cannot be serialized"),
                    });
                }
                debug!(%kind, "serializing by fallback");
                serde_json::to_vec(value)
                    .map(SharedData::Serialized)
                    .map_err(|e| DataError::Serialize {
                        kind,
                        message: e.to_string(),
                    })
            }
        }
    }
}

fn find_non_finite(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) if !v.is_finite() => Some(*v),
        Value::Tuple(items) | Value::List(items) => items.iter().find_map(find_non_finite),
        Value::Map(entries) => entries.values().find_map(find_non_finite),
        _ => None,
    }
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<ValueKind> = self.converters.read().keys().copied().collect();
        kinds.sort();
        f.debug_struct("ConversionRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

fn builtin(
    registry: &ConversionRegistry,
    value: &Value,
    fallback: FallbackPolicy,
) -> Result<SharedData, DataError> {
    Ok(match value {
        Value::None => SharedData::None,
        Value::Bool(v) => SharedData::Bool(*v),
        Value::Int(v) => SharedData::Int(*v),
        Value::Float(v) => SharedData::Float(*v),
        Value::Str(s) => SharedData::Str(Arc::from(s.as_str())),
        Value::Bytes(b) => SharedData::Bytes(Arc::from(b.as_slice())),
        Value::Buffer(buf) => SharedData::Buffer(Arc::clone(buf)),
        Value::Tuple(items) => SharedData::Tuple(
            items
                .iter()
                .map(|item| registry.convert(item, fallback))
                .collect::<Result<_, _>>()?,
        ),
        other => {
            return Err(DataError::NotShareable { kind: other.kind() });
        }
    })
}

/// Rebuilds a context-local value from shared data.
///
/// # Errors
///
/// [`DataError::Deserialize`] if a serialized payload is corrupt.
pub fn reconstruct(data: &SharedData) -> Result<Value, DataError> {
    Ok(match data {
        SharedData::None => Value::None,
        SharedData::Bool(v) => Value::Bool(*v),
        SharedData::Int(v) => Value::Int(*v),
        SharedData::Float(v) => Value::Float(*v),
        SharedData::Str(s) => Value::Str(s.to_string()),
        SharedData::Bytes(b) => Value::Bytes(b.to_vec()),
        SharedData::Buffer(buf) => Value::Buffer(Arc::clone(buf)),
        SharedData::Tuple(items) => {
            Value::Tuple(items.iter().map(reconstruct).collect::<Result<_, _>>()?)
        }
        SharedData::Serialized(bytes) => serde_json::from_slice(bytes)
            .map_err(|e| DataError::Deserialize(e.to_string()))?,
    })
}
