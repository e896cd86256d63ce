//! The value model exchanged across the boundary.
//!
//! [`Value`] stands in for a host-language object. Each context owns its
//! own values; only [`ShareableToken`](crate::ShareableToken)s cross
//! between contexts.
//!
//! | Kind | Native conversion | Full fallback |
//! |------|-------------------|---------------|
//! | none, bool, int, float, str, bytes | copy | - |
//! | buffer | zero-copy (`Arc<[u8]>`) | - |
//! | tuple | element-wise | per element |
//! | list, map | none | serialized by value |
//! | object | none | never |

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A context-local value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The absent value.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Owned bytes, copied on send.
    Bytes(Vec<u8>),
    /// A shared byte buffer. Sending shares the allocation instead of
    /// copying it.
    Buffer(Arc<[u8]>),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// An arbitrary host object. Never serializable.
    #[serde(skip)]
    Object(OpaqueObject),
}

impl Value {
    /// Returns the kind used to look up a conversion.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Buffer(_) => ValueKind::Buffer,
            Self::Tuple(_) => ValueKind::Tuple,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Returns `true` for [`Value::None`].
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Wraps bytes in a shareable buffer.
    #[must_use]
    pub fn buffer(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Buffer(bytes.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    None,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Buffer,
    Tuple,
    List,
    Map,
    Object,
}

impl ValueKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::None,
        Self::Bool,
        Self::Int,
        Self::Float,
        Self::Str,
        Self::Bytes,
        Self::Buffer,
        Self::Tuple,
        Self::List,
        Self::Map,
        Self::Object,
    ];

    /// Lowercase name used in messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::Buffer => "buffer",
            Self::Tuple => "tuple",
            Self::List => "list",
            Self::Map => "map",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A host object that is opaque to the channel layer.
///
/// Equality is identity: two handles are equal only if they point at the
/// same allocation.
#[derive(Clone)]
pub struct OpaqueObject(Arc<dyn Any + Send + Sync>);

impl OpaqueObject {
    /// Wraps a host object.
    pub fn new<T: Any + Send + Sync>(object: T) -> Self {
        Self(Arc::new(object))
    }

    /// Borrows the object as `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for OpaqueObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpaqueObject(..)")
    }
}

impl PartialEq for OpaqueObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
