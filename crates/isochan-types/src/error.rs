//! Unified error interface for isochan.
//!
//! Every error type in the workspace implements [`ErrorCode`] so callers
//! can branch on a stable, machine-readable code instead of matching on
//! display strings.
//!
//! # Example
//!
//! ```
//! use isochan_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum QueueError {
//!     Empty,
//!     Closed,
//! }
//!
//! impl ErrorCode for QueueError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Empty => "QUEUE_EMPTY",
//!             Self::Closed => "QUEUE_CLOSED",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Empty)
//!     }
//! }
//!
//! assert_eq!(QueueError::Empty.code(), "QUEUE_EMPTY");
//! assert!(!QueueError::Closed.is_recoverable());
//! ```

/// Machine-readable error code interface.
///
/// # Code Format
///
/// - **UPPER_SNAKE_CASE**: e.g. `"CHANNEL_EMPTY"`
/// - **Crate-prefixed**: `CHANNEL_` for the runtime, `DATA_` for the
///   shareable-data boundary
/// - **Stable**: codes are part of the API contract
///
/// # Recoverability
///
/// An error is recoverable when repeating the same call later may succeed
/// without any other change: an empty channel may receive data, a timed-out
/// send may be received next time. Closed or missing channels never come
/// back, so those errors are not recoverable.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code follows the workspace conventions.
///
/// # Panics
///
/// Panics if the code is empty, lacks `expected_prefix`, or is not
/// UPPER_SNAKE_CASE.
///
/// # Example
///
/// ```
/// use isochan_types::{assert_error_code, ErrorCode};
///
/// struct Boom;
///
/// impl ErrorCode for Boom {
///     fn code(&self) -> &'static str { "TEST_BOOM" }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_code(&Boom, "TEST_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Runs [`assert_error_code`] over every given error.
///
/// Intended for tests that enumerate all variants of an error enum.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
