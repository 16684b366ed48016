//! Error types for eustress-proptree
//!
//! ## Table of Contents
//! 1. PropertyError - Main error enum
//! 2. Result type alias

use thiserror::Error;

/// Result type alias for property operations
pub type Result<T> = std::result::Result<T, PropertyError>;

/// Errors that can occur when converting property values
///
/// Tree operations themselves never return errors: contract violations are
/// assertions and lookups miss with `Option`/`Null` sentinels. Errors only
/// arise at the typed boundary where the widget layer extracts concrete Rust
/// values from a [`PropertyValue`](crate::PropertyValue).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// Variant did not hold the requested type
    #[error("expected {expected} value, got {actual}")]
    ValueType {
        expected: &'static str,
        actual: &'static str,
    },
}
