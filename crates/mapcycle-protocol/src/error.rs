//! Error types for the protocol layer.
//!
//! Each crate in Mapcycle defines its own error enum. A `ProtocolError`
//! always means a value was rejected before it reached any engine state.

/// Errors that can occur while constructing protocol values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// An identifier was empty, too long, or contained whitespace or
    /// control characters.
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
}
