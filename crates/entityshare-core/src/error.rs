//! Error types for the EntityShare core.

use thiserror::Error;

/// Errors raised while parsing or encoding core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown access level: {0}")]
    UnknownAccessLevel(String),

    #[error("unknown grantee type: {0}")]
    UnknownGranteeType(String),

    #[error("unknown grantee scope: {0}")]
    UnknownGranteeScope(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
