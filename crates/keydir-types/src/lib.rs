//! Shared types for the keydir workspace.

/// Unix epoch timestamp in seconds.
pub type Timestamp = i64;

/// Common error types.
#[derive(Debug, thiserror::Error)]
pub enum KeydirError {
    #[error("upload length invalid")]
    InvalidLength,
    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),
    #[error("key bundle does not attest the claimed account")]
    Unauthorized,
    #[error("account namespace already exists")]
    Conflict,
    #[error("account namespace not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("signing error: {0}")]
    Signing(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("configuration error: {0}")]
    Config(String),
}
