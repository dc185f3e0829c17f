//! Error types for dbkit-core.
//!
//! Query-time failures never cross the facade boundary as `Err`: they ride in
//! the first slot of a [`Reply`]. Construction-time failures ([`ConfigError`],
//! [`SecretError`]) are ordinary `Result` errors and are meant to abort startup.

use thiserror::Error;

use crate::standardize::{MutationMeta, Row, StandardResult};

/// Errors reported by facade operations
#[derive(Error, Debug)]
pub enum DbError {
    /// The facade has no pool attached
    #[error("There is no DB connection")]
    NoConnection,

    /// Network or SQL failure, passed through from the driver untouched
    #[error(transparent)]
    Driver(#[from] sqlx::Error),

    /// `get_first` matched zero rows
    #[error("Record not found")]
    RecordNotFound,

    /// A builder was asked to produce a statement that cannot be valid SQL
    #[error("Invalid statement: {reason}")]
    InvalidStatement { reason: String },
}

impl DbError {
    pub fn invalid_statement(reason: impl Into<String>) -> Self {
        Self::InvalidStatement {
            reason: reason.into(),
        }
    }
}

/// Failures while decoding or decrypting a credential blob
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Malformed secret blob: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ciphertext is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Unsupported IV length {len} (expected 12, 16 or 32 bytes)")]
    IvLength { len: usize },

    #[error("Auth tag must be 16 bytes, got {len}")]
    TagLength { len: usize },

    #[error("Key must be 32 bytes, got {len}")]
    KeyLength { len: usize },

    #[error("Encryption failed")]
    Encrypt,

    /// Tag verification failed: wrong key, wrong IV, or tampered data
    #[error("Secret failed authentication")]
    Authentication,

    #[error("Decrypted secret is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Fatal configuration errors raised while building the facade
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to resolve database password: {0}")]
    Secret(#[from] SecretError),

    #[error("Invalid configuration for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// The `(error, result)` pair every facade operation returns.
///
/// Both slots may be filled at once: `get_first` on an empty table reports
/// [`DbError::RecordNotFound`] alongside a result whose `data` is `None`.
#[derive(Debug)]
pub struct Reply {
    pub error: Option<DbError>,
    pub result: Option<StandardResult>,
}

impl Reply {
    pub fn ok(result: StandardResult) -> Self {
        Self {
            error: None,
            result: Some(result),
        }
    }

    pub fn failed(error: DbError) -> Self {
        Self {
            error: Some(error),
            result: None,
        }
    }

    pub fn partial(error: DbError, result: StandardResult) -> Self {
        Self {
            error: Some(error),
            result: Some(result),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Rows of a read query, `None` for empty sets, mutations and failures
    pub fn data(&self) -> Option<&[Row]> {
        self.result.as_ref().and_then(|r| r.data.as_deref())
    }

    pub fn metadata(&self) -> Option<&MutationMeta> {
        self.result.as_ref().and_then(|r| r.metadata.as_ref())
    }

    pub fn into_parts(self) -> (Option<DbError>, Option<StandardResult>) {
        (self.error, self.result)
    }

    /// Collapse into a `Result`, letting the error slot win
    pub fn into_result(self) -> Result<StandardResult, DbError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or_default()),
        }
    }
}
