//! Token Error Types
//!
//! Error hierarchy for protecting, unprotecting, binding and emitting tokens.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Caller-safe message recorded for any token that fails to bind.
pub const INVALID_TOKEN_MESSAGE: &str = "The token is invalid or expired.";

/// Message carried by [`TokenError::UnsupportedOperation`] when a token is deserialized.
pub const TOKEN_DESERIALIZATION_UNSUPPORTED: &str =
    "Tokens cannot be deserialized because they are protected (opaque) data. Use model binding instead.";

/// Root error type for continuation tokens.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Missing or invalid configuration.
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Value could not be encoded or decoded.
    #[error("Decoding error: {0}")]
    Decoding(#[from] DecodingError),

    /// Protected payload was rejected.
    #[error(transparent)]
    Cryptographic(#[from] CryptographicError),

    /// Operation is not supported on tokens.
    #[error("{message}")]
    UnsupportedOperation {
        /// What to do instead.
        message: String,
    },
}

impl TokenError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "TOKEN_PRECONDITION",
            Self::Decoding(_) => "TOKEN_DECODING",
            Self::Cryptographic(_) => "TOKEN_CRYPTO",
            Self::UnsupportedOperation { .. } => "TOKEN_UNSUPPORTED",
        }
    }

    /// Check if the error was caused by client supplied input.
    ///
    /// Everything else is a configuration or programming mistake.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Cryptographic(_))
    }

    /// Check if the error is an expired payload.
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            Self::Cryptographic(CryptographicError::PayloadExpired { .. })
        )
    }

    pub(crate) fn deserialization_unsupported() -> Self {
        Self::UnsupportedOperation {
            message: TOKEN_DESERIALIZATION_UNSUPPORTED.to_string(),
        }
    }
}

/// Missing or invalid collaborator at construction time.
#[derive(Error, Debug)]
pub enum PreconditionError {
    /// A required collaborator or setting was not supplied.
    #[error("Missing required collaborator: {field}")]
    MissingRequired {
        /// Name of the missing collaborator.
        field: String,
    },

    /// Response header name is not a valid HTTP header name.
    #[error("Invalid header name: {name}")]
    InvalidHeaderName {
        /// Rejected name.
        name: String,
    },

    /// Protected token is not a valid HTTP header value.
    #[error("Protected token is not a valid header value")]
    InvalidHeaderValue,

    /// Master key material is unusable.
    #[error("Invalid key material: {message}")]
    InvalidKey {
        /// Reason; never contains key bytes.
        message: String,
    },
}

/// Value codec failure.
#[derive(Error, Debug)]
pub enum DecodingError {
    /// Type does not opt in to the invariant text conversion.
    #[error("Type {type_name} has no invariant text conversion")]
    ConversionUnsupported {
        /// Rust type name.
        type_name: &'static str,
    },

    /// Text does not parse as the requested type.
    #[error("Cannot convert {text:?} to {type_name}: {message}")]
    InvalidText {
        /// Rust type name.
        type_name: &'static str,
        /// Offending text.
        text: String,
        /// Parser message.
        message: String,
    },

    /// Value has no encoding that decodes back to it.
    #[error("Value of type {type_name} cannot be encoded faithfully: {message}")]
    Unrepresentable {
        /// Rust type name.
        type_name: &'static str,
        /// Why decoding the encoded form fails or differs.
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Integrity, format or expiry failure of a protected payload.
#[derive(Error, Debug)]
pub enum CryptographicError {
    /// Payload is authentic but its expiration has passed.
    #[error("payload expired at {expiration}")]
    PayloadExpired {
        /// Embedded expiration.
        expiration: DateTime<Utc>,
    },

    /// Payload is not in the protected format.
    #[error("malformed payload: {message}")]
    MalformedPayload {
        /// What was wrong.
        message: String,
    },

    /// Authentication tag did not verify.
    #[error("payload failed integrity verification")]
    IntegrityCheckFailed,

    /// Encryption itself failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Reason.
        message: String,
    },
}

impl CryptographicError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;

/// Get a caller-safe error message.
pub fn get_user_message(error: &TokenError) -> String {
    match error {
        TokenError::Cryptographic(_) => INVALID_TOKEN_MESSAGE.to_string(),
        TokenError::UnsupportedOperation { message } => message.clone(),
        _ => "The token could not be processed.".to_string(),
    }
}
