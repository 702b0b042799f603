//! Data Protection Provider
//!
//! Seam to the symmetric authenticated-encryption capability that tokens are built on.
//! Implementations must be safe for unsynchronized concurrent use.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::sync::Arc;

use crate::error::CryptographicError;

/// Protects and unprotects bytes under a fixed purpose chain.
pub trait DataProtector: Send + Sync {
    /// Create a child protector isolated from this one and its siblings.
    fn create_protector(&self, purpose: &str) -> Arc<dyn DataProtector>;

    /// Encrypt and authenticate a payload.
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptographicError>;

    /// Verify and decrypt a payload produced by [`DataProtector::protect`].
    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>, CryptographicError>;

    /// Protect UTF-8 text into a URL-safe opaque string.
    fn protect_text(&self, plaintext: &str) -> Result<String, CryptographicError> {
        let protected = self.protect(plaintext.as_bytes())?;
        Ok(encode_opaque(&protected))
    }

    /// Reverse of [`DataProtector::protect_text`].
    fn unprotect_text(&self, protected: &str) -> Result<String, CryptographicError> {
        let bytes = decode_opaque(protected)?;
        let plaintext = self.unprotect(&bytes)?;
        String::from_utf8(plaintext)
            .map_err(|_| CryptographicError::malformed("payload is not valid UTF-8"))
    }
}

/// Factory for root protectors.
pub trait DataProtectionProvider: Send + Sync {
    /// Create a protector for a purpose.
    fn create_protector(&self, purpose: &str) -> Arc<dyn DataProtector>;
}

/// Decode an opaque string into raw protected bytes.
pub(crate) fn decode_opaque(protected: &str) -> Result<Vec<u8>, CryptographicError> {
    URL_SAFE_NO_PAD
        .decode(protected)
        .map_err(|e| CryptographicError::malformed(format!("invalid base64url: {}", e)))
}

/// Encode raw protected bytes as an opaque string.
pub(crate) fn encode_opaque(protected: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(protected)
}
