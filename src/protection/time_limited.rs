//! Time-Limited Data Protection
//!
//! Wraps a [`DataProtector`] so that every payload carries an absolute expiration. The
//! expiration is checked only after the payload passed integrity verification.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::CryptographicError;
use crate::protection::provider::{decode_opaque, encode_opaque, DataProtector};

/// Child purpose under which time-limited payloads are protected.
pub const TIME_LIMITED_PURPOSE: &str = "continuation-tokens.time-limited.v1";

/// Seconds (i64) followed by sub-second nanoseconds (u32), both big-endian.
const EXPIRATION_LEN: usize = 12;

/// Protector that embeds and enforces an expiration.
#[derive(Clone)]
pub struct TimeLimitedDataProtector {
    inner: Arc<dyn DataProtector>,
}

impl TimeLimitedDataProtector {
    /// Wrap a protector. Payloads are isolated from those of `protector` itself.
    pub fn new(protector: &dyn DataProtector) -> Self {
        Self {
            inner: protector.create_protector(TIME_LIMITED_PURPOSE),
        }
    }

    /// Protect a payload that stops being readable after `expiration`.
    pub fn protect(
        &self,
        plaintext: &[u8],
        expiration: DateTime<Utc>,
    ) -> Result<Vec<u8>, CryptographicError> {
        let mut payload = Vec::with_capacity(EXPIRATION_LEN + plaintext.len());
        payload.extend_from_slice(&expiration.timestamp().to_be_bytes());
        payload.extend_from_slice(&expiration.timestamp_subsec_nanos().to_be_bytes());
        payload.extend_from_slice(plaintext);
        self.inner.protect(&payload)
    }

    /// Verify, decrypt and check expiration.
    pub fn unprotect(
        &self,
        protected: &[u8],
    ) -> Result<(Vec<u8>, DateTime<Utc>), CryptographicError> {
        let payload = self.inner.unprotect(protected)?;
        if payload.len() < EXPIRATION_LEN {
            return Err(CryptographicError::malformed("payload carries no expiration"));
        }

        let (header, plaintext) = payload.split_at(EXPIRATION_LEN);
        let mut secs = [0u8; 8];
        let mut nanos = [0u8; 4];
        secs.copy_from_slice(&header[..8]);
        nanos.copy_from_slice(&header[8..]);

        let expiration =
            DateTime::from_timestamp(i64::from_be_bytes(secs), u32::from_be_bytes(nanos))
                .ok_or_else(|| CryptographicError::malformed("expiration out of range"))?;

        if expiration < Utc::now() {
            return Err(CryptographicError::PayloadExpired { expiration });
        }

        Ok((plaintext.to_vec(), expiration))
    }

    /// Protect UTF-8 text into a URL-safe opaque string.
    pub fn protect_text(
        &self,
        plaintext: &str,
        expiration: DateTime<Utc>,
    ) -> Result<String, CryptographicError> {
        let protected = self.protect(plaintext.as_bytes(), expiration)?;
        Ok(encode_opaque(&protected))
    }

    /// Reverse of [`TimeLimitedDataProtector::protect_text`].
    pub fn unprotect_text(
        &self,
        protected: &str,
    ) -> Result<(String, DateTime<Utc>), CryptographicError> {
        let bytes = decode_opaque(protected)?;
        let (plaintext, expiration) = self.unprotect(&bytes)?;
        let text = String::from_utf8(plaintext)
            .map_err(|_| CryptographicError::malformed("payload is not valid UTF-8"))?;
        Ok((text, expiration))
    }
}

impl std::fmt::Debug for TimeLimitedDataProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeLimitedDataProtector").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protection::aead::{AesGcmDataProtectionProvider, MASTER_KEY_LEN};
    use crate::protection::provider::DataProtectionProvider;
    use chrono::Duration;

    fn protector() -> Arc<dyn DataProtector> {
        AesGcmDataProtectionProvider::from_key(&[9u8; MASTER_KEY_LEN])
            .unwrap()
            .create_protector("tests")
    }

    #[test]
    fn test_expiration_round_trips_exactly() {
        let time_limited = TimeLimitedDataProtector::new(protector().as_ref());
        let expiration = Utc::now() + Duration::milliseconds(1_234_567);

        let protected = time_limited.protect_text("payload", expiration).unwrap();
        let (text, actual) = time_limited.unprotect_text(&protected).unwrap();

        assert_eq!(text, "payload");
        assert_eq!(actual, expiration);
    }

    #[test]
    fn test_past_expiration_is_rejected() {
        let time_limited = TimeLimitedDataProtector::new(protector().as_ref());
        let expiration = Utc::now() - Duration::seconds(5);

        let protected = time_limited.protect_text("payload", expiration).unwrap();
        let error = time_limited.unprotect_text(&protected).unwrap_err();

        assert!(matches!(error, CryptographicError::PayloadExpired { .. }));
        assert!(error.to_string().starts_with("payload expired"));
    }

    #[test]
    fn test_plain_payload_is_not_time_limited() {
        let protector = protector();
        let time_limited = TimeLimitedDataProtector::new(protector.as_ref());

        let plain = protector.protect_text("payload").unwrap();
        assert!(matches!(
            time_limited.unprotect_text(&plain),
            Err(CryptographicError::IntegrityCheckFailed)
        ));

        let timed = time_limited
            .protect_text("payload", Utc::now() + Duration::minutes(1))
            .unwrap();
        assert!(protector.unprotect_text(&timed).is_err());
    }

    #[test]
    fn test_tampered_expired_payload_reports_integrity() {
        let time_limited = TimeLimitedDataProtector::new(protector().as_ref());
        let mut protected = time_limited
            .protect(b"payload", Utc::now() - Duration::seconds(5))
            .unwrap();
        let last = protected.len() - 1;
        protected[last] ^= 0x01;

        assert!(matches!(
            time_limited.unprotect(&protected),
            Err(CryptographicError::IntegrityCheckFailed)
        ));
    }
}
