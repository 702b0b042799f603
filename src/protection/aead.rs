//! AES-GCM Data Protection
//!
//! Reference [`DataProtectionProvider`] backed by AES-256-GCM. Every purpose chain gets its
//! own key, derived from the master key with HKDF-SHA256.
//!
//! Payload layout: `magic (4) || nonce (12) || ciphertext || tag (16)`. The magic header is
//! authenticated as associated data.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::hkdf;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretVec};
use std::sync::Arc;
use tracing::debug;

use crate::error::{CryptographicError, PreconditionError};
use crate::protection::provider::{DataProtectionProvider, DataProtector};

/// Length of the master key in bytes.
pub const MASTER_KEY_LEN: usize = 32;

/// Environment variable holding a base64 encoded master key.
pub const MASTER_KEY_ENV: &str = "CONTINUATION_TOKENS_MASTER_KEY";

const MAGIC_HEADER: [u8; 4] = [0x09, 0xF0, 0xC9, 0xF0];
const TAG_LEN: usize = 16;
const HKDF_SALT: &[u8] = b"continuation-tokens/aes-256-gcm";

/// AES-256-GCM provider.
#[derive(Clone)]
pub struct AesGcmDataProtectionProvider {
    master_key: Arc<SecretVec<u8>>,
    rng: SystemRandom,
}

impl AesGcmDataProtectionProvider {
    /// Create a provider with a random master key.
    ///
    /// Tokens issued by it cannot be read after the process exits.
    pub fn ephemeral() -> Result<Self, PreconditionError> {
        let rng = SystemRandom::new();
        let mut key = vec![0u8; MASTER_KEY_LEN];
        rng.fill(&mut key).map_err(|_| PreconditionError::InvalidKey {
            message: "system random source unavailable".to_string(),
        })?;
        debug!("Created ephemeral data protection key");
        Ok(Self {
            master_key: Arc::new(SecretVec::new(key)),
            rng,
        })
    }

    /// Create a provider from raw key material.
    pub fn from_key(key: &[u8]) -> Result<Self, PreconditionError> {
        if key.len() != MASTER_KEY_LEN {
            return Err(PreconditionError::InvalidKey {
                message: format!("expected {} bytes, got {}", MASTER_KEY_LEN, key.len()),
            });
        }
        Ok(Self {
            master_key: Arc::new(SecretVec::new(key.to_vec())),
            rng: SystemRandom::new(),
        })
    }

    /// Create a provider from base64 (standard or URL-safe) key material.
    pub fn from_base64(encoded: &str) -> Result<Self, PreconditionError> {
        let trimmed = encoded.trim();
        let key = STANDARD
            .decode(trimmed)
            .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed))
            .map_err(|_| PreconditionError::InvalidKey {
                message: "key is not valid base64".to_string(),
            })?;
        Self::from_key(&key)
    }

    /// Create a provider from [`MASTER_KEY_ENV`].
    pub fn from_env() -> Result<Self, PreconditionError> {
        let encoded = std::env::var(MASTER_KEY_ENV).map_err(|_| {
            PreconditionError::MissingRequired {
                field: MASTER_KEY_ENV.to_string(),
            }
        })?;
        Self::from_base64(&encoded)
    }
}

impl DataProtectionProvider for AesGcmDataProtectionProvider {
    fn create_protector(&self, purpose: &str) -> Arc<dyn DataProtector> {
        Arc::new(AesGcmDataProtector::new(
            self.master_key.clone(),
            self.rng.clone(),
            vec![purpose.to_string()],
        ))
    }
}

impl std::fmt::Debug for AesGcmDataProtectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmDataProtectionProvider")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

/// Protector for one purpose chain.
pub struct AesGcmDataProtector {
    master_key: Arc<SecretVec<u8>>,
    rng: SystemRandom,
    purposes: Vec<String>,
    key: Option<LessSafeKey>,
}

impl AesGcmDataProtector {
    fn new(master_key: Arc<SecretVec<u8>>, rng: SystemRandom, purposes: Vec<String>) -> Self {
        let key = derive_key(master_key.expose_secret(), &purposes);
        Self {
            master_key,
            rng,
            purposes,
            key,
        }
    }

    /// Purpose chain this protector is bound to.
    pub fn purposes(&self) -> &[String] {
        &self.purposes
    }

    fn key(&self) -> Result<&LessSafeKey, CryptographicError> {
        self.key
            .as_ref()
            .ok_or_else(|| CryptographicError::EncryptionFailed {
                message: "key derivation failed".to_string(),
            })
    }
}

impl DataProtector for AesGcmDataProtector {
    fn create_protector(&self, purpose: &str) -> Arc<dyn DataProtector> {
        let mut purposes = self.purposes.clone();
        purposes.push(purpose.to_string());
        Arc::new(Self::new(self.master_key.clone(), self.rng.clone(), purposes))
    }

    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptographicError> {
        let key = self.key()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptographicError::EncryptionFailed {
                message: "nonce generation failed".to_string(),
            })?;

        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::from(MAGIC_HEADER),
            &mut in_out,
        )
        .map_err(|_| CryptographicError::EncryptionFailed {
            message: "seal failed".to_string(),
        })?;

        let mut payload = Vec::with_capacity(MAGIC_HEADER.len() + NONCE_LEN + in_out.len());
        payload.extend_from_slice(&MAGIC_HEADER);
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&in_out);
        Ok(payload)
    }

    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>, CryptographicError> {
        if protected.len() < MAGIC_HEADER.len() + NONCE_LEN + TAG_LEN {
            return Err(CryptographicError::malformed("payload too short"));
        }

        let (header, rest) = protected.split_at(MAGIC_HEADER.len());
        if header != MAGIC_HEADER {
            return Err(CryptographicError::malformed("unknown payload header"));
        }

        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| CryptographicError::malformed("invalid nonce"))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key()?
            .open_in_place(nonce, Aad::from(MAGIC_HEADER), &mut in_out)
            .map_err(|_| CryptographicError::IntegrityCheckFailed)?;
        Ok(plaintext.to_vec())
    }
}

impl std::fmt::Debug for AesGcmDataProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmDataProtector")
            .field("purposes", &self.purposes)
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the AES key for a purpose chain.
///
/// Each purpose is length-prefixed so that `["ab", "c"]` and `["a", "bc"]` differ.
fn derive_key(master_key: &[u8], purposes: &[String]) -> Option<LessSafeKey> {
    let mut info = Vec::new();
    for purpose in purposes {
        info.extend_from_slice(&(purpose.len() as u32).to_be_bytes());
        info.extend_from_slice(purpose.as_bytes());
    }

    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, HKDF_SALT).extract(master_key);
    let info_parts = [info.as_slice()];
    let okm = prk.expand(&info_parts, &AES_256_GCM).ok()?;
    Some(LessSafeKey::new(UnboundKey::from(okm)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AesGcmDataProtectionProvider {
        AesGcmDataProtectionProvider::from_key(&[7u8; MASTER_KEY_LEN]).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let protector = provider().create_protector("tests");
        let protected = protector.protect(b"hello").unwrap();
        assert_eq!(protector.unprotect(&protected).unwrap(), b"hello");
    }

    #[test]
    fn test_nonce_is_random() {
        let protector = provider().create_protector("tests");
        let first = protector.protect(b"hello").unwrap();
        let second = protector.protect(b"hello").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_purpose_isolation() {
        let provider = provider();
        let a = provider.create_protector("A");
        let b = provider.create_protector("B");
        let protected = a.protect(b"value").unwrap();
        assert!(matches!(
            b.unprotect(&protected),
            Err(CryptographicError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn test_child_isolated_from_parent() {
        let parent = provider().create_protector("parent");
        let child = parent.create_protector("child");
        let protected = child.protect(b"value").unwrap();
        assert!(parent.unprotect(&protected).is_err());
        assert_eq!(child.unprotect(&protected).unwrap(), b"value");
    }

    #[test]
    fn test_purpose_chain_is_unambiguous() {
        let provider = provider();
        let ab_c = provider.create_protector("ab").create_protector("c");
        let a_bc = provider.create_protector("a").create_protector("bc");
        let protected = ab_c.protect(b"value").unwrap();
        assert!(a_bc.unprotect(&protected).is_err());
    }

    #[test]
    fn test_same_key_material_interoperates() {
        let first = provider().create_protector("tests");
        let second = provider().create_protector("tests");
        let protected = first.protect(b"value").unwrap();
        assert_eq!(second.unprotect(&protected).unwrap(), b"value");
    }

    #[test]
    fn test_short_payload_is_malformed() {
        let protector = provider().create_protector("tests");
        assert!(matches!(
            protector.unprotect(&[0x09, 0xF0]),
            Err(CryptographicError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_bad_header_is_malformed() {
        let protector = provider().create_protector("tests");
        let mut protected = protector.protect(b"value").unwrap();
        protected[0] ^= 0xFF;
        assert!(matches!(
            protector.unprotect(&protected),
            Err(CryptographicError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_from_key_rejects_wrong_length() {
        assert!(AesGcmDataProtectionProvider::from_key(&[1u8; 16]).is_err());
    }

    #[test]
    fn test_from_base64() {
        let encoded = STANDARD.encode([3u8; MASTER_KEY_LEN]);
        assert!(AesGcmDataProtectionProvider::from_base64(&encoded).is_ok());
        assert!(AesGcmDataProtectionProvider::from_base64("%%%").is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", provider());
        assert!(debug.contains("[REDACTED]"));
    }
}
