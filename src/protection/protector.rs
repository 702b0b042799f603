//! Token Protector
//!
//! Converts token values to opaque strings and back, under the fixed
//! [`PROTECTOR_PURPOSE`](crate::PROTECTOR_PURPOSE).

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

use crate::error::{CryptographicError, TokenError, TokenResult};
use crate::protection::codec::{TokenValue, ValueCodec};
use crate::protection::provider::{DataProtectionProvider, DataProtector};
use crate::protection::time_limited::TimeLimitedDataProtector;
use crate::types::TokenProtectorOptions;
use crate::PROTECTOR_PURPOSE;

/// Protector interface (for dependency injection).
pub trait TokenProtector<T>: Send + Sync {
    /// Protect a value without expiration.
    fn protect(&self, value: &T) -> TokenResult<String>;

    /// Protect a value that expires at `expiration`.
    fn protect_until(&self, value: &T, expiration: DateTime<Utc>) -> TokenResult<String>;

    /// Protect a value that expires after `lifetime`.
    fn protect_for(&self, value: &T, lifetime: Duration) -> TokenResult<String> {
        self.protect_until(value, Utc::now() + lifetime)
    }

    /// Unprotect a string produced by [`TokenProtector::protect`].
    fn unprotect(&self, protected: &str) -> TokenResult<T>;

    /// Unprotect a string produced by [`TokenProtector::protect_until`] or
    /// [`TokenProtector::protect_for`], returning the value and its expiration.
    fn unprotect_timed(&self, protected: &str) -> TokenResult<(T, DateTime<Utc>)>;
}

/// Default protector implementation.
pub struct DefaultTokenProtector<T> {
    protector: Arc<dyn DataProtector>,
    time_limited: TimeLimitedDataProtector,
    codec: ValueCodec,
    _value: PhantomData<fn() -> T>,
}

impl<T: TokenValue> DefaultTokenProtector<T> {
    /// Create a protector bound to [`PROTECTOR_PURPOSE`](crate::PROTECTOR_PURPOSE).
    pub fn new(provider: &dyn DataProtectionProvider, options: &TokenProtectorOptions) -> Self {
        Self::with_purpose(provider, PROTECTOR_PURPOSE, options)
    }

    /// Create a protector bound to another fixed purpose.
    ///
    /// Tokens issued under one purpose cannot be read under any other.
    pub fn with_purpose(
        provider: &dyn DataProtectionProvider,
        purpose: &'static str,
        options: &TokenProtectorOptions,
    ) -> Self {
        let protector = provider.create_protector(purpose);
        let time_limited = TimeLimitedDataProtector::new(protector.as_ref());
        Self {
            protector,
            time_limited,
            codec: ValueCodec::from_options(options),
            _value: PhantomData,
        }
    }

    /// The codec in use.
    pub fn codec(&self) -> ValueCodec {
        self.codec
    }
}

impl<T: TokenValue> TokenProtector<T> for DefaultTokenProtector<T> {
    fn protect(&self, value: &T) -> TokenResult<String> {
        let raw = self.codec.encode(value)?;
        trace!(value_type = std::any::type_name::<T>(), "Protecting token");
        Ok(self.protector.protect_text(&raw)?)
    }

    fn protect_until(&self, value: &T, expiration: DateTime<Utc>) -> TokenResult<String> {
        let raw = self.codec.encode(value)?;
        trace!(
            value_type = std::any::type_name::<T>(),
            %expiration,
            "Protecting time-limited token"
        );
        Ok(self.time_limited.protect_text(&raw, expiration)?)
    }

    fn unprotect(&self, protected: &str) -> TokenResult<T> {
        if protected.is_empty() {
            return Err(CryptographicError::malformed("empty payload").into());
        }
        let raw = self.protector.unprotect_text(protected)?;
        Ok(self.codec.decode(&raw)?)
    }

    fn unprotect_timed(&self, protected: &str) -> TokenResult<(T, DateTime<Utc>)> {
        if protected.is_empty() {
            return Err(CryptographicError::malformed("empty payload").into());
        }
        let (raw, expiration) = self.time_limited.unprotect_text(protected)?;
        Ok((self.codec.decode(&raw)?, expiration))
    }
}

impl<T> std::fmt::Debug for DefaultTokenProtector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultTokenProtector")
            .field("value_type", &std::any::type_name::<T>())
            .field("codec", &self.codec)
            .finish()
    }
}

/// A recorded call to [`MockTokenProtector`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectCall<T> {
    /// Value passed in.
    pub value: T,
    /// Expiration, for time-limited calls.
    pub expiration: Option<DateTime<Utc>>,
}

/// Mock protector for testing.
///
/// Protected strings are the JSON of the value prefixed with `plain:` or `timed:`.
pub struct MockTokenProtector<T> {
    protect_history: Mutex<Vec<ProtectCall<T>>>,
    unprotect_history: Mutex<Vec<String>>,
    next_output: Mutex<Option<String>>,
    next_error: Mutex<Option<TokenError>>,
}

impl<T> Default for MockTokenProtector<T> {
    fn default() -> Self {
        Self {
            protect_history: Mutex::new(Vec::new()),
            unprotect_history: Mutex::new(Vec::new()),
            next_output: Mutex::new(None),
            next_error: Mutex::new(None),
        }
    }
}

impl<T: TokenValue + Clone> MockTokenProtector<T> {
    /// Create new mock protector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the next protected string to return.
    pub fn set_next_output(&self, output: impl Into<String>) -> &Self {
        *self.next_output.lock() = Some(output.into());
        self
    }

    /// Set the next error to return.
    pub fn set_next_error(&self, error: TokenError) -> &Self {
        *self.next_error.lock() = Some(error);
        self
    }

    /// Get protect history.
    pub fn get_protect_history(&self) -> Vec<ProtectCall<T>> {
        self.protect_history.lock().clone()
    }

    /// Get unprotect history.
    pub fn get_unprotect_history(&self) -> Vec<String> {
        self.unprotect_history.lock().clone()
    }

    fn record(&self, value: &T, expiration: Option<DateTime<Utc>>) -> TokenResult<String> {
        self.protect_history.lock().push(ProtectCall {
            value: value.clone(),
            expiration,
        });
        if let Some(error) = self.next_error.lock().take() {
            return Err(error);
        }
        if let Some(output) = self.next_output.lock().take() {
            return Ok(output);
        }
        let json = ValueCodec::Json.encode(value)?;
        Ok(match expiration {
            Some(expiration) => format!("timed:{}:{}", expiration.timestamp(), json),
            None => format!("plain:{}", json),
        })
    }

    fn check_error(&self, protected: &str) -> TokenResult<()> {
        self.unprotect_history.lock().push(protected.to_string());
        match self.next_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl<T: TokenValue + Clone> TokenProtector<T> for MockTokenProtector<T> {
    fn protect(&self, value: &T) -> TokenResult<String> {
        self.record(value, None)
    }

    fn protect_until(&self, value: &T, expiration: DateTime<Utc>) -> TokenResult<String> {
        self.record(value, Some(expiration))
    }

    fn unprotect(&self, protected: &str) -> TokenResult<T> {
        self.check_error(protected)?;
        let json = protected
            .strip_prefix("plain:")
            .ok_or(CryptographicError::IntegrityCheckFailed)?;
        Ok(ValueCodec::Json.decode(json)?)
    }

    fn unprotect_timed(&self, protected: &str) -> TokenResult<(T, DateTime<Utc>)> {
        self.check_error(protected)?;
        let rest = protected
            .strip_prefix("timed:")
            .ok_or(CryptographicError::IntegrityCheckFailed)?;
        let (secs, json) = rest
            .split_once(':')
            .ok_or_else(|| CryptographicError::malformed("missing expiration"))?;
        let expiration = secs
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| CryptographicError::malformed("invalid expiration"))?;
        if expiration < Utc::now() {
            return Err(CryptographicError::PayloadExpired { expiration }.into());
        }
        Ok((ValueCodec::Json.decode(json)?, expiration))
    }
}
