//! Token Types
//!
//! Immutable carriers for continuation token values. A token never encrypts or decrypts
//! itself; that is the job of a [`TokenProtector`](crate::TokenProtector).

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TokenError;

/// Format advertised for tokens in API schemas.
pub const OPAQUE_FORMAT: &str = "opaque";

/// A token with an opaque (protected) representation.
pub trait Token {
    /// The protected string this token was bound from, if any.
    fn opaque(&self) -> Option<&str>;
}

/// Continuation token carrying a value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContinuationToken<T> {
    value: T,
    opaque: Option<String>,
}

impl<T> ContinuationToken<T> {
    /// Wrap a fresh value to send to the client.
    pub fn new(value: T) -> Self {
        Self {
            value,
            opaque: None,
        }
    }

    /// Token bound from client input; `opaque` is the string that produced `value`.
    pub(crate) fn from_protected(value: T, opaque: String) -> Self {
        Self {
            value,
            opaque: Some(opaque),
        }
    }

    /// The unprotected value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume the token and return its value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// The protected string this token was bound from, if any.
    pub fn opaque(&self) -> Option<&str> {
        self.opaque.as_deref()
    }

    /// Replace the value. The cached opaque form no longer applies and is dropped.
    pub fn with_value(self, value: T) -> Self {
        Self::new(value)
    }
}

impl<T> Token for ContinuationToken<T> {
    fn opaque(&self) -> Option<&str> {
        self.opaque.as_deref()
    }
}

impl<T: std::fmt::Display> std::fmt::Display for ContinuationToken<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.value, f)
    }
}

/// Continuation token that expires.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimedContinuationToken<T> {
    token: ContinuationToken<T>,
    expiration: DateTime<Utc>,
}

impl<T> TimedContinuationToken<T> {
    /// Wrap a fresh value that should expire at `expiration`.
    pub fn new(value: T, expiration: DateTime<Utc>) -> Self {
        Self {
            token: ContinuationToken::new(value),
            expiration,
        }
    }

    pub(crate) fn from_protected(value: T, opaque: String, expiration: DateTime<Utc>) -> Self {
        Self {
            token: ContinuationToken::from_protected(value, opaque),
            expiration,
        }
    }

    /// The unprotected value.
    pub fn value(&self) -> &T {
        self.token.value()
    }

    /// Consume the token and return its value.
    pub fn into_value(self) -> T {
        self.token.into_value()
    }

    /// The protected string this token was bound from, if any.
    pub fn opaque(&self) -> Option<&str> {
        self.token.opaque()
    }

    /// When the token expires.
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// Check if the expiration has passed.
    pub fn is_expired(&self) -> bool {
        self.expiration < Utc::now()
    }

    /// Replace the value, keeping the expiration.
    pub fn with_value(self, value: T) -> Self {
        Self::new(value, self.expiration)
    }

    /// Replace the expiration, keeping the value.
    pub fn with_expiration(self, expiration: DateTime<Utc>) -> Self {
        Self::new(self.token.into_value(), expiration)
    }
}

impl<T> Token for TimedContinuationToken<T> {
    fn opaque(&self) -> Option<&str> {
        self.token.opaque()
    }
}

impl<T: std::fmt::Display> std::fmt::Display for TimedContinuationToken<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.token, f)
    }
}

/// Either token shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnyContinuationToken<T> {
    /// Token without expiration.
    Plain(ContinuationToken<T>),
    /// Token with expiration.
    Timed(TimedContinuationToken<T>),
}

impl<T> AnyContinuationToken<T> {
    /// The unprotected value.
    pub fn value(&self) -> &T {
        match self {
            Self::Plain(token) => token.value(),
            Self::Timed(token) => token.value(),
        }
    }

    /// The expiration, for timed tokens.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Plain(_) => None,
            Self::Timed(token) => Some(token.expiration()),
        }
    }
}

impl<T> Token for AnyContinuationToken<T> {
    fn opaque(&self) -> Option<&str> {
        match self {
            Self::Plain(token) => token.opaque(),
            Self::Timed(token) => token.opaque(),
        }
    }
}

impl<T> From<ContinuationToken<T>> for AnyContinuationToken<T> {
    fn from(token: ContinuationToken<T>) -> Self {
        Self::Plain(token)
    }
}

impl<T> From<TimedContinuationToken<T>> for AnyContinuationToken<T> {
    fn from(token: TimedContinuationToken<T>) -> Self {
        Self::Timed(token)
    }
}

// Bodies only ever see the opaque form, never the value.

fn serialize_opaque<S: Serializer>(opaque: Option<&str>, serializer: S) -> Result<S::Ok, S::Error> {
    match opaque {
        Some(opaque) => serializer.serialize_str(opaque),
        None => serializer.serialize_none(),
    }
}

fn reject_deserialize<'de, D: Deserializer<'de>, R>(_deserializer: D) -> Result<R, D::Error> {
    Err(D::Error::custom(TokenError::deserialization_unsupported()))
}

impl<T> Serialize for ContinuationToken<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_opaque(self.opaque(), serializer)
    }
}

impl<T> Serialize for TimedContinuationToken<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_opaque(self.opaque(), serializer)
    }
}

impl<T> Serialize for AnyContinuationToken<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_opaque(Token::opaque(self), serializer)
    }
}

impl<'de, T> Deserialize<'de> for ContinuationToken<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        reject_deserialize(deserializer)
    }
}

impl<'de, T> Deserialize<'de> for TimedContinuationToken<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        reject_deserialize(deserializer)
    }
}

impl<'de, T> Deserialize<'de> for AnyContinuationToken<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        reject_deserialize(deserializer)
    }
}

/// OpenAPI schema fragment for either token shape.
pub fn opaque_token_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "format": OPAQUE_FORMAT,
    })
}
