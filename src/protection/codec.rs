//! Value Codec
//!
//! Converts token values to and from the plaintext that gets protected.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DecodingError;
use crate::types::TokenProtectorOptions;

const NAIVE_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A value that can be carried by a continuation token.
///
/// Every value supports the structured (JSON) encoding. The invariant text conversion is
/// opt-in: implementations that keep the default methods fail with
/// [`DecodingError::ConversionUnsupported`] when the protector is configured to use it.
///
/// ```rust
/// use continuation_tokens::TokenValue;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct PageCursor {
///     last_id: u64,
/// }
///
/// impl TokenValue for PageCursor {}
/// ```
pub trait TokenValue: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Convert to invariant text.
    fn to_invariant_string(&self) -> Result<String, DecodingError> {
        Err(DecodingError::ConversionUnsupported {
            type_name: std::any::type_name::<Self>(),
        })
    }

    /// Parse invariant text.
    fn from_invariant_str(text: &str) -> Result<Self, DecodingError>
    where
        Self: Sized,
    {
        let _ = text;
        Err(DecodingError::ConversionUnsupported {
            type_name: std::any::type_name::<Self>(),
        })
    }

    /// Whether there is no underlying value to emit.
    fn is_absent(&self) -> bool {
        false
    }
}

fn invalid_text<T>(text: &str, message: impl ToString) -> DecodingError {
    DecodingError::InvalidText {
        type_name: std::any::type_name::<T>(),
        text: text.to_string(),
        message: message.to_string(),
    }
}

macro_rules! impl_token_value_via_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TokenValue for $ty {
                fn to_invariant_string(&self) -> Result<String, DecodingError> {
                    Ok(self.to_string())
                }

                fn from_invariant_str(text: &str) -> Result<Self, DecodingError> {
                    text.parse::<$ty>().map_err(|e| invalid_text::<$ty>(text, e))
                }
            }
        )*
    };
}

impl_token_value_via_from_str!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    String, uuid::Uuid,
);

// Date/time conversions are whole-second; use JSON to keep sub-second precision.

impl TokenValue for DateTime<Utc> {
    fn to_invariant_string(&self) -> Result<String, DecodingError> {
        Ok(self.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    fn from_invariant_str(text: &str) -> Result<Self, DecodingError> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| invalid_text::<Self>(text, e))
    }
}

impl TokenValue for DateTime<FixedOffset> {
    fn to_invariant_string(&self) -> Result<String, DecodingError> {
        Ok(self.to_rfc3339_opts(SecondsFormat::Secs, false))
    }

    fn from_invariant_str(text: &str) -> Result<Self, DecodingError> {
        DateTime::parse_from_rfc3339(text).map_err(|e| invalid_text::<Self>(text, e))
    }
}

impl TokenValue for NaiveDateTime {
    fn to_invariant_string(&self) -> Result<String, DecodingError> {
        Ok(self.format(NAIVE_DATE_TIME_FORMAT).to_string())
    }

    fn from_invariant_str(text: &str) -> Result<Self, DecodingError> {
        NaiveDateTime::parse_from_str(text, NAIVE_DATE_TIME_FORMAT)
            .map_err(|e| invalid_text::<Self>(text, e))
    }
}

/// `None` converts to the empty string.
impl<T: TokenValue> TokenValue for Option<T> {
    fn to_invariant_string(&self) -> Result<String, DecodingError> {
        match self {
            Some(value) => value.to_invariant_string(),
            None => Ok(String::new()),
        }
    }

    fn from_invariant_str(text: &str) -> Result<Self, DecodingError> {
        if text.is_empty() {
            Ok(None)
        } else {
            T::from_invariant_str(text).map(Some)
        }
    }

    fn is_absent(&self) -> bool {
        match self {
            Some(value) => value.is_absent(),
            None => true,
        }
    }
}

impl<T: TokenValue> TokenValue for Vec<T> {}

/// Plaintext encoding selected once per protector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueCodec {
    /// Structured JSON encoding; lossless.
    #[default]
    Json,
    /// Invariant text conversion; loses sub-second precision for date/time values.
    Conversion,
}

impl ValueCodec {
    /// Select the codec configured by `options`.
    pub fn from_options(options: &TokenProtectorOptions) -> Self {
        if options.use_conversion_instead_of_json {
            Self::Conversion
        } else {
            Self::Json
        }
    }

    /// Encode a value to plaintext.
    ///
    /// Fails with [`DecodingError::Unrepresentable`] when the plaintext would not decode back
    /// to an equivalent value, e.g. a non-finite float in JSON or `Some("")` as text.
    pub fn encode<T: TokenValue>(&self, value: &T) -> Result<String, DecodingError> {
        let text = match self {
            Self::Json => serde_json::to_string(value)?,
            Self::Conversion => value.to_invariant_string()?,
        };
        self.ensure_decodable(value, &text)?;
        Ok(text)
    }

    /// Decode plaintext to a value.
    pub fn decode<T: TokenValue>(&self, text: &str) -> Result<T, DecodingError> {
        match self {
            Self::Json => Ok(serde_json::from_str(text)?),
            Self::Conversion => T::from_invariant_str(text),
        }
    }

    // serde_json writes NaN and infinities as `null`; `None` and `Some("")` share the empty text.
    fn ensure_decodable<T: TokenValue>(&self, value: &T, text: &str) -> Result<(), DecodingError> {
        let unrepresentable = |message: String| DecodingError::Unrepresentable {
            type_name: std::any::type_name::<T>(),
            message,
        };
        let decoded = self
            .decode::<T>(text)
            .map_err(|e| unrepresentable(e.to_string()))?;
        if decoded.is_absent() != value.is_absent() {
            return Err(unrepresentable(format!("{:?} decodes as an absent value", text)));
        }
        Ok(())
    }

}
