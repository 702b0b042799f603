//! Configuration Types
//!
//! Options for token protectors.

use serde::{Deserialize, Serialize};

/// Environment variable selecting the invariant text conversion.
pub const USE_CONVERSION_ENV: &str = "CONTINUATION_TOKENS_USE_CONVERSION";

/// Token protector options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenProtectorOptions {
    /// Use the value's invariant text conversion instead of JSON before protection and
    /// after unprotection.
    ///
    /// JSON keeps sub-second precision of date/time values; the text conversion does not.
    #[serde(default)]
    pub use_conversion_instead_of_json: bool,
}

impl TokenProtectorOptions {
    /// Create options with JSON encoding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options from [`USE_CONVERSION_ENV`]. Unset means JSON.
    pub fn from_env() -> Self {
        Self::new().merge_env()
    }

    /// Override only the settings whose environment variable is present.
    pub fn merge_env(mut self) -> Self {
        if let Ok(value) = std::env::var(USE_CONVERSION_ENV) {
            self.use_conversion_instead_of_json = parse_flag(&value);
        }
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_json() {
        assert!(!TokenProtectorOptions::new().use_conversion_instead_of_json);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("1"));
        assert!(parse_flag("on"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("nope"));
    }

    #[test]
    fn test_deserialize_missing_field() {
        let options: TokenProtectorOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, TokenProtectorOptions::default());
    }
}
