//! Integration tests for tokens inside JSON bodies.

use chrono::{Duration, Utc};
use continuation_tokens::{
    opaque_token_schema, token_services, AesGcmDataProtectionProvider, ContinuationToken,
    ModelStateDictionary, QueryValueProvider, TimedContinuationToken, TokenError, TokenServices,
    TOKEN_DESERIALIZATION_UNSUPPORTED,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Serialize)]
struct Page {
    items: Vec<u32>,
    next: Option<ContinuationToken<u32>>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Request {
    token: ContinuationToken<u32>,
}

fn services() -> TokenServices {
    token_services()
        .data_protection_provider(AesGcmDataProtectionProvider::ephemeral().unwrap())
        .build()
        .unwrap()
}

#[test]
fn test_bound_token_serializes_to_opaque_string() {
    // Arrange
    let services = services();
    let opaque = services.protector::<u32>().protect(&10).unwrap();
    let values = QueryValueProvider::parse(&format!("next={}", opaque));
    let mut state = ModelStateDictionary::new();
    let next = services
        .bind_field::<ContinuationToken<u32>>("next", &values, &mut state)
        .into_model();

    // Act
    let body = serde_json::to_value(Page {
        items: vec![1, 2],
        next,
    })
    .unwrap();

    // Assert
    assert_eq!(body, json!({ "items": [1, 2], "next": opaque }));
}

#[test]
fn test_timed_token_serializes_to_opaque_string() {
    // Arrange
    let services = services();
    let opaque = services
        .protector::<String>()
        .protect_until(&"secret-cursor".to_string(), Utc::now() + Duration::minutes(1))
        .unwrap();
    let values = QueryValueProvider::parse(&format!("token={}", opaque));
    let mut state = ModelStateDictionary::new();
    let token = services
        .bind_field::<TimedContinuationToken<String>>("token", &values, &mut state)
        .into_model()
        .unwrap();

    // Act
    let json = serde_json::to_string(&token).unwrap();

    // Assert
    assert_eq!(json, format!("\"{}\"", opaque));
    assert!(!json.contains("secret-cursor"));
}

#[test]
fn test_fresh_token_serializes_to_null() {
    let json = serde_json::to_string(&ContinuationToken::new(3u32)).unwrap();
    assert_eq!(json, "null");
}

#[test]
fn test_deserialization_is_unsupported() {
    // Arrange
    let body = r#"{ "token": "YyBpPyhOgEGAKQAkqvNFMg" }"#;

    // Act
    let error = serde_json::from_str::<Request>(body).unwrap_err();
    let timed = serde_json::from_str::<TimedContinuationToken<u32>>("\"abc\"").unwrap_err();

    // Assert
    assert!(error.to_string().starts_with(TOKEN_DESERIALIZATION_UNSUPPORTED));
    assert!(timed.to_string().starts_with(TOKEN_DESERIALIZATION_UNSUPPORTED));
}

#[test]
fn test_unsupported_error_code() {
    let error = TokenError::UnsupportedOperation {
        message: TOKEN_DESERIALIZATION_UNSUPPORTED.to_string(),
    };
    assert_eq!(error.error_code(), "TOKEN_UNSUPPORTED");
    assert_eq!(error.to_string(), TOKEN_DESERIALIZATION_UNSUPPORTED);
}

#[test]
fn test_schema_is_opaque_string() {
    assert_eq!(
        opaque_token_schema(),
        json!({ "type": "string", "format": "opaque" })
    );
}
