//! Continuation Tokens
//!
//! Opaque, tamper-evident and optionally time-limited continuation tokens for HTTP APIs.
//!
//! # Features
//!
//! - Typed values protected with authenticated encryption under a fixed purpose
//! - Optional absolute expiration, checked only after integrity verification
//! - JSON or invariant text encoding of values
//! - Binding from query, route or header values with a single generic error on failure
//! - Emission into a response header, always protected from the live value
//!
//! # Example
//!
//! ```rust
//! use continuation_tokens::{
//!     token_services, AesGcmDataProtectionProvider, ContinuationToken, ModelStateDictionary,
//!     QueryValueProvider,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let services = token_services()
//!     .data_protection_provider(AesGcmDataProtectionProvider::ephemeral()?)
//!     .build()?;
//!
//! // Emit the cursor for the next page
//! let response = services.into_response(services.ok_with_token_value(vec!["a", "b"], 2u64))?;
//! let opaque = response.headers()["x-continuation-token"].to_str()?;
//!
//! // Bind it back on the following request
//! let values = QueryValueProvider::parse(&format!("token={}", opaque));
//! let mut model_state = ModelStateDictionary::new();
//! let token = services
//!     .bind_field::<ContinuationToken<u64>>("token", &values, &mut model_state)
//!     .into_model();
//!
//! assert_eq!(token.map(|t| t.into_value()), Some(2));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `types`: token value objects and protector options
//! - `error`: error hierarchy
//! - `protection`: data protection seam, AES-GCM provider, value codec and token protector
//! - `binding`: value providers, model state and the type-indexed binder registry
//! - `emission`: response results that write the token header
//! - `builders`: fluent builder for the services
//! - `services`: high-level entry point combining all of the above

pub mod binding;
pub mod builders;
pub mod emission;
pub mod error;
pub mod protection;
pub mod services;
pub mod types;

/// Purpose all tokens are protected under. Changing it invalidates every issued token.
pub const PROTECTOR_PURPOSE: &str = "continuation-tokens.v1";

/// Default response header carrying the protected token.
pub const CONTINUATION_TOKEN_HEADER_NAME: &str = "X-Continuation-Token";

/// [`CONTINUATION_TOKEN_HEADER_NAME`] as a parsed header name.
pub const CONTINUATION_TOKEN_HEADER: http::HeaderName =
    http::HeaderName::from_static("x-continuation-token");

/// Default limit of errors recorded in a [`ModelStateDictionary`].
pub const DEFAULT_MAX_MODEL_ERRORS: usize = 200;

// Re-export main services
pub use services::TokenServices;

// Re-export builders
pub use builders::{token_services, TokenServicesBuilder};

// Re-export errors
pub use error::{
    get_user_message, CryptographicError, DecodingError, PreconditionError, TokenError,
    TokenResult, INVALID_TOKEN_MESSAGE, TOKEN_DESERIALIZATION_UNSUPPORTED,
};

// Re-export types
pub use types::{
    opaque_token_schema, AnyContinuationToken, ContinuationToken, TimedContinuationToken, Token,
    TokenProtectorOptions, USE_CONVERSION_ENV,
};

// Re-export protection
pub use protection::{
    AesGcmDataProtectionProvider, DataProtectionProvider, DataProtector, DefaultTokenProtector,
    MockTokenProtector, TimeLimitedDataProtector, TokenProtector, TokenValue, ValueCodec,
    MASTER_KEY_ENV,
};

// Re-export binding
pub use binding::{
    BindableToken, CompositeValueProvider, ContinuationTokenBinder, HeaderValueProvider,
    ModelBindingContext, ModelBindingResult, ModelStateDictionary, QueryValueProvider,
    RouteValueProvider, TokenBinderRegistry, TokenShape, ValueProvider,
};

// Re-export emission
pub use emission::{
    ok_with_timed_token_value, ok_with_token, ok_with_token_value, ContinuationTokenResult,
};
