//! Token Services
//!
//! High-level entry point that combines protection, binding and emission.

use chrono::{DateTime, Utc};
use http::header::HeaderName;
use http::{HeaderMap, Response};
use std::sync::Arc;

use crate::binding::{
    BindableToken, ModelBindingContext, ModelBindingResult, ModelStateDictionary,
    TokenBinderRegistry, ValueProvider,
};
use crate::emission::ContinuationTokenResult;
use crate::error::TokenResult;
use crate::protection::{DataProtectionProvider, TokenProtector, TokenValue};
use crate::types::{AnyContinuationToken, ContinuationToken, TimedContinuationToken, TokenProtectorOptions};

struct TokenServicesInner {
    registry: TokenBinderRegistry,
    header_name: HeaderName,
}

/// Continuation token services, cheap to clone.
#[derive(Clone)]
pub struct TokenServices {
    inner: Arc<TokenServicesInner>,
}

impl TokenServices {
    pub(crate) fn new(
        provider: Arc<dyn DataProtectionProvider>,
        options: TokenProtectorOptions,
        header_name: HeaderName,
    ) -> Self {
        Self {
            inner: Arc::new(TokenServicesInner {
                registry: TokenBinderRegistry::new(provider, options),
                header_name,
            }),
        }
    }

    /// Protector for value type `T`.
    pub fn protector<T: TokenValue>(&self) -> Arc<dyn TokenProtector<T>> {
        self.inner.registry.protector::<T>()
    }

    /// Binder registry.
    pub fn registry(&self) -> &TokenBinderRegistry {
        &self.inner.registry
    }

    /// Bind a token of type `M`.
    pub fn bind<M: BindableToken>(&self, context: &mut ModelBindingContext<'_>) -> ModelBindingResult<M> {
        self.inner.registry.bind::<M>(context)
    }

    /// Bind a token of type `M` from `field` of `values`.
    pub fn bind_field<M: BindableToken>(
        &self,
        field: &str,
        values: &dyn ValueProvider,
        model_state: &mut ModelStateDictionary,
    ) -> ModelBindingResult<M> {
        let mut context = ModelBindingContext::new(field, values, model_state);
        self.bind::<M>(&mut context)
    }

    /// Result carrying `token`, written under the configured header.
    pub fn ok_with_token<B, T: TokenValue>(
        &self,
        body: B,
        token: impl Into<AnyContinuationToken<T>>,
    ) -> ContinuationTokenResult<B, T> {
        ContinuationTokenResult::new(body, Some(token.into()))
            .with_parsed_header_name(self.inner.header_name.clone())
    }

    /// Result carrying a fresh token for `value`.
    pub fn ok_with_token_value<B, T: TokenValue>(&self, body: B, value: T) -> ContinuationTokenResult<B, T> {
        self.ok_with_token(body, ContinuationToken::new(value))
    }

    /// Result carrying a fresh token for `value` that expires at `expiration`.
    pub fn ok_with_timed_token_value<B, T: TokenValue>(
        &self,
        body: B,
        value: T,
        expiration: DateTime<Utc>,
    ) -> ContinuationTokenResult<B, T> {
        self.ok_with_token(body, TimedContinuationToken::new(value, expiration))
    }

    /// Protect the result's token and set it on `headers`.
    pub fn write_header<B, T: TokenValue>(
        &self,
        result: &ContinuationTokenResult<B, T>,
        headers: &mut HeaderMap,
    ) -> TokenResult<bool> {
        result.write_header(self.protector::<T>().as_ref(), headers)
    }

    /// Build the `200 OK` response for `result`.
    pub fn into_response<B, T: TokenValue>(
        &self,
        result: ContinuationTokenResult<B, T>,
    ) -> TokenResult<Response<B>> {
        result.into_response(self.protector::<T>().as_ref())
    }

    /// Configured response header name.
    pub fn header_name(&self) -> &HeaderName {
        &self.inner.header_name
    }

    /// Protector options.
    pub fn options(&self) -> &TokenProtectorOptions {
        self.inner.registry.options()
    }
}

impl std::fmt::Debug for TokenServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenServices")
            .field("header_name", &self.inner.header_name)
            .field("registry", &self.inner.registry)
            .finish()
    }
}
