//! Outbound Emission
//!
//! A successful response that carries a continuation token in a header. The token is
//! always protected again from its live value, never copied from a cached opaque form.

use chrono::{DateTime, Utc};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Response, StatusCode};
use tracing::debug;

use crate::error::{PreconditionError, TokenResult};
use crate::protection::{TokenProtector, TokenValue};
use crate::types::{AnyContinuationToken, ContinuationToken, TimedContinuationToken};
use crate::CONTINUATION_TOKEN_HEADER;

/// Parse a response header name.
pub(crate) fn parse_header_name(name: &str) -> Result<HeaderName, PreconditionError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| PreconditionError::InvalidHeaderName {
        name: name.to_string(),
    })
}

/// `200 OK` result carrying a body and an optional continuation token.
#[derive(Debug, Clone)]
pub struct ContinuationTokenResult<B, T> {
    body: B,
    token: Option<AnyContinuationToken<T>>,
    header_name: HeaderName,
}

impl<B, T: TokenValue> ContinuationTokenResult<B, T> {
    /// Create result written under [`CONTINUATION_TOKEN_HEADER`].
    pub fn new(body: B, token: Option<AnyContinuationToken<T>>) -> Self {
        Self {
            body,
            token,
            header_name: CONTINUATION_TOKEN_HEADER,
        }
    }

    /// Write the token under another header.
    pub fn with_header_name(mut self, name: &str) -> Result<Self, PreconditionError> {
        self.header_name = parse_header_name(name)?;
        Ok(self)
    }

    pub(crate) fn with_parsed_header_name(mut self, name: HeaderName) -> Self {
        self.header_name = name;
        self
    }

    /// Response body.
    pub fn body(&self) -> &B {
        &self.body
    }

    /// Token to emit.
    pub fn token(&self) -> Option<&AnyContinuationToken<T>> {
        self.token.as_ref()
    }

    /// Header the token is written to.
    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Protect the token and set it on `headers`.
    ///
    /// Returns `false` when there was nothing to write: no token, an absent value, or a
    /// blank protected string.
    pub fn write_header(
        &self,
        protector: &dyn TokenProtector<T>,
        headers: &mut HeaderMap,
    ) -> TokenResult<bool> {
        let Some(token) = &self.token else {
            debug!(header = %self.header_name, "No continuation token to emit");
            return Ok(false);
        };
        if token.value().is_absent() {
            debug!(header = %self.header_name, "Continuation token has no value");
            return Ok(false);
        }

        let protected = match token {
            AnyContinuationToken::Plain(token) => protector.protect(token.value())?,
            AnyContinuationToken::Timed(token) => {
                protector.protect_until(token.value(), token.expiration())?
            }
        };
        if protected.trim().is_empty() {
            debug!(header = %self.header_name, "Protector returned an empty token");
            return Ok(false);
        }

        let value =
            HeaderValue::from_str(&protected).map_err(|_| PreconditionError::InvalidHeaderValue)?;
        headers.insert(self.header_name.clone(), value);
        debug!(header = %self.header_name, "Wrote continuation token");
        Ok(true)
    }

    /// Build the `200 OK` response.
    pub fn into_response(self, protector: &dyn TokenProtector<T>) -> TokenResult<Response<B>> {
        let mut headers = HeaderMap::new();
        self.write_header(protector, &mut headers)?;

        let mut response = Response::new(self.body);
        *response.status_mut() = StatusCode::OK;
        response.headers_mut().extend(headers);
        Ok(response)
    }
}

/// Result carrying an existing token.
pub fn ok_with_token<B, T: TokenValue>(
    body: B,
    token: impl Into<AnyContinuationToken<T>>,
) -> ContinuationTokenResult<B, T> {
    ContinuationTokenResult::new(body, Some(token.into()))
}

/// Result carrying a fresh token for `value`.
pub fn ok_with_token_value<B, T: TokenValue>(body: B, value: T) -> ContinuationTokenResult<B, T> {
    ok_with_token(body, ContinuationToken::new(value))
}

/// Result carrying a fresh token for `value` that expires at `expiration`.
pub fn ok_with_timed_token_value<B, T: TokenValue>(
    body: B,
    value: T,
    expiration: DateTime<Utc>,
) -> ContinuationTokenResult<B, T> {
    ok_with_token(body, TimedContinuationToken::new(value, expiration))
}
