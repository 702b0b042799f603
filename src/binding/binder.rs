//! Continuation Token Binder
//!
//! Turns a raw request value into a bound token. Absent or empty input binds to no model;
//! any input that fails to unprotect records exactly one generic model error.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::binding::model_state::ModelStateDictionary;
use crate::binding::value_provider::ValueProvider;
use crate::error::{TokenError, INVALID_TOKEN_MESSAGE};
use crate::protection::{TokenProtector, TokenValue};
use crate::types::{AnyContinuationToken, ContinuationToken, TimedContinuationToken};

/// Token shape requested by a bound field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenShape {
    /// [`ContinuationToken`].
    Plain,
    /// [`TimedContinuationToken`].
    TimeLimited,
}

mod sealed {
    pub trait Sealed {}

    impl<T> Sealed for crate::types::ContinuationToken<T> {}
    impl<T> Sealed for crate::types::TimedContinuationToken<T> {}
}

/// A token type that can be bound from a request.
pub trait BindableToken: sealed::Sealed + Sized + Send + 'static {
    /// Shape used to pick the unprotect operation.
    const SHAPE: TokenShape;

    /// Carried value type.
    type Value: TokenValue;

    /// Narrow a bound token to this type; `None` if the shape differs.
    fn from_bound(token: AnyContinuationToken<Self::Value>) -> Option<Self>;
}

impl<T: TokenValue> BindableToken for ContinuationToken<T> {
    const SHAPE: TokenShape = TokenShape::Plain;
    type Value = T;

    fn from_bound(token: AnyContinuationToken<T>) -> Option<Self> {
        match token {
            AnyContinuationToken::Plain(token) => Some(token),
            AnyContinuationToken::Timed(_) => None,
        }
    }
}

impl<T: TokenValue> BindableToken for TimedContinuationToken<T> {
    const SHAPE: TokenShape = TokenShape::TimeLimited;
    type Value = T;

    fn from_bound(token: AnyContinuationToken<T>) -> Option<Self> {
        match token {
            AnyContinuationToken::Timed(token) => Some(token),
            AnyContinuationToken::Plain(_) => None,
        }
    }
}

/// Binding inputs for one field.
pub struct ModelBindingContext<'a> {
    field_name: String,
    binder_model_name: Option<String>,
    value_provider: &'a dyn ValueProvider,
    model_state: &'a mut ModelStateDictionary,
}

impl<'a> ModelBindingContext<'a> {
    /// Create context for `field_name`.
    pub fn new(
        field_name: impl Into<String>,
        value_provider: &'a dyn ValueProvider,
        model_state: &'a mut ModelStateDictionary,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            binder_model_name: None,
            value_provider,
            model_state,
        }
    }

    /// Look the value up under `name` instead of the field name.
    pub fn with_binder_model_name(mut self, name: impl Into<String>) -> Self {
        self.binder_model_name = Some(name.into());
        self
    }

    /// Field being bound.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Key used for value lookup and model state.
    pub fn model_name(&self) -> &str {
        self.binder_model_name.as_deref().unwrap_or(&self.field_name)
    }

    /// Source of raw values.
    pub fn value_provider(&self) -> &dyn ValueProvider {
        self.value_provider
    }

    /// Model state.
    pub fn model_state(&self) -> &ModelStateDictionary {
        self.model_state
    }

    /// Mutable model state.
    pub fn model_state_mut(&mut self) -> &mut ModelStateDictionary {
        self.model_state
    }
}

impl std::fmt::Debug for ModelBindingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBindingContext")
            .field("field_name", &self.field_name)
            .field("binder_model_name", &self.binder_model_name)
            .finish_non_exhaustive()
    }
}

/// Outcome of binding one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelBindingResult<M> {
    /// Input was present but could not be bound; an error was recorded.
    Failed,
    /// Binding succeeded; `None` when no input was supplied.
    Success(Option<M>),
}

impl<M> ModelBindingResult<M> {
    /// Whether binding succeeded.
    pub fn is_model_set(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The bound model, if any.
    pub fn model(&self) -> Option<&M> {
        match self {
            Self::Success(model) => model.as_ref(),
            Self::Failed => None,
        }
    }

    /// Consume and return the bound model, if any.
    pub fn into_model(self) -> Option<M> {
        match self {
            Self::Success(model) => model,
            Self::Failed => None,
        }
    }

    /// Map the bound model.
    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> ModelBindingResult<N> {
        match self {
            Self::Success(model) => ModelBindingResult::Success(model.map(f)),
            Self::Failed => ModelBindingResult::Failed,
        }
    }
}

/// Binder for tokens carrying `T`.
pub struct ContinuationTokenBinder<T> {
    protector: Arc<dyn TokenProtector<T>>,
}

impl<T: TokenValue> ContinuationTokenBinder<T> {
    /// Create binder over a protector.
    pub fn new(protector: Arc<dyn TokenProtector<T>>) -> Self {
        Self { protector }
    }

    /// The protector in use.
    pub fn protector(&self) -> &Arc<dyn TokenProtector<T>> {
        &self.protector
    }

    /// Bind a token of type `M`.
    pub fn bind<M>(&self, context: &mut ModelBindingContext<'_>) -> ModelBindingResult<M>
    where
        M: BindableToken<Value = T>,
    {
        match self.bind_shape(M::SHAPE, context) {
            ModelBindingResult::Success(Some(token)) => match M::from_bound(token) {
                Some(token) => ModelBindingResult::Success(Some(token)),
                None => ModelBindingResult::Failed,
            },
            ModelBindingResult::Success(None) => ModelBindingResult::Success(None),
            ModelBindingResult::Failed => ModelBindingResult::Failed,
        }
    }

    /// Bind a token of the given shape.
    pub fn bind_shape(
        &self,
        shape: TokenShape,
        context: &mut ModelBindingContext<'_>,
    ) -> ModelBindingResult<AnyContinuationToken<T>> {
        let model_name = context.model_name().to_string();
        let supplied = context.value_provider().get_value(&model_name);
        let Some(raw) = supplied.first_value() else {
            return ModelBindingResult::Success(None);
        };

        context.model_state_mut().set_model_value(&model_name, Some(raw));
        if raw.is_empty() {
            return ModelBindingResult::Success(None);
        }

        match self.unprotect(shape, raw) {
            Ok(token) => {
                debug!(field = %model_name, ?shape, "Bound continuation token");
                ModelBindingResult::Success(Some(token))
            }
            Err(error) => {
                if error.is_client_error() {
                    info!(
                        field = %model_name,
                        ?shape,
                        error = %error,
                        "Rejected continuation token"
                    );
                } else {
                    warn!(
                        field = %model_name,
                        ?shape,
                        value_type = std::any::type_name::<T>(),
                        error_code = error.error_code(),
                        error = %error,
                        "Continuation token could not be decoded"
                    );
                }
                context
                    .model_state_mut()
                    .try_add_model_error(&model_name, INVALID_TOKEN_MESSAGE);
                ModelBindingResult::Failed
            }
        }
    }

    fn unprotect(
        &self,
        shape: TokenShape,
        raw: &str,
    ) -> Result<AnyContinuationToken<T>, TokenError> {
        let token = match shape {
            TokenShape::Plain => {
                let value = self.protector.unprotect(raw)?;
                ContinuationToken::from_protected(value, raw.to_string()).into()
            }
            TokenShape::TimeLimited => {
                let (value, expiration) = self.protector.unprotect_timed(raw)?;
                TimedContinuationToken::from_protected(value, raw.to_string(), expiration).into()
            }
        };
        Ok(token)
    }
}

impl<T> std::fmt::Debug for ContinuationTokenBinder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuationTokenBinder")
            .field("value_type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::value_provider::QueryValueProvider;
    use crate::protection::MockTokenProtector;
    use chrono::{Duration, Utc};

    fn binder() -> (Arc<MockTokenProtector<i32>>, ContinuationTokenBinder<i32>) {
        let mock = Arc::new(MockTokenProtector::new());
        let binder = ContinuationTokenBinder::new(mock.clone() as Arc<dyn TokenProtector<i32>>);
        (mock, binder)
    }

    #[test]
    fn test_missing_value_binds_nothing() {
        let (mock, binder) = binder();
        let provider = QueryValueProvider::parse("other=1");
        let mut state = ModelStateDictionary::new();
        let mut context = ModelBindingContext::new("token", &provider, &mut state);

        let result: ModelBindingResult<ContinuationToken<i32>> = binder.bind(&mut context);

        assert_eq!(result, ModelBindingResult::Success(None));
        assert!(mock.get_unprotect_history().is_empty());
        assert_eq!(state.error_count(), 0);
    }

    #[test]
    fn test_binder_model_name_overrides_field() {
        let (mock, binder) = binder();
        let opaque = mock.protect(&5).unwrap();
        let provider = QueryValueProvider::parse(&format!("ct={}", opaque));
        let mut state = ModelStateDictionary::new();
        let mut context =
            ModelBindingContext::new("token", &provider, &mut state).with_binder_model_name("ct");

        let result: ModelBindingResult<ContinuationToken<i32>> = binder.bind(&mut context);

        let token = result.into_model().unwrap();
        assert_eq!(token.value(), &5);
        assert_eq!(token.opaque(), Some(opaque.as_str()));
    }

    #[test]
    fn test_timed_binding_keeps_expiration() {
        let (mock, binder) = binder();
        let expiration = Utc::now() + Duration::minutes(1);
        let opaque = mock.protect_until(&5, expiration).unwrap();
        let provider = QueryValueProvider::parse(&format!("token={}", opaque));
        let mut state = ModelStateDictionary::new();
        let mut context = ModelBindingContext::new("token", &provider, &mut state);

        let token = binder
            .bind::<TimedContinuationToken<i32>>(&mut context)
            .into_model()
            .unwrap();

        assert_eq!(token.expiration().timestamp(), expiration.timestamp());
    }

    #[test]
    fn test_failure_records_generic_error() {
        let (mock, binder) = binder();
        mock.set_next_error(crate::error::CryptographicError::IntegrityCheckFailed.into());
        let provider = QueryValueProvider::parse("token=abc");
        let mut state = ModelStateDictionary::new();
        let mut context = ModelBindingContext::new("token", &provider, &mut state);

        let result = binder.bind::<ContinuationToken<i32>>(&mut context);

        assert_eq!(result, ModelBindingResult::Failed);
        assert_eq!(state.errors("token").len(), 1);
        assert_eq!(state.errors("token")[0].message, INVALID_TOKEN_MESSAGE);
    }

    #[test]
    fn test_result_map() {
        let result = ModelBindingResult::Success(Some(2)).map(|v| v * 2);
        assert_eq!(result.model(), Some(&4));
        assert!(!ModelBindingResult::<i32>::Failed.is_model_set());
    }
}
