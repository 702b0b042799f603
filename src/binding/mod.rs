//! Inbound Binding
//!
//! Binds continuation tokens from request values.

pub mod binder;
pub mod model_state;
pub mod registry;
pub mod value_provider;

pub use binder::{
    BindableToken, ContinuationTokenBinder, ModelBindingContext, ModelBindingResult, TokenShape,
};
pub use model_state::{ModelError, ModelStateDictionary, ModelValidationState};
pub use registry::TokenBinderRegistry;
pub use value_provider::{
    CompositeValueProvider, HeaderValueProvider, QueryValueProvider, RouteValueProvider,
    ValueProvider, ValueProviderResult,
};
