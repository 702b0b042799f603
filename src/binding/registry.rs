//! Binder Registry
//!
//! One binder per carried value type, built on first use and shared afterwards.

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::binding::binder::{BindableToken, ContinuationTokenBinder, ModelBindingContext, ModelBindingResult};
use crate::protection::{DataProtectionProvider, DefaultTokenProtector, TokenProtector, TokenValue};
use crate::types::TokenProtectorOptions;

type BinderEntry = Arc<dyn Any + Send + Sync>;

/// Type-indexed binder cache.
pub struct TokenBinderRegistry {
    provider: Arc<dyn DataProtectionProvider>,
    options: TokenProtectorOptions,
    binders: RwLock<HashMap<TypeId, BinderEntry>>,
}

impl TokenBinderRegistry {
    /// Create registry whose protectors use `provider` and `options`.
    pub fn new(provider: Arc<dyn DataProtectionProvider>, options: TokenProtectorOptions) -> Self {
        Self {
            provider,
            options,
            binders: RwLock::new(HashMap::new()),
        }
    }

    /// Protector options.
    pub fn options(&self) -> &TokenProtectorOptions {
        &self.options
    }

    /// Binder for value type `T`, built on first request.
    pub fn binder<T: TokenValue>(&self) -> Arc<ContinuationTokenBinder<T>> {
        let key = TypeId::of::<T>();
        if let Some(binder) = Self::lookup::<T>(&self.binders.read(), key) {
            return binder;
        }

        let mut binders = self.binders.write();
        // Another caller may have won the race for the write lock.
        if let Some(binder) = Self::lookup::<T>(&binders, key) {
            return binder;
        }

        debug!(
            value_type = std::any::type_name::<T>(),
            "Building continuation token binder"
        );
        let protector: Arc<dyn TokenProtector<T>> =
            Arc::new(DefaultTokenProtector::<T>::new(self.provider.as_ref(), &self.options));
        let binder = Arc::new(ContinuationTokenBinder::new(protector));
        binders.insert(key, binder.clone());
        binder
    }

    /// Binder serving token type `M`.
    pub fn binder_for<M: BindableToken>(&self) -> Arc<ContinuationTokenBinder<M::Value>> {
        self.binder::<M::Value>()
    }

    /// Protector for value type `T`, shared with its binder.
    pub fn protector<T: TokenValue>(&self) -> Arc<dyn TokenProtector<T>> {
        self.binder::<T>().protector().clone()
    }

    /// Use `protector` for value type `T`, replacing any cached binder.
    pub fn register<T: TokenValue>(&self, protector: Arc<dyn TokenProtector<T>>) {
        let binder: BinderEntry = Arc::new(ContinuationTokenBinder::new(protector));
        self.binders.write().insert(TypeId::of::<T>(), binder);
    }

    /// Bind a token of type `M`.
    pub fn bind<M: BindableToken>(&self, context: &mut ModelBindingContext<'_>) -> ModelBindingResult<M> {
        self.binder_for::<M>().bind::<M>(context)
    }

    /// Number of cached binders.
    pub fn cached_binders(&self) -> usize {
        self.binders.read().len()
    }

    fn lookup<T: TokenValue>(
        binders: &HashMap<TypeId, BinderEntry>,
        key: TypeId,
    ) -> Option<Arc<ContinuationTokenBinder<T>>> {
        binders.get(&key)?.clone().downcast().ok()
    }
}

impl std::fmt::Debug for TokenBinderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBinderRegistry")
            .field("options", &self.options)
            .field("cached_binders", &self.cached_binders())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protection::{AesGcmDataProtectionProvider, MockTokenProtector};

    fn registry() -> TokenBinderRegistry {
        TokenBinderRegistry::new(
            Arc::new(AesGcmDataProtectionProvider::ephemeral().unwrap()),
            TokenProtectorOptions::default(),
        )
    }

    #[test]
    fn test_binder_built_once_per_type() {
        let registry = registry();

        let first = registry.binder::<i32>();
        let second = registry.binder::<i32>();
        let _other = registry.binder::<String>();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.cached_binders(), 2);
    }

    #[test]
    fn test_shapes_share_binder() {
        use crate::types::{ContinuationToken, TimedContinuationToken};

        let registry = registry();
        let plain = registry.binder_for::<ContinuationToken<u64>>();
        let timed = registry.binder_for::<TimedContinuationToken<u64>>();

        assert!(Arc::ptr_eq(&plain, &timed));
        assert_eq!(registry.cached_binders(), 1);
    }

    #[test]
    fn test_register_overrides_protector() {
        let registry = registry();
        let mock = Arc::new(MockTokenProtector::<i32>::new());
        registry.register::<i32>(mock.clone());

        let protected = registry.protector::<i32>().protect(&3).unwrap();

        assert_eq!(protected, "plain:3");
        assert_eq!(mock.get_protect_history().len(), 1);
    }
}
