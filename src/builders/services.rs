//! Services Builder
//!
//! Fluent builder for [`TokenServices`].

use std::sync::Arc;
use tracing::info;

use crate::emission::parse_header_name;
use crate::error::{PreconditionError, TokenError};
use crate::protection::{AesGcmDataProtectionProvider, DataProtectionProvider, MASTER_KEY_ENV};
use crate::services::TokenServices;
use crate::types::TokenProtectorOptions;
use crate::CONTINUATION_TOKEN_HEADER;

/// Token services builder.
#[derive(Default)]
pub struct TokenServicesBuilder {
    provider: Option<Arc<dyn DataProtectionProvider>>,
    options: TokenProtectorOptions,
    header_name: Option<String>,
}

impl TokenServicesBuilder {
    /// Create new services builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data protection provider.
    pub fn data_protection_provider(
        mut self,
        provider: impl DataProtectionProvider + 'static,
    ) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Set a data protection provider shared with other components.
    pub fn shared_data_protection_provider(
        mut self,
        provider: Arc<dyn DataProtectionProvider>,
    ) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use the invariant text conversion instead of JSON.
    pub fn use_conversion_instead_of_json(mut self, enable: bool) -> Self {
        self.options.use_conversion_instead_of_json = enable;
        self
    }

    /// Set protector options.
    pub fn options(mut self, options: TokenProtectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the response header name.
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = Some(name.into());
        self
    }

    /// Configure from environment variables.
    ///
    /// Overrides protector options whose variable is set, and, when [`MASTER_KEY_ENV`] is
    /// set and no provider was supplied yet, adds an AES-GCM provider keyed from it.
    pub fn from_env(mut self) -> Result<Self, PreconditionError> {
        self.options = self.options.merge_env();
        if self.provider.is_none() && std::env::var_os(MASTER_KEY_ENV).is_some() {
            self.provider = Some(Arc::new(AesGcmDataProtectionProvider::from_env()?));
        }
        Ok(self)
    }

    /// Build the token services.
    pub fn build(self) -> Result<TokenServices, TokenError> {
        let provider = self.provider.ok_or_else(|| PreconditionError::MissingRequired {
            field: "data_protection_provider".to_string(),
        })?;

        let header_name = match self.header_name.as_deref() {
            Some(name) => parse_header_name(name)?,
            None => CONTINUATION_TOKEN_HEADER,
        };

        info!(
            header = %header_name,
            use_conversion_instead_of_json = self.options.use_conversion_instead_of_json,
            "Continuation token services configured"
        );

        Ok(TokenServices::new(provider, self.options, header_name))
    }
}

/// Create a new token services builder.
pub fn token_services() -> TokenServicesBuilder {
    TokenServicesBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AesGcmDataProtectionProvider {
        AesGcmDataProtectionProvider::ephemeral().unwrap()
    }

    #[test]
    fn test_builder_success() {
        let services = token_services()
            .data_protection_provider(provider())
            .use_conversion_instead_of_json(true)
            .header_name("X-Next-Page")
            .build()
            .unwrap();

        assert_eq!(services.header_name().as_str(), "x-next-page");
        assert!(services.options().use_conversion_instead_of_json);
    }

    #[test]
    fn test_builder_defaults() {
        let services = token_services()
            .data_protection_provider(provider())
            .build()
            .unwrap();

        assert_eq!(services.header_name().as_str(), "x-continuation-token");
        assert!(!services.options().use_conversion_instead_of_json);
    }

    #[test]
    fn test_builder_missing_provider() {
        let error = token_services().build().unwrap_err();

        assert!(matches!(
            error,
            TokenError::Precondition(PreconditionError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_builder_invalid_header_name() {
        let result = token_services()
            .data_protection_provider(provider())
            .header_name("not a header")
            .build();

        assert!(matches!(
            result,
            Err(TokenError::Precondition(PreconditionError::InvalidHeaderName { .. }))
        ));
    }
}
