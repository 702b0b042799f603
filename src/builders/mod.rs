//! Builders
//!
//! Fluent builder for token services.

pub mod services;

pub use services::{token_services, TokenServicesBuilder};
