//! Token Types
//!
//! Token value objects and configuration types.

pub mod config;
pub mod token;

pub use config::{TokenProtectorOptions, USE_CONVERSION_ENV};
pub use token::{
    opaque_token_schema, AnyContinuationToken, ContinuationToken, TimedContinuationToken, Token,
    OPAQUE_FORMAT,
};
