//! Protection
//!
//! Data protection primitives and the typed token protector built on them.

pub mod aead;
pub mod codec;
pub mod protector;
pub mod provider;
pub mod time_limited;

pub use aead::{AesGcmDataProtectionProvider, AesGcmDataProtector, MASTER_KEY_ENV, MASTER_KEY_LEN};
pub use codec::{TokenValue, ValueCodec};
pub use protector::{DefaultTokenProtector, MockTokenProtector, ProtectCall, TokenProtector};
pub use provider::{DataProtectionProvider, DataProtector};
pub use time_limited::{TimeLimitedDataProtector, TIME_LIMITED_PURPOSE};
