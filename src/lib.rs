// src/lib.rs


pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
#[cfg(feature = "axum-integration")]
pub mod middleware;
pub mod validator;

/// The public prelude for the `nila-gate` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{ConfigBuilder, IssuerConfig};
    pub use crate::error::{ConfigError, FetchError, KeyFormatError, VerifyError};
    pub use crate::gate::{AuthGate, Decision, Identity, Rejection};
    #[cfg(feature = "axum-integration")]
    pub use crate::middleware::{require_auth, IdentityExt};
    pub use crate::validator::client::{HttpKeySetFetcher, KeySetCache, KeySetFetcher};
    pub use crate::validator::key::{to_verifier_key, VerifierKey};
    pub use crate::validator::model::{KeySet, PublicKeyDescriptor};
    pub use crate::validator::{DecodedToken, Validator};
    pub use jsonwebtoken::Algorithm;
}
