// src/error.rs

use thiserror::Error;

/// Failure to obtain an issuer's key set.
///
/// Callers must treat every variant as an authentication failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The JWKS URL derived from the issuer domain could not be built.
    #[error("Invalid JWKS URL: {0}")]
    InvalidUrl(String),

    /// The issuer did not answer within the configured timeout.
    #[error("JWKS request timed out")]
    Timeout,

    /// The request failed before a response was received.
    #[error("JWKS request failed: {0}")]
    Transport(String),

    /// The issuer answered with a non-success status code.
    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    /// The response body is not a well-formed key-set document.
    #[error("Malformed JWKS document: {0}")]
    MalformedBody(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::MalformedBody(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// A published key could not be turned into verifier key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyFormatError {
    /// The `n` or `e` member is absent.
    #[error("RSA key missing '{0}' component")]
    MissingComponent(&'static str),

    /// A component is not valid URL-safe base64.
    #[error("Invalid base64 in '{component}': {reason}")]
    InvalidBase64 {
        component: &'static str,
        reason: String,
    },

    /// The decoded values do not form a usable RSA public key.
    #[error("Invalid RSA key: {0}")]
    InvalidKey(String),
}

/// The reasons a bearer token can fail verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token is not a well-formed signed-token structure, or uses an
    /// algorithm other than the configured one.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token's own validity window has lapsed.
    #[error("token expired")]
    ExpiredToken,

    /// The token is not valid yet (`nbf` or `iat` lie in the future).
    #[error("token is not yet valid")]
    NotYetValid,

    /// The signature does not match the issuer's key.
    #[error("invalid token signature")]
    BadSignature,

    /// A mandatory claim (`aud`, `iss`, `exp`) failed validation.
    #[error("claim '{0}' failed validation")]
    ClaimMismatch(&'static str),

    /// The signing key could not be fetched or converted.
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),
}

impl From<FetchError> for VerifyError {
    fn from(e: FetchError) -> Self {
        VerifyError::KeyUnavailable(e.to_string())
    }
}

impl From<KeyFormatError> for VerifyError {
    fn from(e: KeyFormatError) -> Self {
        VerifyError::KeyUnavailable(e.to_string())
    }
}

/// Errors raised while building an [`IssuerConfig`](crate::config::IssuerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The algorithm tag is not a known JWT algorithm.
    #[error("Invalid signature algorithm: {0}")]
    InvalidAlgorithm(String),

    /// The algorithm is known but cannot be verified with RSA key material.
    #[error("Unsupported signature algorithm: {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    /// A configuration value could not be parsed.
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
