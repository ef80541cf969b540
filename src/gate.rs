// src/gate.rs

use crate::clock::{Clock, SystemClock};
use crate::config::IssuerConfig;
use crate::error::{FetchError, VerifyError};
use crate::validator::client::{HttpKeySetFetcher, KeySetCache, KeySetFetcher};
use crate::validator::{DecodedToken, Validator};
use http::header::AUTHORIZATION;
use http::{HeaderMap, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Who the caller is, as far as the gate is concerned.
#[derive(Clone, Debug, PartialEq)]
pub enum Identity {
    /// The gate is disabled or the route is unprotected.
    Anonymous,
    /// The caller presented a verified token.
    Authenticated(DecodedToken),
}

impl Identity {
    pub fn claims(&self) -> Option<&DecodedToken> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(token) => Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }
}

/// A refused request: the status code and the message for the `error` body field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: String,
}

impl Rejection {
    fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    /// The JSON body sent to the client: `{"error": message}`.
    pub fn body(&self) -> Value {
        json!({ "error": self.message })
    }
}

impl From<VerifyError> for Rejection {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::ExpiredToken => Rejection::unauthorized("Token expired"),
            VerifyError::BadSignature => Rejection::unauthorized("Invalid token signature"),
            VerifyError::ClaimMismatch(_) => Rejection::unauthorized("Invalid token"),
            other @ (VerifyError::MalformedToken(_)
            | VerifyError::NotYetValid
            | VerifyError::KeyUnavailable(_)) => {
                Rejection::unauthorized(format!("Token validation failed: {}", other))
            }
        }
    }
}

/// The outcome of running a request through the gate.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    Proceed(Identity),
    Reject(Rejection),
}

/// Request-path entry point that admits or rejects each inbound call.
#[derive(Clone)]
pub struct AuthGate {
    config: Arc<IssuerConfig>,
    validator: Validator,
}

impl AuthGate {
    /// Builds a gate that fetches keys over HTTPS and reads the wall clock.
    pub fn new(config: IssuerConfig) -> Result<Self, FetchError> {
        let fetcher = HttpKeySetFetcher::new(config.fetch_timeout)?;
        Ok(Self::with_parts(config, Arc::new(fetcher), Arc::new(SystemClock)))
    }

    /// Builds a gate around an explicit fetcher and clock.
    pub fn with_parts(config: IssuerConfig, fetcher: Arc<dyn KeySetFetcher>, clock: Arc<dyn Clock>) -> Self {
        let key_sets = KeySetCache::new(fetcher, Arc::clone(&clock), config.cache_ttl);
        Self {
            config: Arc::new(config),
            validator: Validator::new(key_sets, clock),
        }
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Decides whether a request may proceed.
    ///
    /// `protected` comes from the routing layer; unprotected routes and a
    /// disabled gate skip token handling entirely.
    #[instrument(skip_all, fields(protected = protected))]
    pub async fn authenticate(&self, headers: &HeaderMap, protected: bool) -> Decision {
        if !protected || !self.config.enabled {
            return Decision::Proceed(Identity::Anonymous);
        }

        let header = match headers.get(AUTHORIZATION) {
            Some(value) if !value.is_empty() => value,
            _ => {
                debug!("Missing Authorization header");
                return reject(Rejection::unauthorized("Authorization header missing"));
            }
        };

        let token = match header.to_str().ok().and_then(bearer_token) {
            Some(token) => token,
            None => {
                debug!("Invalid Authorization header format");
                return reject(Rejection::unauthorized("Invalid authorization format"));
            }
        };

        if self.config.domain.is_none() || self.config.audience.is_none() {
            error!("Authentication is enabled but the issuer domain or audience is not configured");
            return reject(Rejection {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Auth configuration missing".to_string(),
            });
        }

        match self.validator.verify(token, &self.config).await {
            Ok(decoded) => Decision::Proceed(Identity::Authenticated(decoded)),
            Err(e) => {
                debug!(error = %e, "Token rejected");
                reject(e.into())
            }
        }
    }
}

fn reject(rejection: Rejection) -> Decision {
    Decision::Reject(rejection)
}

/// Extracts `<token>` from `Bearer <token>`: case-sensitive scheme, one space,
/// and a non-empty token without whitespace.
fn bearer_token(value: &str) -> Option<&str> {
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return None;
    }
    Some(token)
}
