// src/validator/mod.rs

pub mod client;
pub mod key;
pub mod model;

use crate::clock::Clock;
use crate::config::IssuerConfig;
use crate::error::VerifyError;
use client::KeySetCache;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// The claims of a token that passed signature and claim validation.
///
/// Issuers add arbitrary claims next to the standard ones, so the payload is
/// kept as an open map.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedToken {
    claims: Map<String, Value>,
}

impl DecodedToken {
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get("iss").and_then(Value::as_str)
    }

    pub fn audience(&self) -> Option<&str> {
        self.get("aud").and_then(Value::as_str)
    }

    /// The `exp` claim in whole seconds.
    pub fn expires_at(&self) -> Option<u64> {
        self.get("exp").and_then(numeric_date).map(|exp| exp as u64)
    }

    pub fn into_claims(self) -> Map<String, Value> {
        self.claims
    }
}

/// Verifies bearer tokens against the issuer's published keys.
///
/// Created once and shared by all requests; cloning is cheap.
#[derive(Clone)]
pub struct Validator {
    key_sets: KeySetCache,
    clock: Arc<dyn Clock>,
}

impl Validator {
    pub fn new(key_sets: KeySetCache, clock: Arc<dyn Clock>) -> Self {
        Self { key_sets, clock }
    }

    /// Verifies `token` and returns its claims.
    ///
    /// 1. Parse the token header; anything that is not a JWT fails fast.
    /// 2. Resolve the signing key: the issuer's first published key.
    /// 3. Verify the signature and the token's validity window.
    /// 4. Check `aud`, `iss` and `exp` against the configuration.
    ///
    /// The gate is expected to have checked that `domain` and `audience` are set;
    /// if they are not, the token cannot match and fails with `ClaimMismatch`.
    #[instrument(skip(self, token, config), err(level = "debug"))]
    pub async fn verify(&self, token: &str, config: &IssuerConfig) -> Result<DecodedToken, VerifyError> {
        // 1. Structural parse, before any network traffic.
        let header = decode_header(token).map_err(|e| VerifyError::MalformedToken(e.to_string()))?;
        if token.split('.').count() != 3 {
            return Err(VerifyError::MalformedToken("expected three segments".to_string()));
        }

        // 2. Key resolution.
        let domain = config
            .domain
            .as_deref()
            .ok_or(VerifyError::ClaimMismatch("iss"))?;
        let key_set = self.key_sets.get(domain).await?;
        // Always the first key, regardless of the token's `kid`.
        let descriptor = key_set
            .first()
            .ok_or_else(|| VerifyError::KeyUnavailable("issuer publishes no keys".to_string()))?;
        if let (Some(token_kid), Some(key_kid)) = (header.kid.as_deref(), descriptor.kid.as_deref()) {
            if token_kid != key_kid {
                debug!(token_kid, key_kid, "Token kid differs from the first published key");
            }
        }
        let verifier_key = key::to_verifier_key(descriptor)?;

        // 3. Signature. Time and audience checks run below against our own clock.
        let mut validation = Validation::new(config.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let token_data = decode::<Map<String, Value>>(token, verifier_key.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => VerifyError::BadSignature,
                ErrorKind::ExpiredSignature => VerifyError::ExpiredToken,
                ErrorKind::ImmatureSignature => VerifyError::NotYetValid,
                _ => VerifyError::MalformedToken(e.to_string()),
            })?;
        let claims = token_data.claims;

        let now = self.clock.now();
        if let Some(exp) = claims.get("exp").and_then(numeric_date) {
            if exp <= now as f64 {
                return Err(VerifyError::ExpiredToken);
            }
        }
        for name in ["nbf", "iat"] {
            if let Some(at) = claims.get(name).and_then(numeric_date) {
                if at > now as f64 {
                    return Err(VerifyError::NotYetValid);
                }
            }
        }

        // 4. Mandatory claims.
        validate_claims(&claims, config, now)?;

        debug!("Token validated successfully");
        Ok(DecodedToken { claims })
    }
}

fn validate_claims(claims: &Map<String, Value>, config: &IssuerConfig, now: u64) -> Result<(), VerifyError> {
    let audience = config.audience.as_deref().ok_or(VerifyError::ClaimMismatch("aud"))?;
    if claims.get("aud").and_then(Value::as_str) != Some(audience) {
        debug!("Audience mismatch");
        return Err(VerifyError::ClaimMismatch("aud"));
    }

    let issuer = config.expected_issuer().ok_or(VerifyError::ClaimMismatch("iss"))?;
    if claims.get("iss").and_then(Value::as_str) != Some(issuer.as_str()) {
        debug!("Issuer mismatch");
        return Err(VerifyError::ClaimMismatch("iss"));
    }

    match claims.get("exp").and_then(numeric_date) {
        Some(exp) if exp > now as f64 => Ok(()),
        _ => Err(VerifyError::ClaimMismatch("exp")),
    }
}

/// Reads a JWT NumericDate, keeping fractional seconds. Negative or
/// non-numeric values are not dates.
fn numeric_date(value: &Value) -> Option<f64> {
    value.as_f64().filter(|f| f.is_finite() && *f >= 0.0)
}
