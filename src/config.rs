// src/config.rs

use crate::error::ConfigError;
use jsonwebtoken::Algorithm;
use std::str::FromStr;
use std::time::Duration;

/// How long a fetched key set is trusted before the next request refreshes it.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Upper bound on a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-deployment settings for the authentication gate.
///
/// Loaded once at process start and never mutated afterwards. `domain` and
/// `audience` are optional here on purpose: a deployment with the gate enabled
/// but either value unset is rejected per request as a configuration error,
/// not at startup.
#[derive(Clone, Debug)]
pub struct IssuerConfig {
    /// When `false` the gate admits every request without looking at it.
    pub enabled: bool,
    /// The issuer's domain, e.g. `tenant.example.com`. Used to derive both the
    /// JWKS URL and the expected `iss` claim.
    pub domain: Option<String>,
    /// The expected `aud` claim, compared by exact string equality.
    pub audience: Option<String>,
    /// The signature algorithm tokens must be signed with.
    pub algorithm: Algorithm,
    /// Lifetime of a cached key set.
    pub cache_ttl: Duration,
    /// Timeout applied to each JWKS request.
    pub fetch_timeout: Duration,
}

impl IssuerConfig {
    /// The exact `iss` value tokens must carry: `https://{domain}/`.
    pub fn expected_issuer(&self) -> Option<String> {
        self.domain.as_deref().map(|d| format!("https://{}/", d))
    }

    /// Loads the configuration from the process environment.
    ///
    /// | Variable                 | Meaning                        | Default |
    /// |--------------------------|--------------------------------|---------|
    /// | `AUTH_ENABLED`           | `true`/`1`/`yes`/`on` enables  | `false` |
    /// | `AUTH_DOMAIN`            | issuer domain                  | unset   |
    /// | `AUTH_AUDIENCE`          | expected audience              | unset   |
    /// | `AUTH_ALGORITHM`         | signature algorithm tag        | `RS256` |
    /// | `AUTH_JWKS_TIMEOUT_SECS` | JWKS fetch timeout in seconds  | `10`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`IssuerConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ConfigBuilder::new();

        if let Some(raw) = lookup("AUTH_ENABLED") {
            builder = builder.enabled(parse_flag(&raw));
        }
        if let Some(domain) = lookup("AUTH_DOMAIN") {
            builder = builder.domain(domain);
        }
        if let Some(audience) = lookup("AUTH_AUDIENCE") {
            builder = builder.audience(audience);
        }
        if let Some(alg) = lookup("AUTH_ALGORITHM") {
            builder = builder.algorithm(&alg)?;
        }
        if let Some(raw) = lookup("AUTH_JWKS_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: "AUTH_JWKS_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
            builder = builder.fetch_timeout(Duration::from_secs(secs));
        }

        Ok(builder.build())
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Blank strings are treated as unset. Anything else is kept as given.
fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// A builder for creating an `IssuerConfig` instance.
pub struct ConfigBuilder {
    enabled: bool,
    domain: Option<String>,
    audience: Option<String>,
    algorithm: Algorithm,
    cache_ttl: Duration,
    fetch_timeout: Duration,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            enabled: false,
            domain: None,
            audience: None,
            // RS256 is what issuers publish by default.
            algorithm: Algorithm::RS256,
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`. The gate starts out disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns token verification on or off.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the issuer domain, without scheme or trailing slash.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = non_blank(domain.into());
        self
    }

    /// Sets the audience tokens must be issued for.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = non_blank(audience.into());
        self
    }

    /// Sets the signature algorithm from its JWT tag, e.g. `"RS256"`.
    ///
    /// # Errors
    ///
    /// Fails if the tag is unknown or names a non-RSA algorithm.
    pub fn algorithm(mut self, tag: &str) -> Result<Self, ConfigError> {
        let algorithm = Algorithm::from_str(tag.trim())
            .map_err(|_| ConfigError::InvalidAlgorithm(tag.to_string()))?;
        match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => {
                self.algorithm = algorithm;
                Ok(self)
            }
            other => Err(ConfigError::UnsupportedAlgorithm(other)),
        }
    }

    /// Overrides the key-set cache lifetime. Defaults to one hour.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Overrides the JWKS fetch timeout. Defaults to ten seconds.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Consumes the builder and returns an `IssuerConfig`.
    pub fn build(self) -> IssuerConfig {
        IssuerConfig {
            enabled: self.enabled,
            domain: self.domain,
            audience: self.audience,
            algorithm: self.algorithm,
            cache_ttl: self.cache_ttl,
            fetch_timeout: self.fetch_timeout,
        }
    }
}
