#![allow(dead_code)]

use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use nila_gate::prelude::*;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{pkcs8::DecodePrivateKey, RsaPrivateKey};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const NOW: u64 = 1_700_000_000;
pub const AUDIENCE: &str = "https://rooms.api";

const SIGNING_KEY_A: &str = include_str!("../fixtures/signing_key_a.pem");
const SIGNING_KEY_B: &str = include_str!("../fixtures/signing_key_b.pem");

/// A signing key plus the JWK an issuer would publish for it.
pub struct TestKey {
    pub kid: String,
    private_key: RsaPrivateKey,
}

impl TestKey {
    pub fn a() -> Self {
        Self::from_pem("key-a", SIGNING_KEY_A)
    }

    pub fn b() -> Self {
        Self::from_pem("key-b", SIGNING_KEY_B)
    }

    fn from_pem(kid: &str, pem: &str) -> Self {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem.trim()).unwrap();
        Self {
            kid: kid.to_string(),
            private_key,
        }
    }

    pub fn jwk(&self) -> Value {
        let public_key = self.private_key.to_public_key();
        json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": self.kid,
            "n": URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        })
    }

    pub fn descriptor(&self) -> PublicKeyDescriptor {
        serde_json::from_value(self.jwk()).unwrap()
    }

    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with(Algorithm::RS256, claims)
    }

    pub fn sign_with(&self, algorithm: Algorithm, claims: &Value) -> String {
        let pkcs1_der = self.private_key.to_pkcs1_der().unwrap();
        let encoding_key = EncodingKey::from_rsa_der(pkcs1_der.as_bytes());
        let mut header = Header::new(algorithm);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &encoding_key).unwrap()
    }
}

/// Serves `keys` as the JWKS document and expects exactly `fetches` requests.
pub async fn jwks_server(keys: &[&TestKey], fetches: u64) -> MockServer {
    let jwks = json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() });
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
        .expect(fetches)
        .mount(&mock_server)
        .await;
    mock_server
}

/// The issuer domain a mock server answers for, e.g. `127.0.0.1:40123`.
pub fn domain(mock_server: &MockServer) -> String {
    mock_server.address().to_string()
}

pub fn issuer(mock_server: &MockServer) -> String {
    format!("https://{}/", domain(mock_server))
}

/// Claims that pass every check against a gate built by [`gate_for`].
pub fn valid_claims(mock_server: &MockServer) -> Value {
    json!({
        "sub": "auth0|guest-42",
        "aud": AUDIENCE,
        "iss": issuer(mock_server),
        "iat": NOW - 60,
        "exp": NOW + 3600,
        "https://rooms.api/roles": ["rates:write"],
    })
}

pub fn config_for(mock_server: &MockServer) -> ConfigBuilder {
    ConfigBuilder::new()
        .enabled(true)
        .domain(domain(mock_server))
        .audience(AUDIENCE)
        .fetch_timeout(Duration::from_secs(2))
}

/// A gate that fetches plain-HTTP JWKS from `mock_server` and reads `clock`.
pub fn gate_with(config: IssuerConfig, clock: Arc<ManualClock>) -> AuthGate {
    let fetcher = HttpKeySetFetcher::new(config.fetch_timeout)
        .unwrap()
        .with_scheme("http");
    AuthGate::with_parts(config, Arc::new(fetcher), clock)
}

pub fn gate_for(mock_server: &MockServer) -> (AuthGate, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW));
    (gate_with(config_for(mock_server).build(), clock.clone()), clock)
}

pub fn bearer(token: &str) -> http::HeaderMap {
    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::AUTHORIZATION,
        http::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

pub fn expect_identity(decision: Decision) -> DecodedToken {
    match decision {
        Decision::Proceed(Identity::Authenticated(token)) => token,
        other => panic!("expected an authenticated identity, got {:?}", other),
    }
}

pub fn expect_rejection(decision: Decision) -> Rejection {
    match decision {
        Decision::Reject(rejection) => rejection,
        other => panic!("expected a rejection, got {:?}", other),
    }
}
