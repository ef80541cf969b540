// src/validator/model.rs

use serde::Deserialize;

/// A single published key, as found in the issuer's JWKS document.
///
/// Every member is optional at parse time: a key with a missing modulus or
/// exponent still lands in the [`KeySet`] and only fails when it is converted.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PublicKeyDescriptor {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: Option<String>,
    #[serde(default, rename = "use")]
    pub use_purpose: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    /// RSA modulus, base64url without padding.
    #[serde(default)]
    pub n: Option<String>,
    /// RSA public exponent, base64url without padding.
    #[serde(default)]
    pub e: Option<String>,
}

/// The JWKS document served at `/.well-known/jwks.json`.
#[derive(Debug, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<PublicKeyDescriptor>,
}

/// A point-in-time snapshot of an issuer's signing keys.
///
/// Keys keep their publication order. A `KeySet` is never patched; a refresh
/// builds a new one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: Vec<PublicKeyDescriptor>,
}

impl KeySet {
    pub fn new(keys: Vec<PublicKeyDescriptor>) -> Self {
        Self { keys }
    }

    /// The first published key. This is the key every token is verified against.
    pub fn first(&self) -> Option<&PublicKeyDescriptor> {
        self.keys.first()
    }

    /// Looks a key up by its `kid`.
    pub fn get(&self, kid: &str) -> Option<&PublicKeyDescriptor> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PublicKeyDescriptor> {
        self.keys.iter()
    }
}

impl From<JsonWebKeySet> for KeySet {
    fn from(doc: JsonWebKeySet) -> Self {
        Self::new(doc.keys)
    }
}
