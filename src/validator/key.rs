// src/validator/key.rs

use super::model::PublicKeyDescriptor;
use crate::error::KeyFormatError;
use base64::engine::{general_purpose::URL_SAFE, Engine};
use jsonwebtoken::DecodingKey;
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{BigUint, RsaPublicKey};

/// RSA public key material ready for signature verification.
///
/// Two keys built from the same descriptor compare equal: equality is defined
/// on the PKCS#1 DER encoding, which is deterministic.
#[derive(Clone)]
pub struct VerifierKey {
    public_key: RsaPublicKey,
    der: Vec<u8>,
    decoding_key: DecodingKey,
}

impl VerifierKey {
    /// The PKCS#1 `RSAPublicKey` DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The key wrapped in a SubjectPublicKeyInfo envelope, PEM encoded.
    pub fn to_pem(&self) -> Result<String, KeyFormatError> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyFormatError::InvalidKey(e.to_string()))
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl PartialEq for VerifierKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for VerifierKey {}

impl std::fmt::Debug for VerifierKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierKey")
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Rebuilds an RSA public key from a published modulus/exponent pair.
///
/// # Errors
///
/// Returns `KeyFormatError` if `n` or `e` is missing, is not URL-safe base64,
/// or does not describe a structurally valid RSA key.
pub fn to_verifier_key(descriptor: &PublicKeyDescriptor) -> Result<VerifierKey, KeyFormatError> {
    let n = descriptor
        .n
        .as_deref()
        .ok_or(KeyFormatError::MissingComponent("n"))?;
    let e = descriptor
        .e
        .as_deref()
        .ok_or(KeyFormatError::MissingComponent("e"))?;

    let modulus = decode_component("n", n)?;
    let exponent = decode_component("e", e)?;

    if modulus.iter().all(|b| *b == 0) {
        return Err(KeyFormatError::InvalidKey("modulus is empty".to_string()));
    }
    if exponent.iter().all(|b| *b == 0) {
        return Err(KeyFormatError::InvalidKey("exponent is empty".to_string()));
    }

    let public_key = RsaPublicKey::new(
        BigUint::from_bytes_be(&modulus),
        BigUint::from_bytes_be(&exponent),
    )
    .map_err(|e| KeyFormatError::InvalidKey(e.to_string()))?;

    let der = public_key
        .to_pkcs1_der()
        .map_err(|e| KeyFormatError::InvalidKey(e.to_string()))?
        .as_bytes()
        .to_vec();
    let decoding_key = DecodingKey::from_rsa_der(&der);

    Ok(VerifierKey {
        public_key,
        der,
        decoding_key,
    })
}

/// Issuers publish components unpadded; restore padding before decoding.
fn decode_component(component: &'static str, value: &str) -> Result<Vec<u8>, KeyFormatError> {
    let padded = repad(value.trim_end_matches('='));
    URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|e| KeyFormatError::InvalidBase64 {
            component,
            reason: e.to_string(),
        })
}

fn repad(value: &str) -> String {
    let mut padded = value.to_string();
    let missing = (4 - padded.len() % 4) % 4;
    padded.extend(std::iter::repeat('=').take(missing));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;

    // Public half of tests/fixtures/signing_key_a.pem.
    const FIXTURE_N: &str = "ypgOGJNXNrtbro63hjOF9vIv3kigy4mzSugOuUHKTAgtekyXA_gGTVbE1xRQ2YKOM3GKDlb3UG2Ilz5EoXrZWP_qOv7luaWp0AlwYR6x1pzjIcMgksSI5S-yuU01Yvbqu4OkAlsgGYS-WtG9cxeoHOTaPUBJvnSmXxBrIWW7sJdsT8CPpBCgESIKFJK2BIn2CJJSvLwTDyljaVTNYH1y-67CPsJ6nusvirB0Nrk5-j5LE3uM1Mo05a-i0U6Ah28Z-bqhHUKPIZQ-f8ICKl_Njy3uF0fUFq8ILOeH5Q-BIMfrdGm_RWEK86AXgLpbzkkHxaBrvBJUUhvuecS3dXuTCQ";
    const FIXTURE_E: &str = "AQAB";

    fn descriptor(n: Option<&str>, e: Option<&str>) -> PublicKeyDescriptor {
        PublicKeyDescriptor {
            kid: Some("fixture".to_string()),
            kty: Some("RSA".to_string()),
            use_purpose: Some("sig".to_string()),
            alg: Some("RS256".to_string()),
            n: n.map(str::to_string),
            e: e.map(str::to_string),
        }
    }

    #[test]
    fn repad_restores_multiple_of_four() {
        assert_eq!(repad("AQAB"), "AQAB");
        assert_eq!(repad("AQA"), "AQA=");
        assert_eq!(repad("AQ"), "AQ==");
        assert_eq!(repad(""), "");
    }

    #[test]
    fn converts_fixture_key() {
        let key = to_verifier_key(&descriptor(Some(FIXTURE_N), Some(FIXTURE_E))).unwrap();

        assert_eq!(key.public_key.n().bits(), 2048);
        assert_eq!(key.public_key.e(), &BigUint::from(65537u32));
        // SEQUENCE { INTEGER n, INTEGER e }
        assert_eq!(key.der()[0], 0x30);

        let pem = key.to_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn conversion_is_deterministic() {
        let first = to_verifier_key(&descriptor(Some(FIXTURE_N), Some(FIXTURE_E))).unwrap();
        let second = to_verifier_key(&descriptor(Some(FIXTURE_N), Some(FIXTURE_E))).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.der(), second.der());
    }

    #[test]
    fn padded_input_is_accepted() {
        let padded_n = format!("{}==", FIXTURE_N);
        let unpadded = to_verifier_key(&descriptor(Some(FIXTURE_N), Some(FIXTURE_E))).unwrap();
        let padded = to_verifier_key(&descriptor(Some(&padded_n), Some(FIXTURE_E))).unwrap();
        assert_eq!(unpadded, padded);
    }

    #[test]
    fn missing_components_are_reported() {
        assert_eq!(
            to_verifier_key(&descriptor(None, Some(FIXTURE_E))).unwrap_err(),
            KeyFormatError::MissingComponent("n")
        );
        assert_eq!(
            to_verifier_key(&descriptor(Some(FIXTURE_N), None)).unwrap_err(),
            KeyFormatError::MissingComponent("e")
        );
    }

    #[test]
    fn standard_alphabet_is_not_accepted() {
        let standard = FIXTURE_N.replace('-', "+").replace('_', "/");
        assert!(matches!(
            to_verifier_key(&descriptor(Some(&standard), Some(FIXTURE_E))),
            Err(KeyFormatError::InvalidBase64 { component: "n", .. })
        ));
    }

    #[test]
    fn garbage_base64_is_rejected() {
        assert!(matches!(
            to_verifier_key(&descriptor(Some(FIXTURE_N), Some("!!"))),
            Err(KeyFormatError::InvalidBase64 { component: "e", .. })
        ));
    }

    #[test]
    fn empty_modulus_is_rejected() {
        assert!(matches!(
            to_verifier_key(&descriptor(Some(""), Some(FIXTURE_E))),
            Err(KeyFormatError::InvalidKey(_))
        ));
        assert!(matches!(
            to_verifier_key(&descriptor(Some("AAAA"), Some(FIXTURE_E))),
            Err(KeyFormatError::InvalidKey(_))
        ));
    }

    #[test]
    fn exponent_of_one_is_rejected() {
        assert!(matches!(
            to_verifier_key(&descriptor(Some(FIXTURE_N), Some("AQ"))),
            Err(KeyFormatError::InvalidKey(_))
        ));
    }
}
