//! X25519 OKP JWK helpers.
//!
//! Keys move through the codec as RFC 7517 JWKs with base64url (unpadded)
//! coordinates. The codec takes keys by reference and never retains them;
//! raw scalar material lives in [`x25519_dalek::StaticSecret`], which is
//! zeroized on drop.

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::encoding::{b64u, b64u_decode_32};
use crate::{Result, X402Error};

/// An OKP / X25519 JSON Web Key. Public form omits `d`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type; always `OKP` for this suite.
    pub kty: String,
    /// Curve; always `X25519`.
    pub crv: String,
    /// Public coordinate, base64url without padding.
    pub x: String,
    /// Private scalar, base64url without padding. Absent on public keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// Key identifier; required for JWKS selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Intended use; must be `enc` when present.
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

impl Jwk {
    /// The public form of this key (drops `d`).
    pub fn to_public(&self) -> Jwk {
        Jwk {
            d: None,
            ..self.clone()
        }
    }

    /// Attach a key identifier.
    pub fn with_kid(mut self, kid: impl Into<String>) -> Jwk {
        self.kid = Some(kid.into());
        self
    }
}

/// Generate a fresh X25519 keypair from the system CSPRNG.
///
/// Returns `(public_jwk, private_jwk)`; the private JWK carries both `x` and
/// `d`.
pub fn generate_keypair() -> (Jwk, Jwk) {
    let secret = StaticSecret::random_from_rng(OsRng);
    keypair_from_secret(&secret)
}

/// Deterministically derive a keypair from a 32-byte seed.
///
/// Known-answer-test hook only; production callers use [`generate_keypair`].
#[cfg(any(test, feature = "test-utils"))]
pub fn keypair_from_seed(seed: [u8; 32]) -> (Jwk, Jwk) {
    keypair_from_secret(&StaticSecret::from(seed))
}

fn keypair_from_secret(secret: &StaticSecret) -> (Jwk, Jwk) {
    let public = PublicKey::from(secret);
    let public_jwk = Jwk {
        kty: "OKP".to_string(),
        crv: "X25519".to_string(),
        x: b64u(public.as_bytes()),
        d: None,
        kid: None,
        use_: None,
    };
    let private_jwk = Jwk {
        d: Some(b64u(&secret.to_bytes())),
        ..public_jwk.clone()
    };
    (public_jwk, private_jwk)
}

/// Extract the raw 32-byte public key from a JWK.
///
/// # Errors
///
/// `INVALID_ENVELOPE` when the JWK is not an OKP/X25519 key or its coordinate
/// does not decode to 32 bytes.
pub fn jwk_to_public_bytes(jwk: &Jwk) -> Result<[u8; 32]> {
    if jwk.kty != "OKP" || jwk.crv != "X25519" {
        return Err(X402Error::InvalidEnvelope);
    }
    b64u_decode_32(&jwk.x)
}

/// Extract the raw 32-byte private scalar from a JWK.
///
/// # Errors
///
/// `INVALID_ENVELOPE` when `d` is absent or malformed.
pub fn jwk_to_private_bytes(jwk: &Jwk) -> Result<[u8; 32]> {
    let d = jwk.d.as_deref().ok_or(X402Error::InvalidEnvelope)?;
    b64u_decode_32(d)
}

/// Recover the public key bytes for a private scalar (base-point multiply).
pub(crate) fn public_bytes_from_private(d: [u8; 32]) -> [u8; 32] {
    let secret = StaticSecret::from(d);
    *PublicKey::from(&secret).as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_well_formed() {
        let (public, private) = generate_keypair();
        assert_eq!(public.kty, "OKP");
        assert_eq!(public.crv, "X25519");
        assert!(public.d.is_none());
        assert_eq!(jwk_to_public_bytes(&public).unwrap().len(), 32);
        assert_eq!(jwk_to_private_bytes(&private).unwrap().len(), 32);
    }

    #[test]
    fn public_coordinate_matches_private_scalar() {
        let (public, private) = generate_keypair();
        let d = jwk_to_private_bytes(&private).unwrap();
        assert_eq!(public_bytes_from_private(d), jwk_to_public_bytes(&public).unwrap());
    }

    #[test]
    fn seeded_keypairs_are_deterministic() {
        let (pub1, priv1) = keypair_from_seed([7u8; 32]);
        let (pub2, priv2) = keypair_from_seed([7u8; 32]);
        assert_eq!(pub1, pub2);
        assert_eq!(priv1, priv2);

        let (pub3, _) = keypair_from_seed([8u8; 32]);
        assert_ne!(pub1.x, pub3.x);
    }

    #[test]
    fn malformed_jwks_are_rejected() {
        let (public, private) = generate_keypair();

        let mut wrong_kty = public.clone();
        wrong_kty.kty = "EC".to_string();
        assert!(matches!(
            jwk_to_public_bytes(&wrong_kty),
            Err(X402Error::InvalidEnvelope)
        ));

        let mut wrong_crv = public.clone();
        wrong_crv.crv = "Ed25519".to_string();
        assert!(matches!(
            jwk_to_public_bytes(&wrong_crv),
            Err(X402Error::InvalidEnvelope)
        ));

        let mut short_x = public.clone();
        short_x.x = "AAAA".to_string();
        assert!(matches!(
            jwk_to_public_bytes(&short_x),
            Err(X402Error::InvalidEnvelope)
        ));

        let public_only = private.to_public();
        assert!(matches!(
            jwk_to_private_bytes(&public_only),
            Err(X402Error::InvalidEnvelope)
        ));
    }

    #[test]
    fn jwk_serializes_with_rfc7517_field_names() {
        let (public, _) = generate_keypair();
        let jwk = public.with_kid("kid1");
        let json = serde_json::to_value(&jwk).unwrap();
        assert_eq!(json["kty"], "OKP");
        assert_eq!(json["crv"], "X25519");
        assert_eq!(json["kid"], "kid1");
        assert!(json.get("d").is_none());
        assert!(json.get("use").is_none());
    }
}
