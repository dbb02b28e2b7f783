//! One-shot HPKE envelope seal/open.
//!
//! The envelope is the self-describing on-wire record: X25519 key
//! encapsulation, HKDF-SHA256 key schedule with a strict context binding, and
//! ChaCha20-Poly1305-IETF over the canonical body with the canonical AAD.
//! Every operation is a pure function of its inputs; the ephemeral scalar and
//! derived key material never escape the call and are zeroized after use.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::collections::BTreeMap;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::aad::{build_canonical_aad, validate_namespace, AAD_VERSION_TAG};
use crate::canonical::canonical_json;
use crate::encoding::{b64u, b64u_decode, b64u_decode_32};
use crate::extensions::ExtensionRegistry;
use crate::keys::{jwk_to_private_bytes, jwk_to_public_bytes, public_bytes_from_private, Jwk};
use crate::sidecar::{self, PublicEntities, Sidecar};
use crate::transport::{HeaderEntry, SecureTransport};
use crate::{Result, X402Error};

/// `typ` field of every envelope.
pub const ENVELOPE_TYP: &str = "hpke-envelope";

/// Envelope format version.
pub const ENVELOPE_VERSION: &str = "1";

/// The only cipher suite defined for v1.
pub const SUITE: &str = "X25519-HKDF-SHA256-CHACHA20POLY1305";

/// KEM name on the wire.
pub const KEM_X25519: &str = "X25519";

/// KDF name on the wire.
pub const KDF_HKDF_SHA256: &str = "HKDF-SHA256";

/// AEAD name on the wire.
pub const AEAD_CHACHA20_POLY1305: &str = "CHACHA20-POLY1305";

/// Provisional media type for serialized envelopes.
pub const MEDIA_TYPE: &str = "application/x402-envelope+json";

/// The self-describing envelope record. Immutable once emitted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    /// Always `hpke-envelope`.
    pub typ: String,
    /// Format version, `1`.
    pub ver: String,
    /// Cipher suite identifier.
    pub suite: String,
    /// Application namespace.
    pub ns: String,
    /// Recipient key identifier.
    pub kid: String,
    /// KEM name.
    pub kem: String,
    /// KDF name.
    pub kdf: String,
    /// AEAD name.
    pub aead: String,
    /// Ephemeral public key, base64url (32 bytes).
    pub enc: String,
    /// Canonical AAD bytes, base64url.
    pub aad: String,
    /// Ciphertext with tag, base64url.
    pub ct: String,
}

/// Sidecar policy for a seal call.
#[derive(Clone, Debug, Default)]
pub struct SealOptions {
    /// Which entities to project publicly; `None` keeps everything private.
    pub make_entities_public: Option<PublicEntities>,
    /// Entities to withhold even if selected (same matching rules).
    pub make_entities_private: Vec<String>,
}

/// Inputs to [`Hpke::open`] beyond the envelope itself.
#[derive(Clone, Debug, Default)]
pub struct OpenOptions<'a> {
    /// Require the envelope to name this kid.
    pub expected_kid: Option<&'a str>,
    /// Public headers sidecar to verify against the AAD.
    pub public_headers: Option<&'a BTreeMap<String, String>>,
    /// Headers-in-JSON sidecar variant; verified identically.
    pub public_json: Option<&'a BTreeMap<String, String>>,
    /// Public body subset to verify against the AAD.
    pub public_body: Option<&'a Map<String, Value>>,
}

/// Result of a successful open.
#[derive(Clone, Debug)]
pub struct Opened {
    /// The decrypted plaintext (canonical JSON of the body).
    pub plaintext: Vec<u8>,
    /// The authenticated body object.
    pub body: Map<String, Value>,
    /// The authenticated header entries, in canonical order.
    pub headers: Vec<HeaderEntry>,
}

/// A configured envelope codec bound to one namespace.
#[derive(Clone, Debug)]
pub struct Hpke {
    ns: String,
    aead: String,
    registry: ExtensionRegistry,
}

/// Builder-style configuration for [`Hpke`].
#[derive(Clone, Debug)]
pub struct HpkeBuilder {
    ns: String,
    aead: String,
    registry: ExtensionRegistry,
}

impl HpkeBuilder {
    /// Override the AEAD name. Anything other than `CHACHA20-POLY1305` is
    /// rejected at seal/open time.
    pub fn aead(mut self, aead: impl Into<String>) -> Self {
        self.aead = aead.into();
        self
    }

    /// Approve an additional extension header name for this instance.
    pub fn approve_extension_header(mut self, name: impl Into<String>) -> Self {
        self.registry = self.registry.approve(name);
        self
    }

    /// Validate the namespace and produce the codec.
    pub fn build(self) -> Result<Hpke> {
        validate_namespace(&self.ns)?;
        Ok(Hpke {
            ns: self.ns,
            aead: self.aead,
            registry: self.registry,
        })
    }
}

impl Hpke {
    /// Create a codec for `ns` with the default suite and registry.
    pub fn new(ns: impl Into<String>) -> Result<Self> {
        Self::builder(ns).build()
    }

    /// Start building a codec with custom configuration.
    pub fn builder(ns: impl Into<String>) -> HpkeBuilder {
        HpkeBuilder {
            ns: ns.into(),
            aead: AEAD_CHACHA20_POLY1305.to_string(),
            registry: ExtensionRegistry::builtin(),
        }
    }

    /// The namespace this codec is bound to.
    pub fn namespace(&self) -> &str {
        &self.ns
    }

    /// The per-instance extension registry.
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Seal a transport into an envelope, optionally projecting a sidecar.
    ///
    /// The plaintext is the canonical JSON of the normalized body; PAYMENT
    /// and PAYMENT_RESPONSE therefore encrypt `{}` and carry their content in
    /// the authenticated header instead.
    pub fn seal(
        &self,
        kid: &str,
        recipient_public_jwk: &Jwk,
        transport: &SecureTransport,
        options: &SealOptions,
    ) -> Result<(Envelope, Option<Sidecar>)> {
        let ephemeral = StaticSecret::random_from_rng(OsRng);
        self.seal_with_secret(kid, recipient_public_jwk, transport, options, ephemeral)
    }

    /// Seal with a deterministic ephemeral key derived from `seed`.
    ///
    /// Known-answer-test hook; never use a fixed seed in production.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn seal_with_seed(
        &self,
        kid: &str,
        recipient_public_jwk: &Jwk,
        transport: &SecureTransport,
        options: &SealOptions,
        seed: [u8; 32],
    ) -> Result<(Envelope, Option<Sidecar>)> {
        let ephemeral = StaticSecret::from(seed);
        self.seal_with_secret(kid, recipient_public_jwk, transport, options, ephemeral)
    }

    fn seal_with_secret(
        &self,
        kid: &str,
        recipient_public_jwk: &Jwk,
        transport: &SecureTransport,
        options: &SealOptions,
        ephemeral: StaticSecret,
    ) -> Result<(Envelope, Option<Sidecar>)> {
        if self.aead != AEAD_CHACHA20_POLY1305 {
            return Err(X402Error::AeadUnsupported {
                requested: self.aead.clone(),
            });
        }

        let headers = transport.headers();
        let parts = build_canonical_aad(&self.ns, &headers, transport.body(), &self.registry)?;
        let plaintext = canonical_json(&Value::Object(parts.body.clone()));

        let recipient_pub = jwk_to_public_bytes(recipient_public_jwk)?;
        if recipient_pub.iter().all(|&b| b == 0) {
            return Err(X402Error::EcdhLowOrder);
        }

        let ephemeral_pub = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&PublicKey::from(recipient_pub));
        if shared.as_bytes().iter().all(|&b| b == 0) {
            return Err(X402Error::EcdhLowOrder);
        }

        let enc_b64 = b64u(ephemeral_pub.as_bytes());
        let pkr_b64 = b64u(&recipient_pub);
        let info = hkdf_info(&self.ns, &enc_b64, &pkr_b64);
        let okm = derive_key_nonce(shared.as_bytes(), info.as_bytes())?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&okm[..32]));
        let ct = cipher
            .encrypt(
                Nonce::from_slice(&okm[32..]),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &parts.bytes,
                },
            )
            .map_err(|_| X402Error::InvalidEnvelope)?;

        let envelope = Envelope {
            typ: ENVELOPE_TYP.to_string(),
            ver: ENVELOPE_VERSION.to_string(),
            suite: SUITE.to_string(),
            ns: self.ns.clone(),
            kid: kid.to_string(),
            kem: KEM_X25519.to_string(),
            kdf: KDF_HKDF_SHA256.to_string(),
            aead: AEAD_CHACHA20_POLY1305.to_string(),
            enc: enc_b64,
            aad: b64u(&parts.bytes),
            ct: b64u(&ct),
        };

        let sidecar = options.make_entities_public.as_ref().and_then(|public| {
            sidecar::project(
                &parts.headers,
                &parts.body,
                transport.http_response_code(),
                public,
                &options.make_entities_private,
            )
        });

        Ok((envelope, sidecar))
    }

    /// Open an envelope, verifying any supplied sidecar against the AAD.
    ///
    /// AEAD tag failures surface as the generic `INVALID_ENVELOPE`; no
    /// partial plaintext is ever returned.
    pub fn open(
        &self,
        recipient_private_jwk: &Jwk,
        envelope: &Envelope,
        options: &OpenOptions<'_>,
    ) -> Result<Opened> {
        if envelope.ver != ENVELOPE_VERSION {
            return Err(X402Error::InvalidEnvelope);
        }
        if envelope.ns.eq_ignore_ascii_case("x402") {
            return Err(X402Error::NsForbidden);
        }
        if envelope.aead != self.aead {
            return Err(X402Error::AeadMismatch {
                expected: self.aead.clone(),
                actual: envelope.aead.clone(),
            });
        }
        if self.aead != AEAD_CHACHA20_POLY1305 {
            return Err(X402Error::AeadUnsupported {
                requested: self.aead.clone(),
            });
        }
        if let Some(expected) = options.expected_kid {
            if envelope.kid != expected {
                return Err(X402Error::KidMismatch {
                    expected: expected.to_string(),
                    actual: envelope.kid.clone(),
                });
            }
        }
        if envelope.ns != self.ns {
            return Err(X402Error::NsMismatch {
                configured: self.ns.clone(),
                envelope: envelope.ns.clone(),
            });
        }

        let ephemeral_pub = b64u_decode_32(&envelope.enc)?;
        let aad_bytes = b64u_decode(&envelope.aad)?;
        let ct = b64u_decode(&envelope.ct)?;

        if ephemeral_pub.iter().all(|&b| b == 0) {
            return Err(X402Error::EcdhLowOrder);
        }

        let sk = jwk_to_private_bytes(recipient_private_jwk)?;
        let secret = StaticSecret::from(sk);
        let shared = secret.diffie_hellman(&PublicKey::from(ephemeral_pub));
        if shared.as_bytes().iter().all(|&b| b == 0) {
            return Err(X402Error::EcdhLowOrder);
        }

        // The open path binds to the envelope: its ns and its enc verbatim.
        let pkr_b64 = b64u(&public_bytes_from_private(sk));
        let info = hkdf_info(&envelope.ns, &envelope.enc, &pkr_b64);
        let okm = derive_key_nonce(shared.as_bytes(), info.as_bytes())?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&okm[..32]));
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&okm[32..]),
                Payload {
                    msg: &ct,
                    aad: &aad_bytes,
                },
            )
            .map_err(|_| X402Error::InvalidEnvelope)?;

        let (headers, body) = parse_aad(&aad_bytes, &envelope.ns)?;

        if options.public_headers.is_some()
            || options.public_json.is_some()
            || options.public_body.is_some()
        {
            sidecar::verify(
                &headers,
                &body,
                options.public_headers,
                options.public_json,
                options.public_body,
            )?;
        }

        Ok(Opened {
            plaintext,
            body,
            headers,
        })
    }
}

/// The HKDF context string. Any deviation breaks cross-implementation
/// decryption, so the shape is fixed:
/// `x402-hpke:v1|KDF=<KDF>|AEAD=<AEAD>|ns=<NS>|enc=<ENC>|pkR=<PKR>`
fn hkdf_info(ns: &str, enc_b64: &str, pkr_b64: &str) -> String {
    format!(
        "x402-hpke:v1|KDF={KDF_HKDF_SHA256}|AEAD={AEAD_CHACHA20_POLY1305}|ns={ns}|enc={enc_b64}|pkR={pkr_b64}"
    )
}

/// HKDF-SHA256 with a 32-byte zero salt; 44 bytes out = key(32) || nonce(12).
fn derive_key_nonce(shared: &[u8; 32], info: &[u8]) -> Result<Zeroizing<[u8; 44]>> {
    let hk = Hkdf::<Sha256>::new(Some(&[0u8; 32]), shared);
    let mut okm = Zeroizing::new([0u8; 44]);
    hk.expand(info, &mut okm[..])
        .map_err(|_| X402Error::InvalidEnvelope)?;
    Ok(okm)
}

/// Split authenticated AAD bytes back into headers and body.
///
/// The textual form is `<ns>|v1|<headers-array>|<body-object>`; the namespace
/// prefix is validated against the envelope and the two JSON segments are
/// parsed in place. Anything malformed (including a legacy object-shaped
/// second segment) is `INVALID_ENVELOPE`.
fn parse_aad(aad_bytes: &[u8], ns: &str) -> Result<(Vec<HeaderEntry>, Map<String, Value>)> {
    let text = std::str::from_utf8(aad_bytes).map_err(|_| X402Error::InvalidEnvelope)?;
    let prefix = format!("{ns}|{AAD_VERSION_TAG}|");
    let rest = text
        .strip_prefix(&prefix)
        .ok_or(X402Error::InvalidEnvelope)?;

    let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
    let headers_value = stream
        .next()
        .ok_or(X402Error::InvalidEnvelope)?
        .map_err(|_| X402Error::InvalidEnvelope)?;
    let body_text = rest[stream.byte_offset()..]
        .strip_prefix('|')
        .ok_or(X402Error::InvalidEnvelope)?;

    let headers_array = match headers_value {
        Value::Array(items) => items,
        _ => return Err(X402Error::InvalidEnvelope),
    };
    let headers = headers_array
        .iter()
        .map(HeaderEntry::from_value)
        .collect::<Result<Vec<_>>>()?;

    let body_value: Value =
        serde_json::from_str(body_text).map_err(|_| X402Error::InvalidEnvelope)?;
    let body = match body_value {
        Value::Object(map) => map,
        _ => return Err(X402Error::InvalidEnvelope),
    };

    Ok((headers, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;
    use serde_json::json;

    fn transport() -> SecureTransport {
        SecureTransport::request(json!({"action": "test"}), vec![]).unwrap()
    }

    #[test]
    fn builder_rejects_forbidden_namespaces() {
        assert!(matches!(Hpke::new(""), Err(X402Error::NsForbidden)));
        assert!(matches!(Hpke::new("x402"), Err(X402Error::NsForbidden)));
        assert!(matches!(Hpke::new("X402"), Err(X402Error::NsForbidden)));
        assert!(Hpke::new("myapp").is_ok());
    }

    #[test]
    fn unsupported_aead_is_rejected_at_seal() {
        let hpke = Hpke::builder("myapp").aead("AES-256-GCM").build().unwrap();
        let (public, _) = keypair_from_seed([1u8; 32]);
        let err = hpke
            .seal("kid1", &public, &transport(), &SealOptions::default())
            .unwrap_err();
        assert!(matches!(err, X402Error::AeadUnsupported { .. }));
    }

    #[test]
    fn all_zero_recipient_key_is_rejected() {
        let hpke = Hpke::new("myapp").unwrap();
        let (mut public, _) = keypair_from_seed([1u8; 32]);
        public.x = b64u(&[0u8; 32]);
        let err = hpke
            .seal("kid1", &public, &transport(), &SealOptions::default())
            .unwrap_err();
        assert!(matches!(err, X402Error::EcdhLowOrder));
    }

    #[test]
    fn seeded_seal_is_deterministic() {
        let hpke = Hpke::new("myapp").unwrap();
        let (public, _) = keypair_from_seed([1u8; 32]);

        let (env1, _) = hpke
            .seal_with_seed("kid1", &public, &transport(), &SealOptions::default(), [9u8; 32])
            .unwrap();
        let (env2, _) = hpke
            .seal_with_seed("kid1", &public, &transport(), &SealOptions::default(), [9u8; 32])
            .unwrap();
        assert_eq!(env1, env2);

        let (env3, _) = hpke
            .seal_with_seed("kid1", &public, &transport(), &SealOptions::default(), [10u8; 32])
            .unwrap();
        assert_ne!(env1.enc, env3.enc);
        assert_ne!(env1.ct, env3.ct);
    }

    #[test]
    fn envelope_fields_are_self_describing() {
        let hpke = Hpke::new("myapp").unwrap();
        let (public, _) = keypair_from_seed([1u8; 32]);
        let (envelope, sidecar) = hpke
            .seal("kid1", &public, &transport(), &SealOptions::default())
            .unwrap();

        assert!(sidecar.is_none());
        assert_eq!(envelope.typ, "hpke-envelope");
        assert_eq!(envelope.ver, "1");
        assert_eq!(envelope.suite, SUITE);
        assert_eq!(envelope.ns, "myapp");
        assert_eq!(envelope.kid, "kid1");
        assert_eq!(envelope.kem, "X25519");
        assert_eq!(envelope.kdf, "HKDF-SHA256");
        assert_eq!(envelope.aead, "CHACHA20-POLY1305");
        assert_eq!(b64u_decode(&envelope.enc).unwrap().len(), 32);
    }

    #[test]
    fn hkdf_info_has_the_fixed_shape() {
        let info = hkdf_info("myapp", "ENC", "PKR");
        assert_eq!(
            info,
            "x402-hpke:v1|KDF=HKDF-SHA256|AEAD=CHACHA20-POLY1305|ns=myapp|enc=ENC|pkR=PKR"
        );
    }

    #[test]
    fn parse_aad_rejects_legacy_object_segment() {
        let aad = b"myapp|v1|{\"legacy\":true}|{}";
        assert!(matches!(
            parse_aad(aad, "myapp"),
            Err(X402Error::InvalidEnvelope)
        ));
    }

    #[test]
    fn parse_aad_round_trips_headers_and_body() {
        let aad = br#"myapp|v1|[{"name":"X-Payment","value":{"payload":{"p":"a|b"}}}]|{"k":"v|w"}"#;
        let (headers, body) = parse_aad(aad, "myapp").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].name, "X-Payment");
        assert_eq!(body["k"], json!("v|w"));
    }

    #[test]
    fn parse_aad_requires_the_namespace_prefix() {
        let aad = b"other|v1|[]|{}";
        assert!(matches!(
            parse_aad(aad, "myapp"),
            Err(X402Error::InvalidEnvelope)
        ));
    }
}
