//! Error types for x402-hpke operations.
//!
//! The taxonomy is closed: every rejection the codec can produce maps to
//! exactly one variant, and [`X402Error::kind`] exposes the stable wire token
//! for FFI and diagnostics. Errors are hard failures — the codec never
//! retries and never partially succeeds. Display output never contains
//! ciphertext, AAD bytes, or key material.

use thiserror::Error;

/// Comprehensive error type for x402-hpke operations.
#[derive(Debug, Error)]
pub enum X402Error {
    // -- Configuration / validation ------------------------------------

    /// Namespace is empty or case-insensitively equal to the reserved `x402`.
    #[error("namespace is empty or reserved")]
    NsForbidden,

    /// Configured namespace does not match the envelope's namespace.
    #[error("configured namespace {configured:?} does not match envelope namespace {envelope:?}")]
    NsMismatch {
        /// Namespace the codec instance was created with.
        configured: String,
        /// Namespace carried by the envelope.
        envelope: String,
    },

    /// JWKS URL was empty.
    #[error("a JWKS URL is required")]
    JwksUrlRequired,

    /// JWKS URL did not use the `https` scheme.
    #[error("JWKS URLs must use https")]
    JwksHttpsRequired,

    /// JWKS endpoint returned a non-200 status.
    #[error("JWKS fetch failed with HTTP status {status}")]
    JwksHttp {
        /// HTTP status code returned by the endpoint.
        status: u16,
    },

    /// JWKS document was not an object with a `keys` array.
    #[error("JWKS document is malformed")]
    JwksInvalid,

    /// A JWKS entry was not a valid OKP / X25519 public key.
    #[error("JWKS contains an invalid key")]
    JwksKeyInvalid,

    /// A JWKS entry declared a `use` other than `enc`.
    #[error("JWKS contains a key with an invalid use")]
    JwksKeyUseInvalid,

    /// A JWKS entry is missing its `kid`.
    #[error("JWKS contains a key without a kid")]
    JwksKidInvalid,

    // -- Transport model -----------------------------------------------

    /// OTHER_REQUEST messages must not carry an HTTP response code.
    #[error("OTHER_REQUEST must not carry an HTTP response code")]
    OtherRequestHttpCode,

    /// OTHER_RESPONSE messages must not use status 402.
    #[error("OTHER_RESPONSE must not use HTTP status 402")]
    OtherResponse402,

    /// PAYMENT_REQUIRED messages need non-empty content.
    #[error("PAYMENT_REQUIRED requires non-empty content")]
    PaymentRequiredContent,

    /// PAYMENT_RESPONSE messages need non-empty content.
    #[error("PAYMENT_RESPONSE requires non-empty content")]
    PaymentResponseContent,

    /// PAYMENT_RESPONSE messages only allow status 200.
    #[error("PAYMENT_RESPONSE only allows HTTP status 200")]
    PaymentResponseHttpCode,

    /// PAYMENT messages must not carry an HTTP response code.
    #[error("PAYMENT must not carry an HTTP response code")]
    PaymentHttpCode,

    /// PAYMENT content must contain a `payload` key.
    #[error("PAYMENT content must contain a payload key")]
    PaymentPayload,

    /// Transport content must be a JSON object.
    #[error("transport content must be a JSON object")]
    ContentObject,

    /// Extension header name is not in the approved registry.
    #[error("extension header {name:?} is not approved")]
    ExtensionUnapproved {
        /// The rejected header name.
        name: String,
    },

    /// Duplicate extension header name within one message.
    #[error("duplicate extension header {name:?}")]
    ExtensionDuplicate {
        /// The duplicated header name (canonical form).
        name: String,
    },

    /// Extension payload must be a non-empty JSON object.
    #[error("extension header {name:?} requires a non-empty object payload")]
    ExtensionPayload {
        /// The offending header name.
        name: String,
    },

    /// A top-level body key collides (case-insensitively) with a header name.
    #[error("body key {key:?} collides with a header name")]
    BodyHeaderNameCollision {
        /// The colliding body key.
        key: String,
    },

    /// More than one core x402 header in a single message.
    #[error("a message may carry at most one core x402 header")]
    MultipleCoreHeaders,

    // -- KEM / KDF ------------------------------------------------------

    /// All-zero public key or all-zero ECDH shared secret.
    #[error("low-order or non-contributory X25519 input")]
    EcdhLowOrder,

    // -- AEAD / envelope -------------------------------------------------

    /// The requested AEAD is not supported by this suite version.
    #[error("unsupported AEAD {requested:?}")]
    AeadUnsupported {
        /// The AEAD name that was requested.
        requested: String,
    },

    /// Envelope declares a different AEAD than the codec is configured for.
    #[error("envelope AEAD {actual:?} does not match configured {expected:?}")]
    AeadMismatch {
        /// AEAD the codec instance expects.
        expected: String,
        /// AEAD declared by the envelope.
        actual: String,
    },

    /// Envelope is structurally invalid or failed authentication.
    ///
    /// AEAD tag failures deliberately surface as this generic variant so the
    /// codec is not a padding/tag oracle.
    #[error("invalid envelope")]
    InvalidEnvelope,

    /// Envelope kid differs from the expected kid.
    #[error("envelope kid {actual:?} does not match expected {expected:?}")]
    KidMismatch {
        /// The kid the caller expected.
        expected: String,
        /// The kid the envelope carries.
        actual: String,
    },

    /// Streaming limiter budget (chunks or bytes) would be exceeded.
    #[error("stream AEAD usage limit exceeded")]
    AeadLimit,

    /// Streaming nonce prefix must be exactly 16 bytes.
    #[error("stream nonce prefix must be 16 bytes, got {actual}")]
    StreamNoncePrefixLen {
        /// Length of the prefix that was supplied.
        actual: usize,
    },

    // -- Sidecar verification --------------------------------------------

    /// A public value does not match the AAD-bound value.
    #[error("public value for {entity:?} does not match the authenticated data")]
    AadMismatch {
        /// Header name or body key that failed verification.
        entity: String,
    },

    /// A public entity is not present in the AAD at all.
    #[error("public entity {entity:?} is not present in the authenticated data")]
    PublicKeyNotInAad {
        /// Header name or body key that was supplied.
        entity: String,
    },

    // -- X-Payment header helpers ----------------------------------------

    /// X-Payment value is missing required fields or has wrong types.
    #[error("X-Payment value does not match the expected schema")]
    PaymentSchema,

    /// X-Payment value declares an unsupported x402Version.
    #[error("X-Payment value declares an unsupported x402Version")]
    PaymentVersion,
}

impl X402Error {
    /// Stable taxonomy token for this error, e.g. `NS_FORBIDDEN`.
    ///
    /// Useful for FFI surfaces and log correlation; the token is part of the
    /// wire-level contract and does not change between releases.
    pub fn kind(&self) -> String {
        match self {
            Self::NsForbidden => "NS_FORBIDDEN".into(),
            Self::NsMismatch { .. } => "NS_MISMATCH".into(),
            Self::JwksUrlRequired => "JWKS_URL_REQUIRED".into(),
            Self::JwksHttpsRequired => "JWKS_HTTPS_REQUIRED".into(),
            Self::JwksHttp { status } => format!("JWKS_HTTP_{status}"),
            Self::JwksInvalid => "JWKS_INVALID".into(),
            Self::JwksKeyInvalid => "JWKS_KEY_INVALID".into(),
            Self::JwksKeyUseInvalid => "JWKS_KEY_USE_INVALID".into(),
            Self::JwksKidInvalid => "JWKS_KID_INVALID".into(),
            Self::OtherRequestHttpCode => "OTHER_REQUEST_HTTP_CODE".into(),
            Self::OtherResponse402 => "OTHER_RESPONSE_402".into(),
            Self::PaymentRequiredContent => "PAYMENT_REQUIRED_CONTENT".into(),
            Self::PaymentResponseContent => "PAYMENT_RESPONSE_CONTENT".into(),
            Self::PaymentResponseHttpCode => "PAYMENT_RESPONSE_HTTP_CODE".into(),
            Self::PaymentHttpCode => "PAYMENT_HTTP_CODE".into(),
            Self::PaymentPayload => "PAYMENT_PAYLOAD".into(),
            Self::ContentObject => "CONTENT_OBJECT".into(),
            Self::ExtensionUnapproved { .. } => "X402_EXTENSION_UNAPPROVED".into(),
            Self::ExtensionDuplicate { .. } => "X402_EXTENSION_DUPLICATE".into(),
            Self::ExtensionPayload { .. } => "X402_EXTENSION_PAYLOAD".into(),
            Self::BodyHeaderNameCollision { .. } => "BODY_HEADER_NAME_COLLISION".into(),
            Self::MultipleCoreHeaders => "MULTIPLE_CORE_X402_HEADERS".into(),
            Self::EcdhLowOrder => "ECDH_LOW_ORDER".into(),
            Self::AeadUnsupported { .. } => "AEAD_UNSUPPORTED".into(),
            Self::AeadMismatch { .. } => "AEAD_MISMATCH".into(),
            Self::InvalidEnvelope => "INVALID_ENVELOPE".into(),
            Self::KidMismatch { .. } => "KID_MISMATCH".into(),
            Self::AeadLimit => "AEAD_LIMIT".into(),
            Self::StreamNoncePrefixLen { .. } => "STREAM_NONCE_PREFIX_LEN".into(),
            Self::AadMismatch { .. } => "AAD_MISMATCH".into(),
            Self::PublicKeyNotInAad { .. } => "PUBLIC_KEY_NOT_IN_AAD".into(),
            Self::PaymentSchema => "X_PAYMENT_SCHEMA".into(),
            Self::PaymentVersion => "X_PAYMENT_VERSION".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tokens_are_stable() {
        assert_eq!(X402Error::NsForbidden.kind(), "NS_FORBIDDEN");
        assert_eq!(X402Error::EcdhLowOrder.kind(), "ECDH_LOW_ORDER");
        assert_eq!(X402Error::JwksHttp { status: 404 }.kind(), "JWKS_HTTP_404");
        assert_eq!(
            X402Error::StreamNoncePrefixLen { actual: 12 }.kind(),
            "STREAM_NONCE_PREFIX_LEN"
        );
    }

    #[test]
    fn display_never_echoes_key_material() {
        let err = X402Error::KidMismatch {
            expected: "kid1".into(),
            actual: "kid2".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("kid1"));
        assert!(msg.contains("kid2"));

        // Authentication failures stay generic.
        assert_eq!(X402Error::InvalidEnvelope.to_string(), "invalid envelope");
    }
}
