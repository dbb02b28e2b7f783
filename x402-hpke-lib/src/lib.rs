//! HPKE envelope codec for the x402 payment-request protocol.
//!
//! This crate intentionally stays stateless: every seal and open is a pure
//! function of its inputs, keys are taken by reference and never retained,
//! and the only long-lived collaborator (the JWKS cache) sits behind a
//! trait-based seam the caller owns.
//!
//! # Features
//!
//! - **Envelope codec**: one-shot X25519 + HKDF-SHA256 + ChaCha20-Poly1305
//!   seal/open binding payloads to canonical authenticated metadata
//! - **Transport model**: tagged message variants (payment, payment-response,
//!   402 quote, generic request/response) validated at construction
//! - **Sidecar projection**: a selectively-public view of AAD-bound entities
//!   that middleware can route on, verified in constant time on open
//! - **Streaming chunks**: XChaCha20-Poly1305 per-chunk encryption with
//!   anti-abuse limits
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use x402_hpke_lib::{generate_keypair, Hpke, OpenOptions, SealOptions, SecureTransport};
//!
//! # fn main() -> x402_hpke_lib::Result<()> {
//! let hpke = Hpke::new("myapp")?;
//! let (public_jwk, private_jwk) = generate_keypair();
//!
//! let transport = SecureTransport::request(json!({"action": "quote"}), vec![])?;
//! let (envelope, _sidecar) =
//!     hpke.seal("kid1", &public_jwk, &transport, &SealOptions::default())?;
//!
//! let opened = hpke.open(&private_jwk, &envelope, &OpenOptions::default())?;
//! assert_eq!(opened.body["action"], "quote");
//! # Ok(())
//! # }
//! ```

pub mod aad;
pub mod canonical;
mod encoding;
pub mod envelope;
pub mod errors;
pub mod extensions;
pub mod helpers;
pub mod jwks;
pub mod keys;
pub mod payment;
pub mod sidecar;
pub mod streaming;
pub mod transport;

/// Deterministic fixtures for downstream tests.
///
/// Only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use envelope::{
    Envelope, Hpke, HpkeBuilder, OpenOptions, Opened, SealOptions, AEAD_CHACHA20_POLY1305,
    KDF_HKDF_SHA256, KEM_X25519, MEDIA_TYPE, SUITE,
};
pub use errors::X402Error;
pub use extensions::{ExtensionRegistry, APPROVED_EXTENSION_HEADERS};
pub use helpers::{
    create_payment, create_payment_required, create_payment_response, create_request,
    create_response,
};
pub use jwks::{fetch_jwks, select_jwk, Jwks, JwksCache, JwksConfig, JwksFetch, JwksResponse};
pub use keys::{generate_keypair, Jwk};
pub use sidecar::{PublicEntities, Sidecar};
pub use streaming::{open_chunk, seal_chunk, ChunkStream, StreamLimits};
pub use transport::{
    HeaderEntry, SecureTransport, TransportType, HEADER_X_PAYMENT, HEADER_X_PAYMENT_RESPONSE,
};

/// Common result alias for x402-hpke operations.
pub type Result<T> = std::result::Result<T, X402Error>;
