//! Shared fixtures: deterministic keys and representative transports.

use serde_json::json;

use crate::keys::{keypair_from_seed, Jwk};
use crate::transport::SecureTransport;

/// Seed for the fixture recipient keypair.
pub const RECIPIENT_SEED: [u8; 32] = [0x42; 32];

/// Seed for deterministic ephemeral keys in known-answer tests.
pub const EPHEMERAL_SEED: [u8; 32] = [0x24; 32];

/// Deterministic recipient keypair `(public, private)` with `kid` set.
pub fn recipient_keypair() -> (Jwk, Jwk) {
    let (public, private) = keypair_from_seed(RECIPIENT_SEED);
    (public.with_kid("test-kid"), private.with_kid("test-kid"))
}

/// A minimal OTHER_REQUEST transport.
pub fn request_transport() -> SecureTransport {
    SecureTransport::request(json!({"action": "test"}), vec![])
        .expect("fixture transport is valid")
}

/// A PAYMENT transport with a one-field payload.
pub fn payment_transport() -> SecureTransport {
    SecureTransport::payment(json!({"payload": {"invoiceId": "inv_1"}}), vec![])
        .expect("fixture transport is valid")
}

/// A PAYMENT_REQUIRED quote transport.
pub fn payment_required_transport() -> SecureTransport {
    SecureTransport::payment_required(json!({"need": true}), vec![])
        .expect("fixture transport is valid")
}
