//! X-Payment header value helpers.
//!
//! Utilities for producing and consuming the compact string form of an
//! x402 payment object as it appears on the sidecar wire or in plain HTTP
//! headers. Deep chain-specific validation is left to integrators; this
//! module checks only the envelope-level schema.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use serde_json::Value;

use crate::canonical::canonical_json;
use crate::{Result, X402Error};

/// Emit the compact, stable string form of a payment object.
pub fn synthesize_payment_header_value(payment: &Value) -> String {
    canonical_json(payment)
}

/// Parse a header value carrying either raw JSON or base64-encoded JSON.
///
/// Returns `None` when the value is neither, or when it fails schema
/// normalization.
pub fn parse_payment_header_value(s: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(s) {
        return normalize_payment(&value).ok();
    }
    let decoded = STANDARD_NO_PAD.decode(s.trim_end_matches('=')).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let value = serde_json::from_str::<Value>(&text).ok()?;
    normalize_payment(&value).ok()
}

/// Validate the envelope-level schema of a payment object.
///
/// Requires `x402Version == 1`, string `scheme` and `network`, and an object
/// `payload`.
pub fn normalize_payment(payment: &Value) -> Result<Value> {
    let map = payment.as_object().ok_or(X402Error::PaymentSchema)?;
    if map.get("x402Version").and_then(Value::as_i64) != Some(1) {
        return Err(X402Error::PaymentVersion);
    }
    if !map.get("scheme").is_some_and(Value::is_string)
        || !map.get("network").is_some_and(Value::is_string)
    {
        return Err(X402Error::PaymentSchema);
    }
    if !map.get("payload").is_some_and(Value::is_object) {
        return Err(X402Error::PaymentSchema);
    }
    Ok(payment.clone())
}

/// Derive the public routing projection from a payment object.
///
/// Best-effort: missing fields are omitted; non-string values are stringified
/// canonically.
pub fn derive_payment_routing(payment: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut put = |key: &str, value: Option<&Value>| {
        if let Some(v) = value {
            let s = match v {
                Value::String(s) => s.clone(),
                other => canonical_json(other),
            };
            out.insert(key.to_string(), s);
        }
    };

    put("paymentScheme", payment.get("scheme"));
    put("paymentNetwork", payment.get("network"));

    let payload = payment.get("payload");
    put(
        "paymentSignature",
        payload.and_then(|p| p.get("signature")),
    );

    let auth = payload.and_then(|p| p.get("authorization"));
    put("paymentFrom", auth.and_then(|a| a.get("from")));
    put("paymentTo", auth.and_then(|a| a.get("to")));
    put("paymentValue", auth.and_then(|a| a.get("value")));
    put("paymentValidAfter", auth.and_then(|a| a.get("validAfter")));
    put("paymentValidBefore", auth.and_then(|a| a.get("validBefore")));
    put("paymentNonce", auth.and_then(|a| a.get("nonce")));

    out
}
