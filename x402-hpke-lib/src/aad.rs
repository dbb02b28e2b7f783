//! Canonical AAD construction.
//!
//! The AAD binds the ciphertext to its metadata. It is a pure function of
//! `(namespace, headers, body)`: two implementations given the same logical
//! input must emit identical bytes. The textual form is four pipe-separated
//! segments:
//!
//! ```text
//! <ns>|v1|<canonical-json-headers-array>|<canonical-json-body-object>
//! ```
//!
//! The headers array is sorted case-insensitively by name; the segment
//! structure is load-bearing for the open-side parser.

use serde_json::{Map, Value};

use crate::canonical::canonical_json;
use crate::extensions::ExtensionRegistry;
use crate::transport::{
    HeaderEntry, HEADER_PAYMENT_REQUIRED_MARKER, HEADER_X_PAYMENT, HEADER_X_PAYMENT_RESPONSE,
};
use crate::{Result, X402Error};

/// Version tag in the AAD's second segment.
pub const AAD_VERSION_TAG: &str = "v1";

/// Canonical AAD bytes plus the normalized copies used for later equality
/// checks (sidecar projection and verification).
#[derive(Clone, Debug)]
pub struct AadParts {
    /// UTF-8 canonical AAD bytes.
    pub bytes: Vec<u8>,
    /// Headers with canonical names, sorted case-insensitively.
    pub headers: Vec<HeaderEntry>,
    /// The body object (keys sort at serialization time).
    pub body: Map<String, Value>,
}

/// Reject empty namespaces and the reserved `x402` (case-insensitive).
pub fn validate_namespace(ns: &str) -> Result<()> {
    if ns.is_empty() || ns.eq_ignore_ascii_case("x402") {
        return Err(X402Error::NsForbidden);
    }
    Ok(())
}

/// Canonicalize a header name into its stored casing.
///
/// Accepts the empty-string Payment-Required marker, the two core names under
/// any casing, and approved extension names from `registry`.
fn canonical_header_name(name: &str, registry: &ExtensionRegistry) -> Result<String> {
    if name == HEADER_PAYMENT_REQUIRED_MARKER {
        return Ok(String::new());
    }
    if name.eq_ignore_ascii_case(HEADER_X_PAYMENT) {
        return Ok(HEADER_X_PAYMENT.to_string());
    }
    if name.eq_ignore_ascii_case(HEADER_X_PAYMENT_RESPONSE) {
        return Ok(HEADER_X_PAYMENT_RESPONSE.to_string());
    }
    registry
        .canonicalize(name)
        .map(|s| s.to_string())
        .ok_or_else(|| X402Error::ExtensionUnapproved {
            name: name.to_string(),
        })
}

fn is_core_name(name: &str) -> bool {
    name == HEADER_PAYMENT_REQUIRED_MARKER
        || name.eq_ignore_ascii_case(HEADER_X_PAYMENT)
        || name.eq_ignore_ascii_case(HEADER_X_PAYMENT_RESPONSE)
}

/// Build the canonical AAD for `(ns, headers, body)`.
///
/// Normalizes header names, sorts entries case-insensitively in code-point
/// order, and rejects duplicate names, multiple core headers, and body keys
/// that collide with header names.
pub fn build_canonical_aad(
    ns: &str,
    headers: &[HeaderEntry],
    body: &Map<String, Value>,
    registry: &ExtensionRegistry,
) -> Result<AadParts> {
    validate_namespace(ns)?;

    let mut normalized: Vec<HeaderEntry> = Vec::with_capacity(headers.len());
    let mut core_count = 0usize;
    for entry in headers {
        let name = canonical_header_name(&entry.name, registry)?;
        if is_core_name(&name) {
            core_count += 1;
            if core_count > 1 {
                return Err(X402Error::MultipleCoreHeaders);
            }
        }
        normalized.push(HeaderEntry {
            name,
            value: entry.value.clone(),
            extras: entry.extras.clone(),
        });
    }

    for key in body.keys() {
        if normalized.iter().any(|h| h.name.eq_ignore_ascii_case(key)) {
            return Err(X402Error::BodyHeaderNameCollision { key: key.clone() });
        }
    }

    normalized.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    for pair in normalized.windows(2) {
        if pair[0].name.eq_ignore_ascii_case(&pair[1].name) {
            return Err(X402Error::ExtensionDuplicate {
                name: pair[1].name.clone(),
            });
        }
    }

    let headers_value = Value::Array(normalized.iter().map(HeaderEntry::to_value).collect());
    let headers_json = canonical_json(&headers_value);
    let body_json = canonical_json(&Value::Object(body.clone()));

    let aad = format!("{ns}|{AAD_VERSION_TAG}|{headers_json}|{body_json}");

    Ok(AadParts {
        bytes: aad.into_bytes(),
        headers: normalized,
        body: body.clone(),
    })
}
