//! Sidecar projection and verification.
//!
//! The sidecar is a public projection of a subset of AAD-bound entities,
//! emitted alongside the envelope so legacy middleware can route and
//! rate-limit without opening anything. It is derived, never stored: on the
//! open side the expected values are recomputed from the authenticated AAD
//! and compared in constant time, so a sidecar can never assert something
//! the AAD does not.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use subtle::ConstantTimeEq;

use crate::canonical::canonical_json;
use crate::transport::HeaderEntry;
use crate::{Result, X402Error};

/// Which entities to make public when sealing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicEntities {
    /// Select every header and every top-level body key.
    All,
    /// Select by name: case-insensitive for headers, exact for body keys.
    Names(Vec<String>),
}

impl PublicEntities {
    /// Parse the wire spellings `"all"` / `"*"`; anything else is a
    /// single-name selection.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("all") || s == "*" {
            Self::All
        } else {
            Self::Names(vec![s.to_string()])
        }
    }

    fn matches_header(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Names(names) => names.iter().any(|n| n.eq_ignore_ascii_case(name)),
        }
    }

    fn matches_body_key(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Names(names) => names.iter().any(|n| n == key),
        }
    }
}

/// The public projection emitted next to an envelope.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sidecar {
    /// `UPPERCASE-NAME -> canonical JSON string` for each public header.
    pub headers: BTreeMap<String, String>,
    /// Public subset of the body, verbatim.
    pub body: Option<Map<String, Value>>,
}

impl Sidecar {
    /// Whether the projection selected anything at all.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.body.as_ref().map_or(true, |b| b.is_empty())
    }
}

/// Project the public sidecar for a sealed message.
///
/// When the effective HTTP code is 402, core payment header names are
/// excluded regardless of the request. Returns `None` when nothing ends up
/// selected.
pub(crate) fn project(
    headers_normalized: &[HeaderEntry],
    body_normalized: &Map<String, Value>,
    effective_http_code: Option<u16>,
    public: &PublicEntities,
    private: &[String],
) -> Option<Sidecar> {
    let suppress_core = effective_http_code == Some(402);

    let mut headers = BTreeMap::new();
    for entry in headers_normalized {
        if entry.name.is_empty() {
            continue;
        }
        if suppress_core && entry.is_core_payment() {
            continue;
        }
        if !public.matches_header(&entry.name) {
            continue;
        }
        if private.iter().any(|p| p.eq_ignore_ascii_case(&entry.name)) {
            continue;
        }
        headers.insert(
            entry.name.to_ascii_uppercase(),
            canonical_json(&entry.value),
        );
    }

    let mut body = Map::new();
    for (key, value) in body_normalized {
        if !public.matches_body_key(key) {
            continue;
        }
        if private.iter().any(|p| p == key) {
            continue;
        }
        body.insert(key.clone(), value.clone());
    }

    let sidecar = Sidecar {
        headers,
        body: if body.is_empty() { None } else { Some(body) },
    };
    if sidecar.is_empty() {
        None
    } else {
        Some(sidecar)
    }
}

/// Verify supplied public entities against the authenticated AAD contents.
///
/// Every supplied header and body key must exist in the AAD
/// (`PUBLIC_KEY_NOT_IN_AAD`) and match the recomputed canonical JSON
/// byte-for-byte (`AAD_MISMATCH`). Comparison is constant-time.
pub(crate) fn verify(
    headers_normalized: &[HeaderEntry],
    body_normalized: &Map<String, Value>,
    public_headers: Option<&BTreeMap<String, String>>,
    public_json: Option<&BTreeMap<String, String>>,
    public_body: Option<&Map<String, Value>>,
) -> Result<()> {
    for supplied in [public_headers, public_json].into_iter().flatten() {
        for (name, value) in supplied {
            let entry = headers_normalized
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| X402Error::PublicKeyNotInAad {
                    entity: name.clone(),
                })?;
            let expected = canonical_json(&entry.value);
            if !ct_eq(expected.as_bytes(), value.trim().as_bytes()) {
                return Err(X402Error::AadMismatch {
                    entity: name.clone(),
                });
            }
        }
    }

    if let Some(body) = public_body {
        for (key, value) in body {
            let bound = body_normalized
                .get(key)
                .ok_or_else(|| X402Error::PublicKeyNotInAad {
                    entity: key.clone(),
                })?;
            let expected = canonical_json(bound);
            let supplied = canonical_json(value);
            if !ct_eq(expected.as_bytes(), supplied.as_bytes()) {
                return Err(X402Error::AadMismatch {
                    entity: key.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Constant-time byte equality that tolerates unequal lengths.
///
/// A length difference still performs one comparison over the supplied bytes
/// so the timing profile does not depend on where the inputs diverge.
fn ct_eq(expected: &[u8], supplied: &[u8]) -> bool {
    if expected.len() != supplied.len() {
        let _ = supplied.ct_eq(supplied);
        return false;
    }
    expected.ct_eq(supplied).into()
}
