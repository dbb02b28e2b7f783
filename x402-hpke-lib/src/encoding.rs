//! Base64url (unpadded) helpers shared by the key and envelope modules.
//!
//! Every binary field on the wire (`enc`, `aad`, `ct`, JWK coordinates) uses
//! base64url without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::{Result, X402Error};

/// Encode bytes as base64url without padding.
pub(crate) fn b64u(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode unpadded base64url, tolerating trailing padding characters.
pub(crate) fn b64u_decode(s: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|_| X402Error::InvalidEnvelope)
}

/// Decode a base64url field that must be exactly 32 bytes (keys, `enc`).
pub(crate) fn b64u_decode_32(s: &str) -> Result<[u8; 32]> {
    let bytes = b64u_decode(s)?;
    bytes.try_into().map_err(|_| X402Error::InvalidEnvelope)
}
