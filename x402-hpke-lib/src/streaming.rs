//! Streaming chunk codec: exported-key XChaCha20-Poly1305 per chunk.
//!
//! Each chunk is sealed under a 24-byte nonce built from a 16-byte
//! application-derived prefix and the little-endian sequence number. The
//! chunk functions are pure and track nothing; [`ChunkStream`] wraps them
//! with anti-abuse limits on the sealing side. Sequence numbers are not
//! embedded in the ciphertext and must be conveyed by the enclosing framing;
//! rejecting duplicates or gaps on the consuming side is the application
//! protocol's job.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use zeroize::Zeroizing;

use crate::{Result, X402Error};

/// Required nonce prefix length in bytes.
pub const NONCE_PREFIX_LEN: usize = 16;

/// XChaCha20-Poly1305 nonce length in bytes.
pub const STREAM_NONCE_LEN: usize = 24;

fn stream_nonce(prefix: &[u8], seq: u64) -> Result<[u8; STREAM_NONCE_LEN]> {
    if prefix.len() != NONCE_PREFIX_LEN {
        return Err(X402Error::StreamNoncePrefixLen {
            actual: prefix.len(),
        });
    }
    let mut nonce = [0u8; STREAM_NONCE_LEN];
    nonce[..NONCE_PREFIX_LEN].copy_from_slice(prefix);
    nonce[NONCE_PREFIX_LEN..].copy_from_slice(&seq.to_le_bytes());
    Ok(nonce)
}

/// Seal one chunk. Pure; no internal sequence tracking.
pub fn seal_chunk(
    key: &[u8; 32],
    nonce_prefix: &[u8],
    seq: u64,
    plaintext: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let nonce = stream_nonce(nonce_prefix, seq)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: aad.unwrap_or(&[]),
            },
        )
        .map_err(|_| X402Error::InvalidEnvelope)
}

/// Open one chunk. Any mismatch (wrong key, wrong seq, tampering) fails with
/// the generic authentication error.
pub fn open_chunk(
    key: &[u8; 32],
    nonce_prefix: &[u8],
    seq: u64,
    ciphertext: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let nonce = stream_nonce(nonce_prefix, seq)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: ciphertext,
                aad: aad.unwrap_or(&[]),
            },
        )
        .map_err(|_| X402Error::InvalidEnvelope)
}

/// Anti-abuse budgets for a sealing stream.
#[derive(Clone, Copy, Debug)]
pub struct StreamLimits {
    /// Maximum number of chunks sealed under one key/prefix.
    pub max_chunks: u64,
    /// Maximum total plaintext bytes sealed under one key/prefix.
    pub max_bytes: u64,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            max_chunks: 1_000_000,
            max_bytes: 1_000_000_000,
        }
    }
}

impl StreamLimits {
    /// Custom budgets.
    pub fn new(max_chunks: u64, max_bytes: u64) -> Self {
        Self {
            max_chunks,
            max_bytes,
        }
    }
}

/// Limit-enforcing wrapper over the chunk functions.
///
/// Budgets are checked before any encryption happens and counters update only
/// after a successful seal. Opens are not metered; the method exists so both
/// directions share one interface.
pub struct ChunkStream {
    key: Zeroizing<[u8; 32]>,
    nonce_prefix: [u8; NONCE_PREFIX_LEN],
    limits: StreamLimits,
    chunks_used: u64,
    bytes_used: u64,
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("key", &"<redacted>")
            .field("nonce_prefix", &self.nonce_prefix)
            .field("limits", &self.limits)
            .field("chunks_used", &self.chunks_used)
            .field("bytes_used", &self.bytes_used)
            .finish()
    }
}

impl ChunkStream {
    /// Create a stream over `key` and `nonce_prefix` with the given limits.
    ///
    /// # Errors
    ///
    /// `STREAM_NONCE_PREFIX_LEN` when the prefix is not exactly 16 bytes.
    pub fn new(key: [u8; 32], nonce_prefix: &[u8], limits: StreamLimits) -> Result<Self> {
        let prefix: [u8; NONCE_PREFIX_LEN] =
            nonce_prefix
                .try_into()
                .map_err(|_| X402Error::StreamNoncePrefixLen {
                    actual: nonce_prefix.len(),
                })?;
        Ok(Self {
            key: Zeroizing::new(key),
            nonce_prefix: prefix,
            limits,
            chunks_used: 0,
            bytes_used: 0,
        })
    }

    /// Seal a chunk, failing with `AEAD_LIMIT` before encrypting if either
    /// budget would be exceeded.
    pub fn seal(&mut self, seq: u64, plaintext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        if self.chunks_used >= self.limits.max_chunks {
            return Err(X402Error::AeadLimit);
        }
        if plaintext.len() as u64 > self.limits.max_bytes - self.bytes_used {
            return Err(X402Error::AeadLimit);
        }
        let ct = seal_chunk(&self.key, &self.nonce_prefix, seq, plaintext, aad)?;
        self.chunks_used += 1;
        self.bytes_used += plaintext.len() as u64;
        Ok(ct)
    }

    /// Open a chunk. Unmetered.
    pub fn open(&self, seq: u64, ciphertext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        open_chunk(&self.key, &self.nonce_prefix, seq, ciphertext, aad)
    }

    /// Chunks sealed so far.
    pub fn chunks_used(&self) -> u64 {
        self.chunks_used
    }

    /// Plaintext bytes sealed so far.
    pub fn bytes_used(&self) -> u64 {
        self.bytes_used
    }
}
