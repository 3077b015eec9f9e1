//! The keystream primitive contract and the name-to-cipher registry
//! used by the CLI's `-a/--alg` flag.
//!
//! `Cipher` is the capability set every stream cipher exposes to the
//! pipeline: fixed key/nonce widths, a way to fill a buffer with
//! keystream starting at a given nonce, and a way to advance a nonce in
//! place for the single-threaded fallback. The pipeline never reaches
//! into a cipher's internals; it only ever calls through this trait.

mod aegis_cipher;
mod chacha;

pub use aegis_cipher::{Aegis128L, Aegis128X2, Aegis256};
pub use chacha::{ChaCha8, ChaCha12, ChaCha20};

use crate::error::{PipelineError, Result};

/// A stream cipher capable of filling a buffer with keystream for a given
/// `(key, nonce)` pair. Implementations must be safe to call concurrently
/// across distinct `(key, nonce)` invocations — no shared mutable state.
pub trait Cipher: Send + Sync {
    /// Width of the key this cipher expects, in bytes.
    fn key_bytes(&self) -> usize;

    /// Width of the nonce this cipher expects, in bytes.
    fn nonce_bytes(&self) -> usize;

    /// Fill `into[..len]` with keystream for `(key, nonce)`.
    ///
    /// `into.len()` must be >= `len`; `key.len()` must equal
    /// `key_bytes()`; `nonce.len()` must equal `nonce_bytes()`.
    fn stream(&self, key: &[u8], nonce: &[u8], len: usize, into: &mut [u8]);

    /// Advance `nonce` in place to the next block's nonce, carrying across
    /// the nonce's little-endian words. Used only by the single-threaded
    /// fallback, which derives nonces the same way the multi-threaded
    /// path does: as a little-endian block counter starting at word zero.
    fn nonce_increment(&self, nonce: &mut [u8]) {
        let mut carry = 1u16;
        for byte in nonce.iter_mut() {
            let sum = u16::from(*byte) + carry;
            *byte = sum as u8;
            carry = sum >> 8;
            if carry == 0 {
                break;
            }
        }
    }

    /// Pack a block index as this cipher's nonce: little-endian, padded
    /// with zero bytes out to `nonce_bytes()`.
    fn nonce_for_block(&self, block_index: u64) -> Vec<u8> {
        let mut nonce = vec![0u8; self.nonce_bytes()];
        let le = block_index.to_le_bytes();
        let n = le.len().min(nonce.len());
        nonce[..n].copy_from_slice(&le[..n]);
        nonce
    }
}

/// Look up a cipher by its case-insensitive CLI name. Unknown names are
/// `InvalidArgument`, never a panic — cipher selection happens before any
/// worker thread starts.
pub fn lookup(name: &str) -> Result<Box<dyn Cipher>> {
    let normalized = name.trim().to_ascii_uppercase();
    match normalized.as_str() {
        "AEGIS-128X2" | "AEGIS128X2" => Ok(Box::new(Aegis128X2::new())),
        "AEGIS-128L" | "AEGIS128L" => Ok(Box::new(Aegis128L::new())),
        "AEGIS-256" | "AEGIS256" => Ok(Box::new(Aegis256::new())),
        "CHACHA20" | "CHACHA-20" => Ok(Box::new(ChaCha20::new())),
        "CHACHA12" | "CHACHA-12" => Ok(Box::new(ChaCha12::new())),
        "CHACHA8" | "CHACHA-8" => Ok(Box::new(ChaCha8::new())),
        other => Err(PipelineError::invalid_argument(format!(
            "unknown cipher algorithm: {other}"
        ))),
    }
}

/// The default algorithm used when `-a/--alg` is not given.
pub const DEFAULT_ALG: &str = "AEGIS-128X2";
