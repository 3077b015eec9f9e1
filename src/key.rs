//! Key derivation and seed generation.
//!
//! The seed is the sole entropy source for a run: no salt, no iteration.
//! Reproducibility from a seed is a feature, not a weakness to patch over.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha512};

use crate::constants::AUTO_SEED_LEN;
use crate::error::{PipelineError, Result};

/// Minimum key width any registered cipher may require.
pub const MIN_KEY_BYTES: usize = 16;
/// Maximum key width any registered cipher may require.
pub const MAX_KEY_BYTES: usize = 64;

/// Derive a key from a seed string by truncating `SHA-512(seed)` to
/// `key_bytes`. `key_bytes` must be in `16..=64`.
pub fn derive_key(seed: &str, key_bytes: usize) -> Result<Vec<u8>> {
    if !(MIN_KEY_BYTES..=MAX_KEY_BYTES).contains(&key_bytes) {
        return Err(PipelineError::invalid_argument(format!(
            "key length {key_bytes} out of range {MIN_KEY_BYTES}..={MAX_KEY_BYTES}"
        )));
    }
    let digest = Sha512::digest(seed.as_bytes());
    Ok(digest[..key_bytes].to_vec())
}

/// Generate a random alphanumeric seed from the OS CSPRNG.
pub fn generate_random_seed() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_SEED_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let a = derive_key("Hello", 32).unwrap();
        let b = derive_key("Hello", 32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derive_key_truncates_sha512() {
        let full = Sha512::digest(b"Hello");
        let key = derive_key("Hello", 16).unwrap();
        assert_eq!(key.as_slice(), &full[..16]);
    }

    #[test]
    fn derive_key_rejects_out_of_range_lengths() {
        assert!(derive_key("seed", 8).is_err());
        assert!(derive_key("seed", 65).is_err());
        assert!(derive_key("seed", 16).is_ok());
        assert!(derive_key("seed", 64).is_ok());
    }

    #[test]
    fn different_seeds_yield_different_keys() {
        let a = derive_key("seed-a", 32).unwrap();
        let b = derive_key("seed-b", 32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_seed_is_sixteen_alphanumeric_chars() {
        let seed = generate_random_seed();
        assert_eq!(seed.chars().count(), AUTO_SEED_LEN);
        assert!(seed.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_seeds_are_not_all_identical() {
        let a = generate_random_seed();
        let b = generate_random_seed();
        assert_ne!(a, b, "two random seeds collided — suspicious, not impossible");
    }
}
