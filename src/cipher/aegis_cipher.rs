//! AEGIS family backends, built on the `aegis` crate's AEAD construction.
//!
//! AEGIS is an authenticated cipher, not a bare stream cipher, so there is
//! no `apply_keystream`-style entry point. RandQuik only ever wants the
//! keystream, so each backend encrypts an all-zero plaintext of the
//! requested length under `(key, nonce)` and keeps only the ciphertext —
//! XOR-ing AEGIS keystream with zero bytes yields the keystream itself,
//! the same trick the ChaCha backends use. The authentication tag is
//! computed (AEGIS always produces one) and discarded; RandQuik never
//! authenticates anything.

use super::Cipher;

macro_rules! aegis_cipher {
    ($name:ident, $inner:path, $key_bytes:expr, $nonce_bytes:expr) => {
        /// See module docs.
        #[derive(Default)]
        pub struct $name;

        impl $name {
            /// Construct a new instance. Stateless — all state lives in
            /// the `(key, nonce)` pair passed to `stream`.
            pub fn new() -> Self {
                Self
            }
        }

        impl Cipher for $name {
            fn key_bytes(&self) -> usize {
                $key_bytes
            }

            fn nonce_bytes(&self) -> usize {
                $nonce_bytes
            }

            fn stream(&self, key: &[u8], nonce: &[u8], len: usize, into: &mut [u8]) {
                assert_eq!(key.len(), $key_bytes, "aegis key length mismatch");
                assert_eq!(nonce.len(), $nonce_bytes, "aegis nonce length mismatch");
                let zero_plaintext = vec![0u8; len];
                let (ciphertext, _tag): (Vec<u8>, [u8; 16]) =
                    <$inner>::new(key, nonce).encrypt(&zero_plaintext, b"");
                into[..len].copy_from_slice(&ciphertext[..len]);
            }
        }
    };
}

aegis_cipher!(Aegis128X2, aegis::aegis128x2::Aegis128X2, 16, 16);
aegis_cipher!(Aegis128L, aegis::aegis128l::Aegis128L, 16, 16);
aegis_cipher!(Aegis256, aegis::aegis256::Aegis256, 32, 32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aegis128x2_is_deterministic() {
        let key = [5u8; 16];
        let nonce = [9u8; 16];
        let ciph = Aegis128X2::new();
        let mut a = [0u8; 256];
        let mut b = [0u8; 256];
        ciph.stream(&key, &nonce, 256, &mut a);
        ciph.stream(&key, &nonce, 256, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn aegis128x2_differs_from_aegis256() {
        let key16 = [1u8; 16];
        let nonce16 = [2u8; 16];
        let key32 = [1u8; 32];
        let nonce32 = [2u8; 32];
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        Aegis128X2::new().stream(&key16, &nonce16, 64, &mut a);
        Aegis256::new().stream(&key32, &nonce32, 64, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn aegis128x2_keystream_is_not_all_zero() {
        let key = [0u8; 16];
        let nonce = [0u8; 16];
        let mut out = [0u8; 64];
        Aegis128X2::new().stream(&key, &nonce, 64, &mut out);
        assert!(out.iter().any(|&b| b != 0));
    }
}
