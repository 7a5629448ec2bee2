//! Sealed blobs: XChaCha20-Poly1305 with a random nonce per call
//!
//! Blob format:
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! ```

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use sfs_core::{SfsError, SfsResult};

use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// Encrypt and authenticate `plaintext` under `key`, binding `aad`.
///
/// Returns: `[24-byte nonce][ciphertext][16-byte tag]`
pub fn seal(key: &[u8; KEY_SIZE], aad: &[u8], plaintext: &[u8]) -> SfsResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| SfsError::Crypto(format!("sealing failed: {e}")))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Verify and decrypt a blob produced by [`seal`] with the same key and `aad`.
///
/// Any failure (short blob, wrong key, wrong `aad`, tampering) is an
/// `Integrity` error and yields no plaintext.
pub fn open(key: &[u8; KEY_SIZE], aad: &[u8], blob: &[u8]) -> SfsResult<Vec<u8>> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(SfsError::Integrity(format!(
            "sealed blob too short: {} bytes (minimum {})",
            blob.len(),
            NONCE_SIZE + TAG_SIZE
        )));
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(key.into());

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| SfsError::Integrity("authentication tag mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = [9u8; KEY_SIZE];

    #[test]
    fn test_seal_open() {
        let blob = seal(&KEY, b"aad", b"hello, sealed world!").unwrap();
        assert_eq!(open(&KEY, b"aad", &blob).unwrap(), b"hello, sealed world!");
    }

    #[test]
    fn test_nonce_fresh_per_call() {
        let a = seal(&KEY, b"", b"same").unwrap();
        let b = seal(&KEY, b"", b"same").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sealed_size() {
        let blob = seal(&KEY, b"", &[0u8; 1000]).unwrap();
        assert_eq!(blob.len(), NONCE_SIZE + 1000 + TAG_SIZE);
    }

    #[test]
    fn test_open_wrong_key() {
        let blob = seal(&KEY, b"", b"secret").unwrap();
        let err = open(&[1u8; KEY_SIZE], b"", &blob).unwrap_err();
        assert!(matches!(err, SfsError::Integrity(_)));
    }

    #[test]
    fn test_open_wrong_aad() {
        let blob = seal(&KEY, b"one", b"secret").unwrap();
        assert!(open(&KEY, b"two", &blob).is_err());
    }

    #[test]
    fn test_open_short_blob() {
        assert!(matches!(
            open(&KEY, b"", &[0u8; NONCE_SIZE - 1]),
            Err(SfsError::Integrity(_))
        ));
        assert!(matches!(
            open(&KEY, b"", &[0u8; NONCE_SIZE + TAG_SIZE - 1]),
            Err(SfsError::Integrity(_))
        ));
    }

    #[test]
    fn test_tampered_blob() {
        let mut blob = seal(&KEY, b"", b"secret data").unwrap();
        blob[NONCE_SIZE + 1] ^= 0x01;
        assert!(open(&KEY, b"", &blob).is_err(), "tampered ciphertext must fail");
    }
}

#[cfg(test)]
mod proptest_suite {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn roundtrip_any_plaintext(data in prop::collection::vec(any::<u8>(), 0..4096), aad in prop::collection::vec(any::<u8>(), 0..64)) {
            let key = [5u8; KEY_SIZE];
            let blob = seal(&key, &aad, &data).unwrap();
            prop_assert_eq!(open(&key, &aad, &blob).unwrap(), data);
        }

        #[test]
        fn any_single_bit_flip_rejected(data in prop::collection::vec(any::<u8>(), 0..256), pos in any::<prop::sample::Index>(), bit in 0u8..8) {
            let key = [5u8; KEY_SIZE];
            let mut blob = seal(&key, b"", &data).unwrap();
            let i = pos.index(blob.len());
            blob[i] ^= 1 << bit;
            prop_assert!(matches!(open(&key, b"", &blob), Err(SfsError::Integrity(_))));
        }
    }
}
