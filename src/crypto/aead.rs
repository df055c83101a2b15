//! AES-256-GCM with a 128-bit nonce and a detached tag.
//!
//! The ciphertext is exactly as long as the plaintext; nonce and tag travel
//! as separate fixed-size fields of the surrounding container.

use super::{KEY_LEN, NONCE_LEN, TAG_LEN, secure_random};
use crate::error::{CryptexError, Result};
use aes_gcm::{
    AesGcm, Key,
    aead::{AeadInPlace, KeyInit, consts::U16, generic_array::GenericArray},
    aes::Aes256,
};
use zeroize::Zeroizing;

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Output of a single authenticated encryption.
pub struct Sealed {
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

/// Encrypt plaintext under a fresh random nonce
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key));

    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&nonce), aad, &mut ciphertext)
        .map_err(|_| CryptexError::Crypto("encryption failed".into()))?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(Sealed {
        nonce,
        tag: tag_bytes,
        ciphertext,
    })
}

/// Decrypt ciphertext, releasing nothing unless the tag verifies
pub fn decrypt(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    tag: &[u8; TAG_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key));

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            aad,
            buffer.as_mut_slice(),
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptexError::Authentication)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ciphertext_has_plaintext_length() {
        let key = [7u8; KEY_LEN];
        let sealed = encrypt(&key, b"twelve bytes", b"").unwrap();
        assert_eq!(sealed.ciphertext.len(), 12);
        assert_ne!(sealed.ciphertext, b"twelve bytes");
    }

    #[test]
    fn decrypt_recovers_plaintext() {
        let key = [7u8; KEY_LEN];
        let sealed = encrypt(&key, b"secret data", b"hdr").unwrap();
        let plaintext =
            decrypt(&key, &sealed.nonce, &sealed.tag, &sealed.ciphertext, b"hdr").unwrap();
        assert_eq!(plaintext.as_slice(), b"secret data");
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = encrypt(&[1u8; KEY_LEN], b"secret data", b"").unwrap();
        let result = decrypt(&[2u8; KEY_LEN], &sealed.nonce, &sealed.tag, &sealed.ciphertext, b"");
        assert!(matches!(result, Err(CryptexError::Authentication)));
    }

    #[test]
    fn changed_associated_data_fails() {
        let key = [3u8; KEY_LEN];
        let sealed = encrypt(&key, b"secret data", b"v1").unwrap();
        let result = decrypt(&key, &sealed.nonce, &sealed.tag, &sealed.ciphertext, b"v2");
        assert!(matches!(result, Err(CryptexError::Authentication)));
    }

    #[test]
    fn nonces_differ_between_calls() {
        let key = [9u8; KEY_LEN];
        let a = encrypt(&key, b"x", b"").unwrap();
        let b = encrypt(&key, b"x", b"").unwrap();
        assert_ne!(a.nonce, b.nonce);
    }
}
