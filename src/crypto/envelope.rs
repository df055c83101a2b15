//! RSA envelope encryption.
//!
//! Every call draws a fresh 256-bit session key and a fresh nonce. The
//! session key is wrapped with RSA-OAEP (SHA-256) for the recipient and
//! the payload is sealed with AES-256-GCM under it.

use super::{KEY_LEN, Open, Seal, aead, secure_random};
use crate::error::{CryptexError, Result};
use crate::format::Envelope;
use rand::rngs::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey, traits::PublicKeyParts};
use sha2::Sha256;
use tracing::trace;
use zeroize::Zeroizing;

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Encrypt `plaintext` for the holder of the private half of `recipient`.
pub fn encrypt(plaintext: &[u8], recipient: &RsaPublicKey) -> Result<Envelope> {
    let mut session_key = Zeroizing::new([0u8; KEY_LEN]);
    secure_random(session_key.as_mut_slice())?;

    let encrypted_session_key = recipient
        .encrypt(&mut OsRng, oaep(), session_key.as_slice())
        .map_err(|e| CryptexError::Crypto(format!("session key wrapping failed: {e}")))?;

    let sealed = aead::encrypt(&session_key, plaintext, &[])?;

    trace!(
        modulus_bytes = recipient.size(),
        payload = plaintext.len(),
        "sealed envelope"
    );

    Ok(Envelope::new(
        encrypted_session_key,
        sealed.nonce,
        sealed.tag,
        sealed.ciphertext,
    ))
}

/// Decrypt an encoded envelope with the recipient's private key.
///
/// # Errors
///
/// - [`CryptexError::MalformedContainer`] if `data` is shorter than the
///   smallest envelope for this key size.
/// - [`CryptexError::Authentication`] if the session key cannot be unwrapped
///   or the tag does not verify. No plaintext is released in that case.
pub fn decrypt(data: &[u8], key: &RsaPrivateKey) -> Result<Zeroizing<Vec<u8>>> {
    let envelope = Envelope::decode(data, key.size())?;

    let session_key = Zeroizing::new(
        key.decrypt_blinded(&mut OsRng, oaep(), envelope.encrypted_session_key())
            .map_err(|_| CryptexError::Authentication)?,
    );

    let session_key: &[u8; KEY_LEN] = session_key
        .as_slice()
        .try_into()
        .map_err(|_| CryptexError::Authentication)?;

    aead::decrypt(
        session_key,
        envelope.nonce(),
        envelope.tag(),
        envelope.ciphertext(),
        &[],
    )
}

impl Seal for RsaPublicKey {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(encrypt(plaintext, self)?.encode())
    }
}

impl Open for RsaPrivateKey {
    fn open(&self, container: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        decrypt(container, self)
    }
}
