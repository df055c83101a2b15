//! Byte layouts of encrypted files.
//!
//! RSA envelope layout:
//! ```text
//! ENCRYPTED_SESSION_KEY (modulus bytes) | NONCE (16) | TAG (16) | CIPHERTEXT
//! ```
//! The envelope carries no length header: the session key field is as long
//! as the modulus of the private key used to open it.

use crate::crypto::{NONCE_LEN, TAG_LEN};
use crate::error::{CryptexError, Result};

pub mod sealed;

/// The four fields of an RSA envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    encrypted_session_key: Vec<u8>,
    nonce: [u8; NONCE_LEN],
    tag: [u8; TAG_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(
        encrypted_session_key: Vec<u8>,
        nonce: [u8; NONCE_LEN],
        tag: [u8; TAG_LEN],
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            encrypted_session_key,
            nonce,
            tag,
            ciphertext,
        }
    }

    /// Smallest valid envelope for a given modulus size (empty payload).
    pub const fn min_len(modulus_bytes: usize) -> usize {
        modulus_bytes + NONCE_LEN + TAG_LEN
    }

    pub fn encrypted_session_key(&self) -> &[u8] {
        &self.encrypted_session_key
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn tag(&self) -> &[u8; TAG_LEN] {
        &self.tag
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn encoded_len(&self) -> usize {
        self.encrypted_session_key.len() + NONCE_LEN + TAG_LEN + self.ciphertext.len()
    }

    /// Concatenates the fields in their fixed order.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());

        buf.extend_from_slice(&self.encrypted_session_key);
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.tag);
        buf.extend_from_slice(&self.ciphertext);

        buf
    }

    /// Slices `data` into the four fields using the modulus size of the
    /// key that will open it.
    ///
    /// # Errors
    ///
    /// Returns [`CryptexError::MalformedContainer`] if the modulus size is
    /// zero or `data` is shorter than [`Envelope::min_len`].
    pub fn decode(data: &[u8], modulus_bytes: usize) -> Result<Self> {
        if modulus_bytes == 0 {
            return Err(CryptexError::MalformedContainer(
                "modulus size must be non-zero".into(),
            ));
        }

        let min = Self::min_len(modulus_bytes);
        if data.len() < min {
            return Err(CryptexError::MalformedContainer(format!(
                "envelope is {} bytes, expected at least {min}",
                data.len()
            )));
        }

        let (encrypted_session_key, rest) = data.split_at(modulus_bytes);
        let (nonce, rest) = rest.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| CryptexError::MalformedContainer("invalid nonce length".into()))?;
        let tag: [u8; TAG_LEN] = tag
            .try_into()
            .map_err(|_| CryptexError::MalformedContainer("invalid tag length".into()))?;

        Ok(Self {
            encrypted_session_key: encrypted_session_key.to_vec(),
            nonce,
            tag,
            ciphertext: ciphertext.to_vec(),
        })
    }
}
