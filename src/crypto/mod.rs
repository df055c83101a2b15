//! Cryptographic primitives for file encryption.
//!
//! Provides the RSA envelope cipher, the passphrase cipher and the
//! authenticated symmetric layer both of them build on.

pub mod aead;
pub mod envelope;
pub mod kdf;
pub mod passphrase;

use crate::error::{CryptexError, Result};
use getrandom::fill;
use zeroize::Zeroizing;

pub use kdf::{KdfParams, derive_key};
pub use passphrase::Passphrase;

/// Length of the salt used for passphrase key derivation (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the AES-GCM nonce (16 bytes).
pub const NONCE_LEN: usize = 16;
/// Length of the AES-GCM authentication tag (16 bytes).
pub const TAG_LEN: usize = 16;
/// Length of the symmetric session key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;

/// Something that turns plaintext into a self-describing container.
pub trait Seal {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
}

/// Something that recovers plaintext from a container produced by a matching [`Seal`].
pub trait Open {
    fn open(&self, container: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Fill buffer with cryptographically secure random bytes
pub(crate) fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| CryptexError::Crypto("OS random generator unavailable".into()))
}
