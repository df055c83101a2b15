//! Passphrase-only encryption, no key pair involved.
//!
//! Each seal derives a fresh key from the passphrase and a random salt, so
//! two files sealed with the same passphrase never share a key.

use super::{KdfParams, Open, SALT_LEN, Seal, aead, derive_key, secure_random};
use crate::error::Result;
use crate::format::sealed::SealedFile;
use zeroize::Zeroizing;

pub struct Passphrase {
    secret: Zeroizing<String>,
    kdf: KdfParams,
}

impl Passphrase {
    pub fn new(secret: Zeroizing<String>) -> Self {
        Self::with_kdf(secret, KdfParams::default())
    }

    /// `kdf` only applies when sealing; opening uses the parameters stored in the file.
    pub fn with_kdf(secret: Zeroizing<String>, kdf: KdfParams) -> Self {
        Self { secret, kdf }
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }
}

impl Seal for Passphrase {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        secure_random(&mut salt)?;

        let key = derive_key(&self.secret, &salt, self.kdf)?;
        let header = SealedFile::header(&self.kdf, &salt);
        let sealed = aead::encrypt(&key, plaintext, &header)?;

        Ok(SealedFile::new(self.kdf, salt, sealed.nonce, sealed.tag, sealed.ciphertext).to_bytes())
    }
}

impl Open for Passphrase {
    fn open(&self, container: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let file = SealedFile::from_bytes(container)?;

        let key = derive_key(&self.secret, file.salt(), *file.kdf())?;
        let header = SealedFile::header(file.kdf(), file.salt());

        aead::decrypt(&key, file.nonce(), file.tag(), file.ciphertext(), &header)
    }
}
