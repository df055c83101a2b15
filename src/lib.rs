//! Hybrid RSA + AES-GCM envelope encryption for files and folders.
//!
//! A fresh AES-256 session key protects each file's contents and is itself
//! wrapped with RSA-OAEP for the recipient. See [`format`] for the byte layout.

pub mod config;
pub mod crypto;
mod error;
pub mod format;
pub mod keys;
pub mod pager;
mod storage;
pub mod transform;

pub use crate::config::{Home, Settings, default_home};
pub use crate::crypto::{KdfParams, Open, Passphrase, Seal};
pub use crate::error::{CryptexError, Result};
pub use crate::format::Envelope;
pub use crate::transform::{BatchReport, FolderOptions, Outcome, TransformOptions};
pub use rsa::{RsaPrivateKey, RsaPublicKey};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn generated_keys_encrypt_and_decrypt_a_file() {
        let dir = tempdir().unwrap();
        let home = Home::new(dir.path().join("home"));
        let (private_path, public_path) = keys::write_keypair(home.dir(), None, false).unwrap();

        let source = dir.path().join("hello.txt");
        fs::write(&source, b"Python test").unwrap();

        let public = keys::read_public_key(&public_path).unwrap();
        let encrypted =
            transform::encrypt_file(&source, &public, TransformOptions { remove_source: true })
                .unwrap();
        assert!(!source.exists());
        assert_eq!(
            fs::metadata(encrypted.path()).unwrap().len(),
            (Envelope::min_len(256) + b"Python test".len()) as u64
        );

        let private = keys::read_private_key(&private_path, None).unwrap();
        let decrypted =
            transform::decrypt_file(encrypted.path(), &private, TransformOptions::default())
                .unwrap();
        assert_eq!(decrypted.path(), source.as_path());
        assert_eq!(fs::read(&source).unwrap(), b"Python test");
        assert!(encrypted.path().exists());
    }

    #[test]
    fn protected_keys_roundtrip_through_files() {
        let dir = tempdir().unwrap();
        let (private_path, public_path) =
            keys::write_keypair(dir.path(), Some("hunter2"), false).unwrap();

        let key_bytes = keys::read_key_bytes(&private_path).unwrap();
        assert!(keys::is_passphrase_protected(&key_bytes).unwrap());

        let public = keys::read_public_key(&public_path).unwrap();
        let envelope = public.seal(b"").unwrap();

        let private = keys::read_private_key(&private_path, Some("hunter2")).unwrap();
        assert!(private.open(&envelope).unwrap().is_empty());

        assert!(matches!(
            keys::read_private_key(&private_path, Some("wrong")),
            Err(CryptexError::Authentication)
        ));
    }
}
