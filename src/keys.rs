//! RSA key pair generation, export and import.
//!
//! Public keys are written as SPKI PEM and private keys as PKCS#8 PEM,
//! wrapped with PBES2 (scrypt + AES-256-CBC) when a passphrase is given.
//! PKCS#1 (`RSA PUBLIC KEY` / `RSA PRIVATE KEY`) input is accepted too.

use crate::error::{CryptexError, Result};
use crate::storage;
use pkcs8::der::{Document, pem};
use pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, EncryptedPrivateKeyInfo,
    LineEnding,
};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

/// Modulus size of generated keys.
pub const KEY_BITS: usize = 2048;
/// File name of the private key inside a key directory.
pub const PRIVATE_KEY_FILE: &str = "my_key";
/// File name of the public key inside a key directory.
pub const PUBLIC_KEY_FILE: &str = "my_key.pub";

const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
const RSA_PUBLIC_KEY_LABEL: &str = "RSA PUBLIC KEY";

/// PEM exports of a freshly generated key pair.
pub struct KeyPairPem {
    pub public: String,
    pub private: Zeroizing<String>,
}

/// Generates a new RSA-2048 key pair and exports both halves as PEM.
///
/// With a passphrase the private key is exported as an encrypted PKCS#8 document.
pub fn generate_keypair(passphrase: Option<&str>) -> Result<KeyPairPem> {
    let private_key = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
        .map_err(|e| CryptexError::Crypto(format!("key generation failed: {e}")))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private = match passphrase {
        Some(passphrase) => private_key
            .to_pkcs8_encrypted_pem(&mut OsRng, passphrase, LineEnding::LF)
            .map_err(|e| CryptexError::Crypto(format!("private key export failed: {e}")))?,
        None => private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptexError::Crypto(format!("private key export failed: {e}")))?,
    };

    let public = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptexError::Crypto(format!("public key export failed: {e}")))?;

    Ok(KeyPairPem { public, private })
}

/// Generates a key pair and writes it to `dir` as `my_key` and `my_key.pub`.
///
/// Returns the private and public key paths.
///
/// # Errors
///
/// Returns [`CryptexError::KeysExist`] if either file is present and
/// `overwrite` is false.
pub fn write_keypair(
    dir: &Path,
    passphrase: Option<&str>,
    overwrite: bool,
) -> Result<(PathBuf, PathBuf)> {
    let private_path = dir.join(PRIVATE_KEY_FILE);
    let public_path = dir.join(PUBLIC_KEY_FILE);

    if !overwrite {
        for path in [&private_path, &public_path] {
            if path.exists() {
                return Err(CryptexError::KeysExist(path.clone()));
            }
        }
    }

    let pair = generate_keypair(passphrase)?;

    storage::write_private(&private_path, pair.private.as_bytes())?;
    storage::write(&public_path, pair.public.as_bytes())?;

    debug!(dir = %dir.display(), protected = passphrase.is_some(), "wrote key pair");

    Ok((private_path, public_path))
}

fn pem_text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| CryptexError::KeyParse("key is not PEM text".into()))
}

fn pem_label(text: &str) -> Result<&str> {
    pem::decode_label(text.trim_start().as_bytes())
        .map_err(|_| CryptexError::KeyParse("key is not a PEM document".into()))
}

fn parse_error(e: impl std::fmt::Display) -> CryptexError {
    CryptexError::KeyParse(e.to_string())
}

/// Parses a PEM-encoded RSA public key.
pub fn load_public_key(bytes: &[u8]) -> Result<RsaPublicKey> {
    let text = pem_text(bytes)?.trim_start();

    match pem_label(text)? {
        PUBLIC_KEY_LABEL => RsaPublicKey::from_public_key_pem(text).map_err(parse_error),
        RSA_PUBLIC_KEY_LABEL => RsaPublicKey::from_pkcs1_pem(text).map_err(parse_error),
        other => Err(CryptexError::KeyParse(format!(
            "expected a public key, found '{other}'"
        ))),
    }
}

/// Parses a PEM-encoded RSA private key, unwrapping it with `passphrase`
/// when it is encrypted.
///
/// # Errors
///
/// - [`CryptexError::KeyParse`] if the bytes are not a well-formed key.
/// - [`CryptexError::Authentication`] if the key is encrypted and the
///   passphrase is wrong or absent.
pub fn load_private_key(bytes: &[u8], passphrase: Option<&str>) -> Result<RsaPrivateKey> {
    let text = pem_text(bytes)?.trim_start();

    match pem_label(text)? {
        ENCRYPTED_PRIVATE_KEY_LABEL => {
            let (_, document) = Document::from_pem(text).map_err(parse_error)?;
            let info = EncryptedPrivateKeyInfo::try_from(document.as_bytes()).map_err(parse_error)?;

            let passphrase = passphrase.ok_or(CryptexError::Authentication)?;
            let secret = info
                .decrypt(passphrase)
                .map_err(|_| CryptexError::Authentication)?;

            // a wrong passphrase can still pass the CBC padding check
            RsaPrivateKey::from_pkcs8_der(secret.as_bytes())
                .map_err(|_| CryptexError::Authentication)
        }
        PRIVATE_KEY_LABEL => RsaPrivateKey::from_pkcs8_pem(text).map_err(parse_error),
        RSA_PRIVATE_KEY_LABEL => RsaPrivateKey::from_pkcs1_pem(text).map_err(parse_error),
        other => Err(CryptexError::KeyParse(format!(
            "expected a private key, found '{other}'"
        ))),
    }
}

/// Returns `true` if the private key cannot be opened without a passphrase.
///
/// Structurally invalid keys are reported as [`CryptexError::KeyParse`],
/// never as protected.
pub fn is_passphrase_protected(bytes: &[u8]) -> Result<bool> {
    match load_private_key(bytes, Some("")) {
        Ok(_) => Ok(false),
        Err(CryptexError::Authentication) => Ok(true),
        Err(e) => Err(e),
    }
}

/// Reads a key file, keeping its contents in a wiped buffer.
pub fn read_key_bytes(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    Ok(Zeroizing::new(fs::read(path)?))
}

pub fn read_public_key(path: &Path) -> Result<RsaPublicKey> {
    let key = load_public_key(&read_key_bytes(path)?)?;
    debug!(path = %path.display(), "loaded public key");
    Ok(key)
}

pub fn read_private_key(path: &Path, passphrase: Option<&str>) -> Result<RsaPrivateKey> {
    let key = load_private_key(&read_key_bytes(path)?, passphrase)?;
    debug!(path = %path.display(), "loaded private key");
    Ok(key)
}
