use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptexError {
    /// Key bytes are not a valid encoded RSA key.
    #[error("invalid key: {0}")]
    KeyParse(String),

    /// Wrong key, wrong or missing passphrase, or tampered data.
    ///
    /// Deliberately carries no detail about which check failed.
    #[error("Invalid key or passphrase, or corrupted data")]
    Authentication,

    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("key file already exists: {}", .0.display())]
    KeysExist(PathBuf),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("cryptographic failure: {0}")]
    Crypto(String),
}

pub type Result<T> = std::result::Result<T, CryptexError>;
