//! Passphrase-sealed file layout.
//!
//! ```text
//! MAGIC (4) | VERSION (1) | MEM_COST (4) | TIME_COST (4) | PARALLELISM (4) | SALT (16) | NONCE (16) | TAG (16) | CIPHERTEXT
//! ```
//! Integers are little-endian. Everything before NONCE is the header, which
//! is authenticated as associated data.

use crate::crypto::{KdfParams, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::{CryptexError, Result};

/// Magic bytes identifying a passphrase-sealed file ("CPXS").
pub const MAGIC: &[u8; 4] = b"CPXS";
/// Current layout version.
pub const VERSION_V1: u8 = 1;

const MAGIC_LEN: usize = 4;
const VER_LEN: usize = 1;
const MEM_LEN: usize = 4;
const TIME_LEN: usize = 4;
const PAR_LEN: usize = 4;

/// Length of the authenticated header.
pub const HEADER_LEN: usize = MAGIC_LEN + VER_LEN + MEM_LEN + TIME_LEN + PAR_LEN + SALT_LEN;
/// Smallest valid sealed file (empty payload).
pub const MIN_LEN: usize = HEADER_LEN + NONCE_LEN + TAG_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedFile {
    kdf: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    tag: [u8; TAG_LEN],
    ciphertext: Vec<u8>,
}

impl SealedFile {
    pub fn new(
        kdf: KdfParams,
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        tag: [u8; TAG_LEN],
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            kdf,
            salt,
            nonce,
            tag,
            ciphertext,
        }
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
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

    /// Header bytes for the given parameters; used as AEAD associated data.
    pub fn header(kdf: &KdfParams, salt: &[u8; SALT_LEN]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN);

        buf.extend_from_slice(MAGIC);
        buf.push(VERSION_V1);
        buf.extend_from_slice(&kdf.mem_cost_kib().to_le_bytes());
        buf.extend_from_slice(&kdf.time_cost().to_le_bytes());
        buf.extend_from_slice(&kdf.parallelism().to_le_bytes());
        buf.extend_from_slice(salt);

        buf
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Self::header(&self.kdf, &self.salt);
        buf.reserve(NONCE_LEN + TAG_LEN + self.ciphertext.len());

        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.tag);
        buf.extend_from_slice(&self.ciphertext);

        buf
    }

    /// Returns `true` if `data` starts with the sealed-file magic.
    pub fn is_sealed(data: &[u8]) -> bool {
        data.len() >= MAGIC_LEN && &data[..MAGIC_LEN] == MAGIC
    }

    /// Parses a sealed file.
    ///
    /// # Errors
    ///
    /// Returns [`CryptexError::MalformedContainer`] if the data is too short,
    /// the magic or version is wrong, or the stored KDF parameters are invalid.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_LEN {
            return Err(malformed("sealed file too short"));
        }

        if !Self::is_sealed(data) {
            return Err(malformed("not a passphrase-sealed file"));
        }

        let version = data[MAGIC_LEN];
        if version != VERSION_V1 {
            return Err(malformed(&format!("unsupported version: {version}")));
        }

        let mut offset = MAGIC_LEN + VER_LEN;

        let mem_cost = read_u32(data, &mut offset)?;
        let time_cost = read_u32(data, &mut offset)?;
        let parallelism = read_u32(data, &mut offset)?;

        let salt = read_array::<SALT_LEN>(data, &mut offset)?;
        let nonce = read_array::<NONCE_LEN>(data, &mut offset)?;
        let tag = read_array::<TAG_LEN>(data, &mut offset)?;

        let ciphertext = data[offset..].to_vec();

        let kdf = KdfParams::new(mem_cost, time_cost, parallelism)
            .map_err(|e| malformed(&e.to_string()))?;

        Ok(Self::new(kdf, salt, nonce, tag, ciphertext))
    }
}

fn malformed(msg: &str) -> CryptexError {
    CryptexError::MalformedContainer(msg.to_string())
}

fn read_array<const N: usize>(data: &[u8], offset: &mut usize) -> Result<[u8; N]> {
    let bytes: [u8; N] = data[*offset..*offset + N]
        .try_into()
        .map_err(|_| malformed("truncated field"))?;
    *offset += N;
    Ok(bytes)
}

fn read_u32(data: &[u8], offset: &mut usize) -> Result<u32> {
    read_array::<4>(data, offset).map(u32::from_le_bytes)
}
