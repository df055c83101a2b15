use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use super::KEY_LEN;
use crate::error::{CryptexError, Result};

/// Largest accepted memory cost, 4 GiB.
pub const MAX_MEM_COST_KIB: u32 = 4 * 1024 * 1024;
/// Largest accepted number of passes.
pub const MAX_TIME_COST: u32 = 16;
/// Largest accepted number of lanes.
pub const MAX_PARALLELISM: u32 = 16;

/// Argon2id cost parameters, stored in every passphrase-sealed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 64 * 1024, // 64 MiB
            time_cost: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(CryptexError::InvalidParameters(msg.to_string()));
        // files carry their own costs, the upper bounds cap what opening one can demand
        if !(1..=MAX_TIME_COST).contains(&self.time_cost) {
            return invalid("argon2 time cost must be between 1 and 16");
        }
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return invalid("argon2 parallelism must be between 1 and 16");
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return invalid("argon2 memory cost must be at least 8 * parallelism");
        }
        if self.mem_cost_kib > MAX_MEM_COST_KIB {
            return invalid("argon2 memory cost must be at most 4194304 KiB");
        }
        Ok(())
    }
}

/// Derive a 256-bit key from a passphrase with Argon2id.
pub fn derive_key(
    passphrase: &str,
    salt: &[u8],
    kdf: KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    kdf.validate()?;

    let params = Params::new(
        kdf.mem_cost_kib,
        kdf.time_cost,
        kdf.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| CryptexError::InvalidParameters(format!("argon2: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| CryptexError::Crypto(format!("argon2 key derivation failed: {e}")))?;

    Ok(key)
}
