//! All-or-nothing file writes.
//!
//! Data is written to a hidden temporary file next to the destination,
//! synced, and renamed over it. A failed write never leaves a partial
//! destination behind, and the temporary file is removed.

use crate::crypto::secure_random;
use crate::error::{CryptexError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically writes `data` to `path`, replacing any existing file.
///
/// Creates parent directories if they don't exist.
pub fn write(path: &Path, data: &[u8]) -> Result<()> {
    write_with_mode(path, data, None)
}

/// Like [`write`], but the file is readable by its owner only (`0600` on Unix).
pub fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    write_with_mode(path, data, Some(0o600))
}

fn write_with_mode(path: &Path, data: &[u8], mode: Option<u32>) -> Result<()> {
    if let Some(parent) = parent_dir(path) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = random_tmp_path(path)?;

    let result = write_tmp(&tmp_path, data, mode).and_then(|()| {
        fs::rename(&tmp_path, path)?;
        Ok(())
    });

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    // persist the rename
    if let Some(parent) = parent_dir(path) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

fn write_tmp(tmp_path: &Path, data: &[u8], mode: Option<u32>) -> Result<()> {
    let mut options = OpenOptions::new();
    // fail if exists
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Some(mode) = mode {
            options.mode(mode);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut tmp_file = options.open(tmp_path)?;
    tmp_file.write_all(data)?;
    tmp_file.sync_all()?;

    Ok(())
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Unique hidden sibling of `path`: `.name.<randomhex>.tmp`.
fn random_tmp_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| {
            CryptexError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a file path: {}", path.display()),
            ))
        })?
        .to_string_lossy();

    let mut buf = [0u8; 8];
    secure_random(&mut buf)?;
    let rand_string = buf.iter().map(|b| format!("{:02x}", b)).collect::<String>();

    Ok(path.with_file_name(format!(".{file_name}.{rand_string}.tmp")))
}
