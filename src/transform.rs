//! Encrypting and decrypting files and folders on disk.
//!
//! An encrypted file is named after its source plus the `.cpx` marker
//! extension. Whole files are read into memory; there is no streaming.

use crate::crypto::{Open, Seal};
use crate::error::{CryptexError, Result};
use crate::storage;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Marker extension of encrypted files.
pub const EXTENSION: &str = "cpx";

#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    /// Delete the source file once the output has been written.
    pub remove_source: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FolderOptions {
    pub remove_source: bool,
    /// Descend into subdirectories.
    pub nested: bool,
}

impl Default for FolderOptions {
    fn default() -> Self {
        Self {
            remove_source: false,
            nested: true,
        }
    }
}

impl From<FolderOptions> for TransformOptions {
    fn from(opts: FolderOptions) -> Self {
        Self {
            remove_source: opts.remove_source,
        }
    }
}

/// Result of a single-file transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file was transformed; holds the path of the new file.
    Transformed(PathBuf),
    /// Nothing to do (already encrypted, or not encrypted); holds the input path.
    Unchanged(PathBuf),
}

impl Outcome {
    pub fn path(&self) -> &Path {
        match self {
            Outcome::Transformed(p) | Outcome::Unchanged(p) => p.as_path(),
        }
    }

    pub fn is_transformed(&self) -> bool {
        matches!(self, Outcome::Transformed(_))
    }
}

/// Returns `true` if `path` carries the encrypted-file marker extension.
pub fn has_marker(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == EXTENSION)
}

/// `report.pdf` -> `report.pdf.cpx`
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(EXTENSION);
    PathBuf::from(name)
}

/// `report.pdf.cpx` -> `report.pdf`, or `None` without the marker.
pub fn decrypted_path(path: &Path) -> Option<PathBuf> {
    has_marker(path).then(|| path.with_extension(""))
}

pub fn encrypt_file<S: Seal + ?Sized>(
    path: &Path,
    sealer: &S,
    opts: TransformOptions,
) -> Result<Outcome> {
    if has_marker(path) {
        debug!(path = %path.display(), "already encrypted");
        return Ok(Outcome::Unchanged(path.to_path_buf()));
    }

    let plaintext = Zeroizing::new(fs::read(path)?);
    let sealed = sealer.seal(&plaintext)?;

    let output = encrypted_path(path);
    storage::write(&output, &sealed)?;

    if opts.remove_source {
        fs::remove_file(path)?;
    }

    debug!(from = %path.display(), to = %output.display(), "encrypted file");
    Ok(Outcome::Transformed(output))
}

pub fn decrypt_file<O: Open + ?Sized>(
    path: &Path,
    opener: &O,
    opts: TransformOptions,
) -> Result<Outcome> {
    let Some(output) = decrypted_path(path) else {
        debug!(path = %path.display(), "not encrypted");
        return Ok(Outcome::Unchanged(path.to_path_buf()));
    };

    let container = fs::read(path)?;
    let plaintext = opener.open(&container)?;

    storage::write(&output, &plaintext)?;

    if opts.remove_source {
        fs::remove_file(path)?;
    }

    debug!(from = %path.display(), to = %output.display(), "decrypted file");
    Ok(Outcome::Transformed(output))
}

/// Decrypts a file without writing the plaintext anywhere.
///
/// Returns `None` if `path` lacks the marker extension.
pub fn decrypt_to_memory<O: Open + ?Sized>(
    path: &Path,
    opener: &O,
) -> Result<Option<Zeroizing<Vec<u8>>>> {
    if !has_marker(path) {
        return Ok(None);
    }

    let container = fs::read(path)?;
    opener.open(&container).map(Some)
}

/// Files under `dir`, including links to files, sorted.
///
/// With `nested` false only the first level is listed.
pub fn collect_files(dir: &Path, nested: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_file() {
                files.push(path);
            } else if file_type.is_dir() {
                if nested {
                    pending.push(path);
                }
            } else if file_type.is_symlink() {
                // linked files are processed, linked folders are never descended into
                match fs::metadata(&path) {
                    Ok(meta) if meta.is_dir() => {
                        debug!(path = %path.display(), "skipping linked folder")
                    }
                    // a dangling link still goes in so its failure gets reported
                    _ => files.push(path),
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

pub fn count_files(dir: &Path, nested: bool) -> Result<usize> {
    Ok(collect_files(dir, nested)?.len())
}

/// What happened to each file of a folder operation.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub transformed: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, CryptexError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.transformed.len() + self.unchanged.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, path: PathBuf, result: Result<Outcome>) {
        match result {
            Ok(Outcome::Transformed(output)) => self.transformed.push(output),
            Ok(Outcome::Unchanged(input)) => self.unchanged.push(input),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "file failed");
                self.failed.push((path, e));
            }
        }
    }
}

/// Encrypts every file of a folder.
///
/// A failing file does not stop the batch; it is recorded in
/// [`BatchReport::failed`]. Only listing the folder itself can fail.
pub fn encrypt_folder<S: Seal + ?Sized>(
    dir: &Path,
    sealer: &S,
    opts: FolderOptions,
) -> Result<BatchReport> {
    run_batch(dir, opts, |path| encrypt_file(path, sealer, opts.into()))
}

/// Decrypts every marked file of a folder; see [`encrypt_folder`] for the failure policy.
pub fn decrypt_folder<O: Open + ?Sized>(
    dir: &Path,
    opener: &O,
    opts: FolderOptions,
) -> Result<BatchReport> {
    run_batch(dir, opts, |path| decrypt_file(path, opener, opts.into()))
}

fn run_batch<F>(dir: &Path, opts: FolderOptions, mut transform: F) -> Result<BatchReport>
where
    F: FnMut(&Path) -> Result<Outcome>,
{
    // listed up front so outputs written during the batch are not revisited
    let files = collect_files(dir, opts.nested)?;
    info!(dir = %dir.display(), files = files.len(), nested = opts.nested, "starting batch");

    let mut report = BatchReport::default();
    for path in files {
        let result = transform(&path);
        report.record(path, result);
    }

    info!(
        transformed = report.transformed.len(),
        unchanged = report.unchanged.len(),
        failed = report.failed.len(),
        "batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KdfParams, Passphrase};
    use tempfile::tempdir;

    const REMOVE: TransformOptions = TransformOptions {
        remove_source: true,
    };

    const NESTED: FolderOptions = FolderOptions {
        remove_source: true,
        nested: true,
    };

    fn passphrase(secret: &str) -> Passphrase {
        Passphrase::with_kdf(
            Zeroizing::new(secret.to_string()),
            KdfParams::new(1024, 1, 1).unwrap(),
        )
    }

    #[test]
    fn marker_paths() {
        assert!(has_marker(Path::new("a/report.pdf.cpx")));
        assert!(!has_marker(Path::new("a/report.pdf")));
        assert!(!has_marker(Path::new("a/report.cpxx")));

        assert_eq!(
            encrypted_path(Path::new("a/report.pdf")),
            Path::new("a/report.pdf.cpx")
        );
        assert_eq!(
            encrypted_path(Path::new("Makefile")),
            Path::new("Makefile.cpx")
        );
        assert_eq!(
            decrypted_path(Path::new("a/report.pdf.cpx")).unwrap(),
            Path::new("a/report.pdf")
        );
        assert_eq!(
            decrypted_path(Path::new("Makefile.cpx")).unwrap(),
            Path::new("Makefile")
        );
        assert_eq!(decrypted_path(Path::new("a/report.pdf")), None);
    }

    #[test]
    fn encrypt_then_decrypt_file_roundtrip() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, b"Python test").unwrap();
        let pw = passphrase("pw");

        let encrypted = encrypt_file(&source, &pw, REMOVE).unwrap();
        assert_eq!(
            encrypted,
            Outcome::Transformed(dir.path().join("notes.txt.cpx"))
        );
        assert!(!source.exists());

        let decrypted = decrypt_file(encrypted.path(), &pw, REMOVE).unwrap();
        assert_eq!(decrypted, Outcome::Transformed(source.clone()));
        assert_eq!(fs::read(&source).unwrap(), b"Python test");
        assert!(!dir.path().join("notes.txt.cpx").exists());
    }

    #[test]
    fn keep_source_leaves_original() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, b"data").unwrap();

        encrypt_file(&source, &passphrase("pw"), TransformOptions::default()).unwrap();

        assert!(source.exists());
        assert!(dir.path().join("notes.txt.cpx").exists());
    }

    #[test]
    fn encrypting_marked_file_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt.cpx");
        fs::write(&path, b"whatever").unwrap();

        let outcome = encrypt_file(&path, &passphrase("pw"), REMOVE).unwrap();

        assert_eq!(outcome, Outcome::Unchanged(path.clone()));
        assert_eq!(fs::read(&path).unwrap(), b"whatever");
    }

    #[test]
    fn decrypting_unmarked_file_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"plain").unwrap();

        let outcome = decrypt_file(&path, &passphrase("pw"), REMOVE).unwrap();

        assert_eq!(outcome, Outcome::Unchanged(path.clone()));
        assert!(path.exists());
    }

    #[test]
    fn failed_decrypt_keeps_source_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, b"data").unwrap();
        let encrypted = encrypt_file(&source, &passphrase("right"), REMOVE).unwrap();

        let result = decrypt_file(encrypted.path(), &passphrase("wrong"), REMOVE);

        assert!(matches!(result, Err(CryptexError::Authentication)));
        assert!(encrypted.path().exists());
        assert!(!source.exists());
    }

    #[test]
    fn decrypt_to_memory_writes_no_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, b"view me").unwrap();
        let pw = passphrase("pw");
        let encrypted = encrypt_file(&source, &pw, REMOVE).unwrap();

        let plaintext = decrypt_to_memory(encrypted.path(), &pw).unwrap().unwrap();

        assert_eq!(plaintext.as_slice(), b"view me");
        assert!(!source.exists());
        assert!(
            decrypt_to_memory(&dir.path().join("other.txt"), &pw)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = encrypt_file(
            &dir.path().join("missing"),
            &passphrase("pw"),
            TransformOptions::default(),
        );
        assert!(matches!(result, Err(CryptexError::Io(_))));
    }

    fn populate(dir: &Path) {
        fs::write(dir.join("a.txt"), b"a").unwrap();
        fs::write(dir.join("b.txt"), b"b").unwrap();
        fs::create_dir_all(dir.join("sub").join("deeper")).unwrap();
        fs::write(dir.join("sub").join("c.txt"), b"c").unwrap();
        fs::write(dir.join("sub").join("deeper").join("d.txt"), b"d").unwrap();
    }

    #[test]
    fn collect_files_respects_nesting() {
        let dir = tempdir().unwrap();
        populate(dir.path());

        assert_eq!(count_files(dir.path(), true).unwrap(), 4);
        assert_eq!(
            collect_files(dir.path(), false).unwrap(),
            vec![dir.path().join("a.txt"), dir.path().join("b.txt")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn linked_files_are_listed_and_encrypted() {
        use std::os::unix::fs::symlink;

        let outside = tempdir().unwrap();
        let target = outside.path().join("target.txt");
        fs::write(&target, b"linked").unwrap();

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        symlink(&target, dir.path().join("link.txt")).unwrap();
        symlink(outside.path(), dir.path().join("linked_dir")).unwrap();
        symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        assert_eq!(
            collect_files(dir.path(), true).unwrap(),
            vec![
                dir.path().join("a.txt"),
                dir.path().join("dangling"),
                dir.path().join("link.txt"),
            ]
        );

        let pw = passphrase("pw");
        let report = encrypt_folder(dir.path(), &pw, NESTED).unwrap();

        assert_eq!(report.transformed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, dir.path().join("dangling"));

        // the link is replaced by its encrypted copy, the target is untouched
        let encrypted = dir.path().join("link.txt.cpx");
        assert_eq!(
            pw.open(&fs::read(&encrypted).unwrap()).unwrap().as_slice(),
            b"linked"
        );
        assert!(fs::symlink_metadata(dir.path().join("link.txt")).is_err());
        assert_eq!(fs::read(&target).unwrap(), b"linked");
    }

    #[test]
    fn folder_roundtrip_nested() {
        let dir = tempdir().unwrap();
        populate(dir.path());
        let pw = passphrase("pw");

        let report = encrypt_folder(dir.path(), &pw, NESTED).unwrap();
        assert_eq!(report.transformed.len(), 4);
        assert!(report.is_success());
        assert!(
            dir.path()
                .join("sub")
                .join("deeper")
                .join("d.txt.cpx")
                .exists()
        );
        assert!(!dir.path().join("a.txt").exists());

        // second pass finds nothing left to encrypt
        let again = encrypt_folder(dir.path(), &pw, NESTED).unwrap();
        assert_eq!(again.unchanged.len(), 4);
        assert!(again.transformed.is_empty());

        let report = decrypt_folder(dir.path(), &pw, NESTED).unwrap();
        assert_eq!(report.transformed.len(), 4);
        assert_eq!(fs::read(dir.path().join("sub").join("c.txt")).unwrap(), b"c");
        assert_eq!(count_files(dir.path(), true).unwrap(), 4);
    }

    #[test]
    fn folder_without_nesting_skips_subdirectories() {
        let dir = tempdir().unwrap();
        populate(dir.path());

        let opts = FolderOptions {
            remove_source: true,
            nested: false,
        };
        let report = encrypt_folder(dir.path(), &passphrase("pw"), opts).unwrap();

        assert_eq!(report.total(), 2);
        assert!(dir.path().join("sub").join("c.txt").exists());
    }

    #[test]
    fn folder_batch_continues_past_failures() {
        let dir = tempdir().unwrap();
        populate(dir.path());
        let pw = passphrase("pw");
        encrypt_folder(dir.path(), &pw, NESTED).unwrap();

        // one corrupted file in the middle of the batch
        let corrupted = dir.path().join("b.txt.cpx");
        fs::write(&corrupted, b"garbage").unwrap();

        let report = decrypt_folder(dir.path(), &pw, NESTED).unwrap();

        assert_eq!(report.transformed.len(), 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, corrupted);
        assert!(matches!(
            report.failed[0].1,
            CryptexError::MalformedContainer(_)
        ));
        assert!(!report.is_success());
        assert!(corrupted.exists());
    }

    #[test]
    fn folder_listing_failure_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(encrypt_folder(&missing, &passphrase("pw"), FolderOptions::default()).is_err());
    }
}
