/// Document reading with size enforcement, and write-back of repairs.
///
/// This module is the only place the `flowlint` binary touches documents on
/// disk. `flowlint-core` works on in-memory buffers.
///
/// - Size is checked via `std::fs::metadata` before any read.
/// - Decoding and normalization are left to [`flowlint_core::load_bytes`],
///   which turns bad bytes into warnings rather than failures.
/// - Write-back saves the original bytes to `<path>.bak` first, unless
///   disabled.
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use flowlint_core::{LoadError, SourceDocument, load_bytes};

use crate::error::CliError;

/// Why a document was not read.
#[derive(Debug)]
pub enum ReadFailure {
    /// The file could not be opened or read.
    Load(LoadError),
    /// The file exceeds `--max-file-size`.
    TooLarge {
        /// The file.
        path: PathBuf,
        /// Its size in bytes.
        actual: u64,
        /// The configured limit in bytes.
        limit: u64,
    },
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(e) => write!(f, "{e}"),
            Self::TooLarge {
                path,
                actual,
                limit,
            } => write!(
                f,
                "file too large: {} is {actual} bytes, limit is {limit} bytes",
                path.display()
            ),
        }
    }
}

/// Reads and normalizes the document at `path`.
///
/// # Errors
///
/// Returns [`ReadFailure`] when the file is missing, unreadable, or larger
/// than `max_size` bytes.
pub fn read_document(path: &Path, max_size: u64) -> Result<SourceDocument, ReadFailure> {
    let size = std::fs::metadata(path)
        .map_err(|e| ReadFailure::Load(LoadError::from_io(path, e)))?
        .len();
    if size > max_size {
        return Err(ReadFailure::TooLarge {
            path: path.to_path_buf(),
            actual: size,
            limit: max_size,
        });
    }
    let bytes = std::fs::read(path).map_err(|e| ReadFailure::Load(LoadError::from_io(path, e)))?;
    Ok(load_bytes(path, bytes))
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Writes `repaired` over `original`'s file, saving the original bytes to
/// [`backup_path`] first when `backup` is set.
///
/// # Errors
///
/// Returns [`CliError::WriteFailed`] if either write fails. When the backup
/// cannot be written the document is left untouched.
pub fn write_back(
    original: &SourceDocument,
    repaired: &SourceDocument,
    backup: bool,
) -> Result<(), CliError> {
    let path = original.path();
    if backup {
        let bak = backup_path(path);
        std::fs::write(&bak, original.raw_bytes()).map_err(|e| CliError::WriteFailed {
            path: bak.clone(),
            detail: e.to_string(),
        })?;
    }
    std::fs::write(path, repaired.text()).map_err(|e| CliError::WriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::wildcard_enum_match_arm)]

    use super::*;

    #[test]
    fn reads_and_normalizes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ci.yml");
        std::fs::write(&path, "on: push\r\n").expect("write");
        let doc = read_document(&path, 1024).expect("read");
        assert_eq!(doc.text(), "on: push\n");
        assert_eq!(doc.raw_bytes(), b"on: push\r\n");
    }

    #[test]
    fn oversize_files_are_not_read() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("big.yml");
        std::fs::write(&path, "a: 1\n".repeat(10)).expect("write");
        match read_document(&path, 8) {
            Err(failure @ ReadFailure::TooLarge { actual: 50, limit: 8, .. }) => {
                assert!(failure.to_string().contains("is 50 bytes, limit is 8 bytes"));
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("gone.yml");
        match read_document(&path, 1024) {
            Err(ReadFailure::Load(LoadError::NotFound { .. })) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("dir/ci.yml")),
            PathBuf::from("dir/ci.yml.bak")
        );
    }

    #[test]
    fn write_back_keeps_original_bytes_in_backup() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ci.yml");
        std::fs::write(&path, "name: X\r\n").expect("write");
        let original = read_document(&path, 1024).expect("read");
        let repaired = load_bytes(&path, "name: X\non: push\n");

        write_back(&original, &repaired, true).expect("write back");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "name: X\non: push\n"
        );
        assert_eq!(
            std::fs::read(backup_path(&path)).expect("read backup"),
            b"name: X\r\n"
        );
    }

    #[test]
    fn write_back_without_backup() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ci.yml");
        std::fs::write(&path, "a: 1\n").expect("write");
        let original = read_document(&path, 1024).expect("read");
        let repaired = load_bytes(&path, "a: 2\n");
        write_back(&original, &repaired, false).expect("write back");
        assert!(!backup_path(&path).exists());
    }
}
