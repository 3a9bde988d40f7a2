//! JSON document persistence
//!
//! Handles saving and loading area documents to/from the flash filesystem.
//! Uses atomic write-replace (write to temp file, delete the old file, then
//! rename) so a canonical file is never left partially written.
//!
//! Files, relative to the configuration directory:
//! - `<area>.json` - the last successful save
//! - `<area>.json.tmp` - transient write target
//! - `<area>.json.corrupt` - copy of a file that failed to parse

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};

/// What boot recovery did with a leftover temp file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempRecovery {
    /// No temp file was present
    Clean,
    /// The canonical file was missing and the temp file was complete; it
    /// now is the canonical file
    Promoted,
    /// The temp file was stale or incomplete and has been removed
    Discarded,
}

/// Path of the transient write target for `path`
pub fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

/// Path a corrupt canonical file is copied to before it is overwritten
pub fn corrupt_backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".corrupt")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Load a document from disk
///
/// Returns `None` if the file doesn't exist.
/// Returns an error if the file exists but can't be read or parsed.
pub fn load_document(path: &Path) -> StorageResult<Option<Value>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StorageError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let value = serde_json::from_slice(&bytes).map_err(|e| StorageError::InvalidFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    Ok(Some(value))
}

/// Serialize `document` and write it to `path` with write-replace semantics
///
/// A serialization failure returns before any file is touched.
pub fn save_document(path: &Path, area: &str, document: &Value) -> StorageResult<()> {
    let bytes = serde_json::to_vec(document).map_err(|e| StorageError::Serialize {
        area: area.to_string(),
        source: e,
    })?;

    atomic_write(path, &bytes)
}

/// Write data to a file atomically
///
/// 1. Write to `<path>.tmp` in the same directory
/// 2. Sync the file to disk and close it
/// 3. Delete the previous file at `path`
/// 4. Rename the temp file to `path`
///
/// A failure before step 3 leaves the previous file untouched. If the
/// rename fails the temp file is removed.
pub fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let tmp = temp_path(path);

    {
        let mut file =
            File::create(&tmp).map_err(|e| StorageError::from_io(e, tmp.clone()))?;
        let written = file.write_all(data).and_then(|_| file.flush()).and_then(|_| file.sync_all());
        if let Err(e) = written {
            drop(file);
            discard_temp(&tmp);
            return Err(StorageError::from_io(e, tmp));
        }
    }

    // The flash filesystem cannot rename over an existing file
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove {:?} before rename: {}", path, e);
        }
    }

    if let Err(e) = fs::rename(&tmp, path) {
        discard_temp(&tmp);
        return Err(StorageError::AtomicWriteFailed {
            from: tmp,
            to: path.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}

/// Settle a temp file left behind by an interrupted save
///
/// When the canonical file is gone (power lost between delete and rename)
/// and the temp file holds a complete document, the temp file is promoted.
/// Any other leftover temp file is removed.
pub fn recover_temp(path: &Path) -> StorageResult<TempRecovery> {
    let tmp = temp_path(path);
    if !tmp.exists() {
        return Ok(TempRecovery::Clean);
    }

    if !path.exists() && load_document(&tmp).is_ok() {
        fs::rename(&tmp, path).map_err(|e| StorageError::AtomicWriteFailed {
            from: tmp.clone(),
            to: path.to_path_buf(),
            source: e,
        })?;
        debug!("Promoted {:?} to {:?}", tmp, path);
        return Ok(TempRecovery::Promoted);
    }

    fs::remove_file(&tmp).map_err(|e| StorageError::from_io(e, tmp.clone()))?;
    debug!("Removed stale {:?}", tmp);
    Ok(TempRecovery::Discarded)
}

/// Copy a corrupt file aside so it can be inspected later
pub fn backup_corrupt(path: &Path) -> StorageResult<PathBuf> {
    let backup = corrupt_backup_path(path);
    fs::copy(path, &backup).map_err(|e| StorageError::from_io(e, backup.clone()))?;
    Ok(backup)
}

fn discard_temp(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove orphaned {:?}: {}", tmp, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("general.json");

        assert!(load_document(&path).unwrap().is_none());

        let doc = json!({"pin": 1234, "ui": ["dmm"]});
        save_document(&path, "general", &doc).unwrap();

        assert_eq!(load_document(&path).unwrap().unwrap(), doc);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_save_replaces_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dmm.json");

        save_document(&path, "dmm", &json!({"channels": [1, 2, 3]})).unwrap();
        save_document(&path, "dmm", &json!({"channels": []})).unwrap();

        assert_eq!(load_document(&path).unwrap().unwrap(), json!({"channels": []}));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("configuration")
            .join("io.json");

        atomic_write(&nested_path, b"{}").unwrap();

        assert!(nested_path.exists());
        assert_eq!(fs::read_to_string(&nested_path).unwrap(), "{}");
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        let path = Path::new("/configuration/network.json");
        assert_eq!(temp_path(path), PathBuf::from("/configuration/network.json.tmp"));
        assert_eq!(
            corrupt_backup_path(path),
            PathBuf::from("/configuration/network.json.corrupt")
        );
    }

    #[test]
    fn test_load_rejects_truncated_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("io.json");
        fs::write(&path, br#"{"devices": [{"id": "IO_A"#).unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat { .. }));
    }

    #[test]
    fn test_open_failure_leaves_canonical_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scope.json");
        save_document(&path, "scope", &json!({"v": 1})).unwrap();

        // A directory squatting on the temp path makes the open fail
        fs::create_dir(temp_path(&path)).unwrap();

        assert!(save_document(&path, "scope", &json!({"v": 2})).is_err());
        assert_eq!(load_document(&path).unwrap().unwrap(), json!({"v": 1}));
    }

    #[test]
    fn test_rename_failure_cleans_up_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("math.json");

        // A non-empty directory at the canonical path cannot be removed by
        // remove_file nor replaced by rename
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let err = save_document(&path, "math", &json!({})).unwrap_err();
        assert!(matches!(err, StorageError::AtomicWriteFailed { .. }));
        assert!(!temp_path(&path).exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_crash_before_rename_keeps_previous_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("network.json");
        save_document(&path, "network", &json!({"mode": "ap"})).unwrap();

        // Interrupted save: half-written temp, canonical still present
        fs::write(temp_path(&path), br#"{"mode": "st"#).unwrap();

        assert_eq!(recover_temp(&path).unwrap(), TempRecovery::Discarded);
        assert!(!temp_path(&path).exists());
        assert_eq!(load_document(&path).unwrap().unwrap(), json!({"mode": "ap"}));
    }

    #[test]
    fn test_crash_between_delete_and_rename_promotes_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("network.json");

        // Interrupted save: canonical already deleted, temp complete
        fs::write(temp_path(&path), br#"{"mode": "sta"}"#).unwrap();

        assert_eq!(recover_temp(&path).unwrap(), TempRecovery::Promoted);
        assert_eq!(load_document(&path).unwrap().unwrap(), json!({"mode": "sta"}));
    }

    #[test]
    fn test_recover_without_temp_is_clean() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("general.json");
        assert_eq!(recover_temp(&path).unwrap(), TempRecovery::Clean);
    }

    #[test]
    fn test_backup_corrupt_copies_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dmm.json");
        fs::write(&path, b"not json").unwrap();

        let backup = backup_corrupt(&path).unwrap();
        assert_eq!(backup, corrupt_backup_path(&path));
        assert_eq!(fs::read(&backup).unwrap(), b"not json");
        assert!(path.exists());
    }
}
