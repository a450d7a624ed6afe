use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Upper bound on `-2`, `-3`, … suffixes tried when a backup name is taken.
const MAX_NAME_ATTEMPTS: usize = 100;

/// A backup written before the target was touched.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub path: PathBuf,
    /// SHA-256 of `content`, hex encoded.
    pub digest: String,
    #[serde(skip)]
    pub content: String,
}

/// Build the backup path for `target`:
/// `<dir>/<stem>-backup-<stamp>.<ext>`, or `<stem>-backup-<stamp>-<n>.<ext>`
/// for `attempt > 1`. Returns `None` when `target` has no file name.
pub fn backup_path_for(target: &Path, dir: &Path, stamp: &str, attempt: usize) -> Option<PathBuf> {
    let stem = target.file_stem()?.to_string_lossy();
    let mut name = format!("{stem}-backup-{stamp}");
    if attempt > 1 {
        name.push_str(&format!("-{attempt}"));
    }
    if let Some(ext) = target.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    Some(dir.join(name))
}

/// A backup that could not be written. `path` is the file (or directory) the
/// failing operation was aimed at.
#[derive(Debug, thiserror::Error)]
#[error("could not write backup {}", .path.display())]
pub struct BackupError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl BackupError {
    fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Write `content` to a fresh backup file next to `target` (or inside
/// `backup_dir` when given).
///
/// Backups are created with create-new semantics so an earlier backup is never
/// clobbered. The file is synced and read back before returning; any error
/// here means the target must not be touched. A backup that fails part way is
/// removed again so it cannot be mistaken for a good copy.
pub fn write_backup(
    target: &Path,
    backup_dir: Option<&Path>,
    content: &str,
    stamp: &str,
) -> Result<BackupRecord, BackupError> {
    let dir = match backup_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|err| BackupError::new(dir, err))?;
            dir.to_path_buf()
        }
        None => target
            .parent()
            .map(|parent| {
                if parent.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    parent.to_path_buf()
                }
            })
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let digest = sha256_hex(content.as_bytes());

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let candidate = backup_path_for(target, &dir, stamp, attempt).ok_or_else(|| {
            BackupError::new(
                &dir,
                io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("target has no file name: {}", target.display()),
                ),
            )
        })?;

        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                log::debug!("backup name taken, trying next: {}", candidate.display());
                continue;
            }
            Err(err) => return Err(BackupError::new(candidate, err)),
        };

        fill_candidate(file, &candidate, content.as_bytes(), &digest)
            .map_err(|err| BackupError::new(&candidate, err))?;

        return Ok(BackupRecord {
            path: candidate,
            digest,
            content: content.to_string(),
        });
    }

    Err(BackupError::new(
        dir,
        io::Error::new(
            ErrorKind::AlreadyExists,
            format!(
                "no free backup name for {} after {MAX_NAME_ATTEMPTS} attempts",
                target.display()
            ),
        ),
    ))
}

/// Write, sync and verify a freshly created backup file, deleting it on failure.
fn fill_candidate(file: File, candidate: &Path, bytes: &[u8], digest: &str) -> io::Result<()> {
    let result = write_and_verify(file, candidate, bytes, digest);
    if result.is_err() {
        if let Err(err) = fs::remove_file(candidate) {
            log::warn!(
                "failed to remove incomplete backup {}: {err}",
                candidate.display()
            );
        }
    }
    result
}

fn write_and_verify(mut file: File, candidate: &Path, bytes: &[u8], digest: &str) -> io::Result<()> {
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    verify(candidate, digest)
}

fn verify(path: &Path, expected: &str) -> io::Result<()> {
    let written = fs::read(path)?;
    let actual = sha256_hex(&written);
    if actual != expected {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("backup contents do not match the original: {}", path.display()),
        ));
    }
    Ok(())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builds_stamped_name_next_to_target() {
        let path = backup_path_for(
            Path::new("/work/src/App.jsx"),
            Path::new("/work/src"),
            "20250101-120000",
            1,
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/work/src/App-backup-20250101-120000.jsx"));
    }

    #[test]
    fn later_attempts_get_numeric_suffix() {
        let path = backup_path_for(Path::new("notes.txt"), Path::new("."), "20250101-120000", 3)
            .unwrap();
        assert_eq!(path, PathBuf::from("./notes-backup-20250101-120000-3.txt"));
    }

    #[test]
    fn target_without_extension() {
        let path =
            backup_path_for(Path::new("Makefile"), Path::new("d"), "20250101-120000", 1).unwrap();
        assert_eq!(path, PathBuf::from("d/Makefile-backup-20250101-120000"));
    }

    #[test]
    fn writes_backup_with_original_content() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("file.txt");
        fs::write(&target, "original").unwrap();

        let record = write_backup(&target, None, "original", "20250101-120000").unwrap();
        assert_eq!(record.path, dir.path().join("file-backup-20250101-120000.txt"));
        assert_eq!(fs::read_to_string(&record.path).unwrap(), "original");
        assert_eq!(record.digest, sha256_hex(b"original"));
    }

    #[test]
    fn same_stamp_does_not_clobber_earlier_backup() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("file.txt");

        let first = write_backup(&target, None, "one", "20250101-120000").unwrap();
        let second = write_backup(&target, None, "two", "20250101-120000").unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(fs::read_to_string(&first.path).unwrap(), "one");
        assert_eq!(fs::read_to_string(&second.path).unwrap(), "two");
        assert!(second
            .path
            .to_string_lossy()
            .ends_with("file-backup-20250101-120000-2.txt"));
    }

    #[test]
    fn custom_backup_dir_is_created() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("file.txt");
        let backups = dir.path().join("backups/nested");

        let record = write_backup(&target, Some(&backups), "x", "20250101-120000").unwrap();
        assert!(record.path.starts_with(&backups));
    }

    #[test]
    fn fails_when_backup_dir_cannot_exist() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("plain-file");
        fs::write(&blocker, "not a directory").unwrap();
        let target = dir.path().join("file.txt");

        let sub = blocker.join("sub");
        let err = write_backup(&target, Some(&sub), "x", "20250101-120000").unwrap_err();
        assert_eq!(err.path, sub);
    }

    #[test]
    fn mismatched_backup_is_removed() {
        let dir = tempdir().unwrap();
        let candidate = dir.path().join("file-backup-20250101-120000.txt");
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .unwrap();

        let err = fill_candidate(file, &candidate, b"tampered", &sha256_hex(b"original"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(!candidate.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn matching_backup_is_kept() {
        let dir = tempdir().unwrap();
        let candidate = dir.path().join("file-backup-20250101-120000.txt");
        let file = File::create(&candidate).unwrap();

        fill_candidate(file, &candidate, b"original", &sha256_hex(b"original")).unwrap();
        assert_eq!(fs::read_to_string(&candidate).unwrap(), "original");
    }
}
