//! Request-scoped files that must not outlive the request that created them.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Owns a file on disk and removes it when dropped, on success, error and
/// cancellation paths alike.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
}

impl TransientFile {
    /// Write `bytes` to `path`, returning only once the data is flushed and synced.
    pub async fn write(path: PathBuf, bytes: &[u8]) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&path).await?;
        let staged = Self { path };
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        remove_quietly(&self.path);
    }
}

/// Best-effort removal. Failures are reported as diagnostics, never returned.
pub(crate) fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed transient file"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove transient file"),
    }
}

/// Remove every entry below `dir`, keeping the directory itself. Returns how many
/// entries were removed; individual failures are logged and skipped.
pub(crate) async fn empty_directory(dir: &Path) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let result = match entry.file_type().await {
            Ok(kind) if kind.is_dir() => tokio::fs::remove_dir_all(&path).await,
            Ok(_) => tokio::fs::remove_file(&path).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => removed += 1,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to clear upload entry")
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_is_removed_when_guard_drops() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("artifact.pdf");

        let staged = TransientFile::write(path.clone(), b"%PDF-1.3")
            .await
            .expect("write succeeds");
        assert_eq!(std::fs::read(staged.path()).expect("readable"), b"%PDF-1.3");

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn already_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gone.csv");
        let staged = TransientFile::write(path.clone(), b"a,b\n").await.expect("write");
        std::fs::remove_file(&path).expect("manual removal");
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn empty_directory_keeps_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.csv"), "x").expect("write");
        std::fs::create_dir(dir.path().join("stale")).expect("mkdir");
        std::fs::write(dir.path().join("stale").join("b.xlsx"), "y").expect("write");

        let removed = empty_directory(dir.path()).await.expect("cleared");
        assert_eq!(removed, 2);
        assert!(dir.path().exists());
        assert_eq!(std::fs::read_dir(dir.path()).expect("readable").count(), 0);

        let missing = dir.path().join("missing");
        assert_eq!(empty_directory(&missing).await.expect("missing ok"), 0);
    }
}
