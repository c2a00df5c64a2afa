//! Exclusive creation of timestamped files under client storage.

use std::path::{Path, PathBuf};

use gervis_core::types::Timestamp;
use tokio::io::AsyncWriteExt;

const MAX_NAME_ATTEMPTS: usize = 16;

/// Create an empty file under a name no other request holds.
///
/// Names are timestamped; on a collision the timestamp steps forward one
/// millisecond.
pub(crate) async fn reserve_file(
    dir: &Path,
    now: Timestamp,
    name_at: impl Fn(Timestamp) -> String,
) -> std::io::Result<(tokio::fs::File, PathBuf, String)> {
    let mut at = now;
    for _ in 0..MAX_NAME_ATTEMPTS {
        let filename = name_at(at);
        let path = dir.join(&filename);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((file, path, filename)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                at += chrono::Duration::milliseconds(1);
            }
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free filename in {}", dir.display()),
    ))
}

/// Write `bytes` to a freshly reserved file, returning its path and name.
///
/// A partially written file is removed before the error is returned.
pub(crate) async fn write_new(
    dir: &Path,
    now: Timestamp,
    name_at: impl Fn(Timestamp) -> String,
    bytes: &[u8],
) -> std::io::Result<(PathBuf, String)> {
    let (mut file, path, filename) = reserve_file(dir, now, name_at).await?;
    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;
    if let Err(e) = written {
        drop(file);
        remove_all(std::slice::from_ref(&path)).await;
        return Err(e);
    }
    Ok((path, filename))
}

pub(crate) async fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::debug!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}
