//! Filesystem helpers for the disk cache.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::warn;

use crate::error::{ClientError, ClientResult};

pub(crate) fn default_cache_dir_impl() -> ClientResult<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| ClientError::Cache {
            message: "could not determine cache directory".to_string(),
        })?;

    Ok(base.join("codesearch").join("responses"))
}

/// Write `content` to `path` via a temp file in the same directory and a rename.
///
/// The temp name carries a UUID so concurrent writers never share one.
pub(crate) async fn write_atomic_impl(path: &Path, content: &[u8]) -> ClientResult<()> {
    let dir = path.parent().ok_or_else(|| ClientError::Cache {
        message: format!("cache path has no parent: {}", path.display()),
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    fs::create_dir_all(dir)
        .await
        .map_err(|e| ClientError::cache("failed to create cache directory", e))?;

    let temp_path = dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    fs::write(&temp_path, content)
        .await
        .map_err(|e| ClientError::cache("failed to write temp file", e))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        if let Err(cleanup) = fs::remove_file(&temp_path).await {
            warn!(path = %temp_path.display(), error = %cleanup, "failed to remove temp file");
        }
        return Err(ClientError::cache("failed to rename temp file", e));
    }

    Ok(())
}

/// Read a file, mapping "not found" to `None`.
pub(crate) async fn read_optional(path: &Path) -> ClientResult<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ClientError::cache(
            &format!("failed to read {}", path.display()),
            e,
        )),
    }
}

/// Remove a file; a file that is already gone is fine.
pub(crate) async fn remove_if_exists(path: &Path) -> ClientResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ClientError::cache(
            &format!("failed to remove {}", path.display()),
            e,
        )),
    }
}

/// Size and modification time, or `None` if the file vanished.
pub(crate) async fn stat(path: &Path) -> ClientResult<Option<(u64, DateTime<Utc>)>> {
    match fs::metadata(path).await {
        Ok(meta) => {
            let modified = meta
                .modified()
                .map_err(|e| ClientError::cache("file modification time unavailable", e))?;
            Ok(Some((meta.len(), DateTime::<Utc>::from(modified))))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ClientError::cache(
            &format!("failed to stat {}", path.display()),
            e,
        )),
    }
}

/// File names in `dir`; a missing directory lists as empty.
pub(crate) async fn list_file_names(dir: &Path) -> ClientResult<Vec<String>> {
    let mut names = Vec::new();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(ClientError::cache("failed to read cache directory", e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ClientError::cache("failed to read directory entry", e))?
    {
        names.push(entry.file_name().to_string_lossy().to_string());
    }

    names.sort();
    Ok(names)
}
