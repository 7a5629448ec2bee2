//! Whole-state snapshot persistence
//!
//! The snapshot is one JSON document, rewritten in full on every flush via
//! temp file + fsync + rename, so a crash leaves either the old or the new
//! snapshot on disk, never a torn one.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use sfs_core::{SfsError, SfsResult};

use crate::records::{StoreState, SNAPSHOT_VERSION};

/// Load a snapshot. `Ok(None)` if no snapshot exists at `path` yet.
pub fn load(path: &Path) -> SfsResult<Option<StoreState>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read(path)
        .map_err(|e| SfsError::Storage(format!("reading snapshot {}: {e}", path.display())))?;
    let state: StoreState = serde_json::from_slice(&content)
        .map_err(|e| SfsError::Storage(format!("parsing snapshot {}: {e}", path.display())))?;

    if state.version > SNAPSHOT_VERSION {
        return Err(SfsError::Storage(format!(
            "snapshot {} has version {}, this build reads up to {}",
            path.display(),
            state.version,
            SNAPSHOT_VERSION
        )));
    }

    Ok(Some(state))
}

/// Atomically replace the snapshot at `path` with `state`.
pub fn write(path: &Path, state: &StoreState, file_mode: u32) -> SfsResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            SfsError::Storage(format!("creating snapshot dir {}: {e}", parent.display()))
        })?;
    }

    let json = serde_json::to_vec_pretty(state)?;

    let tmp_path = path.with_extension("tmp");
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(file_mode);
    }
    #[cfg(not(unix))]
    let _ = file_mode;

    let mut file = options
        .open(&tmp_path)
        .map_err(|e| SfsError::Storage(format!("writing snapshot temp {}: {e}", tmp_path.display())))?;
    file.write_all(&json)
        .and_then(|_| file.sync_all())
        .map_err(|e| SfsError::Storage(format!("writing snapshot temp {}: {e}", tmp_path.display())))?;
    drop(file);

    fs::rename(&tmp_path, path)
        .map_err(|e| SfsError::Storage(format!("renaming snapshot {}: {e}", path.display())))?;
    sync_parent(path)?;

    tracing::debug!(path = %path.display(), bytes = json.len(), "snapshot flushed");
    Ok(())
}

/// Make the rename itself durable by syncing the containing directory.
#[cfg(unix)]
fn sync_parent(path: &Path) -> SfsResult<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| SfsError::Storage(format!("syncing snapshot dir {}: {e}", parent.display())))
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> SfsResult<()> {
    Ok(())
}
