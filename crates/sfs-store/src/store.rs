//! The store monitor: one reader/writer lock, one flush per mutation

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use sfs_core::{FileId, SfsError, SfsResult};

use crate::records::StoreState;
use crate::snapshot;

/// Default permission bits for the snapshot file.
pub const DEFAULT_FILE_MODE: u32 = 0o600;

/// Shared, durable state.
///
/// All access goes through [`Store::read`] (shared lock) or [`Store::mutate`]
/// (exclusive lock + flush). Share one `Store` across sessions with `Arc`.
pub struct Store {
    path: PathBuf,
    file_mode: u32,
    state: RwLock<StoreState>,
}

/// Redacted overview of a store: no secrets, keys, salts, or blobs.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub path: PathBuf,
    pub accounts: Vec<String>,
    pub files: Vec<FileSummary>,
    pub chunk_count: usize,
    pub chunk_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub id: FileId,
    pub chunks: usize,
}

impl Store {
    /// Open the store at `path`, creating it if absent.
    pub fn open(path: &Path) -> SfsResult<Self> {
        Self::open_with_mode(path, DEFAULT_FILE_MODE)
    }

    /// Open the store at `path`, flushing with the given permission bits.
    ///
    /// A new store gets a fresh signing secret and is flushed at once, so the
    /// secret is durable before any share token can be issued against it.
    pub fn open_with_mode(path: &Path, file_mode: u32) -> SfsResult<Self> {
        let state = match snapshot::load(path)? {
            Some(state) => {
                tracing::info!(
                    path = %path.display(),
                    accounts = state.accounts.len(),
                    files = state.files.len(),
                    chunks = state.chunks.len(),
                    "store loaded"
                );
                state
            }
            None => {
                let state = StoreState::fresh();
                snapshot::write(path, &state, file_mode)?;
                tracing::info!(path = %path.display(), "store created");
                state
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            file_mode,
            state: RwLock::new(state),
        })
    }

    /// Run `f` with shared access to the state.
    pub fn read<T>(&self, f: impl FnOnce(&StoreState) -> SfsResult<T>) -> SfsResult<T> {
        let guard = self.read_guard()?;
        f(&guard)
    }

    /// Run `f` with exclusive access, then flush the whole state.
    ///
    /// If `f` fails nothing is flushed, and `f` must leave the state as it
    /// found it. If the flush fails the in-memory change stays and the error
    /// is returned; the next successful flush brings the disk back in line.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut StoreState) -> SfsResult<T>) -> SfsResult<T> {
        let mut guard = self.write_guard()?;
        let out = f(&mut guard)?;
        snapshot::write(&self.path, &guard, self.file_mode)?;
        Ok(out)
    }

    /// Redacted overview, taken under the shared lock.
    pub fn summary(&self) -> SfsResult<StoreSummary> {
        self.read(|state| {
            Ok(StoreSummary {
                path: self.path.clone(),
                accounts: state.accounts.keys().cloned().collect(),
                files: state
                    .files
                    .iter()
                    .map(|(id, record)| FileSummary {
                        id: *id,
                        chunks: record.chunks.len(),
                    })
                    .collect(),
                chunk_count: state.chunks.len(),
                chunk_bytes: state.chunks.values().map(|b| b.len()).sum(),
            })
        })
    }

    fn read_guard(&self) -> SfsResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| SfsError::Storage("store lock poisoned".into()))
    }

    fn write_guard(&self) -> SfsResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| SfsError::Storage("store lock poisoned".into()))
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Blob, FileRecord};
    use sfs_core::ChunkId;
    use sfs_crypto::FileKey;
    use std::sync::Arc;

    fn insert_file(state: &mut StoreState) -> FileId {
        let id = FileId::new();
        let chunk = ChunkId::new();
        state.chunks.insert(chunk, Blob(vec![0xEE; 8]));
        state.files.insert(
            id,
            FileRecord {
                owner: "alice".into(),
                key: FileKey::from_bytes([1u8; 32]),
                salt: [0u8; 16],
                chunks: vec![chunk],
            },
        );
        id
    }

    #[test]
    fn test_new_store_flushed_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = Store::open(&path).unwrap();
        assert!(path.exists());

        let secret = store.read(|s| Ok(*s.signing_secret().as_bytes())).unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        let again = reopened.read(|s| Ok(*s.signing_secret().as_bytes())).unwrap();
        assert_eq!(secret, again, "signing secret must survive reopen");
    }

    #[test]
    fn test_mutation_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = Store::open(&path).unwrap();
        let id = store.mutate(|s| Ok(insert_file(s))).unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        reopened
            .read(|s| {
                let file = s.file(&id).expect("file survives reopen");
                assert_eq!(s.chunk(&file.chunks[0]).unwrap().as_bytes(), &[0xEE; 8]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_failed_mutation_not_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = Store::open(&path).unwrap();
        let before = std::fs::read(&path).unwrap();

        let result: SfsResult<()> = store.mutate(|_| Err(SfsError::NotFound("x".into())));
        assert!(matches!(result, Err(SfsError::NotFound(_))));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_flush_failure_surfaces_as_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = Store::open(&path).unwrap();

        // Replace the snapshot's directory with a file so the flush cannot land.
        std::fs::remove_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path(), b"blocker").unwrap();

        let result = store.mutate(|s| Ok(insert_file(s)));
        assert!(matches!(result, Err(SfsError::Storage(_))));
        // In-memory change is not rolled back
        assert_eq!(store.read(|s| Ok(s.files.len())).unwrap(), 1);

        std::fs::remove_file(dir.path()).unwrap();
    }

    #[test]
    fn test_summary_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("store.json")).unwrap();
        store.mutate(|s| Ok(insert_file(s))).unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.chunk_count, 1);
        assert_eq!(summary.chunk_bytes, 8);

        let secret_b64 = store
            .read(|s| {
                use base64::Engine;
                Ok(base64::engine::general_purpose::STANDARD.encode(s.signing_secret().as_bytes()))
            })
            .unwrap();
        let rendered = serde_json::to_string(&summary).unwrap();
        assert!(!rendered.contains(&secret_b64));
    }

    #[test]
    fn test_concurrent_mutations_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = Arc::new(Store::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        store.mutate(|s| Ok(insert_file(s))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.read(|s| Ok(s.files.len())).unwrap(), 40);
        drop(store);
        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.read(|s| Ok(s.files.len())).unwrap(), 40);
    }
}
