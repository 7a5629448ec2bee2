//! A logged-in session: master key + private index, and the file operations

use std::sync::Arc;

use sfs_core::{ChunkId, FileId, SfsError, SfsResult};
use sfs_crypto::{derive_file_key, generate_salt, open_chunk, seal_chunk, MasterKey};
use sfs_store::{Blob, FileRecord, Store, StoreState};

use crate::index::PrivateIndex;

/// One account's view of the store.
///
/// Holds the master key and decrypted index in memory for its lifetime; the
/// master key is zeroized on drop.
pub struct Session {
    pub(crate) store: Arc<Store>,
    pub(crate) username: String,
    pub(crate) master: MasterKey,
    pub(crate) index: PrivateIndex,
}

impl Session {
    pub(crate) fn new(
        store: Arc<Store>,
        username: String,
        master: MasterKey,
        index: PrivateIndex,
    ) -> Self {
        Self {
            store,
            username,
            master,
            index,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Filenames in this session's index, sorted.
    pub fn list_files(&self) -> Vec<String> {
        self.index.names().map(str::to_string).collect()
    }

    /// Store `data` as a new file under `name`.
    ///
    /// A fresh file id, salt, and key are created every time; an existing
    /// binding for `name` is replaced, and the file it pointed at is left in
    /// place for any other account that references it.
    pub fn store_file(&mut self, name: &str, data: &[u8]) -> SfsResult<FileId> {
        validate_name(name)?;

        let salt = generate_salt();
        let key = derive_file_key(&self.master, &salt)?;
        let file_id = FileId::new();
        let chunk_id = ChunkId::new();
        let blob = seal_chunk(&key, &file_id, &chunk_id, data)?;

        let owner = self.username.clone();
        let mut next = self.index.clone();
        next.insert(name, file_id);

        self.persist_with(next, |state| {
            state.chunks.insert(chunk_id, Blob(blob));
            state.files.insert(
                file_id,
                FileRecord {
                    owner,
                    key,
                    salt,
                    chunks: vec![chunk_id],
                },
            );
            Ok(())
        })?;

        tracing::info!(user = %self.username, %file_id, bytes = data.len(), "file stored");
        Ok(file_id)
    }

    /// Read the whole content of `name`.
    ///
    /// Chunks are opened in order under the file's current key. Any chunk that
    /// is missing or fails to open aborts the read; partial content is never
    /// returned.
    pub fn load_file(&self, name: &str) -> SfsResult<Vec<u8>> {
        let file_id = self.resolve(name)?;

        self.store.read(|state| {
            let record = state
                .file(&file_id)
                .ok_or_else(|| SfsError::NotFound(name.to_string()))?;

            let mut out = Vec::new();
            for chunk_id in &record.chunks {
                let blob = state.chunk(chunk_id).ok_or_else(|| {
                    SfsError::Integrity(format!("chunk {chunk_id} of {file_id} is missing"))
                })?;
                let plaintext = open_chunk(&record.key, &file_id, chunk_id, blob.as_bytes())
                    .map_err(|_| {
                        SfsError::Integrity(format!("chunk {chunk_id} of {file_id} failed to open"))
                    })?;
                out.extend_from_slice(&plaintext);
            }
            tracing::debug!(%file_id, chunks = record.chunks.len(), "file loaded");
            Ok(out)
        })
    }

    /// Append `more` to `name` as one new chunk. Existing chunks are not
    /// touched.
    pub fn append_file(&mut self, name: &str, more: &[u8]) -> SfsResult<()> {
        let file_id = self.resolve(name)?;

        let chunks = self.store.mutate(|state| {
            let record = state
                .files
                .get_mut(&file_id)
                .ok_or_else(|| SfsError::NotFound(name.to_string()))?;
            let chunk_id = ChunkId::new();
            let blob = seal_chunk(&record.key, &file_id, &chunk_id, more)?;
            record.chunks.push(chunk_id);
            let chunks = record.chunks.len();
            state.chunks.insert(chunk_id, Blob(blob));
            Ok(chunks)
        })?;

        tracing::info!(user = %self.username, %file_id, bytes = more.len(), chunks, "file appended");
        Ok(())
    }

    /// Unbind `name`. If this account created the file, its record and
    /// chunks are deleted too.
    ///
    /// Other names bound to a deleted file, in this or other accounts, are
    /// left dangling and report `NotFound` when read. Removing a name bound
    /// through an accepted share only drops the binding; the owner's file is
    /// untouched.
    pub fn remove_file(&mut self, name: &str) -> SfsResult<()> {
        let file_id = self.resolve(name)?;

        let mut next = self.index.clone();
        next.remove(name);

        let username = self.username.clone();
        let removed = self.persist_with(next, |state| {
            let owned = state.file(&file_id).is_some_and(|r| r.owner == username);
            Ok(if owned { state.remove_file(&file_id) } else { None })
        })?;

        match removed {
            Some(record) => tracing::info!(
                user = %self.username,
                %file_id,
                chunks = record.chunks.len(),
                "file removed"
            ),
            None => tracing::info!(user = %self.username, %file_id, "binding removed"),
        }
        Ok(())
    }

    /// Reload the index from the latest persisted account record, picking up
    /// changes made by other sessions of this account.
    pub fn refresh(&mut self) -> SfsResult<()> {
        let blob = self.store.read(|state| {
            state
                .account(&self.username)
                .map(|a| a.sealed_index.clone())
                .ok_or(SfsError::Authentication)
        })?;
        self.index = PrivateIndex::open(&self.master, &self.username, &blob)
            .map_err(|_| SfsError::Authentication)?;
        Ok(())
    }

    pub(crate) fn resolve(&self, name: &str) -> SfsResult<FileId> {
        self.index
            .get(name)
            .ok_or_else(|| SfsError::NotFound(name.to_string()))
    }

    /// Apply `f` and persist `next` as this account's index in one store
    /// mutation. The session adopts `next` once the mutation has been applied
    /// in memory, even if the flush that follows fails.
    pub(crate) fn persist_with<T>(
        &mut self,
        next: PrivateIndex,
        f: impl FnOnce(&mut StoreState) -> SfsResult<T>,
    ) -> SfsResult<T> {
        let sealed = next.seal(&self.master, &self.username)?;
        let username = self.username.as_str();
        let mut applied = false;

        let result = self.store.mutate(|state| {
            if !state.accounts.contains_key(username) {
                return Err(SfsError::NotFound(format!("account {username}")));
            }
            let out = f(state)?;
            if let Some(account) = state.accounts.get_mut(username) {
                account.sealed_index = sealed;
            }
            applied = true;
            Ok(out)
        });

        if applied {
            self.index = next;
        }
        result
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("files", &self.index.len())
            .finish_non_exhaustive()
    }
}

fn validate_name(name: &str) -> SfsResult<()> {
    if name.is_empty() {
        return Err(SfsError::Validation("filename must not be empty".into()));
    }
    Ok(())
}
