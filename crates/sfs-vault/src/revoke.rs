//! Revocation by key rotation

use zeroize::Zeroizing;

use sfs_core::{ChunkId, SfsError, SfsResult};
use sfs_crypto::{derive_rotated_file_key, generate_salt, open_chunk, seal_chunk};
use sfs_store::Blob;

use crate::session::Session;

impl Session {
    /// Rotate the key of `name` and re-seal every chunk under it.
    ///
    /// All chunks are opened and re-sealed (under new chunk ids) before
    /// anything is written; the key, salt, and chunk list are then swapped in
    /// one step and the old blobs deleted. If any chunk fails to open the file
    /// is left untouched. Share tokens issued before the rotation carry the
    /// old key and are rejected from then on. Returns the number of chunks
    /// re-sealed.
    pub fn revoke(&mut self, name: &str) -> SfsResult<usize> {
        let file_id = self.resolve(name)?;
        let salt = generate_salt();
        let new_key = derive_rotated_file_key(&self.master, &salt)?;

        let rotated = self.store.mutate(|state| {
            let record = state
                .file(&file_id)
                .ok_or_else(|| SfsError::NotFound(name.to_string()))?;
            if record.key.ct_eq(&new_key) {
                return Err(SfsError::Crypto("rotation produced an unchanged key".into()));
            }

            let mut fresh = Vec::with_capacity(record.chunks.len());
            for chunk_id in &record.chunks {
                let blob = state.chunk(chunk_id).ok_or_else(|| {
                    SfsError::Integrity(format!("chunk {chunk_id} of {file_id} is missing"))
                })?;
                let plaintext = Zeroizing::new(open_chunk(
                    &record.key,
                    &file_id,
                    chunk_id,
                    blob.as_bytes(),
                )?);
                let new_id = ChunkId::new();
                let sealed = seal_chunk(&new_key, &file_id, &new_id, &plaintext)?;
                fresh.push((new_id, Blob(sealed)));
            }

            let record = state
                .files
                .get_mut(&file_id)
                .ok_or_else(|| SfsError::NotFound(name.to_string()))?;
            let old_chunks = std::mem::replace(
                &mut record.chunks,
                fresh.iter().map(|(id, _)| *id).collect(),
            );
            record.key = new_key;
            record.salt = salt;

            for old in &old_chunks {
                state.chunks.remove(old);
            }
            let count = fresh.len();
            state.chunks.extend(fresh);
            Ok(count)
        })?;

        tracing::info!(user = %self.username, %file_id, chunks = rotated, "file key rotated");
        Ok(rotated)
    }
}
