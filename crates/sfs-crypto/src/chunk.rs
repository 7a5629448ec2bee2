//! Per-chunk sealing
//!
//! Each chunk blob is sealed under its file's key with
//! `AAD = file_id (16 bytes) || chunk_id (16 bytes)`, binding the blob to the
//! slot it is stored in. A blob copied under another chunk id or file fails
//! to open.

use sfs_core::{ChunkId, FileId, SfsResult};

use crate::aead::{open, seal};
use crate::keys::FileKey;

/// Seal one chunk of `file_id` under `file_key`.
pub fn seal_chunk(
    file_key: &FileKey,
    file_id: &FileId,
    chunk_id: &ChunkId,
    plaintext: &[u8],
) -> SfsResult<Vec<u8>> {
    seal(file_key.as_bytes(), &build_aad(file_id, chunk_id), plaintext)
}

/// Open one chunk sealed by [`seal_chunk`].
pub fn open_chunk(
    file_key: &FileKey,
    file_id: &FileId,
    chunk_id: &ChunkId,
    blob: &[u8],
) -> SfsResult<Vec<u8>> {
    open(file_key.as_bytes(), &build_aad(file_id, chunk_id), blob)
}

fn build_aad(file_id: &FileId, chunk_id: &ChunkId) -> [u8; 32] {
    let mut aad = [0u8; 32];
    aad[..16].copy_from_slice(file_id.as_bytes());
    aad[16..].copy_from_slice(chunk_id.as_bytes());
    aad
}
