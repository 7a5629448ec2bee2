//! Persistent record types and the in-memory state they make up

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sfs_core::{ChunkId, FileId};
use sfs_crypto::{FileKey, KdfParams, Salt, SigningSecret};

use crate::encoding;

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One account. `username`, `salt`, and `kdf` never change after signup;
/// `sealed_index` is replaced on every change to the private index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub username: String,
    #[serde(with = "encoding::array")]
    pub salt: Salt,
    pub kdf: KdfParams,
    #[serde(with = "encoding")]
    pub sealed_index: Vec<u8>,
}

/// One file, shared by every account whose index points at its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Account that created the file. Only the owner's removal deletes it.
    #[serde(default)]
    pub owner: String,
    #[serde(with = "encoding::file_key")]
    pub key: FileKey,
    /// Salt the current key was derived from.
    #[serde(with = "encoding::array")]
    pub salt: Salt,
    /// Chunk ids in content order.
    pub chunks: Vec<ChunkId>,
}

/// A sealed chunk blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blob(#[serde(with = "encoding")] pub Vec<u8>);

impl Blob {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the store holds. Also the snapshot schema.
///
/// Missing maps in a loaded snapshot come back empty. A missing signing
/// secret is a hard error.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(with = "encoding::signing_secret")]
    secret: SigningSecret,
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountRecord>,
    #[serde(default)]
    pub files: BTreeMap<FileId, FileRecord>,
    #[serde(default)]
    pub chunks: BTreeMap<ChunkId, Blob>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl StoreState {
    /// Empty state with a freshly generated signing secret.
    pub fn fresh() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            secret: SigningSecret::generate(),
            accounts: BTreeMap::new(),
            files: BTreeMap::new(),
            chunks: BTreeMap::new(),
        }
    }

    pub fn signing_secret(&self) -> &SigningSecret {
        &self.secret
    }

    pub fn account(&self, username: &str) -> Option<&AccountRecord> {
        self.accounts.get(username)
    }

    pub fn file(&self, id: &FileId) -> Option<&FileRecord> {
        self.files.get(id)
    }

    pub fn chunk(&self, id: &ChunkId) -> Option<&Blob> {
        self.chunks.get(id)
    }

    /// Remove a file record together with all of its chunk blobs.
    pub fn remove_file(&mut self, id: &FileId) -> Option<FileRecord> {
        let record = self.files.remove(id)?;
        for chunk in &record.chunks {
            self.chunks.remove(chunk);
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_chunks(state: &mut StoreState, n: usize) -> FileId {
        let id = FileId::new();
        let mut chunks = Vec::new();
        for i in 0..n {
            let chunk = ChunkId::new();
            state.chunks.insert(chunk, Blob(vec![i as u8; 4]));
            chunks.push(chunk);
        }
        state.files.insert(
            id,
            FileRecord {
                owner: "alice".into(),
                key: FileKey::from_bytes([1u8; 32]),
                salt: [2u8; 16],
                chunks,
            },
        );
        id
    }

    #[test]
    fn test_remove_file_drops_chunks() {
        let mut state = StoreState::fresh();
        let keep = record_with_chunks(&mut state, 2);
        let drop = record_with_chunks(&mut state, 3);
        assert_eq!(state.chunks.len(), 5);

        let removed = state.remove_file(&drop).unwrap();
        assert_eq!(removed.chunks.len(), 3);
        assert_eq!(state.chunks.len(), 2);
        assert!(state.file(&keep).is_some());
        assert!(state.file(&drop).is_none());
        assert!(state.remove_file(&drop).is_none());
    }

    #[test]
    fn test_state_json_roundtrip() {
        let mut state = StoreState::fresh();
        let id = record_with_chunks(&mut state, 1);
        state.accounts.insert(
            "alice".into(),
            AccountRecord {
                username: "alice".into(),
                salt: [9u8; 16],
                kdf: KdfParams::fast_insecure(),
                sealed_index: vec![1, 2, 3],
            },
        );

        let json = serde_json::to_string(&state).unwrap();
        let parsed: StoreState = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.signing_secret().as_bytes(), state.signing_secret().as_bytes());
        assert_eq!(parsed.account("alice").unwrap().sealed_index, vec![1, 2, 3]);
        assert_eq!(parsed.account("alice").unwrap().salt, [9u8; 16]);
        let file = parsed.file(&id).unwrap();
        assert_eq!(file.key.as_bytes(), &[1u8; 32]);
        assert_eq!(parsed.chunk(&file.chunks[0]).unwrap().as_bytes(), &[0u8; 4]);
    }

    #[test]
    fn test_missing_maps_default_empty() {
        let json = r#"{"secret":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="}"#;
        let state: StoreState = serde_json::from_str(json).unwrap();
        assert!(state.accounts.is_empty());
        assert!(state.files.is_empty());
        assert!(state.chunks.is_empty());
        assert_eq!(state.version, SNAPSHOT_VERSION);
    }

    #[test]
    fn test_missing_secret_rejected() {
        assert!(serde_json::from_str::<StoreState>(r#"{"accounts":{}}"#).is_err());
    }

    #[test]
    fn test_wrong_length_key_rejected() {
        let json = r#"{"secret":"AAAA"}"#;
        assert!(serde_json::from_str::<StoreState>(json).is_err());
    }
}
