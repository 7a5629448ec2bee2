//! The per-account private index: filename → file id

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sfs_core::{FileId, SfsResult};
use sfs_crypto::MasterKey;

const INDEX_AAD_PREFIX: &[u8] = b"sfs/v1/index";

/// Mapping from filename to file id, stored sealed under the master key.
///
/// Names are case-sensitive. Several names (in one or many accounts) may map
/// to the same file id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateIndex {
    files: BTreeMap<String, FileId>,
}

impl PrivateIndex {
    pub fn get(&self, name: &str) -> Option<FileId> {
        self.files.get(name).copied()
    }

    /// Bind `name`, replacing any previous binding. Returns the replaced id.
    pub fn insert(&mut self, name: &str, id: FileId) -> Option<FileId> {
        self.files.insert(name.to_string(), id)
    }

    pub fn remove(&mut self, name: &str) -> Option<FileId> {
        self.files.remove(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Serialize and seal under `master`, bound to `username`.
    pub(crate) fn seal(&self, master: &MasterKey, username: &str) -> SfsResult<Vec<u8>> {
        let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(self)?);
        sfs_crypto::seal(master.as_bytes(), &aad(username), &plaintext)
    }

    /// Open a blob produced by [`PrivateIndex::seal`].
    ///
    /// Fails on a wrong key, a blob sealed for another user, tampering, or an
    /// undecodable payload.
    pub(crate) fn open(master: &MasterKey, username: &str, blob: &[u8]) -> SfsResult<Self> {
        let plaintext =
            zeroize::Zeroizing::new(sfs_crypto::open(master.as_bytes(), &aad(username), blob)?);
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

fn aad(username: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(INDEX_AAD_PREFIX.len() + username.len());
    aad.extend_from_slice(INDEX_AAD_PREFIX);
    aad.extend_from_slice(username.as_bytes());
    aad
}
