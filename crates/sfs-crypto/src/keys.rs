//! Key types and the master key → file key step of the hierarchy

use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use sfs_core::SfsResult;

use crate::kdf::{derive_key, Salt};
use crate::KEY_SIZE;

const FILE_KEY_CONTEXT: &[u8] = b"sfs/v1/file-key";
const ROTATED_FILE_KEY_CONTEXT: &[u8] = b"sfs/v1/file-key/rotated";

macro_rules! secret_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            bytes: [u8; KEY_SIZE],
        }

        impl $name {
            pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
                Self { bytes }
            }

            pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
                &self.bytes
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.bytes.zeroize();
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("bytes", &"[REDACTED]")
                    .finish()
            }
        }
    };
}

secret_key!(
    /// A 256-bit account master key. Lives only inside a session.
    MasterKey
);

secret_key!(
    /// A per-file 256-bit encryption key. Zeroized on drop.
    FileKey
);

secret_key!(
    /// The store's 256-bit HMAC secret for share tokens.
    SigningSecret
);

impl FileKey {
    /// Constant-time equality, used when checking a presented key against the
    /// live one.
    pub fn ct_eq(&self, other: &FileKey) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl SigningSecret {
    /// Generate a fresh random signing secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }
}

/// Derive a file's key from the owner's master key and the file's salt.
pub fn derive_file_key(master: &MasterKey, file_salt: &Salt) -> SfsResult<FileKey> {
    derive_key(master.as_bytes(), file_salt, FILE_KEY_CONTEXT).map(FileKey::from_bytes)
}

/// Derive a replacement key for a file being rotated.
///
/// `rotation_salt` must be freshly generated for every rotation.
pub fn derive_rotated_file_key(master: &MasterKey, rotation_salt: &Salt) -> SfsResult<FileKey> {
    derive_key(master.as_bytes(), rotation_salt, ROTATED_FILE_KEY_CONTEXT).map(FileKey::from_bytes)
}
