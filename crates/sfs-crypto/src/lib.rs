//! sfs-crypto: the primitives behind securefs
//!
//! Key hierarchy:
//! ```text
//! password ──Argon2id(account salt)──HKDF("sfs/v1/master")──▶ Master Key
//!   ├── Private index AEAD: XChaCha20-Poly1305 (AAD = "sfs/v1/index" || username)
//!   └── File Key = HKDF(master, file salt, "sfs/v1/file-key")   (random salt per file)
//!       └── Chunk AEAD: XChaCha20-Poly1305 (nonce = random 192-bit, AAD = file_id || chunk_id)
//!
//! Store signing secret (random 256-bit) ──HMAC-SHA256──▶ share token tags
//! ```
//!
//! Rotation picks a fresh file salt and derives under the rotated-key context,
//! so a rotated key never equals any key previously derived for the file.

pub mod aead;
pub mod chunk;
pub mod kdf;
pub mod keys;
pub mod mac;

pub use aead::{open, seal};
pub use chunk::{open_chunk, seal_chunk};
pub use kdf::{derive, derive_master_key, generate_salt, KdfParams, Salt};
pub use keys::{derive_file_key, derive_rotated_file_key, FileKey, MasterKey, SigningSecret};
pub use mac::{sign, verify};

/// Size of every symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of account and file salts
pub const SALT_SIZE: usize = 16;

/// Size of an HMAC-SHA256 tag
pub const MAC_SIZE: usize = 32;
