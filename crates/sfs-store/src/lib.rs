//! sfs-store: the single source of truth for securefs
//!
//! A [`Store`] owns the signing secret and three flat maps keyed by opaque
//! identifiers:
//!
//! ```text
//! accounts: username -> AccountRecord { salt, kdf params, sealed private index }
//! files:    FileId   -> FileRecord    { key, salt, [ChunkId...] }
//! chunks:   ChunkId  -> sealed blob
//! ```
//!
//! Every mutation runs under the write lock and is followed by a full
//! snapshot flush before the lock is released.

mod encoding;
pub mod records;
pub mod snapshot;
pub mod store;

pub use records::{AccountRecord, Blob, FileRecord, StoreState};
pub use store::{Store, StoreSummary};
