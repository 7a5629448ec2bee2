//! sfs-core: types shared by every securefs crate
//!
//! - `config`: the `sfs.toml` schema
//! - `error`: the single error enum and its process exit codes
//! - `types`: opaque identifiers for files and chunks

pub mod config;
pub mod error;
pub mod types;

pub use error::{SfsError, SfsResult};
pub use types::{ChunkId, FileId};
