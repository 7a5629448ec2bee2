//! sfs-vault: the securefs operations
//!
//! [`signup`] creates an account; [`login`] opens a [`Session`] holding the
//! account's master key and decrypted private index. Through a session:
//!
//! - files are stored, loaded, and appended as ordered, independently sealed
//!   chunks ([`Session::store_file`], [`Session::load_file`], [`Session::append_file`])
//! - access is delegated with signed share tokens ([`Session::create_share`],
//!   [`Session::accept_share`])
//! - delegation is revoked by rotating the file key ([`Session::revoke`])
//!
//! Sessions hold their own copy of the private index. A change made through
//! one session is not seen by another open session for the same account
//! until it calls [`Session::refresh`] or logs in again.

mod account;
mod index;
mod revoke;
mod session;
mod share;

pub use account::{login, signup};
pub use index::PrivateIndex;
pub use session::Session;
pub use share::CapabilityToken;

pub use secrecy::SecretString;
pub use sfs_crypto::KdfParams;
