//! Key derivation: HKDF-SHA256 extract/expand, Argon2id password stretching

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use sfs_core::config::KdfConfig;
use sfs_core::{SfsError, SfsResult};

use crate::keys::MasterKey;
use crate::{KEY_SIZE, SALT_SIZE};

/// Random, non-secret salt stored next to what it protects.
pub type Salt = [u8; SALT_SIZE];

pub(crate) const MASTER_CONTEXT: &[u8] = b"sfs/v1/master";

/// Argon2id parameters, recorded per account at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub mem_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl KdfParams {
    /// Minimal Argon2 cost. Only for tests, never for real accounts.
    pub fn fast_insecure() -> Self {
        Self {
            mem_cost_kib: 64,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::from(&KdfConfig::default())
    }
}

impl From<&KdfConfig> for KdfParams {
    fn from(config: &KdfConfig) -> Self {
        Self {
            mem_cost_kib: config.mem_cost_kib,
            time_cost: config.time_cost,
            parallelism: config.parallelism,
        }
    }
}

/// Generate a fresh random salt.
pub fn generate_salt() -> Salt {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive `length` bytes from `secret`, domain-separated by `context`.
///
/// HKDF-SHA256: extract a pseudo-random key from `secret` under `salt`, then
/// expand it with `context || counter` blocks. Deterministic for a given
/// `(secret, salt, context)`; distinct contexts give unrelated outputs.
pub fn derive(secret: &[u8], salt: &[u8], context: &[u8], length: usize) -> SfsResult<Vec<u8>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), secret);
    let mut okm = vec![0u8; length];
    hkdf.expand(context, &mut okm)
        .map_err(|e| SfsError::Crypto(format!("HKDF expand to {length} bytes failed: {e}")))?;
    Ok(okm)
}

/// Fixed-size variant of [`derive`] for 256-bit keys.
pub(crate) fn derive_key(secret: &[u8], salt: &[u8], context: &[u8]) -> SfsResult<[u8; KEY_SIZE]> {
    let okm = Zeroizing::new(derive(secret, salt, context, KEY_SIZE)?);
    okm.as_slice()
        .try_into()
        .map_err(|_| {
            SfsError::Crypto(format!("HKDF produced {} bytes, expected {KEY_SIZE}", okm.len()))
        })
}

/// Derive an account's master key from its password.
///
/// The password is first stretched with Argon2id under the account salt, then
/// passed through HKDF with the master-key context.
pub fn derive_master_key(
    password: &SecretString,
    salt: &Salt,
    params: &KdfParams,
) -> SfsResult<MasterKey> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| SfsError::Crypto(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut stretched = Zeroizing::new([0u8; KEY_SIZE]);
    argon2
        .hash_password_into(
            password.expose_secret().as_bytes(),
            salt,
            &mut stretched[..],
        )
        .map_err(|e| SfsError::Crypto(format!("Argon2id KDF failed: {e}")))?;

    let key = derive_key(&stretched[..], salt, MASTER_CONTEXT)?;
    Ok(MasterKey::from_bytes(key))
}
