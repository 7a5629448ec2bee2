//! HMAC-SHA256 tags under the store's signing secret

use hmac::{Hmac, Mac};
use sha2::Sha256;

use sfs_core::{SfsError, SfsResult};

use crate::keys::SigningSecret;
use crate::MAC_SIZE;

type HmacSha256 = Hmac<Sha256>;

fn keyed(secret: &SigningSecret) -> SfsResult<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SfsError::Crypto(format!("HMAC key setup failed: {e}")))
}

/// Compute the tag of `msg`.
pub fn sign(secret: &SigningSecret, msg: &[u8]) -> SfsResult<[u8; MAC_SIZE]> {
    let mut mac = keyed(secret)?;
    mac.update(msg);
    Ok(mac.finalize().into_bytes().into())
}

/// Check `tag` against `msg` in constant time.
///
/// Returns `Ok(false)` on mismatch, including a tag of the wrong length.
pub fn verify(secret: &SigningSecret, msg: &[u8], tag: &[u8]) -> SfsResult<bool> {
    let mut mac = keyed(secret)?;
    mac.update(msg);
    Ok(mac.verify_slice(tag).is_ok())
}
