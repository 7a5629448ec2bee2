//! Base64 serde adapters for binary snapshot fields

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    STANDARD
        .decode(s.as_bytes())
        .map_err(|e| D::Error::custom(format!("base64 decode: {e}")))
}

/// Fixed-length arrays (salts, keys, secrets).
pub mod array {
    use super::*;

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        super::serialize(bytes, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let bytes = super::deserialize(deserializer)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| D::Error::custom(format!("expected {N} bytes, got {len}")))
    }
}

pub mod file_key {
    use super::*;
    use sfs_crypto::FileKey;

    pub fn serialize<S: Serializer>(key: &FileKey, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize(key.as_bytes(), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FileKey, D::Error> {
        super::array::deserialize(deserializer).map(FileKey::from_bytes)
    }
}

pub mod signing_secret {
    use super::*;
    use sfs_crypto::SigningSecret;

    pub fn serialize<S: Serializer>(
        secret: &SigningSecret,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        super::serialize(secret.as_bytes(), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<SigningSecret, D::Error> {
        super::array::deserialize(deserializer).map(SigningSecret::from_bytes)
    }
}
