//! Capability sharing: signed share tokens
//!
//! Wire form: `base64url_nopad(json({"File": uuid, "Key": b64, "Mac": b64}))`
//! where `Mac = HMAC-SHA256(store secret, "share|" || file_id[16] || key[32])`.
//! The store secret itself never appears in a token.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use sfs_core::{FileId, SfsError, SfsResult};
use sfs_crypto::{mac, FileKey, KEY_SIZE, MAC_SIZE};

use crate::session::Session;

const SHARE_DOMAIN: &[u8] = b"share|";

/// A decoded share token: grants access to one file under one key.
#[derive(Debug, Clone)]
pub struct CapabilityToken {
    file_id: FileId,
    key: FileKey,
    tag: [u8; MAC_SIZE],
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireToken {
    #[serde(rename = "File")]
    file: String,
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Mac")]
    mac: String,
}

impl CapabilityToken {
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn file_key(&self) -> &FileKey {
        &self.key
    }

    /// Encode to the transportable string form.
    pub fn encode(&self) -> SfsResult<String> {
        let wire = WireToken {
            file: self.file_id.to_string(),
            key: STANDARD.encode(self.key.as_bytes()),
            mac: STANDARD.encode(self.tag),
        };
        let json = zeroize::Zeroizing::new(serde_json::to_vec(&wire)?);
        Ok(URL_SAFE_NO_PAD.encode(&*json))
    }

    /// Decode the string form. Any structural problem is `MalformedToken`;
    /// the tag is not checked here.
    pub fn decode(token: &str) -> SfsResult<Self> {
        let json = zeroize::Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(token.trim())
                .map_err(|e| SfsError::MalformedToken(format!("base64: {e}")))?,
        );
        let wire: WireToken = serde_json::from_slice(&json)
            .map_err(|e| SfsError::MalformedToken(format!("payload: {e}")))?;
        let file_id = FileId::parse_canonical(&wire.file)
            .ok_or_else(|| SfsError::MalformedToken("file id is not a canonical uuid".into()))?;

        let key = zeroize::Zeroizing::new(
            STANDARD
                .decode(&wire.key)
                .map_err(|e| SfsError::MalformedToken(format!("key: {e}")))?,
        );
        let key: [u8; KEY_SIZE] = key.as_slice().try_into().map_err(|_| {
            SfsError::MalformedToken(format!("key is {} bytes, expected {KEY_SIZE}", key.len()))
        })?;

        let tag = STANDARD
            .decode(&wire.mac)
            .map_err(|e| SfsError::MalformedToken(format!("mac: {e}")))?;
        let tag: [u8; MAC_SIZE] = tag.as_slice().try_into().map_err(|_| {
            SfsError::MalformedToken(format!("mac is {} bytes, expected {MAC_SIZE}", tag.len()))
        })?;

        Ok(Self {
            file_id,
            key: FileKey::from_bytes(key),
            tag,
        })
    }
}

fn signed_message(file_id: &FileId, key: &FileKey) -> zeroize::Zeroizing<Vec<u8>> {
    let mut msg = Vec::with_capacity(SHARE_DOMAIN.len() + 16 + KEY_SIZE);
    msg.extend_from_slice(SHARE_DOMAIN);
    msg.extend_from_slice(file_id.as_bytes());
    msg.extend_from_slice(key.as_bytes());
    zeroize::Zeroizing::new(msg)
}

impl Session {
    /// Issue a share token for `name` carrying the file's current key.
    pub fn create_share(&self, name: &str) -> SfsResult<String> {
        let file_id = self.resolve(name)?;

        let token = self.store.read(|state| {
            let record = state
                .file(&file_id)
                .ok_or_else(|| SfsError::NotFound(name.to_string()))?;
            let tag = mac::sign(state.signing_secret(), &signed_message(&file_id, &record.key))?;
            Ok(CapabilityToken {
                file_id,
                key: record.key.clone(),
                tag,
            })
        })?;

        tracing::info!(user = %self.username, %file_id, "share token issued");
        token.encode()
    }

    /// Redeem a share token, binding `alias` to the shared file.
    ///
    /// Checks, in order: the token decodes (`MalformedToken`), its tag was
    /// made with this store's secret over exactly its file id and key
    /// (`InvalidCapability`), the file still exists (`DanglingCapability`),
    /// and its key is the file's current key (`RevokedCapability`). The file
    /// record itself is never modified.
    pub fn accept_share(&mut self, alias: &str, token: &str) -> SfsResult<FileId> {
        if alias.is_empty() {
            return Err(SfsError::Validation("alias must not be empty".into()));
        }
        let token = CapabilityToken::decode(token)?;
        let file_id = token.file_id;

        let mut next = self.index.clone();
        next.insert(alias, file_id);

        let result = self.persist_with(next, |state| {
            let msg = signed_message(&token.file_id, &token.key);
            if !mac::verify(state.signing_secret(), &msg, &token.tag)? {
                return Err(SfsError::InvalidCapability);
            }
            let record = state
                .file(&token.file_id)
                .ok_or_else(|| SfsError::DanglingCapability(token.file_id.to_string()))?;
            if !record.key.ct_eq(&token.key) {
                return Err(SfsError::RevokedCapability);
            }
            Ok(())
        });

        match &result {
            Ok(()) => tracing::info!(user = %self.username, %file_id, "share token accepted"),
            Err(e) if e.is_capability_error() => {
                tracing::warn!(user = %self.username, error = %e, "share token rejected")
            }
            Err(e) => tracing::error!(user = %self.username, error = %e, "share token not applied"),
        }
        result.map(|()| file_id)
    }
}
