//! Account lifecycle: signup and login

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use sfs_core::{SfsError, SfsResult};
use sfs_crypto::{derive_master_key, generate_salt, KdfParams};
use sfs_store::{AccountRecord, Store, StoreState};

use crate::index::PrivateIndex;
use crate::session::Session;

/// Create an account with an empty private index.
///
/// Fails with `Validation` on an empty username or password and with
/// `DuplicateAccount` if the username is taken.
pub fn signup(
    store: &Store,
    username: &str,
    password: &SecretString,
    params: &KdfParams,
) -> SfsResult<()> {
    if username.is_empty() || password.expose_secret().is_empty() {
        return Err(SfsError::Validation(
            "username and password must not be empty".into(),
        ));
    }

    // Cheap early exit before paying for the KDF; re-checked under the write lock.
    if store.read(|s| Ok(s.account(username).is_some()))? {
        return Err(SfsError::DuplicateAccount(username.to_string()));
    }

    let salt = generate_salt();
    let master = derive_master_key(password, &salt, params)?;
    let sealed_index = PrivateIndex::default().seal(&master, username)?;

    store.mutate(|state| {
        if state.accounts.contains_key(username) {
            return Err(SfsError::DuplicateAccount(username.to_string()));
        }
        state.accounts.insert(
            username.to_string(),
            AccountRecord {
                username: username.to_string(),
                salt,
                kdf: *params,
                sealed_index,
            },
        );
        Ok(())
    })?;

    tracing::info!(user = %username, "account created");
    Ok(())
}

/// Open a session for `username`.
///
/// An unknown user, a wrong password, and an unreadable index all fail with
/// the same `Authentication` error.
pub fn login(store: Arc<Store>, username: &str, password: &SecretString) -> SfsResult<Session> {
    let (record, decoy) = store.read(|s| Ok((s.account(username).cloned(), decoy_params(s))))?;
    let Some(record) = record else {
        // Pay the same stretching cost as a real account before rejecting.
        let _ = derive_master_key(password, &generate_salt(), &decoy);
        tracing::debug!("login rejected");
        return Err(SfsError::Authentication);
    };

    let master = derive_master_key(password, &record.salt, &record.kdf)?;
    let index = match PrivateIndex::open(&master, username, &record.sealed_index) {
        Ok(index) => index,
        Err(_) => {
            tracing::debug!("login rejected");
            return Err(SfsError::Authentication);
        }
    };

    tracing::info!(user = %username, files = index.len(), "session opened");
    Ok(Session::new(store, username.to_string(), master, index))
}

/// Argon2 parameters used to stretch the password of an unknown user: those
/// of an existing account, so the rejection costs what a real login costs.
fn decoy_params(state: &StoreState) -> KdfParams {
    state
        .accounts
        .values()
        .next()
        .map(|a| a.kdf)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &tempfile::TempDir) -> Arc<Store> {
        Arc::new(Store::open(&dir.path().join("store.json")).unwrap())
    }

    fn pw(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[test]
    fn test_signup_then_login() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let params = KdfParams::fast_insecure();

        signup(&store, "alice", &pw("wonder"), &params).unwrap();
        let session = login(Arc::clone(&store), "alice", &pw("wonder")).unwrap();
        assert_eq!(session.username(), "alice");
        assert!(session.list_files().is_empty());
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let params = KdfParams::fast_insecure();

        assert!(matches!(
            signup(&store, "", &pw("pw"), &params),
            Err(SfsError::Validation(_))
        ));
        assert!(matches!(
            signup(&store, "alice", &pw(""), &params),
            Err(SfsError::Validation(_))
        ));
        assert!(store.read(|s| Ok(s.accounts.is_empty())).unwrap());
    }

    #[test]
    fn test_duplicate_signup() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let params = KdfParams::fast_insecure();

        signup(&store, "alice", &pw("wonder"), &params).unwrap();
        let err = signup(&store, "alice", &pw("other"), &params).unwrap_err();
        assert!(matches!(err, SfsError::DuplicateAccount(name) if name == "alice"));

        // Original password still works
        assert!(login(store, "alice", &pw("wonder")).is_ok());
    }

    #[test]
    fn test_login_failures_uniform() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        signup(&store, "alice", &pw("wonder"), &KdfParams::fast_insecure()).unwrap();

        let unknown = login(Arc::clone(&store), "bob", &pw("wonder")).unwrap_err();
        let wrong = login(Arc::clone(&store), "alice", &pw("wander")).unwrap_err();

        store
            .mutate(|s| {
                let blob = &mut s.accounts.get_mut("alice").unwrap().sealed_index;
                let last = blob.len() - 1;
                blob[last] ^= 0x80;
                Ok(())
            })
            .unwrap();
        let corrupted = login(Arc::clone(&store), "alice", &pw("wonder")).unwrap_err();

        for err in [&unknown, &wrong, &corrupted] {
            assert!(matches!(err, SfsError::Authentication));
        }
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(wrong.to_string(), corrupted.to_string());
    }

    #[test]
    fn test_unknown_user_stretched_like_existing_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let params = KdfParams {
            mem_cost_kib: 96,
            time_cost: 1,
            parallelism: 1,
        };
        assert_eq!(store.read(|s| Ok(decoy_params(s))).unwrap(), KdfParams::default());

        signup(&store, "alice", &pw("wonder"), &params).unwrap();
        assert_eq!(store.read(|s| Ok(decoy_params(s))).unwrap(), params);
        assert!(matches!(
            login(store, "nobody", &pw("wonder")),
            Err(SfsError::Authentication)
        ));
    }

    #[test]
    fn test_kdf_params_recorded_per_account() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let params = KdfParams {
            mem_cost_kib: 128,
            time_cost: 2,
            parallelism: 1,
        };
        signup(&store, "alice", &pw("wonder"), &params).unwrap();

        let recorded = store.read(|s| Ok(s.account("alice").unwrap().kdf)).unwrap();
        assert_eq!(recorded, params);
        assert!(login(store, "alice", &pw("wonder")).is_ok());
    }
}
