use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::web::Error;

pub mod jwt;
pub mod store;

pub use store::{FileStore, MemoryStore};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_ID_KEY: &str = "user_id";
pub const USER_EMAIL_KEY: &str = "user_email";
pub const USER_ROLE_KEY: &str = "user_role";
pub const EXPIRES_IN_KEY: &str = "expires_in";

/// Every key written on login, in the order they are cleared on logout.
pub const SESSION_KEYS: [&str; 6] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_IN_KEY, USER_ROLE_KEY, USER_ID_KEY, USER_EMAIL_KEY];

#[derive(Eq, PartialEq, Clone, Debug)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<Duration>
}

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: String
}

/// Durable, synchronous key-value storage for the session.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Removes `key`. Returns whether anything was actually removed.
    fn remove(&self, key: &str) -> Result<bool, Error>;

    /// Writes `set` and drops `remove` as one change. Returns whether any removed key was present.
    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<bool, Error> {
        for (key, value) in set {
            self.set(key, value)?;
        }
        let mut removed = false;
        for key in remove {
            removed |= self.remove(key)?;
        }
        Ok(removed)
    }
}

/// Persists a fresh login/registration.
pub(crate) fn store_session(store: &dyn CredentialStore, credential: &Credential, user: &User) -> Result<(), Error> {
    let user_id = user.id.to_string();
    let expires_in = credential.expires_in.map(|expires_in| expires_in.as_secs().to_string());
    let mut set = vec![
        (ACCESS_TOKEN_KEY, credential.access_token.as_str()),
        (REFRESH_TOKEN_KEY, credential.refresh_token.as_str()),
        (USER_ROLE_KEY, user.role.as_str()),
        (USER_ID_KEY, user_id.as_str()),
        (USER_EMAIL_KEY, user.email.as_str())
    ];
    let remove = match &expires_in {
        Some(expires_in) => {
            set.push((EXPIRES_IN_KEY, expires_in.as_str()));
            Vec::new()
        }
        None => vec![EXPIRES_IN_KEY]
    };
    store.apply(&set, &remove)?;
    Ok(())
}

/// Removes every session key. Returns whether any key was present.
pub(crate) fn clear_session(store: &dyn CredentialStore) -> Result<bool, Error> {
    store.apply(&[], &SESSION_KEYS)
}

pub(crate) fn load_user(store: &dyn CredentialStore) -> Option<User> {
    Some(User {
        id: store.get(USER_ID_KEY)?.parse().ok()?,
        email: store.get(USER_EMAIL_KEY)?,
        role: store.get(USER_ROLE_KEY)?
    })
}

pub(crate) fn load_credential(store: &dyn CredentialStore) -> Option<Credential> {
    Some(Credential {
        access_token: store.get(ACCESS_TOKEN_KEY)?,
        refresh_token: store.get(REFRESH_TOKEN_KEY)?,
        expires_in: store
            .get(EXPIRES_IN_KEY)
            .and_then(|secs| secs.parse().ok())
            .map(Duration::from_secs)
    })
}
