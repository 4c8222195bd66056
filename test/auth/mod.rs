use std::{fs, path::PathBuf, time::Duration};

use uuid::Uuid;

use crate::{
    auth::{
        clear_session, load_credential, load_user, store_session, Credential, CredentialStore, FileStore, MemoryStore,
        User, ACCESS_TOKEN_KEY, EXPIRES_IN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, USER_ID_KEY
    },
    web::Error
};

fn temporary_path() -> PathBuf {
    std::env::temp_dir().join(format!("sail-credentials-{}.json", Uuid::new_v4()))
}

fn session() -> (Credential, User) {
    (
        Credential { access_token: "access".to_string(), refresh_token: "refresh".to_string(), expires_in: None },
        User { id: 3, email: "student@sail.test".to_string(), role: "student".to_string() }
    )
}

#[test]
fn test_memory_store() {
    let store = MemoryStore::new();
    assert!(store.get(ACCESS_TOKEN_KEY).is_none());

    store.set(ACCESS_TOKEN_KEY, "access").unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("access"));
    assert!(store.remove(ACCESS_TOKEN_KEY).unwrap());
    assert!(!store.remove(ACCESS_TOKEN_KEY).unwrap());
    assert!(store.is_empty());
}

#[test]
fn test_file_store_survives_reopen() {
    let path = temporary_path();
    {
        let store = FileStore::open(&path).expect("Unable to open credential store");
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
        store.set(ACCESS_TOKEN_KEY, "access").unwrap();
        store.set(USER_ID_KEY, "3").unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("access"));
    assert!(store.remove(ACCESS_TOKEN_KEY).unwrap());

    let reopened = FileStore::open(&path).unwrap();
    assert!(reopened.get(ACCESS_TOKEN_KEY).is_none());
    assert_eq!(reopened.get(USER_ID_KEY).as_deref(), Some("3"));
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_file_store_rejects_corrupt_file() {
    let path = temporary_path();
    fs::write(&path, "not json").unwrap();

    let error = FileStore::open(&path).unwrap_err();
    assert!(matches!(error, Error::Store(_)));
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_file_store_remove_missing_key_does_not_create_file() {
    let path = temporary_path();
    let store = FileStore::open(&path).unwrap();

    assert!(!store.remove(ACCESS_TOKEN_KEY).unwrap());
    assert!(!path.exists());
}

#[test]
fn test_session_round_trip_through_store() {
    let store = MemoryStore::new();
    let (mut credential, user) = session();
    credential.expires_in = Some(Duration::from_secs(300));

    store_session(&store, &credential, &user).unwrap();
    assert_eq!(load_credential(&store), Some(credential));
    assert_eq!(load_user(&store), Some(user));

    assert!(clear_session(&store).unwrap());
    assert!(!clear_session(&store).unwrap());
    assert!(store.is_empty());
}

#[test]
fn test_session_without_expiry_drops_stale_expiry() {
    let store = MemoryStore::new();
    store.set(EXPIRES_IN_KEY, "60").unwrap();
    let (credential, user) = session();

    store_session(&store, &credential, &user).unwrap();
    assert!(store.get(EXPIRES_IN_KEY).is_none());
    assert_eq!(load_credential(&store).unwrap().expires_in, None);
}

#[test]
fn test_user_requires_numeric_id() {
    let store = MemoryStore::new();
    let (credential, user) = session();
    store_session(&store, &credential, &user).unwrap();

    store.set(USER_ID_KEY, "not-a-number").unwrap();
    assert_eq!(load_user(&store), None);
}

#[test]
fn test_file_store_writes_session_in_one_batch() {
    let path = temporary_path();
    let store = FileStore::open(&path).unwrap();
    let (mut credential, user) = session();
    credential.expires_in = Some(Duration::from_secs(300));

    store_session(&store, &credential, &user).unwrap();
    let written: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.len(), SESSION_KEYS.len());
    assert_eq!(load_credential(&FileStore::open(&path).unwrap()), Some(credential));

    assert!(clear_session(&store).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap().trim(), "{}");
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_file_store_apply_without_change_does_not_create_file() {
    let path = temporary_path();
    let store = FileStore::open(&path).unwrap();

    assert!(!store.apply(&[], &[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]).unwrap());
    assert!(!path.exists());
}

#[test]
fn test_file_store_write_failure_is_store_error() {
    let path = temporary_path().join("missing").join("credentials.json");
    let store = FileStore::open(&path).unwrap();

    let error = store.set(ACCESS_TOKEN_KEY, "access").unwrap_err();
    assert!(matches!(error, Error::Store(_)), "Unexpected error {}", error);
}
