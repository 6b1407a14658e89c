use super::helpers::open_store;
use crate::StoreError;
use tempfile::tempdir;

// --------------------- Basic set / get / delete ---------------------

#[test]
fn set_and_get() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.set(b"name".to_vec(), b"alice".to_vec()).unwrap();
    assert_eq!(store.get(b"name").unwrap(), b"alice".to_vec());
}

#[test]
fn get_missing_key_is_not_found() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    assert!(matches!(store.get(b"nope"), Err(StoreError::NotFound)));
}

#[test]
fn overwrite_key() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.set(b"k".to_vec(), b"v1".to_vec()).unwrap();
    store.set(b"k".to_vec(), b"v2".to_vec()).unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"v2".to_vec());
}

#[test]
fn delete_removes_key() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.set(b"k".to_vec(), b"v".to_vec()).unwrap();
    store.delete(b"k".to_vec()).unwrap();
    assert!(matches!(store.get(b"k"), Err(StoreError::NotFound)));
}

#[test]
fn set_after_delete_resurrects() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.set(b"k".to_vec(), b"v1".to_vec()).unwrap();
    store.delete(b"k".to_vec()).unwrap();
    store.set(b"k".to_vec(), b"v2".to_vec()).unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"v2".to_vec());
}

#[test]
fn delete_absent_key_succeeds() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.delete(b"never-existed".to_vec()).unwrap();
    assert!(matches!(
        store.get(b"never-existed"),
        Err(StoreError::NotFound)
    ));
}

#[test]
fn delete_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.set(b"k".to_vec(), b"v".to_vec()).unwrap();
    store.delete(b"k".to_vec()).unwrap();
    store.delete(b"k".to_vec()).unwrap();
    assert!(matches!(store.get(b"k"), Err(StoreError::NotFound)));
}

// --------------------- Input validation ---------------------

#[test]
fn empty_key_rejected_everywhere() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    assert!(matches!(
        store.set(Vec::new(), b"v".to_vec()),
        Err(StoreError::EmptyKey)
    ));
    assert!(matches!(store.get(b""), Err(StoreError::EmptyKey)));
    assert!(matches!(store.delete(Vec::new()), Err(StoreError::EmptyKey)));
}

#[test]
fn empty_value_rejected_on_set() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    assert!(matches!(
        store.set(b"k".to_vec(), Vec::new()),
        Err(StoreError::EmptyValue)
    ));
}

#[test]
fn oversized_value_rejected_and_store_survives() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    let huge = vec![b'x'; record::MAX_VALUE_BYTES + 1];
    assert!(store.set(b"k".to_vec(), huge).is_err());

    // The failed append must not have touched the memtable.
    assert!(matches!(store.get(b"k"), Err(StoreError::NotFound)));
    store.set(b"k".to_vec(), b"v".to_vec()).unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"v".to_vec());
}

#[test]
fn utf8_keys_and_values_roundtrip() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    let key = "ключ🔑".as_bytes().to_vec();
    let val = "värde — βαλίδα".as_bytes().to_vec();
    store.set(key.clone(), val.clone()).unwrap();
    assert_eq!(store.get(&key).unwrap(), val);
}

// --------------------- Close ---------------------

#[test]
fn operations_after_close_are_refused() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.set(b"k".to_vec(), b"v".to_vec()).unwrap();
    store.close();

    assert!(matches!(
        store.set(b"k2".to_vec(), b"v".to_vec()),
        Err(StoreError::Closed)
    ));
    assert!(matches!(store.get(b"k"), Err(StoreError::Closed)));
    assert!(matches!(store.delete(b"k".to_vec()), Err(StoreError::Closed)));
}

#[test]
fn close_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path());

    store.close();
    store.close();
}
