//! End-to-end properties of the credential store facade, exercised
//! against the in-memory backend.

use std::collections::HashSet;
use std::sync::Arc;

use test_case::test_case;

use credstore::{
    default_store, install_default_store, Accessibility, CredentialStore, MemoryStore, SecureStore,
};

fn shared_backend() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

fn store_on(backend: &Arc<MemoryStore>, service: &str) -> CredentialStore {
    CredentialStore::new(Arc::clone(backend) as Arc<dyn SecureStore>, service)
}

#[test_case(Accessibility::AfterFirstUnlock)]
#[test_case(Accessibility::AfterFirstUnlockThisDeviceOnly)]
#[test_case(Accessibility::WhenPasscodeSetThisDeviceOnly)]
#[test_case(Accessibility::WhenUnlocked)]
#[test_case(Accessibility::WhenUnlockedThisDeviceOnly)]
fn bytes_round_trip_under_every_policy(policy: Accessibility) {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");

    assert!(store.set_bytes("blob", &[1, 2, 3, 255], Some(policy)));
    assert_eq!(
        store.bytes("blob", Some(policy)).as_deref(),
        Some([1, 2, 3, 255].as_slice())
    );
}

#[test_case(Accessibility::AfterFirstUnlock)]
#[test_case(Accessibility::AfterFirstUnlockThisDeviceOnly)]
#[test_case(Accessibility::WhenPasscodeSetThisDeviceOnly)]
#[test_case(Accessibility::WhenUnlocked)]
#[test_case(Accessibility::WhenUnlockedThisDeviceOnly)]
fn stored_policy_reads_back(policy: Accessibility) {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");

    assert!(store.set_bytes("blob", b"v", Some(policy)));
    assert_eq!(store.accessibility_of("blob"), Some(policy));
}

#[test]
fn second_write_updates_in_place() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");

    assert!(store.set_bytes("k", b"v1", None));
    assert!(store.set_bytes("k", b"v2", None));

    assert_eq!(store.bytes("k", None).as_deref(), Some(b"v2".as_slice()));
    // Exactly one record, not a duplicate pair.
    assert_eq!(backend.len(), 1);
}

#[test]
fn deleted_keys_stay_gone() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");

    store.set_bytes("k", b"v", None);
    assert!(store.remove("k", None));
    assert_eq!(store.bytes("k", None), None);
    assert!(!store.contains("k", None));
}

#[test]
fn namespaces_are_isolated() {
    let backend = shared_backend();
    let alpha = store_on(&backend, "com.example.alpha");
    let beta = store_on(&backend, "com.example.beta");

    alpha.set_bytes("k", b"alpha", None);
    beta.set_bytes("k", b"beta", None);

    assert_eq!(alpha.bytes("k", None).as_deref(), Some(b"alpha".as_slice()));
    assert_eq!(beta.bytes("k", None).as_deref(), Some(b"beta".as_slice()));

    // A scoped clear never crosses the namespace boundary.
    assert!(alpha.remove_all());
    assert_eq!(alpha.bytes("k", None), None);
    assert_eq!(beta.bytes("k", None).as_deref(), Some(b"beta".as_slice()));
}

#[test]
fn sharing_groups_partition_a_shared_service() {
    let backend = shared_backend();
    let plain = store_on(&backend, "com.example.app");
    let grouped = CredentialStore::with_sharing_group(
        Arc::clone(&backend) as Arc<dyn SecureStore>,
        "com.example.app",
        "group.example.team",
    );

    plain.set_bytes("k", b"mine", None);
    grouped.set_bytes("k", b"ours", None);

    assert_eq!(grouped.bytes("k", None).as_deref(), Some(b"ours".as_slice()));
    assert!(grouped.remove_all());
    assert_eq!(grouped.bytes("k", None), None);
    assert_eq!(plain.bytes("k", None).as_deref(), Some(b"mine".as_slice()));
}

#[test]
fn keys_enumerates_only_this_namespace() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");
    let other = store_on(&backend, "com.example.other");

    for key in ["a", "b", "c"] {
        store.set_bytes(key, b"v", None);
    }
    other.set_bytes("z", b"v", None);

    let expected: HashSet<String> = ["a", "b", "c"].map(String::from).into_iter().collect();
    assert_eq!(store.keys(), expected);
    assert_eq!(other.keys().len(), 1);
}

#[test]
fn keys_skips_records_with_non_utf8_identities() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");
    store.set_bytes("good", b"v", None);

    // Plant a record whose identity bytes are not valid UTF-8, as a
    // foreign writer could.
    let mut rogue = credstore::ItemQuery::for_key("com.example.app", None, "x", None);
    rogue.generic = Some(vec![0xFF, 0xFE]);
    rogue.account = Some(vec![0xFF, 0xFE]);
    backend.insert(&rogue, b"v").expect("rogue insert");

    let keys = store.keys();
    assert_eq!(keys, HashSet::from(["good".to_owned()]));
}

#[test]
fn keys_on_an_empty_namespace_is_empty() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");
    assert!(store.keys().is_empty());
}

#[test]
fn default_policy_applies_to_insert_only() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");

    // A write without an explicit policy lands with the default.
    assert!(store.set_bytes("k", b"v1", None));
    assert_eq!(store.accessibility_of("k"), Some(Accessibility::WhenUnlocked));

    // The duplicate fallback rebuilds the descriptor without forcing a
    // default, so the overwrite succeeds and the stored policy stays.
    assert!(store.set_bytes("k", b"v2", None));
    assert_eq!(store.bytes("k", None).as_deref(), Some(b"v2".as_slice()));
    assert_eq!(store.accessibility_of("k"), Some(Accessibility::WhenUnlocked));
}

#[test]
fn explicit_policy_write_conflicting_with_stored_policy_fails() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");

    store.set_bytes("k", b"v1", Some(Accessibility::WhenUnlocked));

    // The retry-as-update reuses the explicit descriptor, which does
    // not match the record stored under a different policy.
    assert!(!store.set_bytes("k", b"v2", Some(Accessibility::AfterFirstUnlock)));
    assert_eq!(store.bytes("k", None).as_deref(), Some(b"v1".as_slice()));
}

#[test]
fn wipe_clears_foreign_namespaces_too() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");
    let other = store_on(&backend, "com.example.other");

    store.set_bytes("k", b"v", None);
    other.set_bytes("k", b"v", None);

    store.wipe();
    assert!(backend.is_empty());
}

#[test]
fn numeric_codec_wraps_bare_scalars() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");

    assert!(store.set_numeric("count", 7_u32, None));
    assert_eq!(store.numeric::<u32>("count", None), Some(7));

    // The stored payload is a one-element sequence, visible through
    // the generic structured accessor.
    assert_eq!(store.structured::<Vec<u32>>("count", None), Some(vec![7]));
}

#[test]
fn malformed_stored_bytes_read_back_as_absent() {
    let backend = shared_backend();
    let store = store_on(&backend, "com.example.app");

    store.set_bytes("k", &[0x80, 0x81], None);
    assert_eq!(store.numeric::<i32>("k", None), None);
    assert_eq!(store.structured::<Vec<String>>("k", None), None);
    assert_eq!(store.text("k", None), None);
    // The record itself still exists.
    assert!(store.contains("k", None));
}

#[test]
fn process_default_store_installs_once() {
    let backend = shared_backend();
    assert!(default_store().is_none());

    assert!(install_default_store(store_on(&backend, "com.example.default")));
    let shared = default_store().expect("default store was just installed");
    assert_eq!(shared.service_namespace(), "com.example.default");

    // Second install is refused; the original instance survives.
    assert!(!install_default_store(store_on(&backend, "com.example.other")));
    let still = default_store().expect("default store persists");
    assert_eq!(still.service_namespace(), "com.example.default");
}
