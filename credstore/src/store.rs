//! The read/write facade over the external secure store.
//!
//! [`CredentialStore`] translates logical (namespace, key, policy)
//! triples into [`ItemQuery`] descriptors, issues the corresponding
//! store calls, and collapses all outcomes to `bool`/`Option` per the
//! crate's uniform surface. The one meaningful control-flow branch
//! lives in [`CredentialStore::set_bytes`]: insert first, retry as an
//! update when the store reports a duplicate, never update first.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use log::{debug, warn};
use strum::IntoEnumIterator;

use crate::backend::{SecureStore, StoreError};
use crate::policy::Accessibility;
use crate::query::{ItemClass, ItemQuery};

/// Namespace used when no executable name can be determined.
const FALLBACK_SERVICE: &str = "credstore";

/// The process-wide default store, installed at most once.
static DEFAULT_STORE: OnceLock<CredentialStore> = OnceLock::new();

/// A namespaced accessor for the platform's secure credential store.
///
/// A store is identified by a service namespace and an optional
/// cross-application sharing group, both immutable after construction.
/// It owns no secret data; every call is a fresh, synchronous round
/// trip to the backend.
///
/// # Thread safety
///
/// The store adds no synchronization of its own — no locking, no
/// caching, no batching. Concurrent calls are exactly as safe as the
/// [`SecureStore`] implementation behind them.
pub struct CredentialStore {
    backend: Arc<dyn SecureStore>,
    service: String,
    sharing_group: Option<String>,
}

impl CredentialStore {
    /// Creates a store scoped to `service`, with no sharing group.
    pub fn new(backend: Arc<dyn SecureStore>, service: impl Into<String>) -> Self {
        Self {
            backend,
            service: service.into(),
            sharing_group: None,
        }
    }

    /// Creates a store scoped to this process's
    /// [`default_service_namespace`], with no sharing group.
    #[must_use]
    pub fn with_default_namespace(backend: Arc<dyn SecureStore>) -> Self {
        Self::new(backend, default_service_namespace())
    }

    /// Creates a store scoped to `service` and a cross-application
    /// sharing group.
    pub fn with_sharing_group(
        backend: Arc<dyn SecureStore>,
        service: impl Into<String>,
        sharing_group: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            service: service.into(),
            sharing_group: Some(sharing_group.into()),
        }
    }

    /// The service namespace this store is scoped to.
    #[must_use]
    pub fn service_namespace(&self) -> &str {
        &self.service
    }

    /// The sharing group this store is scoped to, if any.
    #[must_use]
    pub fn sharing_group(&self) -> Option<&str> {
        self.sharing_group.as_deref()
    }

    /// Descriptor for a single key in this store's scope.
    fn key_query(&self, key: &str, accessibility: Option<Accessibility>) -> ItemQuery {
        ItemQuery::for_key(&self.service, self.sharing_group.as_deref(), key, accessibility)
    }

    /// Descriptor for every record in this store's scope.
    fn scope_query(&self) -> ItemQuery {
        ItemQuery::for_namespace(&self.service, self.sharing_group.as_deref())
    }

    /// Stores `value` under `key`, creating or overwriting the record.
    ///
    /// Attempts an insert first; if the store reports an existing
    /// record with the same identity, retries as an update of that
    /// record. Returns `false` on any other failure.
    pub fn set_bytes(&self, key: &str, value: &[u8], accessibility: Option<Accessibility>) -> bool {
        let mut query = self.key_query(key, accessibility);
        // The default policy is attached to the insert attempt only.
        // The duplicate fallback below rebuilds the descriptor without
        // it, so a retried write never rewrites the stored policy.
        if accessibility.is_none() {
            query.accessibility = Some(Accessibility::WhenUnlocked);
        }
        match self.backend.insert(&query, value) {
            Ok(()) => true,
            Err(StoreError::DuplicateItem) => self.update_bytes(key, value, accessibility),
            Err(err) => {
                debug!("insert failed: {err}");
                false
            }
        }
    }

    /// Replaces the payload of the existing record for `key`.
    ///
    /// Returns `false` if no matching record exists or the store call
    /// fails. Unlike [`Self::set_bytes`], no default policy is forced.
    pub fn update_bytes(
        &self,
        key: &str,
        value: &[u8],
        accessibility: Option<Accessibility>,
    ) -> bool {
        let query = self.key_query(key, accessibility);
        match self.backend.update(&query, value) {
            Ok(()) => true,
            Err(err) => {
                debug!("update failed: {err}");
                false
            }
        }
    }

    /// The raw bytes stored under `key`, or `None` if the record is
    /// absent, inaccessible under its policy, or the store call fails.
    #[must_use]
    pub fn bytes(&self, key: &str, accessibility: Option<Accessibility>) -> Option<Vec<u8>> {
        let query = self.key_query(key, accessibility);
        match self.backend.fetch_payload(&query) {
            Ok(payload) => Some(payload),
            Err(StoreError::NotFound) => None,
            Err(err) => {
                debug!("fetch failed: {err}");
                None
            }
        }
    }

    /// Whether a readable record exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str, accessibility: Option<Accessibility>) -> bool {
        self.bytes(key, accessibility).is_some()
    }

    /// Removes the record for `key`. Returns `true` iff the store
    /// confirms a removal.
    pub fn remove(&self, key: &str, accessibility: Option<Accessibility>) -> bool {
        let query = self.key_query(key, accessibility);
        match self.backend.delete(&query) {
            Ok(()) => true,
            Err(err) => {
                debug!("delete failed: {err}");
                false
            }
        }
    }

    /// Removes every record in this store's (service, sharing-group)
    /// scope. Records written under other namespaces are untouched.
    pub fn remove_all(&self) -> bool {
        match self.backend.delete(&self.scope_query()) {
            Ok(()) => true,
            Err(err) => {
                debug!("scoped delete failed: {err}");
                false
            }
        }
    }

    /// Deletes every record of every category the store recognises,
    /// across all namespaces, ignoring per-category failures.
    ///
    /// # Warning
    ///
    /// This is a deliberate, global bulk operation. It removes entries
    /// this crate — and this application — did not create. Call sites
    /// must opt in knowingly.
    pub fn wipe(&self) {
        warn!("wiping every record in the secure store");
        for class in ItemClass::iter() {
            if let Err(err) = self.backend.delete(&ItemQuery::for_class(class)) {
                debug!("wipe of {class:?} records failed: {err}");
            }
        }
    }

    /// The accessibility policy stored on the record for `key`.
    ///
    /// Returns `None` if the record is absent or its stored policy
    /// token is not one this crate recognises.
    #[must_use]
    pub fn accessibility_of(&self, key: &str) -> Option<Accessibility> {
        let query = self.key_query(key, None);
        let rows = match self.backend.fetch_attributes(&query) {
            Ok(rows) => rows,
            Err(StoreError::NotFound) => return None,
            Err(err) => {
                debug!("attribute fetch failed: {err}");
                return None;
            }
        };
        rows.first()?
            .accessibility
            .as_deref()
            .and_then(Accessibility::from_token)
    }

    /// Every key in this store's (service, sharing-group) scope.
    ///
    /// Records whose identity bytes are not valid UTF-8 are silently
    /// skipped. Failures yield the empty set.
    #[must_use]
    pub fn keys(&self) -> HashSet<String> {
        let rows = match self.backend.fetch_attributes(&self.scope_query()) {
            Ok(rows) => rows,
            Err(StoreError::NotFound) => return HashSet::new(),
            Err(err) => {
                debug!("enumeration failed: {err}");
                return HashSet::new();
            }
        };
        rows.into_iter()
            .filter_map(|row| row.account)
            .filter_map(|bytes| String::from_utf8(bytes).ok())
            .collect()
    }
}

/// Installs `store` as the process-wide default instance.
///
/// The first call wins; later calls leave the existing default in
/// place and return `false`.
pub fn install_default_store(store: CredentialStore) -> bool {
    let installed = DEFAULT_STORE.set(store).is_ok();
    if !installed {
        warn!("a default credential store is already installed");
    }
    installed
}

/// The process-wide default store, if one has been installed.
#[must_use]
pub fn default_store() -> Option<&'static CredentialStore> {
    DEFAULT_STORE.get()
}

/// A service namespace derived from the current executable's name,
/// falling back to a fixed identifier when it cannot be determined.
#[must_use]
pub fn default_service_namespace() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| FALLBACK_SERVICE.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn store() -> (Arc<MemoryStore>, CredentialStore) {
        let backend = Arc::new(MemoryStore::new());
        let store = CredentialStore::new(Arc::clone(&backend) as Arc<dyn SecureStore>, "svc");
        (backend, store)
    }

    #[test]
    fn set_bytes_inserts_fresh_records() {
        let (backend, store) = store();
        assert!(store.set_bytes("k", b"v", None));
        assert_eq!(backend.len(), 1);
        assert_eq!(store.bytes("k", None).as_deref(), Some(b"v".as_slice()));
    }

    #[test]
    fn set_bytes_falls_back_to_update_on_duplicate() {
        let (backend, store) = store();
        assert!(store.set_bytes("k", b"first", None));
        assert!(store.set_bytes("k", b"second", None));
        // Still exactly one record.
        assert_eq!(backend.len(), 1);
        assert_eq!(store.bytes("k", None).as_deref(), Some(b"second".as_slice()));
    }

    #[test]
    fn update_bytes_fails_without_an_existing_record() {
        let (_, store) = store();
        assert!(!store.update_bytes("missing", b"v", None));
    }

    #[test]
    fn remove_reports_whether_anything_was_removed() {
        let (_, store) = store();
        assert!(!store.remove("k", None));
        store.set_bytes("k", b"v", None);
        assert!(store.remove("k", None));
        assert!(!store.contains("k", None));
    }

    #[test]
    fn wipe_sweeps_every_item_class() {
        let (backend, store) = store();
        store.set_bytes("k", b"v", None);
        store.wipe();
        assert!(backend.is_empty());
    }

    #[test]
    fn default_namespace_is_never_empty() {
        assert!(!default_service_namespace().is_empty());
    }

    #[test]
    fn with_default_namespace_scopes_to_the_process_namespace() {
        let backend = Arc::new(MemoryStore::new());
        let store = CredentialStore::with_default_namespace(backend);
        assert_eq!(store.service_namespace(), default_service_namespace());
        assert!(store.sharing_group().is_none());
        assert!(store.set_bytes("k", b"v", None));
        assert_eq!(store.bytes("k", None).as_deref(), Some(b"v".as_slice()));
    }
}
