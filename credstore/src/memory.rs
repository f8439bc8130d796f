//! In-memory implementation of [`SecureStore`] for testing.
//!
//! **FOR TESTING ONLY** — records live in a plain process-local table
//! with no encryption and no accessibility *enforcement* (the policy
//! token is recorded and matched, nothing more). It exists so the
//! facade and codec can be exercised without a platform store,
//! mirroring the semantics the real store exhibits: at-most-one record
//! per identity, duplicate-insert rejection, and attribute matching on
//! every populated descriptor field.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use zeroize::Zeroizing;

use crate::backend::{ItemAttributes, SecureStore, StoreError};
use crate::query::{ItemClass, ItemQuery, MatchLimit};

/// Records bucketed by (class, service); the remaining attributes are
/// matched per record.
type Buckets = HashMap<(ItemClass, String), Vec<StoredItem>>;

/// One stored record. On insert the descriptor's fields are taken as
/// the record's attributes, so `sharing_group: None` means "no group",
/// not "any group".
struct StoredItem {
    sharing_group: Option<String>,
    generic: Vec<u8>,
    account: Vec<u8>,
    accessibility: Option<String>,
    payload: Zeroizing<Vec<u8>>,
}

impl StoredItem {
    /// Whether this record satisfies a descriptor's per-record fields.
    /// Populated fields must match exactly; absent fields are
    /// unconstrained. Class and service are matched at the bucket
    /// level by the callers.
    fn matches(&self, query: &ItemQuery) -> bool {
        if let Some(group) = &query.sharing_group {
            if self.sharing_group.as_ref() != Some(group) {
                return false;
            }
        }
        if let Some(generic) = &query.generic {
            if generic != &self.generic {
                return false;
            }
        }
        if let Some(account) = &query.account {
            if account != &self.account {
                return false;
            }
        }
        if let Some(accessibility) = query.accessibility {
            if self.accessibility.as_deref() != Some(accessibility.token()) {
                return false;
            }
        }
        true
    }

    fn attributes(&self) -> ItemAttributes {
        ItemAttributes {
            account: Some(self.account.clone()),
            accessibility: self.accessibility.clone(),
        }
    }
}

/// Checks a bucket key against the descriptor's class and service.
fn bucket_matches(bucket_key: &(ItemClass, String), query: &ItemQuery) -> bool {
    bucket_key.0 == query.class
        && query
            .service
            .as_ref()
            .map_or(true, |wanted| wanted == &bucket_key.1)
}

/// In-memory secure store.
///
/// Payload bytes are wrapped in [`Zeroizing`] so test copies of
/// secrets are wiped when records drop.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<Buckets>,
}

impl MemoryStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records, across every class and service.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().unwrap().values().map(Vec::len).sum()
    }

    /// Whether the store holds no records at all.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every record (useful for test isolation).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.items.write().unwrap().clear();
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, Buckets>, StoreError> {
        self.items
            .read()
            .map_err(|_| StoreError::Store("store lock poisoned".to_owned()))
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, Buckets>, StoreError> {
        self.items
            .write()
            .map_err(|_| StoreError::Store("store lock poisoned".to_owned()))
    }
}

impl SecureStore for MemoryStore {
    fn insert(&self, query: &ItemQuery, payload: &[u8]) -> Result<(), StoreError> {
        let service = query
            .service
            .as_ref()
            .ok_or_else(|| StoreError::Store("insert descriptor is missing a service".to_owned()))?;
        let account = query
            .account
            .as_ref()
            .ok_or_else(|| StoreError::Store("insert descriptor is missing an identity".to_owned()))?;

        let mut items = self.write_guard()?;
        let bucket = items.entry((query.class, service.clone())).or_default();

        let collides = bucket
            .iter()
            .any(|item| item.sharing_group == query.sharing_group && &item.account == account);
        if collides {
            return Err(StoreError::DuplicateItem);
        }

        bucket.push(StoredItem {
            sharing_group: query.sharing_group.clone(),
            generic: query.generic.clone().unwrap_or_else(|| account.clone()),
            account: account.clone(),
            accessibility: query.accessibility.map(|policy| policy.token().to_owned()),
            payload: Zeroizing::new(payload.to_vec()),
        });
        Ok(())
    }

    fn update(&self, query: &ItemQuery, payload: &[u8]) -> Result<(), StoreError> {
        let mut items = self.write_guard()?;
        let mut touched = 0usize;
        for (bucket_key, bucket) in items.iter_mut() {
            if !bucket_matches(bucket_key, query) {
                continue;
            }
            for item in bucket.iter_mut().filter(|item| item.matches(query)) {
                item.payload = Zeroizing::new(payload.to_vec());
                touched += 1;
            }
        }
        if touched == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn fetch_payload(&self, query: &ItemQuery) -> Result<Vec<u8>, StoreError> {
        let items = self.read_guard()?;
        items
            .iter()
            .filter(|(bucket_key, _)| bucket_matches(bucket_key, query))
            .flat_map(|(_, bucket)| bucket.iter())
            .find(|item| item.matches(query))
            .map(|item| item.payload.to_vec())
            .ok_or(StoreError::NotFound)
    }

    fn fetch_attributes(&self, query: &ItemQuery) -> Result<Vec<ItemAttributes>, StoreError> {
        let items = self.read_guard()?;
        let mut rows: Vec<ItemAttributes> = items
            .iter()
            .filter(|(bucket_key, _)| bucket_matches(bucket_key, query))
            .flat_map(|(_, bucket)| bucket.iter())
            .filter(|item| item.matches(query))
            .map(StoredItem::attributes)
            .collect();
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        if query.limit == MatchLimit::One {
            rows.truncate(1);
        }
        Ok(rows)
    }

    fn delete(&self, query: &ItemQuery) -> Result<(), StoreError> {
        let mut items = self.write_guard()?;
        let mut removed = 0usize;
        for (bucket_key, bucket) in items.iter_mut() {
            if !bucket_matches(bucket_key, query) {
                continue;
            }
            let before = bucket.len();
            bucket.retain(|item| !item.matches(query));
            removed += before - bucket.len();
        }
        if removed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
