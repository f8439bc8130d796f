//! The boundary to the platform's secure store.
//!
//! Implementations own persistence, encryption, and accessibility
//! enforcement; this crate only builds descriptors and maps results.
//! The facade collapses every error to `false`/`None` at the public
//! surface, so the variants below drive internal control flow (the
//! duplicate-insert fallback) and diagnostics only.

use thiserror::Error;

use crate::query::ItemQuery;

/// Errors reported by a [`SecureStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert collided with an existing record of the same
    /// identity. Not terminal: the facade retries the write as an
    /// update.
    #[error("an item with this identity already exists")]
    DuplicateItem,

    /// No record matched the descriptor.
    #[error("no item matched the query")]
    NotFound,

    /// A value could not be converted to bytes. Raised entirely
    /// in-process; no store call was attempted.
    #[error("could not encode value: {0}")]
    Encoding(String),

    /// Any other store-reported failure (access denied, malformed
    /// query, ...). The native status survives in the message only.
    #[error("secure store call failed: {0}")]
    Store(String),
}

/// Attribute row returned by [`SecureStore::fetch_attributes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAttributes {
    /// The record's account identity bytes, if the store reported them.
    pub account: Option<Vec<u8>>,
    /// The record's stored accessibility wire token, verbatim. Reverse
    /// mapping to [`Accessibility`](crate::Accessibility) happens above
    /// this boundary so an unrecognised token stays representable.
    pub accessibility: Option<String>,
}

/// A platform-managed secure store, addressed through [`ItemQuery`]
/// descriptors.
///
/// Every call is one synchronous round trip. The crate performs no
/// client-side locking, caching, or batching on top; concurrent use is
/// exactly as safe as the implementation itself.
pub trait SecureStore: Send + Sync {
    /// Inserts a new record described by `query` with `payload` as its
    /// secret bytes. The descriptor doubles as the record's attributes:
    /// identity, namespace, sharing group, and accessibility are taken
    /// from it verbatim.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateItem`] if a record with the same identity
    /// already exists in the descriptor's scope, [`StoreError::Store`]
    /// for any other failure.
    fn insert(&self, query: &ItemQuery, payload: &[u8]) -> Result<(), StoreError>;

    /// Replaces the payload of every record matching `query`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if nothing matched,
    /// [`StoreError::Store`] for any other failure.
    fn update(&self, query: &ItemQuery, payload: &[u8]) -> Result<(), StoreError>;

    /// Fetches the secret bytes of the first record matching `query`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if nothing matched (or the record is
    /// currently inaccessible under its policy), [`StoreError::Store`]
    /// for any other failure.
    fn fetch_payload(&self, query: &ItemQuery) -> Result<Vec<u8>, StoreError>;

    /// Fetches attribute rows — not payloads — for records matching
    /// `query`, honouring the descriptor's match limit.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if nothing matched,
    /// [`StoreError::Store`] for any other failure.
    fn fetch_attributes(&self, query: &ItemQuery) -> Result<Vec<ItemAttributes>, StoreError>;

    /// Deletes every record matching `query`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if nothing matched,
    /// [`StoreError::Store`] for any other failure.
    fn delete(&self, query: &ItemQuery) -> Result<(), StoreError>;
}
