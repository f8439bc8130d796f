//! Thin typed accessor for a platform-managed secure credential store.
//!
//! Secrets are byte payloads addressed by a string key inside a
//! service namespace (and optionally a cross-application sharing
//! group), each carrying an [`Accessibility`] policy that tells the
//! platform store when it may release the plaintext. The store itself
//! — key wrapping, hardware-backed encryption, policy enforcement,
//! persistence — is an external collaborator behind the
//! [`SecureStore`] trait; this crate only builds queries, maps
//! results, and layers a typed codec over raw bytes.
//!
//! Writes are add-or-update: an insert that collides with an existing
//! record of the same identity is retried as an update, so callers see
//! a plain "set" operation. All expected failures (missing key,
//! undecodable payload, store errors) collapse to `false`/`None`;
//! nothing here panics or raises for them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use credstore::{Accessibility, CredentialStore, MemoryStore};
//!
//! let store = CredentialStore::new(Arc::new(MemoryStore::new()), "com.example.app");
//!
//! assert!(store.set_text("api-token", "hunter2", None));
//! assert_eq!(store.text("api-token", None).as_deref(), Some("hunter2"));
//!
//! // Writes without an explicit policy default to `WhenUnlocked`.
//! assert_eq!(
//!     store.accessibility_of("api-token"),
//!     Some(Accessibility::WhenUnlocked)
//! );
//!
//! assert!(store.remove("api-token", None));
//! assert!(!store.contains("api-token", None));
//! ```
//!
//! # Concurrency
//!
//! Every operation is a single synchronous round trip. The crate holds
//! no client-side locks and no cache; concurrent calls into one
//! [`CredentialStore`] are safe exactly to the extent the backing
//! [`SecureStore`] is.

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod backend;
mod codec;
mod memory;
mod policy;
mod query;
mod store;

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod apple;

pub use backend::{ItemAttributes, SecureStore, StoreError};
pub use codec::Numeric;
pub use memory::MemoryStore;
pub use policy::Accessibility;
pub use query::{ItemClass, ItemQuery, MatchLimit};
pub use store::{
    default_service_namespace, default_store, install_default_store, CredentialStore,
};

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use apple::AppleKeychain;
