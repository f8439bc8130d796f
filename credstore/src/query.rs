//! Lookup descriptors addressed to the external store.
//!
//! A descriptor is built fresh for every store call and never
//! persisted. Populated fields constrain (or, on insert, describe) the
//! record; absent fields leave the match unconstrained.

use strum::EnumIter;

use crate::policy::Accessibility;

/// Record categories recognised by the external store.
///
/// Secrets written by this crate are always
/// [`ItemClass::GenericPassword`]; the remaining classes exist so the
/// unscoped wipe can sweep every category the store tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ItemClass {
    /// Application passwords and other opaque secrets.
    GenericPassword,
    /// Internet passwords (server credentials).
    InternetPassword,
    /// Certificates.
    Certificate,
    /// Cryptographic keys.
    CryptographicKey,
    /// Identities (a certificate paired with its private key).
    Identity,
}

/// How many matching records a fetch may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLimit {
    /// At most one record.
    One,
    /// Every matching record.
    All,
}

/// An ephemeral descriptor addressing records in the external store.
///
/// The logical key is encoded once as UTF-8 and placed in *both*
/// identity fields, so one logical key maps to one physical record
/// regardless of which identity field the store indexes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    /// Record category.
    pub class: ItemClass,
    /// Service namespace. Absent only on the unscoped wipe sweep.
    pub service: Option<String>,
    /// Cross-application sharing group, when the store is group-scoped.
    pub sharing_group: Option<String>,
    /// "Generic" identity bytes (the UTF-8 encoded key).
    pub generic: Option<Vec<u8>>,
    /// "Account" identity bytes. Always identical to `generic`.
    pub account: Option<Vec<u8>>,
    /// Accessibility policy. Constrains matching on reads and is the
    /// policy recorded on inserts.
    pub accessibility: Option<Accessibility>,
    /// Match cardinality for fetches. Inserts and deletes ignore it.
    pub limit: MatchLimit,
}

impl ItemQuery {
    /// Descriptor addressing the single record for `key` within a
    /// (service, sharing-group) scope.
    #[must_use]
    pub fn for_key(
        service: &str,
        sharing_group: Option<&str>,
        key: &str,
        accessibility: Option<Accessibility>,
    ) -> Self {
        let encoded = key.as_bytes().to_vec();
        Self {
            class: ItemClass::GenericPassword,
            service: Some(service.to_owned()),
            sharing_group: sharing_group.map(str::to_owned),
            generic: Some(encoded.clone()),
            account: Some(encoded),
            accessibility,
            limit: MatchLimit::One,
        }
    }

    /// Descriptor matching every generic-password record in a
    /// (service, sharing-group) scope.
    #[must_use]
    pub fn for_namespace(service: &str, sharing_group: Option<&str>) -> Self {
        Self {
            class: ItemClass::GenericPassword,
            service: Some(service.to_owned()),
            sharing_group: sharing_group.map(str::to_owned),
            generic: None,
            account: None,
            accessibility: None,
            limit: MatchLimit::All,
        }
    }

    /// Descriptor matching every record of `class`, in every namespace
    /// and sharing group. Only the global wipe builds these.
    #[must_use]
    pub const fn for_class(class: ItemClass) -> Self {
        Self {
            class,
            service: None,
            sharing_group: None,
            generic: None,
            account: None,
            accessibility: None,
            limit: MatchLimit::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_descriptor_sets_both_identity_fields() {
        let query = ItemQuery::for_key("com.example.app", None, "token", None);
        assert_eq!(query.generic.as_deref(), Some(b"token".as_slice()));
        assert_eq!(query.account, query.generic);
        assert_eq!(query.class, ItemClass::GenericPassword);
        assert_eq!(query.limit, MatchLimit::One);
        assert!(query.accessibility.is_none());
    }

    #[test]
    fn namespace_descriptor_carries_no_identity() {
        let query = ItemQuery::for_namespace("com.example.app", Some("group.example"));
        assert!(query.generic.is_none());
        assert!(query.account.is_none());
        assert_eq!(query.sharing_group.as_deref(), Some("group.example"));
        assert_eq!(query.limit, MatchLimit::All);
    }

    #[test]
    fn class_descriptor_is_fully_unscoped() {
        let query = ItemQuery::for_class(ItemClass::Certificate);
        assert!(query.service.is_none());
        assert!(query.sharing_group.is_none());
        assert!(query.account.is_none());
    }
}
