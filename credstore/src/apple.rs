//! Keychain Services implementation of [`SecureStore`] for Apple
//! targets.
//!
//! Translates [`ItemQuery`] descriptors into the native attribute
//! dictionary and collapses `OSStatus` results into the crate's
//! [`StoreError`] taxonomy. The Keychain itself owns encryption,
//! persistence, and accessibility enforcement; nothing is cached or
//! synchronized on this side.

#![allow(non_upper_case_globals)]

use std::os::raw::c_void;
use std::ptr;

use core_foundation::array::{CFArray, CFArrayGetCount, CFArrayGetValueAtIndex, CFArrayRef};
use core_foundation::base::{CFGetTypeID, CFType, CFTypeRef, OSStatus, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::data::CFData;
use core_foundation::dictionary::{CFDictionary, CFDictionaryGetValue, CFDictionaryRef};
use core_foundation::number::CFNumber;
use core_foundation::string::{CFString, CFStringRef};
use security_framework_sys::access_control::{
    kSecAttrAccessibleAfterFirstUnlock, kSecAttrAccessibleAfterFirstUnlockThisDeviceOnly,
    kSecAttrAccessibleWhenPasscodeSetThisDeviceOnly, kSecAttrAccessibleWhenUnlocked,
    kSecAttrAccessibleWhenUnlockedThisDeviceOnly,
};
use security_framework_sys::base::{errSecDuplicateItem, errSecItemNotFound, errSecSuccess};
use security_framework_sys::item::{
    kSecAttrAccessGroup, kSecAttrAccount, kSecAttrService, kSecClass, kSecClassCertificate,
    kSecClassGenericPassword, kSecClassIdentity, kSecClassInternetPassword, kSecClassKey,
    kSecMatchLimit, kSecMatchLimitAll, kSecReturnAttributes, kSecReturnData, kSecValueData,
};
use security_framework_sys::keychain_item::{
    SecItemAdd, SecItemCopyMatching, SecItemDelete, SecItemUpdate,
};

use crate::backend::{ItemAttributes, SecureStore, StoreError};
use crate::policy::Accessibility;
use crate::query::{ItemClass, ItemQuery, MatchLimit};

// `security-framework-sys` does not declare these two attribute keys.
#[link(name = "Security", kind = "framework")]
extern "C" {
    static kSecAttrGeneric: CFStringRef;
    static kSecAttrAccessible: CFStringRef;
}

/// Collapses an `OSStatus` into the crate's error taxonomy.
fn check(status: OSStatus) -> Result<(), StoreError> {
    match status {
        errSecSuccess => Ok(()),
        errSecDuplicateItem => Err(StoreError::DuplicateItem),
        errSecItemNotFound => Err(StoreError::NotFound),
        other => Err(StoreError::Store(format!("OSStatus {other}"))),
    }
}

fn class_constant(class: ItemClass) -> CFStringRef {
    unsafe {
        match class {
            ItemClass::GenericPassword => kSecClassGenericPassword,
            ItemClass::InternetPassword => kSecClassInternetPassword,
            ItemClass::Certificate => kSecClassCertificate,
            ItemClass::CryptographicKey => kSecClassKey,
            ItemClass::Identity => kSecClassIdentity,
        }
    }
}

fn accessibility_constant(policy: Accessibility) -> CFStringRef {
    unsafe {
        match policy {
            Accessibility::AfterFirstUnlock => kSecAttrAccessibleAfterFirstUnlock,
            Accessibility::AfterFirstUnlockThisDeviceOnly => {
                kSecAttrAccessibleAfterFirstUnlockThisDeviceOnly
            }
            Accessibility::WhenPasscodeSetThisDeviceOnly => {
                kSecAttrAccessibleWhenPasscodeSetThisDeviceOnly
            }
            Accessibility::WhenUnlocked => kSecAttrAccessibleWhenUnlocked,
            Accessibility::WhenUnlockedThisDeviceOnly => kSecAttrAccessibleWhenUnlockedThisDeviceOnly,
        }
    }
}

/// The native value for `kSecMatchLimit`. There is no bound constant
/// for a single match; a count is passed instead, as in
/// `SecItemCopyMatching`'s documented contract.
fn limit_value(limit: MatchLimit) -> CFType {
    match limit {
        MatchLimit::One => CFNumber::from(1).as_CFType(),
        MatchLimit::All => unsafe {
            CFString::wrap_under_get_rule(kSecMatchLimitAll).as_CFType()
        },
    }
}

/// Borrows a `kSec*` constant as a dictionary key.
fn key(constant: CFStringRef) -> CFString {
    unsafe { CFString::wrap_under_get_rule(constant) }
}

/// The native attribute pairs for a descriptor.
fn query_pairs(query: &ItemQuery) -> Vec<(CFString, CFType)> {
    let mut pairs: Vec<(CFString, CFType)> = Vec::new();
    unsafe {
        pairs.push((
            key(kSecClass),
            CFString::wrap_under_get_rule(class_constant(query.class)).as_CFType(),
        ));
        if let Some(service) = &query.service {
            pairs.push((key(kSecAttrService), CFString::new(service).as_CFType()));
        }
        if let Some(group) = &query.sharing_group {
            pairs.push((key(kSecAttrAccessGroup), CFString::new(group).as_CFType()));
        }
        if let Some(generic) = &query.generic {
            pairs.push((key(kSecAttrGeneric), CFData::from_buffer(generic).as_CFType()));
        }
        if let Some(account) = &query.account {
            pairs.push((key(kSecAttrAccount), CFData::from_buffer(account).as_CFType()));
        }
        if let Some(policy) = query.accessibility {
            pairs.push((
                key(kSecAttrAccessible),
                CFString::wrap_under_get_rule(accessibility_constant(policy)).as_CFType(),
            ));
        }
    }
    pairs
}

unsafe fn dictionary_value(dict: CFDictionaryRef, constant: CFStringRef) -> Option<CFTypeRef> {
    let value = CFDictionaryGetValue(dict, constant.cast::<c_void>());
    if value.is_null() {
        None
    } else {
        Some(value.cast())
    }
}

unsafe fn identity_bytes(value: CFTypeRef) -> Option<Vec<u8>> {
    if CFGetTypeID(value) == CFData::type_id() {
        Some(CFData::wrap_under_get_rule(value.cast()).bytes().to_vec())
    } else if CFGetTypeID(value) == CFString::type_id() {
        Some(
            CFString::wrap_under_get_rule(value.cast())
                .to_string()
                .into_bytes(),
        )
    } else {
        None
    }
}

unsafe fn row_from_dictionary(dict: CFDictionaryRef) -> ItemAttributes {
    let account = dictionary_value(dict, kSecAttrAccount).and_then(|value| identity_bytes(value));
    // The accessibility attribute reads back as the constant's raw
    // content, which is exactly the token [`Accessibility`] round-trips.
    let accessibility = dictionary_value(dict, kSecAttrAccessible).and_then(|value| {
        if CFGetTypeID(value) == CFString::type_id() {
            Some(CFString::wrap_under_get_rule(value.cast()).to_string())
        } else {
            None
        }
    });
    ItemAttributes {
        account,
        accessibility,
    }
}

/// The platform Keychain, addressed through `SecItem*`.
///
/// Stateless: every call builds a fresh attribute dictionary and makes
/// one Keychain round trip. The Keychain serializes concurrent access
/// internally.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppleKeychain;

impl AppleKeychain {
    /// Creates a Keychain backend handle.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SecureStore for AppleKeychain {
    fn insert(&self, query: &ItemQuery, payload: &[u8]) -> Result<(), StoreError> {
        let mut pairs = query_pairs(query);
        unsafe {
            pairs.push((key(kSecValueData), CFData::from_buffer(payload).as_CFType()));
            let attributes = CFDictionary::from_CFType_pairs(&pairs);
            check(SecItemAdd(attributes.as_concrete_TypeRef(), ptr::null_mut()))
        }
    }

    fn update(&self, query: &ItemQuery, payload: &[u8]) -> Result<(), StoreError> {
        let lookup = CFDictionary::from_CFType_pairs(&query_pairs(query));
        unsafe {
            let changes = CFDictionary::from_CFType_pairs(&[(
                key(kSecValueData),
                CFData::from_buffer(payload).as_CFType(),
            )]);
            check(SecItemUpdate(
                lookup.as_concrete_TypeRef(),
                changes.as_concrete_TypeRef(),
            ))
        }
    }

    fn fetch_payload(&self, query: &ItemQuery) -> Result<Vec<u8>, StoreError> {
        let mut pairs = query_pairs(query);
        unsafe {
            pairs.push((key(kSecMatchLimit), limit_value(query.limit)));
            pairs.push((key(kSecReturnData), CFBoolean::true_value().as_CFType()));
            let lookup = CFDictionary::from_CFType_pairs(&pairs);

            let mut result: CFTypeRef = ptr::null();
            check(SecItemCopyMatching(
                lookup.as_concrete_TypeRef(),
                &mut result,
            ))?;
            if result.is_null() {
                return Err(StoreError::Store("store returned no payload".to_owned()));
            }
            // Take ownership so the result is released on drop.
            let result = CFType::wrap_under_create_rule(result);
            result
                .downcast::<CFData>()
                .map(|data| data.bytes().to_vec())
                .ok_or_else(|| StoreError::Store("payload has an unexpected type".to_owned()))
        }
    }

    fn fetch_attributes(&self, query: &ItemQuery) -> Result<Vec<ItemAttributes>, StoreError> {
        let mut pairs = query_pairs(query);
        unsafe {
            pairs.push((key(kSecMatchLimit), limit_value(query.limit)));
            pairs.push((key(kSecReturnAttributes), CFBoolean::true_value().as_CFType()));
            let lookup = CFDictionary::from_CFType_pairs(&pairs);

            let mut result: CFTypeRef = ptr::null();
            check(SecItemCopyMatching(
                lookup.as_concrete_TypeRef(),
                &mut result,
            ))?;
            if result.is_null() {
                return Err(StoreError::Store("store returned no attributes".to_owned()));
            }
            let result = CFType::wrap_under_create_rule(result);
            let result_ref = result.as_CFTypeRef();

            // Limit-one queries answer with a bare dictionary,
            // limit-all queries with an array of dictionaries.
            if CFGetTypeID(result_ref) == CFDictionary::<CFString, CFType>::type_id() {
                return Ok(vec![row_from_dictionary(result_ref.cast())]);
            }
            if CFGetTypeID(result_ref) == CFArray::<CFType>::type_id() {
                let array: CFArrayRef = result_ref.cast();
                let count = CFArrayGetCount(array);
                let mut rows = Vec::with_capacity(usize::try_from(count).unwrap_or_default());
                for index in 0..count {
                    let element = CFArrayGetValueAtIndex(array, index);
                    if !element.is_null()
                        && CFGetTypeID(element.cast()) == CFDictionary::<CFString, CFType>::type_id()
                    {
                        rows.push(row_from_dictionary(element.cast()));
                    }
                }
                return Ok(rows);
            }
            Err(StoreError::Store("attributes have an unexpected type".to_owned()))
        }
    }

    fn delete(&self, query: &ItemQuery) -> Result<(), StoreError> {
        let lookup = CFDictionary::from_CFType_pairs(&query_pairs(query));
        unsafe { check(SecItemDelete(lookup.as_concrete_TypeRef())) }
    }
}
