//! Accessibility policies for stored secrets.
//!
//! A policy constrains when the platform store is permitted to release
//! a secret's plaintext. Each policy corresponds to exactly one wire
//! token understood by the store; the mapping is a bijection, and
//! reverse lookup of an unrecognised token yields `None` rather than
//! trapping.

use strum::{EnumIter, IntoEnumIterator};

/// When the platform store may release a secret.
///
/// The `...ThisDeviceOnly` variants additionally exclude the secret
/// from backups and from migration to another device. Requesting a
/// policy is all this crate does — enforcement is entirely the store's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Accessibility {
    /// Accessible once the device has been unlocked at least once
    /// since boot, including while it is subsequently locked.
    AfterFirstUnlock,
    /// Like [`Self::AfterFirstUnlock`], but never leaves this device.
    AfterFirstUnlockThisDeviceOnly,
    /// Accessible only while a passcode is set on this device.
    /// Removing the passcode destroys the secret.
    WhenPasscodeSetThisDeviceOnly,
    /// Accessible only while the device is unlocked. This is the
    /// policy attached to writes that do not request one.
    WhenUnlocked,
    /// Like [`Self::WhenUnlocked`], but never leaves this device.
    WhenUnlockedThisDeviceOnly,
}

impl Accessibility {
    /// The store's wire token for this policy.
    ///
    /// These are the raw attribute values the platform store records
    /// on each item, so a token read back from an item's attributes
    /// can be fed straight into [`Self::from_token`].
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::AfterFirstUnlock => "ck",
            Self::AfterFirstUnlockThisDeviceOnly => "cku",
            Self::WhenPasscodeSetThisDeviceOnly => "akpu",
            Self::WhenUnlocked => "ak",
            Self::WhenUnlockedThisDeviceOnly => "aku",
        }
    }

    /// Reverse side of the bijection: the policy a wire token stands
    /// for, or `None` if the token is not one this crate knows.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::iter().find(|policy| policy.token() == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_mapping_is_a_bijection() {
        for policy in Accessibility::iter() {
            assert_eq!(Accessibility::from_token(policy.token()), Some(policy));
        }
        let tokens: std::collections::HashSet<_> =
            Accessibility::iter().map(Accessibility::token).collect();
        assert_eq!(tokens.len(), Accessibility::iter().count());
    }

    #[test]
    fn unknown_token_maps_to_none() {
        assert_eq!(Accessibility::from_token("dk"), None);
        assert_eq!(Accessibility::from_token(""), None);
        assert_eq!(Accessibility::from_token("whenUnlocked"), None);
    }
}
