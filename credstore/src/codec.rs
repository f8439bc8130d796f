//! Typed encode/decode layer over the byte-level facade.
//!
//! Entry points are selected explicitly by the caller rather than by
//! overload resolution: text, numeric scalars, and general structured
//! values each get their own pair of methods. Every decode failure
//! yields `None`, indistinguishable from not-found; encode failures
//! return `false` without any store call.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::policy::Accessibility;
use crate::store::CredentialStore;

mod sealed {
    pub trait Sealed {}
}

/// Marker for the scalar numeric types the codec stores wrapped in a
/// one-element sequence.
///
/// The wrapping exists because the payload format never stored bare
/// numeric scalars; readers of existing records expect the sequence,
/// so both sides of the asymmetry are preserved: numerics are wrapped,
/// general structured values are not.
pub trait Numeric: Serialize + DeserializeOwned + Copy + sealed::Sealed {}

macro_rules! numeric_impl {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Numeric for $ty {}
        )*
    };
}

numeric_impl!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize, f32, f64);

impl CredentialStore {
    /// Stores a UTF-8 string under `key`.
    pub fn set_text(&self, key: &str, value: &str, accessibility: Option<Accessibility>) -> bool {
        self.set_bytes(key, value.as_bytes(), accessibility)
    }

    /// The string stored under `key`, or `None` if absent or not valid
    /// UTF-8.
    #[must_use]
    pub fn text(&self, key: &str, accessibility: Option<Accessibility>) -> Option<String> {
        self.bytes(key, accessibility)
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Stores a numeric scalar under `key`, wrapped in a one-element
    /// sequence before serialization.
    pub fn set_numeric<T: Numeric>(
        &self,
        key: &str,
        value: T,
        accessibility: Option<Accessibility>,
    ) -> bool {
        match serde_json::to_vec(&[value]) {
            Ok(bytes) => self.set_bytes(key, &bytes, accessibility),
            Err(err) => {
                debug!("numeric encode failed: {err}");
                false
            }
        }
    }

    /// The numeric scalar stored under `key`: decodes the stored
    /// one-element sequence and returns its first element. `None` if
    /// absent or the payload does not decode.
    #[must_use]
    pub fn numeric<T: Numeric>(&self, key: &str, accessibility: Option<Accessibility>) -> Option<T> {
        let bytes = self.bytes(key, accessibility)?;
        serde_json::from_slice::<Vec<T>>(&bytes)
            .ok()?
            .first()
            .copied()
    }

    /// Stores any serializable value under `key`, encoded directly as
    /// a single structured payload (no sequence wrapping).
    pub fn set_structured<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        accessibility: Option<Accessibility>,
    ) -> bool {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set_bytes(key, &bytes, accessibility),
            Err(err) => {
                debug!("structured encode failed: {err}");
                false
            }
        }
    }

    /// The structured value stored under `key`, or `None` if absent or
    /// the payload does not decode as `T`.
    #[must_use]
    pub fn structured<T: DeserializeOwned>(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
    ) -> Option<T> {
        let bytes = self.bytes(key, accessibility)?;
        serde_json::from_slice(&bytes).ok()
    }
}
