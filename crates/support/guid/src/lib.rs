/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

#![allow(unknown_lints)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "serde_support")]
mod serde_support;

#[cfg(feature = "rusqlite_support")]
mod rusqlite_support;

use std::{fmt, ops, str};

/// Represents an opaque identifier used throughout the engine - a replica's
/// `origin`, a subscription id, and the (single-column) value of a row's
/// primary key all use this type.
///
/// It has several benefits over using a bare `String`:
///
/// 1. It's more explicit about what is being stored, and helps prevent bugs
///    where an arbitrary string is passed to a function expecting an id.
///
/// 2. Guids are guaranteed to be immutable.
///
/// 3. It's optimized for the short ids (UUIDs, base64url ids) that are common
///    in practice: such values do not incur any heap allocation and are
///    stored inline.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Guid(Repr);

#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
enum Repr {
    // see FastGuid for invariants
    Fast(FastGuid),
    // invariants:
    // - _0.len() <= MAX_GUID_LEN
    // - _0.bytes().all(|&b| Guid::is_valid_byte(b))
    Slow(String),
}

#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
struct FastGuid {
    // invariants:
    // - len <= MAX_FAST_GUID_LEN.
    // - data[0..len].iter().all(|&b| Guid::is_valid_byte(b))
    len: u8,
    data: [u8; MAX_FAST_GUID_LEN],
}

// A standard UUID string (36 bytes, with hyphens) is the most common value
// stored here, so we size the inline buffer to fit one without falling back
// to the heap.
const MAX_FAST_GUID_LEN: usize = 36;

impl FastGuid {
    #[inline]
    fn from_slice(bytes: &[u8]) -> Self {
        debug_assert!(
            can_use_fast(bytes),
            "bug: caller failed to check can_use_fast: {:?}",
            bytes
        );
        let mut data = [0u8; MAX_FAST_GUID_LEN];
        data[0..bytes.len()].copy_from_slice(bytes);
        FastGuid {
            len: bytes.len() as u8,
            data,
        }
    }

    #[inline]
    fn as_str(&self) -> &str {
        debug_assert!(
            can_use_fast(self.bytes()),
            "bug: FastGuid bytes became invalid: {:?}",
            self.bytes()
        );
        str::from_utf8(self.bytes()).unwrap()
    }

    #[inline]
    fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        &self.data[0..self.len()]
    }
}

#[inline]
fn can_use_fast<T: ?Sized + AsRef<[u8]>>(bytes: &T) -> bool {
    bytes.as_ref().len() <= MAX_FAST_GUID_LEN
}

impl Guid {
    #[inline]
    fn from_string(s: String) -> Self {
        Guid::from_vec(s.into_bytes())
    }

    #[inline]
    fn from_slice(b: &[u8]) -> Self {
        if can_use_fast(b) {
            Guid(Repr::Fast(FastGuid::from_slice(b)))
        } else {
            debug_assert!(b.iter().all(|v| v.is_ascii()));
            Guid(Repr::Slow(String::from_utf8(b.into()).unwrap()))
        }
    }

    #[inline]
    fn from_vec(v: Vec<u8>) -> Self {
        if can_use_fast(&v) {
            Guid(Repr::Fast(FastGuid::from_slice(&v)))
        } else {
            debug_assert!(v.iter().all(|b| b.is_ascii()));
            Guid(Repr::Slow(String::from_utf8(v).unwrap()))
        }
    }

    /// Generates a new random guid suitable for use as a replica `origin`.
    #[cfg(feature = "random")]
    pub fn random() -> Self {
        Guid::from(uuid::Uuid::new_v4().to_string())
    }

    /// Get the data backing this `Guid` as a `&[u8]`.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.0 {
            Repr::Fast(rep) => rep.bytes(),
            Repr::Slow(rep) => rep.as_ref(),
        }
    }

    /// Get the data backing this `Guid` as a `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        match &self.0 {
            Repr::Fast(rep) => rep.as_str(),
            Repr::Slow(rep) => rep.as_ref(),
        }
    }

    /// Convert this `Guid` into a `String`, consuming it in the process.
    #[inline]
    pub fn into_string(self) -> String {
        match self.0 {
            Repr::Fast(rep) => rep.as_str().into(),
            Repr::Slow(rep) => rep,
        }
    }

    /// Returns true if the byte `b` is a character that is allowed to appear in a guid.
    #[inline]
    pub fn is_valid_byte(b: u8) -> bool {
        (b' '..=b'~').contains(&b)
    }
}

impl<'a> From<&'a str> for Guid {
    #[inline]
    fn from(s: &'a str) -> Guid {
        Guid::from_slice(s.as_ref())
    }
}

impl<'a> From<&'a [u8]> for Guid {
    #[inline]
    fn from(s: &'a [u8]) -> Guid {
        Guid::from_slice(s)
    }
}

impl From<String> for Guid {
    #[inline]
    fn from(s: String) -> Guid {
        Guid::from_string(s)
    }
}

impl From<Vec<u8>> for Guid {
    #[inline]
    fn from(v: Vec<u8>) -> Guid {
        Guid::from_vec(v)
    }
}

impl From<Guid> for String {
    #[inline]
    fn from(guid: Guid) -> String {
        guid.into_string()
    }
}

impl From<Guid> for Vec<u8> {
    #[inline]
    fn from(guid: Guid) -> Vec<u8> {
        guid.into_string().into_bytes()
    }
}

impl AsRef<str> for Guid {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<[u8]> for Guid {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl ops::Deref for Guid {
    type Target = str;
    #[inline]
    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({:?})", self.as_str())
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_str(), f)
    }
}

macro_rules! impl_guid_eq {
    ($($other: ty),+) => {$(
        impl<'a> PartialEq<$other> for Guid {
            #[inline]
            fn eq(&self, other: &$other) -> bool {
                PartialEq::eq(AsRef::<[u8]>::as_ref(self), AsRef::<[u8]>::as_ref(other))
            }
        }

        impl<'a> PartialEq<Guid> for $other {
            #[inline]
            fn eq(&self, other: &Guid) -> bool {
                PartialEq::eq(AsRef::<[u8]>::as_ref(self), AsRef::<[u8]>::as_ref(other))
            }
        }
    )+}
}

impl_guid_eq![str, &'a str, String, [u8], &'a [u8], Vec<u8>];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_comparison() {
        assert_eq!(Guid::from("abcdabcdabcd"), "abcdabcdabcd");
        assert_ne!(Guid::from("abcdabcdabcd".to_string()), "ABCDabcdabcd");
        assert_eq!(Guid::from("abcdabcdabcd"), &b"abcdabcdabcd"[..]);
        assert_eq!(
            Guid::from(b"abcdabcdabcd"[..].to_owned()),
            "abcdabcdabcd".to_string()
        );
    }

    #[test]
    fn test_long_guid_round_trips() {
        let long = "01234567-89ab-cdef-0123-456789abcdef";
        assert_eq!(Guid::from(long).as_str(), long);
    }

    #[cfg(feature = "random")]
    #[test]
    fn test_random_is_unique() {
        assert_ne!(Guid::random(), Guid::random());
    }
}
