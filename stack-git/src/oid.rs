//! Git object IDs.

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// An error produced while parsing an object ID.
#[derive(Debug, Error)]
pub enum OidError {
    /// The string was not valid hexadecimal.
    #[error("invalid object id {0:?}: not hexadecimal")]
    NotHex(String),

    /// The string decoded to the all-zeros ID, which doesn't identify a real object.
    #[error("object id {0:?} is the zero id")]
    Zero(String),
}

/// The hash of a Git object which is known not to be the zero hash.
///
/// Git itself uses the zero OID (`0000...0000`) as a sentinel for "no
/// object", e.g. in the old/new columns of `git push`'s update-ref
/// protocol. Keeping that case out of this type means callers don't need
/// to re-check for it everywhere an OID is threaded through.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonZeroOid {
    text: [u8; 40],
}

impl NonZeroOid {
    /// View this OID as a string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.text).expect("OID bytes are always ASCII hex")
    }
}

impl FromStr for NonZeroOid {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 40 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(OidError::NotHex(s.to_owned()));
        }
        if s.bytes().all(|b| b == b'0') {
            return Err(OidError::Zero(s.to_owned()));
        }
        let mut text = [0u8; 40];
        text.copy_from_slice(s.as_bytes());
        Ok(NonZeroOid { text })
    }
}

impl Display for NonZeroOid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Debug for NonZeroOid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl serde::Serialize for NonZeroOid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for NonZeroOid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NonZeroOid::from_str(&s).map_err(serde::de::Error::custom)
    }
}
