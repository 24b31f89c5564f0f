//! Name hashing.
//!
//! Bones, scene nodes and animation tracks are matched by the hash of their
//! name rather than by string comparison. The hash is xxh3 over the UTF-8
//! bytes, so it is stable across runs and platforms.

use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// 64-bit hash of a name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringHash(u64);

impl StringHash {
    /// Hashes `name`.
    #[inline]
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(xxh3_64(name.as_bytes()))
    }

    /// Wraps an already computed hash value.
    #[inline]
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl Default for StringHash {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for StringHash {
    #[inline]
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&String> for StringHash {
    #[inline]
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringHash({:016x})", self.0)
    }
}
