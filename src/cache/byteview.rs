//! Immutable Value Snapshot
//!
//! A `ByteView` owns a private copy of the bytes returned by the miss callback
//! or a peer. Cloning a view is cheap (shared `Bytes`), but no clone can ever
//! observe a mutation: callers only get read-only slices or owned copies.

use std::fmt;

use bytes::Bytes;

use super::lru::Value;

/// Read-only view over cached bytes
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    b: Bytes,
}

impl ByteView {
    /// Take a defensive copy of `data`
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            b: Bytes::copy_from_slice(data),
        }
    }

    /// Wrap bytes that this crate already owns exclusively
    pub(crate) fn from_owned(b: Bytes) -> Self {
        Self { b }
    }

    /// Number of bytes in the view
    #[inline]
    pub fn len(&self) -> usize {
        self.b.len()
    }

    /// True if the view holds zero bytes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }

    /// Owned copy of the bytes
    pub fn byte_slice(&self) -> Vec<u8> {
        self.b.to_vec()
    }

    /// Borrow the bytes without copying
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.b
    }

    /// Cheap handle for zero-copy writes (e.g. HTTP bodies)
    pub fn to_bytes(&self) -> Bytes {
        self.b.clone()
    }

    /// String view of the bytes; invalid UTF-8 is replaced
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.b).into_owned()
    }
}

impl Value for ByteView {
    fn len(&self) -> usize {
        self.b.len()
    }
}

impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.b))
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView").field("len", &self.b.len()).finish()
    }
}

impl From<&[u8]> for ByteView {
    fn from(data: &[u8]) -> Self {
        Self::copy_from_slice(data)
    }
}

impl From<&str> for ByteView {
    fn from(data: &str) -> Self {
        Self::copy_from_slice(data.as_bytes())
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.b
    }
}
