//! Ordered multi-value maps and the parameter types stored in them.
//!
//! A [`MultiValueMap`] keeps every `(key, value)` pair in the order it was
//! added. Values sharing a key are grouped on lookup, so a key may own any
//! number of values:
//!
//! ```
//! use reqparam_core::{ParamMap, ParamText, ParamValue};
//!
//! let mut map = ParamMap::new();
//! map.add(ParamText::from("color"), ParamValue::from("red"));
//! map.add(ParamText::from("size"), ParamValue::from("xl"));
//! map.add(ParamText::from("color"), ParamValue::from("blue"));
//!
//! let colors: Vec<_> = map.get_all("color").collect();
//! assert_eq!(colors, ["red", "blue"]);
//! assert_eq!(map.keys(), ["color", "size"]);
//! ```

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::multipart::UploadFile;

/// Map of parameter names to parameter values.
pub type ParamMap = MultiValueMap<ParamText, ParamValue>;

/// Ordered key to multiple-values container.
///
/// Storage is a flat list of pairs; lookups scan it. Parameter sets are
/// small, and the flat list keeps add order exact.
#[derive(Clone, PartialEq, Eq)]
pub struct MultiValueMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for MultiValueMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K, V> MultiValueMap<K, V> {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with room for `capacity` pairs.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a value for `key` after any values it already has.
    pub fn add(&mut self, key: K, value: V) {
        self.entries.push((key, value));
    }

    /// Number of stored pairs (not distinct keys).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all pairs in add order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// Iterate over all values in add order, regardless of key.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Remove every pair.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: PartialEq, V> MultiValueMap<K, V> {
    /// All values added for `key`, in add order.
    pub fn get_all<Q>(&self, key: &Q) -> impl Iterator<Item = &V>
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// The first value added for `key`.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns true if at least one value exists for `key`.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove and return every value for `key`, in add order.
    pub fn remove<Q>(&mut self, key: &Q) -> Vec<V>
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for (k, v) in self.entries.drain(..) {
            if k == *key {
                removed.push(v);
            } else {
                kept.push((k, v));
            }
        }
        self.entries = kept;
        removed
    }
}

impl<K: Hash + Eq, V> MultiValueMap<K, V> {
    /// Each distinct key once, in first-insertion order.
    ///
    /// Linear in the number of pairs.
    #[must_use]
    pub fn keys(&self) -> Vec<&K> {
        let mut seen: HashSet<&K> = HashSet::with_capacity(self.entries.len());
        self.entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| seen.insert(*key))
            .collect()
    }
}

impl<K: PartialEq + Clone, V> MultiValueMap<K, V> {
    /// Replace all values for `key` with `values`.
    ///
    /// The new values take the place of the key's first prior value, so
    /// [`keys`](Self::keys) order is unchanged. A key with no prior values is
    /// appended. An empty `values` removes the key.
    pub fn set<I>(&mut self, key: K, values: I)
    where
        I: IntoIterator<Item = V>,
    {
        let position = self.entries.iter().position(|(k, _)| *k == key);
        self.entries.retain(|(k, _)| *k != key);
        let at = position.unwrap_or(self.entries.len());
        let replacement: Vec<(K, V)> = values.into_iter().map(|v| (key.clone(), v)).collect();
        self.entries.splice(at..at, replacement);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for MultiValueMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for MultiValueMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for MultiValueMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<K, V> IntoIterator for MultiValueMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a MultiValueMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over the pairs of a [`MultiValueMap`].
#[derive(Debug, Clone)]
pub struct Iter<'a, K, V> {
    inner: std::slice::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

// ============================================================================
// Parameter text
// ============================================================================

/// A parameter name or field value.
///
/// Holds bytes exactly as they were percent-decoded from the wire. After
/// charset normalisation the bytes are always UTF-8.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamText(Vec<u8>);

impl ParamText {
    /// Wrap raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The underlying bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the underlying bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// The text as `&str`, if the bytes are UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// The text with invalid UTF-8 replaced by U+FFFD.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ParamText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl fmt::Display for ParamText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl From<&str> for ParamText {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for ParamText {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&[u8]> for ParamText {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for ParamText {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<Cow<'_, [u8]>> for ParamText {
    fn from(bytes: Cow<'_, [u8]>) -> Self {
        Self(bytes.into_owned())
    }
}

impl AsRef<[u8]> for ParamText {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<str> for ParamText {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for ParamText {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<[u8]> for ParamText {
    fn eq(&self, other: &[u8]) -> bool {
        self.0 == other
    }
}

// ============================================================================
// Parameter values
// ============================================================================

/// One value of a parameter: field text or an uploaded file.
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// Plain field text.
    Text(ParamText),
    /// A multipart file part. Shared between every map that holds it; the
    /// transient storage goes away with the last reference.
    File(Arc<UploadFile>),
}

impl ParamValue {
    /// The field text, if this is not a file.
    #[must_use]
    pub fn text(&self) -> Option<&ParamText> {
        match self {
            Self::Text(text) => Some(text),
            Self::File(_) => None,
        }
    }

    /// The field text as `&str`, if this is UTF-8 text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.text().and_then(ParamText::as_str)
    }

    /// The field text bytes, if this is not a file.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.text().map(ParamText::as_bytes)
    }

    /// The uploaded file, if this is a file part.
    #[must_use]
    pub fn file(&self) -> Option<&Arc<UploadFile>> {
        match self {
            Self::Text(_) => None,
            Self::File(file) => Some(file),
        }
    }

    /// Returns true if this value is an uploaded file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::File(a), Self::File(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq<str> for ParamValue {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == Some(other.as_bytes())
    }
}

impl PartialEq<&str> for ParamValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == Some(other.as_bytes())
    }
}

impl From<ParamText> for ParamValue {
    fn from(text: ParamText) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Text(s.into())
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Text(bytes.into())
    }
}

impl From<UploadFile> for ParamValue {
    fn from(file: UploadFile) -> Self {
        Self::File(Arc::new(file))
    }
}
