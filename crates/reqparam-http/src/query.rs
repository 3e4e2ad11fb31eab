//! Query string decoding.
//!
//! [`QueryString`] wraps the raw query component (never the body) and
//! decodes it with the url-encoded rules into a [`ParamMap`]. An absent or
//! empty query yields an empty map.
//!
//! # Example
//!
//! ```
//! use reqparam_http::QueryString;
//!
//! let qs = QueryString::parse("a=1&b=2&a=3");
//!
//! // Raw access
//! assert_eq!(qs.get("a"), Some("1"));
//!
//! // Decoded multi-value access
//! let params = qs.decode().unwrap();
//! let a_values: Vec<_> = params.get_all("a").collect();
//! assert_eq!(a_values, ["1", "3"]);
//! ```

use reqparam_core::ParamMap;

use crate::urlencoded::{self, PercentDecodeError};

/// A raw query string.
///
/// Accessors other than [`decode`](Self::decode) work on the encoded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryString<'a> {
    raw: &'a str,
}

impl<'a> QueryString<'a> {
    /// Wrap a query string. A leading `?` is ignored.
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw: raw.strip_prefix('?').unwrap_or(raw),
        }
    }

    /// Wrap an optional query string; `None` behaves like `""`.
    #[must_use]
    pub fn from_option(raw: Option<&'a str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    /// Returns true if the query string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the raw query string.
    #[must_use]
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Get the first raw (still encoded) value for a raw key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.pairs().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Check if a raw key exists in the query string.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pairs().any(|(k, _)| k == key)
    }

    /// Iterate over the raw key-value pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        let raw = self.raw;
        urlencoded::pairs(raw.as_bytes()).map(move |(k, v)| {
            // Separators are ASCII, so the splits fall on char boundaries.
            let k_start = k.as_ptr() as usize - raw.as_ptr() as usize;
            let v_start = v.as_ptr() as usize - raw.as_ptr() as usize;
            (
                &raw[k_start..k_start + k.len()],
                &raw[v_start..v_start + v.len()],
            )
        })
    }

    /// Count the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs().count()
    }

    /// Percent-decode every pair into a parameter map.
    pub fn decode(&self) -> Result<ParamMap, PercentDecodeError> {
        urlencoded::decode_pairs(self.raw.as_bytes())
    }
}
