//! The host request seen by parameter extraction.
//!
//! Headers are already parsed by the host. Parameter extraction needs only
//! the query string, two header values and the body [`ByteSource`].

use std::collections::HashMap;

use crate::source::ByteSource;

/// The host request contract.
pub trait HostRequest {
    /// Source of the request body.
    type Body: ByteSource + ?Sized;

    /// The query component of the request target, without the leading `?`.
    fn query_string(&self) -> Option<&str>;

    /// A header value by name (case-insensitive).
    fn header(&self, name: &str) -> Option<&str>;

    /// The body source. Bytes read from it are gone for good.
    fn body(&mut self) -> &mut Self::Body;
}

impl<R: HostRequest + ?Sized> HostRequest for &mut R {
    type Body = R::Body;

    fn query_string(&self) -> Option<&str> {
        (**self).query_string()
    }

    fn header(&self, name: &str) -> Option<&str> {
        (**self).header(name)
    }

    fn body(&mut self) -> &mut Self::Body {
        (**self).body()
    }
}

/// HTTP headers collection.
#[derive(Debug, Default, Clone)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    /// Create empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Iterate over all headers as (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A ready-made [`HostRequest`]: query string, headers and a body source.
#[derive(Debug)]
pub struct Request<S> {
    query: Option<String>,
    headers: Headers,
    body: S,
}

impl<S: ByteSource> Request<S> {
    /// Create a request with no query string and no headers.
    #[must_use]
    pub fn new(body: S) -> Self {
        Self {
            query: None,
            headers: Headers::new(),
            body,
        }
    }

    /// Set the query string. A leading `?` is stripped.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = Some(match query.strip_prefix('?') {
            Some(stripped) => stripped.to_string(),
            None => query,
        });
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Get the headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get mutable headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Borrow the body source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.body
    }

    /// Unwrap the body source.
    #[must_use]
    pub fn into_body(self) -> S {
        self.body
    }
}

impl<S: ByteSource> HostRequest for Request<S> {
    type Body = S;

    fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    fn body(&mut self) -> &mut S {
        &mut self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = Request::new(&b""[..])
            .with_header("Content-Type", "text/plain")
            .with_header("CONTENT-LENGTH", "0");

        assert_eq!(request.header("content-type"), Some("text/plain"));
        assert_eq!(request.header("Content-Length"), Some("0"));
        assert_eq!(request.header("accept"), None);
        assert_eq!(request.headers().len(), 2);
    }

    #[test]
    fn query_drops_leading_question_mark() {
        let request = Request::new(&b""[..]).with_query("?a=1");
        assert_eq!(request.query_string(), Some("a=1"));

        let request = Request::new(&b""[..]).with_query("b=2");
        assert_eq!(request.query_string(), Some("b=2"));
    }

    #[test]
    fn missing_query_is_none() {
        let request = Request::new(&b""[..]);
        assert_eq!(request.query_string(), None);
    }
}
