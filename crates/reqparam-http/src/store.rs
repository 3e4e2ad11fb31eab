//! Request-scoped parameter store.
//!
//! [`ParamStore`] owns the per-request cache: declared length and media
//! type, the raw body, the decoded query and body maps, and their merge.
//! Each slot is filled on first access and never recomputed. The body
//! source is read at most once.
//!
//! # Example
//!
//! ```
//! use reqparam_core::{ParamValue, Request};
//! use reqparam_http::{ParamConfig, ParamStore};
//!
//! let mut request = Request::new(&b"a=2&b=3"[..])
//!     .with_query("a=1")
//!     .with_header("Content-Type", "application/x-www-form-urlencoded")
//!     .with_header("Content-Length", "7");
//!
//! let mut store = ParamStore::new(&mut request, ParamConfig::default());
//! let a: Vec<_> = store.param("a").unwrap();
//! assert_eq!(a, [&ParamValue::from("1"), &ParamValue::from("2")]);
//! ```

use std::sync::Arc;

use reqparam_core::{HostRequest, ParamMap, ParamText, ParamValue, UploadFile, normalize};

use crate::body::{BodyError, read_body};
use crate::config::ParamConfig;
use crate::error::ParamError;
use crate::media::decode_body;
use crate::query::QueryString;

/// Compute-once slots for one request.
#[derive(Debug, Default)]
struct RequestCache {
    content_length: Option<usize>,
    content_type: Option<String>,
    raw_body: Option<Vec<u8>>,
    body_failed: bool,
    query: Option<ParamMap>,
    body: Option<ParamMap>,
    merged: Option<ParamMap>,
}

/// Query and body parameters of one request.
///
/// Created per request and dropped with it. Dropping the store releases
/// every spooled upload it still holds.
#[derive(Debug)]
pub struct ParamStore<R> {
    request: R,
    config: ParamConfig,
    cache: RequestCache,
}

impl<R: HostRequest> ParamStore<R> {
    /// Create a store over `request`, usually a `&mut` to the host request.
    #[must_use]
    pub fn new(request: R, config: ParamConfig) -> Self {
        Self {
            request,
            config,
            cache: RequestCache::default(),
        }
    }

    /// The underlying request.
    #[must_use]
    pub fn request(&self) -> &R {
        &self.request
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ParamConfig {
        &self.config
    }

    /// Give the request back, discarding the cache.
    #[must_use]
    pub fn into_request(self) -> R {
        self.request
    }

    /// The declared body length; `0` when the header is absent or empty.
    ///
    /// # Errors
    ///
    /// Returns `ParamError::InvalidContentLength` if the header is not a
    /// non-negative integer.
    pub fn content_length(&mut self) -> Result<usize, ParamError> {
        if let Some(length) = self.cache.content_length {
            return Ok(length);
        }

        let value = self.request.header("content-length").unwrap_or("").trim();
        let length = if value.is_empty() {
            0
        } else {
            value
                .parse()
                .map_err(|_| ParamError::InvalidContentLength {
                    value: value.to_string(),
                })?
        };
        self.cache.content_length = Some(length);
        Ok(length)
    }

    /// The declared media type; empty when the header is absent.
    pub fn content_type(&mut self) -> &str {
        let request = &self.request;
        self.cache
            .content_type
            .get_or_insert_with(|| request.header("content-type").unwrap_or("").to_string())
    }

    /// The raw body, read from the source on first access.
    ///
    /// # Errors
    ///
    /// Returns `ParamError::Body` if reading fails, and
    /// `ParamError::BodyUnavailable` on later calls once the source has been
    /// partly consumed by a failed read.
    pub fn raw_body(&mut self) -> Result<&[u8], ParamError> {
        self.load_raw_body()?;
        Ok(self.cache.raw_body.get_or_insert_with(Vec::new).as_slice())
    }

    /// Parameters from the query string, normalised.
    ///
    /// # Errors
    ///
    /// Returns `ParamError::MalformedQuery` or `ParamError::Decode`.
    pub fn query_params(&mut self) -> Result<&ParamMap, ParamError> {
        if self.cache.query.is_none() {
            let query = QueryString::from_option(self.request.query_string())
                .decode()
                .map_err(|e| ParamError::MalformedQuery {
                    detail: e.to_string(),
                })?;
            self.cache.query = Some(normalize(query, self.config.get_charset())?);
        }
        Ok(self.cache.query.get_or_insert_with(ParamMap::new))
    }

    /// Parameters from the body, normalised.
    ///
    /// # Errors
    ///
    /// Returns any body read, body decoding or charset error.
    pub fn body_params(&mut self) -> Result<&ParamMap, ParamError> {
        if self.cache.body.is_none() {
            self.load_raw_body()?;
            self.content_type();

            let raw = self.cache.raw_body.as_deref().unwrap_or_default();
            let content_type = self.cache.content_type.as_deref().unwrap_or_default();
            let body = decode_body(content_type, raw, &self.config)?;
            self.cache.body = Some(normalize(body, self.config.get_charset())?);
        }
        Ok(self.cache.body.get_or_insert_with(ParamMap::new))
    }

    /// Query parameters followed by body parameters.
    ///
    /// For a name present in both, query values come first.
    ///
    /// # Errors
    ///
    /// See [`query_params`](Self::query_params) and
    /// [`body_params`](Self::body_params).
    pub fn params(&mut self) -> Result<&ParamMap, ParamError> {
        if self.cache.merged.is_none() {
            let mut merged = ParamMap::new();
            merged.extend(self.query_params()?.iter().map(clone_pair));
            merged.extend(self.body_params()?.iter().map(clone_pair));
            self.cache.merged = Some(merged);
        }
        Ok(self.cache.merged.get_or_insert_with(ParamMap::new))
    }

    /// Distinct parameter names, in first-appearance order.
    ///
    /// # Errors
    ///
    /// See [`params`](Self::params).
    pub fn param_names(&mut self) -> Result<Vec<&ParamText>, ParamError> {
        Ok(self.params()?.keys())
    }

    /// Every value of `name`; empty if there is none.
    ///
    /// # Errors
    ///
    /// See [`params`](Self::params).
    pub fn param(&mut self, name: &str) -> Result<Vec<&ParamValue>, ParamError> {
        Ok(self.params()?.get_all(name).collect())
    }

    /// The first value of `name`.
    ///
    /// # Errors
    ///
    /// See [`params`](Self::params).
    pub fn first_param(&mut self, name: &str) -> Result<Option<&ParamValue>, ParamError> {
        Ok(self.params()?.get(name))
    }

    /// Replace every value of `name` in the merged parameters.
    ///
    /// The query and body maps are left as decoded.
    ///
    /// # Errors
    ///
    /// See [`params`](Self::params).
    pub fn set_param<N, I>(&mut self, name: N, values: I) -> Result<(), ParamError>
    where
        N: Into<ParamText>,
        I: IntoIterator,
        I::Item: Into<ParamValue>,
    {
        self.params()?;
        self.cache
            .merged
            .get_or_insert_with(ParamMap::new)
            .set(name.into(), values.into_iter().map(Into::into));
        Ok(())
    }

    /// Every uploaded file in the body, in order.
    ///
    /// # Errors
    ///
    /// See [`body_params`](Self::body_params).
    pub fn uploads(&mut self) -> Result<Vec<&Arc<UploadFile>>, ParamError> {
        Ok(self
            .body_params()?
            .values()
            .filter_map(ParamValue::file)
            .collect())
    }

    fn load_raw_body(&mut self) -> Result<(), ParamError> {
        if self.cache.raw_body.is_some() {
            return Ok(());
        }
        if self.cache.body_failed {
            return Err(ParamError::BodyUnavailable);
        }

        let declared = self.content_length()?;
        match read_body(self.request.body(), declared, self.config.get_body()) {
            Ok(raw) => {
                self.cache.raw_body = Some(raw);
                Ok(())
            }
            Err(e) => {
                // Nothing was consumed if the length was refused up front.
                if !matches!(e, BodyError::TooLarge { .. }) {
                    self.cache.body_failed = true;
                }
                Err(e.into())
            }
        }
    }
}

fn clone_pair((name, value): (&ParamText, &ParamValue)) -> (ParamText, ParamValue) {
    (name.clone(), value.clone())
}
