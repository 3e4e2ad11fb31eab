//! Query and body parameter extraction.
//!
//! This crate turns a host request into decoded parameters:
//!
//! - Query strings and url-encoded bodies with strict percent-decoding
//! - Declared-length body reads that tolerate empty reads up to a stall limit
//! - Media-type dispatch to url-encoded or multipart decoding
//! - A request-scoped [`ParamStore`] that computes everything once
//!
//! # Example
//!
//! ```
//! use reqparam_core::{ParamValue, Request};
//! use reqparam_http::{ParamConfig, ParamStore};
//!
//! let mut request = Request::new(&b""[..]).with_query("tag=a&tag=b");
//! let mut store = ParamStore::new(&mut request, ParamConfig::default());
//!
//! let tags: Vec<_> = store.param("tag").unwrap();
//! assert_eq!(tags, [&ParamValue::from("a"), &ParamValue::from("b")]);
//! ```

#![deny(unsafe_code)]

pub mod body;
mod config;
mod error;
mod media;
mod query;
mod store;
pub mod urlencoded;

pub use body::{
    BodyConfig, BodyError, BodyReader, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_MAX_PAIRS, DEFAULT_STALL_LIMIT, read_body,
};
pub use config::{ConfigError, ENV_CHARSET, ENV_MAX_BODY_SIZE, ENV_SPOOL_THRESHOLD, ParamConfig};
pub use error::ParamError;
pub use media::{BodyKind, MediaType, decode_body};
pub use query::QueryString;
pub use store::ParamStore;
pub use urlencoded::{
    FormDecodeError, PercentDecodeError, decode_form, decode_pairs, encode_pairs, percent_decode,
    percent_encode,
};
