//! Unified request parameters for blocking HTTP hosts.
//!
//! reqparam gives a host one view of a request's named, multi-valued
//! parameters:
//!
//! - **Query then body**: `param("a")` lists query values before body values
//! - **Bounded body reads**: exactly the declared length, with a stall limit
//! - **Forms and uploads**: url-encoded and multipart bodies, files spooled
//!   to temporary storage released with the request
//! - **Optional charset**: every name and value re-decoded under one
//!   configured encoding
//!
//! # Quick Start
//!
//! ```
//! use reqparam::prelude::*;
//!
//! let body = b"name=Ada&lang=en";
//! let mut request = Request::new(&body[..])
//!     .with_query("lang=fr")
//!     .with_header("Content-Type", "application/x-www-form-urlencoded")
//!     .with_header("Content-Length", body.len().to_string());
//!
//! let mut store = ParamStore::new(&mut request, ParamConfig::default());
//!
//! let langs: Vec<_> = store.param("lang")?.into_iter().filter_map(ParamValue::as_str).collect();
//! assert_eq!(langs, ["fr", "en"]);
//!
//! store.set_param("lang", ["de"])?;
//! assert_eq!(store.param_names()?, ["lang", "name"]);
//! # Ok::<(), ParamError>(())
//! ```
//!
//! # Hosting
//!
//! A host implements [`HostRequest`] for its request type: the query string,
//! header lookup, and a [`ByteSource`] for the body. A source may return
//! zero bytes when nothing is ready; [`ReadSource`] adapts any
//! `std::io::Read`.
//!
//! # Crate Structure
//!
//! - [`reqparam_core`]: Maps, parameter values, multipart, charsets, host contract
//! - [`reqparam_http`]: Percent codec, body reading, decoding, [`ParamStore`]

#![forbid(unsafe_code)]

// Re-export crates
pub use reqparam_core as core;
pub use reqparam_http as http;

// Re-export commonly used types
pub use reqparam_core::{
    ByteSource, Charset, CharsetError, DecodeError, Headers, HostRequest, MultiValueMap,
    MultipartConfig, MultipartError, ParamMap, ParamText, ParamValue, ReadSource, Request,
    UploadFile,
};
pub use reqparam_http::{
    BodyConfig, BodyError, BodyKind, ConfigError, MediaType, ParamConfig, ParamError, ParamStore,
    QueryString, decode_body, encode_pairs, read_body,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        BodyConfig, ByteSource, Charset, HostRequest, MultipartConfig, ParamConfig, ParamError,
        ParamMap, ParamStore, ParamText, ParamValue, Request, UploadFile,
    };
}

/// Byte sources for exercising hosts in tests.
pub mod testing {
    pub use reqparam_core::testing::{ScriptedSource, StalledSource, Step};
}
