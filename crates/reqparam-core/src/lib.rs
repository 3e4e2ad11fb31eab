//! Core types for reqparam.
//!
//! This crate provides the building blocks of request parameter extraction:
//! - [`MultiValueMap`] and the [`ParamText`] / [`ParamValue`] it stores
//! - [`MultipartParser`] and spooled [`UploadFile`]s
//! - [`Charset`] normalisation of decoded names and values
//! - Quote-aware [`header`] parameter splitting
//! - The [`HostRequest`] and [`ByteSource`] contracts a host implements
//!
//! # Design Principles
//!
//! - Synchronous and single-threaded per request
//! - Names and values stay bytes until a charset says otherwise
//! - Transient storage is owned, and released on drop

#![forbid(unsafe_code)]

pub mod charset;
pub mod header;
pub mod multimap;
pub mod multipart;
mod request;
mod source;
pub mod testing;

pub use charset::{Charset, CharsetError, DecodeError, normalize};
pub use multimap::{Iter, MultiValueMap, ParamMap, ParamText, ParamValue};
pub use multipart::{
    DEFAULT_MAX_FIELDS, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_TOTAL_SIZE, DEFAULT_SPOOL_THRESHOLD,
    MultipartConfig, MultipartError, MultipartParser, Part, UploadFile, parse_boundary,
};
pub use request::{Headers, HostRequest, Request};
pub use source::{ByteSource, ReadSource};
