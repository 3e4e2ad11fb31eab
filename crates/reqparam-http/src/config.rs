//! Parameter extraction configuration.
//!
//! [`ParamConfig`] bundles the optional charset with the body and multipart
//! limits. It can be built in code, read from the environment, or embedded
//! in a host's own configuration file through `serde`.
//!
//! # Environment Variables
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `REQPARAM_CHARSET` | Charset label for normalisation (unset: none) |
//! | `REQPARAM_MAX_BODY_SIZE` | Maximum declared body length in bytes |
//! | `REQPARAM_SPOOL_THRESHOLD` | File parts at least this large are spooled |

use std::fmt;

use reqparam_core::{Charset, CharsetError, MultipartConfig};
use serde::Deserialize;

use crate::body::BodyConfig;

/// Environment variable naming the charset.
pub const ENV_CHARSET: &str = "REQPARAM_CHARSET";
/// Environment variable for the maximum body size.
pub const ENV_MAX_BODY_SIZE: &str = "REQPARAM_MAX_BODY_SIZE";
/// Environment variable for the spool threshold.
pub const ENV_SPOOL_THRESHOLD: &str = "REQPARAM_SPOOL_THRESHOLD";

/// Configuration for a [`ParamStore`](crate::ParamStore).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ConfigFile")]
pub struct ParamConfig {
    charset: Option<Charset>,
    body: BodyConfig,
    multipart: MultipartConfig,
}

impl ParamConfig {
    /// Create a configuration with no charset and default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown charset label or a non-numeric
    /// size.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Unset and empty variables keep their defaults.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(label) = get(ENV_CHARSET) {
            config.charset = Some(Charset::for_label(&label)?);
        }
        if let Some(value) = get(ENV_MAX_BODY_SIZE) {
            config.body = config.body.max_size(parse_size(ENV_MAX_BODY_SIZE, &value)?);
        }
        if let Some(value) = get(ENV_SPOOL_THRESHOLD) {
            config.multipart = config
                .multipart
                .spool_threshold(parse_size(ENV_SPOOL_THRESHOLD, &value)?);
        }

        Ok(config)
    }

    /// Set the charset used to normalise names and values.
    #[must_use]
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = Some(charset);
        self
    }

    /// Set the charset by label.
    ///
    /// # Errors
    ///
    /// Returns `CharsetError` if the label names no known encoding.
    pub fn charset_label(self, label: &str) -> Result<Self, CharsetError> {
        Ok(self.charset(Charset::for_label(label)?))
    }

    /// Set the body reading configuration.
    #[must_use]
    pub fn body(mut self, body: BodyConfig) -> Self {
        self.body = body;
        self
    }

    /// Set the multipart configuration.
    #[must_use]
    pub fn multipart(mut self, multipart: MultipartConfig) -> Self {
        self.multipart = multipart;
        self
    }

    /// Get the configured charset.
    #[must_use]
    pub fn get_charset(&self) -> Option<Charset> {
        self.charset
    }

    /// Get the body reading configuration.
    #[must_use]
    pub fn get_body(&self) -> &BodyConfig {
        &self.body
    }

    /// Get the multipart configuration.
    #[must_use]
    pub fn get_multipart(&self) -> &MultipartConfig {
        &self.multipart
    }
}

/// Error building a [`ParamConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown charset label.
    Charset(CharsetError),
    /// A size setting is not a non-negative integer.
    InvalidSize { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Charset(e) => write!(f, "{e}"),
            Self::InvalidSize { key, value } => {
                write!(f, "invalid size for {key}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Charset(e) => Some(e),
            Self::InvalidSize { .. } => None,
        }
    }
}

impl From<CharsetError> for ConfigError {
    fn from(e: CharsetError) -> Self {
        Self::Charset(e)
    }
}

fn parse_size(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidSize {
        key,
        value: value.to_string(),
    })
}

/// The serialised form of [`ParamConfig`]. Absent fields keep defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    charset: Option<String>,
    max_body_size: Option<usize>,
    chunk_size: Option<usize>,
    stall_limit: Option<usize>,
    max_pairs: Option<usize>,
    max_file_size: Option<usize>,
    max_total_size: Option<usize>,
    max_fields: Option<usize>,
    spool_threshold: Option<usize>,
}

impl TryFrom<ConfigFile> for ParamConfig {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let mut body = BodyConfig::default();
        if let Some(size) = file.max_body_size {
            body = body.max_size(size);
        }
        if let Some(size) = file.chunk_size {
            body = body.chunk_size(size);
        }
        if let Some(limit) = file.stall_limit {
            body = body.stall_limit(limit);
        }
        if let Some(count) = file.max_pairs {
            body = body.max_pairs(count);
        }

        let mut multipart = MultipartConfig::default();
        if let Some(size) = file.max_file_size {
            multipart = multipart.max_file_size(size);
        }
        if let Some(size) = file.max_total_size {
            multipart = multipart.max_total_size(size);
        }
        if let Some(count) = file.max_fields {
            multipart = multipart.max_fields(count);
        }
        if let Some(size) = file.spool_threshold {
            multipart = multipart.spool_threshold(size);
        }

        let charset = file
            .charset
            .as_deref()
            .map(Charset::for_label)
            .transpose()?;

        Ok(Self {
            charset,
            body,
            multipart,
        })
    }
}
