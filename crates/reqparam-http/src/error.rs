//! Errors surfaced by parameter extraction.

use std::fmt;

use reqparam_core::{CharsetError, DecodeError, MultipartError};

use crate::body::BodyError;
use crate::config::ConfigError;

/// Error returned by [`ParamStore`](crate::ParamStore) accessors.
///
/// Nothing is recovered silently: a map is either fully decoded or one of
/// these is returned.
#[derive(Debug)]
pub enum ParamError {
    /// Reading the body failed. [`BodyError::Stalled`] is the transient
    /// read failure; the request cannot proceed.
    Body(BodyError),
    /// A previous body read failed and the source has been partly consumed.
    BodyUnavailable,
    /// The query string is not valid url-encoded text.
    MalformedQuery {
        /// Description of the problem.
        detail: String,
    },
    /// The body is not valid for its declared media type.
    MalformedBody {
        /// Description of the problem.
        detail: String,
    },
    /// The multipart structure of the body is invalid or over a limit, or a
    /// file part could not be spooled.
    Multipart(MultipartError),
    /// A name or value is not valid in the configured charset.
    Decode(DecodeError),
    /// The declared length header is not a non-negative integer.
    InvalidContentLength {
        /// The header value as received.
        value: String,
    },
    /// Invalid configuration.
    Config(ConfigError),
}

impl ParamError {
    /// Returns true if the body source stalled before the declared length
    /// was read.
    #[must_use]
    pub fn is_transient_read_failure(&self) -> bool {
        matches!(self, Self::Body(e) if e.is_stalled())
    }

    /// Returns true if the query or body content itself is invalid.
    ///
    /// A multipart failure to spool a file is local I/O, not bad input.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::MalformedQuery { .. } | Self::MalformedBody { .. } => true,
            Self::Multipart(e) => !matches!(e, MultipartError::Io(_)),
            _ => false,
        }
    }
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body(e) => write!(f, "{e}"),
            Self::BodyUnavailable => write!(f, "body unavailable after a failed read"),
            Self::MalformedQuery { detail } => write!(f, "malformed query string: {detail}"),
            Self::MalformedBody { detail } => write!(f, "malformed body: {detail}"),
            Self::Multipart(e @ MultipartError::Io(_)) => write!(f, "{e}"),
            Self::Multipart(e) => write!(f, "malformed multipart body: {e}"),
            Self::Decode(e) => write!(f, "{e}"),
            Self::InvalidContentLength { value } => {
                write!(f, "invalid Content-Length: {value:?}")
            }
            Self::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ParamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Body(e) => Some(e),
            Self::Multipart(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BodyError> for ParamError {
    fn from(e: BodyError) -> Self {
        Self::Body(e)
    }
}

impl From<MultipartError> for ParamError {
    fn from(e: MultipartError) -> Self {
        Self::Multipart(e)
    }
}

impl From<DecodeError> for ParamError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<ConfigError> for ParamError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CharsetError> for ParamError {
    fn from(e: CharsetError) -> Self {
        Self::Config(ConfigError::Charset(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn stall_is_the_transient_read_failure() {
        let err = ParamError::from(BodyError::Stalled {
            outstanding: 3,
            declared: 3,
        });
        assert!(err.is_transient_read_failure());
        assert!(!err.is_malformed());
        assert!(err.source().is_some());

        let err = ParamError::from(BodyError::TooLarge { size: 2, max: 1 });
        assert!(!err.is_transient_read_failure());
    }

    #[test]
    fn malformed_kinds() {
        assert!(
            ParamError::MalformedQuery {
                detail: String::new()
            }
            .is_malformed()
        );
        assert!(ParamError::from(MultipartError::UnexpectedEof).is_malformed());
        assert!(!ParamError::BodyUnavailable.is_malformed());
    }

    #[test]
    fn spool_failure_is_not_malformed() {
        let err = ParamError::from(MultipartError::Io(std::io::Error::other("disk full")));
        assert!(!err.is_malformed());
        assert!(!err.is_transient_read_failure());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn charset_errors_become_config_errors() {
        let err = ParamError::from(CharsetError::UnknownLabel {
            label: "klingon".into(),
        });
        assert!(matches!(err, ParamError::Config(ConfigError::Charset(_))));
        assert_eq!(err.to_string(), "unknown character set: \"klingon\"");
    }

    #[test]
    fn display_invalid_content_length() {
        let err = ParamError::InvalidContentLength {
            value: "-1".into(),
        };
        assert_eq!(err.to_string(), "invalid Content-Length: \"-1\"");
    }
}
