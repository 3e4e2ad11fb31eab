//! Declared-length body reading.
//!
//! [`BodyReader`] pulls exactly the declared number of bytes from a blocking
//! [`ByteSource`] in bounded chunks. A zero-byte read is not end of stream:
//! it is retried, and only a run of consecutive empty reads longer than the
//! stall limit fails the read.
//!
//! # Body Size Limits
//!
//! By default, bodies are limited to 1MB. The declared length is checked
//! against the limit before the source is touched.
//!
//! # Example
//!
//! ```
//! use reqparam_http::body::{BodyConfig, read_body};
//!
//! let mut source: &[u8] = b"name=value&extra";
//! let body = read_body(&mut source, 10, &BodyConfig::default()).unwrap();
//! assert_eq!(body, b"name=value");
//! assert_eq!(source, b"&extra");
//! ```

use std::fmt;
use std::io;

use reqparam_core::ByteSource;

/// Default maximum body size (1MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default largest single read requested from the source.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Default number of consecutive empty reads tolerated.
pub const DEFAULT_STALL_LIMIT: usize = 2000;

/// Default maximum number of pairs in a url-encoded body.
pub const DEFAULT_MAX_PAIRS: usize = 1000;

/// Configuration for body reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyConfig {
    /// Maximum body size in bytes.
    max_size: usize,
    /// Largest read requested per call.
    chunk_size: usize,
    /// Consecutive empty reads tolerated before failing.
    stall_limit: usize,
    /// Initial buffer capacity.
    initial_capacity: usize,
    /// Maximum pairs decoded from a url-encoded body.
    max_pairs: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_BODY_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            stall_limit: DEFAULT_STALL_LIMIT,
            initial_capacity: 4096,
            max_pairs: DEFAULT_MAX_PAIRS,
        }
    }
}

impl BodyConfig {
    /// Create a new body configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum body size.
    #[must_use]
    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Set the largest read requested from the source. Zero is treated as one.
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Set the number of consecutive empty reads tolerated.
    #[must_use]
    pub fn stall_limit(mut self, limit: usize) -> Self {
        self.stall_limit = limit;
        self
    }

    /// Set the initial buffer capacity.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the maximum number of pairs in a url-encoded body.
    #[must_use]
    pub fn max_pairs(mut self, count: usize) -> Self {
        self.max_pairs = count;
        self
    }

    /// Get the maximum body size.
    #[must_use]
    pub fn get_max_size(&self) -> usize {
        self.max_size
    }

    /// Get the chunk size.
    #[must_use]
    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Get the stall limit.
    #[must_use]
    pub fn get_stall_limit(&self) -> usize {
        self.stall_limit
    }

    /// Get the initial buffer capacity.
    #[must_use]
    pub fn get_initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Get the maximum number of url-encoded pairs.
    #[must_use]
    pub fn get_max_pairs(&self) -> usize {
        self.max_pairs
    }
}

/// Error types for body reading.
#[derive(Debug)]
pub enum BodyError {
    /// Declared length exceeds the maximum allowed size.
    TooLarge {
        /// The declared size.
        size: usize,
        /// The maximum allowed size.
        max: usize,
    },
    /// The source stopped delivering before the declared length was read.
    Stalled {
        /// Bytes still owed by the source.
        outstanding: usize,
        /// The declared length.
        declared: usize,
    },
    /// The source failed.
    Io(io::Error),
}

impl BodyError {
    /// Returns true for the stall failure.
    #[must_use]
    pub fn is_stalled(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { size, max } => {
                write!(f, "body too large: {size} bytes exceeds limit of {max}")
            }
            Self::Stalled {
                outstanding,
                declared,
            } => write!(
                f,
                "body read stalled: {outstanding} of {declared} bytes outstanding"
            ),
            Self::Io(e) => write!(f, "body read failed: {e}"),
        }
    }
}

impl std::error::Error for BodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BodyError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ============================================================================
// Declared-Length Body Reading
// ============================================================================

/// Reads a body of known length from a [`ByteSource`].
///
/// The reader never requests more than the bytes still outstanding, so the
/// source is never consumed past the declared length.
#[derive(Debug)]
pub struct BodyReader<'s, S: ?Sized> {
    source: &'s mut S,
    length: usize,
    remaining: usize,
    stalls: usize,
    chunk_size: usize,
    stall_limit: usize,
    initial_capacity: usize,
}

impl<'s, S: ByteSource + ?Sized> BodyReader<'s, S> {
    /// Create a new reader for `length` bytes.
    ///
    /// # Errors
    ///
    /// Returns `BodyError::TooLarge` if `length` exceeds the configured maximum.
    pub fn new(source: &'s mut S, length: usize, config: &BodyConfig) -> Result<Self, BodyError> {
        // Check size limit before reading
        if length > config.max_size {
            return Err(BodyError::TooLarge {
                size: length,
                max: config.max_size,
            });
        }

        Ok(Self {
            source,
            length,
            remaining: length,
            stalls: 0,
            chunk_size: config.chunk_size.max(1),
            stall_limit: config.stall_limit,
            initial_capacity: config.initial_capacity,
        })
    }

    /// Returns the declared body length.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Returns the number of bytes still to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Returns true once the declared length has been read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Attempt one read, appending whatever arrives to `buf`.
    ///
    /// Returns the number of bytes appended, which may be zero.
    ///
    /// # Errors
    ///
    /// Returns `BodyError::Stalled` once the empty-read run exceeds the stall
    /// limit and `BodyError::Io` for a hard source failure.
    pub fn read_chunk(&mut self, buf: &mut Vec<u8>) -> Result<usize, BodyError> {
        if self.remaining == 0 {
            return Ok(0);
        }

        let want = self.remaining.min(self.chunk_size);
        let start = buf.len();
        buf.resize(start + want, 0);

        let result = self.source.read_chunk(&mut buf[start..]);
        let n = match result {
            Ok(n) => n.min(want),
            Err(e) if is_retryable(&e) => 0,
            Err(e) => {
                buf.truncate(start);
                return Err(BodyError::Io(e));
            }
        };
        buf.truncate(start + n);

        if n == 0 {
            self.stalls += 1;
            if self.stalls.is_power_of_two() {
                tracing::debug!(
                    stalls = self.stalls,
                    remaining = self.remaining,
                    "empty body read"
                );
            }
            if self.stalls > self.stall_limit {
                tracing::warn!(
                    outstanding = self.remaining,
                    declared = self.length,
                    stalls = self.stalls,
                    "body source stalled, aborting read"
                );
                return Err(BodyError::Stalled {
                    outstanding: self.remaining,
                    declared: self.length,
                });
            }
            return Ok(0);
        }

        self.stalls = 0;
        self.remaining -= n;
        tracing::trace!(read = n, remaining = self.remaining, "body chunk");
        Ok(n)
    }

    /// Read the rest of the body.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`read_chunk`](Self::read_chunk).
    pub fn read_all(mut self) -> Result<Vec<u8>, BodyError> {
        let mut body = Vec::with_capacity(self.initial_capacity.min(self.remaining));
        while !self.is_complete() {
            self.read_chunk(&mut body)?;
        }
        Ok(body)
    }
}

/// Read exactly `declared` bytes from `source`.
///
/// A declared length of zero returns an empty body without touching the
/// source.
///
/// # Errors
///
/// See [`BodyReader::new`] and [`BodyReader::read_chunk`].
pub fn read_body<S: ByteSource + ?Sized>(
    source: &mut S,
    declared: usize,
    config: &BodyConfig,
) -> Result<Vec<u8>, BodyError> {
    BodyReader::new(source, declared, config)?.read_all()
}

fn is_retryable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}
