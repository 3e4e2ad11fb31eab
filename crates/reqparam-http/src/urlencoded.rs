//! `application/x-www-form-urlencoded` codec.
//!
//! Shared by query strings and url-encoded bodies:
//! - Pairs are separated by `&` or `;`; empty segments are skipped
//! - A segment without `=` is a flag with an empty value
//! - `+` is a space and `%XX` is one byte; anything else is taken literally
//! - A `%` not followed by two hex digits is an error
//!
//! Decoding yields bytes. Turning them into text is the charset's job.

use std::borrow::Cow;
use std::fmt;

use reqparam_core::{ParamMap, ParamText, ParamValue};

/// A `%` not followed by two hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentDecodeError {
    position: usize,
}

impl PercentDecodeError {
    /// Byte offset of the offending `%` within the decoded component.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for PercentDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid percent-encoding at byte {}", self.position)
    }
}

impl std::error::Error for PercentDecodeError {}

/// Percent-decode one component.
///
/// Returns `Cow::Borrowed` when nothing needed decoding.
///
/// # Example
///
/// ```
/// use reqparam_http::percent_decode;
///
/// assert_eq!(&*percent_decode(b"hello+world%21").unwrap(), b"hello world!");
/// assert!(percent_decode(b"100%").is_err());
/// ```
pub fn percent_decode(input: &[u8]) -> Result<Cow<'_, [u8]>, PercentDecodeError> {
    // Fast path: no encoding
    if !input.iter().any(|&b| b == b'%' || b == b'+') {
        return Ok(Cow::Borrowed(input));
    }

    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        match input[i] {
            b'%' => {
                let hi = input.get(i + 1).copied().and_then(hex_digit);
                let lo = input.get(i + 2).copied().and_then(hex_digit);
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(PercentDecodeError { position: i });
                };
                result.push((hi << 4) | lo);
                i += 3;
            }
            b'+' => {
                result.push(b' ');
                i += 1;
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }

    Ok(Cow::Owned(result))
}

/// Percent-encode one component for a form body or query string.
///
/// Unreserved bytes (`A-Z a-z 0-9 - . _ ~`) are kept, space becomes `+`,
/// everything else becomes uppercase `%XX`.
#[must_use]
pub fn percent_encode(input: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut out = String::with_capacity(input.len());
    for &b in input {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(b));
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(char::from(HEX[usize::from(b >> 4)]));
                out.push(char::from(HEX[usize::from(b & 0x0F)]));
            }
        }
    }
    out
}

/// Split encoded input into raw `(name, value)` pairs, in order.
///
/// Nothing is decoded.
pub fn pairs(input: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> {
    input
        .split(|&b| b == b'&' || b == b';')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.iter().position(|&b| b == b'=') {
            Some(eq) => (&segment[..eq], &segment[eq + 1..]),
            // Key without value: "flag" -> ("flag", "")
            None => (segment, &segment[segment.len()..]),
        })
}

/// Decode encoded input into a parameter map of raw text values.
pub fn decode_pairs(input: &[u8]) -> Result<ParamMap, PercentDecodeError> {
    let mut params = ParamMap::new();
    for (name, value) in pairs(input) {
        let name = percent_decode(name)?;
        let value = percent_decode(value)?;
        params.add(ParamText::from(name), ParamValue::Text(value.into()));
    }
    Ok(params)
}

/// Decode encoded input, failing once it holds more than `max_pairs` pairs.
///
/// Pairs are counted before they are decoded, so an oversized input is
/// rejected without decoding the excess.
///
/// # Example
///
/// ```
/// use reqparam_http::urlencoded::{FormDecodeError, decode_form};
///
/// assert_eq!(decode_form(b"a=1&b=2", 2).unwrap().len(), 2);
/// assert_eq!(
///     decode_form(b"a=1&b=2&c=3", 2).unwrap_err(),
///     FormDecodeError::TooManyPairs { max: 2 }
/// );
/// ```
pub fn decode_form(input: &[u8], max_pairs: usize) -> Result<ParamMap, FormDecodeError> {
    let mut params = ParamMap::new();
    for (count, (name, value)) in pairs(input).enumerate() {
        if count == max_pairs {
            return Err(FormDecodeError::TooManyPairs { max: max_pairs });
        }
        let name = percent_decode(name)?;
        let value = percent_decode(value)?;
        params.add(ParamText::from(name), ParamValue::Text(value.into()));
    }
    Ok(params)
}

/// Error from [`decode_form`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormDecodeError {
    /// Invalid percent-encoding.
    Percent(PercentDecodeError),
    /// More pairs than allowed.
    TooManyPairs {
        /// The configured maximum.
        max: usize,
    },
}

impl fmt::Display for FormDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(e) => write!(f, "{e}"),
            Self::TooManyPairs { max } => write!(f, "too many pairs: more than {max}"),
        }
    }
}

impl std::error::Error for FormDecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Percent(e) => Some(e),
            Self::TooManyPairs { .. } => None,
        }
    }
}

impl From<PercentDecodeError> for FormDecodeError {
    fn from(e: PercentDecodeError) -> Self {
        Self::Percent(e)
    }
}

/// Encode the text pairs of `params` as `name=value&...`.
///
/// File values have no url-encoded form and are skipped.
#[must_use]
pub fn encode_pairs(params: &ParamMap) -> String {
    params
        .iter()
        .filter_map(|(name, value)| {
            let text = value.text()?;
            Some(format!(
                "{}={}",
                percent_encode(name.as_bytes()),
                percent_encode(text.as_bytes())
            ))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Convert a hex digit to its numeric value.
fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
