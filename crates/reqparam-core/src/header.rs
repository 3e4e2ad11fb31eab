//! Header parameter splitting.
//!
//! `Content-Type` and `Content-Disposition` carry `;`-separated parameters
//! whose values may be quoted strings (RFC 2045, RFC 7578). A `;` inside a
//! quoted string belongs to the value, and `\` escapes the next byte there.
//!
//! ```
//! use reqparam_core::header;
//!
//! let segments: Vec<_> = header::split_params(r#"form-data; name="a;b""#).collect();
//! assert_eq!(segments, ["form-data", r#" name="a;b""#]);
//! assert_eq!(&*header::unquote(br#" "a;b" "#), b"a;b");
//! ```

use std::borrow::Cow;
use std::ops::Range;

/// Split a header value on every `;` outside a quoted string.
///
/// Segments are returned untrimmed. The first one is the value proper
/// (`multipart/form-data`, `form-data`).
pub fn split_params(value: &str) -> impl Iterator<Item = &str> {
    // `;` is ASCII, so every range falls on a char boundary.
    segment_ranges(value.as_bytes())
        .into_iter()
        .map(move |range| &value[range])
}

/// Byte version of [`split_params`] for raw part headers.
pub fn split_params_bytes(value: &[u8]) -> impl Iterator<Item = &[u8]> {
    segment_ranges(value)
        .into_iter()
        .map(move |range| &value[range])
}

/// Trim a parameter value and strip its quotes.
///
/// Inside double quotes, `\x` becomes `x`. Single quotes are stripped as
/// they are. Unquoted values are only trimmed.
#[must_use]
pub fn unquote(value: &[u8]) -> Cow<'_, [u8]> {
    let value = value.trim_ascii();
    let Some((&first, rest)) = value.split_first() else {
        return Cow::Borrowed(value);
    };
    let Some((&last, inner)) = rest.split_last() else {
        return Cow::Borrowed(value);
    };

    match (first, last) {
        (b'"', b'"') if inner.contains(&b'\\') => {
            let mut out = Vec::with_capacity(inner.len());
            let mut bytes = inner.iter();
            while let Some(&b) = bytes.next() {
                if b == b'\\' {
                    if let Some(&escaped) = bytes.next() {
                        out.push(escaped);
                        continue;
                    }
                }
                out.push(b);
            }
            Cow::Owned(out)
        }
        (b'"', b'"') | (b'\'', b'\'') => Cow::Borrowed(inner),
        _ => Cow::Borrowed(value),
    }
}

fn segment_ranges(value: &[u8]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, &b) in value.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if quoted => escaped = true,
            b'"' => quoted = !quoted,
            b';' if !quoted => {
                ranges.push(start..i);
                start = i + 1;
            }
            _ => {}
        }
    }
    ranges.push(start..value.len());
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_plain_params() {
        let segments: Vec<_> = split_params("text/plain; charset=utf-8;q=1").collect();
        assert_eq!(segments, ["text/plain", " charset=utf-8", "q=1"]);
    }

    #[test]
    fn quoted_semicolons_do_not_split() {
        let segments: Vec<_> =
            split_params(r#"multipart/form-data; note="x;boundary=evil"; boundary=real"#).collect();
        assert_eq!(
            segments,
            ["multipart/form-data", r#" note="x;boundary=evil""#, " boundary=real"]
        );
    }

    #[test]
    fn escaped_quote_stays_inside_the_string() {
        let segments: Vec<_> =
            split_params_bytes(br#"form-data; name="say \"a;b\""; filename="f""#).collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(&*unquote(segments[1].split_at(6).1), br#"say "a;b""#);
    }

    #[test]
    fn unterminated_quote_runs_to_the_end() {
        let segments: Vec<_> = split_params(r#"a; b="c;d"#).collect();
        assert_eq!(segments, ["a", r#" b="c;d"#]);
    }

    #[test]
    fn unquote_variants() {
        assert_eq!(&*unquote(b"  plain "), b"plain");
        assert_eq!(&*unquote(b"\"quoted\""), b"quoted");
        assert_eq!(&*unquote(b"'single'"), b"single");
        assert_eq!(&*unquote(br#""a\\b""#), br"a\b");
        assert_eq!(&*unquote(b"\""), b"\"");
        assert_eq!(&*unquote(b""), b"");
        assert!(matches!(unquote(b"\"caf\xE9\""), Cow::Borrowed(b"caf\xE9")));
    }
}
