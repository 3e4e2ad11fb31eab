//! Character set normalisation of decoded parameters.
//!
//! Query and body decoders produce names and values as raw bytes. When a
//! [`Charset`] is configured, [`normalize`] transcodes every name and every
//! text value from that charset to UTF-8, along with the field name and
//! filename of each upload. Without one, the map is returned untouched.
//!
//! Labels are resolved with the WHATWG Encoding Standard rules, so
//! `latin1` and `iso-8859-1` both select windows-1252.

use std::fmt;
use std::sync::Arc;

use encoding_rs::Encoding;

use crate::multimap::{ParamMap, ParamText, ParamValue};

/// A validated character encoding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// Resolve a charset label such as `utf-8`, `shift_jis` or `latin1`.
    pub fn for_label(label: &str) -> Result<Self, CharsetError> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| CharsetError::UnknownLabel {
                label: label.to_string(),
            })
    }

    /// UTF-8.
    #[must_use]
    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    /// The canonical name of the encoding.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Decode `bytes` into text, failing on any malformed sequence.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        self.0
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(std::borrow::Cow::into_owned)
            .ok_or_else(|| DecodeError {
                charset: self.name(),
                bytes: bytes.to_vec(),
            })
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error resolving a charset label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharsetError {
    /// The label names no known encoding.
    UnknownLabel { label: String },
}

impl fmt::Display for CharsetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownLabel { label } => write!(f, "unknown character set: {label:?}"),
        }
    }
}

impl std::error::Error for CharsetError {}

/// Bytes that are not valid in the configured charset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    charset: &'static str,
    bytes: Vec<u8>,
}

impl DecodeError {
    /// Name of the charset decoding was attempted with.
    #[must_use]
    pub fn charset(&self) -> &'static str {
        self.charset
    }

    /// The bytes that failed to decode.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot decode {:?} as {}",
            String::from_utf8_lossy(&self.bytes),
            self.charset
        )
    }
}

impl std::error::Error for DecodeError {}

/// Re-decode every name and text value of `map` under `charset`.
///
/// `None` returns the map unchanged. Order and multiplicity are preserved.
/// File content is never touched; an upload's field name and filename are
/// re-decoded when `map` holds the only reference to it, which is always
/// the case for a freshly decoded body. The first undecodable name or value
/// fails the whole map, and uploads it owned are dropped with it.
pub fn normalize(map: ParamMap, charset: Option<Charset>) -> Result<ParamMap, DecodeError> {
    let Some(charset) = charset else {
        return Ok(map);
    };

    let mut normalized = ParamMap::with_capacity(map.len());
    for (name, value) in map {
        let name = ParamText::from(charset.decode(name.as_bytes())?);
        let value = match value {
            ParamValue::Text(text) => ParamValue::Text(charset.decode(text.as_bytes())?.into()),
            ParamValue::File(mut file) => {
                if let Some(upload) = Arc::get_mut(&mut file) {
                    upload.decode_names(charset)?;
                }
                ParamValue::File(file)
            }
        };
        normalized.add(name, value);
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::{MultipartConfig, MultipartParser};

    fn raw(pairs: &[(&[u8], &[u8])]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| (ParamText::from(*k), ParamValue::from(v.to_vec())))
            .collect()
    }

    #[test]
    fn labels_resolve_case_insensitively() {
        assert_eq!(Charset::for_label("UTF-8").unwrap().name(), "UTF-8");
        assert_eq!(Charset::for_label(" Shift_JIS ").unwrap().name(), "Shift_JIS");
        assert_eq!(Charset::for_label("latin1").unwrap().name(), "windows-1252");
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = Charset::for_label("klingon-8").unwrap_err();
        assert_eq!(
            err,
            CharsetError::UnknownLabel {
                label: "klingon-8".to_string()
            }
        );
        assert!(err.to_string().contains("klingon-8"));
    }

    #[test]
    fn no_charset_is_identity() {
        let map = raw(&[(b"caf\xE9", b"cr\xE8me"), (b"a", b"1")]);
        let normalized = normalize(map.clone(), None).unwrap();
        assert_eq!(normalized, map);
        assert_eq!(
            normalized.get(b"caf\xE9".as_slice()).and_then(ParamValue::as_bytes),
            Some(b"cr\xE8me".as_slice())
        );
    }

    #[test]
    fn latin1_bytes_decode_to_text() {
        let map = raw(&[(b"caf\xE9", b"cr\xE8me"), (b"caf\xE9", b"br\xFBl\xE9e")]);
        let normalized = normalize(map, Some(Charset::for_label("iso-8859-1").unwrap())).unwrap();

        let values: Vec<_> = normalized.get_all("café").collect();
        assert_eq!(values, ["crème", "brûlée"]);
        assert_eq!(normalized.keys(), ["café"]);
    }

    #[test]
    fn shift_jis_bytes_decode_to_text() {
        // "日本" in Shift_JIS
        let map = raw(&[(b"q", b"\x93\xFA\x96\x7B")]);
        let normalized = normalize(map, Some(Charset::for_label("shift_jis").unwrap())).unwrap();
        assert_eq!(normalized.get("q").and_then(ParamValue::as_str), Some("日本"));
    }

    #[test]
    fn malformed_bytes_fail_instead_of_dropping() {
        let map = raw(&[(b"ok", b"fine"), (b"bad", b"\xFF\xFE")]);
        let err = normalize(map, Some(Charset::utf8())).unwrap_err();
        assert_eq!(err.charset(), "UTF-8");
        assert_eq!(err.bytes(), b"\xFF\xFE");
    }

    #[test]
    fn malformed_name_fails_too() {
        let map = raw(&[(b"\xC3", b"v")]);
        assert!(normalize(map, Some(Charset::utf8())).is_err());
    }

    #[test]
    fn upload_names_follow_the_charset() {
        let body: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"pi\xE8ce\"; filename=\"r\xE9sum\xE9.txt\"\r\n\
\r\n\
\xFF\xFE\r\n\
--XyZ--\r\n";
        let parser = MultipartParser::new("XyZ", MultipartConfig::new().spool_threshold(usize::MAX));
        let params = parser.parse_params(body).unwrap();

        let normalized = normalize(params, Some(Charset::for_label("latin1").unwrap())).unwrap();
        let upload = normalized.get("pièce").and_then(ParamValue::file).unwrap();
        assert_eq!(upload.field_name(), "pièce");
        assert_eq!(upload.filename(), "résumé.txt");
        assert_eq!(upload.bytes().unwrap(), b"\xFF\xFE");
    }

    #[test]
    fn failed_normalize_releases_spooled_files() {
        let body: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"blob\"; filename=\"raw.bin\"\r\n\
\r\n\
payload\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"note\"\r\n\
\r\n\
bad \xFF byte\r\n\
--XyZ--\r\n";
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        let params = parser.parse_params(body).unwrap();
        let path = params
            .get("blob")
            .and_then(ParamValue::file)
            .and_then(|upload| upload.spooled_path())
            .map(std::path::Path::to_path_buf)
            .unwrap();
        assert!(path.exists());

        let err = normalize(params, Some(Charset::utf8())).unwrap_err();
        assert_eq!(err.bytes(), b"bad \xFF byte");
        assert!(!path.exists());
    }
}
