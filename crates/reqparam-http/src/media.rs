//! Body decoding by declared media type.
//!
//! The declared `Content-Type` is parsed once into a [`MediaType`] and
//! classified into a closed [`BodyKind`]; each kind decodes the raw body
//! into a [`ParamMap`].
//!
//! | Media type | Decoding |
//! |------------|----------|
//! | `application/x-www-form-urlencoded` | percent-decoded pairs, up to a limit |
//! | `multipart/form-data; boundary=...` | parts, files spooled |
//! | anything else, or none | empty map |

use reqparam_core::{MultipartParser, ParamMap, header, parse_boundary};

use crate::config::ParamConfig;
use crate::error::ParamError;
use crate::urlencoded;

const URL_ENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// A parsed `Content-Type` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    raw: String,
    essence: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Parse a `Content-Type` value. Never fails; garbage yields an
    /// unrecognised essence.
    ///
    /// Parameter values may be quoted strings containing `;`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut segments = header::split_params(value);
        let essence = segments
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        let params = segments
            .filter_map(|segment| {
                let (name, value) = segment.split_once('=')?;
                let value = header::unquote(value.as_bytes());
                let value = String::from_utf8_lossy(&value).into_owned();
                Some((name.trim().to_ascii_lowercase(), value))
            })
            .collect();

        Self {
            raw: value.to_string(),
            essence,
            params,
        }
    }

    /// The lowercased `type/subtype`.
    #[must_use]
    pub fn essence(&self) -> &str {
        &self.essence
    }

    /// A parameter value by (case-insensitive) name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The declared `charset` parameter, if any.
    ///
    /// Informational only: normalisation uses the configured charset.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    /// Classify the media type.
    ///
    /// # Errors
    ///
    /// Returns `ParamError::MalformedBody` for a multipart type without a
    /// usable boundary.
    pub fn kind(&self) -> Result<BodyKind, ParamError> {
        match self.essence.as_str() {
            URL_ENCODED => Ok(BodyKind::UrlEncoded),
            MULTIPART_FORM_DATA => {
                let boundary = parse_boundary(&self.raw).map_err(|e| ParamError::MalformedBody {
                    detail: e.to_string(),
                })?;
                Ok(BodyKind::Multipart { boundary })
            }
            other => Ok(BodyKind::Unsupported(other.to_string())),
        }
    }
}

/// How a body is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyKind {
    /// `application/x-www-form-urlencoded`.
    UrlEncoded,
    /// `multipart/form-data` with its boundary.
    Multipart {
        /// The part delimiter, without the leading `--`.
        boundary: String,
    },
    /// Any other media type, by essence. Decodes to an empty map.
    Unsupported(String),
}

impl BodyKind {
    /// Decode `raw` into parameters.
    ///
    /// # Errors
    ///
    /// Returns `ParamError::MalformedBody` for invalid percent-encoding or
    /// more url-encoded pairs than the body limit allows, and
    /// `ParamError::Multipart` for an invalid or oversized multipart body.
    pub fn decode(&self, raw: &[u8], config: &ParamConfig) -> Result<ParamMap, ParamError> {
        match self {
            Self::UrlEncoded => {
                let max_pairs = config.get_body().get_max_pairs();
                urlencoded::decode_form(raw, max_pairs).map_err(|e| ParamError::MalformedBody {
                    detail: e.to_string(),
                })
            }
            Self::Multipart { boundary } => {
                let parser = MultipartParser::new(boundary, config.get_multipart().clone());
                Ok(parser.parse_params(raw)?)
            }
            Self::Unsupported(essence) => {
                tracing::debug!(
                    media_type = %essence,
                    len = raw.len(),
                    "unsupported body media type, no parameters"
                );
                Ok(ParamMap::new())
            }
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::UrlEncoded => URL_ENCODED,
            Self::Multipart { .. } => MULTIPART_FORM_DATA,
            Self::Unsupported(essence) => essence,
        }
    }
}

/// Decode a raw body according to its declared `Content-Type`.
///
/// An empty body has no parameters, whatever its media type.
///
/// # Errors
///
/// See [`MediaType::kind`] and [`BodyKind::decode`].
pub fn decode_body(
    content_type: &str,
    raw: &[u8],
    config: &ParamConfig,
) -> Result<ParamMap, ParamError> {
    if raw.is_empty() {
        return Ok(ParamMap::new());
    }

    let kind = MediaType::parse(content_type).kind()?;
    tracing::debug!(kind = kind.label(), len = raw.len(), "decoding body");
    kind.decode(raw, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyConfig;
    use reqparam_core::{MultipartConfig, MultipartError, ParamValue};

    const FORM: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\
\r\n\
Quarterly\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"attachment\"; filename=\"report.csv\"\r\n\
Content-Type: text/csv\r\n\
\r\n\
a,b\r\n1,2\r\n\
--XyZ--\r\n";

    #[test]
    fn parse_media_type_with_params() {
        let media = MediaType::parse("Multipart/Form-Data; Boundary=\"XyZ\"; charset=UTF-8");
        assert_eq!(media.essence(), "multipart/form-data");
        assert_eq!(media.param("boundary"), Some("XyZ"));
        assert_eq!(media.charset(), Some("UTF-8"));
        assert_eq!(
            media.kind().unwrap(),
            BodyKind::Multipart {
                boundary: "XyZ".into()
            }
        );
    }

    #[test]
    fn quoted_params_may_contain_semicolons() {
        let media = MediaType::parse(r#"multipart/form-data; boundary="a;b"; charset=utf-8"#);
        assert_eq!(media.param("boundary"), Some("a;b"));
        assert_eq!(media.charset(), Some("utf-8"));
        assert_eq!(
            media.kind().unwrap(),
            BodyKind::Multipart {
                boundary: "a;b".into()
            }
        );
    }

    #[test]
    fn classify_url_encoded_case_insensitively() {
        let media = MediaType::parse("APPLICATION/X-WWW-FORM-URLENCODED; charset=latin1");
        assert_eq!(media.kind().unwrap(), BodyKind::UrlEncoded);
    }

    #[test]
    fn classify_unsupported_and_empty() {
        assert_eq!(
            MediaType::parse("application/json").kind().unwrap(),
            BodyKind::Unsupported("application/json".into())
        );
        assert_eq!(
            MediaType::parse("").kind().unwrap(),
            BodyKind::Unsupported(String::new())
        );
    }

    #[test]
    fn multipart_without_boundary_is_malformed() {
        let err = MediaType::parse("multipart/form-data").kind().unwrap_err();
        assert!(matches!(err, ParamError::MalformedBody { .. }));
    }

    #[test]
    fn decode_url_encoded_body() {
        let params = decode_body(
            "application/x-www-form-urlencoded",
            b"a=1&b=two+words&a=2",
            &ParamConfig::default(),
        )
        .unwrap();
        let a: Vec<_> = params.get_all("a").collect();
        assert_eq!(a, ["1", "2"]);
        assert_eq!(params.get("b").and_then(ParamValue::as_str), Some("two words"));
    }

    #[test]
    fn malformed_url_encoded_body_is_an_error() {
        let err = decode_body(
            "application/x-www-form-urlencoded",
            b"a=%zz",
            &ParamConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::MalformedBody { .. }));
    }

    #[test]
    fn url_encoded_pair_limit() {
        let config = ParamConfig::default().body(BodyConfig::new().max_pairs(2));
        let params = decode_body(URL_ENCODED, b"a=1&b=2", &config).unwrap();
        assert_eq!(params.len(), 2);

        let err = decode_body(URL_ENCODED, b"a=1&b=2&c=3", &config).unwrap_err();
        assert!(matches!(err, ParamError::MalformedBody { .. }));
        assert!(err.to_string().contains("too many pairs"));
    }

    #[test]
    fn decode_multipart_body() {
        let params = decode_body(
            "multipart/form-data; boundary=XyZ",
            FORM,
            &ParamConfig::default(),
        )
        .unwrap();

        assert_eq!(params.get("title").and_then(ParamValue::as_str), Some("Quarterly"));
        let file = params
            .get("attachment")
            .and_then(ParamValue::file)
            .expect("file value");
        assert_eq!(file.filename(), "report.csv");
        assert_eq!(file.content_type(), "text/csv");
        assert_eq!(file.bytes().unwrap(), b"a,b\r\n1,2");
    }

    #[test]
    fn multipart_limits_surface_as_multipart_errors() {
        let config = ParamConfig::default().multipart(MultipartConfig::default().max_fields(1));
        let err = decode_body("multipart/form-data; boundary=XyZ", FORM, &config).unwrap_err();
        assert!(matches!(
            err,
            ParamError::Multipart(MultipartError::TooManyFields { .. })
        ));
    }

    #[test]
    fn unsupported_and_empty_bodies_have_no_params() {
        let config = ParamConfig::default();
        assert!(decode_body("application/json", b"{\"a\":1}", &config).unwrap().is_empty());
        assert!(decode_body("", b"a=1", &config).unwrap().is_empty());
        assert!(
            decode_body("multipart/form-data", b"", &config)
                .unwrap()
                .is_empty()
        );
    }
}
