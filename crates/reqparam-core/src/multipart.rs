//! Multipart form data parser.
//!
//! Parses complete `multipart/form-data` bodies into a [`ParamMap`]. Parts
//! without a filename become text values; parts with a filename become
//! [`UploadFile`] values whose content may be spooled to a temporary file.
//! The parser enforces per-file, total size and field count limits.
//!
//! Spooled files are owned by their `UploadFile` and removed when it is
//! dropped, including when parsing fails after some files were written.
//!
//! Part headers are kept as bytes. Field names and filenames stay in the
//! sender's encoding until charset normalisation decodes them.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use memchr::memmem;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::charset::{Charset, DecodeError};
use crate::header;
use crate::multimap::{ParamMap, ParamText, ParamValue};

/// Default maximum file size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum total upload size (50MB).
pub const DEFAULT_MAX_TOTAL_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum number of fields.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// Default spool threshold: every file part goes to transient storage.
pub const DEFAULT_SPOOL_THRESHOLD: usize = 0;

/// RFC 2046 recommends multipart boundary length <= 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

/// Content type assumed for file parts that do not declare one.
const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// Configuration for multipart parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartConfig {
    /// Maximum size per file in bytes.
    max_file_size: usize,
    /// Maximum total upload size in bytes.
    max_total_size: usize,
    /// Maximum number of fields (including files).
    max_fields: usize,
    /// Files at least this large are spooled to a temporary file.
    spool_threshold: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            max_fields: DEFAULT_MAX_FIELDS,
            spool_threshold: DEFAULT_SPOOL_THRESHOLD,
        }
    }
}

impl MultipartConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum file size.
    #[must_use]
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set the maximum total upload size.
    #[must_use]
    pub fn max_total_size(mut self, size: usize) -> Self {
        self.max_total_size = size;
        self
    }

    /// Set the maximum number of fields.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }

    /// Set the size at which file parts are spooled to a temporary file.
    ///
    /// `0` spools every file part; `usize::MAX` keeps them all in memory.
    #[must_use]
    pub fn spool_threshold(mut self, size: usize) -> Self {
        self.spool_threshold = size;
        self
    }

    /// Get the maximum file size.
    #[must_use]
    pub fn get_max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Get the maximum total upload size.
    #[must_use]
    pub fn get_max_total_size(&self) -> usize {
        self.max_total_size
    }

    /// Get the maximum number of fields.
    #[must_use]
    pub fn get_max_fields(&self) -> usize {
        self.max_fields
    }

    /// Get the spool-to-disk threshold.
    #[must_use]
    pub fn get_spool_threshold(&self) -> usize {
        self.spool_threshold
    }
}

/// Errors that can occur during multipart parsing.
#[derive(Debug)]
pub enum MultipartError {
    /// Missing boundary in Content-Type header.
    MissingBoundary,
    /// Invalid boundary format.
    InvalidBoundary,
    /// File size exceeds limit.
    FileTooLarge { size: usize, max: usize },
    /// Total upload size exceeds limit.
    TotalTooLarge { size: usize, max: usize },
    /// Too many fields.
    TooManyFields { count: usize, max: usize },
    /// Missing Content-Disposition header.
    MissingContentDisposition,
    /// Invalid Content-Disposition header.
    InvalidContentDisposition { detail: String },
    /// Invalid part headers.
    InvalidPartHeaders { detail: String },
    /// Unexpected end of input.
    UnexpectedEof,
    /// Invalid multipart format.
    InvalidFormat { detail: &'static str },
    /// I/O error while spooling a file part.
    Io(std::io::Error),
}

impl std::fmt::Display for MultipartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBoundary => write!(f, "missing boundary in multipart Content-Type"),
            Self::InvalidBoundary => write!(f, "invalid multipart boundary"),
            Self::FileTooLarge { size, max } => {
                write!(f, "file too large: {size} bytes exceeds limit of {max}")
            }
            Self::TotalTooLarge { size, max } => {
                write!(
                    f,
                    "total upload too large: {size} bytes exceeds limit of {max}"
                )
            }
            Self::TooManyFields { count, max } => {
                write!(f, "too many fields: {count} exceeds limit of {max}")
            }
            Self::MissingContentDisposition => {
                write!(f, "missing Content-Disposition header in part")
            }
            Self::InvalidContentDisposition { detail } => {
                write!(f, "invalid Content-Disposition: {detail}")
            }
            Self::InvalidPartHeaders { detail } => write!(f, "invalid part headers: {detail}"),
            Self::UnexpectedEof => write!(f, "unexpected end of multipart data"),
            Self::InvalidFormat { detail } => write!(f, "invalid multipart format: {detail}"),
            Self::Io(e) => write!(f, "failed to spool file part: {e}"),
        }
    }
}

impl std::error::Error for MultipartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MultipartError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// One part of a multipart body, borrowing its content from the body.
#[derive(Debug, Clone)]
pub struct Part<'a> {
    /// Field name from Content-Disposition, as sent.
    pub name: ParamText,
    /// Filename from Content-Disposition (if present), as sent.
    pub filename: Option<ParamText>,
    /// Content-Type of the part (if present).
    pub content_type: Option<String>,
    /// All part headers, names lowercased, values as raw trimmed bytes.
    pub headers: HashMap<String, Vec<u8>>,
    /// The part's content.
    pub data: &'a [u8],
}

impl Part<'_> {
    /// Returns true if this part is a file upload.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Returns true if this part is a regular form field.
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.filename.is_none()
    }
}

#[derive(Debug)]
enum UploadStorage {
    InMemory(Vec<u8>),
    Spooled(NamedTempFile),
}

/// An uploaded file with its metadata.
///
/// The content lives in memory or in a temporary file. A temporary file is
/// deleted when the `UploadFile` is dropped.
#[derive(Debug)]
pub struct UploadFile {
    field_name: ParamText,
    filename: ParamText,
    content_type: String,
    size: usize,
    storage: UploadStorage,
}

impl UploadFile {
    /// Build an upload from a file part, spooling it when it is at least
    /// `spool_threshold` bytes long.
    ///
    /// Returns `Ok(None)` if the part is not a file.
    pub fn from_part(part: &Part<'_>, spool_threshold: usize) -> Result<Option<Self>, MultipartError> {
        let Some(filename) = &part.filename else {
            return Ok(None);
        };

        let storage = if part.data.len() >= spool_threshold {
            let mut file = tempfile::Builder::new()
                .prefix("reqparam-upload-")
                .suffix(".tmp")
                .tempfile()?;
            file.write_all(part.data)?;
            file.flush()?;
            debug!(
                field = %part.name,
                filename = %filename,
                size = part.data.len(),
                path = %file.path().display(),
                "spooled upload to temporary file"
            );
            UploadStorage::Spooled(file)
        } else {
            UploadStorage::InMemory(part.data.to_vec())
        };

        Ok(Some(Self {
            field_name: part.name.clone(),
            filename: filename.clone(),
            content_type: part
                .content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_FILE_CONTENT_TYPE.to_string()),
            size: part.data.len(),
            storage,
        }))
    }

    /// The form field this file was uploaded under.
    ///
    /// Raw bytes as sent, or UTF-8 after charset normalisation.
    #[must_use]
    pub fn field_name(&self) -> &ParamText {
        &self.field_name
    }

    /// The original filename, encoded like [`field_name`](Self::field_name).
    #[must_use]
    pub fn filename(&self) -> &ParamText {
        &self.filename
    }

    /// Content-Type of the file.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Get the file size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true when this file has been spooled to a temporary file.
    #[must_use]
    pub fn is_spooled(&self) -> bool {
        matches!(self.storage, UploadStorage::Spooled(_))
    }

    /// Path to the spooled temporary file, if this upload is backed by disk.
    #[must_use]
    pub fn spooled_path(&self) -> Option<&Path> {
        match &self.storage {
            UploadStorage::InMemory(_) => None,
            UploadStorage::Spooled(file) => Some(file.path()),
        }
    }

    /// Read the whole file content.
    pub fn bytes(&self) -> std::io::Result<Vec<u8>> {
        match &self.storage {
            UploadStorage::InMemory(data) => Ok(data.clone()),
            UploadStorage::Spooled(file) => std::fs::read(file.path()),
        }
    }

    /// Open an independent reader positioned at the start of the content.
    pub fn reader(&self) -> std::io::Result<Box<dyn Read + '_>> {
        match &self.storage {
            UploadStorage::InMemory(data) => Ok(Box::new(data.as_slice())),
            UploadStorage::Spooled(file) => Ok(Box::new(file.reopen()?)),
        }
    }

    /// Get the file extension from the filename.
    ///
    /// `None` when the filename has no extension or is not UTF-8.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let filename = self.filename.as_str()?;
        filename
            .rsplit('.')
            .next()
            .filter(|ext| !ext.is_empty() && *ext != filename)
    }

    /// Re-decode the field name and filename under `charset`.
    pub(crate) fn decode_names(&mut self, charset: Charset) -> Result<(), DecodeError> {
        let field_name = charset.decode(self.field_name.as_bytes())?;
        let filename = charset.decode(self.filename.as_bytes())?;
        self.field_name = field_name.into();
        self.filename = filename.into();
        Ok(())
    }
}

/// Parse boundary from Content-Type header.
///
/// Content-Type format: `multipart/form-data; boundary=----WebKitFormBoundary...`
pub fn parse_boundary(content_type: &str) -> Result<String, MultipartError> {
    let mut segments = header::split_params(content_type);
    let main = segments.next().unwrap_or("").trim();
    if !main.eq_ignore_ascii_case("multipart/form-data") {
        return Err(MultipartError::InvalidBoundary);
    }

    for segment in segments {
        let Some((k, v)) = segment.split_once('=') else {
            continue;
        };
        if k.trim().eq_ignore_ascii_case("boundary") {
            let boundary = header::unquote(v.as_bytes());
            let boundary =
                std::str::from_utf8(&boundary).map_err(|_| MultipartError::InvalidBoundary)?;
            if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
                return Err(MultipartError::InvalidBoundary);
            }
            return Ok(boundary.to_string());
        }
    }

    Err(MultipartError::MissingBoundary)
}

/// Multipart parser (boundary-based).
#[derive(Debug)]
pub struct MultipartParser {
    delimiter: memmem::Finder<'static>,
    config: MultipartConfig,
}

impl MultipartParser {
    /// Create a new parser with the given boundary.
    #[must_use]
    pub fn new(boundary: &str, config: MultipartConfig) -> Self {
        let delimiter = format!("--{boundary}").into_bytes();
        Self {
            delimiter: memmem::Finder::new(&delimiter).into_owned(),
            config,
        }
    }

    /// Parse all parts from the body.
    pub fn parse<'a>(&self, body: &'a [u8]) -> Result<Vec<Part<'a>>, MultipartError> {
        let delimiter_len = self.delimiter.needle().len();
        let mut parts = Vec::new();
        let mut total_size = 0usize;

        // Skip preamble and find first boundary
        let mut pos = self.find_boundary_from(body, 0)?;

        loop {
            let boundary_end = pos + delimiter_len;
            if body[boundary_end..].starts_with(b"--") {
                break;
            }

            if parts.len() >= self.config.max_fields {
                return Err(MultipartError::TooManyFields {
                    count: parts.len() + 1,
                    max: self.config.max_fields,
                });
            }

            pos = boundary_end;
            if !body[pos..].starts_with(b"\r\n") {
                return Err(MultipartError::InvalidFormat {
                    detail: "expected CRLF after boundary",
                });
            }
            pos += 2;

            let (headers, header_end) = parse_part_headers(body, pos)?;
            pos = header_end;

            let content_disp = headers
                .get("content-disposition")
                .ok_or(MultipartError::MissingContentDisposition)?;
            let (name, filename) = parse_content_disposition(content_disp)?;
            let content_type = headers
                .get("content-type")
                .map(|value| String::from_utf8_lossy(value).into_owned());

            let data_end = self.find_boundary_from(body, pos)?;
            // The CRLF before a delimiter belongs to the delimiter.
            if data_end < pos + 2 {
                return Err(MultipartError::InvalidFormat {
                    detail: "missing CRLF before boundary",
                });
            }
            let data = &body[pos..data_end - 2];

            if filename.is_some() && data.len() > self.config.max_file_size {
                return Err(MultipartError::FileTooLarge {
                    size: data.len(),
                    max: self.config.max_file_size,
                });
            }

            total_size += data.len();
            if total_size > self.config.max_total_size {
                return Err(MultipartError::TotalTooLarge {
                    size: total_size,
                    max: self.config.max_total_size,
                });
            }

            parts.push(Part {
                name,
                filename,
                content_type,
                headers,
                data,
            });

            pos = data_end;
        }

        Ok(parts)
    }

    /// Parse the body and collect its parts into a parameter map.
    ///
    /// Text parts become [`ParamValue::Text`]; file parts become
    /// [`ParamValue::File`], spooled per the configured threshold. If any
    /// part fails, uploads created so far are dropped with the partial map.
    pub fn parse_params(&self, body: &[u8]) -> Result<ParamMap, MultipartError> {
        let parts = self.parse(body)?;
        let mut params = ParamMap::with_capacity(parts.len());

        for part in &parts {
            let value = match UploadFile::from_part(part, self.config.spool_threshold)? {
                Some(upload) => ParamValue::File(Arc::new(upload)),
                None => ParamValue::Text(ParamText::from(part.data)),
            };
            params.add(part.name.clone(), value);
        }

        Ok(params)
    }

    /// Find the next delimiter at or after `start`.
    ///
    /// Delimiters only count at the start of the body or right after CRLF,
    /// and must be followed by CRLF (next part) or `--` (final boundary).
    fn find_boundary_from(&self, data: &[u8], start: usize) -> Result<usize, MultipartError> {
        let delimiter_len = self.delimiter.needle().len();

        for offset in self.delimiter.find_iter(&data[start..]) {
            let i = start + offset;
            if i != 0 && (i < 2 || data[i - 2..i] != *b"\r\n") {
                continue;
            }

            let boundary_end = i + delimiter_len;
            if boundary_end + 2 > data.len() {
                return Err(MultipartError::UnexpectedEof);
            }
            let suffix = &data[boundary_end..boundary_end + 2];
            if suffix != b"\r\n" && suffix != b"--" {
                continue;
            }

            return Ok(i);
        }

        Err(MultipartError::UnexpectedEof)
    }
}

fn parse_part_headers(
    data: &[u8],
    start: usize,
) -> Result<(HashMap<String, Vec<u8>>, usize), MultipartError> {
    let mut headers = HashMap::new();
    let mut pos = start;

    loop {
        let line_end = memmem::find(&data[pos..], b"\r\n")
            .map(|offset| pos + offset)
            .ok_or(MultipartError::UnexpectedEof)?;
        let line = &data[pos..line_end];
        if line.is_empty() {
            return Ok((headers, line_end + 2));
        }

        let colon = line.iter().position(|&b| b == b':').ok_or_else(|| {
            MultipartError::InvalidPartHeaders {
                detail: format!(
                    "header line without colon: {}",
                    String::from_utf8_lossy(line)
                ),
            }
        })?;
        // Names are tokens; values may carry the sender's charset.
        let name = std::str::from_utf8(line[..colon].trim_ascii())
            .ok()
            .filter(|name| name.is_ascii())
            .ok_or_else(|| MultipartError::InvalidPartHeaders {
                detail: "non-ASCII header name".to_string(),
            })?;
        headers.insert(
            name.to_ascii_lowercase(),
            line[colon + 1..].trim_ascii().to_vec(),
        );

        pos = line_end + 2;
    }
}

/// Parse Content-Disposition header value.
///
/// Format: `form-data; name="field"; filename="file.txt"`
fn parse_content_disposition(
    value: &[u8],
) -> Result<(ParamText, Option<ParamText>), MultipartError> {
    let mut name = None;
    let mut filename = None;

    for segment in header::split_params_bytes(value) {
        let Some(eq) = segment.iter().position(|&b| b == b'=') else {
            // The `form-data` disposition type itself.
            continue;
        };
        let key = segment[..eq].trim_ascii();
        let raw_value = &segment[eq + 1..];

        if key.eq_ignore_ascii_case(b"name") {
            name = Some(ParamText::from(header::unquote(raw_value)));
        } else if key.eq_ignore_ascii_case(b"filename") {
            let unquoted = header::unquote(raw_value);
            if is_traversal(&unquoted) {
                return Err(MultipartError::InvalidContentDisposition {
                    detail: "filename contains path traversal characters".to_string(),
                });
            }
            filename = Some(ParamText::from(unquoted));
        }
    }

    let name = name.ok_or_else(|| MultipartError::InvalidContentDisposition {
        detail: "missing name parameter".to_string(),
    })?;

    Ok((name, filename))
}

fn is_traversal(filename: &[u8]) -> bool {
    memmem::find(filename, b"..").is_some()
        || filename.iter().any(|&b| matches!(b, b'/' | b'\\' | 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_FORM: &str = concat!(
        "------boundary\r\n",
        "Content-Disposition: form-data; name=\"field1\"\r\n",
        "\r\n",
        "value1\r\n",
        "------boundary\r\n",
        "Content-Disposition: form-data; name=\"field2\"\r\n",
        "\r\n",
        "value2\r\n",
        "------boundary--\r\n"
    );

    const MIXED_FORM: &str = concat!(
        "--XyZ\r\n",
        "Content-Disposition: form-data; name=\"title\"\r\n",
        "\r\n",
        "Quarterly report\r\n",
        "--XyZ\r\n",
        "Content-Disposition: form-data; name=\"attachment\"; filename=\"report.csv\"\r\n",
        "Content-Type: text/csv\r\n",
        "\r\n",
        "a,b\r\n1,2\r\n",
        "--XyZ--\r\n"
    );

    #[test]
    fn test_parse_boundary() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        let boundary = parse_boundary(ct).unwrap();
        assert_eq!(boundary, "----WebKitFormBoundary7MA4YWxkTrZu0gW");
    }

    #[test]
    fn test_parse_boundary_quoted_and_mixed_case() {
        let ct = r#"Multipart/Form-Data; Boundary="simple-boundary""#;
        assert_eq!(parse_boundary(ct).unwrap(), "simple-boundary");
    }

    #[test]
    fn test_parse_boundary_ignores_semicolons_in_quotes() {
        let ct = r#"multipart/form-data; note="x;boundary=evil"; boundary="a;b""#;
        assert_eq!(parse_boundary(ct).unwrap(), "a;b");
    }

    #[test]
    fn test_parse_boundary_missing() {
        let result = parse_boundary("multipart/form-data");
        assert!(matches!(result, Err(MultipartError::MissingBoundary)));
    }

    #[test]
    fn test_parse_boundary_rejects_too_long_value() {
        let too_long = "a".repeat(MAX_BOUNDARY_LEN + 1);
        let ct = format!("multipart/form-data; boundary={too_long}");
        assert!(matches!(
            parse_boundary(&ct),
            Err(MultipartError::InvalidBoundary)
        ));
    }

    #[test]
    fn test_parse_content_disposition_case_insensitive_params() {
        let (name, filename) =
            parse_content_disposition(b"form-data; Name=\"field\"; FileName=\"upload.txt\"")
                .expect("content disposition should parse");
        assert_eq!(name, "field");
        assert_eq!(filename.unwrap(), "upload.txt");
    }

    #[test]
    fn test_parse_content_disposition_quoted_semicolons() {
        let (name, filename) = parse_content_disposition(
            br#"form-data; name="a;b"; filename="notes; final.txt""#,
        )
        .unwrap();
        assert_eq!(name, "a;b");
        assert_eq!(filename.unwrap(), "notes; final.txt");

        let (name, _) = parse_content_disposition(br#"form-data; name="say \"hi\"""#).unwrap();
        assert_eq!(name, r#"say "hi""#);
    }

    #[test]
    fn test_parse_content_disposition_keeps_raw_bytes() {
        let (name, filename) =
            parse_content_disposition(b"form-data; name=\"caf\xE9\"; filename=\"r\xE9sum\xE9.txt\"")
                .unwrap();
        assert_eq!(name.as_bytes(), b"caf\xE9");
        assert_eq!(filename.unwrap().as_bytes(), b"r\xE9sum\xE9.txt");
    }

    #[test]
    fn test_parse_content_disposition_rejects_traversal() {
        let result = parse_content_disposition(b"form-data; name=\"f\"; filename=\"../etc/passwd\"");
        assert!(matches!(
            result,
            Err(MultipartError::InvalidContentDisposition { .. })
        ));
    }

    #[test]
    fn test_parse_simple_form() {
        let parser = MultipartParser::new("----boundary", MultipartConfig::default());
        let parts = parser.parse(SIMPLE_FORM.as_bytes()).unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "field1");
        assert_eq!(parts[0].data, b"value1");
        assert!(parts[0].is_field());
        assert_eq!(parts[1].name, "field2");
        assert_eq!(parts[1].data, b"value2");
    }

    #[test]
    fn test_parse_preamble_is_skipped() {
        let body = format!("ignored preamble\r\n{SIMPLE_FORM}");
        let parser = MultipartParser::new("----boundary", MultipartConfig::default());
        let parts = parser.parse(body.as_bytes()).unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_parse_file_part_keeps_inner_crlf() {
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        let parts = parser.parse(MIXED_FORM.as_bytes()).unwrap();

        assert_eq!(parts.len(), 2);
        assert!(parts[1].is_file());
        assert_eq!(
            parts[1].filename.as_ref().and_then(ParamText::as_str),
            Some("report.csv")
        );
        assert_eq!(parts[1].content_type.as_deref(), Some("text/csv"));
        assert_eq!(parts[1].data, b"a,b\r\n1,2");
    }

    #[test]
    fn test_boundary_like_sequence_in_part_body_does_not_terminate_part() {
        let body = concat!(
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"note\"\r\n",
            "\r\n",
            "see --XyZ inline\r\n",
            "--XyZ--\r\n"
        );
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        let parts = parser.parse(body.as_bytes()).unwrap();
        assert_eq!(parts[0].data, b"see --XyZ inline");
    }

    #[test]
    fn test_missing_final_boundary_is_unexpected_eof() {
        let body = concat!(
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"note\"\r\n",
            "\r\n",
            "truncated"
        );
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        assert!(matches!(
            parser.parse(body.as_bytes()),
            Err(MultipartError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_non_utf8_part_headers_are_kept_as_bytes() {
        let body: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"caf\xE9\"\r\n\
X-Note: cr\xE8me\r\n\
\r\n\
value\r\n\
--XyZ--\r\n";
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        let parts = parser.parse(body).unwrap();

        assert_eq!(parts[0].name.as_bytes(), b"caf\xE9");
        assert_eq!(parts[0].headers["x-note"], b"cr\xE8me");

        let params = parser.parse_params(body).unwrap();
        assert_eq!(params.keys(), [&ParamText::from(&b"caf\xE9"[..])]);
    }

    #[test]
    fn test_non_ascii_header_name_is_rejected() {
        let body: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"a\"\r\n\
X-\xE9: 1\r\n\
\r\n\
v\r\n\
--XyZ--\r\n";
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        assert!(matches!(
            parser.parse(body),
            Err(MultipartError::InvalidPartHeaders { .. })
        ));
    }

    #[test]
    fn test_part_without_content_disposition_is_rejected() {
        let body = concat!(
            "--XyZ\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "x\r\n",
            "--XyZ--\r\n"
        );
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        assert!(matches!(
            parser.parse(body.as_bytes()),
            Err(MultipartError::MissingContentDisposition)
        ));
    }

    #[test]
    fn test_too_many_fields() {
        let parser = MultipartParser::new("----boundary", MultipartConfig::new().max_fields(1));
        assert!(matches!(
            parser.parse(SIMPLE_FORM.as_bytes()),
            Err(MultipartError::TooManyFields { count: 2, max: 1 })
        ));
    }

    #[test]
    fn test_file_too_large() {
        let parser = MultipartParser::new("XyZ", MultipartConfig::new().max_file_size(4));
        assert!(matches!(
            parser.parse(MIXED_FORM.as_bytes()),
            Err(MultipartError::FileTooLarge { size: 8, max: 4 })
        ));
    }

    #[test]
    fn test_parse_params_spools_file_and_keeps_text() {
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        let params = parser.parse_params(MIXED_FORM.as_bytes()).unwrap();

        assert_eq!(params.get("title").and_then(ParamValue::as_str), Some("Quarterly report"));

        let upload = params
            .get("attachment")
            .and_then(ParamValue::file)
            .expect("attachment should be a file");
        assert_eq!(upload.field_name(), "attachment");
        assert_eq!(upload.filename(), "report.csv");
        assert_eq!(upload.content_type(), "text/csv");
        assert_eq!(upload.extension(), Some("csv"));
        assert_eq!(upload.size(), 8);
        assert!(upload.is_spooled());
        assert_eq!(upload.bytes().unwrap(), b"a,b\r\n1,2");

        let mut read_back = Vec::new();
        upload.reader().unwrap().read_to_end(&mut read_back).unwrap();
        assert_eq!(read_back, b"a,b\r\n1,2");
    }

    #[test]
    fn test_spool_threshold_keeps_small_files_in_memory() {
        let parser = MultipartParser::new("XyZ", MultipartConfig::new().spool_threshold(1024));
        let params = parser.parse_params(MIXED_FORM.as_bytes()).unwrap();
        let upload = params.get("attachment").and_then(ParamValue::file).unwrap();
        assert!(!upload.is_spooled());
        assert!(upload.spooled_path().is_none());
        assert_eq!(upload.bytes().unwrap(), b"a,b\r\n1,2");
    }

    #[test]
    fn test_dropping_params_removes_spooled_file() {
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        let params = parser.parse_params(MIXED_FORM.as_bytes()).unwrap();
        let path = params
            .get("attachment")
            .and_then(ParamValue::file)
            .and_then(|upload| upload.spooled_path())
            .map(Path::to_path_buf)
            .unwrap();

        assert!(path.exists());
        drop(params);
        assert!(!path.exists());
    }

    #[test]
    fn test_decode_names_transcodes_field_and_filename() {
        let body: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"pi\xE8ce\"; filename=\"r\xE9sum\xE9.txt\"\r\n\
\r\n\
cv\r\n\
--XyZ--\r\n";
        let parser = MultipartParser::new("XyZ", MultipartConfig::new().spool_threshold(usize::MAX));
        let mut params = parser.parse_params(body).unwrap();
        let ParamValue::File(upload) = params.remove(&b"pi\xE8ce"[..]).remove(0) else {
            panic!("expected a file part");
        };
        let mut upload = Arc::try_unwrap(upload).expect("sole owner");

        assert_eq!(upload.extension(), None);
        upload.decode_names(Charset::for_label("latin1").unwrap()).unwrap();
        assert_eq!(upload.field_name(), "pièce");
        assert_eq!(upload.filename(), "résumé.txt");
        assert_eq!(upload.extension(), Some("txt"));

        assert!(upload.decode_names(Charset::utf8()).is_ok());
    }

    #[test]
    fn test_file_without_content_type_defaults_to_octet_stream() {
        let body = concat!(
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"blob\"; filename=\"data.bin\"\r\n",
            "\r\n",
            "\x01\x02\r\n",
            "--XyZ--\r\n"
        );
        let parser = MultipartParser::new("XyZ", MultipartConfig::default());
        let params = parser.parse_params(body.as_bytes()).unwrap();
        let upload = params.get("blob").and_then(ParamValue::file).unwrap();
        assert_eq!(upload.content_type(), "application/octet-stream");
    }
}
