//! Download response headers.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use vellum_core::constants::DEFAULT_CONTENT_TYPE;

/// Characters left unescaped in an RFC 5987 `filename*` value (`attr-char`).
/// Everything else, spaces included, is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Headers sent ahead of the first content byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub content_type: String,
    pub content_disposition: String,
    pub content_length: u64,
}

impl ResponseHeaders {
    /// Build the attachment headers for `file_name` with the given length.
    pub fn for_file(file_name: &str, content_length: u64) -> Self {
        Self {
            content_type: content_type_for(file_name),
            content_disposition: content_disposition(file_name),
            content_length,
        }
    }
}

/// MIME type from the file extension, `application/octet-stream` when unknown.
pub fn content_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// `attachment; filename*=UTF-8''<encoded>`
pub fn content_disposition(file_name: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}",
        utf8_percent_encode(file_name, ATTR_CHAR)
    )
}
