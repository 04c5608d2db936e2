//! Mapping from blob names to index document keys.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

/// Derive the document key for a blob.
///
/// Keys may only contain ASCII letters, digits, `_`, `-` and `=`. Names already inside that
/// alphabet are used verbatim; anything else is URL-safe base64 encoded without padding.
pub fn document_key(blob_name: &str) -> String {
    if is_valid_key(blob_name) {
        blob_name.to_string()
    } else {
        URL_SAFE_NO_PAD.encode(blob_name.as_bytes())
    }
}

/// Whether `key` is non-empty and inside the accepted key alphabet.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'='))
}
