use std::path::Path;

use mime_guess::mime::{self, Mime};

// Order matters only for readability; extensions are compared exactly.
static EXTENSION_TABLE: [(&[u8], Mime); 6] = [
    (b".html", mime::TEXT_HTML),
    (b".jpg", mime::IMAGE_JPEG),
    (b".jpeg", mime::IMAGE_JPEG),
    (b".gif", mime::IMAGE_GIF),
    (b".png", mime::IMAGE_PNG),
    (b".css", mime::TEXT_CSS),
];

static FALLBACK: Mime = mime::APPLICATION_OCTET_STREAM;

/// Content type for `path`, keyed on everything from its last `.`.
///
/// Matching is case-sensitive and looks at the whole path string, not just
/// the file name, so `a.PNG` and `dir.v2/file` both fall back to
/// `application/octet-stream`.
pub fn classify<P: AsRef<Path>>(path: P) -> &'static str {
    let bytes = path.as_ref().as_os_str().as_encoded_bytes();
    let Some(dot) = bytes.iter().rposition(|&b| b == b'.') else {
        return FALLBACK.essence_str();
    };
    let extension = &bytes[dot..];
    EXTENSION_TABLE
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| mime.essence_str())
        .unwrap_or_else(|| FALLBACK.essence_str())
}
