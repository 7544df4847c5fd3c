//! Content type lookup by file extension.

/// Fallback for keys with no or an unknown extension.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

static CONTENT_TYPES: &[(&str, &str)] = &[
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/x-icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("mjs", "text/javascript"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("ttf", "font/ttf"),
    ("txt", "text/plain"),
    ("wasm", "application/wasm"),
    ("wav", "audio/wav"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

/// Derives the MIME type of a key from its extension-like suffix.
///
/// Only the last path segment is considered and matching is case-insensitive.
pub fn content_type_of(key: &str) -> &'static str {
    let name = key.rsplit('/').next().unwrap_or(key);
    let Some((_, extension)) = name.rsplit_once('.') else {
        return DEFAULT_CONTENT_TYPE;
    };

    let extension = extension.to_ascii_lowercase();
    CONTENT_TYPES
        .binary_search_by(|(ext, _)| (*ext).cmp(extension.as_str()))
        .map(|index| CONTENT_TYPES[index].1)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
