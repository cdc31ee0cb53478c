//! Best-effort content type detection from file extensions.

use std::path::Path;

const EXTENSIONS: &[(&str, &str)] = &[
    ("7z", "application/x-7z-compressed"),
    ("avi", "video/x-msvideo"),
    ("bmp", "image/bmp"),
    ("bz2", "application/x-bzip2"),
    ("c", "text/x-c"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    ("gif", "image/gif"),
    ("go", "text/x-go"),
    ("gz", "application/gzip"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("rs", "text/x-rust"),
    ("sh", "application/x-sh"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("toml", "application/toml"),
    ("txt", "text/plain"),
    ("wasm", "application/wasm"),
    ("wav", "audio/wav"),
    ("webp", "image/webp"),
    ("xml", "application/xml"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("zip", "application/zip"),
];

/// Guess the content type of `path` from its extension, case-insensitively.
///
/// Returns `None` when the path has no extension or the extension is unknown.
pub fn detect_path(path: impl AsRef<Path>) -> Option<&'static str> {
    let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
    EXTENSIONS
        .binary_search_by(|(known, _)| known.cmp(&ext.as_str()))
        .ok()
        .map(|i| EXTENSIONS[i].1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        assert!(EXTENSIONS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_detect_known() {
        assert_eq!(detect_path("a/b/readme.txt"), Some("text/plain"));
        assert_eq!(detect_path("IMAGE.PNG"), Some("image/png"));
        assert_eq!(detect_path("archive.tar.gz"), Some("application/gzip"));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_path("regular file"), None);
        assert_eq!(detect_path("data.unknownext"), None);
        assert_eq!(detect_path(".hidden"), None);
    }
}
