//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension. The lookup is a
//! collaborator of the sender so embedders can plug in their own table.

use std::borrow::Cow;

/// Extension to media-type lookup
pub trait MimeLookup: Send + Sync {
    /// Bare media type (no parameters) for a lowercase extension, if known
    fn lookup(&self, extension: &str) -> Option<&str>;

    /// Full Content-Type value for an optional extension
    ///
    /// Textual types get a `charset=UTF-8` parameter; unknown extensions fall back
    /// to `application/octet-stream`.
    fn content_type(&self, extension: Option<&str>) -> Cow<'_, str> {
        let media = extension.and_then(|ext| self.lookup(&ext.to_ascii_lowercase()));

        match media {
            Some(m) if is_textual(m) => Cow::Owned(format!("{m}; charset=UTF-8")),
            Some(m) => Cow::Borrowed(m),
            None => Cow::Borrowed(DEFAULT_TYPE),
        }
    }
}

/// Fallback for unknown extensions
pub const DEFAULT_TYPE: &str = "application/octet-stream";

fn is_textual(media: &str) -> bool {
    media.starts_with("text/")
        || matches!(
            media,
            "application/javascript" | "application/json" | "application/xml"
        )
}

/// Built-in table of common web types
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeTable;

impl MimeLookup for MimeTable {
    fn lookup(&self, extension: &str) -> Option<&str> {
        let media = match extension {
            // Text
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "txt" | "text" | "log" => "text/plain",
            "md" | "markdown" => "text/markdown",
            "csv" => "text/csv",
            "xml" => "application/xml",

            // JavaScript/WASM
            "js" | "mjs" => "application/javascript",
            "json" | "map" => "application/json",
            "wasm" => "application/wasm",

            // Images
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "ico" => "image/x-icon",
            "webp" => "image/webp",
            "avif" => "image/avif",

            // Video
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "ogv" => "video/ogg",
            "mov" => "video/quicktime",
            "avi" => "video/x-msvideo",

            // Audio
            "mp3" => "audio/mpeg",
            "ogg" | "oga" => "audio/ogg",
            "wav" => "audio/wav",
            "flac" => "audio/flac",
            "m4a" => "audio/mp4",

            // Fonts
            "woff" => "font/woff",
            "woff2" => "font/woff2",
            "ttf" => "font/ttf",
            "otf" => "font/otf",
            "eot" => "application/vnd.ms-fontobject",

            // Documents
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "gz" | "gzip" => "application/gzip",
            "tar" => "application/x-tar",

            _ => return None,
        };
        Some(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        let table = MimeTable;
        assert_eq!(table.content_type(Some("html")), "text/html; charset=UTF-8");
        assert_eq!(table.content_type(Some("css")), "text/css; charset=UTF-8");
        assert_eq!(
            table.content_type(Some("js")),
            "application/javascript; charset=UTF-8"
        );
        assert_eq!(table.content_type(Some("json")), "application/json; charset=UTF-8");
        assert_eq!(table.content_type(Some("png")), "image/png");
        assert_eq!(table.content_type(Some("mp4")), "video/mp4");
    }

    #[test]
    fn test_case_insensitive_extension() {
        assert_eq!(MimeTable.content_type(Some("PNG")), "image/png");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(MimeTable.content_type(Some("xyz")), DEFAULT_TYPE);
        assert_eq!(MimeTable.content_type(None), DEFAULT_TYPE);
    }

    #[test]
    fn test_custom_lookup() {
        struct Only;
        impl MimeLookup for Only {
            fn lookup(&self, extension: &str) -> Option<&str> {
                (extension == "rs").then_some("text/rust")
            }
        }
        assert_eq!(Only.content_type(Some("rs")), "text/rust; charset=UTF-8");
        assert_eq!(Only.content_type(Some("html")), DEFAULT_TYPE);
    }
}
