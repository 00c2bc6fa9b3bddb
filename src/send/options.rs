//! Sender options
//!
//! Built once (from config or code) and read-only for the life of the process.

use crate::http::cache::{CachePolicy, MaxAge};
use serde::Deserialize;
use std::path::PathBuf;

/// What to do with path segments starting with `.`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dotfiles {
    /// Serve them like any other file
    Allow,
    /// Pretend they do not exist (404)
    #[default]
    Deny,
    /// Refuse with 403
    Forbid,
}

/// Sender configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SendOptions {
    /// Directory every resolved path is confined to
    pub root: PathBuf,
    /// Index candidates for `dir/` requests, in order; empty disables index lookup
    pub index: Vec<String>,
    pub etag: bool,
    pub last_modified: bool,
    pub max_age: MaxAge,
    pub immutable: bool,
    /// Emit `Cache-Control` at all
    pub cache_control: bool,
    pub dotfiles: Dotfiles,
    /// Extensions tried, in order, for extension-less paths that do not exist
    pub extensions: Vec<String>,
    /// First byte of the servable window
    pub start: Option<u64>,
    /// Last byte (inclusive) of the servable window
    pub end: Option<u64>,
    pub accept_ranges: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: vec!["index.html".to_string()],
            etag: true,
            last_modified: true,
            max_age: MaxAge::default(),
            immutable: false,
            cache_control: true,
            dotfiles: Dotfiles::default(),
            extensions: Vec::new(),
            start: None,
            end: None,
            accept_ranges: true,
        }
    }
}

impl SendOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn index_enabled(&self) -> bool {
        !self.index.is_empty()
    }

    pub const fn cache_policy(&self) -> Option<CachePolicy> {
        if self.cache_control {
            Some(CachePolicy {
                max_age: self.max_age,
                immutable: self.immutable,
            })
        } else {
            None
        }
    }

    /// Servable window of a file of `size` bytes after `start`/`end`
    pub fn window(&self, size: u64) -> ContentWindow {
        let offset = self.start.unwrap_or(0);
        let mut len = size.saturating_sub(offset);
        if let Some(end) = self.end {
            let bytes = if end < offset {
                0
            } else {
                (end - offset).saturating_add(1)
            };
            len = len.min(bytes);
        }
        ContentWindow { offset, len }
    }
}

/// Byte window `[offset, offset + len)` of the file that is visible to the client
///
/// Range offsets and `Content-Range` totals are relative to this window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentWindow {
    pub offset: u64,
    pub len: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = SendOptions::new("/srv");
        assert_eq!(opts.root, PathBuf::from("/srv"));
        assert_eq!(opts.index, vec!["index.html"]);
        assert!(opts.etag && opts.last_modified && opts.accept_ranges);
        assert_eq!(opts.dotfiles, Dotfiles::Deny);
        assert_eq!(
            opts.cache_policy().unwrap().to_header_value(),
            "public, max-age=0"
        );
    }

    #[test]
    fn test_window_full() {
        let opts = SendOptions::default();
        assert_eq!(opts.window(9), ContentWindow { offset: 0, len: 9 });
    }

    #[test]
    fn test_window_start_end() {
        let opts = SendOptions {
            start: Some(2),
            end: Some(5),
            ..SendOptions::default()
        };
        assert_eq!(opts.window(9), ContentWindow { offset: 2, len: 4 });

        let opts = SendOptions {
            start: Some(20),
            ..SendOptions::default()
        };
        assert_eq!(opts.window(9).len, 0);

        let opts = SendOptions {
            start: Some(5),
            end: Some(3),
            ..SendOptions::default()
        };
        assert_eq!(opts.window(9).len, 0);

        let opts = SendOptions {
            end: Some(100),
            ..SendOptions::default()
        };
        assert_eq!(opts.window(9), ContentWindow { offset: 0, len: 9 });
    }

    #[test]
    fn test_deserialize() {
        let opts: SendOptions = toml::from_str(
            r#"
            root = "public"
            index = []
            dotfiles = "forbid"
            max_age = "infinite"
            extensions = ["html"]
            "#,
        )
        .unwrap();
        assert!(!opts.index_enabled());
        assert_eq!(opts.dotfiles, Dotfiles::Forbid);
        assert_eq!(opts.max_age.as_secs(), 31_536_000);
        assert_eq!(opts.extensions, vec!["html"]);
        assert!(opts.etag);
    }
}
