//! Request path resolution
//!
//! Turns a raw, percent-encoded request path into an absolute path confined to
//! the configured root, then consults the filesystem for directory, index and
//! extension handling.

use crate::error::SendError;
use crate::logger;
use crate::send::fs::{FileMetadata, FileSystem};
use crate::send::options::{Dotfiles, SendOptions};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Path length the filesystem refuses (Linux `PATH_MAX`)
const MAX_PATH_LEN: usize = 4096;
/// Longest single path component
const MAX_NAME_LEN: usize = 255;

/// Characters escaped when a raw path is echoed into `Location`
const LOCATION: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// File selected for the request, with its one metadata snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    pub metadata: FileMetadata,
}

/// What path resolution decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Serve this file
    File(ResolvedTarget),
    /// Directory requested without trailing slash; 301 to this location
    Redirect(String),
}

/// Resolves request paths for one configured root
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// `root` is made absolute and lexically normalized up front
    pub fn new(root: &Path) -> io::Result<Self> {
        let absolute = std::path::absolute(root)?;
        Ok(Self {
            root: normalize(&absolute),
        })
    }

    /// Resolve `raw_path` to a file, a redirect, or an error
    pub async fn resolve<F: FileSystem>(
        &self,
        fs: &F,
        options: &SendOptions,
        raw_path: &str,
    ) -> Result<Resolution, SendError> {
        let decoded = decode(raw_path)?;
        let path = self.confine(&decoded, options.dotfiles)?;
        let trailing_slash = raw_path.ends_with('/');

        if trailing_slash && options.index_enabled() {
            return self.resolve_index(fs, options, &path).await;
        }

        match fs.metadata(&path).await {
            Ok(meta) if meta.is_dir => {
                if trailing_slash {
                    // Index lookup is disabled and listings are not generated
                    Err(SendError::Forbidden("directory index disabled"))
                } else {
                    Ok(Resolution::Redirect(redirect_location(raw_path)))
                }
            }
            Ok(_) if trailing_slash => Err(SendError::NotFound),
            Ok(metadata) => Ok(Resolution::File(ResolvedTarget { path, metadata })),
            Err(err) if err.kind() == io::ErrorKind::NotFound && !trailing_slash => {
                match try_extensions(fs, options, &path).await {
                    Some(target) => Ok(Resolution::File(target)),
                    None => Err(SendError::NotFound),
                }
            }
            Err(err) => Err(SendError::from_io(&err)),
        }
    }

    /// Join the decoded path onto the root, refusing to climb above it
    fn confine(&self, decoded: &str, dotfiles: Dotfiles) -> Result<PathBuf, SendError> {
        let mut segments: Vec<&str> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        logger::log_warning(&format!(
                            "Path traversal attempt blocked: {decoded}"
                        ));
                        return Err(SendError::Forbidden("path escapes root"));
                    }
                }
                name => segments.push(name),
            }
        }

        if segments.iter().any(|s| s.starts_with('.')) {
            match dotfiles {
                Dotfiles::Allow => {}
                Dotfiles::Deny => return Err(SendError::NotFound),
                Dotfiles::Forbid => return Err(SendError::Forbidden("dotfile access denied")),
            }
        }

        if segments.iter().any(|s| s.len() > MAX_NAME_LEN) {
            return Err(SendError::NotFound);
        }

        let mut path = self.root.clone();
        path.extend(&segments);

        // Re-check the invariant on the final value and fail closed
        let path = normalize(&path);
        if !path.starts_with(&self.root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {decoded} -> {}",
                path.display()
            ));
            return Err(SendError::Forbidden("path escapes root"));
        }
        if too_long(&path) {
            return Err(SendError::NotFound);
        }
        Ok(path)
    }

    async fn resolve_index<F: FileSystem>(
        &self,
        fs: &F,
        options: &SendOptions,
        dir: &Path,
    ) -> Result<Resolution, SendError> {
        let mut last_err = None;
        for name in &options.index {
            let candidate = dir.join(name);
            if too_long(&candidate) {
                continue;
            }
            match fs.metadata(&candidate).await {
                Ok(meta) if !meta.is_dir => {
                    return Ok(Resolution::File(ResolvedTarget {
                        path: candidate,
                        metadata: meta,
                    }));
                }
                Ok(_) => {}
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.map_or(SendError::NotFound, |err| SendError::from_io(&err)))
    }
}

/// Percent-decode a request path
///
/// Any `%` not followed by two hex digits, or a result that is not UTF-8, is a
/// bad request; so is an embedded null byte.
pub fn decode(raw: &str) -> Result<String, SendError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(SendError::BadRequest("malformed percent-encoding"));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| SendError::BadRequest("path is not valid UTF-8"))?;
    if decoded.contains('\0') {
        return Err(SendError::BadRequest("null byte in path"));
    }
    Ok(decoded.into_owned())
}

/// `PATH_MAX` counts the trailing NUL
fn too_long(path: &Path) -> bool {
    path.as_os_str().len() >= MAX_PATH_LEN
}

/// Lexically resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// `Location` for the directory redirect: the original path plus `/`
///
/// Leading slashes are collapsed so `//host` can never become a
/// protocol-relative redirect.
fn redirect_location(raw_path: &str) -> String {
    let trimmed = raw_path.trim_start_matches('/');
    let location = format!("/{trimmed}/");
    utf8_percent_encode(&location, LOCATION).to_string()
}

async fn try_extensions<F: FileSystem>(
    fs: &F,
    options: &SendOptions,
    path: &Path,
) -> Option<ResolvedTarget> {
    if options.extensions.is_empty() || path.extension().is_some() {
        return None;
    }
    let base = path.as_os_str().to_string_lossy();
    for ext in &options.extensions {
        let candidate = PathBuf::from(format!("{base}.{}", ext.trim_start_matches('.')));
        if too_long(&candidate) {
            continue;
        }
        if let Ok(meta) = fs.metadata(&candidate).await {
            if !meta.is_dir {
                return Some(ResolvedTarget {
                    path: candidate,
                    metadata: meta,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::send::fs::memory::MemoryFs;

    fn site() -> MemoryFs {
        MemoryFs::new()
            .with_file("/srv/www/hello.txt", b"hello")
            .with_file("/srv/www/docs/index.html", b"<h1>docs</h1>")
            .with_file("/srv/www/about.html", b"about")
            .with_file("/srv/www/.env", b"SECRET=1")
            .with_file("/srv/www/.well-known/x.txt", b"x")
            .with_dir("/srv/www/empty")
            .with_dir("/srv/www/nested/index.html")
            .with_denied("/srv/www/locked.txt")
            .with_file("/srv/secret.txt", b"outside")
    }

    fn resolver() -> PathResolver {
        PathResolver::new(Path::new("/srv/www")).unwrap()
    }

    async fn resolve(raw: &str, options: &SendOptions) -> Result<Resolution, SendError> {
        resolver().resolve(&site(), options, raw).await
    }

    fn file_path(res: Resolution) -> PathBuf {
        match res {
            Resolution::File(target) => target.path,
            Resolution::Redirect(loc) => panic!("unexpected redirect to {loc}"),
        }
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("/a%20b").unwrap(), "/a b");
        assert_eq!(decode("/caf%C3%A9").unwrap(), "/café");
        assert!(matches!(decode("/%"), Err(SendError::BadRequest(_))));
        assert!(matches!(decode("/%zz"), Err(SendError::BadRequest(_))));
        assert!(matches!(decode("/%4"), Err(SendError::BadRequest(_))));
        assert!(matches!(decode("/%FF"), Err(SendError::BadRequest(_))));
        assert!(matches!(decode("/a%00b"), Err(SendError::BadRequest(_))));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(
            normalize(Path::new("/srv/www/../www/./")),
            PathBuf::from("/srv/www")
        );
    }

    #[test]
    fn test_root_with_parent_segments() {
        let resolver = PathResolver::new(Path::new("/srv/other/../www")).unwrap();
        assert_eq!(resolver.root, Path::new("/srv/www"));
    }

    #[tokio::test]
    async fn test_resolves_file() {
        let opts = SendOptions::new("/srv/www");
        let res = resolve("/hello.txt", &opts).await.unwrap();
        assert_eq!(file_path(res), PathBuf::from("/srv/www/hello.txt"));

        let res = resolve("/docs/../hello.txt", &opts).await.unwrap();
        assert_eq!(file_path(res), PathBuf::from("/srv/www/hello.txt"));
    }

    #[tokio::test]
    async fn test_traversal_forbidden() {
        let opts = SendOptions::new("/srv/www");
        for raw in ["/../secret.txt", "/docs/../../secret.txt", "/%2e%2e/secret.txt", "/..%2Fsecret.txt"] {
            let err = resolve(raw, &opts).await.unwrap_err();
            assert_eq!(err.status(), 403, "{raw}");
        }
    }

    #[tokio::test]
    async fn test_bad_request() {
        let opts = SendOptions::new("/srv/www");
        assert_eq!(resolve("/%E0%A4%A", &opts).await.unwrap_err().status(), 400);
        assert_eq!(resolve("/hello.txt%00", &opts).await.unwrap_err().status(), 400);
    }

    #[tokio::test]
    async fn test_dotfiles() {
        let deny = SendOptions::new("/srv/www");
        assert!(matches!(resolve("/.env", &deny).await, Err(SendError::NotFound)));
        assert!(matches!(
            resolve("/.well-known/x.txt", &deny).await,
            Err(SendError::NotFound)
        ));

        let forbid = SendOptions {
            dotfiles: Dotfiles::Forbid,
            ..deny.clone()
        };
        assert_eq!(resolve("/.env", &forbid).await.unwrap_err().status(), 403);

        let allow = SendOptions {
            dotfiles: Dotfiles::Allow,
            ..deny
        };
        let res = resolve("/.env", &allow).await.unwrap();
        assert_eq!(file_path(res), PathBuf::from("/srv/www/.env"));
    }

    #[tokio::test]
    async fn test_missing_and_denied() {
        let opts = SendOptions::new("/srv/www");
        assert!(matches!(resolve("/nope.txt", &opts).await, Err(SendError::NotFound)));
        assert_eq!(resolve("/locked.txt", &opts).await.unwrap_err().status(), 403);
        assert!(matches!(
            resolve("/hello.txt/", &opts).await,
            Err(SendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_path_too_long() {
        let opts = SendOptions::new("/srv/www");
        let long_name = format!("/{}", "a".repeat(MAX_NAME_LEN + 1));
        assert!(matches!(resolve(&long_name, &opts).await, Err(SendError::NotFound)));

        let long_path = "/abc".repeat(MAX_PATH_LEN / 4 + 1);
        assert!(matches!(resolve(&long_path, &opts).await, Err(SendError::NotFound)));

        // "/srv/www" + 4088 bytes is exactly the limit, which already fails
        let at_limit = format!("/{}", "abcdefg/".repeat(511));
        assert_eq!(at_limit.len(), 4089);
        let at_limit = &at_limit[..4088];
        assert!(matches!(resolve(at_limit, &opts).await, Err(SendError::NotFound)));
    }

    #[tokio::test]
    async fn test_directory_redirect() {
        let opts = SendOptions::new("/srv/www");
        assert_eq!(
            resolve("/docs", &opts).await.unwrap(),
            Resolution::Redirect("/docs/".to_string())
        );
        assert_eq!(
            resolve("//docs", &opts).await.unwrap(),
            Resolution::Redirect("/docs/".to_string())
        );
    }

    #[tokio::test]
    async fn test_index_resolution() {
        let opts = SendOptions::new("/srv/www");
        let res = resolve("/docs/", &opts).await.unwrap();
        assert_eq!(file_path(res), PathBuf::from("/srv/www/docs/index.html"));

        // no index present, or the candidate is a directory
        assert!(matches!(resolve("/empty/", &opts).await, Err(SendError::NotFound)));
        assert!(matches!(resolve("/nested/", &opts).await, Err(SendError::NotFound)));

        let ordered = SendOptions {
            index: vec!["missing.html".into(), "index.html".into()],
            ..opts
        };
        let res = resolve("/docs/", &ordered).await.unwrap();
        assert_eq!(file_path(res), PathBuf::from("/srv/www/docs/index.html"));
    }

    #[tokio::test]
    async fn test_index_disabled() {
        let opts = SendOptions {
            index: Vec::new(),
            ..SendOptions::new("/srv/www")
        };
        assert_eq!(resolve("/docs/", &opts).await.unwrap_err().status(), 403);
        assert!(matches!(
            resolve("/docs", &opts).await.unwrap(),
            Resolution::Redirect(_)
        ));
    }

    #[tokio::test]
    async fn test_extension_fallback() {
        let opts = SendOptions {
            extensions: vec!["htm".into(), "html".into()],
            ..SendOptions::new("/srv/www")
        };
        let res = resolve("/about", &opts).await.unwrap();
        assert_eq!(file_path(res), PathBuf::from("/srv/www/about.html"));

        let plain = SendOptions::new("/srv/www");
        assert!(matches!(resolve("/about", &plain).await, Err(SendError::NotFound)));
    }
}
