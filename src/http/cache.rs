//! HTTP cache control module
//!
//! Provides `ETag` generation from file metadata, entity-tag list matching and
//! the `Cache-Control` value advertised with every file response.

use serde::{Deserialize, Deserializer};
use std::time::{SystemTime, UNIX_EPOCH};

/// One year, the ceiling for `max-age`
pub const MAX_MAX_AGE: u64 = 31_536_000;

/// Weak entity tag derived from size and modification time
///
/// Two files with the same size and mtime share a tag; that collision is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTag(String);

impl EntityTag {
    /// Build `W/"<size hex>-<mtime millis hex>"`
    ///
    /// # Examples
    /// ```
    /// use static_send::http::cache::EntityTag;
    /// use std::time::{Duration, UNIX_EPOCH};
    ///
    /// let tag = EntityTag::from_metadata(9, Some(UNIX_EPOCH + Duration::from_millis(4096)));
    /// assert_eq!(tag.as_str(), "W/\"9-1000\"");
    /// ```
    pub fn from_metadata(size: u64, modified: Option<SystemTime>) -> Self {
        let millis = modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_millis());
        Self(format!("W/\"{size:x}-{millis:x}\""))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Weak comparison: opaque tags equal once the `W/` prefix is dropped
    pub fn weak_eq(&self, other: &str) -> bool {
        opaque(&self.0) == opaque(other.trim())
    }
}

fn opaque(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// Check a client entity-tag list (`If-None-Match` / `If-Match`) against our tag
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", W/"def456"`
/// - Wildcard: `*`
///
/// A missing server tag only matches the wildcard.
pub fn etag_list_matches(header: &str, etag: Option<&EntityTag>) -> bool {
    let header = header.trim();
    if header == "*" {
        return true;
    }
    let Some(etag) = etag else {
        return false;
    };
    header
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .any(|e| etag.weak_eq(e))
}

/// `max-age` setting: seconds, or `"infinite"` for the one-year ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaxAge(u64);

impl MaxAge {
    pub const INFINITE: Self = Self(MAX_MAX_AGE);

    /// Seconds, clamped to the one-year ceiling
    pub const fn from_secs(secs: u64) -> Self {
        if secs > MAX_MAX_AGE {
            Self(MAX_MAX_AGE)
        } else {
            Self(secs)
        }
    }

    pub const fn as_secs(self) -> u64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for MaxAge {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Self::from_secs(secs)),
            Raw::Text(text) if text.eq_ignore_ascii_case("infinite") => Ok(Self::INFINITE),
            Raw::Text(text) => text
                .trim()
                .parse::<u64>()
                .map(Self::from_secs)
                .map_err(|_| serde::de::Error::custom(format!("invalid max_age: {text}"))),
        }
    }
}

/// Cache-Control policy for file responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: MaxAge,
    pub immutable: bool,
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        let max_age = self.max_age.as_secs();
        if self.immutable {
            format!("public, max-age={max_age}, immutable")
        } else {
            format!("public, max-age={max_age}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn mtime(secs: u64) -> Option<SystemTime> {
        Some(UNIX_EPOCH + Duration::from_secs(secs))
    }

    #[test]
    fn test_etag_format() {
        let tag = EntityTag::from_metadata(255, mtime(1));
        assert_eq!(tag.as_str(), "W/\"ff-3e8\"");
    }

    #[test]
    fn test_etag_consistency() {
        assert_eq!(
            EntityTag::from_metadata(10, mtime(42)),
            EntityTag::from_metadata(10, mtime(42))
        );
    }

    #[test]
    fn test_etag_difference() {
        assert_ne!(
            EntityTag::from_metadata(10, mtime(42)),
            EntityTag::from_metadata(11, mtime(42))
        );
        assert_ne!(
            EntityTag::from_metadata(10, mtime(42)),
            EntityTag::from_metadata(10, mtime(43))
        );
    }

    #[test]
    fn test_etag_list_matches() {
        let etag = EntityTag::from_metadata(9, mtime(0));
        assert!(etag_list_matches("W/\"9-0\"", Some(&etag)));
        assert!(etag_list_matches("\"9-0\"", Some(&etag)));
        assert!(etag_list_matches("\"xyz\", W/\"9-0\"", Some(&etag)));
        assert!(etag_list_matches("*", Some(&etag)));
        assert!(etag_list_matches(" * ", None));
        assert!(!etag_list_matches("\"different\"", Some(&etag)));
        assert!(!etag_list_matches("W/\"9-0\"", None));
    }

    #[test]
    fn test_max_age_clamped() {
        assert_eq!(MaxAge::from_secs(60).as_secs(), 60);
        assert_eq!(MaxAge::from_secs(u64::MAX).as_secs(), MAX_MAX_AGE);
        assert_eq!(MaxAge::default().as_secs(), 0);
    }

    #[test]
    fn test_max_age_deserialize() {
        #[derive(Deserialize)]
        struct Wrap {
            max_age: MaxAge,
        }

        let w: Wrap = toml::from_str("max_age = 3600").unwrap();
        assert_eq!(w.max_age.as_secs(), 3600);
        let w: Wrap = toml::from_str("max_age = \"infinite\"").unwrap();
        assert_eq!(w.max_age, MaxAge::INFINITE);
        assert!(toml::from_str::<Wrap>("max_age = \"soon\"").is_err());
    }

    #[test]
    fn test_cache_policy() {
        let policy = CachePolicy {
            max_age: MaxAge::from_secs(3600),
            immutable: false,
        };
        assert_eq!(policy.to_header_value(), "public, max-age=3600");

        let policy = CachePolicy {
            max_age: MaxAge::INFINITE,
            immutable: true,
        };
        assert_eq!(
            policy.to_header_value(),
            "public, max-age=31536000, immutable"
        );
    }
}
