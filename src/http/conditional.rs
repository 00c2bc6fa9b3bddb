//! Conditional request evaluation (RFC 7232)
//!
//! Decides whether a request short-circuits with 304 / 412 before any range work.

use crate::http::cache::{etag_list_matches, EntityTag};
use std::time::{SystemTime, UNIX_EPOCH};

/// Validators the server holds for the current representation
#[derive(Debug, Clone, Default)]
pub struct Validators {
    /// `None` when `ETag` generation is disabled
    pub etag: Option<EntityTag>,
    /// `None` when `Last-Modified` is disabled or the mtime is unknown
    pub last_modified: Option<SystemTime>,
}

/// Validator headers sent by the client
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidators<'a> {
    pub if_match: Option<&'a str>,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
    pub if_unmodified_since: Option<&'a str>,
    pub cache_control: Option<&'a str>,
}

/// Result of the conditional check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conditional {
    /// Serve the representation
    Proceed,
    /// 304, revalidation headers only
    NotModified,
    /// 412
    PreconditionFailed,
}

/// Evaluate request validators against the current representation
///
/// Order (first match wins): If-Match, If-None-Match, If-Modified-Since,
/// If-Unmodified-Since. A `Cache-Control: no-cache` request never gets a 304.
pub fn evaluate(req: &RequestValidators<'_>, current: &Validators) -> Conditional {
    if let Some(if_match) = req.if_match {
        if !etag_list_matches(if_match, current.etag.as_ref()) {
            return Conditional::PreconditionFailed;
        }
    }

    let revalidate = !forces_reload(req.cache_control);

    if let Some(if_none_match) = req.if_none_match {
        if revalidate && etag_list_matches(if_none_match, current.etag.as_ref()) {
            return Conditional::NotModified;
        }
    } else if let (Some(since), Some(modified)) = (
        req.if_modified_since.and_then(parse_date),
        current.last_modified,
    ) {
        if revalidate && unix_secs(modified) <= unix_secs(since) {
            return Conditional::NotModified;
        }
    }

    if let (Some(since), Some(modified)) = (
        req.if_unmodified_since.and_then(parse_date),
        current.last_modified,
    ) {
        if unix_secs(modified) > unix_secs(since) {
            return Conditional::PreconditionFailed;
        }
    }

    Conditional::Proceed
}

/// Whether an `If-Range` validator still describes the current representation
///
/// A quoted value is an entity tag; anything else is an HTTP date compared at
/// one-second resolution. Unparseable values never match.
pub fn if_range_matches(if_range: &str, current: &Validators) -> bool {
    let if_range = if_range.trim();
    if if_range.contains('"') {
        return current.etag.as_ref().is_some_and(|etag| etag.weak_eq(if_range));
    }
    match (parse_date(if_range), current.last_modified) {
        (Some(date), Some(modified)) => unix_secs(modified) == unix_secs(date),
        _ => false,
    }
}

fn forces_reload(cache_control: Option<&str>) -> bool {
    cache_control.is_some_and(|cc| {
        cc.split(',')
            .any(|directive| directive.trim().eq_ignore_ascii_case("no-cache"))
    })
}

fn parse_date(value: &str) -> Option<SystemTime> {
    httpdate::parse_http_date(value.trim()).ok()
}

/// Seconds since the epoch; HTTP dates carry no sub-second part
pub fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}
