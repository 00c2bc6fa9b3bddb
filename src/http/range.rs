//! HTTP Range request parsing module
//!
//! Range header selection for resumable downloads, compliant with RFC 7233.
//! Only single ranges are served; anything else falls back to the full body.

/// Inclusive byte window `[start, end]` into the content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start byte position
    pub start: u64,
    /// End byte position (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a 206 response
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// `Content-Range` value for a 416 response
pub fn unsatisfiable_content_range(total: u64) -> String {
    format!("bytes */{total}")
}

/// Range selection result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelection {
    /// No usable Range header: serve the full window with 200
    Full,
    /// Serve one range with 206
    Partial(ByteRange),
    /// First byte position beyond the window: 416
    NotSatisfiable,
}

/// One syntactically valid byte-range-spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    /// `first-` or `first-last`
    From { first: u64, last: Option<u64> },
    /// `-suffix`
    Suffix(u64),
}

/// Select the byte range to serve (single range only, bytes unit)
///
/// Supported formats:
/// - `bytes=first-last` - Specific range, `last` clamped to the window
/// - `bytes=first-` - From first to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// Malformed headers and multi-range requests are ignored, never rejected.
///
/// # Examples
/// ```
/// use static_send::http::range::{select_range, ByteRange, RangeSelection};
///
/// assert_eq!(
///     select_range(Some("bytes=2-50"), 9),
///     RangeSelection::Partial(ByteRange { start: 2, end: 8 })
/// );
/// assert_eq!(select_range(Some("bytes=9-50"), 9), RangeSelection::NotSatisfiable);
/// assert_eq!(select_range(Some("asdf"), 9), RangeSelection::Full);
/// ```
pub fn select_range(range_header: Option<&str>, size: u64) -> RangeSelection {
    let Some(header) = range_header else {
        return RangeSelection::Full;
    };

    let Some(specs) = parse_range_header(header) else {
        return RangeSelection::Full;
    };

    // Multi-range would need multipart/byteranges
    let [spec] = specs.as_slice() else {
        return RangeSelection::Full;
    };

    resolve(*spec, size)
}

/// Parse `bytes=<spec>[,<spec>...]`; `None` when any part is malformed
fn parse_range_header(header: &str) -> Option<Vec<RangeSpec>> {
    let set = header.trim().strip_prefix("bytes=")?;
    set.split(',').map(|s| parse_spec(s.trim())).collect()
}

fn parse_spec(spec: &str) -> Option<RangeSpec> {
    let (first, last) = spec.split_once('-')?;

    // Suffix range: "-500" means last 500 bytes
    if first.is_empty() {
        return parse_digits(last).map(RangeSpec::Suffix);
    }

    let first = parse_digits(first)?;
    let last = if last.is_empty() {
        None
    } else {
        let last = parse_digits(last)?;
        if last < first {
            return None;
        }
        Some(last)
    };

    Some(RangeSpec::From { first, last })
}

/// Strict `1*DIGIT`: no signs, no whitespace
///
/// Positions past `u64::MAX` are still well-formed and saturate.
fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(s.parse().unwrap_or(u64::MAX))
}

fn resolve(spec: RangeSpec, size: u64) -> RangeSelection {
    match spec {
        RangeSpec::Suffix(suffix) => {
            if suffix == 0 || size == 0 {
                return RangeSelection::NotSatisfiable;
            }
            // Suffix larger than file is valid, serve the whole file as a range
            RangeSelection::Partial(ByteRange {
                start: size.saturating_sub(suffix),
                end: size - 1,
            })
        }
        RangeSpec::From { first, last } => {
            if first >= size {
                return RangeSelection::NotSatisfiable;
            }
            let end = last.map_or(size - 1, |l| l.min(size - 1));
            RangeSelection::Partial(ByteRange { start: first, end })
        }
    }
}
