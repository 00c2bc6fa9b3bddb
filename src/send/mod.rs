//! Static file sender
//!
//! One `Sender` is built per configured root and shared by every request. Each
//! call to [`Sender::send`] runs an independent pipeline:
//!
//! path resolution → conditional check → range selection → streamed response
//!
//! and returns a [`SendOutcome`] the caller can inspect or hand straight to
//! [`SendOutcome::into_response`].

pub mod body;
pub mod fs;
pub mod options;
pub mod path;
pub mod state;

use crate::error::SendError;
use crate::http::cache::EntityTag;
use crate::http::conditional::{self, Conditional, RequestValidators, Validators};
use crate::http::mime::{MimeLookup, MimeTable};
use crate::http::range::{self, RangeSelection};
use crate::http::response;
use crate::logger;
use body::SendBody;
use fs::{FileSystem, TokioFs};
use hyper::header::{
    HeaderMap, HeaderName, ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, ETAG, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE,
    IF_UNMODIFIED_SINCE, LAST_MODIFIED, RANGE,
};
use hyper::http::response::Builder;
use hyper::{Method, Request, Response, StatusCode};
use options::SendOptions;
use path::{PathResolver, Resolution, ResolvedTarget};
use state::ResponseState;
use std::io;

/// Everything the pipeline reads from the inbound request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    headers: HeaderMap,
}

impl RequestDescriptor {
    /// `path` is the raw, still percent-encoded request path (no query string)
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
        }
    }

    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self::new(
            req.method().clone(),
            req.uri().path(),
            req.headers().clone(),
        )
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Header value as text; non-ASCII values are treated as absent
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn validators(&self) -> RequestValidators<'_> {
        RequestValidators {
            if_match: self.header(&IF_MATCH),
            if_none_match: self.header(&IF_NONE_MATCH),
            if_modified_since: self.header(&IF_MODIFIED_SINCE),
            if_unmodified_since: self.header(&IF_UNMODIFIED_SINCE),
            cache_control: self.header(&CACHE_CONTROL),
        }
    }
}

/// What the sender decided for a request
#[derive(Debug)]
pub enum SendOutcome {
    /// A response ready to go out: 200, 206 or 304
    Stream(Response<SendBody>),
    /// Directory requested without trailing slash
    Redirect { location: String },
    /// Request failed before any header was produced
    Error(SendError),
}

impl SendOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Stream(resp) => resp.status(),
            Self::Redirect { .. } => StatusCode::MOVED_PERMANENTLY,
            Self::Error(err) => err.status(),
        }
    }

    /// Default handling: stream as-is, 301 for redirects, status-text body for errors
    pub fn into_response(self) -> Response<SendBody> {
        match self {
            Self::Stream(resp) => resp,
            Self::Redirect { location } => response::build_redirect_response(&location),
            Self::Error(err) => response::build_error_response(&err),
        }
    }
}

/// Static file sender bound to one root
pub struct Sender<F = TokioFs, M = MimeTable> {
    options: SendOptions,
    resolver: PathResolver,
    fs: F,
    mime: M,
}

impl Sender {
    /// Disk-backed sender with the built-in MIME table
    pub fn new(options: SendOptions) -> io::Result<Self> {
        Self::with_collaborators(options, TokioFs, MimeTable)
    }
}

impl<F: FileSystem, M: MimeLookup> Sender<F, M> {
    pub fn with_collaborators(options: SendOptions, fs: F, mime: M) -> io::Result<Self> {
        let resolver = PathResolver::new(&options.root)?;
        Ok(Self {
            options,
            resolver,
            fs,
            mime,
        })
    }

    /// Run the pipeline for one request
    pub async fn send(&self, req: &RequestDescriptor) -> SendOutcome {
        match self.try_send(req).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_server_error() {
                    logger::log_error(&format!("Failed to send '{}': {err}", req.path()));
                }
                SendOutcome::Error(err)
            }
        }
    }

    async fn try_send(&self, req: &RequestDescriptor) -> Result<SendOutcome, SendError> {
        let mut state = ResponseState::Unresolved;

        let target = match self
            .resolver
            .resolve(&self.fs, &self.options, req.path())
            .await?
        {
            Resolution::File(target) => target,
            Resolution::Redirect(location) => {
                logger::log_debug(&format!("Redirecting {} -> {location}", req.path()));
                return Ok(SendOutcome::Redirect { location });
            }
        };

        let validators = self.validators(&target);
        match conditional::evaluate(&req.validators(), &validators) {
            Conditional::Proceed => {}
            Conditional::NotModified => {
                advance(&mut state, ResponseState::Completed);
                logger::log_debug(&format!("Not modified: {} ({state:?})", req.path()));
                return Ok(SendOutcome::Stream(self.not_modified(&validators)?));
            }
            Conditional::PreconditionFailed => return Err(SendError::PreconditionFailed),
        }
        advance(&mut state, ResponseState::ConditionalChecked);

        let window = self.options.window(target.metadata.size);
        let selection = self.select_range(req, &validators, window.len);
        advance(&mut state, ResponseState::RangeSelected);

        let mut builder = self.validator_headers(Response::builder(), &validators);
        let (offset, len) = match selection {
            RangeSelection::Full => {
                builder = builder.status(StatusCode::OK);
                (window.offset, window.len)
            }
            RangeSelection::Partial(range) => {
                builder = builder
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(CONTENT_RANGE, range.content_range(window.len));
                (window.offset + range.start, range.len())
            }
            RangeSelection::NotSatisfiable => {
                return Err(SendError::RangeNotSatisfiable { size: window.len });
            }
        };

        let content_type = self
            .mime
            .content_type(target.path.extension().and_then(|e| e.to_str()));
        builder = builder
            .header(CONTENT_TYPE, content_type.as_ref())
            .header(CONTENT_LENGTH, len);
        if self.options.accept_ranges {
            builder = builder.header(ACCEPT_RANGES, "bytes");
        }

        logger::log_debug(&format!(
            "Serving {len} bytes at offset {offset} for {} ({state:?})",
            req.path()
        ));

        let body = if req.is_head() || len == 0 {
            SendBody::empty()
        } else {
            let reader = self
                .fs
                .open_at(&target.path, offset)
                .await
                .map_err(|e| SendError::from_io(&e))?;
            SendBody::file(reader, len, target.path, state)
        };

        Ok(SendOutcome::Stream(builder.body(body)?))
    }

    fn validators(&self, target: &ResolvedTarget) -> Validators {
        let meta = target.metadata;
        Validators {
            etag: self
                .options
                .etag
                .then(|| EntityTag::from_metadata(meta.size, meta.modified)),
            last_modified: if self.options.last_modified {
                meta.modified
            } else {
                None
            },
        }
    }

    /// Range to serve, honoring `accept_ranges` and `If-Range`
    fn select_range(
        &self,
        req: &RequestDescriptor,
        validators: &Validators,
        size: u64,
    ) -> RangeSelection {
        if !self.options.accept_ranges {
            return RangeSelection::Full;
        }
        let Some(range_header) = req.header(&RANGE) else {
            return RangeSelection::Full;
        };
        if let Some(if_range) = req.header(&IF_RANGE) {
            if !conditional::if_range_matches(if_range, validators) {
                return RangeSelection::Full;
            }
        }
        range::select_range(Some(range_header), size)
    }

    /// ETag, Last-Modified and Cache-Control, shared by 200/206/304
    fn validator_headers(&self, mut builder: Builder, validators: &Validators) -> Builder {
        if let Some(policy) = self.options.cache_policy() {
            builder = builder.header(CACHE_CONTROL, policy.to_header_value());
        }
        if let Some(modified) = validators.last_modified {
            builder = builder.header(LAST_MODIFIED, httpdate::fmt_http_date(modified));
        }
        if let Some(etag) = &validators.etag {
            builder = builder.header(ETAG, etag.as_str());
        }
        builder
    }

    fn not_modified(&self, validators: &Validators) -> Result<Response<SendBody>, SendError> {
        let resp = self
            .validator_headers(Response::builder(), validators)
            .status(StatusCode::NOT_MODIFIED)
            .body(SendBody::empty())?;
        Ok(resp)
    }
}

/// Pipeline transitions are always forward
fn advance(state: &mut ResponseState, next: ResponseState) {
    let moved = state.advance(next);
    debug_assert!(moved, "invalid transition {state:?} -> {next:?}");
}
