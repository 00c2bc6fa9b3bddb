//! Response body
//!
//! `SendBody` is what every outcome of the sender carries. File bodies are
//! pull-based: a chunk is read only when hyper asks for the next frame, so a slow
//! client throttles the disk reads instead of filling memory.

use crate::error::StreamError;
use crate::logger;
use crate::send::fs::FileReader;
use crate::send::state::ResponseState;
use bytes::{BufMut, Bytes, BytesMut};
use hyper::body::{Body, Frame, SizeHint};
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncReadExt, Take};
use tokio_util::io::poll_read_buf;

/// Upper bound for one body frame
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Body of a sender response
pub struct SendBody {
    kind: Kind,
}

enum Kind {
    Empty,
    Full(Option<Bytes>),
    File(FileStream),
}

impl SendBody {
    pub const fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    pub fn full(data: impl Into<Bytes>) -> Self {
        Self {
            kind: Kind::Full(Some(data.into())),
        }
    }

    /// Stream `len` bytes from `reader`, which is already positioned at the window start
    ///
    /// `state` is where the pipeline got to; the body carries it from `Streaming`
    /// to `Completed` or `Failed`.
    pub fn file(reader: FileReader, len: u64, path: PathBuf, state: ResponseState) -> Self {
        if len == 0 {
            return Self::empty();
        }
        Self {
            kind: Kind::File(FileStream::new(reader, len, path, state)),
        }
    }

    /// Lifecycle of a file body; `None` for in-memory bodies
    pub fn state(&self) -> Option<ResponseState> {
        match &self.kind {
            Kind::File(stream) => Some(stream.state),
            _ => None,
        }
    }
}

impl std::fmt::Debug for SendBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Kind::Empty => f.write_str("SendBody::Empty"),
            Kind::Full(data) => f
                .debug_tuple("SendBody::Full")
                .field(&data.as_ref().map_or(0, Bytes::len))
                .finish(),
            Kind::File(stream) => f
                .debug_struct("SendBody::File")
                .field("path", &stream.path)
                .field("remaining", &stream.remaining)
                .field("state", &stream.state)
                .finish(),
        }
    }
}

impl Body for SendBody {
    type Data = Bytes;
    type Error = StreamError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().kind {
            Kind::Empty => Poll::Ready(None),
            Kind::Full(data) => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            Kind::File(stream) => stream
                .poll_chunk(cx)
                .map(|chunk| chunk.map(|res| res.map(Frame::data))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Full(data) => data.is_none(),
            Kind::File(stream) => stream.reader.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Empty => SizeHint::with_exact(0),
            Kind::Full(data) => SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64)),
            Kind::File(stream) => SizeHint::with_exact(stream.remaining),
        }
    }
}

/// Reader limited to the selected window, released as soon as it is done
struct FileStream {
    reader: Option<Take<FileReader>>,
    buf: BytesMut,
    remaining: u64,
    expected: u64,
    state: ResponseState,
    path: PathBuf,
}

impl FileStream {
    fn new(reader: FileReader, len: u64, path: PathBuf, mut state: ResponseState) -> Self {
        state.advance(ResponseState::Streaming);
        Self {
            reader: Some(reader.take(len)),
            buf: BytesMut::new(),
            remaining: len,
            expected: len,
            state,
            path,
        }
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, StreamError>>> {
        let Some(reader) = self.reader.as_mut() else {
            return Poll::Ready(None);
        };

        #[allow(clippy::cast_possible_truncation)]
        let want = self.remaining.min(CHUNK_SIZE as u64) as usize;
        self.buf.reserve(want);

        let read = ready!(poll_read_buf(
            Pin::new(reader),
            cx,
            &mut (&mut self.buf).limit(want)
        ));

        match read {
            Ok(0) => Poll::Ready(Some(Err(self.fail("unexpected end of file".to_string())))),
            Ok(n) => {
                self.remaining -= n as u64;
                let chunk = self.buf.split().freeze();
                if self.remaining == 0 {
                    self.finish();
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Err(err) => Poll::Ready(Some(Err(self.fail(err.to_string())))),
        }
    }

    fn finish(&mut self) {
        self.reader = None;
        self.state.advance(ResponseState::Completed);
        logger::log_debug(&format!(
            "Completed {} ({} bytes)",
            self.path.display(),
            self.expected
        ));
    }

    fn fail(&mut self, message: String) -> StreamError {
        self.reader = None;
        self.state.advance(ResponseState::Failed);
        let err = StreamError {
            message,
            bytes_sent: self.expected - self.remaining,
            expected: self.expected,
        };
        logger::log_error(&format!(
            "Stream of '{}' aborted: {err}",
            self.path.display()
        ));
        err
    }
}
