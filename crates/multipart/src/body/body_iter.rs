use crate::MultipartError;
use crate::boundary::Boundary;
use crate::part::PartRef;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

/// One traversal of a [`MultiPartBody`](crate::MultiPartBody).
///
/// Yields the `first` boundary line, the chunks of part 0, the `middle` line, the chunks of
/// part 1 and so on, finishing with the `last` line. A body without parts yields the `only`
/// line alone.
///
/// Every yielded [`Bytes`] is an independent view, so draining or slicing it never affects
/// another iterator over the same body.
///
/// Closing the iterator, explicitly or by dropping it, releases every part of the body no
/// matter how far the traversal got.
#[derive(Debug)]
pub struct BodyIterator {
    boundary: Boundary,
    parts: Vec<PartRef>,
    state: State,
    remaining: u64,
    closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// nothing yielded yet
    Start,
    /// the boundary line before `part` has been yielded, `chunk` is the next chunk of it
    Content { part: usize, chunk: usize },
    /// the terminating boundary line has been yielded
    Done,
}

impl BodyIterator {
    pub(crate) fn new(boundary: Boundary, parts: Vec<PartRef>, length: u64) -> Self {
        Self { boundary, parts, state: State::Start, remaining: length, closed: false }
    }

    /// Whether another chunk is available
    #[inline]
    pub fn has_next(&self) -> bool {
        self.state != State::Done
    }

    /// Bytes left to yield
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Yields the next chunk.
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::ExhaustedIterator`] once the terminating boundary line has
    /// been yielded.
    pub fn next_chunk(&mut self) -> Result<Bytes, MultipartError> {
        let (next_state, chunk) = self.step()?;
        self.state = next_state;
        self.remaining = self.remaining.saturating_sub(chunk.len() as u64);
        Ok(chunk)
    }

    fn step(&self) -> Result<(State, Bytes), MultipartError> {
        match self.state {
            State::Start if self.parts.is_empty() => Ok((State::Done, self.boundary.only())),
            State::Start => Ok((State::Content { part: 0, chunk: 0 }, self.boundary.first())),
            State::Content { part, chunk } => {
                let chunks = self.parts[part].chunks();
                if let Some(bytes) = chunks.get(chunk) {
                    Ok((State::Content { part, chunk: chunk + 1 }, bytes.clone()))
                } else if part + 1 < self.parts.len() {
                    Ok((State::Content { part: part + 1, chunk: 0 }, self.boundary.middle()))
                } else {
                    Ok((State::Done, self.boundary.last()))
                }
            }
            State::Done => Err(MultipartError::ExhaustedIterator),
        }
    }

    /// Releases every part of the body.
    ///
    /// Safe to call more than once; only the first call releases. Chunks already yielded
    /// stay valid, and the body can still be iterated again afterwards.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        trace!(parts = self.parts.len(), remaining = self.remaining, "close body iterator");
        for part in &self.parts {
            part.release();
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Iterator for BodyIterator {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().ok()
    }
}

impl Drop for BodyIterator {
    fn drop(&mut self) {
        self.close();
    }
}

/// Lets a transport send the body directly, with an exact length.
impl HttpBody for BodyIterator {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().next().map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        !self.has_next()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining)
    }
}
