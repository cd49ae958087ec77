//! Server-sent-event framing over a raw HTTP body.
//!
//! [`FrameDecoder`] is the synchronous core: it accepts byte buffers of arbitrary size
//! and keeps any trailing, not yet newline-terminated bytes until the next push or
//! [`FrameDecoder::finish`]. [`SseFrameStream`] drives it from an [`HttpBodyStream`].

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LLMError;
use crate::http::HttpBodyStream;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Payload following the `data:` prefix.
    Data(String),
    /// Terminal marker reported via `data: [DONE]`.
    Done,
}

/// Incremental line splitter that turns body bytes into [`StreamEvent`] values.
///
/// Lines are split on `\n` at the byte level, so multi-byte UTF-8 sequences cut by a
/// read boundary are reassembled before decoding. After [`StreamEvent::Done`] has been
/// produced the decoder ignores all further input.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    carry: Vec<u8>,
    done: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Appends `bytes` and returns the events of every line completed by them.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::stream::{FrameDecoder, StreamEvent};
    ///
    /// let mut decoder = FrameDecoder::new();
    /// assert!(decoder.push(b"data: {\"a\"").is_empty());
    /// assert_eq!(
    ///     decoder.push(b":1}\n\ndata: [DONE]\ndata: ignored\n"),
    ///     vec![StreamEvent::Data("{\"a\":1}".into()), StreamEvent::Done]
    /// );
    /// ```
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        self.carry.extend_from_slice(bytes);

        let mut consumed = 0;
        while let Some(rel) = self.carry[consumed..].iter().position(|b| *b == b'\n') {
            let line_end = consumed + rel;
            let event = decode_line(&self.carry[consumed..line_end]);
            consumed = line_end + 1;
            if let Some(event) = event {
                let is_done = event == StreamEvent::Done;
                events.push(event);
                if is_done {
                    self.done = true;
                    self.carry.clear();
                    return events;
                }
            }
        }
        self.carry.drain(..consumed);
        events
    }

    /// Flushes the trailing unterminated line at end-of-stream.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.done || self.carry.is_empty() {
            self.carry.clear();
            return None;
        }
        let line = std::mem::take(&mut self.carry);
        let event = decode_line(&line);
        if event == Some(StreamEvent::Done) {
            self.done = true;
        }
        event
    }
}

/// Decodes one line (without its `\n`). Blank lines, comments and `event:`/`id:`
/// fields produce nothing.
fn decode_line(line: &[u8]) -> Option<StreamEvent> {
    let text = String::from_utf8_lossy(line);
    let payload = text.trim().strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        return None;
    }
    if payload == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }
    Some(StreamEvent::Data(payload.to_string()))
}

/// Adapts an [`HttpBodyStream`] into a stream of [`StreamEvent`] values.
///
/// The body is dropped as soon as the sentinel is decoded, the transport ends, or the
/// transport fails, so the connection is released on every exit path. A transport
/// error is yielded once and ends the stream.
pub struct SseFrameStream {
    body: Option<HttpBodyStream>,
    decoder: FrameDecoder,
    pending: VecDeque<StreamEvent>,
}

impl SseFrameStream {
    /// Wraps a raw HTTP body stream and prepares it for SSE decoding.
    pub fn new(body: HttpBodyStream) -> Self {
        Self {
            body: Some(body),
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    /// Whether the underlying body has been released.
    pub fn is_released(&self) -> bool {
        self.body.is_none()
    }
}

impl Stream for SseFrameStream {
    type Item = Result<StreamEvent, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            let Some(body) = this.body.as_mut() else {
                return Poll::Ready(None);
            };

            match body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.decoder.push(&bytes));
                    if this.decoder.is_done() {
                        this.body = None;
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    this.body = None;
                    this.pending.clear();
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.body = None;
                    this.pending.extend(this.decoder.finish());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
