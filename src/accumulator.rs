//! Running full-text buffer for one in-flight streaming generation.

use crate::error::LLMError;
use crate::types::StreamChunk;

/// Owns the accumulated text of a single stream and enforces the chunk contract.
///
/// Every non-empty fragment yields one `is_complete = false` chunk; [`complete`] yields
/// the single terminal chunk no matter how many times the end of the stream is
/// detected.
///
/// [`complete`]: ResponseAccumulator::complete
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    buffer: String,
    completed: bool,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a fragment. Empty fragments and fragments arriving after completion are
    /// dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::accumulator::ResponseAccumulator;
    ///
    /// let mut acc = ResponseAccumulator::new();
    /// let chunk = acc.push("Hel").expect("chunk");
    /// assert_eq!((chunk.delta.as_str(), chunk.full_text.as_str()), ("Hel", "Hel"));
    /// assert!(acc.push("").is_none());
    /// assert_eq!(acc.push("lo").unwrap().full_text, "Hello");
    /// ```
    pub fn push(&mut self, fragment: &str) -> Option<StreamChunk> {
        if fragment.is_empty() || self.completed {
            return None;
        }
        self.buffer.push_str(fragment);
        Some(StreamChunk {
            delta: fragment.to_string(),
            full_text: self.buffer.clone(),
            is_complete: false,
        })
    }

    /// Produces the terminal chunk on the first call only.
    pub fn complete(&mut self) -> Option<StreamChunk> {
        if self.completed {
            return None;
        }
        self.completed = true;
        Some(StreamChunk {
            delta: String::new(),
            full_text: self.buffer.clone(),
            is_complete: true,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Whether the buffer holds anything besides whitespace.
    pub fn has_content(&self) -> bool {
        !self.buffer.trim().is_empty()
    }

    /// Consumes the accumulator, failing when nothing usable was received.
    pub fn into_text(self, provider: &'static str) -> Result<String, LLMError> {
        if self.has_content() {
            Ok(self.buffer)
        } else {
            Err(LLMError::EmptyResponse { provider })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_fires_exactly_once() {
        let mut acc = ResponseAccumulator::new();
        acc.push("Hi");
        let done = acc.complete().expect("first completion");
        assert!(done.is_complete);
        assert_eq!(done.delta, "");
        assert_eq!(done.full_text, "Hi");
        assert!(acc.complete().is_none());
        assert!(acc.push("late").is_none());
        assert_eq!(acc.text(), "Hi");
    }

    #[test]
    fn whitespace_only_buffer_is_empty_response() {
        let mut acc = ResponseAccumulator::new();
        acc.push("  \n");
        assert!(!acc.has_content());
        assert!(matches!(
            acc.into_text("google_gemini"),
            Err(LLMError::EmptyResponse {
                provider: "google_gemini"
            })
        ));
    }

    #[test]
    fn into_text_keeps_text_verbatim() {
        let mut acc = ResponseAccumulator::new();
        acc.push(" a");
        acc.push("b ");
        assert_eq!(acc.into_text("p").expect("text"), " ab ");
    }
}
