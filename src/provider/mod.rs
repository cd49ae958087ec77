use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::accumulator::ResponseAccumulator;
use crate::error::LLMError;
use crate::http::{DynHttpTransport, HttpBodyStream, HttpResponse};
use crate::stream::{SseFrameStream, StreamEvent};
use crate::types::{DeltaResult, GenerationRequest, ModelInfo, SamplingParams, StreamChunk};

pub mod google_gemini;
pub mod openai_chat;
mod headers;

pub(crate) use headers::retry_after_from_headers;

use google_gemini::GoogleGeminiProvider;
use openai_chat::OpenAiChatProvider;

/// 流式文本增量
pub type TextStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LLMError>> + Send>>;

/// Host fragments that identify the Gemini Generative Language API.
const GEMINI_HOST_FRAGMENTS: [&str; 2] = [
    "generativelanguage.googleapis.com",
    "generativelanguage.clients6.google.com",
];

/// 统一的 Provider Trait
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// 提交完整请求并等待完整文本
    async fn generate_text(
        &self,
        request: &GenerationRequest,
        sampling: SamplingParams,
    ) -> Result<String, LLMError>;

    /// 以流式方式返回增量文本
    async fn stream_text(
        &self,
        request: &GenerationRequest,
        sampling: SamplingParams,
    ) -> Result<TextStream, LLMError>;

    /// Issues the model listing request and returns the raw response.
    async fn fetch_models(&self) -> Result<HttpResponse, LLMError>;

    /// Parses a successful listing body.
    fn parse_models(&self, body: &str) -> Result<Vec<ModelInfo>, LLMError>;

    fn kind(&self) -> ProviderKind;

    /// 供应商名称
    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// 线程安全 Provider
pub type DynProvider = Arc<dyn LLMProvider>;

/// Closed set of wire protocols the client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    GoogleGemini,
    OpenAiCompatible,
}

impl ProviderKind {
    /// Picks the protocol for a call.
    ///
    /// Gemini is chosen when the base URL names a Gemini host or the model name contains
    /// `gemini` (case-insensitive); everything else is treated as OpenAI-compatible.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::provider::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::route("Gemini-2.0-Flash", None), ProviderKind::GoogleGemini);
    /// assert_eq!(
    ///     ProviderKind::route("custom", Some("https://generativelanguage.googleapis.com/v1beta")),
    ///     ProviderKind::GoogleGemini
    /// );
    /// assert_eq!(ProviderKind::route("gpt-4o-mini", None), ProviderKind::OpenAiCompatible);
    /// ```
    pub fn route(model: &str, base_url: Option<&str>) -> Self {
        let url_matches = base_url
            .map(|url| url.to_ascii_lowercase())
            .is_some_and(|url| GEMINI_HOST_FRAGMENTS.iter().any(|host| url.contains(host)));
        if url_matches || model.to_ascii_lowercase().contains("gemini") {
            ProviderKind::GoogleGemini
        } else {
            ProviderKind::OpenAiCompatible
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::GoogleGemini => "google_gemini",
            ProviderKind::OpenAiCompatible => "openai_chat",
        }
    }

    /// Pulls the text fragment out of one stream payload in this protocol's schema.
    pub fn extract_delta(&self, payload: &str) -> DeltaResult {
        match self {
            ProviderKind::GoogleGemini => google_gemini::extract_delta(payload),
            ProviderKind::OpenAiCompatible => openai_chat::extract_delta(payload),
        }
    }

    /// Builds the provider for one call against an already resolved base URL.
    pub fn build(
        &self,
        transport: DynHttpTransport,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> DynProvider {
        match self {
            ProviderKind::GoogleGemini => {
                Arc::new(GoogleGeminiProvider::new(transport, api_key).with_base_url(base_url))
            }
            ProviderKind::OpenAiCompatible => {
                Arc::new(OpenAiChatProvider::new(transport, api_key).with_base_url(base_url))
            }
        }
    }
}

/// Runs the decode → extract → accumulate pipeline over a streaming body.
///
/// Yields one chunk per non-empty fragment, then exactly one completion chunk once the
/// sentinel, a finish reason or the end of the body is reached. When the drained text is
/// empty or whitespace-only, [`LLMError::EmptyResponse`] follows the completion chunk. A
/// transport failure is yielded as-is and ends the stream without completion.
pub(crate) fn accumulate_text(body: HttpBodyStream, kind: ProviderKind) -> TextStream {
    let provider = kind.name();
    Box::pin(async_stream::stream! {
        let mut frames = SseFrameStream::new(body);
        let mut accumulator = ResponseAccumulator::new();
        let mut skipped = 0usize;

        while let Some(event) = frames.next().await {
            let payload = match event {
                Ok(StreamEvent::Data(payload)) => payload,
                Ok(StreamEvent::Done) => break,
                Err(err) => {
                    warn!(provider, error = %err, "stream aborted by transport");
                    yield Err(err);
                    return;
                }
            };

            let delta = kind.extract_delta(&payload);
            if delta.parse_failed {
                skipped += 1;
                warn!(provider, payload = %preview(&payload), "skipping malformed stream frame");
                continue;
            }
            if let Some(chunk) = accumulator.push(&delta.text) {
                yield Ok(chunk);
            }
            if delta.terminal {
                break;
            }
        }
        drop(frames);

        debug!(
            provider,
            chars = accumulator.text().chars().count(),
            skipped,
            "stream drained"
        );
        if let Some(chunk) = accumulator.complete() {
            yield Ok(chunk);
        }
        if !accumulator.has_content() {
            yield Err(LLMError::EmptyResponse { provider });
        }
    })
}

/// Drains an error body as text, keeping whatever arrived before a read failure.
pub(crate) async fn collect_body_text(mut body: HttpBodyStream, provider: &'static str) -> String {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(err) => {
                warn!(provider, error = %err, "error body cut short");
                break;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Returns the body of a 2xx response; any other status goes through `parse_error`.
///
/// The status is classified before the body is decoded, so an unreadable error body
/// never hides a 401/429/404.
pub(crate) fn success_body(
    response: HttpResponse,
    provider: &'static str,
    parse_error: fn(u16, &str, Option<Duration>) -> LLMError,
) -> Result<String, LLMError> {
    let HttpResponse {
        status,
        headers,
        body,
    } = response;
    if !(200..300).contains(&status) {
        warn!(provider, status, "request rejected");
        let text = String::from_utf8_lossy(&body);
        return Err(parse_error(status, &text, retry_after_from_headers(&headers)));
    }
    String::from_utf8(body).map_err(|err| LLMError::Provider {
        provider,
        message: format!("response body is not valid UTF-8: {err}"),
    })
}

/// Rejects text that is empty or whitespace-only.
pub(crate) fn ensure_text(text: String, provider: &'static str) -> Result<String, LLMError> {
    if text.trim().is_empty() {
        Err(LLMError::EmptyResponse { provider })
    } else {
        Ok(text)
    }
}

fn preview(payload: &str) -> &str {
    const LIMIT: usize = 120;
    match payload.char_indices().nth(LIMIT) {
        Some((idx, _)) => &payload[..idx],
        None => payload,
    }
}
