use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpResponse, HttpStreamResponse, get_with_headers,
    post_json_stream_with_headers, post_json_with_headers, redact_key,
};
use crate::provider::{
    LLMProvider, ProviderKind, TextStream, accumulate_text, collect_body_text, ensure_text,
    retry_after_from_headers, success_body,
};
use crate::types::{GenerationRequest, ModelInfo, SamplingParams};

use super::error::parse_gemini_error;
use super::request::build_gemini_body;
use super::response::{parse_generate_response, parse_model_list};

pub(crate) const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const BARE_HOST: &str = "generativelanguage.googleapis.com";

/// Google Gemini GenerateContent provider implementation.
///
/// The API key travels in the `key` query parameter.
pub struct GoogleGeminiProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
}

impl GoogleGeminiProvider {
    /// Creates a provider that targets the default Generative Language endpoint.
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Overrides the base URL, making it easier to point at proxies or compatibility layers.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn base(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with(BARE_HOST) {
            format!("{base}/v1beta")
        } else {
            base.to_string()
        }
    }

    /// Joins `segments` onto the base URL and appends `params` plus the API key, all
    /// percent-encoded.
    fn url(&self, segments: &[&str], params: &[(&str, &str)]) -> Result<String, LLMError> {
        let invalid = |reason: String| LLMError::InvalidConfig {
            field: "base_url".to_string(),
            reason,
        };
        let mut url = Url::parse(&self.base()).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("`{}` cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);
        Ok(url.into())
    }

    /// Builds the non-streaming endpoint URL for GenerateContent.
    pub(crate) fn endpoint(&self, model: &str) -> Result<String, LLMError> {
        let action = format!("{}:generateContent", normalize_model(model));
        self.url(&["models", &action], &[])
    }

    /// Builds the streaming endpoint URL (SSE) for GenerateContent.
    pub(crate) fn stream_endpoint(&self, model: &str) -> Result<String, LLMError> {
        let action = format!("{}:streamGenerateContent", normalize_model(model));
        self.url(&["models", &action], &[("alt", "sse")])
    }

    pub(crate) fn models_endpoint(&self) -> Result<String, LLMError> {
        self.url(&["models"], &[])
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    fn build_body(
        &self,
        request: &GenerationRequest,
        sampling: SamplingParams,
    ) -> Result<Value, LLMError> {
        build_gemini_body(request, sampling)
    }
}

/// Paths are built as `models/{model}`, so an existing prefix is dropped.
fn normalize_model(model: &str) -> &str {
    let model = model.trim();
    model.strip_prefix("models/").unwrap_or(model)
}

#[async_trait]
impl LLMProvider for GoogleGeminiProvider {
    async fn generate_text(
        &self,
        request: &GenerationRequest,
        sampling: SamplingParams,
    ) -> Result<String, LLMError> {
        let endpoint = self.endpoint(&request.model)?;
        let body = self.build_body(request, sampling)?;
        debug!(provider = self.name(), endpoint = %redact_key(&endpoint), "generateContent");
        let response = post_json_with_headers(
            self.transport.as_ref(),
            endpoint,
            self.build_headers(),
            &body,
        )
        .await?;
        let text = success_body(response, self.name(), parse_gemini_error)?;
        ensure_text(parse_generate_response(&text)?, self.name())
    }

    async fn stream_text(
        &self,
        request: &GenerationRequest,
        sampling: SamplingParams,
    ) -> Result<TextStream, LLMError> {
        let endpoint = self.stream_endpoint(&request.model)?;
        let body = self.build_body(request, sampling)?;
        debug!(provider = self.name(), endpoint = %redact_key(&endpoint), "streamGenerateContent");
        let HttpStreamResponse {
            status,
            headers,
            body,
        } = post_json_stream_with_headers(
            self.transport.as_ref(),
            endpoint,
            self.build_headers(),
            &body,
        )
        .await?;
        if !(200..300).contains(&status) {
            warn!(provider = self.name(), status, "stream request rejected");
            let text = collect_body_text(body, self.name()).await;
            return Err(parse_gemini_error(
                status,
                &text,
                retry_after_from_headers(&headers),
            ));
        }
        Ok(accumulate_text(body, self.kind()))
    }

    async fn fetch_models(&self) -> Result<HttpResponse, LLMError> {
        get_with_headers(
            self.transport.as_ref(),
            self.models_endpoint()?,
            self.build_headers(),
        )
        .await
    }

    fn parse_models(&self, body: &str) -> Result<Vec<ModelInfo>, LLMError> {
        parse_model_list(body)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::GoogleGemini
    }
}
