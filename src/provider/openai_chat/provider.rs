use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpResponse, HttpStreamResponse, get_with_headers,
    post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::{
    LLMProvider, ProviderKind, TextStream, accumulate_text, collect_body_text, ensure_text,
    retry_after_from_headers, success_body,
};
use crate::types::{GenerationRequest, ModelInfo, SamplingParams};

use super::error::parse_openai_error;
use super::request::build_openai_body;
use super::response::{parse_chat_response, parse_model_list};

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible Chat Completions provider
pub struct OpenAiChatProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
}

impl OpenAiChatProvider {
    /// 创建带默认 base_url 的 Provider
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// 自定义 base_url，应包含版本段，例如 `https://api.deepseek.com/v1`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub(crate) fn models_endpoint(&self) -> String {
        format!("{}/models", self.base_url.trim_end_matches('/'))
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    fn build_request_body(
        &self,
        request: &GenerationRequest,
        sampling: SamplingParams,
        stream: bool,
    ) -> Result<Value, LLMError> {
        build_openai_body(request, sampling, stream)
    }
}

#[async_trait]
impl LLMProvider for OpenAiChatProvider {
    async fn generate_text(
        &self,
        request: &GenerationRequest,
        sampling: SamplingParams,
    ) -> Result<String, LLMError> {
        let body = self.build_request_body(request, sampling, false)?;
        debug!(provider = self.name(), endpoint = %self.endpoint(), model = %request.model, "chat completion");
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            &body,
        )
        .await?;
        let text = success_body(response, self.name(), parse_openai_error)?;
        ensure_text(parse_chat_response(&text)?, self.name())
    }

    async fn stream_text(
        &self,
        request: &GenerationRequest,
        sampling: SamplingParams,
    ) -> Result<TextStream, LLMError> {
        let body = self.build_request_body(request, sampling, true)?;
        debug!(provider = self.name(), endpoint = %self.endpoint(), model = %request.model, "chat completion stream");
        let HttpStreamResponse {
            status,
            headers,
            body,
        } = post_json_stream_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            &body,
        )
        .await?;
        if !(200..300).contains(&status) {
            warn!(provider = self.name(), status, "stream request rejected");
            let text = collect_body_text(body, self.name()).await;
            return Err(parse_openai_error(
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
            self.models_endpoint(),
            self.build_headers(),
        )
        .await
    }

    fn parse_models(&self, body: &str) -> Result<Vec<ModelInfo>, LLMError> {
        parse_model_list(body)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiCompatible
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::reqwest::ReqwestTransport;

    #[test]
    fn endpoints_and_headers() {
        let transport = Arc::new(ReqwestTransport::default_client().expect("transport"));
        let provider =
            OpenAiChatProvider::new(transport, "sk-test").with_base_url("https://api.deepseek.com/v1/");
        assert_eq!(
            provider.endpoint(),
            "https://api.deepseek.com/v1/chat/completions"
        );
        assert_eq!(provider.models_endpoint(), "https://api.deepseek.com/v1/models");
        assert_eq!(
            provider.build_headers().get("Authorization"),
            Some(&"Bearer sk-test".to_string())
        );
    }
}
