use std::time::Instant;

use futures_util::StreamExt;
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::http::reqwest::default_dyn_transport;
use crate::messages::{connection_error_message, connection_message, error_message};
use crate::provider::{DynProvider, ProviderKind, TextStream};
use crate::types::{ConnectionStatus, GenerationRequest, GenerationResult, StreamChunk};

/// 文本生成入口 每次调用独立路由到对应 Provider
///
/// The client holds no per-call state; it can be shared behind an `Arc` and used from
/// several tasks at once.
pub struct GenerationClient {
    transport: DynHttpTransport,
    config: GenerationConfig,
}

impl GenerationClient {
    /// 使用指定 transport 与默认配置创建客户端
    pub fn new(transport: DynHttpTransport) -> Self {
        Self {
            transport,
            config: GenerationConfig::default(),
        }
    }

    /// 使用 reqwest 默认 transport 创建客户端
    pub fn from_default_transport() -> Result<Self, LLMError> {
        Ok(Self::new(default_dyn_transport()?))
    }

    /// Replaces the configuration after validating it.
    pub fn with_config(mut self, config: GenerationConfig) -> Result<Self, LLMError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Sends one request and waits for the full text.
    ///
    /// Never fails: errors come back as a localized message with `error` set.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let started = Instant::now();
        let outcome = match self.resolve_provider(request) {
            Ok(provider) => {
                let sampling = self.config.sampling.resolve(request.reduced_capacity);
                provider.generate_text(request, sampling).await
            }
            Err(err) => Err(err),
        };
        self.finish(request, outcome, started, "generate")
    }

    /// Streams one request, calling `on_chunk` for every progress item in order.
    ///
    /// Every stream that reaches its end ends with exactly one callback where
    /// `is_complete` is true, even when the text turns out empty; the returned text
    /// equals that item's `full_text`, or an empty-response error when it holds nothing
    /// but whitespace. A transport failure produces no completion callback.
    pub async fn generate_streaming<F>(
        &self,
        request: &GenerationRequest,
        mut on_chunk: F,
    ) -> GenerationResult
    where
        F: FnMut(&StreamChunk),
    {
        let started = Instant::now();
        let outcome = match self.stream(request).await {
            Ok(mut stream) => {
                let mut outcome = Err(LLMError::Unknown {
                    message: "stream ended without completion".to_string(),
                });
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(chunk) => {
                            on_chunk(&chunk);
                            if chunk.is_complete {
                                outcome = Ok(chunk.full_text);
                            }
                        }
                        Err(err) => {
                            outcome = Err(err);
                            break;
                        }
                    }
                }
                outcome
            }
            Err(err) => Err(err),
        };
        self.finish(request, outcome, started, "generate_streaming")
    }

    /// Opens the lazy chunk stream for one request.
    ///
    /// Errors raised before the first byte (routing, HTTP status) are returned directly;
    /// later failures are yielded as the stream's last item.
    pub async fn stream(&self, request: &GenerationRequest) -> Result<TextStream, LLMError> {
        let provider = self.resolve_provider(request)?;
        let sampling = self.config.sampling.resolve(request.reduced_capacity);
        provider.stream_text(request, sampling).await
    }

    /// Lists models to check that the key and base URL work.
    ///
    /// `model_hint` only takes part in provider routing. Never fails; the outcome is
    /// described by the returned status.
    pub async fn check_connection(
        &self,
        api_key: &str,
        base_url: Option<&str>,
        model_hint: &str,
    ) -> ConnectionStatus {
        let locale = self.config.locale;
        let kind = ProviderKind::route(model_hint, base_url);
        if api_key.trim().is_empty() {
            let err = missing_key();
            return ConnectionStatus {
                ok: false,
                status: None,
                message: connection_error_message(&err, locale),
                models: Vec::new(),
            };
        }

        let base = base_url.unwrap_or_else(|| self.config.base_url_for(kind));
        let provider = kind.build(self.transport.clone(), api_key.trim(), base);
        let response = match provider.fetch_models().await {
            Ok(response) => response,
            Err(err) => {
                warn!(provider = kind.name(), error = %err, "connection check failed");
                return ConnectionStatus {
                    ok: false,
                    status: None,
                    message: connection_error_message(&err, locale),
                    models: Vec::new(),
                };
            }
        };

        let status = response.status;
        let models = if (200..300).contains(&status) {
            match response
                .into_string()
                .and_then(|body| provider.parse_models(&body))
            {
                Ok(models) => models,
                Err(err) => {
                    warn!(provider = kind.name(), error = %err, "model list unreadable");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        info!(provider = kind.name(), status, models = models.len(), "connection checked");
        ConnectionStatus {
            ok: (200..300).contains(&status),
            status: Some(status),
            message: connection_message(status, models.len(), locale),
            models,
        }
    }

    fn resolve_provider(&self, request: &GenerationRequest) -> Result<DynProvider, LLMError> {
        let api_key = request.api_key.trim();
        if api_key.is_empty() {
            return Err(missing_key());
        }
        let base_url = request_base_url(request);
        let kind = ProviderKind::route(&request.model, base_url);
        let base = base_url.unwrap_or_else(|| self.config.base_url_for(kind));
        Ok(kind.build(self.transport.clone(), api_key, base))
    }

    fn finish(
        &self,
        request: &GenerationRequest,
        outcome: Result<String, LLMError>,
        started: Instant,
        operation: &'static str,
    ) -> GenerationResult {
        let elapsed = started.elapsed();
        let kind = ProviderKind::route(&request.model, request_base_url(request));
        match outcome {
            Ok(text) => {
                info!(
                    operation,
                    provider = kind.name(),
                    model = %request.model,
                    elapsed_ms = elapsed.as_millis() as u64,
                    chars = text.chars().count(),
                    "generation completed"
                );
                GenerationResult {
                    text,
                    elapsed,
                    error: None,
                }
            }
            Err(err) => {
                let error_kind = err.kind();
                warn!(
                    operation,
                    provider = kind.name(),
                    model = %request.model,
                    elapsed_ms = elapsed.as_millis() as u64,
                    kind = error_kind.as_str(),
                    error = %err,
                    "generation failed"
                );
                GenerationResult {
                    text: error_message(error_kind, self.config.locale, &err.to_string()),
                    elapsed,
                    error: Some(error_kind),
                }
            }
        }
    }
}

fn request_base_url(request: &GenerationRequest) -> Option<&str> {
    request
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
}

fn missing_key() -> LLMError {
    LLMError::Auth {
        message: "api key is empty".to_string(),
    }
}
