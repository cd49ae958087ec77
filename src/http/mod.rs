use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use serde::Serialize;

use crate::error::LLMError;

/// HTTP methods the providers need: listing uses GET, generation uses POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Minimal HTTP request representation shared across providers.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Builds a POST request with a JSON request body.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::http::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec());
    /// assert_eq!(request.method, HttpMethod::Post);
    /// assert_eq!(request.headers.get("Content-Type"), Some(&"application/json".to_string()));
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Some(body),
        }
    }

    /// Builds a body-less GET request.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::http::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::get("https://example.com/models");
    /// assert_eq!(request.method, HttpMethod::Get);
    /// assert!(request.body.is_none());
    /// ```
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Merges extra headers into the request, replacing same-named entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use promptline::http::HttpRequest;
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec())
    ///     .with_headers(HashMap::from([("Authorization".into(), "Bearer test".into())]));
    /// assert_eq!(request.headers.get("Authorization"), Some(&"Bearer test".to_string()));
    /// assert_eq!(request.headers.get("Content-Type"), Some(&"application/json".to_string()));
    /// ```
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Minimal HTTP response representation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Converts the body into a UTF-8 string.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::http::HttpResponse;
    ///
    /// let response = HttpResponse { status: 200, headers: Default::default(), body: b"ok".to_vec() };
    /// assert_eq!(response.into_string().unwrap(), "ok");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Transport`] when the body cannot be interpreted as UTF-8.
    pub fn into_string(self) -> Result<String, LLMError> {
        String::from_utf8(self.body).map_err(|err| LLMError::transport(err.to_string()))
    }
}

/// HTTP response that carries a streaming body.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: HttpBodyStream,
}

/// Alias for the body stream returned by [`HttpTransport::send_stream`].
///
/// Chunks arrive exactly as the network delivers them and carry no framing guarantees.
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LLMError>> + Send>>;

/// Transport abstraction used to decouple providers from the concrete HTTP client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves when the full response is available.
    ///
    /// # Errors
    ///
    /// Implementations should map transport failures to [`LLMError::Transport`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError>;

    /// Sends a request and returns a streaming body.
    ///
    /// # Examples
    ///
    /// ```
    /// # use async_trait::async_trait;
    /// # use promptline::http::{HttpTransport, HttpRequest, HttpResponse, HttpStreamResponse};
    /// # use promptline::error::LLMError;
    /// # use futures_util::{stream, StreamExt};
    /// struct EchoTransport;
    ///
    /// #[async_trait]
    /// impl HttpTransport for EchoTransport {
    ///     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
    ///         Ok(HttpResponse { status: 200, headers: request.headers, body: request.body.unwrap_or_default() })
    ///     }
    ///     async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
    ///         let first = request.body.unwrap_or_default();
    ///         let stream = stream::once(async move { Ok::<_, LLMError>(first) });
    ///         Ok(HttpStreamResponse { status: 200, headers: request.headers, body: Box::pin(stream) })
    ///     }
    /// }
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let transport = EchoTransport;
    /// let stream = transport
    ///     .send_stream(HttpRequest::post_json("https://example.com", br"{}".to_vec()))
    ///     .await
    ///     .unwrap();
    /// let chunks: Vec<_> = stream.body.collect::<Vec<_>>().await;
    /// assert_eq!(chunks.len(), 1);
    /// # });
    /// ```
    ///
    /// # Errors
    ///
    /// Implementations should return [`LLMError::Transport`] for network failures.
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

fn encode_json<T: Serialize>(body: &T) -> Result<Vec<u8>, LLMError> {
    serde_json::to_vec(body).map_err(|err| LLMError::Validation {
        message: format!("failed to serialize request: {err}"),
    })
}

/// Serializes a body to JSON, attaches headers, and issues a POST request.
///
/// # Errors
///
/// Returns [`LLMError::Validation`] if serialization fails or forwards the error raised by
/// [`HttpTransport::send`].
pub async fn post_json_with_headers<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    body: &T,
) -> Result<HttpResponse, LLMError> {
    let payload = encode_json(body)?;
    let request = HttpRequest::post_json(url, payload).with_headers(headers);
    transport.send(request).await
}

/// Issues a JSON POST request and returns the streaming response.
///
/// # Errors
///
/// Returns [`LLMError::Validation`] when serialization fails or propagates any error from
/// [`HttpTransport::send_stream`].
pub async fn post_json_stream_with_headers<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    body: &T,
) -> Result<HttpStreamResponse, LLMError> {
    let payload = encode_json(body)?;
    let request = HttpRequest::post_json(url, payload).with_headers(headers);
    transport.send_stream(request).await
}

/// Issues a GET request with the given headers.
pub async fn get_with_headers(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
) -> Result<HttpResponse, LLMError> {
    transport
        .send(HttpRequest::get(url).with_headers(headers))
        .await
}

/// Replaces the value of a `key=` query parameter so URLs can be logged safely.
pub(crate) fn redact_key(url: &str) -> String {
    match url.find("key=") {
        Some(pos) => {
            let value_start = pos + "key=".len();
            let value_end = url[value_start..]
                .find('&')
                .map_or(url.len(), |rel| value_start + rel);
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}

pub mod reqwest;
