//! Shared data structures for one generation call.
//!
//! A [`GenerationRequest`] goes in, a [`GenerationResult`] comes out, and streaming calls
//! additionally surface ordered [`StreamChunk`] values in between.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

/// Inline image attached to the user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    /// MIME type such as `image/png`.
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

impl InlineImage {
    /// Wraps data that is already base64-encoded.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encodes raw bytes with the standard base64 alphabet.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::types::InlineImage;
    ///
    /// let image = InlineImage::from_bytes("image/png", b"hi");
    /// assert_eq!(image.data, "aGk=");
    /// assert_eq!(image.data_url(), "data:image/png;base64,aGk=");
    /// ```
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: general_purpose::STANDARD.encode(bytes),
        }
    }

    /// `data:` URL form used by OpenAI-compatible `image_url` parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One independent text generation request.
///
/// # Examples
///
/// ```
/// use promptline::types::{GenerationRequest, InlineImage};
///
/// let request = GenerationRequest::new("Describe this", "gemini-2.0-flash", "key")
///     .with_system_instruction("Be brief.")
///     .with_image(InlineImage::new("image/jpeg", "AAAA"))
///     .reduced_capacity(true);
/// assert!(request.reduced_capacity);
/// assert_eq!(request.system_instruction.as_deref(), Some("Be brief."));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    #[serde(default)]
    pub system_instruction: Option<String>,
    /// Lower temperature and a smaller output ceiling.
    #[serde(default)]
    pub reduced_capacity: bool,
    #[serde(default)]
    pub image: Option<InlineImage>,
    /// Overrides the provider's default base URL; also feeds provider routing.
    #[serde(default)]
    pub base_url: Option<String>,
    pub api_key: String,
}

impl GenerationRequest {
    /// 创建最小请求
    pub fn new(
        prompt: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system_instruction: None,
            reduced_capacity: false,
            image: None,
            base_url: None,
            api_key: api_key.into(),
        }
    }

    /// 设置 system instruction
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// 附加一张内联图片
    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn reduced_capacity(mut self, reduced: bool) -> Self {
        self.reduced_capacity = reduced;
        self
    }

    /// System instruction with surrounding whitespace removed, `None` when blank.
    pub(crate) fn system_text(&self) -> Option<&str> {
        self.system_instruction
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// Resolved sampling parameters for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// One progress notification of a streaming generation.
///
/// Mirrors the `(newFragment, fullTextSoFar, isComplete)` triple: every text-bearing
/// event produces `is_complete = false`, and a successful stream ends with exactly one
/// item where `delta` is empty and `is_complete = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub delta: String,
    pub full_text: String,
    pub is_complete: bool,
}

/// Outcome of extracting text from one decoded frame payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaResult {
    /// Concatenated text of the first candidate's parts, possibly empty.
    pub text: String,
    /// The payload itself signals end-of-stream.
    pub terminal: bool,
    /// The payload was not valid JSON and should be skipped.
    pub parse_failed: bool,
}

impl DeltaResult {
    pub(crate) fn text(text: String, terminal: bool) -> Self {
        Self {
            text,
            terminal,
            parse_failed: false,
        }
    }

    pub(crate) fn malformed() -> Self {
        Self {
            text: String::new(),
            terminal: false,
            parse_failed: true,
        }
    }
}

/// Short machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or expired API key.
    Auth,
    RateLimit,
    /// Model unknown or not permitted for the key.
    ModelNotFound,
    Network,
    EmptyResponse,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::Network => "network",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Final outcome of a generation call.
///
/// When `error` is set, `text` holds the localized user-facing message for it and is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: String,
    /// Wall-clock time from call start to completion or failure.
    pub elapsed: Duration,
    pub error: Option<ErrorKind>,
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Model entry reported by a provider's listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier usable as `GenerationRequest::model`.
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Result of the connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub ok: bool,
    /// HTTP status when a response was received.
    pub status: Option<u16>,
    /// Localized summary derived from the status.
    pub message: String,
    pub models: Vec<ModelInfo>,
}
