use std::time::Duration;

use thiserror::Error;

use crate::types::ErrorKind;

/// Aggregates every failure mode a single generation call can run into.
///
/// Errors stay structured inside the crate; [`crate::client::GenerationClient`] is the
/// only place that flattens them into a localized [`crate::types::GenerationResult`].
#[derive(Debug, Error)]
pub enum LLMError {
    /// Represents transport-layer or networking failures, including a body stream that
    /// was cut off by the caller or the peer.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Reports invalid, expired or missing credentials.
    #[error("auth failure: {message}")]
    Auth { message: String },
    /// Indicates that the provider throttled the request.
    #[error("rate limited: {message}")]
    RateLimit {
        /// Raw message returned by the upstream provider.
        message: String,
        /// Optional wait duration suggested by the provider before retrying.
        retry_after: Option<Duration>,
    },
    /// Indicates that the requested model is unknown or not available to the key.
    #[error("model not found: {message}")]
    ModelNotFound {
        /// Model identifier extracted from the error payload when available.
        model: Option<String>,
        /// Full error message returned by the provider for debugging.
        message: String,
    },
    /// The body (or stream) drained without yielding any non-whitespace text.
    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },
    /// Signals validation failures in the request payload.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// Wraps provider-defined errors that cannot be normalized.
    #[error("provider {provider} error: {message}")]
    Provider {
        /// Name of the provider, such as `google_gemini`.
        provider: &'static str,
        /// Human-readable error message returned by the provider.
        message: String,
    },
    /// Catches opaque or unexpected failures.
    #[error("unknown error: {message}")]
    Unknown { message: String },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Provider`] with the given provider name and message.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::error::LLMError;
    ///
    /// let err = LLMError::provider("openai_chat", "bad JSON payload");
    /// assert!(matches!(err, LLMError::Provider { provider: "openai_chat", .. }));
    /// ```
    pub fn provider<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Short machine-readable category for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::error::LLMError;
    /// use promptline::types::ErrorKind;
    ///
    /// let err = LLMError::EmptyResponse { provider: "google_gemini" };
    /// assert_eq!(err.kind(), ErrorKind::EmptyResponse);
    /// assert_eq!(err.kind().as_str(), "empty_response");
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Network,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            Self::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            Self::Validation { .. }
            | Self::InvalidConfig { .. }
            | Self::Provider { .. }
            | Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }
}

/// Maps a non-2xx status plus the provider's extracted message onto an [`LLMError`].
///
/// 401, 429 and 404 are decided by status alone. Other statuses fall back to substring
/// hints in the message, then to [`LLMError::Provider`].
pub(crate) fn classify_http_error(
    provider: &'static str,
    status: u16,
    message: String,
    retry_after: Option<Duration>,
) -> LLMError {
    match status {
        401 => LLMError::Auth { message },
        429 => LLMError::RateLimit {
            message,
            retry_after,
        },
        404 => LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        },
        _ if looks_like_key_error(&message) => LLMError::Auth { message },
        _ if looks_like_model_error(&message) => LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        },
        403 => LLMError::Auth { message },
        _ => LLMError::Provider { provider, message },
    }
}

/// Returns `true` when an error message points at a bad or expired credential.
pub(crate) fn looks_like_key_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    const HINTS: [&str; 7] = [
        "api key",
        "api_key",
        "apikey",
        "invalid key",
        "incorrect key",
        "unauthenticated",
        "expired",
    ];
    HINTS.iter().any(|needle| lower.contains(needle))
}

/// Returns `true` when an error message says the model is unknown or not permitted.
pub(crate) fn looks_like_model_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    if !lower.contains("model") {
        return false;
    }
    const HINTS: [&str; 5] = [
        "not found",
        "does not exist",
        "not supported",
        "no access",
        "not available",
    ];
    HINTS.iter().any(|needle| lower.contains(needle))
}

/// Attempts to extract a model identifier from an error payload.
pub(crate) fn extract_model_identifier(message: &str) -> Option<String> {
    for delimiter in ['`', '"', '\''] {
        if let Some(value) = between_delimiters(message, delimiter) {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

fn between_delimiters(message: &str, delimiter: char) -> Option<String> {
    let start = message.find(delimiter)? + delimiter.len_utf8();
    let rest = message.get(start..)?;
    let end = rest.find(delimiter)?;
    Some(rest[..end].to_string())
}
