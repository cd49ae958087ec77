use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LLMError, classify_http_error};

/// Parses error responses from OpenAI-compatible servers.
///
/// Besides the canonical `{"error": {"message", "code"}}` shape, some compatible servers
/// reply with a top-level `message` or `detail`; anything else is classified on the raw
/// body.
pub(crate) fn parse_openai_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ErrorField>,
        message: Option<String>,
        detail: Option<Value>,
    }
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorField {
        Object(InnerError),
        Text(String),
    }
    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        code: Option<Value>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| match parsed.error {
            Some(ErrorField::Object(error)) => {
                let message = error.message.unwrap_or_else(|| "unknown error".to_string());
                Some(match error.code {
                    Some(Value::Null) | None => message,
                    Some(code) => format!("{message} ({code})"),
                })
            }
            Some(ErrorField::Text(text)) => Some(text),
            None => parsed.message.or_else(|| {
                parsed.detail.map(|detail| match detail {
                    Value::String(text) => text,
                    other => other.to_string(),
                })
            }),
        })
        .unwrap_or_else(|| format!("status {status}: {body}"));

    classify_http_error("openai_chat", status, message, retry_after)
}
