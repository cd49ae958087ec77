use std::time::Duration;

use serde::Deserialize;

use crate::error::{LLMError, classify_http_error};

/// Parses error responses returned by Google Gemini.
///
/// The JSON `error.message` (suffixed with the RPC `status`) feeds classification; bodies
/// that are not JSON are classified on their raw text.
pub(crate) fn parse_gemini_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        status: Option<String>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .map(|error| {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            match error.status.as_deref() {
                Some(status_text) if !status_text.is_empty() => {
                    format!("{message} ({status_text})")
                }
                _ => message,
            }
        })
        .unwrap_or_else(|| format!("status {status}: {body}"));

    classify_http_error("google_gemini", status, message, retry_after)
}
