use tracing::warn;

use crate::error::LLMError;
use crate::types::ModelInfo;

use super::types::{GeminiCandidate, GeminiGenerateContentResponse, GeminiModelList};

const PROVIDER: &str = "google_gemini";

/// 第一个候选的所有文本 part 按顺序拼接
pub(crate) fn first_candidate_text(resp: &GeminiGenerateContentResponse) -> String {
    resp.candidates
        .first()
        .map(candidate_text)
        .unwrap_or_default()
}

fn candidate_text(candidate: &GeminiCandidate) -> String {
    candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Parses a non-streaming GenerateContent body into its text.
pub(crate) fn parse_generate_response(body: &str) -> Result<String, LLMError> {
    let parsed: GeminiGenerateContentResponse =
        serde_json::from_str(body).map_err(|err| LLMError::Provider {
            provider: PROVIDER,
            message: format!("failed to parse Gemini response: {err}"),
        })?;
    if let Some(reason) = parsed
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        warn!(provider = PROVIDER, reason, "prompt blocked by safety filter");
    }
    Ok(first_candidate_text(&parsed))
}

/// models.list -> ModelInfo，去掉 `models/` 前缀
pub(crate) fn parse_model_list(body: &str) -> Result<Vec<ModelInfo>, LLMError> {
    let parsed: GeminiModelList = serde_json::from_str(body).map_err(|err| LLMError::Provider {
        provider: PROVIDER,
        message: format!("failed to parse Gemini model list: {err}"),
    })?;
    Ok(parsed
        .models
        .into_iter()
        .map(|model| ModelInfo {
            id: model
                .name
                .strip_prefix("models/")
                .map(str::to_string)
                .unwrap_or(model.name),
            display_name: model.display_name,
        })
        .collect())
}
