use crate::error::LLMError;
use crate::types::ModelInfo;

use super::types::{OpenAiChatResponse, OpenAiModelList};

const PROVIDER: &str = "openai_chat";

/// Parses a Chat Completions body into the first choice's message text.
pub(crate) fn parse_chat_response(body: &str) -> Result<String, LLMError> {
    let parsed: OpenAiChatResponse = serde_json::from_str(body).map_err(|err| LLMError::Provider {
        provider: PROVIDER,
        message: format!("failed to parse OpenAI response: {err}"),
    })?;
    Ok(parsed
        .choices
        .first()
        .and_then(|choice| choice.message.as_ref())
        .and_then(|message| message.content.as_ref())
        .map(|content| content.text())
        .unwrap_or_default())
}

pub(crate) fn parse_model_list(body: &str) -> Result<Vec<ModelInfo>, LLMError> {
    let parsed: OpenAiModelList = serde_json::from_str(body).map_err(|err| LLMError::Provider {
        provider: PROVIDER,
        message: format!("failed to parse OpenAI model list: {err}"),
    })?;
    Ok(parsed
        .data
        .into_iter()
        .map(|model| ModelInfo {
            id: model.id,
            display_name: model.owned_by,
        })
        .collect())
}
