use serde_json::{Map, Value, json};

use crate::error::LLMError;
use crate::types::{GenerationRequest, SamplingParams};

/// Builds a Chat Completions body with an optional system turn and one user turn.
///
/// Without an image the user content stays a plain string, which every compatible
/// server accepts; with an image it becomes a `text` + `image_url` part list.
pub(crate) fn build_openai_body(
    request: &GenerationRequest,
    sampling: SamplingParams,
    stream: bool,
) -> Result<Value, LLMError> {
    let model = request.model.trim();
    if model.is_empty() {
        return Err(LLMError::Validation {
            message: "model is required for OpenAI Chat".to_string(),
        });
    }

    let mut messages = Vec::new();
    if let Some(system) = request.system_text() {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": user_content(request)? }));

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("messages".to_string(), Value::Array(messages));
    body.insert("temperature".to_string(), Value::from(sampling.temperature));
    body.insert(
        "max_tokens".to_string(),
        Value::from(sampling.max_output_tokens),
    );
    body.insert("stream".to_string(), Value::Bool(stream));
    Ok(Value::Object(body))
}

fn user_content(request: &GenerationRequest) -> Result<Value, LLMError> {
    let has_prompt = !request.prompt.trim().is_empty();
    match &request.image {
        None if has_prompt => Ok(Value::String(request.prompt.clone())),
        None => Err(LLMError::Validation {
            message: "OpenAI Chat request requires a prompt or an image".to_string(),
        }),
        Some(image) => {
            let mut parts = Vec::new();
            if has_prompt {
                parts.push(json!({ "type": "text", "text": request.prompt }));
            }
            parts.push(json!({
                "type": "image_url",
                "image_url": { "url": image.data_url() }
            }));
            Ok(Value::Array(parts))
        }
    }
}
