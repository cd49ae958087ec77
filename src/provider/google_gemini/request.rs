use serde_json::{Map, Value, json};

use crate::error::LLMError;
use crate::types::{GenerationRequest, SamplingParams};

/// 构建 Google Gemini GenerateContent 请求体
///
/// 模型名称通过 URL 路径传递，因此不会出现在 body 中。
pub(crate) fn build_gemini_body(
    request: &GenerationRequest,
    sampling: SamplingParams,
) -> Result<Value, LLMError> {
    let mut parts = Vec::new();
    if !request.prompt.trim().is_empty() {
        parts.push(json!({ "text": request.prompt }));
    }
    if let Some(image) = &request.image {
        parts.push(json!({
            "inlineData": {
                "mimeType": image.mime_type,
                "data": image.data,
            }
        }));
    }
    if parts.is_empty() {
        return Err(LLMError::Validation {
            message: "Gemini GenerateContent request requires a prompt or an image".to_string(),
        });
    }

    let mut body = Map::new();
    body.insert(
        "contents".to_string(),
        json!([{ "role": "user", "parts": parts }]),
    );

    if let Some(system) = request.system_text() {
        body.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [ { "text": system } ] }),
        );
    }

    body.insert(
        "generationConfig".to_string(),
        json!({
            "temperature": sampling.temperature,
            "maxOutputTokens": sampling.max_output_tokens,
        }),
    );

    Ok(Value::Object(body))
}
