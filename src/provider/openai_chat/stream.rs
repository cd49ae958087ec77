use crate::types::DeltaResult;

use super::types::OpenAiStreamChunk;

/// Extracts `choices[0].delta.content` from one Chat Completions stream payload.
pub(crate) fn extract_delta(payload: &str) -> DeltaResult {
    let Ok(chunk) = serde_json::from_str::<OpenAiStreamChunk>(payload) else {
        return DeltaResult::malformed();
    };
    let Some(choice) = chunk.choices.first() else {
        return DeltaResult::default();
    };
    let text = choice
        .delta
        .as_ref()
        .and_then(|delta| delta.content.as_ref())
        .map(|content| content.text())
        .unwrap_or_default();
    let terminal = choice
        .finish_reason
        .as_deref()
        .is_some_and(|reason| !reason.is_empty());
    DeltaResult::text(text, terminal)
}
