use crate::types::DeltaResult;

use super::response::first_candidate_text;
use super::types::GeminiGenerateContentResponse;

/// Extracts the text fragment of one `streamGenerateContent?alt=sse` payload.
///
/// Each payload is a complete GenerateContentResponse; a non-empty `finishReason` on the
/// first candidate marks the end of the stream.
pub(crate) fn extract_delta(payload: &str) -> DeltaResult {
    let Ok(chunk) = serde_json::from_str::<GeminiGenerateContentResponse>(payload) else {
        return DeltaResult::malformed();
    };
    let terminal = chunk
        .candidates
        .first()
        .and_then(|candidate| candidate.finish_reason.as_deref())
        .is_some_and(|reason| !reason.is_empty());
    DeltaResult::text(first_candidate_text(&chunk), terminal)
}
