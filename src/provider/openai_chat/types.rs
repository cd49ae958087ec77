use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct OpenAiChatResponse {
    #[serde(default)]
    pub(crate) choices: Vec<OpenAiResponseChoice>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct OpenAiResponseChoice {
    #[serde(default)]
    pub(crate) message: Option<OpenAiResponseMessage>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct OpenAiResponseMessage {
    #[serde(default)]
    pub(crate) content: Option<OpenAiMessageContent>,
}

/// `content` is either a plain string or an ordered list of typed parts.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub(crate) enum OpenAiMessageContent {
    Text(String),
    Parts(Vec<OpenAiMessagePart>),
}

impl OpenAiMessageContent {
    /// Concatenates the text-bearing parts in order.
    pub(crate) fn text(&self) -> String {
        match self {
            OpenAiMessageContent::Text(text) => text.clone(),
            OpenAiMessageContent::Parts(parts) => parts
                .iter()
                .filter(|part| matches!(part.kind.as_deref(), None | Some("text")))
                .filter_map(|part| part.text.as_deref())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct OpenAiMessagePart {
    #[serde(default, rename = "type")]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct OpenAiStreamChunk {
    #[serde(default)]
    pub(crate) choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct OpenAiStreamChoice {
    #[serde(default)]
    pub(crate) delta: Option<OpenAiStreamDelta>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct OpenAiStreamDelta {
    #[serde(default)]
    pub(crate) content: Option<OpenAiMessageContent>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct OpenAiModelList {
    #[serde(default)]
    pub(crate) data: Vec<OpenAiModel>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct OpenAiModel {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) owned_by: Option<String>,
}
