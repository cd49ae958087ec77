use serde::Deserialize;

/// GenerateContentResponse 顶层结构（非流式与流式 chunk 共用）
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GeminiGenerateContentResponse {
    /// 候选回答列表
    #[serde(default)]
    pub(crate) candidates: Vec<GeminiCandidate>,
    /// 内容被拦截时的反馈
    #[serde(default, rename = "promptFeedback")]
    pub(crate) prompt_feedback: Option<GeminiPromptFeedback>,
}

/// 单个候选回答
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub(crate) content: Option<GeminiContent>,
    #[serde(default, rename = "finishReason")]
    pub(crate) finish_reason: Option<String>,
}

/// 候选内容
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default)]
    pub(crate) parts: Vec<GeminiPart>,
}

/// Content.part；只关心文本，其余字段忽略
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiPart {
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiPromptFeedback {
    #[serde(default, rename = "blockReason")]
    pub(crate) block_reason: Option<String>,
}

/// models.list 响应
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiModelList {
    #[serde(default)]
    pub(crate) models: Vec<GeminiModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiModel {
    /// 形如 `models/gemini-2.0-flash`
    pub(crate) name: String,
    #[serde(default, rename = "displayName")]
    pub(crate) display_name: Option<String>,
}
