//! User-facing message tables (English / 简体中文).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::types::ErrorKind;

/// Language of user-facing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh")]
    Chinese,
}

impl FromStr for Locale {
    type Err = LLMError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_ascii_lowercase();
        match lower.as_str() {
            "en" | "en-us" | "en_us" | "english" => Ok(Locale::English),
            "zh" | "zh-cn" | "zh_cn" | "zh-hans" | "chinese" => Ok(Locale::Chinese),
            _ => Err(LLMError::InvalidConfig {
                field: "locale".to_string(),
                reason: format!("unsupported locale `{value}`"),
            }),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Locale::English => "en",
            Locale::Chinese => "zh",
        })
    }
}

/// Localized explanation for a failed generation; never empty.
///
/// `detail` is only shown for [`ErrorKind::Unknown`].
pub fn error_message(kind: ErrorKind, locale: Locale, detail: &str) -> String {
    let detail = detail.trim();
    match (locale, kind) {
        (Locale::English, ErrorKind::Auth) => {
            "Invalid or expired API key. Please check your key and try again.".to_string()
        }
        (Locale::English, ErrorKind::RateLimit) => {
            "Rate limit exceeded. Please wait a moment and try again.".to_string()
        }
        (Locale::English, ErrorKind::ModelNotFound) => {
            "The model was not found or your API key has no access to it.".to_string()
        }
        (Locale::English, ErrorKind::Network) => {
            "Network error. Please check your connection and try again.".to_string()
        }
        (Locale::English, ErrorKind::EmptyResponse) => {
            "The model returned an empty response. Please try again.".to_string()
        }
        (Locale::English, ErrorKind::Unknown) if detail.is_empty() => {
            "Generation failed.".to_string()
        }
        (Locale::English, ErrorKind::Unknown) => format!("Generation failed: {detail}"),
        (Locale::Chinese, ErrorKind::Auth) => "API 密钥无效或已过期，请检查后重试。".to_string(),
        (Locale::Chinese, ErrorKind::RateLimit) => "请求过于频繁，请稍后再试。".to_string(),
        (Locale::Chinese, ErrorKind::ModelNotFound) => {
            "模型不存在，或当前密钥无权访问该模型。".to_string()
        }
        (Locale::Chinese, ErrorKind::Network) => "网络错误，请检查网络连接后重试。".to_string(),
        (Locale::Chinese, ErrorKind::EmptyResponse) => "模型返回了空响应，请重试。".to_string(),
        (Locale::Chinese, ErrorKind::Unknown) if detail.is_empty() => "生成失败。".to_string(),
        (Locale::Chinese, ErrorKind::Unknown) => format!("生成失败：{detail}"),
    }
}

/// Summary for a model listing that came back with `status`.
pub fn connection_message(status: u16, model_count: usize, locale: Locale) -> String {
    match (locale, status) {
        (Locale::English, 200..=299) => {
            format!("Connection succeeded ({model_count} models available).")
        }
        (Locale::English, 401 | 403) => {
            format!("Connection failed: invalid API key (HTTP {status}).")
        }
        (Locale::English, 429) => "Connection failed: rate limit exceeded (HTTP 429).".to_string(),
        (Locale::English, 404) => {
            "Connection failed: endpoint not found (HTTP 404). Check the base URL.".to_string()
        }
        (Locale::English, _) => format!("Connection failed: HTTP {status}."),
        (Locale::Chinese, 200..=299) => format!("连接成功（可用模型 {model_count} 个）。"),
        (Locale::Chinese, 401 | 403) => format!("连接失败：API 密钥无效（HTTP {status}）。"),
        (Locale::Chinese, 429) => "连接失败：请求过于频繁（HTTP 429）。".to_string(),
        (Locale::Chinese, 404) => "连接失败：接口不存在（HTTP 404），请检查 Base URL。".to_string(),
        (Locale::Chinese, _) => format!("连接失败：HTTP {status}。"),
    }
}

/// Summary for a probe that never got an HTTP response.
pub fn connection_error_message(err: &LLMError, locale: Locale) -> String {
    match locale {
        Locale::English => format!("Connection failed: {err}"),
        Locale::Chinese => format!("连接失败：{err}"),
    }
}
