use std::env;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LLMError;
use crate::messages::Locale;
use crate::provider::{ProviderKind, google_gemini, openai_chat};
use crate::types::SamplingParams;

const ENV_API_KEY: &str = "PROMPTLINE_API_KEY";
const ENV_MODEL: &str = "PROMPTLINE_MODEL";
const ENV_BASE_URL: &str = "PROMPTLINE_BASE_URL";
const ENV_LOCALE: &str = "PROMPTLINE_LOCALE";

/// 采样配置 区分默认档与降额档
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub reduced_temperature: f32,
    pub reduced_max_output_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 8192,
            reduced_temperature: 0.3,
            reduced_max_output_tokens: 2048,
        }
    }
}

impl SamplingConfig {
    /// Picks the parameter set for a request.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptline::config::SamplingConfig;
    ///
    /// let sampling = SamplingConfig::default();
    /// assert_eq!(sampling.resolve(false).max_output_tokens, 8192);
    /// assert_eq!(sampling.resolve(true).max_output_tokens, 2048);
    /// ```
    pub fn resolve(&self, reduced_capacity: bool) -> SamplingParams {
        if reduced_capacity {
            SamplingParams {
                temperature: self.reduced_temperature,
                max_output_tokens: self.reduced_max_output_tokens,
            }
        } else {
            SamplingParams {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            }
        }
    }
}

/// Client-wide settings shared by every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub sampling: SamplingConfig,
    /// 请求未指定 base_url 时 Gemini 使用的地址
    pub gemini_base_url: String,
    /// 请求未指定 base_url 时 OpenAI 兼容后端使用的地址
    pub openai_base_url: String,
    pub locale: Locale,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            gemini_base_url: google_gemini::DEFAULT_BASE_URL.to_string(),
            openai_base_url: openai_chat::DEFAULT_BASE_URL.to_string(),
            locale: Locale::default(),
        }
    }
}

impl GenerationConfig {
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Default base URL for `kind` when the request does not carry one.
    pub fn base_url_for(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::GoogleGemini => &self.gemini_base_url,
            ProviderKind::OpenAiCompatible => &self.openai_base_url,
        }
    }

    /// 校验配置是否可用
    pub fn validate(&self) -> Result<(), LLMError> {
        let sampling = &self.sampling;
        check_temperature("sampling.temperature", sampling.temperature)?;
        check_temperature("sampling.reduced_temperature", sampling.reduced_temperature)?;
        check_ceiling("sampling.max_output_tokens", sampling.max_output_tokens)?;
        check_ceiling(
            "sampling.reduced_max_output_tokens",
            sampling.reduced_max_output_tokens,
        )?;
        check_url("gemini_base_url", &self.gemini_base_url)?;
        check_url("openai_base_url", &self.openai_base_url)?;
        Ok(())
    }
}

fn check_temperature(field: &str, value: f32) -> Result<(), LLMError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("temperature must be finite and >= 0, got {value}")))
    }
}

fn check_ceiling(field: &str, value: u32) -> Result<(), LLMError> {
    if value == 0 {
        Err(invalid(field, "output ceiling must be positive".to_string()))
    } else {
        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<(), LLMError> {
    if value.trim().is_empty() {
        Err(invalid(field, "base url must not be empty".to_string()))
    } else {
        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> LLMError {
    LLMError::InvalidConfig {
        field: field.to_string(),
        reason,
    }
}

/// Credentials and defaults read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub locale: Locale,
}

impl EnvSettings {
    /// Loads `.env` when present, then reads the `PROMPTLINE_*` variables.
    pub fn from_env() -> Result<Self, LLMError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, LLMError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &str| {
            read(name).ok_or_else(|| invalid(name, "environment variable is not set".to_string()))
        };

        let locale = match read(ENV_LOCALE) {
            Some(value) => value.parse()?,
            None => Locale::default(),
        };
        Ok(Self {
            api_key: required(ENV_API_KEY)?,
            model: required(ENV_MODEL)?,
            base_url: read(ENV_BASE_URL),
            locale,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = GenerationConfig::default();
        config.validate().expect("valid");
        assert_eq!(
            config.base_url_for(ProviderKind::GoogleGemini),
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(
            config.base_url_for(ProviderKind::OpenAiCompatible),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            config.sampling.resolve(true),
            SamplingParams {
                temperature: 0.3,
                max_output_tokens: 2048
            }
        );
    }

    #[test]
    fn deserialize_fills_missing_fields() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{"locale":"zh","sampling":{"temperature":0.5}}"#)
                .expect("config");
        assert_eq!(config.locale, Locale::Chinese);
        assert_eq!(config.sampling.temperature, 0.5);
        assert_eq!(config.sampling.max_output_tokens, 8192);
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = GenerationConfig::default();
        config.sampling.temperature = f32::NAN;
        match config.validate() {
            Err(LLMError::InvalidConfig { field, .. }) => assert_eq!(field, "sampling.temperature"),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }

        let mut config = GenerationConfig::default();
        config.sampling.reduced_max_output_tokens = 0;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.openai_base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_settings_require_key_and_model() {
        let settings = EnvSettings::from_lookup(lookup(&[
            (ENV_API_KEY, " sk-test "),
            (ENV_MODEL, "gpt-4o-mini"),
            (ENV_LOCALE, "zh"),
        ]))
        .expect("settings");
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.base_url, None);
        assert_eq!(settings.locale, Locale::Chinese);

        match EnvSettings::from_lookup(lookup(&[(ENV_MODEL, "gpt-4o-mini")])) {
            Err(LLMError::InvalidConfig { field, .. }) => assert_eq!(field, ENV_API_KEY),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
        assert!(
            EnvSettings::from_lookup(lookup(&[(ENV_API_KEY, "k"), (ENV_MODEL, "   ")])).is_err()
        );
    }
}
