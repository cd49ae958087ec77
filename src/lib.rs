//! 单次调用的 LLM 文本生成客户端
//!
//! Routes each request to a Gemini-style or OpenAI-compatible endpoint, and delivers the
//! answer either in one piece ([`GenerationClient::generate`]) or as ordered
//! [`StreamChunk`] progress items decoded from a server-sent-event body
//! ([`GenerationClient::generate_streaming`], [`GenerationClient::stream`]).

pub mod accumulator;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod messages;
pub mod provider;
pub mod stream;
pub mod types;

pub use client::GenerationClient;
pub use config::{EnvSettings, GenerationConfig, SamplingConfig};
pub use error::LLMError;
pub use messages::Locale;
pub use provider::{LLMProvider, ProviderKind, TextStream};
pub use types::*;
