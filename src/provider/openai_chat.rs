//! OpenAI-compatible Chat Completions protocol.

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::OpenAiChatProvider;

pub(crate) use provider::DEFAULT_BASE_URL;
pub(crate) use stream::extract_delta;
