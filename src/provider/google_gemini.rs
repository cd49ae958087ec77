//! Google Gemini `generateContent` / `streamGenerateContent` protocol.

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::GoogleGeminiProvider;

pub(crate) use provider::DEFAULT_BASE_URL;
pub(crate) use stream::extract_delta;
