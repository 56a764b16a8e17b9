//! OpenAI provider implementation
//!
//! Tool-calling chat model over the OpenAI `chat/completions` API or any
//! compatible gateway.

pub mod chat;
pub mod client;
pub mod types;

pub use chat::OpenAIChatModel;
pub use client::OpenAIClient;
