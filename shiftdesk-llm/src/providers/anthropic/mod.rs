//! Anthropic (Claude) provider implementation
//!
//! Tool-calling chat model over the Anthropic `messages` API.

pub mod client;
pub mod messages;
pub mod types;

pub use client::AnthropicClient;
pub use messages::AnthropicModel;
