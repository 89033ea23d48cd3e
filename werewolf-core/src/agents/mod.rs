//! Player backends.
//!
//! - [`ClaudePlayer`]: an LLM seat backed by the Anthropic Messages API
//! - [`HumanPlayer`]: a person at the terminal

mod claude;
mod human;

pub use claude::{ClaudePlayer, LlmConfig};
pub use human::{HumanPlayer, DEFAULT_HUMAN_REPLY, HUMAN_INPUT_TIMEOUT};
