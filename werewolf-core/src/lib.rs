//! Werewolf game engine with AI players.
//!
//! This crate provides:
//! - Rule-correct night and day resolution for a nine-seat werewolf table
//! - Concurrent agent dispatch that tolerates slow, broken or silent players
//! - Structured decisions with a forgiving free-text fallback
//! - Game memory, markdown transcripts and English/Chinese prompts
//!
//! # Quick Start
//!
//! ```ignore
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use werewolf_core::agents::{ClaudePlayer, LlmConfig};
//! use werewolf_core::{Agent, Game, GameConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GameConfig::standard();
//!     let llm = LlmConfig::from_env()?;
//!
//!     let mut agents: HashMap<String, Arc<dyn Agent>> = HashMap::new();
//!     for name in &config.players {
//!         agents.insert(name.clone(), Arc::new(ClaudePlayer::new(llm.clone())?));
//!     }
//!
//!     let mut game = Game::new(config, agents)?;
//!     let report = game.run().await;
//!     println!("{}", report.outcome);
//!     game.save_transcript().await;
//!     Ok(())
//! }
//! ```

// Lets `#[derive(Decision)]` name this crate from inside it.
extern crate self as werewolf_core;

pub mod actions;
pub mod agents;
pub mod config;
pub mod decision;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod moderator;
pub mod prompts;
pub mod state;
pub mod testing;
pub mod transcript;
pub mod vote;

pub use werewolf_macros::Decision;

// Primary public API
pub use config::{GameConfig, Language, SpeakingOrderPolicy};
pub use decision::{Reply, ToolSpec};
pub use dispatch::{Agent, Dispatcher};
pub use error::{ActionError, AgentError, DispatchError, SetupError};
pub use event::{GameEvent, GameOutcome};
pub use moderator::{Game, GameReport};
pub use state::{Faction, GameState, Phase, Player, Role};
pub use vote::{majority_vote, Tally};
