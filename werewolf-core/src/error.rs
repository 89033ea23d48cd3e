//! Error types for the werewolf engine.
//!
//! Only [`SetupError`] is ever allowed to stop a game. Everything raised
//! once the game loop is running is absorbed by the moderator and turned
//! into a passive turn.

use std::time::Duration;

/// Errors raised while building a game, before any state exists.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// No player names were supplied
    #[error("No players configured")]
    EmptyRoster,

    /// The role deck does not have one card per player
    #[error("Player count ({players}) does not match role count ({roles})")]
    RoleCountMismatch { players: usize, roles: usize },

    /// Two players share a name
    #[error("Duplicate player name: {0}")]
    DuplicateName(String),

    /// Players were already seated in this game state
    #[error("Players have already been initialized")]
    AlreadyInitialized,

    /// The requested human seat is not in the roster
    #[error("Unknown human player {name}; valid players are {valid}")]
    UnknownHumanPlayer { name: String, valid: String },

    /// A seated player has nobody to answer for them
    #[error("No agent registered for player {0}")]
    MissingAgent(String),

    /// The Claude backend needs a key
    #[error("No API key configured - set ANTHROPIC_API_KEY environment variable")]
    NoApiKey,

    /// Anything else wrong with the configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors produced by a player agent backend.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Errors from sending a prompt to a player and waiting for the reply.
///
/// These never escape a running phase.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No agent for player {0}")]
    UnknownPlayer(String),

    #[error("Agent for {player} failed: {source}")]
    Agent {
        player: String,
        #[source]
        source: AgentError,
    },

    #[error("{player} did not answer within {after:?}")]
    Timeout { player: String, after: Duration },

    #[error("{0} returned an empty response")]
    EmptyResponse(String),

    #[error("Task for {0} panicked")]
    Panicked(String),
}

/// A rejected game action. State is untouched when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("No target was given")]
    NoTarget,

    #[error("{0} is not a player in this game")]
    UnknownPlayer(String),

    #[error("{0} is already dead")]
    NotAlive(String),

    #[error("{0} cannot target themselves")]
    SelfTarget(String),

    #[error("{actor} is not the {role}")]
    WrongRole { actor: String, role: &'static str },

    #[error("Werewolves cannot kill another werewolf ({0})")]
    FriendlyFire(String),

    #[error("The healing potion has already been used")]
    HealUsed,

    #[error("The poison potion has already been used")]
    PoisonUsed,

    #[error("Nobody was killed tonight, there is nothing to save")]
    NothingToSave,

    #[error("The witch cannot save herself")]
    WitchSelfSave,

    #[error("A potion was already used tonight")]
    PotionAlreadyUsedTonight,

    #[error("{0} is already poisoned tonight")]
    AlreadyDoomed(String),
}

/// Errors from an episode store.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),
}

/// Errors while writing the game transcript.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for game setup
pub type SetupResult<T> = std::result::Result<T, SetupError>;

/// Result type for game actions
pub type ActionResult<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SetupError::RoleCountMismatch {
            players: 9,
            roles: 8,
        };
        assert_eq!(
            err.to_string(),
            "Player count (9) does not match role count (8)"
        );
    }

    #[test]
    fn test_dispatch_error_keeps_source() {
        use std::error::Error as _;

        let err = DispatchError::Agent {
            player: "Player3".to_string(),
            source: AgentError::Network("connection reset".to_string()),
        };
        assert!(err.to_string().contains("Player3"));
        assert!(err.source().is_some());
    }
}
