//! Per-player conversation history.
//!
//! Each player sees the game only through their own history: the system
//! instruction naming their role, moderator broadcasts they were allowed to
//! hear, prompts addressed to them, and their own replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who wrote a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// Role instruction, always first
    System,
    /// Moderator broadcasts and prompts
    Moderator,
    /// The player's own replies
    Player,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::System => write!(f, "system"),
            Speaker::Moderator => write!(f, "moderator"),
            Speaker::Player => write!(f, "player"),
        }
    }
}

/// A single history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            speaker,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Speaker::System, content)
    }

    pub fn moderator(content: impl Into<String>) -> Self {
        Self::new(Speaker::Moderator, content)
    }

    pub fn player(content: impl Into<String>) -> Self {
        Self::new(Speaker::Player, content)
    }

    pub fn is_system(&self) -> bool {
        self.speaker == Speaker::System
    }
}

/// Collapse whitespace runs to single spaces and cut to `max` characters,
/// appending "..." when something was dropped.
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert!(Message::system("rules").is_system());
        assert_eq!(Message::moderator("night").speaker, Speaker::Moderator);
        assert_eq!(Message::player("hi").content, "hi");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("line one\nline two", 100), "line one line two");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("狼人狼人", 2), "狼人...");
    }
}
