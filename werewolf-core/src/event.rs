//! Moderator-visible game events.
//!
//! Everything that happens at the table is emitted as a [`GameEvent`]. The
//! transcript records every event and the binary prints them as they arrive.

use crate::state::{Faction, Phase, Player, Role};
use std::fmt;

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Winner(Faction),
    /// The round cap was hit with both factions still standing.
    MaxRoundsReached,
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Winner(Faction::Werewolves) => write!(f, "werewolves win"),
            GameOutcome::Winner(Faction::Villagers) => write!(f, "villagers win"),
            GameOutcome::MaxRoundsReached => write!(f, "max rounds reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    GameStarted {
        game_id: String,
        players: Vec<Player>,
    },
    RoundStarted(u32),
    PhaseStarted {
        round: u32,
        phase: Phase,
    },
    /// A moderator broadcast to every player.
    Announcement(String),
    WerewolfDiscussionStarted {
        wolves: Vec<String>,
    },
    WerewolfSpeech {
        wolf: String,
        turn: u32,
        message: String,
        agreed: bool,
    },
    WerewolfVote {
        wolf: String,
        target: Option<String>,
    },
    WerewolfKill {
        target: Option<String>,
        detail: String,
    },
    WitchSave {
        witch: String,
        target: String,
    },
    WitchPoison {
        witch: String,
        target: String,
    },
    SeerCheck {
        seer: String,
        target: String,
        faction: Faction,
    },
    NightSummary {
        killed: Option<String>,
        saved: bool,
        poisoned: Option<String>,
        shot: Option<String>,
    },
    SpeakingOrder(Vec<String>),
    Speech {
        player: String,
        text: String,
    },
    DayVote {
        voter: String,
        target: Option<String>,
    },
    VoteResult {
        detail: String,
        eliminated: Option<String>,
    },
    LastWords {
        player: String,
        text: String,
    },
    HunterShot {
        hunter: String,
        target: String,
    },
    /// A decision that failed validation.
    ActionRejected {
        player: String,
        action: &'static str,
        reason: String,
    },
    GameOver {
        outcome: GameOutcome,
        survivors: Vec<String>,
        roles: String,
    },
    Reflection {
        player: String,
        role: Role,
        text: String,
    },
}

impl GameEvent {
    /// Whether every player at the table witnessed this event.
    ///
    /// Night actions, role reveals before the end and rejected actions are private.
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            GameEvent::RoundStarted(_)
                | GameEvent::PhaseStarted { .. }
                | GameEvent::Announcement(_)
                | GameEvent::SpeakingOrder(_)
                | GameEvent::Speech { .. }
                | GameEvent::DayVote { .. }
                | GameEvent::VoteResult { .. }
                | GameEvent::LastWords { .. }
                | GameEvent::HunterShot { .. }
                | GameEvent::GameOver { .. }
                | GameEvent::Reflection { .. }
        )
    }
}

fn or_nobody(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("nobody")
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::GameStarted { game_id, players } => {
                writeln!(f, "=== Werewolf game {game_id} ===")?;
                let seats: Vec<String> = players.iter().map(|p| format!("{}({})", p.name, p.role)).collect();
                write!(f, "Roles: {}", seats.join(", "))
            }
            GameEvent::RoundStarted(round) => write!(f, "\n===== Round {round} ====="),
            GameEvent::PhaseStarted { phase: Phase::Night, .. } => write!(f, "--- Night ---"),
            GameEvent::PhaseStarted { phase: Phase::Day, .. } => write!(f, "--- Day ---"),
            GameEvent::Announcement(text) => write!(f, "  📢 {text}"),
            GameEvent::WerewolfDiscussionStarted { wolves } => {
                write!(f, "  Werewolves ({}) are discussing...", wolves.join(", "))
            }
            GameEvent::WerewolfSpeech { wolf, turn, message, .. } => {
                write!(f, "  [{wolf}] (wolf turn {turn}): {message}")
            }
            GameEvent::WerewolfVote { wolf, target } => {
                write!(f, "  [{wolf}] votes to kill {}", or_nobody(target))
            }
            GameEvent::WerewolfKill { target, detail } => {
                write!(f, "  ➡️ Werewolves chose {} ({detail})", or_nobody(target))
            }
            GameEvent::WitchSave { witch, target } => write!(f, "  ➡️ Witch {witch} saved {target}"),
            GameEvent::WitchPoison { witch, target } => write!(f, "  ➡️ Witch {witch} poisoned {target}"),
            GameEvent::SeerCheck { seer, target, faction } => {
                write!(f, "  ➡️ Seer {seer} checked {target}: {faction}")
            }
            GameEvent::NightSummary { killed, saved, poisoned, shot } => write!(
                f,
                "  Night summary: killed {}{}, poisoned {}, shot {}",
                or_nobody(killed),
                if *saved { " (saved)" } else { "" },
                or_nobody(poisoned),
                or_nobody(shot)
            ),
            GameEvent::SpeakingOrder(order) => write!(f, "  📢 Speaking order: {}", order.join(" → ")),
            GameEvent::Speech { player, text } => write!(f, "  [{player}]: {text}"),
            GameEvent::DayVote { voter, target } => write!(f, "  [{voter}] votes {}", or_nobody(target)),
            GameEvent::VoteResult { detail, eliminated } => {
                write!(f, "  ➡️ Vote result: {} eliminated ({detail})", or_nobody(eliminated))
            }
            GameEvent::LastWords { player, text } => write!(f, "  [{player}] (last words): {text}"),
            GameEvent::HunterShot { hunter, target } => write!(f, "  🔫 Hunter {hunter} shot {target}"),
            GameEvent::ActionRejected { player, action, reason } => {
                write!(f, "  ✗ {player}'s {action} was rejected: {reason}")
            }
            GameEvent::GameOver { outcome, survivors, roles } => {
                writeln!(f, "\n=== Game over: {outcome} ===")?;
                writeln!(f, "Survivors: {}", survivors.join(", "))?;
                write!(f, "Roles: {roles}")
            }
            GameEvent::Reflection { player, role, text } => write!(f, "  [{player}] ({role}) reflects: {text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_lines() {
        let vote = GameEvent::WerewolfVote {
            wolf: "Player2".to_string(),
            target: None,
        };
        assert_eq!(vote.to_string(), "  [Player2] votes to kill nobody");

        let result = GameEvent::VoteResult {
            detail: "Player3:2, Player4:1".to_string(),
            eliminated: Some("Player3".to_string()),
        };
        assert_eq!(result.to_string(), "  ➡️ Vote result: Player3 eliminated (Player3:2, Player4:1)");
        assert_eq!(GameOutcome::Winner(Faction::Villagers).to_string(), "villagers win");
    }

    #[test]
    fn test_night_actions_are_private() {
        let check = GameEvent::SeerCheck {
            seer: "Player5".to_string(),
            target: "Player2".to_string(),
            faction: Faction::Werewolves,
        };
        assert!(!check.is_public());
        assert!(!GameEvent::GameStarted {
            game_id: "g".to_string(),
            players: Vec::new(),
        }
        .is_public());
        assert!(GameEvent::Speech {
            player: "Player1".to_string(),
            text: "hi".to_string(),
        }
        .is_public());
    }
}
