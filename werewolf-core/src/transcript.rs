//! Markdown game transcript.
//!
//! Two logs are kept side by side: a full log with every event, and a
//! condensed replay that only shows what a spectator needs to follow the game.

use crate::error::TranscriptError;
use crate::event::GameEvent;
use crate::state::Phase;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// A new game id, e.g. `20250114_213005`.
pub fn generate_game_id() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[derive(Debug, Clone)]
pub struct Transcript {
    game_id: String,
    started: DateTime<Local>,
    full: String,
    replay: String,
}

impl Transcript {
    pub fn new(game_id: impl Into<String>) -> Self {
        let game_id = game_id.into();
        let started = Local::now();
        let header = format!(
            "# Werewolf game {game_id}\n\nStarted: {}\n\n",
            started.format("%Y-%m-%d %H:%M:%S")
        );
        Self {
            game_id,
            started,
            full: header.clone(),
            replay: header,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    pub fn full_log(&self) -> &str {
        &self.full
    }

    pub fn replay_log(&self) -> &str {
        &self.replay
    }

    /// Append one event to both logs.
    pub fn record(&mut self, event: &GameEvent) {
        let full = full_entry(event);
        let _ = writeln!(self.full, "{full}");
        if let Some(line) = replay_entry(event) {
            let _ = writeln!(self.replay, "{line}");
        }
    }

    /// Write `<dir>/<game_id>/full_log.md` and `replay.md`. Returns the game directory.
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, TranscriptError> {
        let game_dir = dir.as_ref().join(&self.game_id);
        tokio::fs::create_dir_all(&game_dir).await?;
        tokio::fs::write(game_dir.join("full_log.md"), &self.full).await?;
        tokio::fs::write(game_dir.join("replay.md"), &self.replay).await?;
        Ok(game_dir)
    }
}

fn full_entry(event: &GameEvent) -> String {
    match event {
        GameEvent::GameStarted { players, .. } => {
            let mut table = String::from("## Roles\n\n| Player | Role |\n|--------|------|\n");
            for p in players {
                let _ = writeln!(table, "| {} | {} |", p.name, p.role);
            }
            table
        }
        GameEvent::RoundStarted(round) => format!("\n## Round {round}\n"),
        GameEvent::PhaseStarted { phase: Phase::Night, .. } => "### Night\n".to_string(),
        GameEvent::PhaseStarted { phase: Phase::Day, .. } => "### Day\n".to_string(),
        GameEvent::GameOver { .. } => format!("\n## Result\n\n{}\n", event.to_string().trim()),
        other => format!("- {}", other.to_string().trim()),
    }
}

fn replay_entry(event: &GameEvent) -> Option<String> {
    match event {
        GameEvent::GameStarted { .. } | GameEvent::RoundStarted(_) | GameEvent::PhaseStarted { .. } => {
            Some(full_entry(event))
        }
        GameEvent::WerewolfKill { target, .. } => {
            Some(format!("- Werewolves chose {}", target.as_deref().unwrap_or("nobody")))
        }
        GameEvent::WitchSave { .. }
        | GameEvent::WitchPoison { .. }
        | GameEvent::SeerCheck { .. }
        | GameEvent::HunterShot { .. }
        | GameEvent::Speech { .. }
        | GameEvent::LastWords { .. }
        | GameEvent::VoteResult { .. }
        | GameEvent::Announcement(_) => Some(format!("- {}", event.to_string().trim())),
        GameEvent::GameOver { .. } => Some(full_entry(event)),
        _ => None,
    }
}
