//! The moderator: runs the game loop.
//!
//! A [`Game`] owns the shared state, the dispatcher with every seated agent,
//! memory and the transcript. Night and day resolution live in the
//! [`night`] and [`day`] submodules as further `impl Game` blocks.
//!
//! ```text
//! Run ─┬─► Night ─► CheckWin ─► Day ─► CheckWin ─┐
//!      └──────────────────── next round ◄────────┘
//! ```

mod day;
mod night;

use crate::actions;
use crate::config::{GameConfig, SpeakingOrderPolicy};
use crate::decision::{interpret, DecisionSchema, Shoot, SpeakingOrder};
use crate::dispatch::{Agent, Dispatcher};
use crate::error::{ActionError, SetupError, SetupResult};
use crate::event::{GameEvent, GameOutcome};
use crate::memory::{EpisodeKind, EpisodeStore, Memory};
use crate::message::Message;
use crate::prompts::PromptBook;
use crate::state::{Faction, GameState, Player};
use crate::transcript::{generate_game_id, Transcript};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// What a finished game looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct GameReport {
    pub outcome: GameOutcome,
    pub rounds_played: u32,
    /// Living players in seat order.
    pub survivors: Vec<String>,
    /// Every player with their true role.
    pub roles: Vec<Player>,
}

impl GameReport {
    pub fn winner(&self) -> Option<Faction> {
        match self.outcome {
            GameOutcome::Winner(faction) => Some(faction),
            GameOutcome::MaxRoundsReached => None,
        }
    }
}

/// One game of werewolf.
pub struct Game {
    config: GameConfig,
    state: Arc<GameState>,
    dispatcher: Arc<Dispatcher>,
    prompts: Arc<dyn PromptBook>,
    memory: Memory,
    transcript: Transcript,
    events: Option<UnboundedSender<GameEvent>>,
    moderator: Option<Arc<dyn Agent>>,
    wolf_channel: Vec<night::ChannelLine>,
}

impl Game {
    /// Seat the players, deal the roles and register one agent per seat.
    ///
    /// Prompts come from the configured language.
    pub fn new(config: GameConfig, agents: HashMap<String, Arc<dyn Agent>>) -> SetupResult<Self> {
        let prompts = config.language.prompt_book();
        Self::with_prompt_book(config, agents, prompts)
    }

    /// Like [`Game::new`] with an explicit prompt book.
    pub fn with_prompt_book(
        config: GameConfig,
        mut agents: HashMap<String, Arc<dyn Agent>>,
        prompts: Arc<dyn PromptBook>,
    ) -> SetupResult<Self> {
        config.validate()?;

        let state = GameState::new();
        let roles = config.deal_roles();
        state.init_players(&config.players, &roles)?;

        let mut dispatcher = Dispatcher::new().with_timeout(config.decision_timeout);
        for player in state.players() {
            let agent = agents
                .remove(&player.name)
                .ok_or_else(|| SetupError::MissingAgent(player.name.clone()))?;
            let instruction = prompts.system_instruction(&player.name, player.role);
            dispatcher.register(&player.name, agent, instruction);
        }

        let game_id = generate_game_id();
        info!(game_id = %game_id, players = config.players.len(), "game created");

        Ok(Self {
            memory: Memory::new(game_id.clone(), config.memory_top_k),
            transcript: Transcript::new(game_id),
            state: Arc::new(state),
            dispatcher: Arc::new(dispatcher),
            prompts,
            config,
            events: None,
            moderator: None,
            wolf_channel: Vec::new(),
        })
    }

    /// Attach a long-term episode store for prompt augmentation.
    pub fn with_store(mut self, store: Arc<dyn EpisodeStore>) -> Self {
        self.memory = Memory::new(self.memory.game_id().to_string(), self.config.memory_top_k).with_store(store);
        self
    }

    /// Send every event to `sink` as well as the transcript.
    pub fn with_events(mut self, sink: UnboundedSender<GameEvent>) -> Self {
        self.events = Some(sink);
        self
    }

    /// The agent consulted for [`SpeakingOrderPolicy::Moderator`].
    pub fn with_moderator(mut self, agent: Arc<dyn Agent>) -> Self {
        self.moderator = Some(agent);
        self
    }

    pub fn game_id(&self) -> &str {
        self.transcript.game_id()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<GameState> {
        &self.state
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Play until a faction wins or the round cap is hit.
    pub async fn run(&mut self) -> GameReport {
        self.start().await;

        for round in 1..=self.config.max_rounds {
            self.state.set_round(round);
            self.emit(GameEvent::RoundStarted(round));
            info!(round, "round started");

            self.run_night().await;
            if let Some(winner) = self.state.check_winner() {
                return self.finish(GameOutcome::Winner(winner), round).await;
            }

            self.run_day().await;
            if let Some(winner) = self.state.check_winner() {
                return self.finish(GameOutcome::Winner(winner), round).await;
            }

            self.state.set_first_night(false);
        }

        self.finish(GameOutcome::MaxRoundsReached, self.config.max_rounds).await
    }

    /// Write the transcript under the configured log directory.
    ///
    /// Failures are logged; the game result never depends on them.
    pub async fn save_transcript(&self) -> Option<PathBuf> {
        match self.transcript.save(&self.config.log_dir).await {
            Ok(dir) => {
                info!(dir = %dir.display(), "transcript saved");
                Some(dir)
            }
            Err(err) => {
                warn!(error = %err, "failed to save transcript");
                None
            }
        }
    }

    async fn start(&mut self) {
        let roster = self.state.roster();
        let game_id = self.game_id().to_string();
        self.emit(GameEvent::GameStarted {
            game_id,
            players: self.state.players(),
        });
        let text = self.prompts.new_game(&roster);
        self.announce(text).await;
    }

    async fn finish(&mut self, outcome: GameOutcome, rounds_played: u32) -> GameReport {
        let roles = self.state.roles_summary();
        let text = match outcome {
            GameOutcome::Winner(Faction::Werewolves) => self.prompts.wolves_win(
                self.state.alive_players().len(),
                self.state.alive_werewolves().len(),
                &roles,
            ),
            GameOutcome::Winner(Faction::Villagers) => self.prompts.village_win(&roles),
            GameOutcome::MaxRoundsReached => self.prompts.max_rounds_reached(rounds_played, &roles),
        };
        self.announce(text).await;

        let survivors = self.state.alive_players();
        info!(%outcome, rounds_played, "game over");
        self.emit(GameEvent::GameOver {
            outcome,
            survivors: survivors.clone(),
            roles,
        });

        self.reflections().await;

        GameReport {
            outcome,
            rounds_played,
            survivors,
            roles: self.state.players(),
        }
    }

    /// Every player, dead or alive, reflects once. Replies only reach the transcript.
    async fn reflections(&mut self) {
        let players = self.state.roster();
        let prompt = self.prompts.reflect();
        let replies = self
            .dispatcher
            .fan_out(&players, move |dispatcher, player| {
                let prompt = prompt.clone();
                async move { dispatcher.speak(&player, &prompt).await }
            })
            .await;

        for (player, text) in replies {
            let (Some(text), Some(role)) = (text, self.state.player_role(&player)) else {
                continue;
            };
            self.emit(GameEvent::Reflection { player, role, text });
        }
    }

    /// Record an event and forward it to the sink, if any.
    fn emit(&mut self, event: GameEvent) {
        self.transcript.record(&event);
        if let Some(sink) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = sink.send(event);
        }
    }

    /// Broadcast a moderator message to every seat.
    async fn announce(&mut self, text: String) {
        let roster = self.state.roster();
        self.dispatcher.broadcast(&roster, &text).await;
        self.emit(GameEvent::Announcement(text));
    }

    /// Broadcast `text` to every living player except `speaker`.
    async fn relay(&self, speaker: &str, text: &str) {
        let listeners: Vec<String> = self
            .state
            .alive_players()
            .into_iter()
            .filter(|p| p != speaker)
            .collect();
        self.dispatcher.broadcast(&listeners, &format!("{speaker}: {text}")).await;
    }

    fn reject(&mut self, player: &str, action: &'static str, err: ActionError) {
        warn!(player, action, error = %err, "action rejected");
        self.emit(GameEvent::ActionRejected {
            player: player.to_string(),
            action,
            reason: err.to_string(),
        });
    }

    /// Remember an episode in the current round and phase.
    async fn remember(&mut self, kind: EpisodeKind, actor: &str, target: Option<&str>, content: impl Into<String>) {
        let mut episode = self
            .memory
            .episode(self.state.round(), self.state.phase(), kind, actor, content);
        if let Some(target) = target {
            episode = episode.with_target(target);
        }
        self.memory.record(episode).await;
    }

    /// Give `player` a last statement, heard by everyone still alive.
    async fn last_words(&mut self, player: &str) {
        let prompt = self.prompts.last_words(player);
        let Some(text) = self.dispatcher.speak(player, &prompt).await else {
            return;
        };
        self.relay(player, &text).await;
        self.remember(EpisodeKind::LastWords, player, None, text.clone()).await;
        self.emit(GameEvent::LastWords {
            player: player.to_string(),
            text,
        });
    }

    /// Ask the hunter for a parting shot. Returns the validated target.
    async fn hunter_shoots(&mut self, hunter: &str) -> Option<String> {
        let candidates: Vec<String> = self
            .state
            .alive_players()
            .into_iter()
            .filter(|p| p != hunter)
            .collect();
        let prompt = self.prompts.hunter_shoot(hunter);
        let decision = self
            .dispatcher
            .decide_as::<Shoot>(hunter, &prompt, &candidates)
            .await?;
        if !decision.shoot {
            info!(hunter, "hunter holds fire");
            return None;
        }

        match actions::validate_shot(&self.state, hunter, decision.target.as_deref()) {
            Ok(target) => {
                self.remember(EpisodeKind::HunterShoot, hunter, Some(&target), format!("{hunter} shot {target}"))
                    .await;
                self.emit(GameEvent::HunterShot {
                    hunter: hunter.to_string(),
                    target: target.clone(),
                });
                Some(target)
            }
            Err(err) => {
                self.reject(hunter, "shoot", err);
                None
            }
        }
    }

    /// Who speaks when during today's discussion.
    async fn speaking_order(&self, last_dead: &[String]) -> Vec<String> {
        let alive = self.state.alive_players();
        if alive.is_empty() {
            return alive;
        }
        let rotating_start = (self.state.round().saturating_sub(1) as usize) % alive.len();

        match self.config.speaking_order {
            SpeakingOrderPolicy::RosterOrder => alive,
            SpeakingOrderPolicy::Rotating => rotate_order(&alive, rotating_start, false),
            SpeakingOrderPolicy::Moderator => {
                let Some(moderator) = &self.moderator else {
                    warn!("moderated speaking order requested without a moderator agent");
                    return rotate_order(&alive, rotating_start, false);
                };
                let history = [
                    Message::system(self.prompts.moderator_instruction()),
                    Message::moderator(self.prompts.speaking_order_request(&alive, self.state.round(), last_dead)),
                ];
                let reply = match moderator.respond(&history, Some(&SpeakingOrder::spec())).await {
                    Ok(reply) => reply,
                    Err(err) => {
                        warn!(error = %err, "moderator failed to pick a speaking order");
                        return alive;
                    }
                };
                match interpret::<SpeakingOrder>(&reply, &alive) {
                    Some(order) => match alive.iter().position(|p| *p == order.start) {
                        Some(start) => rotate_order(&alive, start, order.is_counterclockwise()),
                        None => {
                            warn!(start = %order.start, "moderator picked an invalid first speaker");
                            rotate_order(&alive, rotating_start, false)
                        }
                    },
                    None => {
                        warn!("moderator reply was not a speaking order");
                        alive
                    }
                }
            }
        }
    }
}

/// Seat order starting at `start`, walking clockwise (up the roster) or counterclockwise.
pub fn rotate_order(players: &[String], start: usize, counterclockwise: bool) -> Vec<String> {
    let n = players.len();
    if n == 0 {
        return Vec::new();
    }
    let start = start % n;
    (0..n)
        .map(|step| {
            let idx = if counterclockwise {
                (start + n - step) % n
            } else {
                (start + step) % n
            };
            players[idx].clone()
        })
        .collect()
}

/// Dedupe while keeping first-seen order.
fn unique(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("P{i}")).collect()
    }

    #[test]
    fn test_rotate_order() {
        let players = seats(4);
        assert_eq!(rotate_order(&players, 0, false), vec!["P1", "P2", "P3", "P4"]);
        assert_eq!(rotate_order(&players, 2, false), vec!["P3", "P4", "P1", "P2"]);
        assert_eq!(rotate_order(&players, 2, true), vec!["P3", "P2", "P1", "P4"]);
        assert_eq!(rotate_order(&players, 6, false), vec!["P3", "P4", "P1", "P2"]);
        assert!(rotate_order(&[], 3, true).is_empty());
    }

    #[test]
    fn test_unique_keeps_order() {
        let names = ["B", "A", "B", "C"].map(String::from);
        assert_eq!(unique(names), vec!["B", "A", "C"]);
    }
}
