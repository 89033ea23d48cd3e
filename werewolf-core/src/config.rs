//! Game configuration.

use crate::error::{SetupError, SetupResult};
use crate::prompts::{ChinesePrompts, EnglishPrompts, PromptBook};
use crate::state::Role;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Language of everything players and the transcript see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Chinese,
}

impl Language {
    /// Parse a `GAME_LANG` value. Anything other than Chinese is English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "cn" | "chinese" => Language::Chinese,
            _ => Language::English,
        }
    }

    pub fn prompt_book(self) -> Arc<dyn PromptBook> {
        match self {
            Language::English => Arc::new(EnglishPrompts),
            Language::Chinese => Arc::new(ChinesePrompts),
        }
    }
}

/// How the day's speaking order is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeakingOrderPolicy {
    /// Seat order every day.
    RosterOrder,
    /// Seat order, starting one seat later each round.
    #[default]
    Rotating,
    /// Ask the moderator agent; falls back to `Rotating` without one.
    Moderator,
}

/// Configuration for one game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Seat names in order.
    pub players: Vec<String>,

    /// Role deck, one card per seat.
    pub roles: Vec<Role>,

    /// Shuffle the deck before seating. Disable for fixed test tables.
    pub shuffle: bool,

    /// Seed for the shuffle.
    pub seed: Option<u64>,

    pub max_rounds: u32,

    /// Werewolf discussion passes per night. Each pass gives every living
    /// werewolf one turn.
    pub max_discussion_rounds: u32,

    pub language: Language,

    /// Seat controlled from the terminal.
    pub human_player: Option<String>,

    /// Upper bound on a single agent call.
    pub decision_timeout: Option<Duration>,

    pub speaking_order: SpeakingOrderPolicy,

    /// Episodes retrieved per prompt when a memory store is attached.
    pub memory_top_k: usize,

    /// Directory for saved transcripts.
    pub log_dir: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl GameConfig {
    pub fn new() -> Self {
        Self::standard()
    }

    /// Nine players: three werewolves, three villagers, seer, witch and hunter.
    pub fn standard() -> Self {
        Self {
            players: (1..=9).map(|i| format!("Player{i}")).collect(),
            roles: standard_roles(),
            shuffle: true,
            seed: None,
            max_rounds: 10,
            max_discussion_rounds: 2,
            language: Language::English,
            human_player: None,
            decision_timeout: None,
            speaking_order: SpeakingOrderPolicy::Rotating,
            memory_top_k: 5,
            log_dir: PathBuf::from("logs"),
        }
    }

    /// Standard table with overrides from the environment.
    ///
    /// Reads `GAME_LANG`, `WEREWOLF_MAX_ROUNDS`, `WEREWOLF_SEED` and
    /// `WEREWOLF_LOG_DIR`.
    pub fn from_env() -> SetupResult<Self> {
        let mut config = Self::standard();
        if let Ok(lang) = std::env::var("GAME_LANG") {
            config.language = Language::from_code(&lang);
        }
        if let Ok(rounds) = std::env::var("WEREWOLF_MAX_ROUNDS") {
            config.max_rounds = rounds
                .parse()
                .map_err(|_| SetupError::Config(format!("WEREWOLF_MAX_ROUNDS is not a number: {rounds}")))?;
        }
        if let Ok(seed) = std::env::var("WEREWOLF_SEED") {
            config.seed = Some(
                seed.parse()
                    .map_err(|_| SetupError::Config(format!("WEREWOLF_SEED is not a number: {seed}")))?,
            );
        }
        if let Ok(dir) = std::env::var("WEREWOLF_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn with_players(mut self, players: Vec<String>) -> Self {
        self.players = players;
        self
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }

    /// Seat roles in the order given.
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_max_discussion_rounds(mut self, rounds: u32) -> Self {
        self.max_discussion_rounds = rounds;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_human_player(mut self, name: impl Into<String>) -> Self {
        self.human_player = Some(name.into());
        self
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = Some(timeout);
        self
    }

    pub fn with_speaking_order(mut self, policy: SpeakingOrderPolicy) -> Self {
        self.speaking_order = policy;
        self
    }

    pub fn with_memory_top_k(mut self, top_k: usize) -> Self {
        self.memory_top_k = top_k;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Check everything that can be checked before seating anyone.
    pub fn validate(&self) -> SetupResult<()> {
        if self.players.is_empty() {
            return Err(SetupError::EmptyRoster);
        }
        if self.players.len() != self.roles.len() {
            return Err(SetupError::RoleCountMismatch {
                players: self.players.len(),
                roles: self.roles.len(),
            });
        }
        if let Some(human) = &self.human_player {
            if !self.players.contains(human) {
                return Err(SetupError::UnknownHumanPlayer {
                    name: human.clone(),
                    valid: self.players.join(", "),
                });
            }
        }
        if self.max_rounds == 0 {
            return Err(SetupError::Config("max_rounds must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The role deck in seating order, shuffled unless disabled.
    pub fn deal_roles(&self) -> Vec<Role> {
        let mut roles = self.roles.clone();
        if self.shuffle {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            roles.shuffle(&mut rng);
        }
        roles
    }
}

/// 3 werewolves, 3 villagers, seer, witch, hunter.
pub fn standard_roles() -> Vec<Role> {
    vec![
        Role::Werewolf,
        Role::Werewolf,
        Role::Werewolf,
        Role::Villager,
        Role::Villager,
        Role::Villager,
        Role::Seer,
        Role::Witch,
        Role::Hunter,
    ]
}
