//! Shared game state.
//!
//! `GameState` is the single mutable record of a game: who is seated, who is
//! alive, what happened tonight and which potions are left. Every method takes
//! `&self`; the data sits behind a reader-writer lock so concurrent agent tasks
//! can read while the moderator remains the only writer.

use crate::error::{SetupError, SetupResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A player's secret role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Werewolf,
    Villager,
    Seer,
    Witch,
    Hunter,
}

impl Role {
    /// The team this role plays for.
    pub fn faction(self) -> Faction {
        match self {
            Role::Werewolf => Faction::Werewolves,
            _ => Faction::Villagers,
        }
    }

    pub fn is_werewolf(self) -> bool {
        self == Role::Werewolf
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Werewolf => "werewolf",
            Role::Villager => "villager",
            Role::Seer => "seer",
            Role::Witch => "witch",
            Role::Hunter => "hunter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two competing teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Werewolves,
    /// Villagers, seer, witch and hunter.
    Villagers,
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Werewolves => f.write_str("werewolves"),
            Faction::Villagers => f.write_str("villagers"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Night,
    Day,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Night => f.write_str("night"),
            Phase::Day => f.write_str("day"),
        }
    }
}

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub role: Role,
    pub alive: bool,
}

#[derive(Debug)]
struct Inner {
    players: HashMap<String, Player>,
    roster: Vec<String>,
    seer: Option<String>,
    witch: Option<String>,
    hunter: Option<String>,
    heal_available: bool,
    poison_available: bool,
    night_killed: Option<String>,
    night_saved: bool,
    night_poisoned: Option<String>,
    night_shot: Option<String>,
    round: u32,
    phase: Phase,
    first_night: bool,
}

/// Concurrency-safe game record.
#[derive(Debug)]
pub struct GameState {
    inner: RwLock<Inner>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Create an empty state with both potions available.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                players: HashMap::new(),
                roster: Vec::new(),
                seer: None,
                witch: None,
                hunter: None,
                heal_available: true,
                poison_available: true,
                night_killed: None,
                night_saved: false,
                night_poisoned: None,
                night_shot: None,
                round: 1,
                phase: Phase::Night,
                first_night: true,
            }),
        }
    }

    // A panicking reader never leaves the data half-written, so a poisoned
    // lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seat the players with their (already shuffled) roles.
    ///
    /// Can only be called once. If the deck holds more than one seer, witch or
    /// hunter, the first in roster order holds the role's night action.
    pub fn init_players(&self, names: &[String], roles: &[Role]) -> SetupResult<()> {
        if names.is_empty() {
            return Err(SetupError::EmptyRoster);
        }
        if names.len() != roles.len() {
            return Err(SetupError::RoleCountMismatch {
                players: names.len(),
                roles: roles.len(),
            });
        }
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(SetupError::DuplicateName(name.clone()));
            }
        }

        let mut inner = self.write();
        if !inner.roster.is_empty() {
            return Err(SetupError::AlreadyInitialized);
        }

        for (name, &role) in names.iter().zip(roles) {
            let holder = match role {
                Role::Seer => Some(&mut inner.seer),
                Role::Witch => Some(&mut inner.witch),
                Role::Hunter => Some(&mut inner.hunter),
                Role::Werewolf | Role::Villager => None,
            };
            if let Some(slot) = holder {
                slot.get_or_insert_with(|| name.clone());
            }
            inner.players.insert(
                name.clone(),
                Player {
                    name: name.clone(),
                    role,
                    alive: true,
                },
            );
        }
        inner.roster = names.to_vec();
        Ok(())
    }

    /// Every seated name in original seat order, dead or alive.
    pub fn roster(&self) -> Vec<String> {
        self.read().roster.clone()
    }

    /// Living players in seat order.
    pub fn alive_players(&self) -> Vec<String> {
        let inner = self.read();
        inner
            .roster
            .iter()
            .filter(|name| inner.players.get(*name).is_some_and(|p| p.alive))
            .cloned()
            .collect()
    }

    /// Living werewolves in seat order.
    pub fn alive_werewolves(&self) -> Vec<String> {
        self.alive_matching(|role| role.is_werewolf())
    }

    /// Living members of the village faction in seat order.
    pub fn alive_villagers(&self) -> Vec<String> {
        self.alive_matching(|role| !role.is_werewolf())
    }

    fn alive_matching(&self, pred: impl Fn(Role) -> bool) -> Vec<String> {
        let inner = self.read();
        inner
            .roster
            .iter()
            .filter_map(|name| inner.players.get(name))
            .filter(|p| p.alive && pred(p.role))
            .map(|p| p.name.clone())
            .collect()
    }

    /// False for dead and unknown players.
    pub fn is_alive(&self, name: &str) -> bool {
        self.read().players.get(name).is_some_and(|p| p.alive)
    }

    /// `None` for names that are not seated.
    pub fn player_role(&self, name: &str) -> Option<Role> {
        self.read().players.get(name).map(|p| p.role)
    }

    pub fn is_player(&self, name: &str) -> bool {
        self.read().players.contains_key(name)
    }

    /// Snapshot of every player in seat order.
    pub fn players(&self) -> Vec<Player> {
        let inner = self.read();
        inner
            .roster
            .iter()
            .filter_map(|name| inner.players.get(name).cloned())
            .collect()
    }

    /// Mark a player dead. Returns false if they were already dead or unknown.
    pub fn kill_player(&self, name: &str) -> bool {
        let mut inner = self.write();
        match inner.players.get_mut(name) {
            Some(player) if player.alive => {
                player.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Clear tonight's kill, save, poison and shot. Potions are untouched.
    pub fn reset_night_state(&self) {
        let mut inner = self.write();
        inner.night_killed = None;
        inner.night_saved = false;
        inner.night_poisoned = None;
        inner.night_shot = None;
    }

    pub fn set_night_killed(&self, target: Option<String>) {
        self.write().night_killed = target.filter(|t| !t.is_empty());
    }

    /// Saving consumes the healing potion for the rest of the game.
    pub fn set_night_saved(&self, saved: bool) {
        let mut inner = self.write();
        inner.night_saved = saved;
        if saved {
            inner.heal_available = false;
        }
    }

    /// Poisoning someone consumes the poison potion for the rest of the game.
    pub fn set_night_poisoned(&self, target: Option<String>) {
        let mut inner = self.write();
        inner.night_poisoned = target.filter(|t| !t.is_empty());
        if inner.night_poisoned.is_some() {
            inner.poison_available = false;
        }
    }

    pub fn set_night_shot(&self, target: Option<String>) {
        self.write().night_shot = target.filter(|t| !t.is_empty());
    }

    pub fn night_killed(&self) -> Option<String> {
        self.read().night_killed.clone()
    }

    pub fn night_saved(&self) -> bool {
        self.read().night_saved
    }

    pub fn night_poisoned(&self) -> Option<String> {
        self.read().night_poisoned.clone()
    }

    pub fn night_shot(&self) -> Option<String> {
        self.read().night_shot.clone()
    }

    pub fn can_use_healing_potion(&self) -> bool {
        self.read().heal_available
    }

    pub fn can_use_poison_potion(&self) -> bool {
        self.read().poison_available
    }

    pub fn seer(&self) -> Option<String> {
        self.read().seer.clone()
    }

    pub fn witch(&self) -> Option<String> {
        self.read().witch.clone()
    }

    pub fn hunter(&self) -> Option<String> {
        self.read().hunter.clone()
    }

    pub fn round(&self) -> u32 {
        self.read().round
    }

    pub fn set_round(&self, round: u32) {
        self.write().round = round;
    }

    pub fn phase(&self) -> Phase {
        self.read().phase
    }

    pub fn set_phase(&self, phase: Phase) {
        self.write().phase = phase;
    }

    /// True until the first day has finished.
    pub fn is_first_night(&self) -> bool {
        self.read().first_night
    }

    pub fn set_first_night(&self, first: bool) {
        self.write().first_night = first;
    }

    /// Evaluate the win condition without touching state.
    ///
    /// Werewolves need parity, not a majority: they win as soon as living
    /// werewolves are at least as many as everyone else. The village wins once
    /// no werewolf is alive.
    pub fn check_winner(&self) -> Option<Faction> {
        let inner = self.read();
        let (wolves, others) = inner
            .players
            .values()
            .filter(|p| p.alive)
            .fold((0usize, 0usize), |(w, o), p| {
                if p.role.is_werewolf() {
                    (w + 1, o)
                } else {
                    (w, o + 1)
                }
            });

        if wolves == 0 {
            Some(Faction::Villagers)
        } else if wolves >= others {
            Some(Faction::Werewolves)
        } else {
            None
        }
    }

    /// "Player1(werewolf), Player2(seer), ..." in seat order.
    pub fn roles_summary(&self) -> String {
        self.players()
            .iter()
            .map(|p| format!("{}({})", p.name, p.role))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
