//! Testing utilities for the werewolf engine.
//!
//! - `ScriptedAgent` answers from a script and records what it was shown
//! - `TestTable` seats nine scripted players with fixed roles
//! - reply builders for every decision tool

use crate::config::{GameConfig, SpeakingOrderPolicy};
use crate::decision::Reply;
use crate::dispatch::Agent;
use crate::error::{AgentError, SetupResult};
use crate::message::Message;
use crate::moderator::Game;
use crate::state::Role;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Script key for free speech (no decision tool).
pub const SPEECH: &str = "speech";

/// Answer when nothing is scripted. Reads as no decision for every tool.
pub const PASS: &str = "I pass.";

/// One recorded call.
#[derive(Debug, Clone)]
pub struct Call {
    /// Decision tool name, or `None` for free speech.
    pub tool: Option<String>,
    /// The prompt: last entry of the history.
    pub prompt: String,
    pub history: Vec<Message>,
}

/// A deterministic agent.
///
/// Replies are looked up by tool name (or [`SPEECH`]): queued replies are
/// used once in order, then the standing reply, then [`PASS`].
#[derive(Default)]
pub struct ScriptedAgent {
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    standing: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<Call>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `reply` once for the next call with this tool.
    pub fn queue(&self, tool: &str, reply: Reply) -> &Self {
        lock(&self.queued).entry(tool.to_string()).or_default().push_back(reply);
        self
    }

    /// Use `reply` for this tool whenever nothing is queued.
    pub fn always(&self, tool: &str, reply: Reply) -> &Self {
        lock(&self.standing).insert(tool.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Calls made with a tool, or with [`SPEECH`] for free speech.
    pub fn calls_for(&self, tool: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.tool.as_deref().unwrap_or(SPEECH) == tool)
            .collect()
    }

    /// Whether any prompt or history entry shown to this agent contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        lock(&self.calls)
            .iter()
            .any(|c| c.prompt.contains(needle) || c.history.iter().any(|m| m.content.contains(needle)))
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn respond(&self, history: &[Message], tool: Option<&crate::decision::ToolSpec>) -> Result<Reply, AgentError> {
        let key = tool.map_or(SPEECH, |t| t.name.as_str());
        lock(&self.calls).push(Call {
            tool: tool.map(|t| t.name.clone()),
            prompt: history.last().map(|m| m.content.clone()).unwrap_or_default(),
            history: history.to_vec(),
        });

        let queued = lock(&self.queued).get_mut(key).and_then(VecDeque::pop_front);
        let reply = queued
            .or_else(|| lock(&self.standing).get(key).cloned())
            .unwrap_or_else(|| Reply::text(PASS));
        Ok(reply)
    }
}

/// Seat roles of a [`TestTable`], in order Player1..Player9.
pub const TABLE_ROLES: [Role; 9] = [
    Role::Villager,
    Role::Werewolf,
    Role::Werewolf,
    Role::Werewolf,
    Role::Seer,
    Role::Witch,
    Role::Hunter,
    Role::Villager,
    Role::Villager,
];

/// Nine scripted players with fixed roles:
/// Player1 villager, Player2-4 werewolves, Player5 seer, Player6 witch,
/// Player7 hunter, Player8-9 villagers.
pub struct TestTable {
    config: GameConfig,
    agents: BTreeMap<String, Arc<ScriptedAgent>>,
}

impl Default for TestTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTable {
    pub fn new() -> Self {
        let config = GameConfig::standard()
            .with_roles(TABLE_ROLES.to_vec())
            .without_shuffle()
            .with_speaking_order(SpeakingOrderPolicy::RosterOrder);
        let agents = config
            .players
            .iter()
            .map(|name| (name.clone(), Arc::new(ScriptedAgent::new())))
            .collect();
        Self { config, agents }
    }

    /// Adjust the configuration. Players and roles should stay as they are.
    pub fn configure(mut self, f: impl FnOnce(GameConfig) -> GameConfig) -> Self {
        self.config = f(self.config);
        self
    }

    /// The scripted agent sitting in `name`'s seat.
    ///
    /// # Panics
    ///
    /// If nobody sits there.
    pub fn agent(&self, name: &str) -> &ScriptedAgent {
        match self.agents.get(name) {
            Some(agent) => agent,
            None => panic!("no seat named {name}"),
        }
    }

    /// Living werewolves Player2-4.
    pub fn wolves(&self) -> [&ScriptedAgent; 3] {
        [self.agent("Player2"), self.agent("Player3"), self.agent("Player4")]
    }

    pub fn build(&self) -> SetupResult<Game> {
        let agents: HashMap<String, Arc<dyn Agent>> = self
            .agents
            .iter()
            .map(|(name, agent)| (name.clone(), Arc::clone(agent) as Arc<dyn Agent>))
            .collect();
        Game::new(self.config.clone(), agents)
    }
}

/// `vote {target}`
pub fn vote_for(target: &str) -> Reply {
    Reply::structured(json!({ "target": target }))
}

/// `save {save}`
pub fn save(save: bool) -> Reply {
    Reply::structured(json!({ "save": save }))
}

/// `poison {poison, target}`
pub fn poison(target: Option<&str>) -> Reply {
    Reply::structured(json!({ "poison": target.is_some(), "target": target }))
}

/// `check_identity {target}`
pub fn check(target: &str) -> Reply {
    Reply::structured(json!({ "target": target }))
}

/// `shoot {shoot, target}`
pub fn shoot(target: Option<&str>) -> Reply {
    Reply::structured(json!({ "shoot": target.is_some(), "target": target }))
}

/// `discuss {message, reach_agreement}`
pub fn discuss(message: &str, agree: bool) -> Reply {
    Reply::structured(json!({ "message": message, "reach_agreement": agree }))
}

/// Free speech.
pub fn say(text: &str) -> Reply {
    Reply::text(text)
}
