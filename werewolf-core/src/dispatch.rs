//! Agent dispatch.
//!
//! The [`Dispatcher`] owns one [`Agent`] and one message history per player.
//! A call appends the prompt to the player's history, hands the agent a
//! snapshot, and appends the reply once it arrives. The history lock is never
//! held while an agent is thinking, so calls for different players run in
//! parallel.
//!
//! Failures never leave this module as anything stronger than `None`: the
//! moderator treats a timeout, an agent error, an empty answer or a panic as
//! the player declining to act.

use crate::decision::{interpret, Decision, Reply, ToolSpec};
use crate::error::{AgentError, DispatchError};
use crate::message::Message;
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

/// Something that can play a seat: an LLM, a human at a terminal, a script.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Answer the last message in `history`.
    ///
    /// When `tool` is given the caller wants a structured decision matching
    /// its schema; free text is still accepted.
    async fn respond(&self, history: &[Message], tool: Option<&ToolSpec>) -> Result<Reply, AgentError>;
}

/// Routes prompts to players and records what they see.
pub struct Dispatcher {
    agents: HashMap<String, Arc<dyn Agent>>,
    histories: RwLock<HashMap<String, Vec<Message>>>,
    timeout: Option<Duration>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
            histories: RwLock::new(HashMap::new()),
            timeout: None,
        }
    }

    /// Bound every agent call. Unbounded by default.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Seat an agent. `instruction` becomes the first history entry.
    pub fn register(&mut self, player: impl Into<String>, agent: Arc<dyn Agent>, instruction: impl Into<String>) {
        let player = player.into();
        self.histories
            .get_mut()
            .insert(player.clone(), vec![Message::system(instruction)]);
        self.agents.insert(player, agent);
    }

    pub fn has_agent(&self, player: &str) -> bool {
        self.agents.contains_key(player)
    }

    /// Copy of a player's history.
    pub async fn history(&self, player: &str) -> Vec<Message> {
        self.histories
            .read()
            .await
            .get(player)
            .cloned()
            .unwrap_or_default()
    }

    /// Append a moderator message to one player's history.
    pub async fn tell(&self, player: &str, message: &str) {
        self.histories
            .write()
            .await
            .entry(player.to_string())
            .or_default()
            .push(Message::moderator(message));
    }

    /// Append a moderator message to several histories under one lock.
    pub async fn broadcast(&self, players: &[String], message: &str) {
        let mut histories = self.histories.write().await;
        for player in players {
            histories
                .entry(player.clone())
                .or_default()
                .push(Message::moderator(message));
        }
    }

    /// Send a prompt and wait for the raw reply.
    pub async fn decide(&self, player: &str, prompt: &str, tool: Option<&ToolSpec>) -> Result<Reply, DispatchError> {
        let agent = self
            .agents
            .get(player)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownPlayer(player.to_string()))?;

        let snapshot = {
            let mut histories = self.histories.write().await;
            let history = histories.entry(player.to_string()).or_default();
            history.push(Message::moderator(prompt));
            history.clone()
        };

        let call = agent.respond(&snapshot, tool);
        let result = match self.timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| DispatchError::Timeout {
                    player: player.to_string(),
                    after,
                })?,
            None => call.await,
        };
        let reply = result.map_err(|source| DispatchError::Agent {
            player: player.to_string(),
            source,
        })?;

        if reply.is_empty() {
            return Err(DispatchError::EmptyResponse(player.to_string()));
        }

        self.histories
            .write()
            .await
            .entry(player.to_string())
            .or_default()
            .push(Message::player(reply.as_history_text()));
        Ok(reply)
    }

    /// Ask for a typed decision. `None` means the player took no action.
    pub async fn decide_as<D: Decision>(&self, player: &str, prompt: &str, candidates: &[String]) -> Option<D> {
        let spec = D::spec();
        match self.decide(player, prompt, Some(&spec)).await {
            Ok(reply) => {
                let decision = interpret::<D>(&reply, candidates);
                if decision.is_none() {
                    tracing::debug!(player, tool = D::tool_name(), "reply could not be read as a decision");
                }
                decision
            }
            Err(err) => {
                tracing::warn!(player, tool = D::tool_name(), error = %err, "no decision");
                None
            }
        }
    }

    /// Ask for free speech.
    pub async fn speak(&self, player: &str, prompt: &str) -> Option<String> {
        match self.decide(player, prompt, None).await {
            Ok(reply) => reply.speech(),
            Err(err) => {
                tracing::warn!(player, error = %err, "no speech");
                None
            }
        }
    }

    /// Run one call per player concurrently and wait for all of them.
    ///
    /// Results come back in the order of `players`. A panicking call is
    /// reported and counted as `None`.
    pub async fn fan_out<T, F, Fut>(self: &Arc<Self>, players: &[String], call: F) -> Vec<(String, Option<T>)>
    where
        T: Send + 'static,
        F: Fn(Arc<Self>, String) -> Fut,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        for player in players {
            let name = player.clone();
            let fut = call(Arc::clone(self), player.clone());
            tasks.spawn(async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(result) => (name, result),
                    Err(_) => {
                        let err = DispatchError::Panicked(name.clone());
                        tracing::warn!(player = %name, error = %err, "agent task failed");
                        (name, None)
                    }
                }
            });
        }

        let mut results: HashMap<String, Option<T>> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, result)) => {
                    results.insert(name, result);
                }
                Err(err) => tracing::warn!(error = %err, "agent task was cancelled"),
            }
        }

        players
            .iter()
            .map(|p| (p.clone(), results.remove(p).flatten()))
            .collect()
    }

    /// Concurrent typed decisions with the same prompt for everyone.
    pub async fn fan_out_decisions<D: Decision>(
        self: &Arc<Self>,
        players: &[String],
        prompt: &str,
        candidates: &[String],
    ) -> Vec<(String, Option<D>)> {
        let prompt = prompt.to_string();
        let candidates = candidates.to_vec();
        self.fan_out(players, move |dispatcher, player| {
            let prompt = prompt.clone();
            let candidates = candidates.clone();
            async move { dispatcher.decide_as::<D>(&player, &prompt, &candidates).await }
        })
        .await
    }
}
