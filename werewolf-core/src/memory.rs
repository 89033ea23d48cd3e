//! Game memory.
//!
//! Every notable event becomes an [`Episode`]. Episodes go to a bounded
//! [`ShortTermMemory`] and, when one is attached, to a long-lived
//! [`EpisodeStore`]. Before a day speech or vote, the player's prompt is
//! augmented with what they can legitimately remember: this round's public
//! events, who has been accusing them, and relevant older episodes.

use crate::decision::contains_word;
use crate::error::MemoryError;
use crate::prompts::PromptBook;
use crate::state::Phase;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default short-term capacity.
pub const DEFAULT_SHORT_TERM_SIZE: usize = 100;

/// Speeches included in an augmented prompt.
const MAX_PROMPT_SPEECHES: usize = 3;

/// Words that turn a mention of a player into an accusation.
const SUSPICION_KEYWORDS: &[&str] = &[
    "suspect",
    "suspicious",
    "werewolf",
    "wolf",
    "vote",
    "eliminate",
    "lying",
    "liar",
    "怀疑",
    "可疑",
    "狼人",
    "是狼",
    "投票",
    "出局",
    "查杀",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeKind {
    Speech,
    Vote,
    Kill,
    Save,
    Poison,
    Check,
    Death,
    Accusation,
    LastWords,
    HunterShoot,
}

impl EpisodeKind {
    /// Whether every player witnessed this kind of event.
    pub fn is_public(self) -> bool {
        !matches!(
            self,
            EpisodeKind::Kill | EpisodeKind::Save | EpisodeKind::Poison | EpisodeKind::Check
        )
    }

    fn is_key_event(self) -> bool {
        matches!(
            self,
            EpisodeKind::Check
                | EpisodeKind::Death
                | EpisodeKind::Save
                | EpisodeKind::Poison
                | EpisodeKind::Kill
                | EpisodeKind::HunterShoot
                | EpisodeKind::LastWords
        )
    }
}

/// One remembered event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub game_id: String,
    pub round: u32,
    pub phase: Phase,
    pub kind: EpisodeKind,
    pub actor: String,
    pub target: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Episode {
    pub fn new(
        game_id: impl Into<String>,
        round: u32,
        phase: Phase,
        kind: EpisodeKind,
        actor: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id: game_id.into(),
            round,
            phase,
            kind,
            actor: actor.into(),
            target: None,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Public episodes are visible to everyone; private ones only to their actor.
    pub fn visible_to(&self, player: &str) -> bool {
        self.kind.is_public() || self.actor == player
    }

    fn dedup_key(&self) -> (EpisodeKind, String, String) {
        (self.kind, self.actor.clone(), self.content.clone())
    }
}

/// Filters for long-term retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveConfig {
    pub top_k: usize,
    pub game_id: Option<String>,
    /// Ignore episodes from later rounds.
    pub max_round: Option<u32>,
}

impl Default for RetrieveConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            game_id: None,
            max_round: None,
        }
    }
}

/// Long-lived episode storage.
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    async fn store(&self, episode: Episode) -> Result<(), MemoryError>;

    /// Episodes most relevant to `query`, best first.
    async fn retrieve_relevant(&self, query: &str, config: &RetrieveConfig) -> Result<Vec<Episode>, MemoryError>;
}

/// In-process store ranking episodes by word overlap with the query.
#[derive(Debug, Default)]
pub struct KeywordEpisodeStore {
    episodes: RwLock<Vec<Episode>>,
}

impl KeywordEpisodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.episodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.episodes.read().await.is_empty()
    }
}

/// Lowercased words; CJK characters count as one word each.
fn tokens(text: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    let mut word = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            word.push(c.to_ascii_lowercase());
        } else {
            if !word.is_empty() {
                out.insert(std::mem::take(&mut word));
            }
            if c.is_alphanumeric() {
                out.insert(c.to_string());
            }
        }
    }
    if !word.is_empty() {
        out.insert(word);
    }
    out
}

fn relevance(query: &HashSet<String>, episode: &Episode) -> usize {
    let mut text = format!("{} {}", episode.actor, episode.content);
    if let Some(target) = &episode.target {
        text.push(' ');
        text.push_str(target);
    }
    tokens(&text).intersection(query).count()
}

#[async_trait]
impl EpisodeStore for KeywordEpisodeStore {
    async fn store(&self, episode: Episode) -> Result<(), MemoryError> {
        self.episodes.write().await.push(episode);
        Ok(())
    }

    async fn retrieve_relevant(&self, query: &str, config: &RetrieveConfig) -> Result<Vec<Episode>, MemoryError> {
        let query = tokens(query);
        let episodes = self.episodes.read().await;
        let mut scored: Vec<(usize, &Episode)> = episodes
            .iter()
            .filter(|ep| config.game_id.as_ref().map_or(true, |id| &ep.game_id == id))
            .filter(|ep| config.max_round.map_or(true, |max| ep.round <= max))
            .map(|ep| (relevance(&query, ep), ep))
            .filter(|(score, _)| *score > 0)
            .collect();
        // Best score first, then most recent.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.timestamp.cmp(&a.1.timestamp)));
        Ok(scored
            .into_iter()
            .take(config.top_k)
            .map(|(_, ep)| ep.clone())
            .collect())
    }
}

/// Recent episodes plus who has accused whom.
#[derive(Debug, Clone)]
pub struct ShortTermMemory {
    episodes: VecDeque<Episode>,
    max_size: usize,
    /// accused → accusers, in accusation order
    accusations: HashMap<String, Vec<String>>,
}

impl Default for ShortTermMemory {
    fn default() -> Self {
        Self::new(DEFAULT_SHORT_TERM_SIZE)
    }
}

impl ShortTermMemory {
    /// A zero size falls back to the default.
    pub fn new(max_size: usize) -> Self {
        let max_size = if max_size == 0 {
            DEFAULT_SHORT_TERM_SIZE
        } else {
            max_size
        };
        Self {
            episodes: VecDeque::with_capacity(max_size),
            max_size,
            accusations: HashMap::new(),
        }
    }

    /// Add an episode, evicting the oldest once full.
    pub fn add(&mut self, episode: Episode) {
        if episode.kind == EpisodeKind::Accusation {
            if let Some(target) = &episode.target {
                let accusers = self.accusations.entry(target.clone()).or_default();
                if !accusers.contains(&episode.actor) {
                    accusers.push(episode.actor.clone());
                }
            }
        }
        self.episodes.push_back(episode);
        while self.episodes.len() > self.max_size {
            self.episodes.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Last `n` episodes, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Episode> {
        let skip = self.episodes.len().saturating_sub(n);
        self.episodes.iter().skip(skip).cloned().collect()
    }

    pub fn by_round(&self, round: u32) -> Vec<Episode> {
        self.episodes
            .iter()
            .filter(|ep| ep.round == round)
            .cloned()
            .collect()
    }

    /// Episodes where the player acted or was targeted.
    pub fn by_player(&self, player: &str) -> Vec<Episode> {
        self.episodes
            .iter()
            .filter(|ep| ep.actor == player || ep.target.as_deref() == Some(player))
            .cloned()
            .collect()
    }

    pub fn accusers_of(&self, player: &str) -> Vec<String> {
        self.accusations.get(player).cloned().unwrap_or_default()
    }

    /// Everyone the player has accused, sorted.
    pub fn accused_by(&self, player: &str) -> Vec<String> {
        let mut accused: Vec<String> = self
            .accusations
            .iter()
            .filter(|(_, accusers)| accusers.iter().any(|a| a == player))
            .map(|(target, _)| target.clone())
            .collect();
        accused.sort();
        accused
    }

    /// This round's events as bullet lines.
    pub fn round_summary(&self, round: u32) -> String {
        self.by_round(round)
            .iter()
            .map(format_episode)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.episodes.clear();
        self.accusations.clear();
    }
}

/// Players the speaker accuses: anyone named other than the speaker, provided
/// the speech also uses a suspicion keyword.
pub fn detect_accusations(speaker: &str, speech: &str, players: &[String]) -> Vec<String> {
    let lower = speech.to_lowercase();
    if !SUSPICION_KEYWORDS.iter().any(|kw| contains_word(&lower, kw)) {
        return Vec::new();
    }
    players
        .iter()
        .filter(|p| p.as_str() != speaker && contains_word(speech, p))
        .cloned()
        .collect()
}

/// Retrieval query for a player's turn.
pub fn query_for(player: &str, phase: Phase, round: u32) -> String {
    format!("{player} {phase} round {round}")
}

fn format_episode(episode: &Episode) -> String {
    format!("- [R{} {}] {}", episode.round, episode.phase, episode.content)
}

/// Prefix `base` with grouped memories.
///
/// Episodes from after `round` are dropped. Key events come first, then votes,
/// then the last few speeches, then private notes. With nothing to add the
/// base prompt is returned unchanged.
pub fn build_augmented_prompt(
    base: &str,
    episodes: &[Episode],
    notes: &[String],
    round: u32,
    book: &dyn PromptBook,
) -> String {
    let current: Vec<&Episode> = episodes.iter().filter(|ep| ep.round <= round).collect();
    let key_events: Vec<&Episode> = current
        .iter()
        .copied()
        .filter(|ep| ep.kind.is_key_event())
        .collect();
    let votes: Vec<&Episode> = current
        .iter()
        .copied()
        .filter(|ep| ep.kind == EpisodeKind::Vote)
        .collect();
    let speeches: Vec<&Episode> = current
        .iter()
        .copied()
        .filter(|ep| ep.kind == EpisodeKind::Speech)
        .collect();
    let speeches = &speeches[speeches.len().saturating_sub(MAX_PROMPT_SPEECHES)..];

    let mut sections = Vec::new();
    for (heading, group) in [
        (book.key_events_heading(), key_events.as_slice()),
        (book.votes_heading(), votes.as_slice()),
        (book.speeches_heading(), speeches),
    ] {
        if !group.is_empty() {
            let lines: Vec<String> = group.iter().map(|ep| format_episode(ep)).collect();
            sections.push(format!("### {heading}\n{}", lines.join("\n")));
        }
    }
    if !notes.is_empty() {
        let lines: Vec<String> = notes.iter().map(|n| format!("- {n}")).collect();
        sections.push(lines.join("\n"));
    }

    if sections.is_empty() {
        return base.to_string();
    }
    format!("{}\n\n---\n{base}", sections.join("\n\n"))
}

/// Short-term memory and an optional store for one game.
pub struct Memory {
    game_id: String,
    short_term: ShortTermMemory,
    store: Option<Arc<dyn EpisodeStore>>,
    top_k: usize,
}

impl Memory {
    pub fn new(game_id: impl Into<String>, top_k: usize) -> Self {
        Self {
            game_id: game_id.into(),
            short_term: ShortTermMemory::default(),
            store: None,
            top_k,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn EpisodeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn short_term(&self) -> &ShortTermMemory {
        &self.short_term
    }

    /// Start an episode stamped with this game's id.
    pub fn episode(&self, round: u32, phase: Phase, kind: EpisodeKind, actor: &str, content: impl Into<String>) -> Episode {
        Episode::new(self.game_id.clone(), round, phase, kind, actor, content)
    }

    /// Remember an episode. Store failures are logged and otherwise ignored.
    pub async fn record(&mut self, episode: Episode) {
        self.short_term.add(episode.clone());
        if let Some(store) = &self.store {
            if let Err(err) = store.store(episode).await {
                tracing::warn!(error = %err, "failed to store episode");
            }
        }
    }

    /// The player's prompt with everything they should remember in front of it.
    pub async fn augment(&self, player: &str, phase: Phase, round: u32, base: &str, book: &dyn PromptBook) -> String {
        let mut episodes: Vec<Episode> = self
            .short_term
            .by_round(round)
            .into_iter()
            .filter(|ep| ep.visible_to(player))
            .collect();

        let notes: Vec<String> = self
            .short_term
            .accusers_of(player)
            .iter()
            .map(|accuser| book.suspects_you(accuser))
            .collect();

        if let Some(store) = &self.store {
            let config = RetrieveConfig {
                top_k: self.top_k,
                game_id: Some(self.game_id.clone()),
                max_round: Some(round),
            };
            match store.retrieve_relevant(&query_for(player, phase, round), &config).await {
                Ok(found) => episodes.extend(found.into_iter().filter(|ep| ep.visible_to(player))),
                Err(err) => tracing::warn!(player, error = %err, "memory retrieval failed"),
            }
        }

        let mut seen = HashSet::new();
        episodes.retain(|ep| seen.insert(ep.dedup_key()));
        episodes.sort_by_key(|ep| ep.timestamp);

        build_augmented_prompt(base, &episodes, &notes, round, book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::EnglishPrompts;

    fn players() -> Vec<String> {
        (1..=9).map(|i| format!("Player{i}")).collect()
    }

    fn ep(round: u32, kind: EpisodeKind, actor: &str, content: &str) -> Episode {
        Episode::new("g1", round, Phase::Day, kind, actor, content)
    }

    #[test]
    fn test_short_term_is_bounded() {
        let mut memory = ShortTermMemory::new(2);
        memory.add(ep(1, EpisodeKind::Speech, "Player1", "a"));
        memory.add(ep(1, EpisodeKind::Speech, "Player2", "b"));
        memory.add(ep(2, EpisodeKind::Speech, "Player3", "c"));
        assert_eq!(memory.len(), 2);
        let recent: Vec<_> = memory.recent(5).into_iter().map(|e| e.content).collect();
        assert_eq!(recent, vec!["b", "c"]);
        assert_eq!(memory.by_round(2).len(), 1);
    }

    #[test]
    fn test_accusation_graph() {
        let mut memory = ShortTermMemory::default();
        for accuser in ["Player1", "Player2", "Player1"] {
            memory.add(ep(1, EpisodeKind::Accusation, accuser, "suspects").with_target("Player5"));
        }
        memory.add(ep(1, EpisodeKind::Accusation, "Player1", "suspects").with_target("Player3"));
        assert_eq!(memory.accusers_of("Player5"), vec!["Player1", "Player2"]);
        assert_eq!(memory.accused_by("Player1"), vec!["Player3", "Player5"]);
        assert_eq!(memory.by_player("Player3").len(), 1);
    }

    #[test]
    fn test_detect_accusations() {
        let accused = detect_accusations(
            "Player2",
            "I suspect Player5, and Player2 is innocent",
            &players(),
        );
        assert_eq!(accused, vec!["Player5"]);
        assert!(detect_accusations("Player2", "Player5 seems nice", &players()).is_empty());
        assert_eq!(
            detect_accusations("Player1", "我怀疑Player3", &players()),
            vec!["Player3"]
        );
    }

    #[test]
    fn test_augmented_prompt_groups_and_skips_future() {
        let episodes = vec![
            ep(1, EpisodeKind::Death, "Moderator", "Player4 died"),
            ep(1, EpisodeKind::Vote, "Player1", "Player1 voted Player2"),
            ep(1, EpisodeKind::Speech, "Player1", "s1"),
            ep(1, EpisodeKind::Speech, "Player2", "s2"),
            ep(1, EpisodeKind::Speech, "Player3", "s3"),
            ep(1, EpisodeKind::Speech, "Player5", "s4"),
            ep(3, EpisodeKind::Speech, "Player6", "from the future"),
        ];
        let notes = vec!["Player7 suspects you".to_string()];
        let prompt = build_augmented_prompt("Your turn.", &episodes, &notes, 2, &EnglishPrompts);

        assert!(prompt.contains("### Key events"));
        assert!(prompt.contains("Player4 died"));
        assert!(prompt.contains("Player1 voted Player2"));
        assert!(!prompt.contains("s1"));
        assert!(prompt.contains("s4"));
        assert!(!prompt.contains("from the future"));
        assert!(prompt.contains("- Player7 suspects you"));
        assert!(prompt.ends_with("---\nYour turn."));

        assert_eq!(
            build_augmented_prompt("Your turn.", &[], &[], 1, &EnglishPrompts),
            "Your turn."
        );
    }

    #[tokio::test]
    async fn test_keyword_store_filters_and_ranks() {
        let store = KeywordEpisodeStore::new();
        store.store(ep(1, EpisodeKind::Speech, "Player1", "Player3 is a werewolf")).await.unwrap();
        store.store(ep(2, EpisodeKind::Speech, "Player2", "Player3 lied about the seer")).await.unwrap();
        store.store(ep(5, EpisodeKind::Speech, "Player2", "Player3 late round")).await.unwrap();
        store
            .store(Episode::new("other", 1, Phase::Day, EpisodeKind::Speech, "Player3", "Player3"))
            .await
            .unwrap();

        let config = RetrieveConfig {
            top_k: 5,
            game_id: Some("g1".to_string()),
            max_round: Some(2),
        };
        let found = store.retrieve_relevant("Player3 seer", &config).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].content, "Player3 lied about the seer");
    }

    #[tokio::test]
    async fn test_private_episodes_stay_private() {
        let book = EnglishPrompts;
        let mut memory = Memory::new("g1", 5).with_store(Arc::new(KeywordEpisodeStore::new()));
        memory
            .record(memory.episode(1, Phase::Night, EpisodeKind::Check, "Player4", "Player4 checked Player2: werewolf"))
            .await;
        memory
            .record(memory.episode(1, Phase::Day, EpisodeKind::Speech, "Player1", "hello"))
            .await;

        let seer = memory.augment("Player4", Phase::Day, 1, "Speak.", &book).await;
        assert!(seer.contains("checked Player2"));

        let other = memory.augment("Player1", Phase::Day, 1, "Speak.", &book).await;
        assert!(!other.contains("checked Player2"));
        assert!(other.contains("hello"));
    }
}
