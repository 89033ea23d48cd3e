//! Structured player decisions.
//!
//! The moderator asks for a decision by handing the agent a [`ToolSpec`]
//! generated from one of the structs below. A well-behaved agent answers with
//! a [`Reply::Structured`] object that deserializes directly. Anything else is
//! read as free text: first by looking for an embedded JSON object, then by
//! keyword and name extraction. Extraction never guesses. Two different
//! candidate names, or a yes and a no in the same answer, produce no decision.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use werewolf_macros::Decision;

/// A decision tool definition sent to agents.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Schema half of a decision, usually derived with `#[derive(Decision)]`.
pub trait DecisionSchema {
    fn tool_name() -> &'static str;
    fn tool_description() -> &'static str;
    fn input_schema() -> Value;

    /// Bundle the schema for an agent.
    fn spec() -> ToolSpec
    where
        Self: Sized,
    {
        ToolSpec {
            name: Self::tool_name().to_string(),
            description: Self::tool_description().to_string(),
            input_schema: Self::input_schema(),
        }
    }
}

/// A decision that can also be recovered from free text.
pub trait Decision: DecisionSchema + DeserializeOwned + Send + 'static {
    /// Best-effort extraction. `candidates` are the names the answer may
    /// legitimately refer to.
    fn from_text(text: &str, candidates: &[String]) -> Option<Self>;
}

/// What an agent sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Tool input, already JSON.
    Structured(Map<String, Value>),
    /// Plain text.
    Unstructured(String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Unstructured(text.into())
    }

    /// Build a structured reply from a `json!` object. Non-objects become text.
    pub fn structured(value: Value) -> Self {
        match value {
            Value::Object(map) => Reply::Structured(map),
            other => Reply::Unstructured(other.to_string()),
        }
    }

    /// An empty reply is a decline.
    pub fn is_empty(&self) -> bool {
        match self {
            Reply::Structured(map) => map.is_empty(),
            Reply::Unstructured(text) => text.trim().is_empty(),
        }
    }

    /// How the reply is recorded in the player's history.
    pub fn as_history_text(&self) -> String {
        match self {
            Reply::Structured(map) => Value::Object(map.clone()).to_string(),
            Reply::Unstructured(text) => text.trim().to_string(),
        }
    }

    /// Spoken words for a speech turn: a structured `message` field if present,
    /// otherwise the text itself.
    pub fn speech(&self) -> Option<String> {
        let speech = match self {
            Reply::Structured(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            Reply::Unstructured(text) => text.trim().to_string(),
        };
        (!speech.is_empty()).then_some(speech)
    }
}

/// Turn a reply into a typed decision, or `None` if it cannot be read safely.
pub fn interpret<D: Decision>(reply: &Reply, candidates: &[String]) -> Option<D> {
    match reply {
        Reply::Structured(map) => match serde_json::from_value(Value::Object(map.clone())) {
            Ok(decision) => Some(decision),
            Err(err) => {
                tracing::debug!(tool = D::tool_name(), %err, "structured reply did not match schema");
                None
            }
        },
        Reply::Unstructured(text) => {
            if text.trim().is_empty() {
                return None;
            }
            if let Some(decision) =
                extract_json(text).and_then(|json| serde_json::from_str::<D>(json).ok())
            {
                return Some(decision);
            }
            D::from_text(text, candidates)
        }
    }
}

/// The span from the first `{` to the last `}`, if any.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Result of scanning text for player names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mention {
    Nobody,
    One(String),
    /// More than one distinct candidate was named.
    Ambiguous,
}

/// Which candidate, if exactly one, the text names.
///
/// Names only match on ASCII word boundaries, so "Player1" is not found
/// inside "Player10".
pub fn mentioned_player(text: &str, candidates: &[String]) -> Mention {
    let mut found = candidates
        .iter()
        .filter(|name| contains_word(text, name));
    match (found.next(), found.next()) {
        (None, _) => Mention::Nobody,
        (Some(name), None) => Mention::One(name.clone()),
        (Some(_), Some(_)) => Mention::Ambiguous,
    }
}

/// Yes/no intent of a free-text answer.
///
/// Negative phrases are matched first and masked out, so "不救" does not also
/// count as "救". Returns `None` when neither or both intents remain.
pub fn intent(text: &str, yes: &[&str], no: &[&str]) -> Option<bool> {
    let mut masked = text.to_lowercase();
    let mut said_no = false;
    for phrase in no {
        let spans = keyword_spans(&masked, phrase);
        if !spans.is_empty() {
            said_no = true;
            masked = mask(&masked, &spans);
        }
    }
    let said_yes = yes.iter().any(|kw| !keyword_spans(&masked, kw).is_empty());

    match (said_yes, said_no) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

/// Whether `word` occurs in `text` on word boundaries (ASCII) or at all (other scripts).
pub(crate) fn contains_word(text: &str, word: &str) -> bool {
    !keyword_spans(text, word).is_empty()
}

/// Byte ranges where `keyword` occurs. ASCII keywords must sit on word
/// boundaries; other scripts match as plain substrings.
fn keyword_spans(haystack: &str, keyword: &str) -> Vec<(usize, usize)> {
    if keyword.is_empty() {
        return Vec::new();
    }
    let bounded = keyword.is_ascii();
    haystack
        .match_indices(keyword)
        .filter(|(start, _)| {
            if !bounded {
                return true;
            }
            let end = start + keyword.len();
            let before = haystack[..*start].chars().next_back();
            let after = haystack[end..].chars().next();
            !before.is_some_and(|c| c.is_ascii_alphanumeric())
                && !after.is_some_and(|c| c.is_ascii_alphanumeric())
        })
        .map(|(start, _)| (start, start + keyword.len()))
        .collect()
}

fn mask(text: &str, spans: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(start, end) in spans {
        out.push_str(&text[cursor..start]);
        out.push(' ');
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Treat `""` the same as a missing target.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

const AGREE: &[&str] = &["agree", "agreed", "consensus", "同意", "一致"];
const DISAGREE: &[&str] = &[
    "disagree",
    "don't agree",
    "do not agree",
    "not agree",
    "no consensus",
    "不同意",
    "不一致",
];

const SAVE_YES: &[&str] = &["save", "heal", "resurrect", "yes", "救"];
const SAVE_NO: &[&str] = &[
    "not save",
    "don't save",
    "do not save",
    "won't save",
    "will not save",
    "not resurrect",
    "not to resurrect",
    "no",
    "不救",
    "不用",
    "不使用",
];

const POISON_YES: &[&str] = &["poison", "yes", "毒"];
const POISON_NO: &[&str] = &[
    "not poison",
    "don't poison",
    "do not poison",
    "won't poison",
    "will not poison",
    "no poison",
    "not use",
    "no",
    "不毒",
    "不用",
    "不使用",
];

const SHOOT_YES: &[&str] = &["shoot", "take down", "yes", "射", "开枪", "带走"];
const SHOOT_NO: &[&str] = &[
    "not shoot",
    "don't shoot",
    "do not shoot",
    "won't shoot",
    "will not shoot",
    "not to shoot",
    "no one",
    "nobody",
    "no",
    "不开枪",
    "不带走",
];

/// Speak in the werewolves' private discussion
#[derive(Debug, Clone, PartialEq, Eq, Decision, Deserialize)]
#[decision(name = "discuss")]
pub struct Discuss {
    /// What you say to your fellow werewolves
    pub message: String,
    /// True once the werewolves agree on tonight's victim
    #[serde(default)]
    pub reach_agreement: bool,
}

impl Decision for Discuss {
    fn from_text(text: &str, _candidates: &[String]) -> Option<Self> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }
        Some(Self {
            message: message.to_string(),
            reach_agreement: intent(message, AGREE, DISAGREE) == Some(true),
        })
    }
}

/// Vote for the player you want to eliminate
#[derive(Debug, Clone, PartialEq, Eq, Decision, Deserialize)]
#[decision(name = "vote")]
pub struct Vote {
    /// Name of the player you vote for; leave empty to abstain
    #[serde(default, deserialize_with = "blank_as_none")]
    pub target: Option<String>,
}

impl Decision for Vote {
    fn from_text(text: &str, candidates: &[String]) -> Option<Self> {
        match mentioned_player(text, candidates) {
            Mention::One(target) => Some(Self {
                target: Some(target),
            }),
            Mention::Nobody | Mention::Ambiguous => None,
        }
    }
}

/// Decide whether to use the healing potion on tonight's victim
#[derive(Debug, Clone, PartialEq, Eq, Decision, Deserialize)]
#[decision(name = "save")]
pub struct Save {
    /// True to use the healing potion
    pub save: bool,
}

impl Decision for Save {
    fn from_text(text: &str, _candidates: &[String]) -> Option<Self> {
        intent(text, SAVE_YES, SAVE_NO).map(|save| Self { save })
    }
}

/// Decide whether to use the poison potion, and on whom
#[derive(Debug, Clone, PartialEq, Eq, Decision, Deserialize)]
#[decision(name = "poison")]
pub struct Poison {
    /// True to use the poison potion
    pub poison: bool,
    /// Name of the player to poison
    #[serde(default, deserialize_with = "blank_as_none")]
    pub target: Option<String>,
}

impl Decision for Poison {
    fn from_text(text: &str, candidates: &[String]) -> Option<Self> {
        match intent(text, POISON_YES, POISON_NO)? {
            false => Some(Self {
                poison: false,
                target: None,
            }),
            true => match mentioned_player(text, candidates) {
                Mention::One(target) => Some(Self {
                    poison: true,
                    target: Some(target),
                }),
                Mention::Nobody => Some(Self {
                    poison: true,
                    target: None,
                }),
                Mention::Ambiguous => None,
            },
        }
    }
}

/// Check one player's identity
#[derive(Debug, Clone, PartialEq, Eq, Decision, Deserialize)]
#[decision(name = "check_identity")]
pub struct Check {
    /// Name of the player to check
    #[serde(default, deserialize_with = "blank_as_none")]
    pub target: Option<String>,
}

impl Decision for Check {
    fn from_text(text: &str, candidates: &[String]) -> Option<Self> {
        match mentioned_player(text, candidates) {
            Mention::One(target) => Some(Self {
                target: Some(target),
            }),
            Mention::Nobody | Mention::Ambiguous => None,
        }
    }
}

/// Decide whether to shoot a player as you leave the game
#[derive(Debug, Clone, PartialEq, Eq, Decision, Deserialize)]
#[decision(name = "shoot")]
pub struct Shoot {
    /// True to fire
    pub shoot: bool,
    /// Name of the player to shoot
    #[serde(default, deserialize_with = "blank_as_none")]
    pub target: Option<String>,
}

impl Decision for Shoot {
    fn from_text(text: &str, candidates: &[String]) -> Option<Self> {
        match intent(text, SHOOT_YES, SHOOT_NO)? {
            false => Some(Self {
                shoot: false,
                target: None,
            }),
            true => match mentioned_player(text, candidates) {
                Mention::One(target) => Some(Self {
                    shoot: true,
                    target: Some(target),
                }),
                Mention::Nobody | Mention::Ambiguous => None,
            },
        }
    }
}

/// Choose who opens the day discussion and which way the turn passes
#[derive(Debug, Clone, PartialEq, Eq, Decision, Deserialize)]
#[decision(name = "speaking_order")]
pub struct SpeakingOrder {
    /// Name of the first speaker
    #[serde(default)]
    pub start: String,
    /// "clockwise" or "counterclockwise"
    #[serde(default)]
    pub direction: Option<String>,
    /// Short reason for the choice
    #[serde(default)]
    pub reason: Option<String>,
}

impl SpeakingOrder {
    pub fn is_counterclockwise(&self) -> bool {
        self.direction
            .as_deref()
            .is_some_and(|d| d.trim().eq_ignore_ascii_case("counterclockwise"))
    }
}

impl Decision for SpeakingOrder {
    fn from_text(_text: &str, _candidates: &[String]) -> Option<Self> {
        None
    }
}
