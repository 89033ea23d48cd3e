//! Claude-backed player.
//!
//! The player's history is replayed as a Messages API conversation: the system
//! instruction becomes `system`, moderator lines become user turns and the
//! player's own replies become assistant turns. When a decision is wanted the
//! matching tool is forced, and its input comes back as a structured reply.

use crate::decision::{Reply, ToolSpec};
use crate::dispatch::Agent;
use crate::error::{AgentError, SetupError};
use crate::message::{Message, Speaker};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Connection settings for LLM players.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: None,
        }
    }

    /// `ANTHROPIC_API_KEY` is required; `WEREWOLF_MODEL` overrides the model.
    pub fn from_env() -> Result<Self, SetupError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(SetupError::NoApiKey)?;
        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("WEREWOLF_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// An AI seat.
#[derive(Clone)]
pub struct ClaudePlayer {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ClaudePlayer {
    pub fn new(config: LlmConfig) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SetupError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn build_headers(&self) -> Result<HeaderMap, AgentError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|e| AgentError::Config(format!("Invalid API key: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn build_request(&self, history: &[Message], tool: Option<&ToolSpec>) -> ApiRequest {
        let system: Vec<&str> = history
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.as_str())
            .collect();

        ApiRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: conversation(history),
            temperature: self.config.temperature,
            tools: tool.map(|t| {
                vec![ApiTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.input_schema.clone(),
                }]
            }),
            tool_choice: tool.map(|t| ApiToolChoice {
                r#type: "tool".to_string(),
                name: t.name.clone(),
            }),
        }
    }
}

/// Alternating user/assistant turns. Consecutive lines from the same side are
/// merged, and the conversation always opens with a user turn.
fn conversation(history: &[Message]) -> Vec<ApiMessage> {
    let mut messages: Vec<ApiMessage> = Vec::new();
    for message in history {
        let role = match message.speaker {
            Speaker::System => continue,
            Speaker::Moderator => "user",
            Speaker::Player => "assistant",
        };
        match messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(&message.content);
            }
            _ => {
                if messages.is_empty() && role == "assistant" {
                    continue;
                }
                messages.push(ApiMessage {
                    role,
                    content: message.content.clone(),
                });
            }
        }
    }
    messages
}

fn into_reply(response: ApiResponse) -> Reply {
    let mut text = String::new();
    for block in response.content {
        match block {
            ApiContent::ToolUse { input, .. } => return Reply::structured(input),
            ApiContent::Text { text: chunk } => text.push_str(&chunk),
            ApiContent::Other => {}
        }
    }
    Reply::text(text)
}

#[async_trait]
impl Agent for ClaudePlayer {
    async fn respond(&self, history: &[Message], tool: Option<&ToolSpec>) -> Result<Reply, AgentError> {
        let request = self.build_request(history, tool);
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(format!("{API_BASE}/messages"))
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status,
                message: body,
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;
        tracing::debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "claude replied"
        );
        Ok(into_reply(parsed))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ApiToolChoice>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ApiToolChoice {
    r#type: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContent>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContent {
    Text {
        text: String,
    },
    ToolUse {
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{DecisionSchema, Vote};
    use serde_json::json;

    fn player() -> ClaudePlayer {
        ClaudePlayer::new(LlmConfig::new("test-key")).unwrap()
    }

    #[test]
    fn test_history_maps_to_turns() {
        let history = vec![
            Message::system("you are Player1"),
            Message::moderator("night falls"),
            Message::moderator("who do you vote for?"),
            Message::player("Player3"),
            Message::moderator("day breaks"),
        ];
        let request = player().build_request(&history, None);

        assert_eq!(request.system.as_deref(), Some("you are Player1"));
        let roles: Vec<_> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(request.messages[0].content, "night falls\n\nwho do you vote for?");
        assert!(request.tools.is_none());
    }

    #[test]
    fn test_decision_forces_tool() {
        let spec = Vote::spec();
        let request = player().build_request(&[Message::moderator("vote")], Some(&spec));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["tool_choice"], json!({"type": "tool", "name": "vote"}));
        assert_eq!(body["tools"][0]["name"], "vote");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_tool_use_becomes_structured_reply() {
        let response: ApiResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Thinking it over."},
                {"type": "tool_use", "id": "toolu_1", "name": "vote", "input": {"target": "Player4"}}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }))
        .unwrap();
        assert_eq!(into_reply(response), Reply::structured(json!({"target": "Player4"})));
    }

    #[test]
    fn test_unknown_blocks_are_skipped() {
        let response: ApiResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "I vote Player2"}
            ],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .unwrap();
        assert_eq!(into_reply(response), Reply::text("I vote Player2"));
    }
}
