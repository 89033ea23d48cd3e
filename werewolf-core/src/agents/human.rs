//! A human seat at the terminal.

use crate::decision::{Reply, ToolSpec};
use crate::dispatch::Agent;
use crate::error::AgentError;
use crate::message::{Message, Speaker};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// How long to wait for a line before answering for the human.
pub const HUMAN_INPUT_TIMEOUT: Duration = Duration::from_secs(300);

/// Sent when the human stays silent.
pub const DEFAULT_HUMAN_REPLY: &str = "I choose to skip this turn";

type Input = Box<dyn AsyncBufRead + Send + Unpin>;
type Output = Box<dyn AsyncWrite + Send + Unpin>;

/// Shows the human everything new in their history and reads one line back.
pub struct HumanPlayer {
    name: String,
    wait: Duration,
    input: Mutex<Input>,
    output: Mutex<Output>,
    /// History entries already shown.
    seen: Mutex<usize>,
}

impl HumanPlayer {
    /// Read from stdin, write to stdout.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_io(
            name,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }

    pub fn with_io(
        name: impl Into<String>,
        input: impl AsyncBufRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            wait: HUMAN_INPUT_TIMEOUT,
            input: Mutex::new(Box::new(input)),
            output: Mutex::new(Box::new(output)),
            seen: Mutex::new(0),
        }
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    fn render(&self, history: &[Message], tool: Option<&ToolSpec>) -> String {
        let mut screen = String::new();
        for message in history {
            match message.speaker {
                Speaker::System => {
                    screen.push_str(&format!("\n[{} - your role]\n{}\n\n", self.name, message.content));
                }
                Speaker::Moderator => screen.push_str(&format!("[Moderator] {}\n", message.content)),
                Speaker::Player => {}
            }
        }
        if let Some(tool) = tool {
            screen.push_str(&format!("({}: {})\n", tool.name, tool.description));
        }
        screen.push_str(&format!("{}> ", self.name));
        screen
    }

    async fn show(&self, text: &str) {
        let mut output = self.output.lock().await;
        let written = async {
            output.write_all(text.as_bytes()).await?;
            output.flush().await
        };
        if let Err(err) = written.await {
            tracing::warn!(player = %self.name, error = %err, "could not write to terminal");
        }
    }
}

#[async_trait]
impl Agent for HumanPlayer {
    async fn respond(&self, history: &[Message], tool: Option<&ToolSpec>) -> Result<Reply, AgentError> {
        // One prompt at a time on a shared terminal.
        let mut seen = self.seen.lock().await;
        let fresh = history.get(*seen..).unwrap_or(history);
        *seen = history.len();
        self.show(&self.render(fresh, tool)).await;

        let mut line = String::new();
        let mut input = self.input.lock().await;
        let answer = match tokio::time::timeout(self.wait, input.read_line(&mut line)).await {
            Ok(Ok(0)) => {
                tracing::debug!(player = %self.name, "input closed");
                None
            }
            Ok(Ok(_)) => Some(line.trim().to_string()).filter(|l| !l.is_empty()),
            Ok(Err(err)) => {
                tracing::warn!(player = %self.name, error = %err, "failed to read input");
                None
            }
            Err(_) => {
                self.show("\n(no answer in time)\n").await;
                None
            }
        };

        Ok(Reply::text(answer.unwrap_or_else(|| DEFAULT_HUMAN_REPLY.to_string())))
    }
}
