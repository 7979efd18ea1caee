//! Conversational assistant backed by live market data
//!
//! A [`ChatSession`] runs one strict request/response cycle per user
//! message:
//!
//! 1. the transcript goes to the [`LanguageModel`] together with the
//!    system instruction and the declared [`tools`]
//! 2. if the model asks for a tool, the tool runs against the live
//!    endpoints and its result is sent back for a final answer
//! 3. the answer is appended to the transcript
//!
//! Every model turn is bounded by a timeout. A failed or timed out turn
//! leaves a fallback message in the transcript and the session returns to
//! [`SessionPhase::Idle`].

pub mod gemini;
pub mod prompt;
pub mod tools;

use crate::{
    constants::{
        ASSISTANT_KEY_ENV, ASSISTANT_MODEL, ASSISTANT_TEMPERATURE, ASSISTANT_TIMEOUT_SECS,
        GEMINI_API_URL,
    },
    endpoints::MarketDataApi,
    error::AssistantError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub use gemini::GeminiModel;
pub use tools::{ToolCall, ToolDeclaration};

/// Shown when the model answers a tool result with no text
pub const TOOL_FALLBACK_TEXT: &str = "Data processed.";

/// Shown when the model answers with no text at all
pub const EMPTY_FALLBACK_TEXT: &str = "I am here to help.";

/// Appended to the transcript when a turn fails
pub const FAILURE_TEXT: &str = "Service temporarily unavailable. Please try again.";

/// Assistant backend settings
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    /// Deadline for each model turn
    pub timeout: Duration,
}

impl AssistantConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: ASSISTANT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            temperature: ASSISTANT_TEMPERATURE,
            timeout: Duration::from_secs(ASSISTANT_TIMEOUT_SECS),
        }
    }

    /// Reads the API key from `GEMINI_API_KEY`, falling back to `API_KEY`
    pub fn from_env() -> Result<Self, AssistantError> {
        ASSISTANT_KEY_ENV
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|key| !key.trim().is_empty())
            .map(Self::new)
            .ok_or_else(|| AssistantError::MissingApiKey(ASSISTANT_KEY_ENV.join(", ")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// One piece of a model exchange
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    ToolCall(ToolCall),
    ToolResult {
        id: Option<String>,
        name: String,
        result: Value,
    },
}

/// A role-tagged group of parts
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl From<&ChatMessage> for Content {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            parts: vec![Part::Text(message.text.clone())],
        }
    }
}

/// Everything the model sees for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system_instruction: String,
    pub contents: Vec<Content>,
    /// Empty when only a text answer is wanted
    pub tools: Vec<ToolDeclaration>,
    pub temperature: f32,
}

/// What the model produced
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    Text(String),
    ToolCall(ToolCall),
}

/// A chat model that can request tool calls
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelTurn, AssistantError>;

    fn model_name(&self) -> &str;
}

/// Where a session is in its current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    AwaitingModel,
    RunningTool,
    AwaitingFinal,
}

pub struct ChatSession {
    model: Arc<dyn LanguageModel>,
    api: MarketDataApi,
    messages: Vec<ChatMessage>,
    phase: SessionPhase,
    timeout: Duration,
    temperature: f32,
}

impl ChatSession {
    /// Starts a session whose transcript opens with the greeting
    pub fn new(model: Arc<dyn LanguageModel>, api: MarketDataApi) -> Self {
        Self {
            model,
            api,
            messages: vec![ChatMessage::model(prompt::GREETING)],
            phase: SessionPhase::Idle,
            timeout: Duration::from_secs(ASSISTANT_TIMEOUT_SECS),
            temperature: ASSISTANT_TEMPERATURE,
        }
    }

    /// Starts a session using the deadline and temperature from `config`
    pub fn with_config(
        model: Arc<dyn LanguageModel>,
        api: MarketDataApi,
        config: &AssistantConfig,
    ) -> Self {
        let mut session = Self::new(model, api);
        session.timeout = config.timeout;
        session.temperature = config.temperature;
        session
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Sends one user message and waits for the reply
    ///
    /// Blank input is ignored and yields `Ok(None)`. The user message and
    /// the reply are committed together once the cycle ends; on failure the
    /// reply is the fallback message and the error is returned. Dropping the
    /// returned future leaves the transcript unchanged and the session idle.
    pub async fn send(&mut self, input: &str) -> Result<Option<ChatMessage>, AssistantError> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let user = ChatMessage::user(text);
        let mut contents: Vec<Content> = self.messages.iter().map(Content::from).collect();
        contents.push(Content::from(&user));

        let outcome = {
            let mut phase = PhaseGuard::new(&mut self.phase);
            run_cycle(
                self.model.as_ref(),
                &self.api,
                contents,
                self.timeout,
                self.temperature,
                &mut phase,
            )
            .await
        };

        self.messages.push(user);
        match outcome {
            Ok(reply) => {
                let message = ChatMessage::model(reply);
                self.messages.push(message.clone());
                Ok(Some(message))
            }
            Err(e) => {
                tracing::warn!(model = self.model.model_name(), error = %e, "Assistant turn failed");
                self.messages.push(ChatMessage::model(FAILURE_TEXT));
                Err(e)
            }
        }
    }
}

/// Tracks the phase of a running cycle and resets it to idle when the
/// cycle ends, including when its future is dropped
struct PhaseGuard<'a> {
    phase: &'a mut SessionPhase,
}

impl<'a> PhaseGuard<'a> {
    fn new(phase: &'a mut SessionPhase) -> Self {
        Self { phase }
    }

    fn set(&mut self, phase: SessionPhase) {
        tracing::debug!(?phase, "Assistant phase");
        *self.phase = phase;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *self.phase = SessionPhase::Idle;
    }
}

async fn run_cycle(
    model: &dyn LanguageModel,
    api: &MarketDataApi,
    contents: Vec<Content>,
    timeout: Duration,
    temperature: f32,
    phase: &mut PhaseGuard<'_>,
) -> Result<String, AssistantError> {
    let mut request = ModelRequest {
        system_instruction: prompt::SYSTEM_INSTRUCTION.to_string(),
        contents,
        tools: tools::declarations(),
        temperature,
    };

    phase.set(SessionPhase::AwaitingModel);
    let call = match generate(model, &request, timeout).await? {
        ModelTurn::Text(text) => return Ok(non_empty(text, EMPTY_FALLBACK_TEXT)),
        ModelTurn::ToolCall(call) => call,
    };

    phase.set(SessionPhase::RunningTool);
    let result = tools::execute(api, &call).await;

    request.contents.push(Content {
        role: Role::Model,
        parts: vec![Part::ToolCall(call.clone())],
    });
    request.contents.push(Content {
        role: Role::User,
        parts: vec![Part::ToolResult {
            id: call.id,
            name: call.name,
            result,
        }],
    });
    request.tools.clear();

    phase.set(SessionPhase::AwaitingFinal);
    match generate(model, &request, timeout).await? {
        ModelTurn::Text(text) => Ok(non_empty(text, TOOL_FALLBACK_TEXT)),
        ModelTurn::ToolCall(call) => Err(AssistantError::UnknownTool(call.name)),
    }
}

async fn generate(
    model: &dyn LanguageModel,
    request: &ModelRequest,
    timeout: Duration,
) -> Result<ModelTurn, AssistantError> {
    tokio::time::timeout(timeout, model.generate(request))
        .await
        .map_err(|_| AssistantError::Timeout(timeout))?
}

fn non_empty(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}
