//! Gemini `generateContent` backend

use super::{
    AssistantConfig, Content, LanguageModel, ModelRequest, ModelTurn, Part, Role, ToolCall,
    ToolDeclaration,
};
use crate::{constants::USER_AGENT, error::AssistantError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: WireContent,
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTools>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTools {
    function_declarations: Vec<ToolDeclaration>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<WireContent>,
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => Self {
                text: Some(text.clone()),
                ..Self::default()
            },
            Part::ToolCall(call) => Self {
                function_call: Some(WireFunctionCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    args: call.args.clone(),
                }),
                thought_signature: call.signature.clone(),
                ..Self::default()
            },
            Part::ToolResult { id, name, result } => Self {
                function_response: Some(WireFunctionResponse {
                    id: id.clone(),
                    name: name.clone(),
                    response: json!({ "result": result }),
                }),
                ..Self::default()
            },
        }
    }
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        let role = match content.role {
            Role::User => "user",
            Role::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: content.parts.iter().map(WirePart::from).collect(),
        }
    }
}

fn build_request(request: &ModelRequest) -> GenerateRequest {
    let tools = if request.tools.is_empty() {
        Vec::new()
    } else {
        vec![WireTools {
            function_declarations: request.tools.clone(),
        }]
    };

    GenerateRequest {
        system_instruction: WireContent {
            role: None,
            parts: vec![WirePart::from(&Part::Text(request.system_instruction.clone()))],
        },
        contents: request.contents.iter().map(WireContent::from).collect(),
        tools,
        generation_config: GenerationConfig {
            temperature: request.temperature,
        },
    }
}

/// Takes the first function call of the first candidate, or else its text
fn parse_response(response: GenerateResponse) -> Result<ModelTurn, AssistantError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AssistantError::InvalidResponse("no candidates".to_string()))?;
    let parts = candidate.content.unwrap_or_default().parts;

    let mut text = String::new();
    for part in parts {
        if let Some(call) = part.function_call {
            return Ok(ModelTurn::ToolCall(ToolCall {
                id: call.id,
                name: call.name,
                args: call.args,
                signature: part.thought_signature,
            }));
        }
        if let Some(chunk) = part.text {
            text.push_str(&chunk);
        }
    }

    Ok(ModelTurn::Text(text))
}

/// Google Gemini over reqwest
pub struct GeminiModel {
    client: Client,
    config: AssistantConfig,
}

impl GeminiModel {
    pub fn new(config: AssistantConfig) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, config })
    }

    /// Builds a model from `GEMINI_API_KEY` / `API_KEY`
    pub fn from_env() -> Result<Self, AssistantError> {
        Self::new(AssistantConfig::from_env()?)
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelTurn, AssistantError> {
        let url = self.endpoint();
        tracing::debug!(model = %self.config.model, contents = request.contents.len(), "Calling model");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&build_request(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::Backend(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            AssistantError::InvalidResponse(format!(
                "Failed to parse model response: {}. Response: {}",
                e, response_text
            ))
        })?;

        parse_response(parsed)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
