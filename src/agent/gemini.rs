//! Google Gemini agent using `generateContent` with function calling.
//!
//! Gemini has no call ids. The conversation itself is the call state: the
//! user's prompt and the model's functionCall turn are replayed before the
//! function response on the second call.

use super::tools::{
    decode_argument_map, extraction_function, FunctionDefinition, SchemaStyle, FUNCTION_NAME,
};
use super::{send_json, Agent, AgentConfig, Provider};
use crate::error::{Error, Result};
use crate::refactor::{RefactoringRequest, RefactoringResult, RefactoringTarget};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
    /// Fields this client does not model (e.g. thought signatures), kept so
    /// replayed turns reach the API unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    function_declarations: Vec<FunctionDefinition>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Conversation kept from the extraction call.
#[derive(Debug, Clone)]
struct ChatSession {
    model: String,
    temperature: f32,
    history: Vec<Content>,
}

/// Agent for the Gemini API.
pub struct GeminiAgent {
    config: AgentConfig,
    http_client: reqwest::Client,
    session: Option<ChatSession>,
}

impl GeminiAgent {
    pub fn new(config: AgentConfig) -> Result<Self> {
        let http_client = config.http_client()?;
        Ok(Self {
            config,
            http_client,
            session: None,
        })
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self
            .config
            .endpoint(&format!("models/{}:generateContent", model));
        let builder = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request);
        send_json(Provider::Gemini, &url, builder).await
    }

    fn tools() -> Vec<Tool> {
        vec![Tool {
            function_declarations: vec![extraction_function(SchemaStyle::OpenApiUppercase)],
        }]
    }
}

#[async_trait]
impl Agent for GeminiAgent {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn create_refactoring_target(
        &mut self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<RefactoringTarget> {
        let user_turn = Content::user(vec![Part::text(prompt)]);
        let request = GenerateContentRequest {
            contents: vec![user_turn.clone()],
            tools: Self::tools(),
            generation_config: GenerationConfig { temperature },
        };

        let response = self.generate_content(model, &request).await?;
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(Error::NoResponseChoices { provider: PROVIDER })?;
        let model_turn = candidate
            .content
            .ok_or(Error::NoStructuredCall { provider: PROVIDER })?;

        let calls: Vec<&FunctionCall> = model_turn
            .parts
            .iter()
            .filter_map(|p| p.function_call.as_ref())
            .collect();
        if calls.is_empty() {
            return Err(Error::NoStructuredCall { provider: PROVIDER });
        }

        let mut target = RefactoringTarget::new(prompt, "");
        for call in calls {
            debug!("Function call {}: {:?}", call.name, call.args);
            let args = decode_argument_map(&call.args)
                .map_err(|reason| Error::malformed(PROVIDER, reason))?;
            target.extend(args.pull_request_urls, args.files);
        }

        let model_turn = Content {
            role: Some("model".to_string()),
            ..model_turn
        };
        self.session = Some(ChatSession {
            model: model.to_string(),
            temperature,
            history: vec![user_turn, model_turn],
        });

        Ok(target.unique())
    }

    async fn create_refactoring_result(
        &mut self,
        request: &RefactoringRequest,
        assistance_message: &str,
    ) -> Result<RefactoringResult> {
        let session = self
            .session
            .clone()
            .ok_or(Error::MissingCallState { provider: PROVIDER })?;

        let mut response_fields = Map::new();
        if let Some(pr) = request.first_pull_request() {
            response_fields.insert("pullRequestDiff".to_string(), Value::String(pr.diff.clone()));
        }
        for file in &request.target_files {
            response_fields.insert(file.path.clone(), Value::String(file.content.clone()));
        }

        let mut contents = session.history;
        contents.push(Content::user(vec![
            Part::text(&request.user_prompt),
            Part::text(assistance_message),
            Part {
                function_response: Some(FunctionResponse {
                    name: FUNCTION_NAME.to_string(),
                    response: response_fields,
                }),
                ..Part::default()
            },
        ]));

        let gen_request = GenerateContentRequest {
            contents,
            tools: Self::tools(),
            generation_config: GenerationConfig {
                temperature: session.temperature,
            },
        };

        let response = self.generate_content(&session.model, &gen_request).await?;
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(Error::NoResponseChoices { provider: PROVIDER })?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(RefactoringResult::new(text))
    }
}
