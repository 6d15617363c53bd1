use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::{AzureConfig, Config, OpenAIConfig},
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequest, Role,
    },
    Client,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::GeneratorSettings;

const SYSTEM_PROMPT: &str = "You are a senior QA engineer specializing in risk-based testing. \
Generate comprehensive test cases with clear risk assessments.";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u16 = 2000;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Gemini,
    #[serde(rename = "azure_openai")]
    AzureOpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::AzureOpenAi => "azure_openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "gemini" => Ok(ProviderKind::Gemini),
            "azure_openai" => Ok(ProviderKind::AzureOpenAi),
            other => Err(GeneratorError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("unknown AI provider '{0}'")]
    UnknownProvider(String),
    #[error("AI provider '{0}' is not configured")]
    NotConfigured(ProviderKind),
    #[error("{provider} request failed: {message}")]
    Request {
        provider: ProviderKind,
        message: String,
    },
    #[error("{0} returned no content")]
    EmptyResponse(ProviderKind),
}

impl GeneratorError {
    fn request(provider: ProviderKind, err: impl fmt::Display) -> Self {
        GeneratorError::Request {
            provider,
            message: err.to_string(),
        }
    }
}

/// Turns a user story into generator text that is expected to hold a test case table.
#[async_trait]
pub trait TestCaseGenerator: Send + Sync {
    fn provider(&self) -> ProviderKind;

    async fn generate(&self, story: &str, story_id: &str) -> Result<String, GeneratorError>;
}

pub fn build_prompt(story: &str, story_id: &str) -> String {
    format!(
        r#"Analyze the following user story and acceptance criteria to generate comprehensive test cases.

User Story and Acceptance Criteria:
{story}

Please identify functional areas and generate risk-based test cases. For each test case:
1. Assign a Risk Level (High/Medium/Low) based on:
   - Complexity of the functionality
   - Business impact if it fails
   - Likelihood of defects based on common patterns

2. Generate more detailed test cases for high-risk areas and fewer for low-risk areas.

3. Output the results as a clean markdown table with these columns:
   | Test Case ID | Area/Feature | Description | Steps | Expected Result | Risk Level | Priority |

4. Use realistic test case IDs (e.g., {story_id}001, {story_id}002, etc.)
5. Make descriptions clear and actionable
6. Include both positive and negative test scenarios
7. Prioritize based on risk level (High=1, Medium=2, Low=3)

Focus on edge cases, error conditions, and integration points for high-risk areas."#
    )
}

fn non_empty(provider: ProviderKind, text: Option<String>) -> Result<String, GeneratorError> {
    match text.map(|t| t.trim().to_string()) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(GeneratorError::EmptyResponse(provider)),
    }
}

/// Chat completions through `async-openai`; serves both OpenAI and Azure deployments.
pub struct OpenAiGenerator<C: Config> {
    client: Client<C>,
    model: String,
    kind: ProviderKind,
}

impl OpenAiGenerator<OpenAIConfig> {
    pub fn new(api_key: &str, model: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            kind: ProviderKind::OpenAi,
        }
    }
}

impl OpenAiGenerator<AzureConfig> {
    pub fn azure(api_key: &str, endpoint: &str, deployment: &str, api_version: &str) -> Self {
        let config = AzureConfig::new()
            .with_api_base(endpoint)
            .with_api_key(api_key)
            .with_deployment_id(deployment)
            .with_api_version(api_version);
        Self {
            client: Client::with_config(config),
            model: deployment.to_string(),
            kind: ProviderKind::AzureOpenAi,
        }
    }
}

#[async_trait]
impl<C> TestCaseGenerator for OpenAiGenerator<C>
where
    C: Config + Send + Sync + 'static,
{
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, story: &str, story_id: &str) -> Result<String, GeneratorError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: SYSTEM_PROMPT.to_string(),
                name: None,
                role: Role::System,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(build_prompt(story, story_id)),
                name: None,
                role: Role::User,
            }),
        ];

        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(TEMPERATURE),
            max_tokens: Some(MAX_TOKENS),
            ..Default::default()
        };

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GeneratorError::request(self.kind, e))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        non_empty(self.kind, content)
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicGenerator {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TestCaseGenerator for AnthropicGenerator {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn generate(&self, story: &str, story_id: &str) -> Result<String, GeneratorError> {
        let kind = self.provider();
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": build_prompt(story, story_id) }],
        });

        let response = self
            .http
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| GeneratorError::request(kind, e))?;

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::request(kind, e))?;

        non_empty(kind, parsed.content.into_iter().find_map(|c| c.text))
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiResponse {
    fn text(self) -> Option<String> {
        let parts: Vec<String> = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        (!parts.is_empty()).then(|| parts.concat())
    }
}

/// Gemini `generateContent` over plain HTTP. A rate-limited call is retried once
/// after `rate_limit_backoff`.
pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    rate_limit_backoff: Duration,
}

impl GeminiGenerator {
    pub fn new(api_key: &str, model: &str, rate_limit_backoff: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            rate_limit_backoff,
        }
    }

    async fn call(&self, body: &serde_json::Value) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(format!("{}/{}:generateContent", GEMINI_URL, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
    }
}

#[async_trait]
impl TestCaseGenerator for GeminiGenerator {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(&self, story: &str, story_id: &str) -> Result<String, GeneratorError> {
        let kind = self.provider();
        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{ "role": "user", "parts": [{ "text": build_prompt(story, story_id) }] }],
            "generationConfig": { "temperature": TEMPERATURE, "maxOutputTokens": MAX_TOKENS },
        });

        let mut response = self.call(&body).await.map_err(|e| GeneratorError::request(kind, e))?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(
                "Gemini rate limit hit, retrying in {:?}",
                self.rate_limit_backoff
            );
            tokio::time::sleep(self.rate_limit_backoff).await;
            response = self.call(&body).await.map_err(|e| GeneratorError::request(kind, e))?;
        }

        let parsed: GeminiResponse = response
            .error_for_status()
            .map_err(|e| GeneratorError::request(kind, e))?
            .json()
            .await
            .map_err(|e| GeneratorError::request(kind, e))?;

        non_empty(kind, parsed.text())
    }
}

/// Generators configured for this process, keyed by provider.
#[derive(Clone)]
pub struct GeneratorRegistry {
    default: ProviderKind,
    generators: BTreeMap<ProviderKind, Arc<dyn TestCaseGenerator>>,
}

impl GeneratorRegistry {
    pub fn new(default: ProviderKind) -> Self {
        Self {
            default,
            generators: BTreeMap::new(),
        }
    }

    pub fn from_settings(settings: &GeneratorSettings) -> Self {
        let mut registry = Self::new(settings.provider);
        if let Some(openai) = &settings.openai {
            registry.register(Arc::new(OpenAiGenerator::new(&openai.api_key, &openai.model)));
        }
        if let Some(azure) = &settings.azure_openai {
            registry.register(Arc::new(OpenAiGenerator::azure(
                &azure.api_key,
                &azure.endpoint,
                &azure.deployment,
                &azure.api_version,
            )));
        }
        if let Some(anthropic) = &settings.anthropic {
            registry.register(Arc::new(AnthropicGenerator::new(&anthropic.api_key, &anthropic.model)));
        }
        if let Some(gemini) = &settings.gemini {
            registry.register(Arc::new(GeminiGenerator::new(
                &gemini.api_key,
                &gemini.model,
                settings.rate_limit_backoff,
            )));
        }

        if !registry.generators.contains_key(&registry.default) {
            tracing::warn!("Default AI provider {} has no credentials configured", registry.default);
        }
        registry
    }

    pub fn register(&mut self, generator: Arc<dyn TestCaseGenerator>) -> &mut Self {
        self.generators.insert(generator.provider(), generator);
        self
    }

    pub fn default_provider(&self) -> ProviderKind {
        self.default
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        self.generators.keys().copied().collect()
    }

    /// Looks up `name`, falling back to the configured default when absent.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn TestCaseGenerator>, GeneratorError> {
        let kind = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.parse()?,
            None => self.default,
        };
        self.generators
            .get(&kind)
            .cloned()
            .ok_or(GeneratorError::NotConfigured(kind))
    }
}
