//! Two-role query gateway to an OpenAI-compatible chat-completion endpoint.
//!
//! The *agent* role carries the publication's [`Ledger`] as context; the
//! *assistant* role gets a fresh two-turn context on every call and never
//! sees the ledger. Both roles use the same fixed sampling configuration and
//! wait [`GatewayConfig::call_delay`] before every dispatch to stay under the
//! endpoint's tokens-per-minute limit.
//!
//! Remote failures never escape [`Gateway::query`]: they are logged and the
//! call yields an empty string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::conversation::{Ledger, Turn};
use crate::error::{Result, SkgcError};
use crate::prompts::{AGENT_SYSTEM_PROMPT, ASSISTANT_SYSTEM_PROMPT};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_SEED: u64 = 4;

/// 10s keeps a full extraction+evaluation ledger (~5.5k tokens) under a
/// 30k tokens-per-minute limit.
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_secs(10);

pub const ENV_AGENT_KEY: &str = "API_KEY_AGENT";
pub const ENV_ASSISTANT_KEY: &str = "API_KEY_ASSISTANT";
pub const ENV_ORGANIZATION: &str = "ORGANIZATION";

/// Which LLM endpoint a query goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayRole {
    /// Performs extraction/evaluation with persistent context
    Agent,
    /// Checks and normalizes the agent's output format, stateless
    Assistant,
}

impl GatewayRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayRole::Agent => "agent",
            GatewayRole::Assistant => "assistant",
        }
    }
}

/// Sampling and pacing configuration shared by both roles.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub seed: u64,
    pub call_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            seed: DEFAULT_SEED,
            call_delay: DEFAULT_CALL_DELAY,
        }
    }
}

/// API keys for both roles plus the organization ID.
#[derive(Clone)]
pub struct Credentials {
    pub agent_key: String,
    pub assistant_key: String,
    pub organization: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("agent_key", &"<redacted>")
            .field("assistant_key", &"<redacted>")
            .field("organization", &self.organization)
            .finish()
    }
}

impl Credentials {
    /// Read `API_KEY_AGENT`, `API_KEY_ASSISTANT` and `ORGANIZATION`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup`. Missing or blank values are a
    /// [`SkgcError::Config`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    SkgcError::Config(format!("{} not found, set the environment variable", name))
                })
        };
        Ok(Self {
            agent_key: require(ENV_AGENT_KEY)?,
            assistant_key: require(ENV_ASSISTANT_KEY)?,
            organization: require(ENV_ORGANIZATION)?,
        })
    }

    fn auth(&self, role: GatewayRole) -> Auth<'_> {
        let api_key = match role {
            GatewayRole::Agent => &self.agent_key,
            GatewayRole::Assistant => &self.assistant_key,
        };
        Auth {
            api_key,
            organization: &self.organization,
        }
    }
}

/// Per-request authentication.
#[derive(Debug, Clone, Copy)]
pub struct Auth<'a> {
    pub api_key: &'a str,
    pub organization: &'a str,
}

/// OpenAI chat-completion request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    pub temperature: f32,
    pub seed: u64,
}

/// Token usage tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// One completed chat turn.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Transport for chat-completion requests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest, auth: Auth<'_>) -> Result<Completion>;
}

// ============================================================================
// OpenAI-compatible HTTP backend
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Backend speaking the OpenAI `/chat/completions` protocol over HTTP.
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SkgcError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatRequest, auth: Auth<'_>) -> Result<Completion> {
        let response = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", auth.api_key))
            .header("OpenAI-Organization", auth.organization)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SkgcError::Api {
                code: status.as_u16(),
                message: body,
            });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| SkgcError::Parse(format!("Failed to parse chat response: {}", e)))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(Completion {
            content: content.trim().to_string(),
            usage: api_response.usage,
        })
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// Accumulated token usage with atomic counters
#[derive(Default)]
struct AtomicTokenUsage {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

impl AtomicTokenUsage {
    fn add(&self, usage: &TokenUsage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
    }

    fn get(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }
}

/// Role-polymorphic entry point for every LLM call in the pipelines.
pub struct Gateway {
    backend: Box<dyn ChatBackend>,
    config: GatewayConfig,
    credentials: Credentials,
    usage: AtomicTokenUsage,
    calls: AtomicU64,
}

impl Gateway {
    pub fn new(
        backend: Box<dyn ChatBackend>,
        config: GatewayConfig,
        credentials: Credentials,
    ) -> Self {
        Self {
            backend,
            config,
            credentials,
            usage: AtomicTokenUsage::default(),
            calls: AtomicU64::new(0),
        }
    }

    /// HTTP gateway with credentials from the environment. Fails before any
    /// call is made if a credential is missing.
    pub fn from_env(config: GatewayConfig) -> Result<Self> {
        let credentials = Credentials::from_env()?;
        let backend = OpenAiBackend::new(config.base_url.clone())?;
        Ok(Self::new(Box::new(backend), config, credentials))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Send `prompt` to `role` and return the response text.
    ///
    /// For [`GatewayRole::Agent`] the prompt is appended to `ledger` as a
    /// user turn and the whole ledger is sent; the caller appends the
    /// verified answer afterwards. Without a ledger the agent gets a one-off
    /// context. [`GatewayRole::Assistant`] always gets its own system turn
    /// plus the prompt and leaves any ledger untouched.
    pub async fn query(&self, role: GatewayRole, prompt: &str, ledger: Option<&mut Ledger>) -> String {
        let messages = match (role, ledger) {
            (GatewayRole::Agent, Some(ledger)) => {
                ledger.push_prompt(prompt);
                ledger.turns().to_vec()
            }
            (GatewayRole::Agent, None) => {
                vec![Turn::system(AGENT_SYSTEM_PROMPT), Turn::user(prompt)]
            }
            (GatewayRole::Assistant, _) => {
                vec![Turn::system(ASSISTANT_SYSTEM_PROMPT), Turn::user(prompt)]
            }
        };

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            seed: self.config.seed,
        };

        if !self.config.call_delay.is_zero() {
            debug!(role = role.as_str(), delay_ms = self.config.call_delay.as_millis() as u64, "Waiting before call");
            tokio::time::sleep(self.config.call_delay).await;
        }

        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(role = role.as_str(), call, messages = request.messages.len(), "Sending chat request");

        match self.backend.complete(&request, self.credentials.auth(role)).await {
            Ok(completion) => {
                if let Some(usage) = &completion.usage {
                    self.usage.add(usage);
                }
                debug!(role = role.as_str(), call, chars = completion.content.len(), "Received response");
                completion.content
            }
            Err(e) => {
                error!(role = role.as_str(), call, error = %e, "Chat request failed, using empty response");
                String::new()
            }
        }
    }

    /// Agent call against the publication's ledger.
    pub async fn ask_agent(&self, prompt: &str, ledger: &mut Ledger) -> String {
        self.query(GatewayRole::Agent, prompt, Some(ledger)).await
    }

    /// Stateless assistant format check.
    pub async fn verify(&self, prompt: &str) -> String {
        self.query(GatewayRole::Assistant, prompt, None).await
    }

    /// One verified exchange: agent call on `ledger`, assistant check of the
    /// raw answer, then the checked text appended to `ledger`. The raw agent
    /// answer is never stored.
    pub async fn verified_exchange<F>(&self, ledger: &mut Ledger, prompt: &str, check_prompt: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        let raw = self.ask_agent(prompt, ledger).await;
        let verified = self.verify(&check_prompt(&raw)).await;
        ledger.push_verified(verified.as_str());
        verified
    }

    /// Total tokens reported by the endpoint so far.
    pub fn token_usage(&self) -> TokenUsage {
        self.usage.get()
    }

    /// Number of dispatched calls so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn log_usage(&self) {
        let usage = self.token_usage();
        info!(
            calls = self.call_count(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "Gateway usage"
        );
    }
}
