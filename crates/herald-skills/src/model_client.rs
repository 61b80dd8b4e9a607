//! Model client: mock (deterministic, offline) or live (OpenAI-compatible chat completions).
//! Backs structured classification and free-form replies.

use herald_core::{CollaboratorError, ContentGenerator, RuleClassifier, StructuredClassifier};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_LLM_MODE: &str = "HERALD_LLM_MODE";
const ENV_LLM_API_URL: &str = "HERALD_LLM_API_URL";
const ENV_LLM_API_KEY: &str = "HERALD_LLM_API_KEY";
const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
const ENV_LLM_MODEL: &str = "HERALD_LLM_MODEL";
const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Marker the classification prompt puts in front of the quoted request.
const REQUEST_MARKER: &str = "Request:\n\"";

/// Mock returns simulated output; live calls the configured endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

impl LlmMode {
    fn from_env() -> Self {
        match std::env::var(ENV_LLM_MODE).as_deref() {
            Ok("live") => LlmMode::Live,
            _ => LlmMode::Mock,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: String,
}

pub struct ModelClient {
    mode: LlmMode,
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl Default for ModelClient {
    fn default() -> Self {
        Self::with_mode(LlmMode::Mock)
    }
}

impl ModelClient {
    /// Mode, endpoint, key and model from `HERALD_LLM_*` (key falls back to `OPENROUTER_API_KEY`).
    pub fn from_env() -> Self {
        let api_key = std::env::var(ENV_LLM_API_KEY)
            .or_else(|_| std::env::var(ENV_OPENROUTER_API_KEY))
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self {
            mode: LlmMode::from_env(),
            client: reqwest::Client::new(),
            api_url: std::env::var(ENV_LLM_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key,
            model: std::env::var(ENV_LLM_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn with_mode(mode: LlmMode) -> Self {
        Self {
            mode,
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn mode(&self) -> LlmMode {
        self.mode
    }

    /// Deterministic classification: the quoted request is run through the keyword rules and
    /// answered in the schema a live model would use.
    fn mock_classify(&self, prompt: &str) -> String {
        let Some(start) = prompt.find(REQUEST_MARKER).map(|i| i + REQUEST_MARKER.len()) else {
            return "{}".to_string();
        };
        let request = prompt[start..].rsplit_once('"').map(|(r, _)| r).unwrap_or(&prompt[start..]);
        let task = RuleClassifier::new().classify(request).task;
        serde_json::json!({
            "type": task.category.schema_label(),
            "details": task.details,
        })
        .to_string()
    }

    fn mock_reply(&self, utterance: &str) -> String {
        let preview: String = utterance.chars().take(80).collect();
        format!("[Mock LLM] You said: \"{preview}\". I'm running in offline mode, so I can't say much more.")
    }

    async fn live_generate(
        &self,
        system: Option<&str>,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CollaboratorError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            CollaboratorError::Rejected(format!("missing {ENV_LLM_API_KEY} or {ENV_OPENROUTER_API_KEY}"))
        })?;
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: prompt });
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        };

        tracing::debug!(target: "herald::model", model = %self.model, len = prompt.len(), "dispatching model request");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(key)
            .header("X-Title", "Herald")
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(target: "herald::model", %status, "model endpoint returned an error");
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                CollaboratorError::Unavailable(format!("HTTP {status}"))
            } else {
                CollaboratorError::Rejected(format!("HTTP {status}: {}", text.chars().take(200).collect::<String>()))
            });
        }
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CollaboratorError::Malformed("no choices in response".into()))
    }
}

/// Maps a reqwest failure onto the collaborator taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Timeout
    } else if err.is_decode() {
        CollaboratorError::Malformed(err.to_string())
    } else {
        CollaboratorError::Unavailable(err.to_string())
    }
}

#[async_trait::async_trait]
impl StructuredClassifier for ModelClient {
    async fn classify(&self, prompt: &str) -> Result<String, CollaboratorError> {
        match self.mode {
            LlmMode::Mock => Ok(self.mock_classify(prompt)),
            LlmMode::Live => self.live_generate(None, prompt, 0.0, 256).await,
        }
    }
}

#[async_trait::async_trait]
impl ContentGenerator for ModelClient {
    async fn reply(&self, utterance: &str) -> Result<String, CollaboratorError> {
        match self.mode {
            LlmMode::Mock => Ok(self.mock_reply(utterance)),
            LlmMode::Live => {
                self.live_generate(
                    Some("You are Herald, a concise and friendly voice assistant. Answer in one or two short sentences."),
                    utterance,
                    0.7,
                    300,
                )
                .await
            }
        }
    }
}
