use crate::api::{ensure_success, snippet, trim_base};
use crate::config::{Config, OPENAI_KEY_VAR, require_key};
use crate::error::{PipelineError, Result};
use crate::idea::{IdeaRecord, IdeaSource};
use crate::{logi, logw};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SERVICE: &str = "OpenAI";

pub const IDEA_PROMPT: &str = "You are a strict JSON generator. Reply ONLY with a JSON object \
containing the keys: \"title\", \"description\", \"hashtags\", \"voice\", \"runway_prompt\". \
The description must be between 140 and 250 characters. \
The hashtags must be a single string of 5 keywords without the #, separated by spaces.";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Idea generation through the chat completions endpoint in JSON mode.
pub struct OpenAiIdeas {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiIdeas {
    pub fn new(client: Client, cfg: &Config, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: trim_base(&cfg.openai_base_url),
            model: cfg.openai_model.clone(),
            temperature: cfg.openai_temperature,
            timeout: cfg.request_timeout(),
        }
    }

    fn request_body(&self) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": IDEA_PROMPT},
            ],
            "temperature": self.temperature,
            "response_format": {"type": "json_object"},
        })
    }
}

fn extract_completion_text(raw: &str) -> Result<String> {
    let completion: ChatCompletion =
        serde_json::from_str(raw).map_err(|e| PipelineError::MalformedResponse {
            service: SERVICE,
            detail: format!("unexpected completion body: {e}"),
        })?;

    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| PipelineError::MalformedResponse {
            service: SERVICE,
            detail: "completion has no message content".to_string(),
        })
}

#[async_trait]
impl IdeaSource for OpenAiIdeas {
    async fn generate(&self) -> Result<IdeaRecord> {
        let key = require_key(&self.api_key, OPENAI_KEY_VAR)?;
        logi(format!("Requesting idea from {} ({})...", SERVICE, self.model));

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&self.request_body())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(PipelineError::transport(SERVICE))?;

        let resp = ensure_success(SERVICE, resp).await?;
        let raw = resp.text().await.map_err(PipelineError::transport(SERVICE))?;

        let text = extract_completion_text(&raw)?;
        IdeaRecord::from_json(&text).inspect_err(|_| {
            logw(format!("{} idea body: {}", SERVICE, snippet(&text)));
        })
    }
}
