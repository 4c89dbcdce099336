use crate::api::{ensure_success, trim_base};
use crate::config::{Config, ELEVEN_KEY_VAR, require_key};
use crate::error::{PipelineError, Result};
use crate::voice::VoiceSynthesizer;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const SERVICE: &str = "ElevenLabs";

pub struct ElevenLabsVoice {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    voice_id: String,
    model_id: String,
    timeout: Duration,
}

impl ElevenLabsVoice {
    pub fn new(client: Client, cfg: &Config, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: trim_base(&cfg.elevenlabs_base_url),
            voice_id: cfg.eleven_voice_id.clone(),
            model_id: cfg.eleven_model_id.clone(),
            timeout: cfg.download_timeout(),
        }
    }

    fn url(&self) -> String {
        format!("{}/v1/text-to-speech/{}/stream", self.base_url, self.voice_id)
    }
}

#[async_trait]
impl VoiceSynthesizer for ElevenLabsVoice {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let key = require_key(&self.api_key, ELEVEN_KEY_VAR)?;

        let body = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
        });

        let resp = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .header("xi-api-key", key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(PipelineError::transport(SERVICE))?;

        let bytes = ensure_success(SERVICE, resp)
            .await?
            .bytes()
            .await
            .map_err(PipelineError::transport(SERVICE))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_uses_configured_voice() {
        let cfg = Config {
            elevenlabs_base_url: "http://localhost:8080/".to_string(),
            eleven_voice_id: "voice123".to_string(),
            ..Config::default()
        };
        let voice = ElevenLabsVoice::new(Client::new(), &cfg, None);
        assert_eq!(voice.url(), "http://localhost:8080/v1/text-to-speech/voice123/stream");
    }

    #[tokio::test]
    async fn missing_key_is_reported_by_name() {
        let voice = ElevenLabsVoice::new(Client::new(), &Config::default(), None);
        let err = voice.synthesize("hi").await.unwrap_err();
        assert_eq!(err.to_string(), "API key 'ELEVEN_KEY' is not set in the environment");
    }
}
