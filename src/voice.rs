use crate::error::{PipelineError, Result};
use crate::{logi, logok};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

/// Text-to-speech backend. Returns the encoded audio as produced by the
/// service.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

pub async fn generate_voice(synth: &dyn VoiceSynthesizer, text: &str, out_path: &Path) -> Result<()> {
    logi(format!("Synthesizing narration with {} ({} chars)...", synth.name(), text.chars().count()));
    let audio = synth.synthesize(text).await?;
    if audio.is_empty() {
        return Err(PipelineError::MalformedResponse {
            service: synth.name(),
            detail: "empty audio body".to_string(),
        });
    }

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(parent, e))?;
    }
    fs::write(out_path, &audio)
        .await
        .map_err(|e| PipelineError::io(out_path, e))?;

    logok(format!("Voice-over '{}' ready ({} bytes)", out_path.display(), audio.len()));
    Ok(())
}
