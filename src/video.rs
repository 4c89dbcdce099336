//! Provider-agnostic video generation.
//!
//! A hosted video model is driven through [`VideoProvider`]: submit a job,
//! poll it until it reaches a terminal status, then fetch the rendered media.
//! Only the binding in `api::runway` knows the wire format, so a provider API
//! change stays there.

use crate::error::{PipelineError, Result};
use crate::{logi, logok, logw};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio_util::sync::CancellationToken;

/// Opaque identifier of an in-progress render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub media_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Not terminal yet; carries the provider's status text for logging.
    Pending(String),
    Succeeded(JobOutput),
    Failed(String),
}

#[async_trait]
pub trait VideoProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn submit(&self, prompt: &str, duration_secs: u32) -> Result<JobHandle>;

    async fn poll(&self, job: &JobHandle) -> Result<JobStatus>;

    async fn fetch_result(&self, output: &JobOutput) -> Result<Vec<u8>>;
}

/// Fixed-interval polling with a hard cap on the number of status checks.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Waits for `job` to finish. Sleeps before every check, gives up after
/// `policy.max_attempts` checks, and returns early when `cancel` fires.
pub async fn wait_for_job(
    provider: &dyn VideoProvider,
    job: &JobHandle,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<JobOutput> {
    for attempt in 1..=policy.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            status = provider.poll(job) => status?,
        };

        match status {
            JobStatus::Pending(text) => {
                logi(format!(
                    "  - {} status: {} (poll {}/{})",
                    provider.name(),
                    text,
                    attempt,
                    policy.max_attempts
                ));
            }
            JobStatus::Succeeded(output) => {
                logi(format!("  - {} status: SUCCEEDED", provider.name()));
                return Ok(output);
            }
            JobStatus::Failed(detail) => {
                logw(format!("{} generation failed: {}", provider.name(), detail));
                return Err(PipelineError::JobFailed(detail));
            }
        }
    }

    Err(PipelineError::PollTimeout {
        job_id: job.0.clone(),
        attempts: policy.max_attempts,
    })
}

/// Runs a full render and writes the clip to `out_path`. Nothing is written
/// unless the job succeeds and the media download completes, and no job is
/// submitted once `cancel` has fired.
pub async fn generate_video(
    provider: &dyn VideoProvider,
    prompt: &str,
    duration_secs: u32,
    policy: PollPolicy,
    cancel: &CancellationToken,
    out_path: &Path,
) -> Result<()> {
    let job = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        job = provider.submit(prompt, duration_secs) => job?,
    };
    logi(format!("{} job submitted: {}", provider.name(), job));

    let output = wait_for_job(provider, &job, policy, cancel).await?;

    logi("  - Downloading clip...");
    let bytes = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        bytes = provider.fetch_result(&output) => bytes?,
    };
    if bytes.is_empty() {
        return Err(PipelineError::MalformedResponse {
            service: provider.name(),
            detail: format!("empty media at {}", output.media_url),
        });
    }

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(parent, e))?;
    }
    fs::write(out_path, &bytes)
        .await
        .map_err(|e| PipelineError::io(out_path, e))?;

    logok(format!("Video '{}' ready ({} bytes)", out_path.display(), bytes.len()));
    Ok(())
}
