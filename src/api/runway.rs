use crate::api::{ensure_success, trim_base};
use crate::config::{Config, RUNWAY_KEY_VAR, require_key};
use crate::error::{PipelineError, Result};
use crate::video::{JobHandle, JobOutput, JobStatus, VideoProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "Runway";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    duration_seconds: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<TaskOutput>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    video_url: Option<String>,
}

/// Runway v2 task API: `POST /v2/generate`, then `GET /v2/tasks/{id}`.
pub struct RunwayProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    download_timeout: Duration,
}

impl RunwayProvider {
    pub fn new(client: Client, cfg: &Config, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: trim_base(&cfg.runway_base_url),
            timeout: cfg.request_timeout(),
            download_timeout: cfg.download_timeout(),
        }
    }

    fn key(&self) -> Result<&str> {
        require_key(&self.api_key, RUNWAY_KEY_VAR)
    }
}

fn task_status(task: TaskResponse) -> Result<JobStatus> {
    let status = task.status.unwrap_or_default();
    match status.as_str() {
        "SUCCEEDED" => {
            let url = task
                .output
                .and_then(|o| o.video_url)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| PipelineError::MalformedResponse {
                    service: SERVICE,
                    detail: "SUCCEEDED task has no output.video_url".to_string(),
                })?;
            Ok(JobStatus::Succeeded(JobOutput { media_url: url }))
        }
        "FAILED" => Ok(JobStatus::Failed(
            task.error_message
                .unwrap_or_else(|| "unknown error".to_string()),
        )),
        "" => Ok(JobStatus::Pending("UNKNOWN".to_string())),
        other => Ok(JobStatus::Pending(other.to_string())),
    }
}

#[async_trait]
impl VideoProvider for RunwayProvider {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn submit(&self, prompt: &str, duration_secs: u32) -> Result<JobHandle> {
        let key = self.key()?;
        let body = GenerateRequest {
            prompt,
            duration_seconds: duration_secs,
        };

        let resp = self
            .client
            .post(format!("{}/v2/generate", self.base_url))
            .bearer_auth(key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(PipelineError::transport(SERVICE))?;

        let job: GenerateResponse = ensure_success(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| PipelineError::MalformedResponse {
                service: SERVICE,
                detail: format!("generate response: {e}"),
            })?;
        Ok(JobHandle(job.id))
    }

    async fn poll(&self, job: &JobHandle) -> Result<JobStatus> {
        let key = self.key()?;
        let resp = self
            .client
            .get(format!("{}/v2/tasks/{}", self.base_url, job.0))
            .bearer_auth(key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(PipelineError::transport(SERVICE))?;

        let task: TaskResponse = ensure_success(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| PipelineError::MalformedResponse {
                service: SERVICE,
                detail: format!("task response: {e}"),
            })?;
        task_status(task)
    }

    async fn fetch_result(&self, output: &JobOutput) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(&output.media_url)
            .timeout(self.download_timeout)
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
