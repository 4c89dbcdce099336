pub mod elevenlabs;
pub mod openai;
pub mod runway;

use crate::error::{PipelineError, Result};
use anyhow::Context;
use reqwest::{Client, Response};

const BODY_SNIPPET_CHARS: usize = 800;

/// One client is shared by every stage; timeouts are set per request.
pub fn build_client() -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn snippet(raw: &str) -> String {
    raw.chars().take(BODY_SNIPPET_CHARS).collect()
}

/// Pulls `error.message` (or a top-level `message`/`detail`) out of an API
/// error body, falling back to the raw text.
pub(crate) fn error_detail(raw: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(raw).ok();
    let message = parsed.as_ref().and_then(|root| {
        root.get("error")
            .and_then(|err| err.get("message").or(Some(err)))
            .or_else(|| root.get("message"))
            .or_else(|| root.get("detail"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    });
    message.unwrap_or_else(|| snippet(raw.trim()))
}

/// Turns a non-2xx response into [`PipelineError::HttpStatus`].
pub(crate) async fn ensure_success(service: &'static str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let raw = resp.text().await.unwrap_or_default();
    Err(PipelineError::HttpStatus {
        service,
        status: status.as_u16(),
        body: error_detail(&raw),
    })
}

pub(crate) fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_prefers_nested_message() {
        let raw = r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error"}}"#;
        assert_eq!(error_detail(raw), "Incorrect API key");
    }

    #[test]
    fn error_detail_accepts_flat_shapes() {
        assert_eq!(error_detail(r#"{"error":"quota exceeded"}"#), "quota exceeded");
        assert_eq!(error_detail(r#"{"detail":"voice not found"}"#), "voice not found");
        assert_eq!(error_detail("  gateway timeout \n"), "gateway timeout");
    }

    #[test]
    fn snippet_is_char_bounded() {
        let long = "é".repeat(2000);
        assert_eq!(snippet(&long).chars().count(), BODY_SNIPPET_CHARS);
    }
}
