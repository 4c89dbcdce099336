use crate::error::{PipelineError, Result};
use crate::logw;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use tokio::fs;

pub const REQUIRED_FIELDS: [&str; 5] = ["title", "description", "hashtags", "voice", "runway_prompt"];

/// Length the prompt asks for; the model does not always comply.
pub const DESCRIPTION_CHARS: RangeInclusive<usize> = 140..=250;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("valid regex"));

/// Source of an idea for one run.
#[async_trait]
pub trait IdeaSource: Send + Sync {
    async fn generate(&self) -> Result<IdeaRecord>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaRecord {
    pub title: String,
    pub description: String,
    /// Space separated, without `#`.
    pub hashtags: String,
    /// Narration script for speech synthesis.
    pub voice: String,
    /// Prompt for the video model.
    pub runway_prompt: String,
}

impl IdeaRecord {
    /// Parses a completion into a record, rejecting anything that lacks one of
    /// the required string fields. Extra keys are ignored.
    pub fn from_json(text: &str) -> Result<Self> {
        let body = strip_code_fence(text);
        let root: serde_json::Value =
            serde_json::from_str(body).map_err(|e| PipelineError::MalformedResponse {
                service: "OpenAI",
                detail: format!("idea is not valid JSON: {e}"),
            })?;

        let obj = root.as_object().ok_or_else(|| PipelineError::MalformedResponse {
            service: "OpenAI",
            detail: "idea is not a JSON object".to_string(),
        })?;

        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|key| !obj.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingFields(missing));
        }

        for key in REQUIRED_FIELDS {
            if !obj[key].is_string() {
                return Err(PipelineError::InvalidField {
                    field: key,
                    reason: "must be a string",
                });
            }
        }

        let idea: IdeaRecord =
            serde_json::from_value(root).map_err(|e| PipelineError::MalformedResponse {
                service: "OpenAI",
                detail: e.to_string(),
            })?;
        idea.validate()?;
        Ok(idea)
    }

    pub fn validate(&self) -> Result<()> {
        let non_empty = [
            ("title", &self.title),
            ("voice", &self.voice),
            ("runway_prompt", &self.runway_prompt),
        ];
        for (field, value) in non_empty {
            if value.trim().is_empty() {
                return Err(PipelineError::InvalidField {
                    field,
                    reason: "must not be empty",
                });
            }
        }

        let desc_len = self.description.chars().count();
        if !DESCRIPTION_CHARS.contains(&desc_len) {
            logw(format!(
                "Idea description is {} chars (expected {}-{})",
                desc_len,
                DESCRIPTION_CHARS.start(),
                DESCRIPTION_CHARS.end()
            ));
        }

        let tag_count = self.hashtags.split_whitespace().count();
        if tag_count != 5 {
            logw(format!("Idea has {} hashtags (expected 5)", tag_count));
        }

        Ok(())
    }

    /// Hashtags as they should be posted: `#travel #sunset ...`.
    pub fn hashtags_display(&self) -> String {
        self.hashtags
            .split_whitespace()
            .map(|tag| format!("#{}", tag.trim_start_matches('#')))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| PipelineError::MalformedResponse {
            service: "OpenAI",
            detail: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io(parent, e))?;
        }
        fs::write(path, json)
            .await
            .map_err(|e| PipelineError::io(path, e))
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| PipelineError::io(path, e))?;
        Self::from_json(&text)
    }
}

fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sunset_json() -> serde_json::Value {
        serde_json::json!({
            "title": "Sunset Walk",
            "description": "A".repeat(160),
            "hashtags": "travel sunset vlog citylife mood",
            "voice": "Welcome to this quick evening walk...",
            "runway_prompt": "cinematic drone shot over a city at sunset",
        })
    }

    #[test]
    fn parses_complete_idea() {
        let idea = IdeaRecord::from_json(&sunset_json().to_string()).unwrap();
        assert_eq!(idea.title, "Sunset Walk");
        assert_eq!(idea.runway_prompt, "cinematic drone shot over a city at sunset");
        assert_eq!(idea.description.len(), 160);
    }

    #[test]
    fn each_missing_field_is_rejected() {
        for key in REQUIRED_FIELDS {
            let mut value = sunset_json();
            value.as_object_mut().unwrap().remove(key);
            match IdeaRecord::from_json(&value.to_string()) {
                Err(PipelineError::MissingFields(fields)) => assert_eq!(fields, vec![key]),
                other => panic!("expected MissingFields for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn reports_every_missing_field() {
        let err = IdeaRecord::from_json(r#"{"title": "x"}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "idea is missing required fields: description, hashtags, voice, runway_prompt"
        );
    }

    #[test]
    fn malformed_json_is_an_error_not_a_panic() {
        let err = IdeaRecord::from_json("{\"title\": ").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse { .. }));

        let err = IdeaRecord::from_json("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse { .. }));
    }

    #[test]
    fn non_string_field_is_rejected() {
        let mut value = sunset_json();
        value["hashtags"] = serde_json::json!(["travel", "sunset"]);
        let err = IdeaRecord::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidField { field: "hashtags", .. }));
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut value = sunset_json();
        value["title"] = serde_json::json!("  ");
        let err = IdeaRecord::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidField { field: "title", .. }));
    }

    #[test]
    fn unwraps_markdown_fence() {
        let text = format!("```json\n{}\n```", sunset_json());
        let idea = IdeaRecord::from_json(&text).unwrap();
        assert_eq!(idea.title, "Sunset Walk");
    }

    #[test]
    fn hashtags_get_single_hash_prefix() {
        let mut idea = IdeaRecord::from_json(&sunset_json().to_string()).unwrap();
        assert_eq!(idea.hashtags_display(), "#travel #sunset #vlog #citylife #mood");

        idea.hashtags = "#already  spaced".to_string();
        assert_eq!(idea.hashtags_display(), "#already #spaced");
    }

    #[tokio::test]
    async fn persisted_file_matches_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("idea.json");
        let mut idea = IdeaRecord::from_json(&sunset_json().to_string()).unwrap();
        idea.voice = "Bienvenue à cette balade".to_string();

        idea.save(&path).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Bienvenue à cette balade"));
        assert_eq!(IdeaRecord::load(&path).await.unwrap(), idea);
    }
}
