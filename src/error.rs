use std::fmt;
use std::path::PathBuf;

/// Errors raised by a single pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("API key '{0}' is not set in the environment")]
    MissingCredential(&'static str),

    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    HttpStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} returned a malformed response: {detail}")]
    MalformedResponse {
        service: &'static str,
        detail: String,
    },

    #[error("idea is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("idea field '{field}' is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("video generation failed: {0}")]
    JobFailed(String),

    #[error("video job {job_id} still not finished after {attempts} polls")]
    PollTimeout { job_id: String, attempts: u32 },

    #[error("cancelled")]
    Cancelled,

    #[error("input file is missing or empty: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("transcoder '{0}' was not found; make sure FFmpeg is installed and in PATH")]
    TranscoderNotFound(String),

    #[error("transcoder exited with {status}: {stderr}")]
    TranscoderFailed { status: String, stderr: String },

    #[error("transcoder finished but produced no file at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { service, source }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idea,
    Video,
    Voice,
    Merge,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idea => "idea",
            Stage::Video => "video",
            Stage::Voice => "voice",
            Stage::Merge => "merge",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// The stage that aborted a run and why.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

impl StageFailure {
    /// The failure followed by every underlying cause its text does not
    /// already include, `: `-separated.
    pub fn report(&self) -> String {
        let mut text = self.to_string();
        let mut cause = std::error::Error::source(&self.error);
        while let Some(err) = cause {
            let line = err.to_string();
            if !text.contains(&line) {
                text.push_str(": ");
                text.push_str(&line);
            }
            cause = err.source();
        }
        text
    }
}
