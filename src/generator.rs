use crate::api::elevenlabs::ElevenLabsVoice;
use crate::api::openai::OpenAiIdeas;
use crate::api::runway::RunwayProvider;
use crate::api::build_client;
use crate::config::{Config, Credentials};
use crate::error::{PipelineError, Stage, StageFailure};
use crate::ffmpeg::{FfmpegMerger, MediaMerger};
use crate::idea::{IdeaRecord, IdeaSource};
use crate::init;
use crate::video::{self, PollPolicy, VideoProvider};
use crate::voice::{self, VoiceSynthesizer};
use crate::{logi, logok, logw};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Deletes intermediate files. Missing files are skipped and failures are
/// only logged.
pub async fn cleanup(paths: &[PathBuf]) -> CleanupReport {
    logi("Cleaning up intermediate files...");
    let mut report = CleanupReport::default();
    for path in paths {
        if fs::metadata(path).await.is_err() {
            continue;
        }
        match fs::remove_file(path).await {
            Ok(()) => {
                logi(format!("  - Removed: {}", path.display()));
                report.removed.push(path.clone());
            }
            Err(err) => {
                logw(format!("Could not remove {}: {}", path.display(), err));
                report.failed.push((path.clone(), err.to_string()));
            }
        }
    }
    report
}

#[derive(Debug)]
pub struct RunSummary {
    pub idea: IdeaRecord,
    pub output: PathBuf,
    pub cleanup: CleanupReport,
}

impl RunSummary {
    pub fn render(&self) -> String {
        format!(
            "Title: {}\nDescription: {}\nHashtags: {}",
            self.idea.title,
            self.idea.description,
            self.idea.hashtags_display()
        )
    }
}

fn at(stage: Stage) -> impl FnOnce(PipelineError) -> StageFailure {
    move |error| StageFailure { stage, error }
}

/// Idea -> Video -> Voice -> Merge -> Cleanup. The first failing stage ends
/// the run; later stages and cleanup are skipped.
pub struct Pipeline {
    cfg: Config,
    ideas: Box<dyn IdeaSource>,
    video: Box<dyn VideoProvider>,
    voice: Box<dyn VoiceSynthesizer>,
    merger: Box<dyn MediaMerger>,
    cancel: CancellationToken,
    keep_intermediates: bool,
}

impl Pipeline {
    pub fn new(
        cfg: Config,
        ideas: Box<dyn IdeaSource>,
        video: Box<dyn VideoProvider>,
        voice: Box<dyn VoiceSynthesizer>,
        merger: Box<dyn MediaMerger>,
    ) -> Self {
        Self {
            cfg,
            ideas,
            video,
            voice,
            merger,
            cancel: CancellationToken::new(),
            keep_intermediates: false,
        }
    }

    /// OpenAI, Runway, ElevenLabs and the configured ffmpeg binary.
    pub fn from_config(cfg: Config, creds: &Credentials, client: reqwest::Client) -> Self {
        let ideas = OpenAiIdeas::new(client.clone(), &cfg, creds.openai());
        let video = RunwayProvider::new(client.clone(), &cfg, creds.runway());
        let voice = ElevenLabsVoice::new(client, &cfg, creds.eleven());
        let merger = FfmpegMerger::new(cfg.ffmpeg_bin.clone());
        Self::new(
            cfg,
            Box::new(ideas),
            Box::new(video),
            Box::new(voice),
            Box::new(merger),
        )
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.cfg.poll_interval(),
            max_attempts: self.cfg.max_poll_attempts,
        }
    }

    async fn idea_stage(&self, path: &Path) -> crate::error::Result<IdeaRecord> {
        logi("Step 1: generating the idea...");
        let idea = self.ideas.generate().await?;
        idea.save(path).await?;
        logok(format!("Idea generated and saved: \"{}\"", idea.title));
        Ok(idea)
    }

    pub async fn run(&self) -> Result<RunSummary, StageFailure> {
        let idea_path = self.cfg.idea_path();
        let clip_path = self.cfg.clip_path();
        let voice_path = self.cfg.voice_path();
        let output = self.cfg.output_path();

        let idea = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            idea = self.idea_stage(&idea_path) => idea,
        }
        .map_err(at(Stage::Idea))?;

        logi(format!("Step 2: generating the video with {}...", self.video.name()));
        video::generate_video(
            self.video.as_ref(),
            &idea.runway_prompt,
            self.cfg.video_duration_secs,
            self.poll_policy(),
            &self.cancel,
            &clip_path,
        )
        .await
        .map_err(at(Stage::Video))?;

        logi(format!("Step 3: generating the voice-over with {}...", self.voice.name()));
        if self.cancel.is_cancelled() {
            return Err(at(Stage::Voice)(PipelineError::Cancelled));
        }
        voice::generate_voice(self.voice.as_ref(), &idea.voice, &voice_path)
            .await
            .map_err(at(Stage::Voice))?;

        logi("Step 4: merging audio and video...");
        if self.cancel.is_cancelled() {
            return Err(at(Stage::Merge)(PipelineError::Cancelled));
        }
        self.merger
            .merge(&clip_path, &voice_path, &output)
            .await
            .map_err(at(Stage::Merge))?;

        let cleanup = if self.keep_intermediates {
            logi("Keeping intermediate files.");
            CleanupReport::default()
        } else {
            cleanup(&self.cfg.intermediate_paths()).await
        };

        Ok(RunSummary {
            idea,
            output,
            cleanup,
        })
    }
}

/// Runs one full generation and returns the process exit code.
pub async fn run_generation(
    cfg: Config,
    creds: Credentials,
    cancel: CancellationToken,
    keep_intermediates: bool,
) -> Result<i32> {
    init::ensure_directories(&cfg).await?;
    if !init::check_ffmpeg(&cfg.ffmpeg_bin).await {
        logw(format!("'{}' not found in PATH. Please install FFmpeg.", cfg.ffmpeg_bin));
    }

    let client = build_client()?;
    let pipeline = Pipeline::from_config(cfg, &creds, client)
        .with_cancel(cancel)
        .keep_intermediates(keep_intermediates);

    logi("Starting the AI short-video pipeline");
    match pipeline.run().await {
        Ok(summary) => {
            logok(format!("Done! The video is ready: {}", summary.output.display()));
            println!("{}", summary.render());
            Ok(0)
        }
        Err(failure) => {
            eprintln!("Stopping: {}", failure.report());
            Ok(1)
        }
    }
}
