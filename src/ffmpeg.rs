use crate::error::{PipelineError, Result};
use crate::{logi, logok, logw};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

/// Combines a video clip and a narration track into one file.
#[async_trait]
pub trait MediaMerger: Send + Sync {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// Muxes with the `ffmpeg` CLI: video stream copied, audio re-encoded to AAC,
/// output cut at the end of the shorter input.
#[derive(Debug, Clone)]
pub struct FfmpegMerger {
    ffmpeg_bin: String,
    ffprobe_bin: PathBuf,
}

impl FfmpegMerger {
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        let ffmpeg_bin = ffmpeg_bin.into();
        Self {
            ffprobe_bin: ffprobe_beside(&ffmpeg_bin),
            ffmpeg_bin,
        }
    }

    fn merge_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push("-i".into());
        args.push(video.into());
        args.push("-i".into());
        args.push(audio.into());
        args.extend(
            [
                "-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-b:a", "192k",
                "-shortest",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }
}

impl Default for FfmpegMerger {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// The `ffprobe` that ships next to `ffmpeg_bin`: same directory, same
/// suffix (`ffmpeg.exe` -> `ffprobe.exe`). Plain `ffprobe` from PATH when the
/// binary is not named `ffmpeg*`.
pub fn ffprobe_beside(ffmpeg_bin: &str) -> PathBuf {
    let bin = Path::new(ffmpeg_bin);
    let Some(suffix) = bin
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("ffmpeg"))
    else {
        return PathBuf::from("ffprobe");
    };
    bin.with_file_name(format!("ffprobe{suffix}"))
}

async fn require_input(path: &Path) -> Result<()> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(PipelineError::MissingInput(path.to_path_buf())),
    }
}

/// Runs `program` with `args`, capturing stderr so it can be reported.
async fn run_cmd(program: &str, args: &[OsString]) -> Result<()> {
    let output = match Command::new(program).args(args).output().await {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::TranscoderNotFound(program.to_string()));
        }
        Err(e) => return Err(PipelineError::io(PathBuf::from(program), e)),
    };

    if !output.status.success() {
        return Err(PipelineError::TranscoderFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}

#[async_trait]
impl MediaMerger for FfmpegMerger {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        require_input(video).await?;
        require_input(audio).await?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io(parent, e))?;
        }

        logi(format!(
            "Merging {} + {} -> {}",
            video.display(),
            audio.display(),
            output.display()
        ));
        run_cmd(&self.ffmpeg_bin, &Self::merge_args(video, audio, output)).await?;

        if fs::metadata(output).await.is_err() {
            return Err(PipelineError::MissingOutput(output.to_path_buf()));
        }

        match ffprobe_duration_seconds(&self.ffprobe_bin, output).await {
            Ok(dur) => logok(format!("Final video '{}' ({:.2}s)", output.display(), dur)),
            Err(err) => {
                logw(format!("Could not probe duration of {}: {}", output.display(), err));
                logok(format!("Final video '{}'", output.display()));
            }
        }
        Ok(())
    }
}

pub async fn ffprobe_duration_seconds(ffprobe_bin: impl AsRef<OsStr>, path: &Path) -> anyhow::Result<f64> {
    let output = Command::new(ffprobe_bin)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("ffprobe execution failed: {e}"))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.0 {
        return Err(anyhow::anyhow!("Invalid duration: {text:?}"));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_copy_video_and_stop_at_shortest() {
        let args = FfmpegMerger::merge_args(Path::new("clip.mp4"), Path::new("voice.mp3"), Path::new("out.mp4"));
        let joined = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(joined.contains("-i clip.mp4 -i voice.mp3"));
        assert!(joined.contains("-c:v copy"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-shortest"));
        assert_eq!(args.last().map(OsString::as_os_str), Some(OsStr::new("out.mp4")));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_reach_ffmpeg_unchanged() {
        use std::os::unix::ffi::OsStrExt;

        let video = Path::new(OsStr::from_bytes(b"clip-\xff.mp4"));
        let args = FfmpegMerger::merge_args(video, Path::new("voice.mp3"), Path::new("out.mp4"));
        assert!(args.iter().any(|a| a.as_os_str() == video.as_os_str()));
    }

    #[test]
    fn ffprobe_follows_configured_ffmpeg() {
        assert_eq!(ffprobe_beside("ffmpeg"), PathBuf::from("ffprobe"));
        assert_eq!(
            ffprobe_beside("/opt/ffmpeg-6/bin/ffmpeg"),
            PathBuf::from("/opt/ffmpeg-6/bin/ffprobe")
        );
        assert_eq!(ffprobe_beside("tools/ffmpeg.exe"), PathBuf::from("tools/ffprobe.exe"));
        assert_eq!(ffprobe_beside("/usr/local/bin/avconv"), PathBuf::from("ffprobe"));
    }

    #[tokio::test]
    async fn missing_input_aborts_before_transcoder() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("voice.mp3");
        std::fs::write(&audio, b"audio").unwrap();

        // An unresolvable binary would fail with TranscoderNotFound if it were run.
        let merger = FfmpegMerger::new("no-such-ffmpeg-binary");
        let err = merger
            .merge(&dir.path().join("clip.mp4"), &audio, &dir.path().join("out.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::MissingInput(p) if p.ends_with("clip.mp4")));
    }

    #[tokio::test]
    async fn empty_input_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        let audio = dir.path().join("voice.mp3");
        std::fs::write(&video, b"video").unwrap();
        std::fs::write(&audio, b"").unwrap();

        let err = FfmpegMerger::new("no-such-ffmpeg-binary")
            .merge(&video, &audio, &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(p) if p.ends_with("voice.mp3")));
    }

    #[tokio::test]
    async fn absent_transcoder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        let audio = dir.path().join("voice.mp3");
        std::fs::write(&video, b"video").unwrap();
        std::fs::write(&audio, b"audio").unwrap();

        let err = FfmpegMerger::new("no-such-ffmpeg-binary")
            .merge(&video, &audio, &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::TranscoderNotFound(bin) if bin == "no-such-ffmpeg-binary"));
    }
}
