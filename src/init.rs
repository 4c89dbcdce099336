use crate::config::Config;
use crate::logi;
use anyhow::{Context, Result};
use tokio::fs;

/// Creates the work directory and the parent of the final output.
pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    let output = cfg.output_path();
    let dirs = [Some(cfg.work_dir.as_path()), output.parent()];
    for dir in dirs.into_iter().flatten() {
        if dir.as_os_str().is_empty() || dir.exists() {
            continue;
        }
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        logi(format!("Created directory: {}", dir.display()));
    }
    Ok(())
}

pub async fn check_ffmpeg(ffmpeg_bin: &str) -> bool {
    match tokio::process::Command::new(ffmpeg_bin)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
