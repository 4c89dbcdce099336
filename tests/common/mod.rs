#![allow(dead_code)]

use ai_tiktok_shorts::idea::IdeaRecord;
use std::path::Path;
use std::process::Command;

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn sunset_idea() -> IdeaRecord {
    IdeaRecord {
        title: "Sunset Walk".to_string(),
        description: "An easy evening stroll through the old town as the sky turns orange, \
with rooftop views, street musicians and the river glowing gold under the last light of day."
            .to_string(),
        hashtags: "travel sunset vlog citylife mood".to_string(),
        voice: "Welcome to this quick evening walk...".to_string(),
        runway_prompt: "cinematic drone shot over a city at sunset".to_string(),
    }
}

pub fn sunset_json() -> String {
    serde_json::to_string(&sunset_idea()).unwrap()
}

pub fn ffmpeg_available() -> bool {
    let ok = |bin: &str| {
        Command::new(bin)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    };
    ok("ffmpeg") && ok("ffprobe")
}

fn ffmpeg(args: &[&str]) {
    let output = Command::new("ffmpeg").args(args).output().expect("run ffmpeg");
    assert!(
        output.status.success(),
        "ffmpeg failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Test-pattern clip with a keyframe on every frame so a stream copy can be
/// cut anywhere.
pub fn make_video(path: &Path, seconds: f64) {
    let src = format!("testsrc=duration={seconds}:size=320x240:rate=25");
    ffmpeg(&[
        "-y", "-hide_banner", "-loglevel", "error",
        "-f", "lavfi", "-i", &src,
        "-c:v", "mpeg4", "-g", "1",
        "-f", "mp4",
        path.to_str().unwrap(),
    ]);
}

pub fn make_audio(path: &Path, seconds: f64) {
    let src = format!("sine=frequency=440:duration={seconds}");
    ffmpeg(&[
        "-y", "-hide_banner", "-loglevel", "error",
        "-f", "lavfi", "-i", &src,
        "-f", "wav",
        path.to_str().unwrap(),
    ]);
}
