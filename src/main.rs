use ai_tiktok_shorts::config::{Config, Credentials};
use ai_tiktok_shorts::generator::run_generation;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ai-tiktok-shorts")]
#[command(about = "Generate a narrated short video from an AI idea", long_about = None)]
struct Args {
    /// JSON config file; defaults apply when it does not exist
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Directory for the idea, clip and voice-over files
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Final video path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target clip duration in seconds
    #[arg(short, long)]
    duration: Option<u32>,

    /// Leave the intermediate files on disk after a successful run
    #[arg(long)]
    keep_intermediates: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = Config::load(&args.config).await?;
    if let Some(dir) = args.work_dir {
        cfg.work_dir = dir;
    }
    if let Some(output) = args.output {
        cfg.output_file = output;
    }
    if let Some(duration) = args.duration {
        cfg.video_duration_secs = duration;
    }
    cfg.validate()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping (press Ctrl-C again to quit now)");
            on_signal.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let code = run_generation(cfg, Credentials::from_env(), cancel, args.keep_intermediates).await?;
    std::process::exit(code);
}
