//! `capburn` CLI - download a video and burn its captions into the picture

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "capburn")]
#[command(about = "Download a video and burn its caption track into the picture")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/capburn/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug output, including external tool arguments
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, merge, fetch captions and burn them in
    Run {
        /// Video page URL
        #[arg(value_parser = parse_url)]
        url: url::Url,

        /// Directory for downloads and outputs
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Caption language (e.g., en-US, fi)
        #[arg(short, long)]
        lang: Option<String>,

        /// Video quality: best, worst, or a height like 720
        #[arg(short, long)]
        quality: Option<String>,

        /// Timeout for each external tool, in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Use hardware-accelerated encoding
        #[arg(long)]
        hwaccel: bool,
    },

    /// List the caption languages a video offers
    Captions {
        /// Video page URL
        #[arg(value_parser = parse_url)]
        url: url::Url,
    },

    /// Burn a local SubRip file into a local video
    Burn {
        /// Input video
        video: PathBuf,

        /// SubRip caption file
        captions: PathBuf,

        /// Output file (default: <video>_with_subs.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use hardware-accelerated encoding
        #[arg(long)]
        hwaccel: bool,
    },

    /// Print the overlay plan for a caption file as JSON
    Plan {
        /// SubRip caption file
        captions: PathBuf,

        /// Video width in pixels
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Video height in pixels
        #[arg(long, default_value = "1080")]
        height: u32,
    },
}

fn parse_url(s: &str) -> Result<url::Url, String> {
    let url = url::Url::parse(s).map_err(|e| format!("invalid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported URL scheme {other:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (RUST_LOG wins over -v)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            url,
            dir,
            lang,
            quality,
            timeout,
            hwaccel,
        } => {
            let overrides = cmd::RunOverrides {
                dir,
                lang,
                quality,
                timeout,
                hwaccel,
            };
            cmd::cmd_run(url.as_str(), config, overrides).await?;
        }
        Commands::Captions { url } => {
            cmd::cmd_captions(url.as_str(), config).await?;
        }
        Commands::Burn {
            video,
            captions,
            output,
            hwaccel,
        } => {
            cmd::cmd_burn(&video, &captions, output, config, hwaccel).await?;
        }
        Commands::Plan {
            captions,
            width,
            height,
        } => {
            cmd::cmd_plan(&captions, width, height)?;
        }
    }

    Ok(())
}
