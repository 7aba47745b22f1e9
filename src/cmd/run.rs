use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use capburn::annotate::{CaptionPipeline, Compositor};
use capburn::Settings;

use super::with_platform_hwaccel;

/// Command-line values that take precedence over the config file
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub dir: Option<PathBuf>,
    pub lang: Option<String>,
    pub quality: Option<String>,
    pub timeout: Option<u64>,
    pub hwaccel: bool,
}

pub async fn cmd_run(url: &str, config: Option<&Path>, overrides: RunOverrides) -> Result<()> {
    let mut settings = Settings::load(config).context("failed to load settings")?;

    if let Some(dir) = overrides.dir {
        settings.download_dir = dir;
    }
    if let Some(lang) = overrides.lang {
        settings.language = lang;
    }
    if let Some(quality) = overrides.quality {
        settings.quality = quality;
    }
    if let Some(secs) = overrides.timeout {
        settings.process_timeout_secs = secs;
    }

    let pipeline_config = settings.pipeline_config()?;

    eprintln!("🎬 Source: {url}");
    eprintln!("   Directory: {}", pipeline_config.download_dir.display());
    eprintln!("   Captions: {}", pipeline_config.caption_language);

    let mut compositor_config = settings.compositor_config();
    if overrides.hwaccel {
        compositor_config = with_platform_hwaccel(compositor_config);
    }

    let ytdlp = Arc::new(settings.ytdlp_backend());
    let ffmpeg = Arc::new(settings.ffmpeg_backend());
    let pipeline = CaptionPipeline::new(
        pipeline_config,
        ytdlp.clone(),
        ytdlp,
        ffmpeg.clone(),
        ffmpeg,
        Arc::new(Compositor::with_config(compositor_config)),
    );

    let result = pipeline
        .run(url)
        .await
        .with_context(|| format!("caption pipeline failed for {url}"))?;

    eprintln!("\n✅ {} finished in {:.1}s", result.title, result.processing_time_secs);
    for step in &result.steps {
        eprintln!("   {:<14} {:<8} {}", step.stage, step.outcome, step.artifact.display());
    }

    if result.overlay_applied {
        eprintln!("   Captions burned: {}", result.caption_count);
    } else {
        eprintln!("   No captions burned; final video is the merged file");
    }

    println!("{}", result.final_path.display());
    Ok(())
}
