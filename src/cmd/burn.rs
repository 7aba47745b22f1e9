use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use capburn::annotate::{burn_captions, Compositor};
use capburn::Settings;

use super::with_platform_hwaccel;

pub async fn cmd_burn(
    video: &Path,
    captions: &Path,
    output: Option<PathBuf>,
    config: Option<&Path>,
    hwaccel: bool,
) -> Result<()> {
    let settings = Settings::load(config).context("failed to load settings")?;
    let output = output.unwrap_or_else(|| default_output(video));

    eprintln!("🎬 Burning captions: {}", captions.display());
    eprintln!("   Video: {}", video.display());
    eprintln!("   Output: {}", output.display());

    let mut compositor_config = settings.compositor_config();
    if hwaccel {
        compositor_config = with_platform_hwaccel(compositor_config);
    }

    let text = tokio::fs::read_to_string(captions)
        .await
        .with_context(|| format!("failed to read {}", captions.display()))?;

    let start = std::time::Instant::now();
    let plan = burn_captions(
        &settings.ffmpeg_backend(),
        &Compositor::with_config(compositor_config),
        video,
        &text,
        &output,
    )
    .await
    .with_context(|| format!("failed to burn captions into {}", video.display()))?;

    eprintln!("\n✅ Burn complete in {:.1}s", start.elapsed().as_secs_f64());
    eprintln!("   Captions: {}", plan.placements.len());
    eprintln!(
        "   Frame: {}x{}, font size {}",
        plan.base.width, plan.base.height, plan.geometry.font_size
    );

    Ok(())
}

/// `clip.webm` -> `clip_with_subs.mp4`, next to the input
fn default_output(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map_or_else(|| "video".to_string(), |s| s.to_string_lossy().to_string());
    video.with_file_name(format!("{stem}_with_subs.mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("dl/My clip.webm")),
            PathBuf::from("dl/My clip_with_subs.mp4")
        );
    }
}
