use std::path::Path;

use anyhow::{Context, Result};

use capburn::annotate::{plan_from_text, BaseTrack};

/// Print the render plan without touching any external tool.
///
/// The base track path is the captions path with an `.mp4` extension. Only
/// the given dimensions affect the layout.
pub fn cmd_plan(captions: &Path, width: u32, height: u32) -> Result<()> {
    let text = std::fs::read_to_string(captions)
        .with_context(|| format!("failed to read {}", captions.display()))?;

    let base = BaseTrack::new(captions.with_extension("mp4"), width, height);
    let plan = plan_from_text(&text, base)
        .with_context(|| format!("cannot plan overlays for {}", captions.display()))?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
