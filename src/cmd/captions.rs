use std::path::Path;

use anyhow::{Context, Result};

use capburn::stream::AcquisitionService;
use capburn::Settings;

pub async fn cmd_captions(url: &str, config: Option<&Path>) -> Result<()> {
    let settings = Settings::load(config).context("failed to load settings")?;
    let backend = settings.ytdlp_backend();

    let media = backend
        .describe(url)
        .await
        .with_context(|| format!("could not read metadata for {url}"))?;

    eprintln!("📺 {}", media.title);

    if media.caption_languages.is_empty() {
        eprintln!("   No uploaded captions");
        return Ok(());
    }

    for language in &media.caption_languages {
        let marker = if *language == settings.language { " (selected)" } else { "" };
        println!("{language}{marker}");
    }

    Ok(())
}
