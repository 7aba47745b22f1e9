//! ffmpeg-based video compositor for burning caption overlays
//!
//! Each placement of a [`RenderPlan`] becomes one `drawtext` filter that is
//! enabled only inside its time window. Caption text is written to scratch
//! files and referenced with `textfile=`, so it never needs filtergraph
//! escaping.

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::overlay::OverlayPlacement;
use super::timeline::RenderPlan;
use crate::error::{PipelineError, Result};
use crate::tool::{resolve, run_tool};

/// Trait for turning a render plan into an encoded video file
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `plan` to `output`, replacing any file there.
    async fn render(&self, plan: &RenderPlan, output: &Path) -> Result<()>;
}

/// Configuration for the compositor
#[derive(Debug, Clone)]
pub struct CompositorConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Video codec for the re-encoded output
    pub video_codec: String,
    /// Audio codec (None = copy)
    pub audio_codec: Option<String>,
    /// Encoder preset (e.g., "medium")
    pub preset: Option<String>,
    /// Constant rate factor for x264-style encoders
    pub crf: Option<u32>,
    /// Hardware acceleration (e.g., "videotoolbox", "cuda")
    pub hwaccel: Option<String>,
    /// Font family, resolved by fontconfig
    pub font: String,
    /// Text color (ffmpeg color name or 0xRRGGBB)
    pub font_color: String,
    /// Outline width in pixels (0 for none)
    pub border_width: u32,
    /// Average glyph width as a fraction of the font size, used for wrapping
    pub glyph_width_ratio: f64,
    /// Upper bound for one encode
    pub timeout: Duration,
    /// Where per-render text files are written
    pub scratch_dir: PathBuf,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: resolve("ffmpeg"),
            video_codec: "libx264".to_string(),
            audio_codec: None,
            preset: None,
            crf: None,
            hwaccel: None,
            font: "Arial".to_string(),
            font_color: "white".to_string(),
            border_width: 0,
            glyph_width_ratio: 0.5,
            timeout: Duration::from_secs(3600),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl CompositorConfig {
    /// Enable hardware acceleration
    #[must_use]
    pub fn with_hwaccel(mut self, accel: &str) -> Self {
        self.hwaccel = Some(accel.to_string());

        // Encoders that take the software frames drawtext produces. Others
        // (vaapi) decode in hardware and encode with libx264.
        self.video_codec = match accel {
            "videotoolbox" => "h264_videotoolbox".to_string(),
            "cuda" | "nvenc" => "h264_nvenc".to_string(),
            "qsv" => "h264_qsv".to_string(),
            _ => "libx264".to_string(),
        };

        self
    }
}

/// ffmpeg-based video compositor
pub struct Compositor {
    config: CompositorConfig,
}

impl Compositor {
    /// Create a new compositor with custom config
    #[must_use]
    pub fn with_config(config: CompositorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Characters that fit on one line of a placement's text box
    fn max_line_chars(&self, placement: &OverlayPlacement) -> usize {
        let glyph = f64::from(placement.font_size) * self.config.glyph_width_ratio;
        if glyph <= 0.0 {
            return usize::MAX;
        }
        ((f64::from(placement.box_width) / glyph).floor() as usize).max(1)
    }

    /// Build the drawtext chain, one filter per placement, in plan order
    fn build_filter_complex(&self, plan: &RenderPlan, text_files: &[PathBuf]) -> String {
        let mut filters = Vec::with_capacity(plan.placements.len());

        for (placement, text_file) in plan.placements.iter().zip(text_files) {
            let (x, y) = placement.position.to_drawtext_position();

            let mut drawtext = format!(
                "drawtext=textfile='{path}':expansion=none:\
                 font='{font}':fontsize={fontsize}:fontcolor={color}:\
                 x={x}:y={y}",
                path = escape_filter_value(&text_file.to_string_lossy()),
                font = escape_filter_value(&self.config.font),
                fontsize = placement.font_size,
                color = self.config.font_color,
            );

            if self.config.border_width > 0 {
                let _ = write!(drawtext, ":borderw={}:bordercolor=black", self.config.border_width);
            }

            // Half-open window so back-to-back cues never share a frame
            let _ = write!(
                drawtext,
                ":enable='gte(t,{})*lt(t,{})'",
                placement.start_offset,
                placement.end_offset()
            );

            filters.push(drawtext);
        }

        filters.join(",")
    }

    /// Build ffmpeg arguments
    fn build_args(&self, input: &Path, output: &Path, filter_complex: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "warning", "-nostats"]
            .iter()
            .map(std::string::ToString::to_string)
            .collect();

        // Hardware acceleration
        if let Some(ref accel) = self.config.hwaccel {
            args.push("-hwaccel".to_string());
            args.push(accel.clone());
        }

        // Input
        args.push("-i".to_string());
        args.push(input.to_string_lossy().to_string());

        // Video filter
        if !filter_complex.is_empty() {
            args.push("-vf".to_string());
            args.push(filter_complex.to_string());
        }

        args.push("-c:v".to_string());
        args.push(self.config.video_codec.clone());

        if let Some(ref preset) = self.config.preset {
            args.push("-preset".to_string());
            args.push(preset.clone());
        }

        if let Some(crf) = self.config.crf {
            args.push("-crf".to_string());
            args.push(crf.to_string());
        }

        args.push("-c:a".to_string());
        args.push(
            self.config
                .audio_codec
                .clone()
                .unwrap_or_else(|| "copy".to_string()),
        );

        args.push("-y".to_string()); // Overwrite
        args.push(output.to_string_lossy().to_string());

        args
    }

    /// Write each placement's wrapped text to its own file under `staging`
    async fn write_text_files(&self, plan: &RenderPlan, staging: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::with_capacity(plan.placements.len());
        for (i, placement) in plan.placements.iter().enumerate() {
            let path = staging.join(format!("cue-{i:05}.txt"));
            let text = wrap_text(&placement.text, self.max_line_chars(placement));
            fs::write(&path, text).await?;
            files.push(path);
        }
        Ok(files)
    }

    /// Composite the plan's overlays onto its base track, writing `output`
    pub async fn composite_to_file(&self, plan: &RenderPlan, output: &Path) -> Result<()> {
        let staging = self
            .config
            .scratch_dir
            .join(format!("capburn-render-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&staging).await?;

        let result = self.run_encode(plan, output, &staging).await;

        // Cleanup
        let _ = fs::remove_dir_all(&staging).await;

        result
    }

    async fn run_encode(&self, plan: &RenderPlan, output: &Path, staging: &Path) -> Result<()> {
        let text_files = self.write_text_files(plan, staging).await?;
        let filter = self.build_filter_complex(plan, &text_files);
        let args = self.build_args(&plan.base.path, output, &filter);

        debug!(
            "Rendering {} overlays onto {:?}",
            plan.placements.len(),
            plan.base.path
        );

        run_tool(&self.config.ffmpeg_path, &args, self.config.timeout)
            .await
            .map_err(|e| {
                e.into_error("ffmpeg", |reason| PipelineError::RenderFailed {
                    output: output.to_path_buf(),
                    reason,
                })
            })?;

        debug!("Composited video to {:?}", output);
        Ok(())
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::with_config(CompositorConfig::default())
    }
}

#[async_trait]
impl Renderer for Compositor {
    async fn render(&self, plan: &RenderPlan, output: &Path) -> Result<()> {
        self.composite_to_file(plan, output).await
    }
}

/// Escape a value for use inside a single-quoted filtergraph option
fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Word wrap each line of `text` to at most `max_chars` characters.
///
/// Words longer than a line stay whole on a line of their own. Existing
/// line breaks are kept; nothing is dropped.
fn wrap_text(text: &str, max_chars: usize) -> String {
    let mut lines = Vec::new();

    for source_line in text.lines() {
        let mut current_line = String::new();
        let mut current_len = 0usize;

        for word in source_line.split_whitespace() {
            let word_len = word.chars().count();
            if current_line.is_empty() {
                current_line.push_str(word);
                current_len = word_len;
            } else if current_len + 1 + word_len <= max_chars {
                current_line.push(' ');
                current_line.push_str(word);
                current_len += 1 + word_len;
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line.push_str(word);
                current_len = word_len;
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    lines.join("\n")
}
