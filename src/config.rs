//! Settings loaded from `~/.config/capburn/config.toml`.
//!
//! Every key is optional. Command-line flags override what is read here.
//!
//! ```toml
//! download_dir = "/srv/videos/captioned"
//! language = "en-GB"
//! quality = "1080"
//! process_timeout_secs = 1800
//!
//! [tools]
//! ytdlp = "/opt/bin/yt-dlp"
//! ytdlp_args = ["--cookies-from-browser", "firefox"]
//!
//! [render]
//! font = "DejaVu Sans"
//! border_width = 2
//! hwaccel = "videotoolbox"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::annotate::{CompositorConfig, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::stream::backends::{FfmpegBackend, YtDlpBackend};
use crate::stream::StreamQuality;

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Where artifacts are written.
    pub download_dir: PathBuf,
    /// Caption language to burn in.
    pub language: String,
    /// `best`, `worst`, or a target height such as `720`.
    pub quality: String,
    /// Upper bound for any single external tool run.
    pub process_timeout_secs: u64,
    /// Video/audio duration gap tolerated before warning.
    pub duration_tolerance_secs: f64,
    pub tools: ToolSettings,
    pub render: RenderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("."),
            language: "en-US".to_string(),
            quality: "best".to_string(),
            process_timeout_secs: 3600,
            duration_tolerance_secs: 1.0,
            tools: ToolSettings::default(),
            render: RenderSettings::default(),
        }
    }
}

/// Paths and extra arguments for external tools. Unset paths are looked
/// up in `PATH`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    pub ytdlp: Option<String>,
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
    pub ytdlp_args: Vec<String>,
}

/// Caption styling and encoder settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSettings {
    pub font: String,
    pub font_color: String,
    pub border_width: u32,
    pub video_codec: String,
    pub preset: Option<String>,
    pub crf: Option<u32>,
    pub hwaccel: Option<String>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        let base = CompositorConfig::default();
        Self {
            font: base.font,
            font_color: base.font_color,
            border_width: base.border_width,
            video_codec: base.video_codec,
            preset: None,
            crf: None,
            hwaccel: None,
        }
    }
}

impl Settings {
    /// Load settings from `explicit`, or from the default location.
    ///
    /// A missing default file yields defaults; a missing explicit file is
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if a file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::default_path();
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| PipelineError::Config(format!("failed to read {}: {e}", path.display())))?;

        Self::from_toml(&content)
            .map_err(|e| PipelineError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] on invalid TOML or an unknown
    /// quality value.
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))?;
        settings.quality()?;
        Ok(settings)
    }

    /// Return the path to the default config file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("capburn")
            .join("config.toml")
    }

    pub fn quality(&self) -> Result<StreamQuality> {
        self.quality.parse().map_err(PipelineError::Config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            download_dir: self.download_dir.clone(),
            caption_language: self.language.clone(),
            quality: self.quality()?,
            duration_tolerance_secs: self.duration_tolerance_secs,
        })
    }

    pub fn compositor_config(&self) -> CompositorConfig {
        let mut config = CompositorConfig {
            font: self.render.font.clone(),
            font_color: self.render.font_color.clone(),
            border_width: self.render.border_width,
            video_codec: self.render.video_codec.clone(),
            preset: self.render.preset.clone(),
            crf: self.render.crf,
            timeout: self.timeout(),
            ..CompositorConfig::default()
        };
        if let Some(ref ffmpeg) = self.tools.ffmpeg {
            config.ffmpeg_path.clone_from(ffmpeg);
        }
        if let Some(ref accel) = self.render.hwaccel {
            config = config.with_hwaccel(accel);
        }
        config
    }

    pub fn ytdlp_backend(&self) -> YtDlpBackend {
        let mut backend = YtDlpBackend::new()
            .with_timeout(self.timeout())
            .with_extra_args(self.tools.ytdlp_args.clone());
        if let Some(ref path) = self.tools.ytdlp {
            backend = backend.with_ytdlp_path(path);
        }
        backend
    }

    pub fn ffmpeg_backend(&self) -> FfmpegBackend {
        let mut backend = FfmpegBackend::new().with_timeout(self.timeout());
        if let Some(ref path) = self.tools.ffmpeg {
            backend = backend.with_ffmpeg_path(path);
        }
        if let Some(ref path) = self.tools.ffprobe {
            backend = backend.with_ffprobe_path(path);
        }
        backend
    }
}
