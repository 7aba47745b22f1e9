//! `capburn` - burn a video's caption track into its picture
//!
//! # Features
//!
//! - **Acquisition**: separate video and audio streams via yt-dlp
//! - **Muxing**: lossless merge with ffmpeg
//! - **Captions**: SubRip parsing with precise error locations
//! - **Overlays**: frame-relative geometry, one timed overlay per caption
//! - **Idempotent runs**: finished artifacts are detected and reused
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use capburn::annotate::{CaptionPipeline, Compositor, PipelineConfig};
//! use capburn::stream::backends::{FfmpegBackend, YtDlpBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ytdlp = Arc::new(YtDlpBackend::new());
//!     let ffmpeg = Arc::new(FfmpegBackend::new());
//!     let pipeline = CaptionPipeline::new(
//!         PipelineConfig::default().with_download_dir("downloads"),
//!         ytdlp.clone(),
//!         ytdlp,
//!         ffmpeg.clone(),
//!         ffmpeg,
//!         Arc::new(Compositor::default()),
//!     );
//!     let result = pipeline.run("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//!     println!("Wrote {}", result.final_path.display());
//!     Ok(())
//! }
//! ```

pub mod annotate;
pub mod config;
pub mod error;
pub mod stream;
mod tool;

pub use annotate::{CaptionEntry, CaptionPipeline, OverlayGeometry, PipelineResult, RenderPlan};
pub use config::Settings;
pub use error::{PipelineError, Result, StreamRole};

/// Version of capburn
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
