//! Caption synchronization and overlay burning for capburn
//!
//! Turns a SubRip caption track into timed text overlays on a video.
//!
//! # Features
//!
//! - **Timecodes** - `HH:MM:SS,mmm` to seconds and back
//! - **Caption parsing** - SubRip blocks into validated [`CaptionEntry`] values
//! - **Overlay geometry** - font size and safe margins derived from frame size
//! - **Timeline composition** - one placement per caption in a [`RenderPlan`]
//! - **ffmpeg compositing** - burn the plan into the video
//! - **Pipeline** - download, merge, fetch captions and render, skipping
//!   artifacts that already exist
//!
//! # Example
//!
//! ```rust
//! use capburn::annotate::{plan_from_text, BaseTrack};
//!
//! let plan = plan_from_text(
//!     "1\n00:00:01,000 --> 00:00:03,000\nHello world\n",
//!     BaseTrack::new("merged.mp4", 1920, 1080),
//! )?;
//! assert_eq!(plan.placements.len(), 1);
//! assert_eq!(plan.placements[0].font_size, 72);
//! # Ok::<(), capburn::PipelineError>(())
//! ```

pub mod artifact;
pub mod compositor;
pub mod overlay;
pub mod pipeline;
pub mod subtitle;
pub mod timecode;
pub mod timeline;

pub use artifact::{check_artifact, safe_title, ArtifactPaths, ArtifactState};
pub use compositor::{Compositor, CompositorConfig, Renderer};
pub use overlay::{HorizontalAnchor, OverlayGeometry, OverlayPlacement, OverlayPosition};
pub use pipeline::{
    burn_captions, plan_for_video, plan_from_text, CaptionPipeline, PipelineConfig,
    PipelineResult, Stage, StepOutcome, StepReport,
};
pub use subtitle::{parse_captions, CaptionEntry};
pub use timecode::{format_timestamp, parse_timestamp};
pub use timeline::{compose, BaseTrack, RenderPlan};
