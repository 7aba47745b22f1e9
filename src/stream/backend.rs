//! Local media tool traits: muxing streams and probing files.
//!
//! A [`Muxer`] combines a video-only and an audio-only file into one
//! container without re-encoding video. A [`MediaProbe`] reports the frame
//! size and duration of a local file. Both are implemented by
//! [`FfmpegBackend`](super::backends::FfmpegBackend).

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// What a probe learned about a local media file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MediaDetails {
    /// Frame width of the first video stream (0 for audio-only files).
    pub width: u32,
    /// Frame height of the first video stream (0 for audio-only files).
    pub height: u32,
    /// Container duration in seconds, if reported.
    pub duration_seconds: Option<f64>,
}

/// Trait for combining elementary streams.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Merge `video` and `audio` into `output`, replacing any file there.
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// Trait for inspecting local media files.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaDetails>;
}
