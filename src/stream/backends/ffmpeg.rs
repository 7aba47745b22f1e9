//! ffmpeg bridge backend
//!
//! Uses ffmpeg/ffprobe subprocesses for:
//! - Merging a video-only and an audio-only download (video copied, audio to AAC)
//! - Reading frame size and duration of local files

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::stream::backend::{MediaDetails, MediaProbe, Muxer};
use crate::tool::{resolve, run_tool};

/// ffmpeg-based muxer and prober
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    /// Path to ffmpeg binary
    ffmpeg_path: String,
    /// Path to ffprobe binary
    ffprobe_path: String,
    /// Audio codec for the merged file
    audio_codec: String,
    /// Upper bound for a single tool run
    timeout: Duration,
}

impl FfmpegBackend {
    /// Create new ffmpeg backend, searching for binaries in PATH
    pub fn new() -> Self {
        Self {
            ffmpeg_path: resolve("ffmpeg"),
            ffprobe_path: resolve("ffprobe"),
            audio_codec: "aac".to_string(),
            timeout: Duration::from_secs(3600),
        }
    }

    /// Specify custom ffmpeg binary path
    #[must_use]
    pub fn with_ffmpeg_path(mut self, path: &str) -> Self {
        self.ffmpeg_path = path.to_string();
        self
    }

    /// Specify custom ffprobe binary path
    #[must_use]
    pub fn with_ffprobe_path(mut self, path: &str) -> Self {
        self.ffprobe_path = path.to_string();
        self
    }

    /// Audio codec used when merging (e.g., "aac", "copy")
    #[must_use]
    pub fn with_audio_codec(mut self, codec: &str) -> Self {
        self.audio_codec = codec.to_string();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build ffmpeg arguments for merging two streams
    fn build_mux_args(&self, video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "warning", "-nostats"]
            .iter()
            .map(std::string::ToString::to_string)
            .collect();

        args.push("-i".to_string());
        args.push(video.to_string_lossy().to_string());
        args.push("-i".to_string());
        args.push(audio.to_string_lossy().to_string());

        // First video of input 0, first audio of input 1
        args.extend(
            ["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a"]
                .iter()
                .map(std::string::ToString::to_string),
        );
        args.push(self.audio_codec.clone());

        args.push("-y".to_string()); // Overwrite stale output
        args.push(output.to_string_lossy().to_string());
        args
    }

    fn build_probe_args(path: &Path) -> Vec<String> {
        [
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .iter()
        .map(std::string::ToString::to_string)
        .chain(std::iter::once(path.to_string_lossy().to_string()))
        .collect()
    }

    /// Turn ffprobe JSON into [`MediaDetails`]
    fn parse_probe(path: &Path, json: &[u8]) -> Result<MediaDetails> {
        let probe: FfprobeOutput = serde_json::from_slice(json)?;

        let video = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));
        let audio = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"));

        if video.is_none() && audio.is_none() {
            return Err(PipelineError::Probe {
                path: path.to_path_buf(),
                reason: "no audio or video stream".to_string(),
            });
        }

        let duration_seconds = probe
            .format
            .and_then(|f| f.duration)
            .or_else(|| video.and_then(|v| v.duration.clone()))
            .and_then(|d| d.parse::<f64>().ok());

        Ok(MediaDetails {
            width: video.and_then(|v| v.width).unwrap_or(0),
            height: video.and_then(|v| v.height).unwrap_or(0),
            duration_seconds,
        })
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Muxer for FfmpegBackend {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        let args = self.build_mux_args(video, audio, output);

        run_tool(&self.ffmpeg_path, &args, self.timeout)
            .await
            .map_err(|e| {
                e.into_error("ffmpeg", |reason| PipelineError::MuxFailed {
                    output: output.to_path_buf(),
                    reason,
                })
            })?;

        debug!("Merged {:?} and {:?} into {:?}", video, audio, output);
        Ok(())
    }
}

#[async_trait]
impl MediaProbe for FfmpegBackend {
    async fn probe(&self, path: &Path) -> Result<MediaDetails> {
        let args = Self::build_probe_args(path);

        let output = run_tool(&self.ffprobe_path, &args, self.timeout)
            .await
            .map_err(|e| {
                e.into_error("ffprobe", |reason| PipelineError::Probe {
                    path: path.to_path_buf(),
                    reason,
                })
            })?;

        Self::parse_probe(path, &output.stdout)
    }
}

// ============================================================================
// ffprobe JSON output
// ============================================================================

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}
