//! Error types shared by the caption pipeline and its collaborators.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Which downloaded stream an acquisition error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Metadata,
    Video,
    Audio,
    Captions,
}

impl std::fmt::Display for StreamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Metadata => "metadata",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Captions => "captions",
        })
    }
}

/// Pipeline errors
///
/// "No captions available" is deliberately absent: caption collaborators
/// return `Ok(None)` for that case and the pipeline finishes without the
/// overlay stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{role} stream unavailable for {source_url}: {reason}")]
    StreamUnavailable {
        role: StreamRole,
        source_url: String,
        reason: String,
    },

    #[error("muxing into {output:?} failed: {reason}")]
    MuxFailed { output: PathBuf, reason: String },

    #[error("malformed timestamp {text:?}: {reason}")]
    MalformedTimestamp { text: String, reason: &'static str },

    #[error("malformed caption block #{block} (line {line}): {reason}")]
    MalformedCaptionBlock {
        block: usize,
        line: usize,
        reason: String,
    },

    #[error("caption {index} ends at {end}s, not after its start {start}s")]
    InvalidCueWindow { index: u32, start: f64, end: f64 },

    #[error("invalid video dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    #[error("rendering {output:?} failed: {reason}")]
    RenderFailed { output: PathBuf, reason: String },

    #[error("probing {path:?} failed: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("{tool} not found; install it or set its path in the config file")]
    ToolMissing { tool: String },

    #[error("{tool} did not finish within {timeout:?}")]
    ToolTimeout { tool: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
