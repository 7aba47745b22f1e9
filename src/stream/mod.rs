//! Remote acquisition and local media tools for capburn
//!
//! Providers describe and download the separate video and audio streams
//! of a remote video and fetch its caption track; backends merge and
//! probe the downloaded files.

pub mod backend;
pub mod backends;
pub mod provider;

pub use backend::{MediaDetails, MediaProbe, Muxer};
pub use provider::{
    select_audio_stream, select_video_stream, AcquisitionService, CaptionSource, FormatInfo,
    MediaInfo, StreamQuality,
};
