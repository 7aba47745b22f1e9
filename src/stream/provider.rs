//! Acquisition and caption-retrieval traits and common types.
//!
//! An [`AcquisitionService`] knows how to describe a remote video (title,
//! available elementary streams, caption languages) and download one of
//! its streams to a local file. A [`CaptionSource`] fetches the caption
//! track for one language in SubRip form.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result, StreamRole};

/// Quality selection strategy for the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamQuality {
    /// Highest available resolution.
    #[default]
    Best,
    /// Lowest available resolution.
    Worst,
    /// Closest match to the given height in pixels (e.g., 720, 1080).
    Specific(u32),
}

impl std::str::FromStr for StreamQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "worst" => Ok(Self::Worst),
            q => q
                .trim_end_matches('p')
                .parse::<u32>()
                .map(Self::Specific)
                .map_err(|_| format!("unknown quality {s:?}, use best, worst or a height like 720")),
        }
    }
}

/// One downloadable elementary stream of a remote video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    /// Backend-specific format identifier.
    pub format_id: String,
    /// Container extension of the downloaded file (e.g., `"mp4"`, `"m4a"`).
    pub ext: String,
    pub has_video: bool,
    pub has_audio: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Audio bitrate in kbit/s.
    pub audio_bitrate: Option<f64>,
    /// Overall bitrate in kbit/s.
    pub total_bitrate: Option<f64>,
}

impl FormatInfo {
    fn is_video_only_mp4(&self) -> bool {
        self.has_video && !self.has_audio && self.ext == "mp4"
    }

    fn is_audio_only_mp4(&self) -> bool {
        !self.has_video && self.has_audio && matches!(self.ext.as_str(), "m4a" | "mp4")
    }
}

/// Metadata about a remote video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// URL the metadata was fetched for.
    pub source_url: String,
    /// Provider-specific video ID.
    pub id: String,
    /// Human-readable title, used to name artifacts.
    pub title: String,
    /// Duration in seconds (if known).
    pub duration_seconds: Option<f64>,
    pub formats: Vec<FormatInfo>,
    /// Languages with an uploaded (not machine-generated) caption track.
    pub caption_languages: Vec<String>,
}

impl MediaInfo {
    pub fn has_captions(&self, language: &str) -> bool {
        self.caption_languages.iter().any(|l| l == language)
    }
}

fn unavailable(media: &MediaInfo, role: StreamRole, reason: &str) -> PipelineError {
    PipelineError::StreamUnavailable {
        role,
        source_url: media.source_url.clone(),
        reason: reason.to_string(),
    }
}

/// Pick the video-only MP4 stream matching `quality`.
///
/// Ties on resolution go to the higher overall bitrate.
pub fn select_video_stream(media: &MediaInfo, quality: StreamQuality) -> Result<&FormatInfo> {
    let candidates = media.formats.iter().filter(|f| f.is_video_only_mp4());
    let bitrate = |f: &FormatInfo| f.total_bitrate.unwrap_or(0.0);

    let chosen = match quality {
        StreamQuality::Best => candidates.max_by(|a, b| {
            a.height
                .unwrap_or(0)
                .cmp(&b.height.unwrap_or(0))
                .then_with(|| bitrate(a).total_cmp(&bitrate(b)))
        }),
        StreamQuality::Worst => candidates.min_by(|a, b| {
            a.height
                .unwrap_or(u32::MAX)
                .cmp(&b.height.unwrap_or(u32::MAX))
                .then_with(|| bitrate(a).total_cmp(&bitrate(b)))
        }),
        StreamQuality::Specific(target) => candidates.min_by(|a, b| {
            let distance = |f: &FormatInfo| f.height.map_or(u32::MAX, |h| h.abs_diff(target));
            distance(a)
                .cmp(&distance(b))
                .then_with(|| bitrate(b).total_cmp(&bitrate(a)))
        }),
    };

    chosen.ok_or_else(|| unavailable(media, StreamRole::Video, "no video-only mp4 stream offered"))
}

/// Pick the audio-only MP4/M4A stream with the highest audio bitrate.
pub fn select_audio_stream(media: &MediaInfo) -> Result<&FormatInfo> {
    media
        .formats
        .iter()
        .filter(|f| f.is_audio_only_mp4())
        .max_by(|a, b| {
            let key = |f: &FormatInfo| f.audio_bitrate.or(f.total_bitrate).unwrap_or(0.0);
            key(a).total_cmp(&key(b))
        })
        .ok_or_else(|| unavailable(media, StreamRole::Audio, "no audio-only m4a stream offered"))
}

/// Trait for remote stream acquisition.
#[async_trait]
pub trait AcquisitionService: Send + Sync {
    /// Short lowercase backend name (e.g., `"yt-dlp"`).
    fn name(&self) -> &'static str;

    /// Fetch metadata for the video at `url`.
    async fn describe(&self, url: &str) -> Result<MediaInfo>;

    /// Download one elementary stream of `media` to `dest`, replacing any
    /// file already there.
    async fn download(&self, media: &MediaInfo, format: &FormatInfo, dest: &Path) -> Result<()>;
}

/// Trait for caption retrieval.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetch the `language` caption track of `media` as SubRip text.
    ///
    /// Returns `Ok(None)` when the video has no track in that language.
    async fn fetch_captions(&self, media: &MediaInfo, language: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, height: u32, tbr: f64) -> FormatInfo {
        FormatInfo {
            format_id: id.to_string(),
            ext: "mp4".to_string(),
            has_video: true,
            has_audio: false,
            width: Some(height * 16 / 9),
            height: Some(height),
            audio_bitrate: None,
            total_bitrate: Some(tbr),
        }
    }

    fn audio(id: &str, ext: &str, abr: f64) -> FormatInfo {
        FormatInfo {
            format_id: id.to_string(),
            ext: ext.to_string(),
            has_video: false,
            has_audio: true,
            width: None,
            height: None,
            audio_bitrate: Some(abr),
            total_bitrate: Some(abr),
        }
    }

    fn media(formats: Vec<FormatInfo>) -> MediaInfo {
        MediaInfo {
            source_url: "https://example.com/watch?v=abc".to_string(),
            id: "abc".to_string(),
            title: "Test".to_string(),
            duration_seconds: Some(10.0),
            formats,
            caption_languages: vec!["en-US".to_string()],
        }
    }

    #[test]
    fn test_best_video_prefers_height_then_bitrate() {
        let mut muxed = video("18", 2160, 9000.0);
        muxed.has_audio = true;
        let mut webm = video("313", 2160, 8000.0);
        webm.ext = "webm".to_string();

        let info = media(vec![
            video("136", 720, 1500.0),
            video("137", 1080, 2500.0),
            video("137b", 1080, 3000.0),
            muxed,
            webm,
        ]);

        assert_eq!(select_video_stream(&info, StreamQuality::Best).unwrap().format_id, "137b");
        assert_eq!(select_video_stream(&info, StreamQuality::Worst).unwrap().format_id, "136");
    }

    #[test]
    fn test_specific_height_picks_closest() {
        let info = media(vec![
            video("134", 360, 400.0),
            video("136", 720, 1500.0),
            video("137", 1080, 2500.0),
        ]);

        let chosen = select_video_stream(&info, StreamQuality::Specific(800)).unwrap();
        assert_eq!(chosen.format_id, "136");
    }

    #[test]
    fn test_audio_prefers_bitrate_and_skips_webm() {
        let info = media(vec![
            audio("139", "m4a", 48.0),
            audio("140", "m4a", 128.0),
            audio("251", "webm", 160.0),
        ]);

        assert_eq!(select_audio_stream(&info).unwrap().format_id, "140");
    }

    #[test]
    fn test_missing_streams_are_unavailable() {
        let info = media(vec![audio("251", "webm", 160.0)]);

        assert!(matches!(
            select_video_stream(&info, StreamQuality::Best),
            Err(PipelineError::StreamUnavailable { role: StreamRole::Video, .. })
        ));
        assert!(matches!(
            select_audio_stream(&info),
            Err(PipelineError::StreamUnavailable { role: StreamRole::Audio, .. })
        ));
    }

    #[test]
    fn test_quality_from_str() {
        assert_eq!("best".parse::<StreamQuality>().unwrap(), StreamQuality::Best);
        assert_eq!("WORST".parse::<StreamQuality>().unwrap(), StreamQuality::Worst);
        assert_eq!("720p".parse::<StreamQuality>().unwrap(), StreamQuality::Specific(720));
        assert!("ultra".parse::<StreamQuality>().is_err());
    }

    #[test]
    fn test_has_captions() {
        let info = media(vec![]);
        assert!(info.has_captions("en-US"));
        assert!(!info.has_captions("fi"));
    }
}
