//! yt-dlp bridge backend
//!
//! Uses yt-dlp subprocess for:
//! - Video metadata and the list of separately downloadable streams (`-J`)
//! - Downloading a single video-only or audio-only stream
//! - Downloading an uploaded caption track, converted to SubRip

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;
use tracing::debug;

use crate::error::{PipelineError, Result, StreamRole};
use crate::stream::provider::{AcquisitionService, CaptionSource, FormatInfo, MediaInfo};
use crate::tool::{resolve, run_tool};

/// yt-dlp-based acquisition backend
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    /// Path to yt-dlp binary
    ytdlp_path: String,
    /// Additional yt-dlp arguments
    extra_args: Vec<String>,
    /// Upper bound for a single yt-dlp run
    timeout: Duration,
    /// Where caption downloads are staged before being read back
    scratch_dir: PathBuf,
}

impl YtDlpBackend {
    /// Create new yt-dlp backend, searching for binary in PATH
    pub fn new() -> Self {
        Self {
            ytdlp_path: resolve("yt-dlp"),
            extra_args: Vec::new(),
            timeout: Duration::from_secs(3600),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Specify custom yt-dlp binary path
    #[must_use]
    pub fn with_ytdlp_path(mut self, path: &str) -> Self {
        self.ytdlp_path = path.to_string();
        self
    }

    /// Add extra yt-dlp arguments (e.g., cookies, rate limits)
    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    fn common_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["--no-playlist", "--no-warnings", "--no-progress"]
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        args.extend(self.extra_args.clone());
        args
    }

    fn build_describe_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["-J".to_string()];
        args.extend(self.common_args());
        args.push(url.to_string());
        args
    }

    fn build_download_args(&self, url: &str, format_id: &str, dest: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            format_id.to_string(),
            "--force-overwrites".to_string(),
            "--no-part".to_string(),
        ];
        args.extend(self.common_args());
        args.push("-o".to_string());
        args.push(output_template(dest));
        args.push(url.to_string());
        args
    }

    fn build_caption_args(&self, url: &str, language: &str, stem: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "--skip-download",
            "--write-subs",
            "--no-write-auto-subs",
            "--sub-format",
            "srt/best",
            "--convert-subs",
            "srt",
            "--sub-langs",
        ]
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
        args.push(language.to_string());
        args.extend(self.common_args());
        args.push("-o".to_string());
        args.push(format!("{}.%(ext)s", output_template(stem)));
        args.push(url.to_string());
        args
    }

    /// Convert `yt-dlp -J` output into [`MediaInfo`]
    fn parse_info(url: &str, json: &[u8]) -> Result<MediaInfo> {
        let info: YtDlpInfo = serde_json::from_slice(json)?;

        let formats = info
            .formats
            .into_iter()
            .map(|f| FormatInfo {
                has_video: codec_present(f.vcodec.as_deref()),
                has_audio: codec_present(f.acodec.as_deref()),
                format_id: f.format_id,
                ext: f.ext,
                width: f.width,
                height: f.height,
                audio_bitrate: f.abr,
                total_bitrate: f.tbr,
            })
            .collect();

        let caption_languages = info
            .subtitles
            .into_keys()
            .filter(|lang| lang != "live_chat")
            .collect();

        Ok(MediaInfo {
            source_url: url.to_string(),
            id: info.id,
            title: info.title,
            duration_seconds: info.duration,
            formats,
            caption_languages,
        })
    }

    fn unavailable(url: &str, role: StreamRole) -> impl FnOnce(String) -> PipelineError + '_ {
        move |reason| PipelineError::StreamUnavailable {
            role,
            source_url: url.to_string(),
            reason,
        }
    }
}

impl Default for YtDlpBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// yt-dlp treats `%` in `-o` as a template field.
fn output_template(path: &Path) -> String {
    path.to_string_lossy().replace('%', "%%")
}

fn codec_present(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| c != "none")
}

#[async_trait]
impl AcquisitionService for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn describe(&self, url: &str) -> Result<MediaInfo> {
        let args = self.build_describe_args(url);
        let output = run_tool(&self.ytdlp_path, &args, self.timeout)
            .await
            .map_err(|e| e.into_error("yt-dlp", Self::unavailable(url, StreamRole::Metadata)))?;

        let media = Self::parse_info(url, &output.stdout)?;
        debug!(
            "{}: {} formats, captions in {:?}",
            media.title,
            media.formats.len(),
            media.caption_languages
        );
        Ok(media)
    }

    async fn download(&self, media: &MediaInfo, format: &FormatInfo, dest: &Path) -> Result<()> {
        let role = if format.has_video {
            StreamRole::Video
        } else {
            StreamRole::Audio
        };

        let args = self.build_download_args(&media.source_url, &format.format_id, dest);
        run_tool(&self.ytdlp_path, &args, self.timeout)
            .await
            .map_err(|e| e.into_error("yt-dlp", Self::unavailable(&media.source_url, role)))?;

        match fs::metadata(dest).await {
            Ok(meta) if meta.len() > 0 => {
                debug!("Downloaded {} to {:?}", role, dest);
                Ok(())
            }
            _ => Err(Self::unavailable(&media.source_url, role)(format!(
                "yt-dlp finished but {} is missing or empty",
                dest.display()
            ))),
        }
    }
}

#[async_trait]
impl CaptionSource for YtDlpBackend {
    async fn fetch_captions(&self, media: &MediaInfo, language: &str) -> Result<Option<String>> {
        if !media.has_captions(language) {
            return Ok(None);
        }

        let staging = self
            .scratch_dir
            .join(format!("capburn-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&staging).await?;

        let result = self.fetch_into(media, language, &staging).await;

        // Cleanup
        let _ = fs::remove_dir_all(&staging).await;

        result.map(Some)
    }
}

impl YtDlpBackend {
    async fn fetch_into(&self, media: &MediaInfo, language: &str, staging: &Path) -> Result<String> {
        let url = media.source_url.as_str();
        let args = self.build_caption_args(url, language, &staging.join("captions"));
        run_tool(&self.ytdlp_path, &args, self.timeout)
            .await
            .map_err(|e| e.into_error("yt-dlp", Self::unavailable(url, StreamRole::Captions)))?;

        let mut entries = fs::read_dir(staging).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "srt") {
                return Ok(fs::read_to_string(&path).await?);
            }
        }

        Err(Self::unavailable(url, StreamRole::Captions)(format!(
            "no {language} SubRip file was produced"
        )))
    }
}

// ============================================================================
// yt-dlp JSON output
// ============================================================================

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: String,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
    /// Uploaded caption tracks keyed by language code
    #[serde(default)]
    subtitles: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    ext: String,
    vcodec: Option<String>,
    acodec: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    abr: Option<f64>,
    tbr: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_JSON: &str = r#"{
        "id": "abc123",
        "title": "Talk: Rust/Async in 10 min",
        "duration": 612,
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5, "tbr": 129.5},
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "width": 1920, "height": 1080, "tbr": 2500.1},
            {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "width": 640, "height": 360}
        ],
        "subtitles": {"live_chat": [], "en-US": [{"ext": "vtt"}], "de": [{"ext": "vtt"}]},
        "automatic_captions": {"fi": []}
    }"#;

    fn backend() -> YtDlpBackend {
        YtDlpBackend {
            ytdlp_path: "yt-dlp".to_string(),
            extra_args: vec![],
            timeout: Duration::from_secs(10),
            scratch_dir: PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn test_parse_info() {
        let media = YtDlpBackend::parse_info("https://youtu.be/abc123", INFO_JSON.as_bytes()).unwrap();

        assert_eq!(media.id, "abc123");
        assert_eq!(media.title, "Talk: Rust/Async in 10 min");
        assert_eq!(media.duration_seconds, Some(612.0));
        assert_eq!(media.formats.len(), 4);
        assert_eq!(media.caption_languages, vec!["de", "en-US"]);

        let audio = &media.formats[1];
        assert!(audio.has_audio && !audio.has_video);
        let video = &media.formats[2];
        assert!(video.has_video && !video.has_audio);
        assert_eq!(video.height, Some(1080));
    }

    #[test]
    fn test_parse_info_rejects_garbage() {
        assert!(matches!(
            YtDlpBackend::parse_info("u", b"not json"),
            Err(PipelineError::Json(_))
        ));
    }

    #[test]
    fn test_download_args_escape_template() {
        let args = backend().build_download_args(
            "https://youtu.be/abc123",
            "137",
            Path::new("dl/100% legit_video.mp4"),
        );

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "137");
        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "dl/100%% legit_video.mp4");
        assert!(args.contains(&"--force-overwrites".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc123");
    }

    #[test]
    fn test_caption_args() {
        let args = backend().build_caption_args("https://youtu.be/x", "en-US", Path::new("/tmp/s/captions"));

        let langs = args.iter().position(|a| a == "--sub-langs").unwrap();
        assert_eq!(args[langs + 1], "en-US");
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.contains(&"--no-write-auto-subs".to_string()));
        assert!(args.contains(&"/tmp/s/captions.%(ext)s".to_string()));
    }

    #[test]
    fn test_extra_args_are_forwarded() {
        let args = backend()
            .with_extra_args(vec!["--cookies".to_string(), "c.txt".to_string()])
            .build_describe_args("https://youtu.be/x");
        assert_eq!(args[0], "-J");
        assert!(args.contains(&"--cookies".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/x");
    }

    #[tokio::test]
    async fn test_no_track_in_language_is_none() {
        let media = YtDlpBackend::parse_info("https://youtu.be/abc123", INFO_JSON.as_bytes()).unwrap();
        // "fi" only exists as an automatic caption, so no process is spawned
        let captions = backend().fetch_captions(&media, "fi").await.unwrap();
        assert!(captions.is_none());
    }
}
