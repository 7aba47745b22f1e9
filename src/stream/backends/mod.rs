pub mod ffmpeg;
pub mod ytdlp;

pub use ffmpeg::FfmpegBackend;
pub use ytdlp::YtDlpBackend;
