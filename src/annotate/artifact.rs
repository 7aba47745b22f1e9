//! On-disk artifacts and the skip-if-present check.
//!
//! A file's existence is the only pipeline state that survives between
//! runs. Every I/O step asks [`check_artifact`] before doing work.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;

use crate::error::Result;

/// What a previous run left at an output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Nothing there yet.
    Missing,
    /// Non-empty and at least as new as every input.
    Present,
    /// Empty, or older than one of its inputs; must be rebuilt.
    Stale,
}

impl ArtifactState {
    pub fn needs_work(self) -> bool {
        self != Self::Present
    }
}

/// Classify the artifact at `path` relative to the files it is built from.
///
/// Inputs that do not exist are ignored; the step that needs them fails on
/// its own with a more specific error.
pub async fn check_artifact(path: &Path, inputs: &[&Path]) -> Result<ArtifactState> {
    let meta = match fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ArtifactState::Missing),
        Err(e) => return Err(e.into()),
    };

    if !meta.is_file() || meta.len() == 0 {
        return Ok(ArtifactState::Stale);
    }

    let built = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    for input in inputs {
        if let Ok(input_meta) = fs::metadata(input).await {
            if input_meta.modified().is_ok_and(|m| m > built) {
                return Ok(ArtifactState::Stale);
            }
        }
    }

    Ok(ArtifactState::Present)
}

/// Longest stem in bytes. Leaves room for role suffixes, the language tag,
/// and the `.part` marker under the usual 255-byte file name limit.
const MAX_STEM_BYTES: usize = 200;

/// Longest language tag kept in artifact names
const MAX_LANGUAGE_BYTES: usize = 32;

/// Make a title safe to use as a file stem.
pub fn safe_title(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    let cleaned = truncate_bytes(&cleaned, MAX_STEM_BYTES).trim_end();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Deterministic artifact paths for one source video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub merged: PathBuf,
    pub captions: PathBuf,
    pub final_output: PathBuf,
}

impl ArtifactPaths {
    /// Lay out artifacts for `title` under `dir`, using the extensions of the
    /// downloaded video and audio streams.
    ///
    /// Captions and the captioned output carry the caption language, so
    /// runs in different languages never reuse each other's files.
    pub fn new(
        dir: &Path,
        title: &str,
        language: &str,
        video_ext: &str,
        audio_ext: &str,
    ) -> Self {
        let stem = safe_title(title);
        let lang = safe_language(language);
        Self {
            video: dir.join(format!("{stem}_video.{video_ext}")),
            audio: dir.join(format!("{stem}_audio.{audio_ext}")),
            merged: dir.join(format!("{stem}.mp4")),
            captions: dir.join(format!("{stem}.{lang}.srt")),
            final_output: dir.join(format!("{stem}_with_subs.{lang}.mp4")),
        }
    }
}

fn safe_language(language: &str) -> String {
    let cleaned: String = language
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let cleaned = truncate_bytes(&cleaned, MAX_LANGUAGE_BYTES);
    if cleaned.is_empty() {
        "und".to_string()
    } else {
        cleaned.to_string()
    }
}
