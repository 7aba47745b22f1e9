//! Full caption pipeline: acquire -> mux -> fetch captions -> compose -> render
//!
//! Orchestrates the complete workflow from a source URL to a video with
//! burned-in captions. Every I/O step checks its artifact first, so an
//! interrupted run picks up where it stopped.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, warn};

use super::artifact::{check_artifact, ArtifactPaths, ArtifactState};
use super::compositor::Renderer;
use super::overlay::OverlayGeometry;
use super::subtitle::{parse_captions, CaptionEntry};
use super::timeline::{compose, BaseTrack, RenderPlan};
use crate::error::Result;
use crate::stream::{
    select_audio_stream, select_video_stream, AcquisitionService, CaptionSource, FormatInfo,
    MediaInfo, MediaProbe, Muxer, StreamQuality,
};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Acquire,
    Mux,
    FetchCaptions,
    ParseAndCompose,
    SkipOverlay,
    Render,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Acquire => "acquire",
            Self::Mux => "mux",
            Self::FetchCaptions => "fetch-captions",
            Self::ParseAndCompose => "parse-and-compose",
            Self::SkipOverlay => "skip-overlay",
            Self::Render => "render",
            Self::Done => "done",
        })
    }
}

/// Whether a step did its work or found the artifact already in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepOutcome {
    Performed,
    Skipped,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Performed => "done",
            Self::Skipped => "skipped",
        })
    }
}

/// One artifact-producing step of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub stage: Stage,
    pub artifact: PathBuf,
    pub outcome: StepOutcome,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory all artifacts are written to
    pub download_dir: PathBuf,
    /// Caption track language (e.g., "en-US")
    pub caption_language: String,
    /// Video stream quality
    pub quality: StreamQuality,
    /// Largest video/audio duration difference accepted without a warning
    pub duration_tolerance_secs: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("."),
            caption_language: "en-US".to_string(),
            quality: StreamQuality::Best,
            duration_tolerance_secs: 1.0,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: &str) -> Self {
        self.caption_language = language.to_string();
        self
    }
}

/// Result of pipeline processing
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Title reported by the source
    pub title: String,
    /// The file to hand to the user: captioned if captions existed, else merged
    pub final_path: PathBuf,
    /// Per-artifact outcomes, in order
    pub steps: Vec<StepReport>,
    /// Caption entries burned in (0 when the overlay stage was skipped)
    pub caption_count: usize,
    pub overlay_applied: bool,
    /// Processing time in seconds
    pub processing_time_secs: f64,
}

impl PipelineResult {
    /// Outcomes recorded for `stage`
    pub fn outcomes(&self, stage: Stage) -> impl Iterator<Item = StepOutcome> + '_ {
        self.steps
            .iter()
            .filter(move |s| s.stage == stage)
            .map(|s| s.outcome)
    }
}

/// Full caption pipeline
///
/// Concurrent runs against the same download directory are not
/// coordinated; give each job its own directory.
pub struct CaptionPipeline {
    config: PipelineConfig,
    acquisition: Arc<dyn AcquisitionService>,
    captions: Arc<dyn CaptionSource>,
    muxer: Arc<dyn Muxer>,
    probe: Arc<dyn MediaProbe>,
    renderer: Arc<dyn Renderer>,
}

impl CaptionPipeline {
    /// Create a new pipeline from its collaborators
    pub fn new(
        config: PipelineConfig,
        acquisition: Arc<dyn AcquisitionService>,
        captions: Arc<dyn CaptionSource>,
        muxer: Arc<dyn Muxer>,
        probe: Arc<dyn MediaProbe>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            config,
            acquisition,
            captions,
            muxer,
            probe,
            renderer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage for the video at `url`.
    ///
    /// Any failure aborts the run; artifacts completed so far stay on disk
    /// and are reused by the next run.
    pub async fn run(&self, url: &str) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let mut steps = Vec::new();

        info!("Starting caption pipeline for {}", url);
        fs::create_dir_all(&self.config.download_dir).await?;

        // Step 1: Acquire
        enter(Stage::Acquire);
        let media = self.describe(url).await?;
        let video_format = select_video_stream(&media, self.config.quality)?;
        let audio_format = select_audio_stream(&media)?;
        debug!(
            "Selected video format {} and audio format {}",
            video_format.format_id, audio_format.format_id
        );

        let paths = ArtifactPaths::new(
            &self.config.download_dir,
            &media.title,
            &self.config.caption_language,
            &video_format.ext,
            &audio_format.ext,
        );

        steps.push(self.acquire(&media, video_format, &paths.video).await?);
        steps.push(self.acquire(&media, audio_format, &paths.audio).await?);

        // Step 2: Mux
        enter(Stage::Mux);
        steps.push(self.merge(&paths).await?);

        // Step 3: Captions
        enter(Stage::FetchCaptions);
        let (caption_text, caption_step) = self.fetch_captions(&media, &paths.captions).await?;
        if let Some(step) = caption_step {
            steps.push(step);
        }

        let entries = match caption_text {
            Some(text) => parse_captions(&text)?,
            None => Vec::new(),
        };

        if entries.is_empty() {
            enter(Stage::SkipOverlay);
            info!("No captions to burn; final video is {:?}", paths.merged);
            return Ok(finish(media.title, paths.merged, steps, 0, false, start_time));
        }

        // Step 4: Plan overlays
        enter(Stage::ParseAndCompose);
        let plan = plan_for_video(self.probe.as_ref(), &paths.merged, &entries).await?;
        info!(
            "Planned {} caption overlays at font size {}",
            plan.placements.len(),
            plan.geometry.font_size
        );

        // Step 5: Render
        enter(Stage::Render);
        let inputs = [paths.merged.as_path(), paths.captions.as_path()];
        let outcome = if check_artifact(&paths.final_output, &inputs).await? == ArtifactState::Present {
            info!("{:?} already exists, skipping render", paths.final_output);
            StepOutcome::Skipped
        } else {
            let partial = partial_path(&paths.final_output);
            let rendered = self.renderer.render(&plan, &partial).await;
            commit(&partial, &paths.final_output, rendered).await?;
            info!("Rendered captioned video {:?}", paths.final_output);
            StepOutcome::Performed
        };
        steps.push(StepReport {
            stage: Stage::Render,
            artifact: paths.final_output.clone(),
            outcome,
        });

        Ok(finish(
            media.title,
            paths.final_output,
            steps,
            entries.len(),
            true,
            start_time,
        ))
    }

    /// Metadata for `url`, from the directory's index when a previous run
    /// already fetched it.
    async fn describe(&self, url: &str) -> Result<MediaInfo> {
        let index_path = self.config.download_dir.join(METADATA_INDEX);
        let mut index = load_index(&index_path).await;

        if let Some(media) = index.get(url) {
            info!("Metadata for {} already exists, not contacting the source", url);
            return Ok(media.clone());
        }

        let media = self.acquisition.describe(url).await?;
        info!("Found \"{}\" via {}", media.title, self.acquisition.name());

        index.insert(url.to_string(), media.clone());
        let partial = partial_path(&index_path);
        let written: Result<()> = match serde_json::to_vec_pretty(&index) {
            Ok(json) => fs::write(&partial, json).await.map_err(Into::into),
            Err(e) => Err(e.into()),
        };
        commit(&partial, &index_path, written).await?;

        Ok(media)
    }

    /// Download one stream unless it is already on disk
    async fn acquire(&self, media: &MediaInfo, format: &FormatInfo, dest: &Path) -> Result<StepReport> {
        let outcome = if check_artifact(dest, &[]).await? == ArtifactState::Present {
            info!("{:?} already exists, skipping download", dest);
            StepOutcome::Skipped
        } else {
            let partial = partial_path(dest);
            let downloaded = self.acquisition.download(media, format, &partial).await;
            commit(&partial, dest, downloaded).await?;
            info!("Downloaded {:?}", dest);
            StepOutcome::Performed
        };

        Ok(StepReport {
            stage: Stage::Acquire,
            artifact: dest.to_path_buf(),
            outcome,
        })
    }

    async fn merge(&self, paths: &ArtifactPaths) -> Result<StepReport> {
        let inputs = [paths.video.as_path(), paths.audio.as_path()];
        let outcome = if check_artifact(&paths.merged, &inputs).await? == ArtifactState::Present {
            info!("{:?} already exists, skipping merge", paths.merged);
            StepOutcome::Skipped
        } else {
            self.warn_on_duration_mismatch(&paths.video, &paths.audio).await;

            let partial = partial_path(&paths.merged);
            let merged = self.muxer.mux(&paths.video, &paths.audio, &partial).await;
            commit(&partial, &paths.merged, merged).await?;
            info!("Merged video and audio into {:?}", paths.merged);
            StepOutcome::Performed
        };

        Ok(StepReport {
            stage: Stage::Mux,
            artifact: paths.merged.clone(),
            outcome,
        })
    }

    /// Streams are muxed regardless; a large gap only earns a warning.
    async fn warn_on_duration_mismatch(&self, video: &Path, audio: &Path) {
        let (video_details, audio_details) =
            match tokio::try_join!(self.probe.probe(video), self.probe.probe(audio)) {
                Ok(details) => details,
                Err(e) => {
                    warn!("Could not compare stream durations: {}", e);
                    return;
                }
            };

        if let (Some(v), Some(a)) = (video_details.duration_seconds, audio_details.duration_seconds) {
            let gap = (v - a).abs();
            if gap > self.config.duration_tolerance_secs {
                warn!(
                    "Video ({:.2}s) and audio ({:.2}s) durations differ by {:.2}s",
                    v, a, gap
                );
            }
        }
    }

    /// Reuse saved captions or fetch them from the source.
    ///
    /// Returns `None` text when the source has no track in the configured
    /// language.
    async fn fetch_captions(
        &self,
        media: &MediaInfo,
        dest: &Path,
    ) -> Result<(Option<String>, Option<StepReport>)> {
        if check_artifact(dest, &[]).await? == ArtifactState::Present {
            info!("{:?} already exists, reusing captions", dest);
            let text = fs::read_to_string(dest).await?;
            return Ok((Some(text), Some(caption_step(dest, StepOutcome::Skipped))));
        }

        let language = &self.config.caption_language;
        match self.captions.fetch_captions(media, language).await? {
            Some(text) => {
                let partial = partial_path(dest);
                let written: Result<()> = fs::write(&partial, &text).await.map_err(Into::into);
                commit(&partial, dest, written).await?;
                info!("Captions found for {}, saved to {:?}", language, dest);
                Ok((Some(text), Some(caption_step(dest, StepOutcome::Performed))))
            }
            None => {
                info!("Captions not found for {}", language);
                Ok((None, None))
            }
        }
    }
}

/// Source metadata fetched by earlier runs, keyed by URL
const METADATA_INDEX: &str = ".capburn-index.json";

/// An unreadable index is treated as empty and rewritten.
async fn load_index(path: &Path) -> BTreeMap<String, MediaInfo> {
    let Ok(content) = fs::read(path).await else {
        return BTreeMap::new();
    };
    serde_json::from_slice(&content).unwrap_or_else(|e| {
        warn!("Ignoring unreadable metadata index {:?}: {}", path, e);
        BTreeMap::new()
    })
}

fn caption_step(dest: &Path, outcome: StepOutcome) -> StepReport {
    StepReport {
        stage: Stage::FetchCaptions,
        artifact: dest.to_path_buf(),
        outcome,
    }
}

fn enter(stage: Stage) {
    debug!("Entering stage {}", stage);
}

fn finish(
    title: String,
    final_path: PathBuf,
    steps: Vec<StepReport>,
    caption_count: usize,
    overlay_applied: bool,
    start_time: Instant,
) -> PipelineResult {
    enter(Stage::Done);
    let elapsed = start_time.elapsed().as_secs_f64();
    info!("Pipeline completed in {:.2}s", elapsed);

    PipelineResult {
        title,
        final_path,
        steps,
        caption_count,
        overlay_applied,
        processing_time_secs: elapsed,
    }
}

/// Sibling path a step writes to before the result is moved into place.
///
/// Keeps the extension so tools that infer the container from it still
/// work: `clip.mp4` becomes `clip.part.mp4`.
fn partial_path(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .map_or_else(|| "artifact".to_string(), |s| s.to_string_lossy().to_string());
    let name = match dest.extension() {
        Some(ext) => format!("{stem}.part.{}", ext.to_string_lossy()),
        None => format!("{stem}.part"),
    };
    dest.with_file_name(name)
}

/// Move a finished partial file into place, or discard it on failure.
async fn commit(partial: &Path, dest: &Path, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => {
            fs::rename(partial, dest).await?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(partial).await;
            Err(e)
        }
    }
}

/// Parse caption text and plan its overlays for a video of known size.
///
/// Pure: no external tools are involved.
pub fn plan_from_text(text: &str, base: BaseTrack) -> Result<RenderPlan> {
    let entries = parse_captions(text)?;
    let geometry = OverlayGeometry::compute(base.width, base.height)?;
    compose(base, &entries, &geometry)
}

/// Probe `video` for its frame size and plan `entries` over it.
pub async fn plan_for_video(
    probe: &dyn MediaProbe,
    video: &Path,
    entries: &[CaptionEntry],
) -> Result<RenderPlan> {
    let details = probe.probe(video).await?;
    let geometry = OverlayGeometry::compute(details.width, details.height)?;
    compose(
        BaseTrack::new(video, details.width, details.height),
        entries,
        &geometry,
    )
}

/// Burn the captions in `caption_text` onto a local video.
///
/// This is the overlay stage on its own, for files that were not produced
/// by [`CaptionPipeline::run`].
pub async fn burn_captions(
    probe: &dyn MediaProbe,
    renderer: &dyn Renderer,
    video: &Path,
    caption_text: &str,
    output: &Path,
) -> Result<RenderPlan> {
    let entries = parse_captions(caption_text)?;
    if entries.is_empty() {
        warn!("Caption file holds no entries; output will carry no overlays");
    }

    let plan = plan_for_video(probe, video, &entries).await?;

    let partial = partial_path(output);
    let rendered = renderer.render(&plan, &partial).await;
    commit(&partial, output, rendered).await?;
    info!("Burned {} captions into {:?}", plan.placements.len(), output);

    Ok(plan)
}
