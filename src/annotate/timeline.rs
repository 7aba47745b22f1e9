//! Timeline composition: schedule one overlay per caption over a base track.

use std::path::PathBuf;

use serde::Serialize;

use super::overlay::{OverlayGeometry, OverlayPlacement};
use super::subtitle::CaptionEntry;
use crate::error::{PipelineError, Result};

/// The video every overlay is drawn on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseTrack {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl BaseTrack {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }
}

/// Declarative overlay schedule consumed by a renderer.
///
/// The base track is always the bottom layer; placements are layered above
/// it in sequence order. Overlapping windows are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub base: BaseTrack,
    pub geometry: OverlayGeometry,
    pub placements: Vec<OverlayPlacement>,
}

impl RenderPlan {
    /// Placements visible at `t` seconds, bottom to top.
    pub fn active_at(&self, t: f64) -> impl Iterator<Item = &OverlayPlacement> {
        self.placements
            .iter()
            .filter(move |p| p.start_offset <= t && t < p.end_offset())
    }

    /// End of the last overlay, in seconds.
    pub fn overlay_span(&self) -> f64 {
        self.placements
            .iter()
            .map(OverlayPlacement::end_offset)
            .fold(0.0, f64::max)
    }
}

/// Build the render plan for `captions` over `base`.
pub fn compose(
    base: BaseTrack,
    captions: &[CaptionEntry],
    geometry: &OverlayGeometry,
) -> Result<RenderPlan> {
    if (base.width, base.height) != (geometry.width, geometry.height) {
        return Err(PipelineError::InvalidDimensions {
            width: base.width,
            height: base.height,
            reason: "overlay geometry was computed for a different frame size",
        });
    }

    let position = geometry.position();
    let placements = captions
        .iter()
        .map(|entry| {
            let duration = entry.duration();
            assert!(
                duration > 0.0,
                "caption {} reached the composer with non-positive duration {duration}",
                entry.index()
            );

            OverlayPlacement {
                index: entry.index(),
                text: entry.text().to_string(),
                position,
                box_width: geometry.text_box_width(),
                font_size: geometry.font_size,
                start_offset: entry.start(),
                duration,
            }
        })
        .collect();

    Ok(RenderPlan {
        base,
        geometry: *geometry,
        placements,
    })
}
