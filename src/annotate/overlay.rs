//! Overlay geometry and placement types for burned-in captions.
//!
//! Geometry is derived once per video from its pixel dimensions so every
//! caption in that video uses the same font size and text box.

use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Horizontal anchoring of an overlay's text box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAnchor {
    #[default]
    Center,
}

/// Position of an overlay on the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlayPosition {
    pub x: HorizontalAnchor,
    /// Pixels from the top edge of the frame to the top of the text box.
    pub y: u32,
}

impl OverlayPosition {
    /// Convert to ffmpeg drawtext coordinates
    #[must_use]
    pub fn to_drawtext_position(&self) -> (String, String) {
        let x = match self.x {
            HorizontalAnchor::Center => "(w-text_w)/2".to_string(),
        };
        (x, self.y.to_string())
    }
}

/// Video-wide caption layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlayGeometry {
    pub width: u32,
    pub height: u32,
    /// `round(height / 15)`, never below 1
    pub font_size: u32,
    /// `height - round(height / 9)`
    pub vertical_offset: u32,
    /// `round(width / 96)`, kept clear on both sides of the text box
    pub safe_border: u32,
}

impl OverlayGeometry {
    /// Derive the caption layout for a `width` x `height` video.
    pub fn compute(width: u32, height: u32) -> Result<Self> {
        let invalid = |reason| PipelineError::InvalidDimensions {
            width,
            height,
            reason,
        };

        if width == 0 || height == 0 {
            return Err(invalid("dimensions must be positive"));
        }

        // Frames under 8px tall would round to a zero font size.
        let font_size = ratio(height, 15).max(1);

        Ok(Self {
            width,
            height,
            font_size,
            vertical_offset: height - ratio(height, 9),
            safe_border: ratio(width, 96),
        })
    }

    /// Width available to wrapped caption text
    pub fn text_box_width(&self) -> u32 {
        self.width - 2 * self.safe_border
    }

    /// Top edge of the caption box, measured from the top of the frame.
    pub fn anchor_y(&self) -> u32 {
        self.height - self.vertical_offset
    }

    pub fn position(&self) -> OverlayPosition {
        OverlayPosition {
            x: HorizontalAnchor::Center,
            y: self.anchor_y(),
        }
    }
}

/// `round(value / divisor)` with ties to even, so layouts match
/// byte-for-byte across runs and with previously rendered output.
fn ratio(value: u32, divisor: u32) -> u32 {
    (f64::from(value) / f64::from(divisor)).round_ties_even() as u32
}

/// One caption scheduled on the timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayPlacement {
    /// Source cue number, for diagnostics
    pub index: u32,
    pub text: String,
    pub position: OverlayPosition,
    /// Maximum text width in pixels; the renderer wraps to fit
    pub box_width: u32,
    pub font_size: u32,
    /// Seconds from the start of the base track
    pub start_offset: f64,
    /// Seconds on screen, always positive
    pub duration: f64,
}

impl OverlayPlacement {
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_hd_geometry() {
        let geometry = OverlayGeometry::compute(1920, 1080).unwrap();

        assert_eq!(geometry.font_size, 72);
        assert_eq!(geometry.vertical_offset, 960);
        assert_eq!(geometry.safe_border, 20);
        assert_eq!(geometry.text_box_width(), 1880);
        assert_eq!(geometry.anchor_y(), 120);
    }

    #[test]
    fn test_geometry_is_deterministic() {
        let a = OverlayGeometry::compute(1920, 1080).unwrap();
        let b = OverlayGeometry::compute(1920, 1080).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        for (w, h) in [(0, 1080), (1920, 0), (0, 0)] {
            assert!(matches!(
                OverlayGeometry::compute(w, h),
                Err(PipelineError::InvalidDimensions { .. })
            ));
        }
    }

    #[test]
    fn test_tiny_video_gets_minimum_font() {
        let short = OverlayGeometry::compute(1920, 7).unwrap();
        assert_eq!(short.font_size, 1);
        assert_eq!(short.vertical_offset, 6);
        assert_eq!(OverlayGeometry::compute(1920, 8).unwrap().font_size, 1);
        assert_eq!(OverlayGeometry::compute(1, 1).unwrap().text_box_width(), 1);
    }

    #[test]
    fn test_rounding_ties_to_even() {
        // 360 / 96 = 3.75 -> 4, 144 / 96 = 1.5 -> 2, 240 / 96 = 2.5 -> 2
        assert_eq!(OverlayGeometry::compute(360, 480).unwrap().safe_border, 4);
        assert_eq!(OverlayGeometry::compute(144, 480).unwrap().safe_border, 2);
        assert_eq!(OverlayGeometry::compute(240, 480).unwrap().safe_border, 2);
    }

    #[test]
    fn test_drawtext_position() {
        let geometry = OverlayGeometry::compute(1280, 720).unwrap();
        let (x, y) = geometry.position().to_drawtext_position();
        assert_eq!(x, "(w-text_w)/2");
        assert_eq!(y, "80");
    }
}
