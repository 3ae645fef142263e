//! Mapping from normalised landmark coordinates to canvas pixels.

use crate::landmark::{Landmark, LandmarkIndex, PoseFrame};

/// Pixel dimensions of the overlay canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size from the video's native resolution, or `fallback` while it is not yet known.
    pub fn from_video(width: u32, height: u32, fallback: CanvasSize) -> Self {
        Self {
            width: if width == 0 { fallback.width } else { width },
            height: if height == 0 { fallback.height } else { height },
        }
    }
}

impl std::fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Where chest compressions should be applied, in canvas pixels. Valid for one frame only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionTarget {
    pub x: f64,
    pub y: f64,
}

impl CompressionTarget {
    pub fn point(self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub fn to_canvas(landmark: &Landmark, size: CanvasSize) -> Point {
    Point::new(
        landmark.x * f64::from(size.width),
        landmark.y * f64::from(size.height),
    )
}

/// Shoulder midpoint moved down by `offset_px`, or `None` unless both shoulders are present.
pub fn compression_target(
    frame: &PoseFrame,
    size: CanvasSize,
    offset_px: f64,
) -> Option<CompressionTarget> {
    let left = frame.get(LandmarkIndex::LeftShoulder)?;
    let right = frame.get(LandmarkIndex::RightShoulder)?;

    Some(CompressionTarget {
        x: (left.x + right.x) / 2.0 * f64::from(size.width),
        y: (left.y + right.y) / 2.0 * f64::from(size.height) + offset_px,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VGA: CanvasSize = CanvasSize::new(640, 480);

    fn shoulders(left: (f64, f64), right: (f64, f64)) -> PoseFrame {
        PoseFrame::empty()
            .with(LandmarkIndex::LeftShoulder, Landmark::new(left.0, left.1))
            .with(LandmarkIndex::RightShoulder, Landmark::new(right.0, right.1))
    }

    #[test]
    fn target_is_shoulder_midpoint_plus_offset() {
        let frame = shoulders((0.4, 0.3), (0.6, 0.3));
        let target = compression_target(&frame, VGA, 30.0).expect("both shoulders");
        assert!((target.x - 320.0).abs() < 1e-9);
        assert!((target.y - 174.0).abs() < 1e-9);
    }

    #[test]
    fn target_scales_with_canvas() {
        let frame = shoulders((0.4, 0.3), (0.6, 0.3));
        let target = compression_target(&frame, CanvasSize::new(1280, 720), 30.0)
            .expect("both shoulders");
        assert!((target.x - 640.0).abs() < 1e-9);
        assert!((target.y - 246.0).abs() < 1e-9);
    }

    #[test]
    fn missing_shoulder_gives_no_target() {
        let frame = PoseFrame::empty()
            .with(LandmarkIndex::LeftShoulder, Landmark::new(0.4, 0.3));
        assert_eq!(compression_target(&frame, VGA, 30.0), None);
    }

    #[test]
    fn unknown_video_size_uses_fallback() {
        assert_eq!(CanvasSize::from_video(0, 0, VGA), VGA);
        assert_eq!(
            CanvasSize::from_video(1920, 1080, VGA),
            CanvasSize::new(1920, 1080)
        );
    }
}
