//! CPR guidance overlay drawn on top of the camera view.
//!
//! The renderer draws through the [`Canvas`] trait so that any 2D surface can host it.
//! [`RecordingCanvas`] keeps the draw calls as a display list, which is what the tests and the CLI
//! demo inspect.

use crate::geometry::{compression_target, to_canvas, CanvasSize, CompressionTarget, Point};
use crate::landmark::{LandmarkIndex, PoseFrame};
use std::f64::consts::TAU;
use std::time::Duration;

pub const BASE_RADIUS: f64 = 32.0;
pub const GLOW_FACTOR: f64 = 1.6;
pub const PULSE_AMPLITUDE: f64 = 0.18;
/// Milliseconds per radian of the pulse sine wave.
pub const PULSE_PERIOD_DIVISOR_MS: f64 = 450.0;
pub const CROSSHAIR_HALF_LENGTH: f64 = 18.0;
pub const JOINT_RADIUS: f64 = 6.0;

const TARGET_RED: &str = "#ef4444";
const SKELETON_BLUE: &str = "rgba(99,179,237,0.5)";
const JOINT_BLUE: &str = "rgba(99,179,237,0.9)";
const LABEL_WHITE: &str = "rgba(255,255,255,0.85)";

const SKELETON_PAIRS: [(LandmarkIndex, LandmarkIndex); 4] = [
    (LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder),
    (LandmarkIndex::LeftShoulder, LandmarkIndex::LeftHip),
    (LandmarkIndex::RightShoulder, LandmarkIndex::RightHip),
    (LandmarkIndex::LeftHip, LandmarkIndex::RightHip),
];

const JOINTS: [LandmarkIndex; 4] = [
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftHip,
    LandmarkIndex::RightHip,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: &'static str,
    pub width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: &'static str,
}

const GLOW_STOPS: [GradientStop; 3] = [
    GradientStop {
        offset: 0.0,
        color: "rgba(239,68,68,0.0)",
    },
    GradientStop {
        offset: 0.5,
        color: "rgba(239,68,68,0.15)",
    },
    GradientStop {
        offset: 1.0,
        color: "rgba(239,68,68,0.0)",
    },
];

/// Centre-aligned text style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: &'static str,
    pub font: &'static str,
}

/// A 2D drawing surface.
pub trait Canvas {
    fn size(&self) -> CanvasSize;
    fn resize(&mut self, size: CanvasSize);
    fn clear(&mut self);
    fn line(&mut self, from: Point, to: Point, stroke: Stroke);
    fn fill_circle(&mut self, center: Point, radius: f64, color: &'static str);
    fn stroke_circle(&mut self, center: Point, radius: f64, stroke: Stroke);
    /// Filled circle shaded by a radial gradient from the centre outwards.
    fn radial_glow(&mut self, center: Point, radius: f64, stops: &[GradientStop]);
    fn text(&mut self, at: Point, text: &str, style: TextStyle);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    FillCircle {
        center: Point,
        radius: f64,
        color: &'static str,
    },
    StrokeCircle {
        center: Point,
        radius: f64,
        stroke: Stroke,
    },
    RadialGlow {
        center: Point,
        radius: f64,
        stops: Vec<GradientStop>,
    },
    Text {
        at: Point,
        text: String,
        style: TextStyle,
    },
}

impl std::fmt::Display for DrawCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawCommand::Clear => write!(f, "clear"),
            DrawCommand::Line { from, to, stroke } => write!(
                f,
                "line ({:.1},{:.1})->({:.1},{:.1}) {} w{}",
                from.x, from.y, to.x, to.y, stroke.color, stroke.width
            ),
            DrawCommand::FillCircle {
                center,
                radius,
                color,
            } => write!(
                f,
                "fill_circle ({:.1},{:.1}) r{:.1} {}",
                center.x, center.y, radius, color
            ),
            DrawCommand::StrokeCircle {
                center,
                radius,
                stroke,
            } => write!(
                f,
                "stroke_circle ({:.1},{:.1}) r{:.1} {} w{}",
                center.x, center.y, radius, stroke.color, stroke.width
            ),
            DrawCommand::RadialGlow {
                center,
                radius,
                stops,
            } => write!(
                f,
                "radial_glow ({:.1},{:.1}) r{:.1} stops={}",
                center.x,
                center.y,
                radius,
                stops.len()
            ),
            DrawCommand::Text { at, text, style } => {
                write!(f, "text ({:.1},{:.1}) {:?} {}", at.x, at.y, text, style.color)
            }
        }
    }
}

/// Canvas that records draw calls since the last clear.
#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    size: CanvasSize,
    commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new(size: CanvasSize) -> Self {
        Self {
            size,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// `true` when nothing has been drawn since the last clear.
    pub fn is_blank(&self) -> bool {
        self.commands
            .iter()
            .all(|cmd| matches!(cmd, DrawCommand::Clear))
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> CanvasSize {
        self.size
    }

    fn resize(&mut self, size: CanvasSize) {
        // Resizing a canvas wipes it.
        self.size = size;
        self.commands.clear();
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn line(&mut self, from: Point, to: Point, stroke: Stroke) {
        self.commands.push(DrawCommand::Line { from, to, stroke });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &'static str) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color,
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, stroke: Stroke) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            stroke,
        });
    }

    fn radial_glow(&mut self, center: Point, radius: f64, stops: &[GradientStop]) {
        self.commands.push(DrawCommand::RadialGlow {
            center,
            radius,
            stops: stops.to_vec(),
        });
    }

    fn text(&mut self, at: Point, text: &str, style: TextStyle) {
        self.commands.push(DrawCommand::Text {
            at,
            text: text.to_string(),
            style,
        });
    }
}

/// Scale factor of the target ring at clock time `now`.
pub fn pulse_scale(now: Duration) -> f64 {
    let phase = now.as_secs_f64() * 1000.0 / PULSE_PERIOD_DIVISOR_MS;
    1.0 + phase.sin() * PULSE_AMPLITUDE
}

/// Time for the pulse to complete one full cycle.
pub fn pulse_cycle() -> Duration {
    Duration::from_secs_f64(TAU * PULSE_PERIOD_DIVISOR_MS / 1000.0)
}

#[derive(Debug, Clone, Copy)]
pub struct OverlayRenderer {
    target_offset_px: f64,
}

impl OverlayRenderer {
    pub fn new(target_offset_px: f64) -> Self {
        Self { target_offset_px }
    }

    /// Redraw the overlay for one pose result.
    ///
    /// The canvas is always cleared. Guidance is drawn only when both shoulders are present; the
    /// returned target is `None` otherwise.
    pub fn render(
        &self,
        frame: Option<&PoseFrame>,
        canvas: &mut dyn Canvas,
        now: Duration,
    ) -> Option<CompressionTarget> {
        canvas.clear();

        let frame = frame?;
        let size = canvas.size();
        let target = compression_target(frame, size, self.target_offset_px)?;

        let skeleton = Stroke {
            color: SKELETON_BLUE,
            width: 2.0,
        };
        for (a, b) in SKELETON_PAIRS {
            if let (Some(a), Some(b)) = (frame.get(a), frame.get(b)) {
                canvas.line(to_canvas(a, size), to_canvas(b, size), skeleton);
            }
        }
        for joint in JOINTS {
            if let Some(lm) = frame.get(joint) {
                canvas.fill_circle(to_canvas(lm, size), JOINT_RADIUS, JOINT_BLUE);
            }
        }

        let center = target.point();
        let radius = BASE_RADIUS * pulse_scale(now);

        canvas.radial_glow(center, radius * GLOW_FACTOR, &GLOW_STOPS);
        canvas.stroke_circle(
            center,
            radius,
            Stroke {
                color: TARGET_RED,
                width: 3.0,
            },
        );

        let crosshair = Stroke {
            color: TARGET_RED,
            width: 2.0,
        };
        let d = CROSSHAIR_HALF_LENGTH;
        canvas.line(center.offset(-d, 0.0), center.offset(d, 0.0), crosshair);
        canvas.line(center.offset(0.0, -d), center.offset(0.0, d), crosshair);

        canvas.text(
            center.offset(0.0, -radius - 10.0),
            "COMPRESS HERE",
            TextStyle {
                color: TARGET_RED,
                font: "bold 13px sans-serif",
            },
        );
        canvas.text(
            center.offset(0.0, radius + 20.0),
            "Push 5\u{2013}6 cm deep",
            TextStyle {
                color: LABEL_WHITE,
                font: "11px sans-serif",
            },
        );

        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;

    fn torso() -> PoseFrame {
        PoseFrame::empty()
            .with(LandmarkIndex::LeftShoulder, Landmark::new(0.4, 0.3))
            .with(LandmarkIndex::RightShoulder, Landmark::new(0.6, 0.3))
            .with(LandmarkIndex::LeftHip, Landmark::new(0.42, 0.7))
            .with(LandmarkIndex::RightHip, Landmark::new(0.58, 0.7))
    }

    #[test]
    fn full_torso_draws_skeleton_ring_and_labels() {
        let mut canvas = RecordingCanvas::new(CanvasSize::new(640, 480));
        let target = OverlayRenderer::new(30.0)
            .render(Some(&torso()), &mut canvas, Duration::ZERO)
            .expect("target");
        assert!((target.x - 320.0).abs() < 1e-9);

        let cmds = canvas.commands();
        assert_eq!(cmds[0], DrawCommand::Clear);
        let lines = cmds
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
            .count();
        // Four skeleton segments and two crosshair strokes.
        assert_eq!(lines, 6);
        let joints = cmds
            .iter()
            .filter(|c| matches!(c, DrawCommand::FillCircle { .. }))
            .count();
        assert_eq!(joints, 4);
        assert!(cmds.iter().any(|c| matches!(
            c,
            DrawCommand::StrokeCircle { radius, .. } if (*radius - BASE_RADIUS).abs() < 1e-9
        )));
        assert_eq!(
            canvas.texts().collect::<Vec<_>>(),
            vec!["COMPRESS HERE", "Push 5\u{2013}6 cm deep"]
        );
    }

    #[test]
    fn missing_right_shoulder_clears_and_draws_nothing() {
        let mut canvas = RecordingCanvas::new(CanvasSize::new(640, 480));
        canvas.text(Point::new(1.0, 1.0), "stale", TextStyle {
            color: LABEL_WHITE,
            font: "11px sans-serif",
        });

        let frame = PoseFrame::empty()
            .with(LandmarkIndex::LeftShoulder, Landmark::new(0.4, 0.3))
            .with(LandmarkIndex::LeftHip, Landmark::new(0.42, 0.7));
        let target = OverlayRenderer::new(30.0).render(Some(&frame), &mut canvas, Duration::ZERO);

        assert_eq!(target, None);
        assert!(canvas.is_blank());
        assert_eq!(canvas.commands(), &[DrawCommand::Clear]);
    }

    #[test]
    fn no_pose_clears_canvas() {
        let mut canvas = RecordingCanvas::new(CanvasSize::new(640, 480));
        assert_eq!(
            OverlayRenderer::new(30.0).render(None, &mut canvas, Duration::from_secs(3)),
            None
        );
        assert!(canvas.is_blank());
    }

    #[test]
    fn pulse_oscillates_within_amplitude() {
        assert!((pulse_scale(Duration::ZERO) - 1.0).abs() < 1e-12);
        let quarter = Duration::from_secs_f64(std::f64::consts::FRAC_PI_2 * 0.45);
        assert!((pulse_scale(quarter) - 1.18).abs() < 1e-9);
        for ms in (0..5000).step_by(37) {
            let s = pulse_scale(Duration::from_millis(ms));
            assert!((0.82 - 1e-12..=1.18 + 1e-12).contains(&s));
        }
        assert!((pulse_cycle().as_secs_f64() - 2.827).abs() < 1e-3);
    }
}
