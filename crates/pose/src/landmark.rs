//! Body landmarks as reported by the pose estimator.

use cardiosim_types::UnitInterval;

/// Named positions in the 33-point pose landmark list.
///
/// Only the points the overlay reads are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkIndex {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
}

impl LandmarkIndex {
    /// Number of landmarks in a full pose frame.
    pub const COUNT: usize = 33;

    pub const fn index(self) -> usize {
        match self {
            LandmarkIndex::Nose => 0,
            LandmarkIndex::LeftShoulder => 11,
            LandmarkIndex::RightShoulder => 12,
            LandmarkIndex::LeftHip => 23,
            LandmarkIndex::RightHip => 24,
        }
    }
}

/// One landmark in normalised image coordinates.
///
/// `x` and `y` are nominally in `[0, 1]` but may fall slightly outside when the body part is
/// just off-frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Relative depth, when the model reports it.
    pub z: Option<f64>,
    pub visibility: UnitInterval,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: UnitInterval::ONE,
        }
    }

    pub fn with_visibility(mut self, visibility: UnitInterval) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_depth(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    fn is_usable(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Result of one inference: landmarks by index, any of which may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseFrame {
    landmarks: Vec<Option<Landmark>>,
}

impl PoseFrame {
    /// A frame in which no body was found.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_landmarks(landmarks: Vec<Option<Landmark>>) -> Self {
        Self { landmarks }
    }

    /// Set one landmark, growing the list as needed.
    pub fn with(mut self, index: LandmarkIndex, landmark: Landmark) -> Self {
        let i = index.index();
        if self.landmarks.len() <= i {
            self.landmarks.resize(i + 1, None);
        }
        self.landmarks[i] = Some(landmark);
        self
    }

    /// A landmark by name. Non-finite coordinates count as missing.
    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks
            .get(index.index())
            .and_then(Option::as_ref)
            .filter(|lm| lm.is_usable())
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_non_finite_landmarks_read_as_absent() {
        let frame = PoseFrame::empty()
            .with(LandmarkIndex::LeftShoulder, Landmark::new(0.4, 0.3))
            .with(LandmarkIndex::RightHip, Landmark::new(f64::NAN, 0.8));

        assert!(frame.get(LandmarkIndex::LeftShoulder).is_some());
        assert!(frame.get(LandmarkIndex::RightShoulder).is_none());
        assert!(frame.get(LandmarkIndex::RightHip).is_none());
        assert!(PoseFrame::empty().is_empty());
        assert!(!frame.is_empty());
    }
}
