//! Observation types consumed by the proctoring engine.
//!
//! A [`Sample`] is one observation cycle: the faces found in a camera frame
//! (as normalized landmark sets) plus the ambient noise level measured
//! concurrently. Samples are produced by collaborator code (camera/audio
//! capture, landmark model) and are immutable once built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single normalized facial keypoint. Coordinates are in frame space,
/// `0.0..=1.0` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another landmark.
    pub fn distance(&self, other: &Landmark) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Landmark indices into the face-mesh layout produced by the upstream
/// landmark model. Eye contours are six points each: the horizontal pair at
/// positions 0 and 3, two vertical pairs at (1,5) and (2,4).
pub mod mesh {
    /// Left eye contour indices.
    pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
    /// Right eye contour indices.
    pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];
    /// Left iris center.
    pub const LEFT_IRIS: usize = 468;
    /// Right iris center.
    pub const RIGHT_IRIS: usize = 473;
    /// Upper inner-lip point.
    pub const MOUTH_TOP: usize = 13;
    /// Lower inner-lip point.
    pub const MOUTH_BOTTOM: usize = 14;
    /// Nose tip.
    pub const NOSE_TIP: usize = 1;
}

/// One detected face: the detector's confidence plus the landmark set.
///
/// The landmark vector may be empty or truncated (model failure, partial
/// detection). All downstream geometry goes through [`Face::landmark`] and
/// degrades to neutral values instead of panicking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    /// Detection confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// Normalized keypoints, indexed per [`mesh`].
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl Face {
    pub fn new(confidence: f64, landmarks: Vec<Landmark>) -> Self {
        Self {
            confidence,
            landmarks,
        }
    }

    /// Look up a landmark by mesh index, `None` if absent.
    pub fn landmark(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }
}

/// One observation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// When the frame was captured. This is the engine's clock: all temporal
    /// decisions are made against sample timestamps, never wall time.
    pub timestamp: DateTime<Utc>,
    /// Faces found in the frame, possibly empty.
    #[serde(default)]
    pub faces: Vec<Face>,
    /// Ambient audio RMS sampled concurrently with the frame.
    #[serde(default)]
    pub noise_level: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, faces: Vec<Face>, noise_level: f64) -> Self {
        Self {
            timestamp,
            faces,
            noise_level,
        }
    }

    /// The single confidently detected face, if there is exactly one.
    ///
    /// Per-face detectors are only evaluated in this case; zero faces, many
    /// faces, or a low-confidence detection all return `None`.
    pub fn sole_face(&self, min_confidence: f64) -> Option<&Face> {
        match self.faces.as_slice() {
            [face] if face.confidence >= min_confidence => Some(face),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_distance() {
        let a = Landmark::new(0.0, 0.0);
        let b = Landmark::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_landmark_lookup_out_of_range() {
        let face = Face::new(0.9, vec![Landmark::new(0.5, 0.5)]);
        assert!(face.landmark(0).is_some());
        assert!(face.landmark(mesh::NOSE_TIP).is_none());
    }

    #[test]
    fn test_sole_face_gating() {
        let now = Utc::now();
        let strong = Face::new(0.9, Vec::new());
        let weak = Face::new(0.2, Vec::new());

        let one = Sample::new(now, vec![strong.clone()], 0.0);
        assert!(one.sole_face(0.45).is_some());

        let low = Sample::new(now, vec![weak], 0.0);
        assert!(low.sole_face(0.45).is_none());

        let two = Sample::new(now, vec![strong.clone(), strong], 0.0);
        assert!(two.sole_face(0.45).is_none());

        let none = Sample::new(now, Vec::new(), 0.0);
        assert!(none.sole_face(0.45).is_none());
    }
}
