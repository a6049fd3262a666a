//! Stateless per-sample signal derivation.
//!
//! These functions turn a face's raw landmarks into the scalar metrics the
//! temporal detectors consume. All of them are total: malformed or missing
//! keypoints produce a neutral value (`0.0` or `None`), never a panic, so a
//! face with unresolvable geometry can never abort the processing loop.

use crate::source::types::{mesh, Face};

/// Width below which an eye contour is considered degenerate.
const DEGENERATE_EYE_WIDTH: f64 = 1e-6;

/// Eye-closure ratio for one six-point eye contour.
///
/// Average of the two vertical point-pair openings divided by the horizontal
/// eye width. Open eyes sit around 0.25-0.35; a closed eye drops well below
/// the blink threshold. Returns 0.0 when any contour point is missing or the
/// width is degenerate.
pub fn eye_closure_ratio(face: &Face, eye: &[usize; 6]) -> f64 {
    let p = |i: usize| face.landmark(eye[i]);
    let (Some(p0), Some(p1), Some(p2), Some(p3), Some(p4), Some(p5)) =
        (p(0), p(1), p(2), p(3), p(4), p(5))
    else {
        return 0.0;
    };

    let vertical_a = p1.distance(&p5);
    let vertical_b = p2.distance(&p4);
    let width = p0.distance(&p3);
    if width <= DEGENERATE_EYE_WIDTH {
        return 0.0;
    }
    (vertical_a + vertical_b) / (2.0 * width)
}

/// Average closure ratio across both eyes.
pub fn average_eye_closure(face: &Face) -> f64 {
    let left = eye_closure_ratio(face, &mesh::LEFT_EYE);
    let right = eye_closure_ratio(face, &mesh::RIGHT_EYE);
    (left + right) / 2.0
}

/// Mouth openness: distance between the inner-lip top and bottom points.
/// 0.0 when either point is missing.
pub fn mouth_openness(face: &Face) -> f64 {
    match (
        face.landmark(mesh::MOUTH_TOP),
        face.landmark(mesh::MOUTH_BOTTOM),
    ) {
        (Some(top), Some(bottom)) => top.distance(&bottom),
        _ => 0.0,
    }
}

/// Absolute deviation of the nose tip from frame center, per axis.
/// `None` when the nose tip is absent.
pub fn head_offset(face: &Face) -> Option<(f64, f64)> {
    let nose = face.landmark(mesh::NOSE_TIP)?;
    Some(((nose.x - 0.5).abs(), (nose.y - 0.5).abs()))
}

/// Current gaze coordinate: average of the two iris centers.
/// `None` when either iris is unresolvable.
pub fn iris_average(face: &Face) -> Option<(f64, f64)> {
    let left = face.landmark(mesh::LEFT_IRIS)?;
    let right = face.landmark(mesh::RIGHT_IRIS)?;
    Some(((left.x + right.x) / 2.0, (left.y + right.y) / 2.0))
}

/// Signed gaze offset from the calibrated baseline, per axis.
pub fn gaze_offset(face: &Face, baseline_x: f64, baseline_y: f64) -> Option<(f64, f64)> {
    let (x, y) = iris_average(face)?;
    Some((x - baseline_x, y - baseline_y))
}

/// Population variance of a slice of values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Root-mean-square of an audio buffer.
pub fn rms(buffer: &[f64]) -> f64 {
    if buffer.is_empty() {
        return 0.0;
    }
    (buffer.iter().map(|&s| s * s).sum::<f64>() / buffer.len() as f64).sqrt()
}
