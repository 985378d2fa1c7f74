//! Per-frame kinematic features: hip-center vertical velocity, torso tilt
//! and normalized hip height.

use log::{debug, warn};

use crate::error::DetectionError;
use crate::pose::{LandmarkFrame, LandmarkIndex, Point3};

/// Shorter torso vectors than this (normalized units) have no usable direction.
const MIN_TORSO_LENGTH: f32 = 1e-4;

/// Features derived from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureSample {
    /// Hip-center vertical velocity in frame heights per second, positive = downward.
    /// `None` when it could not be measured this frame (first valid frame,
    /// bad time delta); an unmeasured velocity is never evidence.
    pub vertical_velocity: Option<f32>,
    /// Angle between the shoulder→hip vector and the vertical axis, 0° = upright.
    /// `None` when the shoulders are not visible.
    pub torso_angle_deg: Option<f32>,
    /// Hip-center Y, 0 = top of frame, 1 = bottom. Meaningless when `valid` is false.
    pub normalized_hip_height: f32,
    /// Both hips were visible.
    pub valid: bool,
    /// The landmark source reported a person in this frame.
    pub person_detected: bool,
}

impl FeatureSample {
    /// Sample for a frame without a detected person.
    pub fn absent() -> Self {
        Self::default()
    }

    /// Velocity as reported downstream: 0 when not measured.
    pub fn velocity(&self) -> f32 {
        self.vertical_velocity.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HipSnapshot {
    y: f32,
    timestamp: f64,
}

/// Midpoint of the two hips, both of which must be visible.
pub fn hip_center(frame: &LandmarkFrame, min_visibility: f32) -> Result<Point3, DetectionError> {
    visible_midpoint(frame, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, min_visibility)
}

/// Midpoint of the two shoulders, both of which must be visible.
pub fn shoulder_center(frame: &LandmarkFrame, min_visibility: f32) -> Result<Point3, DetectionError> {
    visible_midpoint(
        frame,
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::RightShoulder,
        min_visibility,
    )
}

fn visible_midpoint(
    frame: &LandmarkFrame,
    left: LandmarkIndex,
    right: LandmarkIndex,
    min_visibility: f32,
) -> Result<Point3, DetectionError> {
    for joint in [left, right] {
        if !frame.get(joint).is_visible(min_visibility) {
            return Err(DetectionError::MissingLandmark { joint });
        }
    }
    Ok(Point3::midpoint(
        frame.get(left).position(),
        frame.get(right).position(),
    ))
}

/// Tilt of the torso from vertical in degrees, in [0, 180].
///
/// Uses the image-plane components only: the dot product of the
/// shoulder→hip direction with the downward unit vector (0, 1).
pub fn torso_angle_deg(shoulder_center: Point3, hip_center: Point3) -> Option<f32> {
    let dx = hip_center.x - shoulder_center.x;
    let dy = hip_center.y - shoulder_center.y;
    let len = (dx * dx + dy * dy).sqrt();
    if !len.is_finite() || len < MIN_TORSO_LENGTH {
        return None;
    }
    let cos = (dy / len).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees().clamp(0.0, 180.0))
}

fn time_delta(previous: f64, now: f64) -> Result<f64, DetectionError> {
    let delta = now - previous;
    if delta > 0.0 {
        Ok(delta)
    } else {
        Err(DetectionError::NonPositiveTimeDelta { delta })
    }
}

/// Extracts [`FeatureSample`]s, keeping the last valid hip center for velocity.
///
/// The stored hip center survives invalid frames, so the velocity after a
/// brief occlusion is measured across the gap.
pub struct FeatureExtractor {
    min_visibility: f32,
    max_time_delta: f64,
    previous: Option<HipSnapshot>,
}

impl FeatureExtractor {
    pub fn new(min_visibility: f32, max_time_delta: f64) -> Self {
        Self {
            min_visibility,
            max_time_delta,
            previous: None,
        }
    }

    pub fn extract(&mut self, frame: &LandmarkFrame) -> FeatureSample {
        let hip = match hip_center(frame, self.min_visibility) {
            Ok(hip) => hip,
            Err(e) => {
                debug!("t={:.3} invalid sample: {}", frame.timestamp, e);
                return FeatureSample {
                    person_detected: true,
                    ..FeatureSample::default()
                };
            }
        };

        let torso_angle_deg = match shoulder_center(frame, self.min_visibility) {
            Ok(shoulder) => torso_angle_deg(shoulder, hip),
            Err(e) => {
                debug!("t={:.3} torso angle unavailable: {}", frame.timestamp, e);
                None
            }
        };

        let vertical_velocity = self.vertical_velocity(hip.y, frame.timestamp);

        let sample = FeatureSample {
            vertical_velocity,
            torso_angle_deg,
            normalized_hip_height: hip.y,
            valid: true,
            person_detected: true,
        };
        debug!("t={:.3} features: {:?}", frame.timestamp, sample);
        sample
    }

    fn vertical_velocity(&mut self, hip_y: f32, now: f64) -> Option<f32> {
        let current = HipSnapshot { y: hip_y, timestamp: now };
        let prev = match self.previous {
            Some(prev) => prev,
            None => {
                self.previous = Some(current);
                return None;
            }
        };

        match time_delta(prev.timestamp, now) {
            Err(e) => {
                // 重複フレーム: 前回値は保持
                warn!("t={:.3} velocity skipped: {}", now, e);
                None
            }
            Ok(dt) if dt > self.max_time_delta => {
                warn!(
                    "t={:.3} velocity skipped: frame gap {:.3}s exceeds {:.3}s",
                    now, dt, self.max_time_delta
                );
                self.previous = Some(current);
                None
            }
            Ok(dt) => {
                self.previous = Some(current);
                Some(((hip_y - prev.y) as f64 / dt) as f32)
            }
        }
    }
}
