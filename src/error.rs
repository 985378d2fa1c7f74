use thiserror::Error;

use crate::pose::LandmarkIndex;

/// 検出パイプラインのエラー
///
/// `MissingLandmark` と `NonPositiveTimeDelta` は特徴量計算の内部でのみ使われ、
/// サンプルの無効化として吸収される。`ConfigurationInvalid` は起動時に致命的。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    #[error("landmark {joint:?} is missing or below the visibility floor")]
    MissingLandmark { joint: LandmarkIndex },

    #[error("non-positive time delta between frames: {delta:.4}s")]
    NonPositiveTimeDelta { delta: f64 },

    #[error("invalid configuration `{field}`: {reason}")]
    ConfigurationInvalid { field: &'static str, reason: String },

    #[error("expected {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_invalid_message() {
        let err = DetectionError::ConfigurationInvalid {
            field: "fall_confirm_duration_secs",
            reason: "must be > 0, got -1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration `fall_confirm_duration_secs`: must be > 0, got -1"
        );
    }

    #[test]
    fn test_missing_landmark_names_joint() {
        let err = DetectionError::MissingLandmark { joint: LandmarkIndex::LeftHip };
        assert!(err.to_string().contains("LeftHip"));
    }
}
