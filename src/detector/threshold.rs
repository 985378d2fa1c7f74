use crate::config::DetectionConfig;
use crate::detector::features::FeatureSample;

/// 閾値判定に使う値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub velocity: f32,
    pub angle_deg: f32,
    pub height_factor: f32,
}

impl Thresholds {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            velocity: config.velocity_threshold,
            angle_deg: config.angle_threshold_deg,
            height_factor: config.height_threshold_factor,
        }
    }
}

/// 特徴量ごとの跌倒指標
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndicatorSet {
    /// 腰が閾値より速く下降している
    pub velocity_high: bool,
    /// 胴体が水平に近い
    pub angle_horizontal: bool,
    /// 腰が画面下部にある
    pub height_low: bool,
}

impl IndicatorSet {
    /// 急降下、または水平かつ低い姿勢
    pub fn triggered(&self) -> bool {
        self.velocity_high || (self.angle_horizontal && self.height_low)
    }
}

/// 無効サンプルからは指標を立てない
pub fn evaluate(sample: &FeatureSample, thresholds: &Thresholds) -> IndicatorSet {
    if !sample.valid {
        return IndicatorSet::default();
    }
    IndicatorSet {
        velocity_high: sample
            .vertical_velocity
            .is_some_and(|v| v > thresholds.velocity),
        angle_horizontal: sample
            .torso_angle_deg
            .is_some_and(|a| a > thresholds.angle_deg),
        height_low: sample.normalized_hip_height > thresholds.height_factor,
    }
}
