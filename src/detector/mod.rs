pub mod features;
pub mod result;
pub mod state;
pub mod threshold;

pub use features::{FeatureExtractor, FeatureSample};
pub use result::DetectionResult;
pub use state::{transition, DetectionState, PersistenceTimer};
pub use threshold::{evaluate, IndicatorSet, Thresholds};

use log::{info, warn};

use crate::config::DetectionConfig;
use crate::error::DetectionError;
use crate::pose::LandmarkFrame;

/// 跌倒検出パイプライン
///
/// 前回の腰位置・持続タイマー・現在の状態をすべて保持するコンテキスト。
/// 1フレームずつ `process` / `process_absent` を呼び、`reset` で手動リセットする。
pub struct FallDetector {
    thresholds: Thresholds,
    confirm_duration: f64,
    extractor: FeatureExtractor,
    timer: PersistenceTimer,
    state: DetectionState,
    last_result: DetectionResult,
}

impl FallDetector {
    /// 設定を検証して作成
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionError> {
        config.validate()?;
        Ok(Self {
            thresholds: Thresholds::from_config(config),
            confirm_duration: config.fall_confirm_duration_secs,
            extractor: FeatureExtractor::new(config.min_visibility, config.max_time_delta_secs),
            timer: PersistenceTimer::default(),
            state: DetectionState::Normal,
            last_result: DetectionResult::default(),
        })
    }

    /// 人物が検出されたフレームを処理
    pub fn process(&mut self, frame: &LandmarkFrame) -> DetectionResult {
        let sample = self.extractor.extract(frame);
        self.apply(sample, frame.timestamp)
    }

    /// 人物が検出されなかったフレームを処理（無効サンプルと同じ扱い）
    pub fn process_absent(&mut self, now: f64) -> DetectionResult {
        self.apply(FeatureSample::absent(), now)
    }

    fn apply(&mut self, sample: FeatureSample, now: f64) -> DetectionResult {
        let indicators = evaluate(&sample, &self.thresholds);
        let previous_state = self.state;
        self.state = transition(
            previous_state,
            &mut self.timer,
            &indicators,
            sample.valid,
            now,
            self.confirm_duration,
        );

        match (previous_state, self.state) {
            (DetectionState::Normal, DetectionState::Potential) => {
                info!("t={:.3} potential fall detected, timer started", now);
            }
            (DetectionState::Potential, DetectionState::Normal) => {
                info!("t={:.3} posture recovered, timer cleared", now);
            }
            (from, DetectionState::Confirmed) if from != DetectionState::Confirmed => {
                warn!(
                    "t={:.3} FALL CONFIRMED after {:.2}s",
                    now,
                    self.timer.elapsed(now).unwrap_or(0.0)
                );
            }
            _ => {}
        }

        let potential_elapsed = match self.state {
            DetectionState::Potential => self.timer.elapsed(now),
            _ => None,
        };
        self.last_result = DetectionResult {
            timestamp: now,
            state: self.state,
            previous_state,
            sample,
            indicators,
            potential_elapsed,
        };
        self.last_result
    }

    /// 手動リセット: 状態に関係なく Normal に戻し、タイマーを消去
    ///
    /// 前回の腰位置は保持するので、直後のフレームでも速度を計算できる。
    pub fn reset(&mut self) {
        if self.state != DetectionState::Normal || self.timer.potential_since.is_some() {
            info!("fall state manually reset (was {:?})", self.state);
        }
        self.state = DetectionState::Normal;
        self.timer.clear();
        self.last_result.state = DetectionState::Normal;
        self.last_result.potential_elapsed = None;
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn timer(&self) -> PersistenceTimer {
        self.timer
    }

    /// 直近フレームの結果
    pub fn last_result(&self) -> &DetectionResult {
        &self.last_result
    }
}
