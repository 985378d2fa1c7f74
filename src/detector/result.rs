use crate::detector::features::FeatureSample;
use crate::detector::state::DetectionState;
use crate::detector::threshold::IndicatorSet;

/// フレーム処理後の判定結果（描画層へ渡す読み取り専用スナップショット）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectionResult {
    pub timestamp: f64,
    pub state: DetectionState,
    /// このフレームを処理する前の状態
    pub previous_state: DetectionState,
    pub sample: FeatureSample,
    pub indicators: IndicatorSet,
    /// 疑似跌倒の経過時間（秒）
    pub potential_elapsed: Option<f64>,
}

fn fmt_opt(value: Option<f32>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "N/A".to_string(),
    }
}

impl DetectionResult {
    pub fn label(&self) -> &'static str {
        self.state.label()
    }

    /// このフレームで状態が変わったか
    pub fn changed(&self) -> bool {
        self.state != self.previous_state
    }

    /// 画面上部に表示するステータス文字列
    pub fn status_text(&self) -> String {
        match (self.state, self.potential_elapsed) {
            (DetectionState::Potential, Some(elapsed)) => {
                format!("Status: {} ({:.1}s)", self.label(), elapsed)
            }
            _ => format!("Status: {}", self.label()),
        }
    }

    /// デバッグ表示用の行
    pub fn debug_lines(&self) -> Vec<String> {
        let sample = &self.sample;
        let ind = &self.indicators;
        let hip_y = sample.valid.then_some(sample.normalized_hip_height);

        let mut lines = Vec::with_capacity(5);
        if !sample.person_detected {
            lines.push("No Person Detected".to_string());
        }
        lines.push(format!("Vert Vel: {}", fmt_opt(sample.vertical_velocity, 2)));
        lines.push(format!("Angle: {}", fmt_opt(sample.torso_angle_deg, 1)));
        lines.push(format!("Low H: {} (Y:{})", ind.height_low, fmt_opt(hip_y, 2)));
        lines.push(format!(
            "Flags: V={}, H={}, L={}",
            ind.velocity_high, ind.angle_horizontal, ind.height_low
        ));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn falling_result() -> DetectionResult {
        DetectionResult {
            timestamp: 1.5,
            state: DetectionState::Potential,
            previous_state: DetectionState::Normal,
            sample: FeatureSample {
                vertical_velocity: Some(0.624),
                torso_angle_deg: Some(84.06),
                normalized_hip_height: 0.853,
                valid: true,
                person_detected: true,
            },
            indicators: IndicatorSet {
                velocity_high: true,
                angle_horizontal: true,
                height_low: true,
            },
            potential_elapsed: Some(1.26),
        }
    }

    #[test]
    fn test_status_text() {
        let mut r = falling_result();
        assert_eq!(r.status_text(), "Status: Potential Fall... (1.3s)");
        r.state = DetectionState::Confirmed;
        assert_eq!(r.status_text(), "Status: FALL DETECTED!");
        assert_eq!(DetectionResult::default().status_text(), "Status: Normal");
    }

    #[test]
    fn test_changed() {
        let mut r = falling_result();
        assert!(r.changed());
        r.previous_state = DetectionState::Potential;
        assert!(!r.changed());
    }

    #[test]
    fn test_debug_lines() {
        let lines = falling_result().debug_lines();
        assert_eq!(
            lines,
            vec![
                "Vert Vel: 0.62",
                "Angle: 84.1",
                "Low H: true (Y:0.85)",
                "Flags: V=true, H=true, L=true",
            ]
        );
    }

    #[test]
    fn test_debug_lines_no_person() {
        let lines = DetectionResult::default().debug_lines();
        assert_eq!(lines[0], "No Person Detected");
        assert_eq!(lines[1], "Vert Vel: N/A");
        assert_eq!(lines[2], "Angle: N/A");
        assert_eq!(lines[3], "Low H: false (Y:N/A)");
    }
}
