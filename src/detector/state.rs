//! Persistence state machine turning per-frame indicators into a debounced
//! fall decision.
//!
//! `Confirmed` is sticky: only [`PersistenceTimer::clear`] plus an explicit
//! return to `Normal` (see `FallDetector::reset`) leaves it.

use crate::detector::threshold::IndicatorSet;

/// Body state reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DetectionState {
    #[default]
    Normal,
    Potential,
    Confirmed,
}

impl DetectionState {
    /// Display label for overlays.
    pub fn label(&self) -> &'static str {
        match self {
            DetectionState::Normal => "Normal",
            DetectionState::Potential => "Potential Fall...",
            DetectionState::Confirmed => "FALL DETECTED!",
        }
    }
}

/// Start of the current potential-fall episode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PersistenceTimer {
    pub potential_since: Option<f64>,
}

impl PersistenceTimer {
    pub fn clear(&mut self) {
        self.potential_since = None;
    }

    /// Seconds since the episode began, if one is running.
    pub fn elapsed(&self, now: f64) -> Option<f64> {
        self.potential_since.map(|since| now - since)
    }

    fn reached(&self, now: f64, duration: f64) -> bool {
        self.elapsed(now).is_some_and(|e| e >= duration)
    }
}

/// Evaluates one frame.
///
/// `valid == false` means the frame carried no new evidence: the timer is
/// left untouched, and a running episode still confirms once its duration
/// has elapsed.
pub fn transition(
    state: DetectionState,
    timer: &mut PersistenceTimer,
    indicators: &IndicatorSet,
    valid: bool,
    now: f64,
    confirm_duration: f64,
) -> DetectionState {
    let triggered = valid && indicators.triggered();

    match state {
        DetectionState::Confirmed => DetectionState::Confirmed,
        DetectionState::Potential if !valid => {
            if timer.reached(now, confirm_duration) {
                DetectionState::Confirmed
            } else {
                DetectionState::Potential
            }
        }
        DetectionState::Normal if !valid => DetectionState::Normal,
        DetectionState::Normal | DetectionState::Potential if triggered => {
            if timer.potential_since.is_none() {
                timer.potential_since = Some(now);
            }
            if timer.reached(now, confirm_duration) {
                DetectionState::Confirmed
            } else {
                DetectionState::Potential
            }
        }
        DetectionState::Normal | DetectionState::Potential => {
            timer.clear();
            DetectionState::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DURATION: f64 = 1.0;

    fn triggered() -> IndicatorSet {
        IndicatorSet {
            velocity_high: true,
            ..IndicatorSet::default()
        }
    }

    fn quiet() -> IndicatorSet {
        IndicatorSet::default()
    }

    #[test]
    fn test_labels() {
        assert_eq!(DetectionState::Normal.label(), "Normal");
        assert_eq!(DetectionState::Potential.label(), "Potential Fall...");
        assert_eq!(DetectionState::Confirmed.label(), "FALL DETECTED!");
    }

    #[test]
    fn test_normal_to_potential_starts_timer() {
        let mut timer = PersistenceTimer::default();
        let s = transition(DetectionState::Normal, &mut timer, &triggered(), true, 0.2, DURATION);
        assert_eq!(s, DetectionState::Potential);
        assert_eq!(timer.potential_since, Some(0.2));
    }

    #[test]
    fn test_potential_holds_until_duration() {
        let mut timer = PersistenceTimer { potential_since: Some(0.2) };
        let s = transition(DetectionState::Potential, &mut timer, &triggered(), true, 0.5, DURATION);
        assert_eq!(s, DetectionState::Potential);
        assert_eq!(timer.potential_since, Some(0.2));
    }

    #[test]
    fn test_confirms_exactly_at_duration() {
        let mut timer = PersistenceTimer { potential_since: Some(0.5) };
        let s = transition(DetectionState::Potential, &mut timer, &triggered(), true, 1.5, DURATION);
        assert_eq!(s, DetectionState::Confirmed);
    }

    #[test]
    fn test_normal_with_stale_timer_confirms() {
        let mut timer = PersistenceTimer { potential_since: Some(0.0) };
        let s = transition(DetectionState::Normal, &mut timer, &triggered(), true, 1.2, DURATION);
        assert_eq!(s, DetectionState::Confirmed);
    }

    #[test]
    fn test_potential_clears_when_condition_ends() {
        let mut timer = PersistenceTimer { potential_since: Some(0.2) };
        let s = transition(DetectionState::Potential, &mut timer, &quiet(), true, 0.6, DURATION);
        assert_eq!(s, DetectionState::Normal);
        assert_eq!(timer.potential_since, None);
    }

    #[test]
    fn test_invalid_frame_holds_potential_and_timer() {
        let mut timer = PersistenceTimer { potential_since: Some(0.2) };
        let s = transition(DetectionState::Potential, &mut timer, &quiet(), false, 0.9, DURATION);
        assert_eq!(s, DetectionState::Potential);
        assert_eq!(timer.potential_since, Some(0.2));
    }

    #[test]
    fn test_invalid_frame_confirms_elapsed_episode() {
        // 遮蔽中でも継続時間に達していれば確定する
        let mut timer = PersistenceTimer { potential_since: Some(0.5) };
        let s = transition(DetectionState::Potential, &mut timer, &quiet(), false, 1.5, DURATION);
        assert_eq!(s, DetectionState::Confirmed);
        assert_eq!(timer.potential_since, Some(0.5));
    }

    #[test]
    fn test_invalid_frame_before_duration_holds() {
        let mut timer = PersistenceTimer { potential_since: Some(0.0) };
        let s = transition(DetectionState::Potential, &mut timer, &triggered(), false, 0.99, DURATION);
        assert_eq!(s, DetectionState::Potential);
    }

    #[test]
    fn test_invalid_frame_in_normal_is_noop() {
        let mut timer = PersistenceTimer::default();
        let s = transition(DetectionState::Normal, &mut timer, &quiet(), false, 0.3, DURATION);
        assert_eq!(s, DetectionState::Normal);
        assert_eq!(timer, PersistenceTimer::default());
    }

    #[test]
    fn test_confirmed_is_sticky() {
        let mut timer = PersistenceTimer { potential_since: Some(0.0) };
        for (i, valid) in [true, false, true].iter().enumerate() {
            let s = transition(DetectionState::Confirmed, &mut timer, &quiet(), *valid, 2.0 + i as f64, DURATION);
            assert_eq!(s, DetectionState::Confirmed);
        }
        let s = transition(DetectionState::Confirmed, &mut timer, &triggered(), true, 10.0, DURATION);
        assert_eq!(s, DetectionState::Confirmed);
    }

    #[test]
    fn test_elapsed() {
        let timer = PersistenceTimer { potential_since: Some(1.0) };
        assert_eq!(timer.elapsed(1.75), Some(0.75));
        assert_eq!(PersistenceTimer::default().elapsed(3.0), None);
    }
}
