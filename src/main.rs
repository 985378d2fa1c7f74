use anyhow::{bail, Context, Result};
use std::time::{Duration, Instant};

use fall_detector::config::Config;
use fall_detector::detector::{DetectionResult, DetectionState, FallDetector};
use fall_detector::logging;
use fall_detector::source::{LandmarkSource, ReplaySource, SourceEvent};

const CONFIG_PATH: &str = "config.toml";

struct Args {
    recording: String,
    config_path: String,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    match args.len() {
        2 => Ok(Args {
            recording: args[1].clone(),
            config_path: CONFIG_PATH.to_string(),
        }),
        3 => Ok(Args {
            recording: args[1].clone(),
            config_path: args[2].clone(),
        }),
        _ => bail!("usage: {} <recording.jsonl> [config.toml]", args[0]),
    }
}

#[derive(Default)]
struct Summary {
    frames: u32,
    no_person: u32,
    invalid: u32,
    resets: u32,
    potential_episodes: u32,
    confirmed: Vec<f64>,
}

impl Summary {
    fn record(&mut self, result: &DetectionResult) {
        self.frames += 1;
        if !result.sample.person_detected {
            self.no_person += 1;
        } else if !result.sample.valid {
            self.invalid += 1;
        }
        if result.changed() {
            match result.state {
                DetectionState::Potential => self.potential_episodes += 1,
                DetectionState::Confirmed => self.confirmed.push(result.timestamp),
                DetectionState::Normal => {}
            }
        }
    }
}

fn print_frame(result: &DetectionResult) {
    println!("[{:8.3}] {}", result.timestamp, result.status_text());
    for line in result.debug_lines() {
        println!("           {}", line);
    }
}

/// How long to sleep so a frame `offset` seconds into the recording plays at
/// wall time. `None` when already late or the offset does not fit in a
/// `Duration`.
fn realtime_wait(offset: f64, elapsed: Duration) -> Option<Duration> {
    let target = Duration::try_from_secs_f64(offset.max(0.0)).ok()?;
    target.checked_sub(elapsed)
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let config = Config::load_or_default(&args.config_path);
    logging::init(&config.log)?;

    let d = &config.detection;
    log::info!("Fall detector replay: {}", args.recording);
    log::info!(
        "Thresholds: velocity={} angle={}deg height={} confirm={}s visibility={}",
        d.velocity_threshold,
        d.angle_threshold_deg,
        d.height_threshold_factor,
        d.fall_confirm_duration_secs,
        d.min_visibility
    );

    let mut detector = FallDetector::new(d).context("Invalid detection config")?;
    let mut source = ReplaySource::open(&args.recording)?;
    let mut summary = Summary::default();

    let wall_start = Instant::now();
    let mut first_timestamp: Option<f64> = None;

    while let Some(event) = source.next_event()? {
        if config.replay.realtime {
            let t0 = *first_timestamp.get_or_insert(event.timestamp());
            if let Some(wait) = realtime_wait(event.timestamp() - t0, wall_start.elapsed()) {
                std::thread::sleep(wait);
            }
        }

        let result = match event {
            SourceEvent::Frame(frame) => detector.process(&frame),
            SourceEvent::NoPerson { timestamp } => detector.process_absent(timestamp),
            SourceEvent::Reset { timestamp } => {
                log::info!("t={:.3} operator reset", timestamp);
                detector.reset();
                summary.resets += 1;
                continue;
            }
        };

        summary.record(&result);
        if config.replay.verbose || result.changed() {
            print_frame(&result);
        }
    }

    println!();
    println!("=== Summary ===");
    println!("Frames:             {}", summary.frames);
    println!("  no person:        {}", summary.no_person);
    println!("  invalid (hips):   {}", summary.invalid);
    println!("Potential episodes: {}", summary.potential_episodes);
    println!("Manual resets:      {}", summary.resets);
    if summary.confirmed.is_empty() {
        println!("Falls confirmed:    0");
    } else {
        let times: Vec<String> = summary.confirmed.iter().map(|t| format!("{:.3}", t)).collect();
        println!("Falls confirmed:    {} (t = {})", summary.confirmed.len(), times.join(", "));
    }
    println!("Final state:        {}", detector.state().label());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_wait_sleeps_until_offset() {
        let wait = realtime_wait(1.5, Duration::from_millis(500)).unwrap();
        assert_eq!(wait, Duration::from_secs(1));
    }

    #[test]
    fn test_realtime_wait_when_late() {
        assert_eq!(realtime_wait(0.2, Duration::from_secs(1)), None);
        // 時刻が巻き戻ったフレームは待たない
        assert_eq!(realtime_wait(-3.0, Duration::ZERO), Some(Duration::ZERO));
    }

    #[test]
    fn test_realtime_wait_unrepresentable_offset() {
        assert_eq!(realtime_wait(1e30, Duration::ZERO), None);
        assert_eq!(realtime_wait(f64::INFINITY, Duration::ZERO), None);
        assert_eq!(realtime_wait(f64::NAN, Duration::ZERO), Some(Duration::ZERO));
    }
}
