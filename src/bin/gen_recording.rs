//! Writes a synthetic landmark recording for `fall-detector`.
//!
//! usage: gen_recording <out.jsonl> [--gap] [--reset] [--recover]
//!
//! Default scenario: stand 2s, fall over 0.5s, lie still 3s.
//! `--gap` drops the hips for a few frames while lying, `--reset` appends an
//! operator reset followed by standing again, `--recover` makes the person
//! catch themselves half-way instead of falling.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

use fall_detector::pose::{Landmark, LandmarkFrame, LandmarkIndex};
use fall_detector::source::Record;

const FPS: f64 = 30.0;
const TORSO_LENGTH: f32 = 0.25;
const THIGH_LENGTH: f32 = 0.2;
const STAND_HIP_Y: f32 = 0.55;
const LYING_HIP_Y: f32 = 0.88;

struct Options {
    output: String,
    gap: bool,
    reset: bool,
    recover: bool,
}

fn parse_args() -> Result<Options> {
    let mut args = std::env::args().skip(1);
    let output = match args.next() {
        Some(path) => path,
        None => bail!("usage: gen_recording <out.jsonl> [--gap] [--reset] [--recover]"),
    };
    let mut opts = Options { output, gap: false, reset: false, recover: false };
    for arg in args {
        match arg.as_str() {
            "--gap" => opts.gap = true,
            "--reset" => opts.reset = true,
            "--recover" => opts.recover = true,
            other => bail!("unknown option: {}", other),
        }
    }
    Ok(opts)
}

/// 腰位置と胴体角度（度, 0=直立）から33点の姿勢を作る
fn body(t: f64, hip_x: f32, hip_y: f32, torso_deg: f32, hips_visible: bool) -> LandmarkFrame {
    let theta = torso_deg.to_radians();
    // 呼吸程度の微小な揺れ
    let sway = (t as f32 * 3.0).sin() * 0.003;
    let (sin, cos) = theta.sin_cos();
    let shoulder_x = hip_x - TORSO_LENGTH * sin + sway;
    let shoulder_y = hip_y - TORSO_LENGTH * cos;
    let knee_x = hip_x + THIGH_LENGTH * sin;
    let knee_y = hip_y + THIGH_LENGTH * cos;

    let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
    for idx in LandmarkIndex::ALL {
        let i = idx as usize;
        let side = if i % 2 == 1 { -0.04 } else { 0.04 };
        let (x, y) = match i {
            0..=10 => (shoulder_x - 0.1 * sin, shoulder_y - 0.1 * cos),
            11..=22 => (shoulder_x + side, shoulder_y),
            23..=24 => (hip_x + side, hip_y),
            25..=26 => (knee_x + side, knee_y),
            _ => (knee_x + THIGH_LENGTH * sin + side, knee_y + THIGH_LENGTH * cos),
        };
        let visibility = match idx {
            LandmarkIndex::LeftHip | LandmarkIndex::RightHip if !hips_visible => 0.1,
            _ => 0.95,
        };
        landmarks[i] = Landmark::new(x, y, 0.0, visibility);
    }
    LandmarkFrame::new(landmarks, t)
}

fn lerp(a: f32, b: f32, k: f32) -> f32 {
    a + (b - a) * k.clamp(0.0, 1.0)
}

fn main() -> Result<()> {
    let opts = parse_args()?;
    let file = File::create(&opts.output)
        .with_context(|| format!("Failed to create {}", opts.output))?;
    let mut out = BufWriter::new(file);

    let mut records = Vec::new();
    let total = if opts.reset { 8.0 } else { 5.5 };
    let frames = (total * FPS) as usize;

    for n in 0..frames {
        let t = n as f64 / FPS;
        let record = if t < 2.0 {
            Record::from_frame(&body(t, 0.5, STAND_HIP_Y, 0.0, true))
        } else if t < 2.5 {
            let k = ((t - 2.0) / 0.5) as f32;
            let k = if opts.recover { k.min(0.4) } else { k * k };
            let hip_y = lerp(STAND_HIP_Y, LYING_HIP_Y, k);
            Record::from_frame(&body(t, 0.5, hip_y, 90.0 * k, true))
        } else if opts.recover {
            Record::from_frame(&body(t, 0.5, STAND_HIP_Y, 0.0, true))
        } else if t < 5.5 {
            let hidden = opts.gap && (3.0..3.2).contains(&t);
            Record::from_frame(&body(t, 0.5, LYING_HIP_Y, 88.0, !hidden))
        } else {
            Record::from_frame(&body(t, 0.5, STAND_HIP_Y, 0.0, true))
        };
        if opts.reset && n == (5.5 * FPS) as usize {
            records.push(Record::reset(t));
        }
        records.push(record);
    }

    writeln!(out, "# synthetic recording, {} fps", FPS)?;
    for record in &records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    out.flush()?;

    println!("Wrote {} records to {}", records.len(), opts.output);
    Ok(())
}
