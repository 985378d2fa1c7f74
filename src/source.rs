//! Landmark sources feeding the detector.
//!
//! Pose estimation itself lives outside this crate; a source only hands over
//! per-frame landmarks (or the lack of a person) and operator events.
//! [`ReplaySource`] reads a JSON-lines recording:
//!
//! ```text
//! {"t": 0.033, "landmarks": [[x, y, z, visibility], ... 33 entries]}
//! {"t": 0.066, "landmarks": null}
//! {"t": 0.100, "event": "reset"}
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::pose::{Landmark, LandmarkFrame};

/// One step of input for the detector.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    Frame(LandmarkFrame),
    NoPerson { timestamp: f64 },
    /// Operator acknowledged the alarm.
    Reset { timestamp: f64 },
}

impl SourceEvent {
    pub fn timestamp(&self) -> f64 {
        match self {
            SourceEvent::Frame(frame) => frame.timestamp,
            SourceEvent::NoPerson { timestamp } | SourceEvent::Reset { timestamp } => *timestamp,
        }
    }
}

pub trait LandmarkSource {
    /// Next event, or `None` at end of stream.
    fn next_event(&mut self) -> Result<Option<SourceEvent>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordedEvent {
    Reset,
}

/// A single line of a recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub t: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<Vec<[f32; 4]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<RecordedEvent>,
}

impl Record {
    pub fn from_frame(frame: &LandmarkFrame) -> Self {
        Self {
            t: frame.timestamp,
            landmarks: Some(
                frame
                    .landmarks
                    .iter()
                    .map(|l| [l.x, l.y, l.z, l.visibility])
                    .collect(),
            ),
            event: None,
        }
    }

    pub fn no_person(t: f64) -> Self {
        Self { t, landmarks: None, event: None }
    }

    pub fn reset(t: f64) -> Self {
        Self { t, landmarks: None, event: Some(RecordedEvent::Reset) }
    }

    pub fn into_event(self) -> Result<SourceEvent> {
        if let Some(RecordedEvent::Reset) = self.event {
            return Ok(SourceEvent::Reset { timestamp: self.t });
        }
        match self.landmarks {
            Some(raw) => {
                let landmarks: Vec<Landmark> = raw
                    .iter()
                    .map(|[x, y, z, v]| Landmark::new(*x, *y, *z, *v))
                    .collect();
                Ok(SourceEvent::Frame(LandmarkFrame::from_slice(&landmarks, self.t)?))
            }
            None => Ok(SourceEvent::NoPerson { timestamp: self.t }),
        }
    }
}

/// Replays a recorded landmark stream.
pub struct ReplaySource<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl ReplaySource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> LandmarkSource for ReplaySource<R> {
    fn next_event(&mut self) -> Result<Option<SourceEvent>> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_line(&mut self.buf)
                .with_context(|| format!("Failed to read line {}", self.line_no + 1))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let record: Record = serde_json::from_str(line)
                .with_context(|| format!("Malformed record at line {}", self.line_no))?;
            if !record.t.is_finite() {
                bail!("Non-finite timestamp at line {}", self.line_no);
            }
            let event = record
                .into_event()
                .with_context(|| format!("Invalid record at line {}", self.line_no))?;
            return Ok(Some(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::LandmarkIndex;
    use std::io::Cursor;

    fn frame_line(t: f64, visibility: f32) -> String {
        let lms: Vec<String> = (0..LandmarkIndex::COUNT)
            .map(|i| format!("[0.5, {:.2}, 0.0, {}]", i as f32 / 40.0, visibility))
            .collect();
        format!("{{\"t\": {}, \"landmarks\": [{}]}}", t, lms.join(", "))
    }

    fn collect(input: &str) -> Result<Vec<SourceEvent>> {
        let mut src = ReplaySource::new(Cursor::new(input.to_string()));
        let mut events = Vec::new();
        while let Some(ev) = src.next_event()? {
            events.push(ev);
        }
        Ok(events)
    }

    #[test]
    fn test_reads_all_event_kinds() {
        let input = format!(
            "# header comment\n{}\n\n{{\"t\": 0.1, \"landmarks\": null}}\n{{\"t\": 0.2}}\n{{\"t\": 0.3, \"event\": \"reset\"}}\n",
            frame_line(0.0, 0.9)
        );
        let events = collect(&input).unwrap();
        assert_eq!(events.len(), 4);

        match &events[0] {
            SourceEvent::Frame(frame) => {
                assert_eq!(frame.timestamp, 0.0);
                let hip = frame.get(LandmarkIndex::LeftHip);
                assert!((hip.y - 23.0 / 40.0).abs() < 0.01);
                assert!((hip.visibility - 0.9).abs() < 1e-6);
            }
            other => panic!("expected frame, got {:?}", other),
        }
        assert!(matches!(events[1], SourceEvent::NoPerson { timestamp } if timestamp == 0.1));
        assert!(matches!(events[2], SourceEvent::NoPerson { timestamp } if timestamp == 0.2));
        assert!(matches!(events[3], SourceEvent::Reset { timestamp } if timestamp == 0.3));
        assert_eq!(events[3].timestamp(), 0.3);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let input = format!("{}\nnot json\n", frame_line(0.0, 0.9));
        let err = collect(&input).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"), "{:#}", err);
    }

    #[test]
    fn test_wrong_landmark_count_is_error() {
        let input = "{\"t\": 0.0, \"landmarks\": [[0.5, 0.5, 0.0, 1.0]]}\n";
        let err = collect(input).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("line 1"), "{}", msg);
        assert!(msg.contains("expected 33 landmarks, got 1"), "{}", msg);
    }

    #[test]
    fn test_record_roundtrip_through_source() {
        let frame = LandmarkFrame::new([Landmark::new(0.1, 0.2, 0.3, 0.4); LandmarkIndex::COUNT], 1.25);
        let lines = [Record::from_frame(&frame), Record::no_person(1.5), Record::reset(1.75)]
            .iter()
            .map(|r| serde_json::to_string(r).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        let events = collect(&lines).unwrap();
        match &events[0] {
            SourceEvent::Frame(f) => assert_eq!(f.landmarks, frame.landmarks),
            other => panic!("expected frame, got {:?}", other),
        }
        assert!(matches!(events[1], SourceEvent::NoPerson { .. }));
        assert!(matches!(events[2], SourceEvent::Reset { .. }));
    }

    #[test]
    fn test_no_person_record_omits_fields() {
        let json = serde_json::to_string(&Record::no_person(2.0)).unwrap();
        assert_eq!(json, "{\"t\":2.0}");
    }
}
