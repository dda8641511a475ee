//! Replay of recorded detector output.
//!
//! One JSON object per line:
//!
//! ```text
//! {"timestamp": 0.033, "width": 640, "height": 480,
//!  "detections": [{"x": 80, "y": 185, "width": 40, "height": 230, "confidence": 0.9, "label": "car"}]}
//! ```
//!
//! `width`/`height` are optional after the first frame. A line with an
//! `error` field records a detector failure for that frame. Blank lines and
//! lines starting with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::detection::RawDetection;
use crate::pipeline::{DetectionSource, SourceFrame};

#[derive(Debug, Deserialize)]
struct ReplayLine {
    timestamp: f64,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    detections: Vec<RawDetection>,
    #[serde(default)]
    error: Option<String>,
}

pub struct ReplaySource<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening replay log {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn parse(&self, line: &str) -> Result<SourceFrame> {
        let parsed: ReplayLine = serde_json::from_str(line)
            .with_context(|| format!("line {}: malformed frame record", self.line_no))?;
        let frame_size = match (parsed.width, parsed.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };
        let detections = match parsed.error {
            Some(msg) => Err(anyhow!("detector error: {}", msg)),
            None => Ok(parsed.detections),
        };
        Ok(SourceFrame {
            timestamp: parsed.timestamp,
            frame_size,
            detections,
        })
    }
}

impl<R: BufRead> DetectionSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Option<Result<SourceFrame>> {
        loop {
            let line = match self.lines.next()? {
                Ok(l) => l,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(self.parse(trimmed));
        }
    }
}

/// Read the first frame size recorded in a replay log.
pub fn probe_frame_size(path: impl AsRef<Path>) -> Result<Option<(u32, u32)>> {
    let mut source = ReplaySource::open(path)?;
    while let Some(frame) = source.next_frame() {
        if let Ok(SourceFrame { frame_size: Some(size), .. }) = frame {
            return Ok(Some(size));
        }
    }
    Ok(None)
}
