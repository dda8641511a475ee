/// Blind-spot Pipeline, one side camera, one frame at a time.
///
/// Architecture:
///   detector collaborator (blocking, outside this crate)
///     → sanitize detections
///     → TrackManager::update
///     → ThreatClassifier (confirmed tracks only)
///     → WarningArbiter
///     → AlertSink
///
/// Frames are strictly sequential; everything for frame N is computed from
/// the tracks as of frame N before frame N+1 is looked at.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::alerts::AlertSink;
use crate::arbiter::{AlertEvent, WarningArbiter};
use crate::config::GuardConfig;
use crate::detection::{sanitize, RawDetection};
use crate::error::GuardError;
use crate::threat::{ThreatAssessment, ThreatClassifier, ThreatLevel};
use crate::tracker::{Track, TrackManager};
use crate::zones::ZoneModel;

// ─── Frame report ───────────────────────────────────────────────────────────

/// Headline state of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneStatus {
    Clear,
    Warning(usize),
    Critical(usize),
}

impl std::fmt::Display for SceneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneStatus::Clear => write!(f, "CLEAR"),
            SceneStatus::Warning(n) => write!(f, "WARNING - {} VEHICLES", n),
            SceneStatus::Critical(n) => write!(f, "CRITICAL - {} THREATS", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    /// Pipeline clock after this frame, seconds.
    pub timestamp: f64,
    /// Live tracks after the update, any state.
    pub tracked: usize,
    pub assessments: Vec<ThreatAssessment>,
    pub alerts: Vec<AlertEvent>,
}

impl FrameReport {
    pub fn count_at(&self, level: ThreatLevel) -> usize {
        self.assessments.iter().filter(|a| a.level == level).count()
    }

    pub fn status(&self) -> SceneStatus {
        let critical = self.count_at(ThreatLevel::Critical);
        if critical > 0 {
            return SceneStatus::Critical(critical);
        }
        let warning = self.count_at(ThreatLevel::Warning);
        if warning > 0 {
            return SceneStatus::Warning(warning);
        }
        SceneStatus::Clear
    }
}

// ─── Pipeline ───────────────────────────────────────────────────────────────

pub struct BlindSpotPipeline {
    cfg: GuardConfig,
    zones: ZoneModel,
    tracker: TrackManager,
    classifier: ThreatClassifier,
    arbiter: WarningArbiter,
    frame_index: u64,
}

impl BlindSpotPipeline {
    /// Validates the configuration and resolves the zone geometry.
    pub fn new(cfg: GuardConfig, frame_width: u32, frame_height: u32) -> Result<Self, GuardError> {
        cfg.validate()?;
        let zones = ZoneModel::new(frame_width, frame_height, &cfg.zones, cfg.camera.side)?;
        info!(
            "Pipeline ready: {} camera, {}x{}",
            cfg.camera.side.as_str(),
            frame_width,
            frame_height
        );
        Ok(Self {
            zones,
            tracker: TrackManager::new(&cfg.tracker),
            classifier: ThreatClassifier::new(cfg.threat.clone()),
            arbiter: WarningArbiter::new(&cfg.arbiter),
            frame_index: 0,
            cfg,
        })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.cfg
    }

    pub fn zones(&self) -> &ZoneModel {
        &self.zones
    }

    pub fn tracks(&self) -> &[Track] {
        self.tracker.tracks()
    }

    pub fn clock(&self) -> f64 {
        self.tracker.clock()
    }

    /// Re-derive zone geometry for a new frame size. Tracks are kept.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GuardError> {
        self.zones = ZoneModel::new(width, height, &self.cfg.zones, self.cfg.camera.side)?;
        info!("Zones re-derived for {}x{}", width, height);
        Ok(())
    }

    /// Run one update → classify → arbitrate cycle.
    ///
    /// A detector failure is treated as an empty frame so existing tracks
    /// coast. A non-positive `dt` is rejected with nothing modified.
    pub fn process_frame(
        &mut self,
        dt: f64,
        detections: Result<Vec<RawDetection>>,
    ) -> Result<FrameReport, GuardError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(GuardError::NonPositiveDt(dt));
        }

        let raw = detections.unwrap_or_else(|e| {
            warn!("Detector failed on frame {}: {:#}, coasting", self.frame_index, e);
            Vec::new()
        });
        let detections = sanitize(raw);

        let tracks = self.tracker.update(&detections, dt)?;
        let tracked = tracks.len();
        let assessments = self.classifier.classify_all(tracks, &self.zones);
        let now = self.tracker.clock();
        let alerts = self.arbiter.arbitrate(&assessments, now);

        debug!(
            "frame {} t={:.3}s detections={} tracked={} assessed={} alerts={}",
            self.frame_index,
            now,
            detections.len(),
            tracked,
            assessments.len(),
            alerts.len()
        );
        for a in &assessments {
            debug!(
                track = a.track_id,
                level = a.level.as_str(),
                reason = a.reason.as_str(),
                "track {}: {}",
                a.track_id,
                a.detail()
            );
        }

        let report = FrameReport {
            frame_index: self.frame_index,
            timestamp: now,
            tracked,
            assessments,
            alerts,
        };
        self.frame_index += 1;
        Ok(report)
    }

    /// Drive frames from `source` into `sink` until the source runs dry.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<RunSummary>
    where
        S: DetectionSource,
        K: AlertSink,
    {
        let mut summary = RunSummary::default();
        let mut last_timestamp: Option<f64> = None;

        while let Some(frame) = source.next_frame() {
            let frame = match frame {
                Ok(f) => f,
                Err(e) => {
                    warn!("Source error: {:#}, skipping", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            if let Some((w, h)) = frame.frame_size {
                if (w as f32, h as f32) != (self.zones.width(), self.zones.height()) {
                    self.resize(w, h)?;
                }
            }

            let dt = match last_timestamp {
                Some(prev) => frame.timestamp - prev,
                None => frame.timestamp.max(f64::EPSILON),
            };
            if dt <= 0.0 || !dt.is_finite() {
                warn!(
                    "Frame timestamp {:.3}s does not advance past {:.3}s, skipping",
                    frame.timestamp,
                    last_timestamp.unwrap_or_default()
                );
                summary.skipped += 1;
                continue;
            }
            let report = match self.process_frame(dt, frame.detections) {
                Ok(r) => r,
                Err(e @ GuardError::StalledClock { .. }) => {
                    warn!("Frame at {:.3}s skipped: {}", frame.timestamp, e);
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            last_timestamp = Some(frame.timestamp);
            for alert in &report.alerts {
                if let Err(e) = sink.deliver(alert) {
                    warn!("Alert sink error: {:#}", e);
                }
            }

            summary.frames += 1;
            summary.alerts += report.alerts.len();
            summary.peak_tracked = summary.peak_tracked.max(report.tracked);
            match report.status() {
                SceneStatus::Critical(_) => summary.critical_frames += 1,
                SceneStatus::Warning(_) => summary.warning_frames += 1,
                SceneStatus::Clear => {}
            }
        }

        info!(
            "Run finished: {} frames, {} skipped, {} alerts",
            summary.frames, summary.skipped, summary.alerts
        );
        Ok(summary)
    }
}

// ─── Sources ────────────────────────────────────────────────────────────────

/// One frame's worth of detector output.
#[derive(Debug)]
pub struct SourceFrame {
    /// Seconds since the start of the stream.
    pub timestamp: f64,
    /// Set when the frame size is known; a change re-derives the zones.
    pub frame_size: Option<(u32, u32)>,
    /// Detector result; an error is coasted as an empty frame.
    pub detections: Result<Vec<RawDetection>>,
}

/// Anything that yields detector output frame by frame.
pub trait DetectionSource {
    /// `None` when the stream ends. `Some(Err)` skips one frame.
    fn next_frame(&mut self) -> Option<Result<SourceFrame>>;
}

impl<I> DetectionSource for I
where
    I: Iterator<Item = SourceFrame>,
{
    fn next_frame(&mut self) -> Option<Result<SourceFrame>> {
        self.next().map(Ok)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub skipped: usize,
    pub alerts: usize,
    pub critical_frames: usize,
    pub warning_frames: usize,
    pub peak_tracked: usize,
}
