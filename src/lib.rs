//! Blind-spot threat tracking for a two-wheeler side camera.
//!
//! Detector output goes in frame by frame; tracks, per-track threat
//! assessments and rate-limited alerts come out. Capture, inference,
//! rendering and audio are collaborators outside this crate.

pub mod alerts;
pub mod arbiter;
pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod replay;
pub mod threat;
pub mod tracker;
pub mod zones;

pub use alerts::{AlertSink, ChannelSink, LogSink};
pub use arbiter::{AlertEvent, AlertSeverity, WarningArbiter};
pub use config::{load_config, load_config_from, GuardConfig};
pub use detection::{BoundingBox, Detection, RawDetection, VehicleClass};
pub use error::{DetectionRejection, GuardError};
pub use pipeline::{BlindSpotPipeline, DetectionSource, FrameReport, RunSummary, SceneStatus, SourceFrame};
pub use replay::ReplaySource;
pub use threat::{ThreatAssessment, ThreatClassifier, ThreatLevel, ThreatReason};
pub use tracker::{Track, TrackId, TrackManager, TrackState};
pub use zones::{CameraSide, Zone, ZoneModel};
