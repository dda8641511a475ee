//! Threat Classifier: per-track danger assessment.
//!
//! Each confirmed track runs through a fixed, ordered list of stages:
//!
//! 1. self-zone filter   → dismiss (the rider's own bike / mirror)
//! 2. vertical ROI       → dismiss (sky, bonnet, road surface)
//! 3. opposite lane      → dismiss (oncoming traffic in the far band)
//! 4. distance estimate  → signal from bbox height ratio
//! 5. motion analysis    → signal from smoothed velocity
//!
//! The first dismissing stage ends evaluation with level None. Otherwise the
//! distance and motion signals are folded by taking the more severe one:
//! strong evidence of closeness or of dangerous relative motion is each
//! sufficient on its own.
//!
//! The opposite-lane test assumes a straight road and will misfire on sharp
//! curves.

use crate::config::ThreatConfig;
use crate::tracker::{Track, TrackId};
use crate::zones::{Zone, ZoneModel};

// ─── Types ───────────────────────────────────────────────────────────────────

/// Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThreatLevel {
    None,
    Safe,
    Warning,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::None => "none",
            ThreatLevel::Safe => "safe",
            ThreatLevel::Warning => "warning",
            ThreatLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreatReason {
    SelfZone,
    OutOfRoi,
    OppositeLane,
    Distance,
    Motion,
    Combined,
}

impl ThreatReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatReason::SelfZone => "self-zone",
            ThreatReason::OutOfRoi => "out-of-roi",
            ThreatReason::OppositeLane => "opposite-lane",
            ThreatReason::Distance => "distance",
            ThreatReason::Motion => "motion",
            ThreatReason::Combined => "combined",
        }
    }
}

/// Distance estimate from apparent height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistanceBand {
    Safe,
    Warning,
    Critical,
}

impl DistanceBand {
    pub fn level(&self) -> ThreatLevel {
        match self {
            DistanceBand::Safe => ThreatLevel::Safe,
            DistanceBand::Warning => ThreatLevel::Warning,
            DistanceBand::Critical => ThreatLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionClass {
    Stationary,
    Approaching,
    Departing,
    Parallel,
}

impl MotionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionClass::Stationary => "stationary",
            MotionClass::Approaching => "approaching",
            MotionClass::Departing => "departing",
            MotionClass::Parallel => "parallel",
        }
    }
}

/// Outcome for one track in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatAssessment {
    pub track_id: TrackId,
    pub level: ThreatLevel,
    pub reason: ThreatReason,
    pub distance_band: DistanceBand,
    pub motion: MotionClass,
    pub zone: Zone,
}

impl ThreatAssessment {
    /// Short human-readable explanation for overlays and logs.
    pub fn detail(&self) -> &'static str {
        match self.reason {
            ThreatReason::SelfZone => "in self-vehicle zone",
            ThreatReason::OutOfRoi => "out of ROI (vertical)",
            ThreatReason::OppositeLane => "opposite lane traffic",
            ThreatReason::Distance => match self.distance_band {
                DistanceBand::Critical => "very close",
                DistanceBand::Warning => "moderately close",
                DistanceBand::Safe => "distant vehicle",
            },
            ThreatReason::Motion => match (self.motion, self.level) {
                (MotionClass::Approaching, ThreatLevel::Critical) => "fast approach in blind spot",
                (MotionClass::Approaching, _) => "approaching blind spot",
                (MotionClass::Parallel, ThreatLevel::Critical) => "parallel in blind spot",
                (MotionClass::Parallel, ThreatLevel::Warning) => "parallel nearby",
                (MotionClass::Departing, _) => "moving away",
                (MotionClass::Stationary, _) => "stationary",
                _ => "no immediate threat",
            },
            ThreatReason::Combined => match self.level {
                ThreatLevel::Critical => "very close in blind spot",
                ThreatLevel::Warning => "closing at moderate range",
                _ => "no immediate threat",
            },
        }
    }
}

// ─── Stages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SelfZone,
    VerticalRoi,
    OppositeLane,
    Distance,
    Motion,
}

/// Evaluation order. Dismissing stages come first and short-circuit.
pub const STAGE_ORDER: [Stage; 5] = [
    Stage::SelfZone,
    Stage::VerticalRoi,
    Stage::OppositeLane,
    Stage::Distance,
    Stage::Motion,
];

/// Partial result contributed by a signalling stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub level: ThreatLevel,
    pub reason: ThreatReason,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageVerdict {
    /// Stop here with level None.
    Dismiss(ThreatReason),
    Contribute(Signal),
    Pass,
}

/// Per-track measurements shared by all stages.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub in_self_zone: bool,
    pub zone: Zone,
    /// Horizontal band ignoring the ROI.
    pub band: Zone,
    pub far_band: bool,
    /// Velocity component pointing toward the blind-spot edge (px/s).
    pub lateral_toward: Option<f32>,
    pub distance_band: DistanceBand,
    pub motion: MotionClass,
    pub motion_level: ThreatLevel,
}

impl Observation {
    pub fn new(track: &Track, zones: &ZoneModel, cfg: &ThreatConfig) -> Self {
        let (x, y) = track.center();
        let band = zones.band_for_x(x);
        let lateral_toward = track.velocity().map(|(vx, _)| vx * zones.side().toward_blind_spot());

        let height_ratio = track.bbox.height / zones.height();
        let distance_band = if height_ratio > cfg.distance_critical_height_ratio {
            DistanceBand::Critical
        } else if height_ratio > cfg.distance_warning_height_ratio {
            DistanceBand::Warning
        } else {
            DistanceBand::Safe
        };

        let moving = track
            .speed()
            .is_some_and(|s| s >= cfg.stationary_speed_threshold);
        let (motion, motion_level) = match lateral_toward {
            Some(lateral) if moving => {
                if lateral > cfg.lateral_motion_threshold {
                    let level = if band == Zone::Critical {
                        ThreatLevel::Critical
                    } else {
                        ThreatLevel::Warning
                    };
                    (MotionClass::Approaching, level)
                } else if lateral < -cfg.lateral_motion_threshold {
                    (MotionClass::Departing, ThreatLevel::Safe)
                } else {
                    (MotionClass::Parallel, band_level(band))
                }
            }
            _ => (MotionClass::Stationary, ThreatLevel::None),
        };

        Self {
            in_self_zone: zones.is_in_self_zone(x, y),
            zone: zones.zone_for_point(x, y),
            band,
            far_band: zones.is_in_far_band(x, cfg.opposite_lane_position_fraction),
            lateral_toward,
            distance_band,
            motion,
            motion_level,
        }
    }
}

fn band_level(band: Zone) -> ThreatLevel {
    match band {
        Zone::Critical => ThreatLevel::Critical,
        Zone::Warning => ThreatLevel::Warning,
        Zone::Safe => ThreatLevel::Safe,
        Zone::OutsideRoi => ThreatLevel::None,
    }
}

impl Stage {
    pub fn evaluate(&self, obs: &Observation, cfg: &ThreatConfig) -> StageVerdict {
        match self {
            Stage::SelfZone if obs.in_self_zone => StageVerdict::Dismiss(ThreatReason::SelfZone),
            Stage::VerticalRoi if obs.zone == Zone::OutsideRoi => {
                StageVerdict::Dismiss(ThreatReason::OutOfRoi)
            }
            Stage::OppositeLane => {
                let oncoming = obs
                    .lateral_toward
                    .is_some_and(|l| l > cfg.opposite_lane_velocity_threshold);
                if obs.far_band && oncoming {
                    StageVerdict::Dismiss(ThreatReason::OppositeLane)
                } else {
                    StageVerdict::Pass
                }
            }
            Stage::Distance => StageVerdict::Contribute(Signal {
                level: obs.distance_band.level(),
                reason: ThreatReason::Distance,
            }),
            Stage::Motion => StageVerdict::Contribute(Signal {
                level: obs.motion_level,
                reason: ThreatReason::Motion,
            }),
            _ => StageVerdict::Pass,
        }
    }
}

/// Most severe signal wins; a tie at the top is reported as combined.
pub fn combine(signals: &[Signal]) -> Signal {
    let Some(top) = signals.iter().map(|s| s.level).max() else {
        return Signal {
            level: ThreatLevel::None,
            reason: ThreatReason::Combined,
        };
    };
    let mut at_top = signals.iter().filter(|s| s.level == top);
    match (at_top.next(), at_top.next()) {
        (Some(only), None) => *only,
        _ => Signal {
            level: top,
            reason: ThreatReason::Combined,
        },
    }
}

// ─── Classifier ──────────────────────────────────────────────────────────────

pub struct ThreatClassifier {
    cfg: ThreatConfig,
}

impl ThreatClassifier {
    pub fn new(cfg: ThreatConfig) -> Self {
        Self { cfg }
    }

    pub fn classify(&self, track: &Track, zones: &ZoneModel) -> ThreatAssessment {
        let obs = Observation::new(track, zones, &self.cfg);
        let assess = |level, reason| ThreatAssessment {
            track_id: track.id,
            level,
            reason,
            distance_band: obs.distance_band,
            motion: obs.motion,
            zone: obs.zone,
        };

        let mut signals: Vec<Signal> = Vec::with_capacity(2);
        for stage in STAGE_ORDER {
            match stage.evaluate(&obs, &self.cfg) {
                StageVerdict::Dismiss(reason) => return assess(ThreatLevel::None, reason),
                StageVerdict::Contribute(signal) => signals.push(signal),
                StageVerdict::Pass => {}
            }
        }

        let fin = combine(&signals);
        assess(fin.level, fin.reason)
    }

    /// Assess every confirmed track. Tentative tracks are not reported.
    pub fn classify_all(&self, tracks: &[Track], zones: &ZoneModel) -> Vec<ThreatAssessment> {
        tracks
            .iter()
            .filter(|t| t.is_confirmed())
            .map(|t| self.classify(t, zones))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TrackerConfig, ZoneConfig};
    use crate::detection::{BoundingBox, Detection, VehicleClass};
    use crate::tracker::TrackManager;
    use crate::zones::CameraSide;

    const DT: f64 = 1.0 / 30.0;

    fn zones(side: CameraSide) -> ZoneModel {
        ZoneModel::new(640, 480, &ZoneConfig::default(), side).unwrap()
    }

    /// Track whose last center is (cx, cy) after moving `step` px per frame.
    fn track(cx: f32, cy: f32, height: f32, step: (f32, f32)) -> Track {
        let mut tm = TrackManager::new(&TrackerConfig::default());
        for i in (0..3).rev() {
            let d = Detection {
                bbox: BoundingBox::centered(
                    cx - step.0 * i as f32,
                    cy - step.1 * i as f32,
                    height * 0.8,
                    height,
                ),
                confidence: 0.9,
                class: VehicleClass::Car,
            };
            tm.update(&[d], DT).unwrap();
        }
        tm.tracks()[0].clone()
    }

    fn classifier() -> ThreatClassifier {
        ThreatClassifier::new(ThreatConfig::default())
    }

    #[test]
    fn test_stage_order_is_fixed() {
        assert_eq!(
            STAGE_ORDER,
            [
                Stage::SelfZone,
                Stage::VerticalRoi,
                Stage::OppositeLane,
                Stage::Distance,
                Stage::Motion
            ]
        );
    }

    #[test]
    fn test_combine_rule() {
        let d = |l| Signal { level: l, reason: ThreatReason::Distance };
        let m = |l| Signal { level: l, reason: ThreatReason::Motion };
        assert_eq!(
            combine(&[d(ThreatLevel::Safe), m(ThreatLevel::None)]),
            d(ThreatLevel::Safe)
        );
        assert_eq!(
            combine(&[d(ThreatLevel::Safe), m(ThreatLevel::Warning)]),
            m(ThreatLevel::Warning)
        );
        assert_eq!(
            combine(&[d(ThreatLevel::Critical), m(ThreatLevel::Critical)]).reason,
            ThreatReason::Combined
        );
    }

    #[test]
    fn test_self_zone_dismisses_before_distance() {
        let t = track(600.0, 450.0, 300.0, (-10.0, 0.0));
        let a = classifier().classify(&t, &zones(CameraSide::Left));
        assert_eq!(a.level, ThreatLevel::None);
        assert_eq!(a.reason, ThreatReason::SelfZone);
        assert_eq!(a.distance_band, DistanceBand::Critical);
    }

    #[test]
    fn test_out_of_roi() {
        let t = track(100.0, 30.0, 40.0, (0.0, 0.0));
        let a = classifier().classify(&t, &zones(CameraSide::Left));
        assert_eq!(a.level, ThreatLevel::None);
        assert_eq!(a.reason, ThreatReason::OutOfRoi);
        assert_eq!(a.zone, Zone::OutsideRoi);
    }

    #[test]
    fn test_opposite_lane_left() {
        // Far band on a left camera, moving leftward at 6 px/frame (180 px/s)
        let t = track(500.0, 200.0, 80.0, (-6.0, 0.0));
        let a = classifier().classify(&t, &zones(CameraSide::Left));
        assert_eq!(a.reason, ThreatReason::OppositeLane);
        assert_eq!(a.level, ThreatLevel::None);
    }

    #[test]
    fn test_opposite_lane_needs_far_band() {
        let t = track(300.0, 200.0, 80.0, (-6.0, 0.0));
        let a = classifier().classify(&t, &zones(CameraSide::Left));
        assert_ne!(a.reason, ThreatReason::OppositeLane);
        assert_eq!(a.motion, MotionClass::Approaching);
        assert_eq!(a.level, ThreatLevel::Warning);
    }

    #[test]
    fn test_opposite_lane_right_mirrored() {
        let t = track(100.0, 200.0, 80.0, (6.0, 0.0));
        let a = classifier().classify(&t, &zones(CameraSide::Right));
        assert_eq!(a.reason, ThreatReason::OppositeLane);
    }

    #[test]
    fn test_stationary_motion_contributes_nothing() {
        // Critical band but stationary: the motion stage adds no severity
        let t = track(100.0, 240.0, 60.0, (0.0, 0.0));
        let a = classifier().classify(&t, &zones(CameraSide::Left));
        assert_eq!(a.motion, MotionClass::Stationary);
        assert_eq!(a.level, ThreatLevel::Safe);
        assert_eq!(a.reason, ThreatReason::Distance);
    }

    #[test]
    fn test_distance_still_raises_when_stationary() {
        let t = track(300.0, 240.0, 230.0, (0.0, 0.0));
        let a = classifier().classify(&t, &zones(CameraSide::Left));
        assert_eq!(a.level, ThreatLevel::Critical);
        assert_eq!(a.reason, ThreatReason::Distance);
        assert_eq!(a.detail(), "very close");
    }

    #[test]
    fn test_parallel_motion_takes_band_level() {
        // Moving vertically only: parallel, critical band
        let t = track(100.0, 240.0, 60.0, (0.0, 4.0));
        let a = classifier().classify(&t, &zones(CameraSide::Left));
        assert_eq!(a.motion, MotionClass::Parallel);
        assert_eq!(a.level, ThreatLevel::Critical);
        assert_eq!(a.reason, ThreatReason::Motion);
        assert_eq!(a.detail(), "parallel in blind spot");
    }

    #[test]
    fn test_departing_is_safe() {
        let t = track(300.0, 240.0, 60.0, (8.0, 0.0));
        let a = classifier().classify(&t, &zones(CameraSide::Left));
        assert_eq!(a.motion, MotionClass::Departing);
        assert_eq!(a.level, ThreatLevel::Safe);
        assert_eq!(a.reason, ThreatReason::Combined);
    }

    #[test]
    fn test_right_camera_approach_is_positive_vx() {
        let t = track(600.0, 240.0, 60.0, (8.0, 0.0));
        let a = classifier().classify(&t, &zones(CameraSide::Right));
        assert_eq!(a.motion, MotionClass::Approaching);
        assert_eq!(a.level, ThreatLevel::Critical);
        assert_eq!(a.detail(), "fast approach in blind spot");
    }

    #[test]
    fn test_single_sample_track_is_stationary() {
        let mut tm = TrackManager::new(&TrackerConfig::default());
        let d = Detection {
            bbox: BoundingBox::centered(100.0, 240.0, 50.0, 60.0),
            confidence: 0.9,
            class: VehicleClass::Car,
        };
        tm.update(&[d], DT).unwrap();
        let a = classifier().classify(&tm.tracks()[0], &zones(CameraSide::Left));
        assert_eq!(a.motion, MotionClass::Stationary);
        assert_eq!(a.level, ThreatLevel::Safe);
    }

    #[test]
    fn test_tentative_tracks_not_reported() {
        let cfg = TrackerConfig {
            confirm_match_count: 2,
            ..TrackerConfig::default()
        };
        let mut tm = TrackManager::new(&cfg);
        let d = Detection {
            bbox: BoundingBox::centered(100.0, 240.0, 50.0, 60.0),
            confidence: 0.9,
            class: VehicleClass::Car,
        };
        tm.update(&[d], DT).unwrap();
        let z = zones(CameraSide::Left);
        assert!(classifier().classify_all(tm.tracks(), &z).is_empty());
        tm.update(&[d], DT).unwrap();
        assert_eq!(classifier().classify_all(tm.tracks(), &z).len(), 1);
    }
}
