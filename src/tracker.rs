//! Track Manager: nearest-center tracker with time-based aging.
//!
//! Matches detection centers to track centers across frames with a greedy
//! global-minimum assignment. Each track keeps a bounded history of
//! (center, timestamp) samples for velocity smoothing plus a bounded class
//! vote. Tracks that go unmatched for longer than the configured age are
//! marked Lost and dropped; there is no re-identification afterwards.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::TrackerConfig;
use crate::detection::{BoundingBox, Detection, VehicleClass};
use crate::error::GuardError;

// ─── Types ───────────────────────────────────────────────────────────────────

pub type TrackId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Tentative,
    Confirmed,
    Lost,
}

impl TrackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackState::Tentative => "tentative",
            TrackState::Confirmed => "confirmed",
            TrackState::Lost => "lost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub x: f32,
    pub y: f32,
    pub timestamp: f64,
}

/// One physical vehicle followed across frames.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub state: TrackState,
    pub bbox: BoundingBox,
    pub confidence: f32,
    history: VecDeque<PositionSample>,
    class_votes: VecDeque<VehicleClass>,
    velocity: Option<(f32, f32)>,
    pub consecutive_matches: u32,
    pub frames_since_match: u32,
    pub seconds_since_match: f64,
    window: usize,
}

impl Track {
    fn new(id: TrackId, det: &Detection, timestamp: f64, window: usize, confirm_after: u32) -> Self {
        let (x, y) = det.center();
        let mut history = VecDeque::with_capacity(window);
        history.push_back(PositionSample { x, y, timestamp });
        let mut class_votes = VecDeque::with_capacity(window);
        class_votes.push_back(det.class);

        let state = if confirm_after <= 1 {
            TrackState::Confirmed
        } else {
            TrackState::Tentative
        };

        Self {
            id,
            state,
            bbox: det.bbox,
            confidence: det.confidence,
            history,
            class_votes,
            velocity: None,
            consecutive_matches: 1,
            frames_since_match: 0,
            seconds_since_match: 0.0,
            window,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        self.bbox.center()
    }

    /// Smoothed velocity in px/s. `None` until two samples exist.
    pub fn velocity(&self) -> Option<(f32, f32)> {
        self.velocity
    }

    pub fn speed(&self) -> Option<f32> {
        self.velocity.map(|(vx, vy)| (vx * vx + vy * vy).sqrt())
    }

    pub fn history(&self) -> impl Iterator<Item = &PositionSample> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Mode of the recent class votes; ties go to the most recent vote.
    pub fn class(&self) -> VehicleClass {
        // (count, index of last vote, class)
        let mut best: Option<(usize, usize, VehicleClass)> = None;
        for (idx, class) in self.class_votes.iter().enumerate() {
            let count = self.class_votes.iter().filter(|c| *c == class).count();
            let candidate = (count, idx, *class);
            if best.map_or(true, |b| (candidate.0, candidate.1) > (b.0, b.1)) {
                best = Some(candidate);
            }
        }
        best.map(|b| b.2).unwrap_or(VehicleClass::Car)
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    fn update_with_detection(&mut self, det: &Detection, timestamp: f64, confirm_after: u32) {
        let (x, y) = det.center();
        self.history.push_back(PositionSample { x, y, timestamp });
        while self.history.len() > self.window {
            self.history.pop_front();
        }
        self.class_votes.push_back(det.class);
        while self.class_votes.len() > self.window {
            self.class_votes.pop_front();
        }

        self.bbox = det.bbox;
        self.confidence = det.confidence;
        self.consecutive_matches += 1;
        self.frames_since_match = 0;
        self.seconds_since_match = 0.0;
        self.velocity = smoothed_velocity(&self.history);

        if self.state == TrackState::Tentative && self.consecutive_matches >= confirm_after {
            self.state = TrackState::Confirmed;
            debug!("Track {} confirmed as {}", self.id, self.class().as_str());
        }
    }

    fn mark_missed(&mut self, dt: f64, max_age: f64) {
        self.frames_since_match += 1;
        self.seconds_since_match += dt;
        self.consecutive_matches = 0;
        if self.seconds_since_match > max_age {
            self.state = TrackState::Lost;
        }
    }
}

/// Mean of the per-interval finite differences over the retained samples.
fn smoothed_velocity(history: &VecDeque<PositionSample>) -> Option<(f32, f32)> {
    if history.len() < 2 {
        return None;
    }
    let mut sum = (0.0f64, 0.0f64);
    let mut n = 0usize;
    for (a, b) in history.iter().zip(history.iter().skip(1)) {
        let span = b.timestamp - a.timestamp;
        if span <= 0.0 {
            continue;
        }
        sum.0 += (b.x - a.x) as f64 / span;
        sum.1 += (b.y - a.y) as f64 / span;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some(((sum.0 / n as f64) as f32, (sum.1 / n as f64) as f32))
}

fn center_distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

pub struct TrackManager {
    tracks: Vec<Track>,
    next_id: TrackId,
    clock: f64,
    matching_distance: f32,
    max_age: f64,
    confirm_after: u32,
    window: usize,
}

impl TrackManager {
    pub fn new(cfg: &TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 0,
            clock: 0.0,
            matching_distance: cfg.matching_distance_px,
            max_age: cfg.track_max_age_seconds,
            confirm_after: cfg.confirm_match_count,
            window: cfg.history_window_size,
        }
    }

    /// Seconds accumulated over all updates so far.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Live (non-Lost) tracks, in creation order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Advance by `dt` seconds with this frame's detections.
    ///
    /// A non-positive or non-finite `dt`, or one too small to move the clock,
    /// is rejected and leaves the track set untouched. Sample timestamps are
    /// therefore strictly increasing.
    pub fn update(&mut self, detections: &[Detection], dt: f64) -> Result<&[Track], GuardError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(GuardError::NonPositiveDt(dt));
        }
        let now = self.clock + dt;
        if now <= self.clock {
            return Err(GuardError::StalledClock { dt, clock: self.clock });
        }
        self.clock = now;

        // ── 1. Candidate pairs under the gate, closest first ─────────────
        let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            let tc = track.center();
            for (di, det) in detections.iter().enumerate() {
                let d = center_distance(tc, det.center());
                if d < self.matching_distance {
                    pairs.push((ti, di, d));
                }
            }
        }
        pairs.sort_by(|a, b| {
            a.2.partial_cmp(&b.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });

        // ── 2. Greedy assignment ─────────────────────────────────────────
        let mut used_det = vec![false; detections.len()];
        let mut matched_track = vec![false; self.tracks.len()];
        for (ti, di, _) in &pairs {
            if matched_track[*ti] || used_det[*di] {
                continue;
            }
            matched_track[*ti] = true;
            used_det[*di] = true;
            self.tracks[*ti].update_with_detection(&detections[*di], now, self.confirm_after);
        }

        // ── 3. Age unmatched tracks and retire stale ones ────────────────
        for (ti, track) in self.tracks.iter_mut().enumerate() {
            if !matched_track[ti] {
                track.mark_missed(dt, self.max_age);
            }
        }
        self.tracks.retain(|t| {
            if t.state == TrackState::Lost {
                debug!(
                    "Track {} lost after {:.2}s unmatched",
                    t.id, t.seconds_since_match
                );
                false
            } else {
                true
            }
        });

        // ── 4. New tracks for unmatched detections ───────────────────────
        for (di, det) in detections.iter().enumerate() {
            if used_det[di] {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            let track = Track::new(id, det, now, self.window, self.confirm_after);
            debug!(
                "Track {} created ({}, {}) at ({:.0}, {:.0})",
                id,
                det.class.as_str(),
                track.state.as_str(),
                track.center().0,
                track.center().1
            );
            self.tracks.push(track);
        }

        Ok(&self.tracks)
    }
}
