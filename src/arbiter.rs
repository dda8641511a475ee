//! Warning Arbiter: turns per-track assessments into rate-limited alerts.
//!
//! One aggregated alert per severity per frame at most, gated by an
//! independent cooldown for each severity. Safe and None never alert.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ArbiterConfig, CooldownConfig};
use crate::threat::{ThreatAssessment, ThreatLevel};
use crate::tracker::TrackId;

/// Severities that can raise an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }

    pub fn from_level(level: ThreatLevel) -> Option<Self> {
        match level {
            ThreatLevel::Critical => Some(AlertSeverity::Critical),
            ThreatLevel::Warning => Some(AlertSeverity::Warning),
            _ => None,
        }
    }

    fn cooldown(&self, cfg: &CooldownConfig) -> f64 {
        match self {
            AlertSeverity::Warning => cfg.warning,
            AlertSeverity::Critical => cfg.critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub severity: AlertSeverity,
    /// Ascending.
    pub track_ids: Vec<TrackId>,
    pub count: usize,
    pub timestamp: f64,
}

pub struct WarningArbiter {
    cooldowns: CooldownConfig,
    last_emitted: BTreeMap<AlertSeverity, f64>,
}

impl WarningArbiter {
    pub fn new(cfg: &ArbiterConfig) -> Self {
        Self {
            cooldowns: cfg.cooldown_seconds,
            last_emitted: BTreeMap::new(),
        }
    }

    pub fn last_emitted(&self, severity: AlertSeverity) -> Option<f64> {
        self.last_emitted.get(&severity).copied()
    }

    /// Emit at most one alert per severity for this frame, Critical first.
    pub fn arbitrate(&mut self, assessments: &[ThreatAssessment], now: f64) -> Vec<AlertEvent> {
        let mut by_severity: BTreeMap<AlertSeverity, Vec<TrackId>> = BTreeMap::new();
        for a in assessments {
            if let Some(sev) = AlertSeverity::from_level(a.level) {
                by_severity.entry(sev).or_default().push(a.track_id);
            }
        }

        let mut alerts = Vec::new();
        for (severity, mut ids) in by_severity.into_iter().rev() {
            let cooldown = severity.cooldown(&self.cooldowns);
            if let Some(last) = self.last_emitted(severity) {
                if now - last < cooldown {
                    debug!(
                        "{} alert suppressed ({:.2}s since last, cooldown {:.2}s)",
                        severity.as_str(),
                        now - last,
                        cooldown
                    );
                    continue;
                }
            }

            ids.sort_unstable();
            ids.dedup();
            info!(
                "{} alert: {} vehicle(s) {:?} at t={:.2}s",
                severity.as_str().to_uppercase(),
                ids.len(),
                ids,
                now
            );
            self.last_emitted.insert(severity, now);
            alerts.push(AlertEvent {
                severity,
                count: ids.len(),
                track_ids: ids,
                timestamp: now,
            });
        }
        alerts
    }
}
