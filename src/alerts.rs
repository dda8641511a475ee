//! Alert sinks: where arbitrated alerts go.
//!
//! Rendering and audio live outside this crate. A sink either logs the alert
//! or hands it to a consumer thread over a channel.

use anyhow::{anyhow, Result};
use tracing::warn;

use crate::arbiter::{AlertEvent, AlertSeverity};

pub trait AlertSink {
    fn deliver(&mut self, alert: &AlertEvent) -> Result<()>;
}

/// Writes alerts as tracing events.
#[derive(Debug, Default)]
pub struct LogSink {
    delivered: usize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }
}

impl AlertSink for LogSink {
    fn deliver(&mut self, alert: &AlertEvent) -> Result<()> {
        self.delivered += 1;
        match alert.severity {
            AlertSeverity::Critical => warn!(
                target: "alert",
                severity = alert.severity.as_str(),
                count = alert.count,
                timestamp = alert.timestamp,
                "CRITICAL - {} threat(s): {:?}",
                alert.count,
                alert.track_ids
            ),
            AlertSeverity::Warning => warn!(
                target: "alert",
                severity = alert.severity.as_str(),
                count = alert.count,
                timestamp = alert.timestamp,
                "WARNING - {} vehicle(s): {:?}",
                alert.count,
                alert.track_ids
            ),
        }
        Ok(())
    }
}

/// Forwards alerts to another thread (renderer, audio player).
/// Never blocks the frame cycle: a full channel drops the alert.
pub struct ChannelSink {
    tx: flume::Sender<AlertEvent>,
}

impl ChannelSink {
    /// Bounded channel; the receiver side goes to the consumer.
    pub fn bounded(capacity: usize) -> (Self, flume::Receiver<AlertEvent>) {
        let (tx, rx) = flume::bounded(capacity);
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelSink {
    fn deliver(&mut self, alert: &AlertEvent) -> Result<()> {
        self.tx.try_send(alert.clone()).map_err(|e| match e {
            flume::TrySendError::Full(_) => anyhow!("alert channel full, dropping {} alert", alert.severity.as_str()),
            flume::TrySendError::Disconnected(_) => anyhow!("alert consumer disconnected"),
        })
    }
}

impl AlertSink for Vec<AlertEvent> {
    fn deliver(&mut self, alert: &AlertEvent) -> Result<()> {
        self.push(alert.clone());
        Ok(())
    }
}
