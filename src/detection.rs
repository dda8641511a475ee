//! Detections: the records the external detector hands over each frame.
//!
//! The detector applies its own confidence filtering and NMS. What is checked
//! here is only structural: boxes must have positive size, confidence must be
//! a probability and the label must name one of the vehicle classes we track.
//! Anything else is logged and dropped before matching.

use serde::Deserialize;
use tracing::warn;

use crate::error::DetectionRejection;

/// Vehicle classes the detector may report. Everything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VehicleClass {
    Car,
    Motorcycle,
    Bus,
    Truck,
    Bicycle,
}

impl VehicleClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleClass::Car        => "car",
            VehicleClass::Motorcycle => "motorcycle",
            VehicleClass::Bus        => "bus",
            VehicleClass::Truck      => "truck",
            VehicleClass::Bicycle    => "bicycle",
        }
    }

    /// Parse a detector label. COCO calls motorcycles "motorbike" in some
    /// exports, so both spellings are accepted.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "car"                       => Some(VehicleClass::Car),
            "motorcycle" | "motorbike"  => Some(VehicleClass::Motorcycle),
            "bus"                       => Some(VehicleClass::Bus),
            "truck"                     => Some(VehicleClass::Truck),
            "bicycle"                   => Some(VehicleClass::Bicycle),
            _                           => None,
        }
    }
}

/// Pixel box, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Box with the given center and size.
    pub fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// Detector output as received, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawDetection {
    #[serde(flatten)]
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub label: String,
}

impl RawDetection {
    pub fn new(bbox: BoundingBox, confidence: f32, label: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            label: label.into(),
        }
    }
}

/// A validated detection, ready for matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class: VehicleClass,
}

impl Detection {
    pub fn center(&self) -> (f32, f32) {
        self.bbox.center()
    }
}

impl TryFrom<RawDetection> for Detection {
    type Error = DetectionRejection;

    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        if !raw.bbox.is_finite() {
            return Err(DetectionRejection::NonFinite);
        }
        if raw.bbox.width <= 0.0 || raw.bbox.height <= 0.0 {
            return Err(DetectionRejection::NonPositiveSize {
                width: raw.bbox.width,
                height: raw.bbox.height,
            });
        }
        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(DetectionRejection::ConfidenceOutOfRange(raw.confidence));
        }
        let class = VehicleClass::from_label(&raw.label)
            .ok_or(DetectionRejection::UnknownClass(raw.label))?;

        Ok(Detection {
            bbox: raw.bbox,
            confidence: raw.confidence,
            class,
        })
    }
}

/// Validate a frame's worth of detector output, dropping malformed records.
pub fn sanitize(raw: Vec<RawDetection>) -> Vec<Detection> {
    raw.into_iter()
        .filter_map(|r| match Detection::try_from(r) {
            Ok(det) => Some(det),
            Err(e) => {
                warn!("Dropping detection: {}", e);
                None
            }
        })
        .collect()
}
