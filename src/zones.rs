//! Zone Model: blind-spot geometry for one side camera.
//!
//! Resolves the configured fractions against the frame size into pixel
//! bands: three horizontal bands (critical / warning / safe) anchored to the
//! blind-spot edge, a vertical region of interest, and the self-exclusion
//! rectangle where the rider's own vehicle shows up. Pure geometry; rebuild
//! it whenever the frame size changes.
//!
//! A left camera has its blind spot at the left frame edge (x = 0) and sees
//! the rider's bike in the bottom-right corner. A right camera mirrors both.

use serde::Deserialize;

use crate::config::ZoneConfig;
use crate::error::GuardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSide {
    #[default]
    Left,
    Right,
}

impl CameraSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraSide::Left => "left",
            CameraSide::Right => "right",
        }
    }

    /// Sign of lateral velocity pointing toward the blind-spot edge.
    pub fn toward_blind_spot(&self) -> f32 {
        match self {
            CameraSide::Left => -1.0,
            CameraSide::Right => 1.0,
        }
    }
}

impl std::str::FromStr for CameraSide {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(CameraSide::Left),
            "right" => Ok(CameraSide::Right),
            other => Err(GuardError::config(
                "camera.side",
                format!("must be 'left' or 'right', got '{other}'"),
            )),
        }
    }
}

/// Horizontal band (or ROI rejection) a point falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Critical,
    Warning,
    Safe,
    OutsideRoi,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Critical => "critical",
            Zone::Warning => "warning",
            Zone::Safe => "safe",
            Zone::OutsideRoi => "outside_roi",
        }
    }
}

/// Axis-aligned pixel rectangle, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl PixelRect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

/// Resolved geometry for one camera at one frame size.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneModel {
    side: CameraSide,
    width: f32,
    height: f32,
    /// Distance from the blind-spot edge where the critical band ends.
    critical_extent: f32,
    /// Distance from the blind-spot edge where the warning band ends.
    warning_extent: f32,
    roi_top: f32,
    roi_bottom: f32,
    self_zone: PixelRect,
}

impl ZoneModel {
    pub fn new(
        width: u32,
        height: u32,
        cfg: &ZoneConfig,
        side: CameraSide,
    ) -> Result<Self, GuardError> {
        if width == 0 || height == 0 {
            return Err(GuardError::InvalidFrameSize { width, height });
        }
        let w = width as f32;
        let h = height as f32;

        let corner = cfg.self_zone_rect_fractions;
        let self_zone = match side {
            CameraSide::Left => PixelRect {
                x_min: corner.x * w,
                y_min: corner.y * h,
                x_max: w,
                y_max: h,
            },
            CameraSide::Right => PixelRect {
                x_min: 0.0,
                y_min: corner.y * h,
                x_max: (1.0 - corner.x) * w,
                y_max: h,
            },
        };

        Ok(Self {
            side,
            width: w,
            height: h,
            critical_extent: cfg.critical_band_fraction * w,
            warning_extent: cfg.warning_band_fraction * w,
            roi_top: cfg.roi_vertical_fractions.top * h,
            roi_bottom: cfg.roi_vertical_fractions.bottom * h,
            self_zone,
        })
    }

    pub fn side(&self) -> CameraSide {
        self.side
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn self_zone(&self) -> PixelRect {
        self.self_zone
    }

    /// Horizontal distance of `x` from the blind-spot edge.
    pub fn distance_from_blind_spot_edge(&self, x: f32) -> f32 {
        match self.side {
            CameraSide::Left => x,
            CameraSide::Right => self.width - x,
        }
    }

    pub fn in_roi(&self, y: f32) -> bool {
        (self.roi_top..=self.roi_bottom).contains(&y)
    }

    /// Horizontal band for `x`, ignoring the ROI.
    pub fn band_for_x(&self, x: f32) -> Zone {
        let d = self.distance_from_blind_spot_edge(x);
        if d < self.critical_extent {
            Zone::Critical
        } else if d < self.warning_extent {
            Zone::Warning
        } else {
            Zone::Safe
        }
    }

    pub fn zone_for_point(&self, x: f32, y: f32) -> Zone {
        if !self.in_roi(y) {
            return Zone::OutsideRoi;
        }
        self.band_for_x(x)
    }

    pub fn is_in_self_zone(&self, x: f32, y: f32) -> bool {
        self.self_zone.contains(x, y)
    }

    /// True when `x` lies beyond `fraction` of the frame width measured from
    /// the blind-spot edge, i.e. toward the far lane.
    pub fn is_in_far_band(&self, x: f32, fraction: f32) -> bool {
        self.distance_from_blind_spot_edge(x) > fraction * self.width
    }
}
