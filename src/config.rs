/// Blind-spot Guard Configuration
///
/// Loaded from blindspot.toml (working directory) with env-var overrides.
/// Env format: BLINDSPOT__SECTION__KEY (double underscore separators).
///
/// Every tunable the tracker, zone model, classifier and arbiter read lives
/// here; none of them embed thresholds of their own.

use std::path::Path;

use serde::Deserialize;

use crate::error::GuardError;
use crate::zones::CameraSide;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub zones: ZoneConfig,
    #[serde(default)]
    pub threat: ThreatConfig,
    #[serde(default)]
    pub arbiter: ArbiterConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub side: CameraSide,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Max center displacement (px) to match a track across frames.
    /// Tuned for ~30 samples/s; lower rates or faster traffic need more.
    #[serde(default = "default_matching_distance_px")]
    pub matching_distance_px: f32,
    /// Seconds a track may go unmatched before it is dropped.
    #[serde(default = "default_track_max_age_seconds")]
    pub track_max_age_seconds: f64,
    #[serde(default = "default_confirm_match_count")]
    pub confirm_match_count: u32,
    /// Samples retained for velocity and class smoothing.
    #[serde(default = "default_history_window_size")]
    pub history_window_size: usize,
}

fn default_matching_distance_px() -> f32 {
    100.0
}
fn default_track_max_age_seconds() -> f64 {
    1.0
}
fn default_confirm_match_count() -> u32 {
    1
}
fn default_history_window_size() -> usize {
    10
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            matching_distance_px: default_matching_distance_px(),
            track_max_age_seconds: default_track_max_age_seconds(),
            confirm_match_count: default_confirm_match_count(),
            history_window_size: default_history_window_size(),
        }
    }
}

/// Corner of the self-exclusion rectangle, as frame fractions, for a left
/// camera. The rectangle runs from this corner to the bottom-right frame
/// corner; a right camera mirrors it to the bottom-left.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SelfZoneFractions {
    pub x: f32,
    pub y: f32,
}

impl Default for SelfZoneFractions {
    fn default() -> Self {
        Self { x: 0.7, y: 0.6 }
    }
}

/// Vertical band kept for analysis; everything above `top` or below
/// `bottom` (fractions of frame height) is sky, bonnet or road surface.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RoiFractions {
    pub top: f32,
    pub bottom: f32,
}

impl Default for RoiFractions {
    fn default() -> Self {
        Self {
            top: 0.15,
            bottom: 0.85,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    /// Outer edge of the critical band, measured from the blind-spot edge.
    #[serde(default = "default_critical_band_fraction")]
    pub critical_band_fraction: f32,
    /// Outer edge of the warning band, measured from the blind-spot edge.
    #[serde(default = "default_warning_band_fraction")]
    pub warning_band_fraction: f32,
    #[serde(default)]
    pub self_zone_rect_fractions: SelfZoneFractions,
    #[serde(default)]
    pub roi_vertical_fractions: RoiFractions,
}

fn default_critical_band_fraction() -> f32 {
    0.35
}
fn default_warning_band_fraction() -> f32 {
    0.65
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            critical_band_fraction: default_critical_band_fraction(),
            warning_band_fraction: default_warning_band_fraction(),
            self_zone_rect_fractions: SelfZoneFractions::default(),
            roi_vertical_fractions: RoiFractions::default(),
        }
    }
}

/// Classifier thresholds. Speeds are pixels per second.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreatConfig {
    /// Fraction of frame width, from the blind-spot edge, beyond which a
    /// vehicle is a candidate for oncoming traffic.
    #[serde(default = "default_opposite_lane_position_fraction")]
    pub opposite_lane_position_fraction: f32,
    #[serde(default = "default_opposite_lane_velocity_threshold")]
    pub opposite_lane_velocity_threshold: f32,
    #[serde(default = "default_distance_critical_height_ratio")]
    pub distance_critical_height_ratio: f32,
    #[serde(default = "default_distance_warning_height_ratio")]
    pub distance_warning_height_ratio: f32,
    #[serde(default = "default_stationary_speed_threshold")]
    pub stationary_speed_threshold: f32,
    /// Lateral speed separating approach/departure from parallel motion.
    #[serde(default = "default_lateral_motion_threshold")]
    pub lateral_motion_threshold: f32,
}

fn default_opposite_lane_position_fraction() -> f32 {
    0.7
}
fn default_opposite_lane_velocity_threshold() -> f32 {
    150.0
}
fn default_distance_critical_height_ratio() -> f32 {
    0.45
}
fn default_distance_warning_height_ratio() -> f32 {
    0.30
}
fn default_stationary_speed_threshold() -> f32 {
    60.0
}
fn default_lateral_motion_threshold() -> f32 {
    90.0
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            opposite_lane_position_fraction: default_opposite_lane_position_fraction(),
            opposite_lane_velocity_threshold: default_opposite_lane_velocity_threshold(),
            distance_critical_height_ratio: default_distance_critical_height_ratio(),
            distance_warning_height_ratio: default_distance_warning_height_ratio(),
            stationary_speed_threshold: default_stationary_speed_threshold(),
            lateral_motion_threshold: default_lateral_motion_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CooldownConfig {
    #[serde(default = "default_critical_cooldown")]
    pub critical: f64,
    #[serde(default = "default_warning_cooldown")]
    pub warning: f64,
}

fn default_critical_cooldown() -> f64 {
    1.0
}
fn default_warning_cooldown() -> f64 {
    1.5
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            critical: default_critical_cooldown(),
            warning: default_warning_cooldown(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArbiterConfig {
    #[serde(default)]
    pub cooldown_seconds: CooldownConfig,
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn fraction(field: &'static str, value: f32) -> Result<(), GuardError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GuardError::config(field, format!("must be within [0, 1], got {value}")))
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), GuardError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GuardError::config(field, format!("must be > 0, got {value}")))
    }
}

fn ordered(field: &'static str, lower: f32, upper: f32) -> Result<(), GuardError> {
    if lower < upper {
        Ok(())
    } else {
        Err(GuardError::config(
            field,
            format!("lower bound {lower} must be below upper bound {upper}"),
        ))
    }
}

impl GuardConfig {
    /// Reject anything the pipeline cannot run with. Called before any
    /// frame is processed.
    pub fn validate(&self) -> Result<(), GuardError> {
        let t = &self.tracker;
        positive("tracker.matching_distance_px", t.matching_distance_px as f64)?;
        positive("tracker.track_max_age_seconds", t.track_max_age_seconds)?;
        if t.confirm_match_count == 0 {
            return Err(GuardError::config("tracker.confirm_match_count", "must be >= 1"));
        }
        if t.history_window_size < 2 {
            return Err(GuardError::config(
                "tracker.history_window_size",
                "must retain at least 2 samples",
            ));
        }

        let z = &self.zones;
        fraction("zones.critical_band_fraction", z.critical_band_fraction)?;
        fraction("zones.warning_band_fraction", z.warning_band_fraction)?;
        ordered(
            "zones.critical_band_fraction",
            z.critical_band_fraction,
            z.warning_band_fraction,
        )?;
        fraction("zones.self_zone_rect_fractions.x", z.self_zone_rect_fractions.x)?;
        fraction("zones.self_zone_rect_fractions.y", z.self_zone_rect_fractions.y)?;
        fraction("zones.roi_vertical_fractions.top", z.roi_vertical_fractions.top)?;
        fraction("zones.roi_vertical_fractions.bottom", z.roi_vertical_fractions.bottom)?;
        ordered(
            "zones.roi_vertical_fractions",
            z.roi_vertical_fractions.top,
            z.roi_vertical_fractions.bottom,
        )?;

        let th = &self.threat;
        fraction(
            "threat.opposite_lane_position_fraction",
            th.opposite_lane_position_fraction,
        )?;
        positive(
            "threat.opposite_lane_velocity_threshold",
            th.opposite_lane_velocity_threshold as f64,
        )?;
        positive(
            "threat.distance_critical_height_ratio",
            th.distance_critical_height_ratio as f64,
        )?;
        positive(
            "threat.distance_warning_height_ratio",
            th.distance_warning_height_ratio as f64,
        )?;
        ordered(
            "threat.distance_warning_height_ratio",
            th.distance_warning_height_ratio,
            th.distance_critical_height_ratio,
        )?;
        positive("threat.stationary_speed_threshold", th.stationary_speed_threshold as f64)?;
        positive("threat.lateral_motion_threshold", th.lateral_motion_threshold as f64)?;

        let c = &self.arbiter.cooldown_seconds;
        positive("arbiter.cooldown_seconds.critical", c.critical)?;
        positive("arbiter.cooldown_seconds.warning", c.warning)?;

        Ok(())
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

fn env_source() -> config::Environment {
    config::Environment::with_prefix("BLINDSPOT")
        .separator("__")
        .try_parsing(true)
}

fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<GuardConfig, GuardError> {
    let settings = builder.add_source(env_source()).build()?;
    let cfg = settings.try_deserialize::<GuardConfig>()?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load configuration from blindspot.toml + environment variable overrides.
///
/// Search order:
///   1. ./blindspot.toml (working directory, optional)
///   2. Environment variables: BLINDSPOT__CAMERA__SIDE, etc.
///
/// Defaults are used only when no file exists; a file that fails to parse or
/// validate is an error.
pub fn load_config() -> Result<GuardConfig, GuardError> {
    load_config_in(".")
}

/// Same as [`load_config`], looking for `blindspot.toml` in `dir`.
pub fn load_config_in(dir: impl AsRef<Path>) -> Result<GuardConfig, GuardError> {
    let base = dir.as_ref().join("blindspot");
    finish(
        config::Config::builder()
            .add_source(config::File::with_name(&base.to_string_lossy()).required(false)),
    )
}

/// Load configuration from an explicit file (which must exist) plus
/// environment overrides.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<GuardConfig, GuardError> {
    finish(config::Config::builder().add_source(config::File::from(path.as_ref()).required(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = GuardConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.tracker.matching_distance_px, 100.0);
        assert_eq!(cfg.tracker.history_window_size, 10);
        assert_eq!(cfg.camera.side, CameraSide::Left);
        assert!(cfg.arbiter.cooldown_seconds.critical < cfg.arbiter.cooldown_seconds.warning);
    }

    #[test]
    fn test_fraction_out_of_range_rejected() {
        let mut cfg = GuardConfig::default();
        cfg.zones.critical_band_fraction = 1.4;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            GuardError::InvalidConfig { field: "zones.critical_band_fraction", .. }
        ));
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let mut cfg = GuardConfig::default();
        cfg.threat.stationary_speed_threshold = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = GuardConfig::default();
        cfg.tracker.track_max_age_seconds = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = GuardConfig::default();
        cfg.arbiter.cooldown_seconds.warning = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_inverted_bands_rejected() {
        let mut cfg = GuardConfig::default();
        cfg.zones.critical_band_fraction = 0.7;
        cfg.zones.warning_band_fraction = 0.5;
        assert!(cfg.validate().is_err());

        let mut cfg = GuardConfig::default();
        cfg.zones.roi_vertical_fractions = RoiFractions { top: 0.9, bottom: 0.1 };
        assert!(cfg.validate().is_err());

        let mut cfg = GuardConfig::default();
        cfg.threat.distance_warning_height_ratio = 0.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_confirm_count_rejected() {
        let mut cfg = GuardConfig::default();
        cfg.tracker.confirm_match_count = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guard.toml");
        fs::write(
            &path,
            r#"
[camera]
side = "right"

[tracker]
matching_distance_px = 140.0
confirm_match_count = 3

[arbiter.cooldown_seconds]
warning = 2.5
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.camera.side, CameraSide::Right);
        assert_eq!(cfg.tracker.matching_distance_px, 140.0);
        assert_eq!(cfg.tracker.confirm_match_count, 3);
        assert_eq!(cfg.tracker.history_window_size, 10);
        assert_eq!(cfg.arbiter.cooldown_seconds.warning, 2.5);
        assert_eq!(cfg.arbiter.cooldown_seconds.critical, 1.0);
    }

    #[test]
    fn test_unknown_camera_side_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guard.toml");
        fs::write(&path, "[camera]\nside = \"rear\"\n").unwrap();
        assert!(matches!(load_config_from(&path), Err(GuardError::ConfigLoad(_))));
    }

    #[test]
    fn test_invalid_file_values_fail_fast() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guard.toml");
        fs::write(&path, "[zones]\nwarning_band_fraction = 2.0\n").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(GuardError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_working_dir_file_is_optional() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_in(dir.path()).unwrap();
        assert_eq!(cfg.camera.side, CameraSide::Left);
    }

    #[test]
    fn test_invalid_working_dir_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("blindspot.toml"),
            "[zones]\nwarning_band_fraction = 2.0\n",
        )
        .unwrap();
        assert!(matches!(
            load_config_in(dir.path()),
            Err(GuardError::InvalidConfig { field: "zones.warning_band_fraction", .. })
        ));

        fs::write(dir.path().join("blindspot.toml"), "[tracker\n").unwrap();
        assert!(matches!(load_config_in(dir.path()), Err(GuardError::ConfigLoad(_))));
    }
}
