use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use blindspot_guard::alerts::{AlertSink, LogSink};
use blindspot_guard::arbiter::AlertEvent;
use blindspot_guard::config::{self, GuardConfig};
use blindspot_guard::logging;
use blindspot_guard::pipeline::{BlindSpotPipeline, RunSummary};
use blindspot_guard::replay::{self, ReplaySource};
use blindspot_guard::zones::{CameraSide, ZoneModel};

const FALLBACK_FRAME_SIZE: (u32, u32) = (640, 480);

#[derive(Parser)]
#[command(name = "blindspot-guard", version)]
#[command(about = "Blind-spot threat tracking over recorded detector output")]
struct Cli {
    /// TOML config file (default: ./blindspot.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the camera side
    #[arg(long, global = true, value_parser = parse_side)]
    side: Option<CameraSide>,

    /// Also write daily-rotated logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSON-lines detection log through the pipeline
    Replay {
        path: PathBuf,
        #[arg(long)] width: Option<u32>,
        #[arg(long)] height: Option<u32>,
        /// Print alerts as JSON lines instead of log events
        #[arg(long)] json: bool,
    },

    /// Print the zone geometry for a frame size
    Zones {
        #[arg(long, default_value = "640")] width: u32,
        #[arg(long, default_value = "480")] height: u32,
    },
}

fn parse_side(s: &str) -> Result<CameraSide, String> {
    s.parse::<CameraSide>().map_err(|e| e.to_string())
}

/// Prints each alert as one JSON object per line.
struct JsonLinesSink;

impl AlertSink for JsonLinesSink {
    fn deliver(&mut self, alert: &AlertEvent) -> Result<()> {
        println!("{}", serde_json::to_string(alert)?);
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_dir.clone());

    let mut cfg = match &cli.config {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => config::load_config().context("loading ./blindspot.toml")?,
    };
    if let Some(side) = cli.side {
        cfg.camera.side = side;
    }

    match cli.command {
        Command::Replay { path, width, height, json } => {
            let (w, h) = match (width, height) {
                (Some(w), Some(h)) => (w, h),
                _ => replay::probe_frame_size(&path)?.unwrap_or(FALLBACK_FRAME_SIZE),
            };
            let mut pipeline = BlindSpotPipeline::new(cfg, w, h)?;
            let mut source = ReplaySource::open(&path)?;
            let summary = if json {
                pipeline.run(&mut source, &mut JsonLinesSink)?
            } else {
                pipeline.run(&mut source, &mut LogSink::new())?
            };
            if !json {
                print_summary(&path, &summary);
            }
        }

        Command::Zones { width, height } => {
            cfg.validate()?;
            let zones = ZoneModel::new(width, height, &cfg.zones, cfg.camera.side)?;
            print_zones(&cfg, &zones);
        }
    }
    Ok(())
}

fn print_summary(path: &std::path::Path, s: &RunSummary) {
    println!("Replay:          {}", path.display());
    println!("Frames:          {} ({} skipped)", s.frames, s.skipped);
    println!("Alerts:          {}", s.alerts);
    println!("Critical frames: {}", s.critical_frames);
    println!("Warning frames:  {}", s.warning_frames);
    println!("Peak tracked:    {}", s.peak_tracked);
}

fn print_zones(cfg: &GuardConfig, zones: &ZoneModel) {
    let w = zones.width();
    let z = &cfg.zones;
    let sz = zones.self_zone();
    println!("Camera:     {} ({}x{})", zones.side().as_str(), w, zones.height());
    println!("Critical:   0 .. {:.0} px from blind-spot edge", z.critical_band_fraction * w);
    println!("Warning:    .. {:.0} px", z.warning_band_fraction * w);
    println!(
        "ROI:        y {:.0} .. {:.0}",
        z.roi_vertical_fractions.top * zones.height(),
        z.roi_vertical_fractions.bottom * zones.height()
    );
    println!(
        "Self zone:  x {:.0}..{:.0}, y {:.0}..{:.0}",
        sz.x_min, sz.x_max, sz.y_min, sz.y_max
    );
    println!(
        "Far lane:   beyond {:.0} px",
        cfg.threat.opposite_lane_position_fraction * w
    );
}
