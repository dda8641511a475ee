#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::SeedableRng;

use blindspot_guard::{BlindSpotPipeline, BoundingBox, FrameReport, GuardConfig, RawDetection};

pub const DT: f64 = 1.0 / 30.0;
pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;

/// Car-shaped box centred on (cx, cy).
pub fn car(cx: f32, cy: f32, height: f32) -> RawDetection {
    RawDetection::new(BoundingBox::centered(cx, cy, height * 0.8, height), 0.9, "car")
}

pub fn pipeline() -> BlindSpotPipeline {
    pipeline_with(GuardConfig::default())
}

pub fn pipeline_with(cfg: GuardConfig) -> BlindSpotPipeline {
    BlindSpotPipeline::new(cfg, WIDTH, HEIGHT).unwrap()
}

pub fn step(p: &mut BlindSpotPipeline, dets: Vec<RawDetection>) -> FrameReport {
    p.process_frame(DT, Ok(dets)).unwrap()
}

/// Seeded generator for sweep tests.
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
