mod machinery;
mod worker;

pub use crate::renderer::machinery::{FilmBuffer, RenderProgress, RenderProgressSnapshot, render};

use crate::config::RaytracerConfig;

#[derive(Copy, Clone, Debug)]
pub struct RenderSettings {
    pub tile_size: std::num::NonZeroU32,
    pub config: RaytracerConfig,
    /// Base RNG seed. Each pixel derives its own decorrelated PCG32 stream from this plus its
    /// own coordinates (§5: deterministic image reconstruction requires per-pixel, not
    /// per-thread, seeding), so the image is reproducible regardless of how tiles and pixels
    /// are scheduled across worker threads.
    pub seed: u64,
}
