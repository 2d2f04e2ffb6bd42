use rand::Rng as _;

use crate::camera::Camera;
use crate::color::{BLACK, Color};
use crate::filter::PixelFilter;
use crate::geometry::{ScreenBlock, ScreenPoint};
use crate::integrator;
use crate::renderer::RenderSettings;
use crate::sampling::Pcg32;
use crate::scene::Scene;
use crate::screen_block::ScreenBlockExt as _;

/// Stream id a pixel's RNG is seeded from: a function of the pixel's own coordinates only,
/// so a pixel's sample sequence is reproducible regardless of which worker thread or tile
/// order happens to render it (§5).
fn pixel_stream_id(point: ScreenPoint) -> u64 {
    ((point.x as u64) << 32) | point.y as u64
}

/// Carries no RNG state of its own: every pixel reseeds a fresh stream from its own
/// coordinates, so which worker renders which tile has no effect on the image produced.
pub struct Worker;

impl Worker {
    pub fn new() -> Self {
        Worker
    }

    /// Renders every pixel of `tile`, returning its pixels in C order (x changes first).
    pub fn render_tile(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        settings: &RenderSettings,
        tile: &ScreenBlock,
    ) -> Vec<Color> {
        let sample_count =
            (settings.config.x_pixel_sample_count * settings.config.y_pixel_sample_count).max(1);
        let filter = PixelFilter::from_config(&settings.config);

        tile.internal_points()
            .map(|point| {
                let mut rng = Pcg32::seeded(settings.seed, pixel_stream_id(point));
                let mut weighted_sum = BLACK;
                let mut weight_sum = 0.0f32;
                for _ in 0..sample_count {
                    let offset = (
                        rng.random_range(-filter.radius()..=filter.radius()),
                        rng.random_range(-filter.radius()..=filter.radius()),
                    );
                    let weight = filter.weight(offset.0, offset.1);
                    if weight <= 0.0 {
                        continue;
                    }
                    let ray = camera.sample_ray_with_offset(&point, offset, &mut rng);
                    let radiance = integrator::estimate_radiance(scene, &settings.config, ray, &mut rng);
                    weighted_sum += radiance * weight;
                    weight_sum += weight;
                }
                if weight_sum > 0.0 {
                    weighted_sum * (1.0 / weight_sum)
                } else {
                    BLACK
                }
            })
            .collect()
    }
}

impl Default for Worker {
    fn default() -> Self {
        Worker::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn pixel_stream_id_is_unique_per_coordinate() {
        let a = pixel_stream_id(ScreenPoint::new(3, 7));
        let b = pixel_stream_id(ScreenPoint::new(7, 3));
        assert!(a != b);
    }

    #[test]
    fn pixel_stream_id_is_deterministic() {
        let a = pixel_stream_id(ScreenPoint::new(42, 99));
        let b = pixel_stream_id(ScreenPoint::new(42, 99));
        assert!(a == b);
    }
}
