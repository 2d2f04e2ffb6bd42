use rand::Rng;
use rand::seq::SliceRandom as _;

use super::Sample2D;

const ONE_MINUS_EPSILON: f32 = 0.99999994;

struct Array2DInfo {
    x_size: u32,
    y_size: u32,
    first_sample_offset: usize,
}

/// Shared, read-only description of how many samples a pixel gets and which 2D sample
/// arrays (e.g. for area light sampling) are registered against it. One instance is built
/// once per render and shared by every per-pixel [`StratifiedPixelSampler`].
pub struct StratifiedSamplerConfig {
    x_pixel_samples: u32,
    y_pixel_samples: u32,
    array2d_infos: Vec<Array2DInfo>,
    array2d_samples_per_pixel: usize,
}

impl StratifiedSamplerConfig {
    pub fn new(x_pixel_samples: u32, y_pixel_samples: u32) -> Self {
        StratifiedSamplerConfig {
            x_pixel_samples,
            y_pixel_samples,
            array2d_infos: Vec::new(),
            array2d_samples_per_pixel: 0,
        }
    }

    /// Registers a 2D array of stratified samples generated per pixel sample; every array
    /// registered this way is mutually well-distributed within a single pixel. Returns the
    /// id to pass to [`StratifiedPixelSampler::array2d`].
    pub fn register_array2d_samples(&mut self, x_size: u32, y_size: u32) -> usize {
        let info = Array2DInfo {
            x_size,
            y_size,
            first_sample_offset: self.array2d_samples_per_pixel,
        };
        self.array2d_infos.push(info);
        self.array2d_samples_per_pixel +=
            (x_size * y_size) as usize * self.pixel_sample_count();
        self.array2d_infos.len() - 1
    }

    pub fn pixel_sample_count(&self) -> usize {
        (self.x_pixel_samples * self.y_pixel_samples) as usize
    }
}

/// Generates and caches the stratified sample set for a single pixel's worth of shading
/// work. Reused across pixels by calling [`generate_samples`](Self::generate_samples)
/// again, avoiding a per-pixel allocation.
pub struct StratifiedPixelSampler<'a> {
    config: &'a StratifiedSamplerConfig,
    image_plane_samples: Vec<Sample2D>,
    array2d_samples: Vec<Sample2D>,
}

impl<'a> StratifiedPixelSampler<'a> {
    pub fn new(config: &'a StratifiedSamplerConfig) -> Self {
        StratifiedPixelSampler {
            config,
            image_plane_samples: vec![Sample2D::zeros(); config.pixel_sample_count()],
            array2d_samples: vec![Sample2D::zeros(); config.array2d_samples_per_pixel],
        }
    }

    pub fn pixel_sample_count(&self) -> usize {
        self.config.pixel_sample_count()
    }

    /// Regenerates every registered sample set for a new pixel. Must be called before the
    /// sampler is used for each pixel the renderer visits.
    pub fn generate_samples(&mut self, rng: &mut impl Rng) {
        let config = self.config;
        let pixel_sample_count = config.pixel_sample_count();

        generate_stratified_sequence_2d(
            rng,
            config.x_pixel_samples,
            config.y_pixel_samples,
            &mut self.image_plane_samples,
        );

        for info in &config.array2d_infos {
            let array_sample_count = (info.x_size * info.y_size) as usize;
            let mut stratified_grids = vec![Sample2D::zeros(); array_sample_count * pixel_sample_count];

            for k in 0..array_sample_count {
                let grid = &mut stratified_grids[k * pixel_sample_count..(k + 1) * pixel_sample_count];
                generate_stratified_sequence_2d(
                    rng,
                    config.x_pixel_samples,
                    config.y_pixel_samples,
                    grid,
                );
            }

            let dx_array = 1.0 / info.x_size as f32;
            let dy_array = 1.0 / info.y_size as f32;
            let out = &mut self.array2d_samples[info.first_sample_offset..];

            for i in 0..pixel_sample_count {
                for k in 0..array_sample_count {
                    let x = (k as u32) % info.x_size;
                    let y = (k as u32) / info.x_size;
                    let u = stratified_grids[k * pixel_sample_count + i];

                    let sx = ((x as f32 + u.x) * dx_array).min(ONE_MINUS_EPSILON);
                    let sy = ((y as f32 + u.y) * dy_array).min(ONE_MINUS_EPSILON);
                    out[i * array_sample_count + k] = Sample2D::new(sx, sy);
                }
            }
        }
    }

    pub fn image_plane_position(&self, pixel_sample_index: usize) -> Sample2D {
        self.image_plane_samples[pixel_sample_index]
    }

    pub fn array2d(&self, pixel_sample_index: usize, array2d_id: usize) -> &[Sample2D] {
        let info = &self.config.array2d_infos[array2d_id];
        let count = (info.x_size * info.y_size) as usize;
        let start = info.first_sample_offset + pixel_sample_index * count;
        &self.array2d_samples[start..start + count]
    }
}

/// Generates an `nx * ny` grid of `[0,1)^2` samples, one per cell with a random jitter
/// inside the cell, then shuffles the grid so consumers that only look at a prefix still
/// see a well distributed subset.
fn generate_stratified_sequence_2d(rng: &mut impl Rng, nx: u32, ny: u32, out: &mut [Sample2D]) {
    debug_assert_eq!(out.len(), (nx * ny) as usize);

    let dx = 1.0 / nx as f32;
    let dy = 1.0 / ny as f32;

    let mut i = 0;
    for y in 0..ny {
        for x in 0..nx {
            let jx: f32 = rng.random();
            let jy: f32 = rng.random();
            out[i] = Sample2D::new(
                ((x as f32 + jx) * dx).min(ONE_MINUS_EPSILON),
                ((y as f32 + jy) * dy).min(ONE_MINUS_EPSILON),
            );
            i += 1;
        }
    }

    out.shuffle(rng);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sampling::Pcg32;
    use assert2::assert;

    #[test]
    fn image_plane_samples_cover_unit_square_cells() {
        let config = StratifiedSamplerConfig::new(4, 4);
        let mut sampler = StratifiedPixelSampler::new(&config);
        let mut rng = Pcg32::new();
        sampler.generate_samples(&mut rng);

        assert!(sampler.pixel_sample_count() == 16);
        for i in 0..16 {
            let p = sampler.image_plane_position(i);
            assert!((0.0..1.0).contains(&p.x));
            assert!((0.0..1.0).contains(&p.y));
        }
    }

    #[test]
    fn array2d_samples_are_registered_and_sized() {
        let mut config = StratifiedSamplerConfig::new(2, 2);
        let id = config.register_array2d_samples(2, 2);

        let mut sampler = StratifiedPixelSampler::new(&config);
        let mut rng = Pcg32::new();
        sampler.generate_samples(&mut rng);

        for i in 0..sampler.pixel_sample_count() {
            let samples = sampler.array2d(i, id);
            assert!(samples.len() == 4);
            for s in samples {
                assert!((0.0..1.0).contains(&s.x));
                assert!((0.0..1.0).contains(&s.y));
            }
        }
    }
}
