//! Pixel reconstruction filter (`pixel_filter_type`/`pixel_filter_radius`/`pixel_filter_alpha`,
//! §6). The worker samples film positions uniformly over the filter's support and weights each
//! sample by the filter's response there, so the accumulated image is the filter-weighted mean
//! of the samples rather than the unweighted box average, without needing a closed-form
//! importance sampler for each filter shape.

use crate::config::{PixelFilterType, RaytracerConfig};

#[derive(Copy, Clone, Debug)]
pub struct PixelFilter {
    kind: PixelFilterType,
    radius: f32,
    alpha: f32,
    /// `exp(-alpha * radius^2)`, the Gaussian filter's value at the edge of its support;
    /// subtracted off so the filter reaches exactly zero at `radius` instead of clamping.
    gaussian_edge: f32,
}

impl PixelFilter {
    pub fn from_config(config: &RaytracerConfig) -> Self {
        let radius = config.pixel_filter_radius.max(1e-4);
        let alpha = config.pixel_filter_alpha;
        PixelFilter {
            kind: config.pixel_filter_type,
            radius,
            alpha,
            gaussian_edge: (-alpha * radius * radius).exp(),
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Filter response at offset `(x, y)` from the pixel center, in pixel units. Zero outside
    /// the filter's square support.
    pub fn weight(&self, x: f32, y: f32) -> f32 {
        if x.abs() > self.radius || y.abs() > self.radius {
            return 0.0;
        }
        match self.kind {
            PixelFilterType::Box => 1.0,
            PixelFilterType::Triangle => (self.radius - x.abs()) * (self.radius - y.abs()),
            PixelFilterType::Gaussian => {
                self.gaussian_1d(x) * self.gaussian_1d(y)
            }
        }
    }

    fn gaussian_1d(&self, x: f32) -> f32 {
        ((-self.alpha * x * x).exp() - self.gaussian_edge).max(0.0)
    }
}
