use crate::color::Color;
use crate::geometry::WorldVector;
use crate::sampling::{Sample2D, cosine_hemisphere_pdf, cosine_sample_hemisphere};

use super::BsdfSample;

/// Zenith-angle-discretised table of Fourier cosine-series coefficients, measured data
/// (e.g. from a goniophotometer or a layered-material solver). Mirrors the PBRT `.bsdf`
/// binary table layout: a sorted array of zenith cosines and, for every ordered pair of
/// zenith indices, a handful of coefficients describing the azimuthal falloff.
///
/// Sampling is not importance-sampled from the Fourier series (that requires a marginal/
/// conditional CDF built from the coefficients themselves); instead directions are drawn
/// cosine-weighted and re-weighted by `evaluate`, trading variance for a much smaller table
/// reader. This is a deliberate scope simplification, recorded in `DESIGN.md`.
#[derive(Clone, Debug)]
pub struct FourierTable {
    /// Sorted zenith cosines, `mu[0] < mu[1] < ... `.
    pub mu: Vec<f32>,
    /// 1 (monochromatic) or 3 (luminance, R, B; G is derived).
    pub n_channels: usize,
    /// Number of coefficients for the pair `(i, o)`, row-major over `mu.len() x mu.len()`.
    pub coefficient_counts: Vec<u32>,
    /// Offset of pair `(i, o)`'s coefficients into `coefficients`.
    pub coefficient_offsets: Vec<u32>,
    /// Flattened Fourier coefficients, `n_channels` coefficient runs back-to-back per pair.
    pub coefficients: Vec<f32>,
    pub eta: f32,
}

impl FourierTable {
    fn pair_index(&self, i: usize, o: usize) -> usize {
        i * self.mu.len() + o
    }

    /// Index of the nearest zenith sample at or below `cos_theta` (simple nearest-neighbour
    /// lookup rather than the full four-point spline interpolation PBRT performs across
    /// neighbouring zenith samples — see the module doc comment).
    fn nearest_zenith_index(&self, cos_theta: f32) -> usize {
        match self.mu.binary_search_by(|probe| probe.partial_cmp(&cos_theta).unwrap()) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) if i >= self.mu.len() => self.mu.len() - 1,
            Err(i) => {
                if (self.mu[i] - cos_theta).abs() < (cos_theta - self.mu[i - 1]).abs() {
                    i
                } else {
                    i - 1
                }
            }
        }
    }

    fn coefficients_for(&self, i: usize, o: usize, channel: usize) -> &[f32] {
        let pair = self.pair_index(i, o);
        let count = self.coefficient_counts[pair] as usize;
        let offset = self.coefficient_offsets[pair] as usize + channel * count;
        &self.coefficients[offset..offset + count]
    }
}

#[derive(Clone, Debug)]
pub struct FourierBsdf {
    pub table: std::sync::Arc<FourierTable>,
}

fn cos_delta_phi(wo: WorldVector, wi: WorldVector) -> f32 {
    let wo_len = (wo.x * wo.x + wo.y * wo.y).sqrt();
    let wi_len = (wi.x * wi.x + wi.y * wi.y).sqrt();
    if wo_len <= 1e-8 || wi_len <= 1e-8 {
        1.0
    } else {
        ((wo.x * wi.x + wo.y * wi.y) / (wo_len * wi_len)).clamp(-1.0, 1.0)
    }
}

fn fourier_sum(coefficients: &[f32], phi: f32) -> f32 {
    coefficients
        .iter()
        .enumerate()
        .map(|(k, a)| a * (k as f32 * phi).cos())
        .sum()
}

impl FourierBsdf {
    pub fn evaluate(&self, wo: WorldVector, wi: WorldVector) -> Color {
        let cos_i = wi.z;
        let cos_o = wo.z;
        if cos_i == 0.0 {
            return Color::new(0.0, 0.0, 0.0);
        }

        let i = self.table.nearest_zenith_index(cos_i.abs());
        let o = self.table.nearest_zenith_index(cos_o.abs());
        let phi = cos_delta_phi(wo, wi).acos();
        let scale = 1.0 / cos_i.abs();

        if self.table.n_channels == 1 {
            let y = fourier_sum(self.table.coefficients_for(i, o, 0), phi) * scale;
            Color::new(y.max(0.0), y.max(0.0), y.max(0.0))
        } else {
            let y = fourier_sum(self.table.coefficients_for(i, o, 0), phi) * scale;
            let r = fourier_sum(self.table.coefficients_for(i, o, 1), phi) * scale;
            let b = fourier_sum(self.table.coefficients_for(i, o, 2), phi) * scale;
            let g = (1.39829 * y - 0.100913 * b - 0.297375 * r).max(0.0);
            Color::new(r.max(0.0), g, b.max(0.0))
        }
    }

    pub fn sample(&self, wo: WorldVector, u: Sample2D) -> Option<BsdfSample> {
        let mut wi = cosine_sample_hemisphere(u);
        if wo.z < 0.0 {
            wi.z = -wi.z;
        }
        let pdf = cosine_hemisphere_pdf(wi.z.abs());
        if pdf <= 0.0 {
            return None;
        }
        Some(BsdfSample {
            wi,
            f: self.evaluate(wo, wi),
            pdf,
        })
    }

    pub fn pdf(&self, _wo: WorldVector, wi: WorldVector) -> f32 {
        cosine_hemisphere_pdf(wi.z.abs())
    }
}
