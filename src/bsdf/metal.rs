use crate::color::Color;
use crate::geometry::WorldVector;
use crate::sampling::Sample2D;

use super::microfacet;
use super::{BsdfSample, same_hemisphere};

/// Conductor (metal) reflection: full GGX microfacet distribution, complex-IOR Fresnel.
#[derive(Copy, Clone, Debug)]
pub struct Metal {
    pub eta: Color,
    pub k: Color,
    pub alpha_x: f32,
    pub alpha_y: f32,
}

impl Metal {
    fn half_vector(&self, wo: WorldVector, wi: WorldVector) -> Option<WorldVector> {
        let wh = wo + wi;
        if wh.norm_squared() < 1e-12 {
            return None;
        }
        let mut wh = wh.normalize();
        if wh.z < 0.0 {
            wh = -wh;
        }
        Some(wh)
    }

    pub fn evaluate(&self, wo: WorldVector, wi: WorldVector) -> Color {
        if !same_hemisphere(wo, wi) {
            return Color::new(0.0, 0.0, 0.0);
        }
        let cos_o = wo.z.abs();
        let cos_i = wi.z.abs();
        if cos_o <= 0.0 || cos_i <= 0.0 {
            return Color::new(0.0, 0.0, 0.0);
        }
        let Some(wh) = self.half_vector(wo, wi) else {
            return Color::new(0.0, 0.0, 0.0);
        };

        let d = microfacet::d(wh, self.alpha_x, self.alpha_y);
        let g = microfacet::g(wo, wi, self.alpha_x, self.alpha_y);
        let fresnel = super::fresnel::conductor(wo.dot(&wh).abs(), self.eta, self.k);

        fresnel * (d * g / (4.0 * cos_o * cos_i))
    }

    pub fn sample(&self, wo: WorldVector, u: Sample2D) -> Option<BsdfSample> {
        if wo.z == 0.0 {
            return None;
        }
        let wo_upper = if wo.z < 0.0 { -wo } else { wo };
        let wh = microfacet::sample_wh(wo_upper, self.alpha_x, self.alpha_y, u);
        let wi_upper = 2.0 * wo_upper.dot(&wh) * wh - wo_upper;
        let wi = if wo.z < 0.0 { -wi_upper } else { wi_upper };

        if !same_hemisphere(wo, wi) {
            return None;
        }
        let pdf = self.pdf(wo, wi);
        if pdf <= 0.0 {
            return None;
        }
        Some(BsdfSample {
            wi,
            f: self.evaluate(wo, wi),
            pdf,
        })
    }

    pub fn pdf(&self, wo: WorldVector, wi: WorldVector) -> f32 {
        if !same_hemisphere(wo, wi) {
            return 0.0;
        }
        let Some(wh) = self.half_vector(wo, wi) else {
            return 0.0;
        };
        let wo_upper = if wo.z < 0.0 { -wo } else { wo };
        microfacet::pdf_reflection(wo_upper, wh, self.alpha_x, self.alpha_y)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    fn metal() -> Metal {
        Metal {
            eta: Color::new(0.2, 0.92, 1.1),
            k: Color::new(3.9, 2.45, 2.14),
            alpha_x: 0.2,
            alpha_y: 0.2,
        }
    }

    #[test]
    fn reflection_is_reciprocal() {
        let m = metal();
        let wo = WorldVector::new(0.3, 0.1, 0.94).normalize();
        let wi = WorldVector::new(-0.2, 0.3, 0.9).normalize();
        let f1 = m.evaluate(wo, wi);
        let f2 = m.evaluate(wi, wo);
        assert!((f1.r - f2.r).abs() < 1e-5);
        assert!((f1.g - f2.g).abs() < 1e-5);
        assert!((f1.b - f2.b).abs() < 1e-5);
    }

    #[test]
    fn sample_pdf_matches_pdf_query() {
        let m = metal();
        let wo = WorldVector::new(0.0, 0.0, 1.0);
        for (ux, uy) in [(0.2, 0.3), (0.7, 0.1), (0.5, 0.9)] {
            if let Some(sample) = m.sample(wo, Sample2D::new(ux, uy)) {
                assert!((sample.pdf - m.pdf(wo, sample.wi)).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn opposite_hemisphere_has_zero_pdf() {
        let m = metal();
        let pdf = m.pdf(WorldVector::new(0.0, 0.0, 1.0), WorldVector::new(0.0, 0.0, -1.0));
        assert!(pdf == 0.0);
    }
}
