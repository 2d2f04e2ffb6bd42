use std::f32::consts::PI;

use crate::color::{Color, is_black};
use crate::geometry::WorldVector;
use crate::sampling::{Sample2D, cosine_hemisphere_pdf, cosine_sample_hemisphere};

use super::{BsdfSample, same_hemisphere};

/// Perfectly diffuse (Lambertian) reflection: `f = reflectance / pi`, independent of direction.
#[derive(Copy, Clone, Debug)]
pub struct Lambertian {
    pub reflectance: Color,
}

impl Lambertian {
    pub fn evaluate(&self, wo: WorldVector, wi: WorldVector) -> Color {
        if !same_hemisphere(wo, wi) {
            return Color::new(0.0, 0.0, 0.0);
        }
        self.reflectance * (1.0 / PI)
    }

    pub fn sample(&self, wo: WorldVector, u: Sample2D) -> Option<BsdfSample> {
        if is_black(self.reflectance) {
            return None;
        }
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

    pub fn pdf(&self, wo: WorldVector, wi: WorldVector) -> f32 {
        if !same_hemisphere(wo, wi) {
            return 0.0;
        }
        cosine_hemisphere_pdf(wi.z.abs())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn reflectance_over_pi_for_any_upper_hemisphere_pair() {
        let bsdf = Lambertian {
            reflectance: Color::new(0.5, 0.5, 0.5),
        };
        let expected = 0.5 / PI;
        for (wo, wi) in [
            (
                WorldVector::new(0.0, 0.0, 1.0),
                WorldVector::new(0.0, 0.0, 1.0),
            ),
            (
                WorldVector::new(0.6, 0.0, 0.8),
                WorldVector::new(-0.3, 0.2, 0.93).normalize(),
            ),
            (
                WorldVector::new(0.1, 0.9, 0.43).normalize(),
                WorldVector::new(0.9, -0.1, 0.43).normalize(),
            ),
        ] {
            let f = bsdf.evaluate(wo, wi);
            assert!((f.r - expected).abs() < 1e-6);
            assert!((f.g - expected).abs() < 1e-6);
            assert!((f.b - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn opposite_hemisphere_is_black() {
        let bsdf = Lambertian {
            reflectance: Color::new(0.5, 0.5, 0.5),
        };
        let f = bsdf.evaluate(WorldVector::new(0.0, 0.0, 1.0), WorldVector::new(0.0, 0.0, -1.0));
        assert!(f.r == 0.0 && f.g == 0.0 && f.b == 0.0);
    }

    #[test]
    fn sample_pdf_matches_pdf_query() {
        let bsdf = Lambertian {
            reflectance: Color::new(0.8, 0.2, 0.3),
        };
        let wo = WorldVector::new(0.0, 0.0, 1.0);
        for (ux, uy) in [(0.1, 0.2), (0.5, 0.5), (0.9, 0.01)] {
            let sample = bsdf.sample(wo, Sample2D::new(ux, uy)).unwrap();
            assert!((sample.pdf - bsdf.pdf(wo, sample.wi)).abs() < 1e-6);
        }
    }
}
