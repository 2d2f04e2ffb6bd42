//! Fresnel reflectance terms shared by the microfacet BSDFs and the delta scattering layer.

use crate::color::Color;

/// Unpolarised Fresnel reflectance of a dielectric interface, by Snell's law and averaging the
/// s and p polarisation terms. `cos_theta_i` may be negative (ray approaching the surface from
/// the transmission side); `eta` is `eta_t / eta_i` for the side the ray is currently on.
pub fn dielectric(cos_theta_i: f32, eta: f32) -> f32 {
    let mut cos_i = cos_theta_i.clamp(-1.0, 1.0);
    let mut eta = eta;

    if cos_i < 0.0 {
        eta = 1.0 / eta;
        cos_i = -cos_i;
    }

    let sin2_t = (1.0 - cos_i * cos_i) / (eta * eta);
    if sin2_t >= 1.0 {
        return 1.0; // total internal reflection
    }
    let cos_t = (1.0 - sin2_t).max(0.0).sqrt();

    let r_parallel = (eta * cos_i - cos_t) / (eta * cos_i + cos_t);
    let r_perp = (cos_i - eta * cos_t) / (cos_i + eta * cos_t);
    (r_parallel * r_parallel + r_perp * r_perp) / 2.0
}

/// Schlick's approximation to the dielectric Fresnel term.
pub fn schlick(cos_theta: f32, r0: f32) -> f32 {
    let m = (1.0 - cos_theta.clamp(0.0, 1.0)).clamp(0.0, 1.0);
    let m2 = m * m;
    r0 + (1.0 - r0) * m2 * m2 * m
}

/// Fresnel reflectance of a conductor with complex index of refraction `eta + i*k`, per
/// channel, polarisation-averaged.
pub fn conductor(cos_theta_i: f32, eta: Color, k: Color) -> Color {
    Color::new(
        conductor_channel(cos_theta_i, eta.r, k.r),
        conductor_channel(cos_theta_i, eta.g, k.g),
        conductor_channel(cos_theta_i, eta.b, k.b),
    )
}

fn conductor_channel(cos_theta_i: f32, eta: f32, k: f32) -> f32 {
    let cos_i = cos_theta_i.clamp(0.0, 1.0);
    let cos2 = cos_i * cos_i;
    let sin2 = 1.0 - cos2;

    let eta2 = eta * eta;
    let k2 = k * k;

    let t0 = eta2 - k2 - sin2;
    let a2_plus_b2 = (t0 * t0 + 4.0 * eta2 * k2).max(0.0).sqrt();
    let t1 = a2_plus_b2 + cos2;
    let a = (0.5 * (a2_plus_b2 + t0)).max(0.0).sqrt();
    let t2 = 2.0 * a * cos_i;
    let rs = (t1 - t2) / (t1 + t2);

    let t3 = cos2 * a2_plus_b2 + sin2 * sin2;
    let t4 = t2 * sin2;
    let rp = rs * (t3 - t4) / (t3 + t4);

    0.5 * (rp + rs)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn dielectric_normal_incidence_matches_r0() {
        let eta = 1.5;
        let r0 = ((eta - 1.0) / (eta + 1.0)).powi(2);
        assert!((dielectric(1.0, eta) - r0).abs() < 1e-5);
    }

    #[test]
    fn dielectric_grazing_incidence_is_total_reflection() {
        assert!((dielectric(0.0, 1.5) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn schlick_matches_r0_at_normal_incidence() {
        assert!((schlick(1.0, 0.04) - 0.04).abs() < 1e-6);
    }

    #[test]
    fn schlick_reaches_full_reflectance_at_grazing_angle() {
        assert!((schlick(0.0, 0.04) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn conductor_reflectance_stays_in_unit_range() {
        let eta = Color::new(0.2, 0.92, 1.1);
        let k = Color::new(3.9, 2.45, 2.14);
        for cos_theta in [0.0, 0.2, 0.5, 0.9, 1.0] {
            let r = conductor(cos_theta, eta, k);
            assert!((0.0..=1.0).contains(&r.r));
            assert!((0.0..=1.0).contains(&r.g));
            assert!((0.0..=1.0).contains(&r.b));
        }
    }
}
