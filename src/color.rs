//! Spectral quantity shared by materials, lights and the integrator. The renderer only ever
//! carries tristimulus RGB (no full spectral rendering), so this is a thin alias plus the few
//! reductions the shading and light-transport code needs.

pub type Color = rgb::RGB<f32>;

pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

pub fn is_black(c: Color) -> bool {
    c.r == 0.0 && c.g == 0.0 && c.b == 0.0
}

pub fn max_component(c: Color) -> f32 {
    c.r.max(c.g).max(c.b)
}

/// CIE luminance of an RGB triple (Rec. 709 primaries), used by the Fourier BSDF's
/// luminance channel and by Russian roulette throughput bookkeeping.
pub fn luminance(c: Color) -> f32 {
    0.212671 * c.r + 0.715160 * c.g + 0.072169 * c.b
}
