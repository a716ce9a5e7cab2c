//! CPU reference of the procedural noise kernel.
//!
//! Every function here mirrors its GLSL counterpart in [`crate::shader`] line
//! for line, including GLSL's `fract(x) = x - floor(x)` (Rust's `f32::fract`
//! truncates toward zero and disagrees for negative inputs). The GPU runs the
//! real thing; this copy exists so the algorithm can be tested on the host.

/// Rotation applied between octaves. Keeps successive layers off the grid axes.
pub const OCTAVE_ROTATION: f32 = 0.45;

/// Octave count used on desktop-class targets.
pub const DESKTOP_OCTAVES: u32 = 10;

/// Octave count used on constrained (mobile) targets.
pub const MOBILE_OCTAVES: u32 = 6;

#[inline]
fn fract(x: f32) -> f32 {
    x - x.floor()
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn smoothstep01(x: f32) -> f32 {
    let t = x.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// One-dimensional hash in `[0, 1)`.
pub fn hash11(p: f32) -> f32 {
    let mut p = fract(p * 0.1031);
    p *= p + 33.33;
    p *= p + p;
    fract(p)
}

/// Two-dimensional hash in `[0, 1)`.
pub fn hash12(x: f32, y: f32) -> f32 {
    let mut p3 = [fract(x * 0.1031), fract(y * 0.1031), fract(x * 0.1031)];
    // dot(p3, p3.yzx + 33.33)
    let d = p3[0] * (p3[1] + 33.33) + p3[1] * (p3[2] + 33.33) + p3[2] * (p3[0] + 33.33);
    for c in &mut p3 {
        *c += d;
    }
    fract((p3[0] + p3[1]) * p3[2])
}

/// Smoothly interpolated value noise in `[0, 1]`.
pub fn value_noise(x: f32, y: f32) -> f32 {
    let (ix, iy) = (x.floor(), y.floor());
    let (fx, fy) = (x - ix, y - iy);

    let a = hash12(ix, iy);
    let b = hash12(ix + 1.0, iy);
    let c = hash12(ix, iy + 1.0);
    let d = hash12(ix + 1.0, iy + 1.0);

    let tx = smoothstep01(fx);
    let ty = smoothstep01(fy);
    mix(mix(a, b, tx), mix(c, d, tx), ty)
}

/// Fractal Brownian motion over [`value_noise`].
///
/// Each octave doubles frequency, halves amplitude, and rotates the domain by
/// [`OCTAVE_ROTATION`]. With the starting amplitude of 0.5 the result stays in
/// `[0, 1)` for any octave count.
pub fn fbm(x: f32, y: f32, octaves: u32) -> f32 {
    let (c, s) = (OCTAVE_ROTATION.cos(), OCTAVE_ROTATION.sin());
    let (mut px, mut py) = (x, y);
    let mut value = 0.0;
    let mut amplitude = 0.5;

    for _ in 0..octaves {
        value += amplitude * value_noise(px, py);
        // p *= mat2(c, -s, s, c), row vector times column-major matrix.
        let rx = px * c - py * s;
        let ry = px * s + py * c;
        px = rx * 2.0;
        py = ry * 2.0;
        amplitude *= 0.5;
    }
    value
}

/// Hue/saturation/value to RGB, all channels in `[0, 1]`.
///
/// `h` is a fraction of a full turn; values outside `[0, 1)` wrap.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let channel = |offset: f32| {
        let k = (h * 6.0 + offset).rem_euclid(6.0);
        ((k - 3.0).abs() - 1.0).clamp(0.0, 1.0)
    };
    let rgb = [channel(0.0), channel(4.0), channel(2.0)];
    rgb.map(|c| v * mix(1.0, c, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_stay_in_unit_interval() {
        for i in -50..50 {
            let p = i as f32 * 1.37;
            let h = hash11(p);
            assert!((0.0..1.0).contains(&h), "hash11({p}) = {h}");
            let h = hash12(p, -p * 0.5);
            assert!((0.0..1.0).contains(&h), "hash12({p}) = {h}");
        }
    }

    #[test]
    fn noise_matches_hash_at_lattice_points() {
        assert_eq!(value_noise(3.0, -2.0), hash12(3.0, -2.0));
        assert_eq!(value_noise(0.0, 0.0), hash12(0.0, 0.0));
    }

    #[test]
    fn noise_is_continuous_across_cell_edges() {
        let eps = 1e-3;
        for i in -4..4 {
            let edge = i as f32;
            let left = value_noise(edge - eps, 0.37);
            let right = value_noise(edge + eps, 0.37);
            assert!((left - right).abs() < 0.01, "jump at x={edge}");
        }
    }

    #[test]
    fn fbm_is_deterministic_and_bounded() {
        for octaves in [MOBILE_OCTAVES, DESKTOP_OCTAVES] {
            for i in 0..64 {
                let (x, y) = (i as f32 * 0.173 - 5.0, i as f32 * -0.291 + 2.0);
                let a = fbm(x, y, octaves);
                assert_eq!(a, fbm(x, y, octaves));
                assert!((0.0..1.0).contains(&a));
            }
        }
    }

    #[test]
    fn zero_octaves_is_flat() {
        assert_eq!(fbm(1.5, 2.5, 0), 0.0);
    }

    #[test]
    fn hsv_primaries() {
        let close = |a: [f32; 3], b: [f32; 3]| a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5);
        assert!(close(hsv_to_rgb(0.0, 1.0, 1.0), [1.0, 0.0, 0.0]));
        assert!(close(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0), [0.0, 1.0, 0.0]));
        assert!(close(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0), [0.0, 0.0, 1.0]));
        assert!(close(hsv_to_rgb(0.25, 0.0, 0.5), [0.5, 0.5, 0.5]));
    }
}
