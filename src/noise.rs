//! CPU mirror of the GPU simplex-noise primitive.
//!
//! Same algorithm as `shaders/noise3d.wgsl` (the Ashima Arts /
//! Gustavson 3D simplex noise with analytic gradient). The CPU and GPU
//! versions must stay in lockstep: the reference transform generator in
//! [`crate::transform`] uses this to predict what the compute kernel
//! writes.

use glam::{Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

fn mod289_v3(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn mod289_v4(x: Vec4) -> Vec4 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute(x: Vec4) -> Vec4 {
    mod289_v4(((x * 34.0) + Vec4::ONE) * x)
}

fn taylor_inv_sqrt(r: Vec4) -> Vec4 {
    Vec4::splat(1.79284291400159) - r * 0.85373472095314
}

/// GLSL-style step: 0.0 where `x < edge`, 1.0 otherwise.
fn step3(edge: Vec3, x: Vec3) -> Vec3 {
    Vec3::select(x.cmplt(edge), Vec3::ZERO, Vec3::ONE)
}

fn step4(edge: Vec4, x: Vec4) -> Vec4 {
    Vec4::select(x.cmplt(edge), Vec4::ZERO, Vec4::ONE)
}

/// 3D simplex noise with analytic gradient.
///
/// Returns `(gradient.xyz, value.w)`; the value stays in roughly
/// `[-1, 1]` and is C1-continuous everywhere.
pub fn snoise_grad(v: Vec3) -> Vec4 {
    const CX: f32 = 1.0 / 6.0;
    const CY: f32 = 1.0 / 3.0;

    // First corner
    let mut i = (v + Vec3::splat(v.dot(Vec3::splat(CY)))).floor();
    let x0 = v - i + Vec3::splat(i.dot(Vec3::splat(CX)));

    // Other corners
    let g = step3(x0.yzx(), x0);
    let l = Vec3::ONE - g;
    let i1 = g.min(l.zxy());
    let i2 = g.max(l.zxy());

    let x1 = x0 - i1 + Vec3::splat(CX);
    let x2 = x0 - i2 + Vec3::splat(CY);
    let x3 = x0 - Vec3::splat(0.5);

    // Permutations
    i = mod289_v3(i);
    let p = permute(
        permute(
            permute(Vec4::splat(i.z) + Vec4::new(0.0, i1.z, i2.z, 1.0))
                + Vec4::splat(i.y)
                + Vec4::new(0.0, i1.y, i2.y, 1.0),
        ) + Vec4::splat(i.x)
            + Vec4::new(0.0, i1.x, i2.x, 1.0),
    );

    // Gradients: 7x7 points over a square, mapped onto an octahedron.
    let j = p - (p / 49.0).floor() * 49.0;

    let x_ = (j / 7.0).floor();
    let y_ = (j - x_ * 7.0).floor();

    let x = (x_ * 2.0 + Vec4::splat(0.5)) / 7.0 - Vec4::ONE;
    let y = (y_ * 2.0 + Vec4::splat(0.5)) / 7.0 - Vec4::ONE;

    let h = Vec4::ONE - x.abs() - y.abs();

    let b0 = Vec4::new(x.x, x.y, y.x, y.y);
    let b1 = Vec4::new(x.z, x.w, y.z, y.w);

    let s0 = b0.floor() * 2.0 + Vec4::ONE;
    let s1 = b1.floor() * 2.0 + Vec4::ONE;
    let sh = -step4(h, Vec4::ZERO);

    let a0 = b0.xzyw() + s0.xzyw() * sh.xxyy();
    let a1 = b1.xzyw() + s1.xzyw() * sh.zzww();

    let mut g0 = Vec3::new(a0.x, a0.y, h.x);
    let mut g1 = Vec3::new(a0.z, a0.w, h.y);
    let mut g2 = Vec3::new(a1.x, a1.y, h.z);
    let mut g3 = Vec3::new(a1.z, a1.w, h.w);

    // Normalise gradients
    let norm = taylor_inv_sqrt(Vec4::new(
        g0.dot(g0),
        g1.dot(g1),
        g2.dot(g2),
        g3.dot(g3),
    ));
    g0 *= norm.x;
    g1 *= norm.y;
    g2 *= norm.z;
    g3 *= norm.w;

    // Noise and gradient at v
    let m = (Vec4::splat(0.6) - Vec4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3)))
        .max(Vec4::ZERO);
    let m2 = m * m;
    let m3 = m2 * m;
    let m4 = m2 * m2;

    let grad = x0 * (-6.0 * m3.x * x0.dot(g0))
        + g0 * m4.x
        + x1 * (-6.0 * m3.y * x1.dot(g1))
        + g1 * m4.y
        + x2 * (-6.0 * m3.z * x2.dot(g2))
        + g2 * m4.z
        + x3 * (-6.0 * m3.w * x3.dot(g3))
        + g3 * m4.w;

    let px = Vec4::new(x0.dot(g0), x1.dot(g1), x2.dot(g2), x3.dot(g3));

    Vec4::new(grad.x, grad.y, grad.z, m4.dot(px)) * 42.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let p = Vec3::new(1.3, -2.7, 0.42);
        assert_eq!(snoise_grad(p), snoise_grad(p));
    }

    #[test]
    fn test_value_bounded() {
        // Sample a coarse grid; simplex noise stays within ~[-1, 1]
        for ix in -4..=4 {
            for iy in -4..=4 {
                for iz in -4..=4 {
                    let p = Vec3::new(ix as f32 * 0.37, iy as f32 * 0.53, iz as f32 * 0.71);
                    let n = snoise_grad(p).w;
                    assert!(n.abs() <= 1.1, "noise {} out of range at {:?}", n, p);
                }
            }
        }
    }

    #[test]
    fn test_not_constant() {
        let a = snoise_grad(Vec3::new(0.1, 0.2, 0.3)).w;
        let b = snoise_grad(Vec3::new(2.9, -1.4, 0.8)).w;
        assert!((a - b).abs() > 1e-6);
    }

    #[test]
    fn test_gradient_matches_central_difference() {
        let points = [
            Vec3::new(0.13, 0.27, 0.81),
            Vec3::new(-1.62, 2.44, -0.35),
            Vec3::new(3.05, -0.71, 1.92),
        ];
        let h = 1e-3;
        for p in points {
            let analytic = snoise_grad(p).truncate();
            for axis in 0..3 {
                let mut dp = Vec3::ZERO;
                dp[axis] = h;
                let numeric = (snoise_grad(p + dp).w - snoise_grad(p - dp).w) / (2.0 * h);
                assert!(
                    (analytic[axis] - numeric).abs() < 1e-2,
                    "gradient mismatch at {:?} axis {}: analytic {} vs numeric {}",
                    p,
                    axis,
                    analytic[axis],
                    numeric
                );
            }
        }
    }
}
