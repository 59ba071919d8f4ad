//! Cosine-based color gradient.
//!
//! Compact four-coefficient-vector representation of a smooth color
//! ramp: `color(t) = a + b * cos(2π * (c * t + d))`. The `*_2`
//! accessors return `c` and `d` premultiplied by 2π so the shader can
//! evaluate `a + b * cos(c2 * t + d2)` directly.

use glam::{Vec3, Vec4};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CosineGradient {
    a: Vec4,
    b: Vec4,
    c: Vec4,
    d: Vec4,
}

impl CosineGradient {
    pub fn new(a: Vec4, b: Vec4, c: Vec4, d: Vec4) -> Self {
        Self { a, b, c, d }
    }

    pub fn coeffs_a(&self) -> Vec4 {
        self.a
    }

    pub fn coeffs_b(&self) -> Vec4 {
        self.b
    }

    /// `c` premultiplied by 2π.
    pub fn coeffs_c2(&self) -> Vec4 {
        self.c * std::f32::consts::TAU
    }

    /// `d` premultiplied by 2π.
    pub fn coeffs_d2(&self) -> Vec4 {
        self.d * std::f32::consts::TAU
    }

    /// CPU evaluation, clamped to displayable range. The shader does
    /// the same computation from the premultiplied coefficients.
    pub fn evaluate(&self, t: f32) -> Vec3 {
        let phase = (self.c * t + self.d) * std::f32::consts::TAU;
        let c = self.a + self.b * Vec4::new(phase.x.cos(), phase.y.cos(), phase.z.cos(), phase.w.cos());
        c.truncate().clamp(Vec3::ZERO, Vec3::ONE)
    }
}

impl Default for CosineGradient {
    /// Full-spectrum rainbow ramp.
    fn default() -> Self {
        Self {
            a: Vec4::new(0.5, 0.5, 0.5, 1.0),
            b: Vec4::new(0.5, 0.5, 0.5, 0.0),
            c: Vec4::new(1.0, 1.0, 1.0, 0.0),
            d: Vec4::new(0.0, 0.33, 0.67, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premultiplied_coefficients() {
        let g = CosineGradient::default();
        assert!((g.coeffs_c2() - Vec4::new(1.0, 1.0, 1.0, 0.0) * std::f32::consts::TAU).length() < 1e-6);
        assert!((g.coeffs_d2() - Vec4::new(0.0, 0.33, 0.67, 0.0) * std::f32::consts::TAU).length() < 1e-5);
    }

    #[test]
    fn test_evaluate_matches_premultiplied_form() {
        let g = CosineGradient::default();
        for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let direct = g.evaluate(t);
            let c2 = g.coeffs_c2();
            let d2 = g.coeffs_d2();
            let via_shader_form = (g.coeffs_a()
                + g.coeffs_b()
                    * Vec4::new(
                        (c2.x * t + d2.x).cos(),
                        (c2.y * t + d2.y).cos(),
                        (c2.z * t + d2.z).cos(),
                        (c2.w * t + d2.w).cos(),
                    ))
            .truncate()
            .clamp(Vec3::ZERO, Vec3::ONE);
            assert!((direct - via_shader_form).length() < 1e-5, "mismatch at t={}", t);
        }
    }

    #[test]
    fn test_evaluate_in_display_range() {
        let g = CosineGradient::default();
        for i in 0..=20 {
            let c = g.evaluate(i as f32 / 20.0);
            assert!(c.min_element() >= 0.0 && c.max_element() <= 1.0);
        }
    }
}
