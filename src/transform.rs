//! CPU reference of the transform generator.
//!
//! Mirrors `shaders/cloner_update.wgsl` exactly: same noise, same basis
//! construction, same 3x4 row layout. The GPU kernel is the production
//! path; this module backs the property tests and any headless use.
//!
//! Count derivations live here as pure functions so both the renderer
//! and the tests agree on them.

use crate::noise::snoise_grad;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Fixed compute workgroup size. Instance counts are always rounded to
/// a multiple of this.
pub const THREAD_GROUP_SIZE: u32 = 64;

/// Number of workgroups dispatched for a given point count.
pub fn thread_group_count(point_count: u32) -> u32 {
    (point_count / THREAD_GROUP_SIZE).max(1)
}

/// Instances generated for a given point count: floor division by the
/// group size, clamped to at least one group. May be slightly below the
/// point count (e.g. 200 points -> 192 instances) and is never below 64.
pub fn instance_count(point_count: u32) -> u32 {
    thread_group_count(point_count) * THREAD_GROUP_SIZE
}

/// Advance the noise-field offset. Frozen while not simulating.
pub fn step_noise_offset(offset: Vec3, motion: Vec3, dt: f32, simulating: bool) -> Vec3 {
    if simulating {
        offset + motion * dt
    } else {
        offset
    }
}

/// Uniform parameters consumed by the `ClonerUpdate` kernel.
///
/// Field order matches the WGSL `ClonerParams` struct: four scalars,
/// then the offset vector on a 16-byte boundary, then the modifier in
/// the vec3's padding slot.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ClonerParams {
    pub instance_count: u32,
    pub base_scale: f32,
    pub scale_noise: f32,
    pub noise_frequency: f32,
    pub noise_offset: [f32; 3],
    pub normal_modifier: f32,
}

/// One 3x4 instance transform: three rows of `[rotation*scale | translation]`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub rows: [[f32; 4]; 3],
}

impl InstanceTransform {
    /// Apply the transform to a point in template space.
    pub fn apply(&self, p: Vec3) -> Vec3 {
        let h = [p.x, p.y, p.z, 1.0];
        let dot = |row: &[f32; 4]| row[0] * h[0] + row[1] * h[1] + row[2] * h[2] + row[3] * h[3];
        Vec3::new(dot(&self.rows[0]), dot(&self.rows[1]), dot(&self.rows[2]))
    }

    /// Translation column.
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.rows[0][3], self.rows[1][3], self.rows[2][3])
    }

    /// Basis column `i` (0..3), including the scale factor.
    pub fn basis_column(&self, i: usize) -> Vec3 {
        Vec3::new(self.rows[0][i], self.rows[1][i], self.rows[2][i])
    }
}

/// Transform for a single point, mirroring one kernel thread.
///
/// The up axis blends from the point's tangent (`normal_modifier` = 0)
/// to its normal (`normal_modifier` = 1). Effective scale is
/// `base_scale + scale_noise * noise` and is deliberately unclamped: a
/// strongly negative sample mirrors the instance.
pub fn instance_transform(
    position: Vec3,
    normal: Vec3,
    tangent: Vec3,
    params: &ClonerParams,
) -> InstanceTransform {
    let n = normal.normalize();
    let t = tangent.normalize();

    let sn = snoise_grad(position * params.noise_frequency + Vec3::from(params.noise_offset));
    let s = params.base_scale + params.scale_noise * sn.w;

    let ay = t.lerp(n, params.normal_modifier).normalize();
    let mut ax = n.cross(t);
    if ax.length_squared() < 1e-8 {
        // Degenerate input (normal parallel to tangent): pick any
        // direction perpendicular to the up axis.
        ax = if ay.x.abs() > 0.99 { Vec3::Z } else { Vec3::X };
        ax -= ay * ax.dot(ay);
    }
    let ax = ax.normalize();
    let az = ax.cross(ay);

    InstanceTransform {
        rows: [
            [ax.x * s, ay.x * s, az.x * s, position.x],
            [ax.y * s, ay.y * s, az.y * s, position.y],
            [ax.z * s, ay.z * s, az.z * s, position.z],
        ],
    }
}

/// Attribute values the kernel sees for slots past the true point
/// count when the source is empty (the buffer factories pad a single
/// benign element so zero-length sources stay bindable).
pub const PAD_POSITION: Vec3 = Vec3::ZERO;
pub const PAD_NORMAL: Vec3 = Vec3::Y;
pub const PAD_TANGENT: Vec3 = Vec3::X;

/// Full-dispatch mirror: one transform per instance slot, with the same
/// clamp-to-last-point behavior the kernel uses for slots beyond the
/// true point count.
pub fn generate_transforms(
    positions: &[Vec3],
    normals: &[Vec3],
    tangents: &[Vec3],
    params: &ClonerParams,
) -> Vec<InstanceTransform> {
    let mut out = Vec::with_capacity(params.instance_count as usize);
    for id in 0..params.instance_count as usize {
        let (p, n, t) = if positions.is_empty() {
            (PAD_POSITION, PAD_NORMAL, PAD_TANGENT)
        } else {
            let src = id.min(positions.len() - 1);
            (positions[src], normals[src], tangents[src])
        };
        out.push(instance_transform(p, n, t, params));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(point_count: u32) -> ClonerParams {
        ClonerParams {
            instance_count: instance_count(point_count),
            base_scale: 0.05,
            scale_noise: 0.1,
            noise_frequency: 1.0,
            noise_offset: [0.0; 3],
            normal_modifier: 0.125,
        }
    }

    #[test]
    fn test_instance_count_formula() {
        // Floor-based formula, not round-up
        assert_eq!(instance_count(10), 64);
        assert_eq!(instance_count(200), 192);
        assert_eq!(instance_count(0), 64);
        assert_eq!(instance_count(1), 64);
        assert_eq!(instance_count(64), 64);
        assert_eq!(instance_count(65), 64);
        assert_eq!(instance_count(128), 128);
        assert_eq!(thread_group_count(0), 1);
        assert_eq!(thread_group_count(200), 3);
    }

    #[test]
    fn test_instance_count_is_group_multiple() {
        for pc in [0u32, 1, 63, 64, 100, 1000, 4096, 100_000] {
            assert_eq!(instance_count(pc) % THREAD_GROUP_SIZE, 0);
            assert!(instance_count(pc) >= THREAD_GROUP_SIZE);
        }
    }

    #[test]
    fn test_params_layout() {
        // Must match the WGSL ClonerParams struct exactly
        assert_eq!(std::mem::size_of::<ClonerParams>(), 32);
        assert_eq!(std::mem::offset_of!(ClonerParams, noise_offset), 16);
        assert_eq!(std::mem::offset_of!(ClonerParams, normal_modifier), 28);
    }

    #[test]
    fn test_transform_size() {
        // 3 * 4 floats, matching the ComputeBuffer stride
        assert_eq!(std::mem::size_of::<InstanceTransform>(), 48);
    }

    #[test]
    fn test_zero_scale_noise_gives_base_scale() {
        let mut p = params(64);
        p.scale_noise = 0.0;
        p.noise_offset = [12.5, -3.0, 88.0]; // must not matter
        let m = instance_transform(Vec3::new(1.0, 2.0, 3.0), Vec3::Y, Vec3::X, &p);
        for i in 0..3 {
            let len = m.basis_column(i).length();
            assert!((len - p.base_scale).abs() < 1e-5, "column {} length {}", i, len);
        }
    }

    #[test]
    fn test_translation_is_point_position() {
        let p = params(64);
        let pos = Vec3::new(-4.0, 0.5, 9.0);
        let m = instance_transform(pos, Vec3::Y, Vec3::X, &p);
        assert!((m.translation() - pos).length() < 1e-6);
        // Origin of the template lands on the point
        assert!((m.apply(Vec3::ZERO) - pos).length() < 1e-6);
    }

    #[test]
    fn test_orientation_blend_convention() {
        let n = Vec3::Y;
        let t = Vec3::X;
        let pos = Vec3::new(0.3, 0.1, -0.7);

        // modifier 0: up axis (column 1) is the tangent
        let mut p = params(64);
        p.normal_modifier = 0.0;
        p.scale_noise = 0.0;
        p.base_scale = 1.0;
        let m0 = instance_transform(pos, n, t, &p);
        assert!((m0.basis_column(1) - t).length() < 1e-5);

        // modifier 1: up axis is the normal
        p.normal_modifier = 1.0;
        let m1 = instance_transform(pos, n, t, &p);
        assert!((m1.basis_column(1) - n).length() < 1e-5);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let p = ClonerParams {
            base_scale: 1.0,
            scale_noise: 0.0,
            ..params(64)
        };
        let n = Vec3::new(0.3, 0.8, -0.1).normalize();
        let t = n.cross(Vec3::Z).normalize();
        let m = instance_transform(Vec3::new(1.0, -2.0, 0.5), n, t, &p);
        let (ax, ay, az) = (m.basis_column(0), m.basis_column(1), m.basis_column(2));
        assert!((ax.length() - 1.0).abs() < 1e-5);
        assert!((ay.length() - 1.0).abs() < 1e-5);
        assert!((az.length() - 1.0).abs() < 1e-5);
        assert!(ax.dot(ay).abs() < 1e-5);
        assert!(ay.dot(az).abs() < 1e-5);
        assert!(az.dot(ax).abs() < 1e-5);
    }

    #[test]
    fn test_negative_scale_preserved() {
        // Documented behavior: effective scale is unclamped
        let mut p = params(64);
        p.base_scale = -2.0;
        p.scale_noise = 0.0;
        p.normal_modifier = 0.0;
        let m = instance_transform(Vec3::ZERO, Vec3::Y, Vec3::X, &p);
        // Up column points opposite the tangent, scaled by |s|
        assert!((m.basis_column(1) + Vec3::X * 2.0).length() < 1e-5);
    }

    #[test]
    fn test_per_instance_independence() {
        // Permuting the source points permutes the outputs identically
        let p = params(128);
        let positions: Vec<Vec3> = (0..128)
            .map(|i| Vec3::new(i as f32 * 0.1, (i % 7) as f32, -(i as f32) * 0.05))
            .collect();
        let normals: Vec<Vec3> = positions.iter().map(|v| (*v + Vec3::Y).normalize()).collect();
        let tangents: Vec<Vec3> = normals
            .iter()
            .map(|n| n.cross(Vec3::Z).try_normalize().unwrap_or(Vec3::X))
            .collect();

        let forward = generate_transforms(&positions, &normals, &tangents, &p);

        let rev = |v: &[Vec3]| v.iter().rev().copied().collect::<Vec<_>>();
        let backward = generate_transforms(&rev(&positions), &rev(&normals), &rev(&tangents), &p);

        for i in 0..128 {
            assert_eq!(forward[i], backward[127 - i], "instance {} leaked state", i);
        }
    }

    #[test]
    fn test_noise_offset_step() {
        let motion = Vec3::new(0.0, 0.25, 0.0);
        let mut offset = Vec3::ZERO;

        // Monotonically non-decreasing along the motion direction
        let mut prev = offset.dot(motion.normalize());
        for _ in 0..10 {
            offset = step_noise_offset(offset, motion, 1.0 / 60.0, true);
            let along = offset.dot(motion.normalize());
            assert!(along >= prev);
            prev = along;
        }

        // Frozen while not simulating
        let held = step_noise_offset(offset, motion, 1.0 / 60.0, false);
        assert_eq!(held, offset);
    }

    #[test]
    fn test_generate_transforms_pads_short_sources() {
        // 10 points still produce 64 slots; the tail clamps to point 9
        let p = params(10);
        let positions: Vec<Vec3> = (0..10).map(|i| Vec3::splat(i as f32)).collect();
        let normals = vec![Vec3::Y; 10];
        let tangents = vec![Vec3::X; 10];
        let out = generate_transforms(&positions, &normals, &tangents, &p);
        assert_eq!(out.len(), 64);
        assert_eq!(out[63], out[9]);

        // Zero points: defined to use the benign pad attributes
        let p0 = params(0);
        let out0 = generate_transforms(&[], &[], &[], &p0);
        assert_eq!(out0.len(), 64);
        assert!((out0[0].translation() - PAD_POSITION).length() < 1e-6);
    }
}
