//! Point cloud source for the cloner.
//!
//! Holds three parallel per-point attribute sequences (position, normal,
//! tangent) plus an axis-aligned bounding volume, and creates the
//! GPU-resident attribute buffers the compute kernel samples. Index `i`
//! in each sequence refers to the same point.

use crate::transform::{PAD_NORMAL, PAD_POSITION, PAD_TANGENT};
use glam::Vec3;
use thiserror::Error;
use wgpu::util::DeviceExt;

#[derive(Error, Debug)]
pub enum PointCloudError {
    #[error("attribute lengths differ: {positions} positions, {normals} normals, {tangents} tangents")]
    AttributeLengthMismatch {
        positions: usize,
        normals: usize,
        tangents: usize,
    },
}

/// Axis-aligned bounding volume (center + half-size extents).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Bounds {
    /// Tight bounds over a point set. Empty input collapses to a zero
    /// volume at the origin.
    pub fn from_points(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self {
                center: Vec3::ZERO,
                extents: Vec3::ZERO,
            };
        }
        let mut min = points[0];
        let mut max = points[0];
        for p in &points[1..] {
            min = min.min(*p);
            max = max.max(*p);
        }
        Self {
            center: (min + max) * 0.5,
            extents: (max - min) * 0.5,
        }
    }

    /// Grow the volume by `amount` along each axis (total size, so the
    /// extents grow by half of it).
    pub fn expand(&mut self, amount: Vec3) {
        self.extents += amount * 0.5;
    }

    pub fn size(&self) -> Vec3 {
        self.extents * 2.0
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    pub fn contains(&self, p: Vec3) -> bool {
        let d = (p - self.center).abs();
        d.x <= self.extents.x && d.y <= self.extents.y && d.z <= self.extents.z
    }
}

/// CPU-side point cloud with GPU buffer factories.
pub struct PointCloud {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tangents: Vec<Vec3>,
    bounds: Bounds,
}

impl PointCloud {
    /// Build from parallel attribute arrays. All three must have the
    /// same length.
    pub fn from_attributes(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        tangents: Vec<Vec3>,
    ) -> Result<Self, PointCloudError> {
        if positions.len() != normals.len() || positions.len() != tangents.len() {
            return Err(PointCloudError::AttributeLengthMismatch {
                positions: positions.len(),
                normals: normals.len(),
                tangents: tangents.len(),
            });
        }
        let bounds = Bounds::from_points(&positions);
        Ok(Self {
            positions,
            normals,
            tangents,
            bounds,
        })
    }

    /// Deterministic Fibonacci-lattice scatter over a sphere surface.
    /// Normals point radially outward, tangents follow latitude lines.
    pub fn scatter_sphere(count: usize, radius: f32) -> Self {
        let golden = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
        let mut positions = Vec::with_capacity(count);
        let mut normals = Vec::with_capacity(count);
        let mut tangents = Vec::with_capacity(count);
        for i in 0..count {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden * i as f32;
            let n = Vec3::new(ring * theta.cos(), y, ring * theta.sin());
            positions.push(n * radius);
            normals.push(n);
            tangents.push(Vec3::Y.cross(n).try_normalize().unwrap_or(Vec3::X));
        }
        let bounds = Bounds::from_points(&positions);
        Self {
            positions,
            normals,
            tangents,
            bounds,
        }
    }

    pub fn point_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn tangents(&self) -> &[Vec3] {
        &self.tangents
    }

    pub fn create_position_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        Self::attribute_buffer(device, "Cloner Position Buffer", &self.positions, PAD_POSITION)
    }

    pub fn create_normal_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        Self::attribute_buffer(device, "Cloner Normal Buffer", &self.normals, PAD_NORMAL)
    }

    pub fn create_tangent_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        Self::attribute_buffer(device, "Cloner Tangent Buffer", &self.tangents, PAD_TANGENT)
    }

    /// Pack an attribute as vec4 (16-byte stride for WGSL storage
    /// arrays). Zero-length sources get a single benign pad element so
    /// the buffer stays bindable; the kernel clamps its reads.
    fn attribute_buffer(
        device: &wgpu::Device,
        label: &str,
        data: &[Vec3],
        pad: Vec3,
    ) -> wgpu::Buffer {
        let packed: Vec<[f32; 4]> = if data.is_empty() {
            vec![[pad.x, pad.y, pad.z, 0.0]]
        } else {
            data.iter().map(|v| [v.x, v.y, v.z, 0.0]).collect()
        };
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&packed),
            usage: wgpu::BufferUsages::STORAGE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_length_mismatch_rejected() {
        let result = PointCloud::from_attributes(
            vec![Vec3::ZERO; 4],
            vec![Vec3::Y; 4],
            vec![Vec3::X; 3],
        );
        assert!(matches!(
            result,
            Err(PointCloudError::AttributeLengthMismatch { tangents: 3, .. })
        ));
    }

    #[test]
    fn test_scatter_sphere_attributes() {
        let cloud = PointCloud::scatter_sphere(256, 2.0);
        assert_eq!(cloud.point_count(), 256);
        for i in 0..256 {
            let p = cloud.positions()[i];
            let n = cloud.normals()[i];
            let t = cloud.tangents()[i];
            assert!((p.length() - 2.0).abs() < 1e-4, "point {} off the sphere", i);
            assert!((n.length() - 1.0).abs() < 1e-4);
            assert!((t.length() - 1.0).abs() < 1e-4);
            assert!(n.dot(t).abs() < 1e-3, "tangent {} not perpendicular", i);
        }
    }

    #[test]
    fn test_bounds_contain_all_points() {
        let cloud = PointCloud::scatter_sphere(100, 1.5);
        let b = cloud.bounds();
        for p in cloud.positions() {
            assert!(b.contains(*p));
        }
    }

    #[test]
    fn test_bounds_expand_grows_size_by_amount() {
        let mut b = Bounds {
            center: Vec3::new(1.0, 2.0, 3.0),
            extents: Vec3::new(2.0, 4.0, 8.0),
        };
        let before = b.size();
        b.expand(b.extents * 0.25);
        // Size grows by the amount; extents by half of it
        assert!((b.size() - (before + before * 0.125)).length() < 1e-6);
        assert_eq!(b.center, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_empty_bounds() {
        let b = Bounds::from_points(&[]);
        assert_eq!(b.center, Vec3::ZERO);
        assert_eq!(b.extents, Vec3::ZERO);
    }
}
