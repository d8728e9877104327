//! Grid geometry and the uniform block shared with the compute shader.

use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};

use crate::sdf::Sphere;
use crate::surface::mesher::Mesher;

/// Invocations per workgroup along x, matching `@workgroup_size(64, 1, 1)`.
pub const WORKGROUP_SIZE: u32 = 64;

/// A regular grid of `resolution` cells spanning an axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    /// Cell counts along x, y, z.
    pub resolution: UVec3,
    /// World-space minimum corner of cell (0, 0, 0).
    pub bounds_min: Vec3,
    /// World-space maximum corner of the last cell.
    pub bounds_max: Vec3,
}

impl GridLayout {
    /// Grid over an explicit box.
    #[must_use]
    pub const fn new(resolution: UVec3, bounds_min: Vec3, bounds_max: Vec3) -> Self {
        Self {
            resolution,
            bounds_min,
            bounds_max,
        }
    }

    /// Cube grid enclosing `sphere`, padded by `margin` times its radius.
    #[must_use]
    pub fn around_sphere(resolution: UVec3, sphere: &Sphere, margin: f32) -> Self {
        let half = Vec3::splat(sphere.radius * (1.0 + margin));
        Self::new(resolution, sphere.center - half, sphere.center + half)
    }

    /// World-space extent of one cell.
    #[must_use]
    pub fn cell_size(&self) -> Vec3 {
        (self.bounds_max - self.bounds_min) / self.resolution.as_vec3()
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        u64::from(self.resolution.x)
            * u64::from(self.resolution.y)
            * u64::from(self.resolution.z)
    }

    /// Whether `cell` is inside the grid. Over-dispatched invocations fail
    /// this test and must do nothing.
    #[must_use]
    pub fn contains(&self, cell: UVec3) -> bool {
        cell.cmplt(self.resolution).all()
    }

    /// World position of corner `corner` (0..8) of `cell`; bit 0 is +x,
    /// bit 1 is +y, bit 2 is +z.
    #[must_use]
    pub fn corner_position(&self, cell: UVec3, corner: usize) -> Vec3 {
        let c = corner as u32;
        let offset = UVec3::new(c & 1, (c >> 1) & 1, (c >> 2) & 1);
        self.bounds_min + (cell + offset).as_vec3() * self.cell_size()
    }

    /// World position of the center of `cell`.
    #[must_use]
    pub fn cell_center(&self, cell: UVec3) -> Vec3 {
        self.bounds_min + (cell.as_vec3() + Vec3::splat(0.5)) * self.cell_size()
    }

    /// Finite-difference half-width used for normals: 1% of the smallest
    /// cell extent.
    #[must_use]
    pub fn gradient_step(&self) -> f32 {
        0.01 * self.cell_size().min_element()
    }

    /// Workgroup counts for the update dispatch.
    #[must_use]
    pub fn update_workgroups(&self) -> [u32; 3] {
        [
            self.resolution.x.div_ceil(WORKGROUP_SIZE),
            self.resolution.y,
            self.resolution.z,
        ]
    }
}

/// Uniform block read by both compute entry points (80 bytes).
///
/// Field order follows WGSL uniform layout: every `vec3` is followed by a
/// scalar that fills its 16-byte slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SurfaceParams {
    /// Sphere center.
    pub center: [f32; 3],
    /// Sphere radius.
    pub radius: f32,
    /// Grid minimum corner.
    pub bounds_min: [f32; 3],
    /// [`crate::surface::mesher::MeshingStrategy::shader_id`].
    pub strategy: u32,
    /// Grid maximum corner.
    pub bounds_max: [f32; 3],
    /// [`crate::surface::mesher::Shading::shader_id`].
    pub color_mode: u32,
    /// Cell counts along x, y, z.
    pub resolution: [u32; 3],
    _pad: u32,
    /// Color used by constant shading.
    pub color: [f32; 4],
}

const _: () = assert!(size_of::<SurfaceParams>() == 80);

impl SurfaceParams {
    /// Pack the grid, sphere, and meshing choices into the uniform layout.
    #[must_use]
    pub fn new(layout: &GridLayout, sphere: &Sphere, mesher: &Mesher) -> Self {
        Self {
            center: sphere.center.to_array(),
            radius: sphere.radius,
            bounds_min: layout.bounds_min.to_array(),
            strategy: mesher.strategy.shader_id(),
            bounds_max: layout.bounds_max.to_array(),
            color_mode: mesher.shading.shader_id(),
            resolution: layout.resolution.to_array(),
            _pad: 0,
            color: mesher.shading.constant_color().to_array(),
        }
    }
}
