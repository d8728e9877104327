//! Per-cell surface extraction, shared by the reference executor and
//! mirrored line for line by `surface_gen.wgsl`.
//!
//! A cell is active when its eight corners disagree on sign. Each active
//! cell reports its exact vertex count up front (one atomic reservation),
//! then writes exactly that many vertices.

use glam::{UVec3, Vec3, Vec4};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::sdf::SignedDistance;
use crate::surface::params::GridLayout;
use crate::surface::vertex::Vertex;

/// How an active cell turns into triangles.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MeshingStrategy {
    /// One camera-independent quad (two triangles) per active cell,
    /// projected onto the surface and oriented by the normal.
    #[default]
    Splat,
    /// Six tetrahedra per cell, each contributing 0, 1, or 2 triangles.
    /// Produces a continuous surface.
    MarchingTetrahedra,
}

impl MeshingStrategy {
    /// Upper bound on vertices a single cell can emit.
    #[must_use]
    pub const fn max_vertices_per_cell(self) -> u32 {
        match self {
            Self::Splat => SPLAT_VERTICES,
            Self::MarchingTetrahedra => 6 * 2 * 3,
        }
    }

    /// Value of `SurfaceParams::strategy`.
    #[must_use]
    pub const fn shader_id(self) -> u32 {
        match self {
            Self::Splat => 0,
            Self::MarchingTetrahedra => 1,
        }
    }
}

/// Vertex color source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Shading {
    /// Normal mapped to RGB (`n * 0.5 + 0.5`).
    #[default]
    Normal,
    /// A fixed color.
    Constant(Vec4),
}

impl Shading {
    /// Value of `SurfaceParams::color_mode`.
    #[must_use]
    pub const fn shader_id(self) -> u32 {
        match self {
            Self::Normal => 0,
            Self::Constant(_) => 1,
        }
    }

    /// Value of `SurfaceParams::color`; white when shading by normal.
    #[must_use]
    pub const fn constant_color(self) -> Vec4 {
        match self {
            Self::Normal => Vec4::ONE,
            Self::Constant(color) => color,
        }
    }

    fn shade(self, normal: Vec3) -> Vec4 {
        match self {
            Self::Normal => (normal * 0.5 + Vec3::splat(0.5)).extend(1.0),
            Self::Constant(color) => color,
        }
    }
}

const SPLAT_VERTICES: u32 = 6;

/// Kuhn split of the cube along the 0-7 diagonal.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 3, 2, 7],
    [0, 2, 6, 7],
    [0, 6, 4, 7],
    [0, 4, 5, 7],
    [0, 5, 1, 7],
];

/// Field values at the eight corners of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSamples {
    /// Corner positions, indexed by bit 0 = +x, bit 1 = +y, bit 2 = +z.
    pub positions: [Vec3; 8],
    /// Signed distance at each corner.
    pub distances: [f32; 8],
}

impl CellSamples {
    /// Evaluate `field` at the corners of `cell`.
    #[must_use]
    pub fn sample<F: SignedDistance + ?Sized>(
        field: &F,
        layout: &GridLayout,
        cell: UVec3,
    ) -> Self {
        let positions: [Vec3; 8] =
            std::array::from_fn(|i| layout.corner_position(cell, i));
        let distances = positions.map(|p| field.distance(p));
        Self {
            positions,
            distances,
        }
    }

    /// Number of corners strictly inside the surface (`d < 0`).
    #[must_use]
    pub fn inside_count(&self) -> u32 {
        self.distances.iter().filter(|d| **d < 0.0).count() as u32
    }

    /// Whether the surface passes through this cell. A corner exactly on
    /// the surface counts as outside.
    #[must_use]
    pub fn crosses_surface(&self) -> bool {
        let inside = self.inside_count();
        inside != 0 && inside != 8
    }

    fn tetra_mask(&self, t: [usize; 4]) -> u32 {
        t.iter()
            .enumerate()
            .filter(|(_, &corner)| self.distances[corner] < 0.0)
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    fn edge_point(&self, a: usize, b: usize) -> Vec3 {
        let da = self.distances[a];
        let db = self.distances[b];
        self.positions[a].lerp(self.positions[b], da / (da - db))
    }
}

fn tetra_triangles(mask: u32) -> u32 {
    match mask.count_ones() {
        0 | 4 => 0,
        2 => 2,
        _ => 1,
    }
}

/// Strategy plus shading: everything needed to turn a cell into vertices.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mesher {
    /// Triangle topology.
    pub strategy: MeshingStrategy,
    /// Vertex colors.
    pub shading: Shading,
}

impl Mesher {
    /// Exact number of vertices [`Mesher::emit`] will produce for a cell.
    /// Zero for inactive cells.
    #[must_use]
    pub fn vertex_count(&self, samples: &CellSamples) -> u32 {
        if !samples.crosses_surface() {
            return 0;
        }
        match self.strategy {
            MeshingStrategy::Splat => SPLAT_VERTICES,
            MeshingStrategy::MarchingTetrahedra => TETRAHEDRA
                .iter()
                .map(|&t| 3 * tetra_triangles(samples.tetra_mask(t)))
                .sum(),
        }
    }

    /// Emit the vertices of an active cell, in order, through `out`.
    ///
    /// Emits exactly [`Mesher::vertex_count`] vertices and stops at the
    /// first error returned by `out`.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `out`.
    pub fn emit<F, E>(
        &self,
        field: &F,
        layout: &GridLayout,
        cell: UVec3,
        samples: &CellSamples,
        out: &mut impl FnMut(Vertex) -> Result<(), E>,
    ) -> Result<(), E>
    where
        F: SignedDistance + ?Sized,
    {
        if !samples.crosses_surface() {
            return Ok(());
        }
        let emitter = Emitter {
            field,
            step: layout.gradient_step(),
            shading: self.shading,
        };
        match self.strategy {
            MeshingStrategy::Splat => emitter.splat(layout, cell, out),
            MeshingStrategy::MarchingTetrahedra => {
                for t in TETRAHEDRA {
                    emitter.tetrahedron(samples, t, out)?;
                }
                Ok(())
            }
        }
    }
}

struct Emitter<'a, F: ?Sized> {
    field: &'a F,
    step: f32,
    shading: Shading,
}

impl<F: SignedDistance + ?Sized> Emitter<'_, F> {
    fn normal(&self, p: Vec3) -> Vec3 {
        self.field.normal(p, self.step)
    }

    fn vertex(&self, p: Vec3) -> Vertex {
        let n = self.normal(p);
        Vertex::new(p, n, self.shading.shade(n))
    }

    /// Writes one triangle wound counter-clockwise when viewed from outside.
    fn triangle<E>(
        &self,
        p0: Vec3,
        p1: Vec3,
        p2: Vec3,
        out: &mut impl FnMut(Vertex) -> Result<(), E>,
    ) -> Result<(), E> {
        let face = (p1 - p0).cross(p2 - p0);
        let outward = self.normal((p0 + p1 + p2) / 3.0);
        let (b, c) = if face.dot(outward) < 0.0 {
            (p2, p1)
        } else {
            (p1, p2)
        };
        out(self.vertex(p0))?;
        out(self.vertex(b))?;
        out(self.vertex(c))
    }

    fn tetrahedron<E>(
        &self,
        samples: &CellSamples,
        t: [usize; 4],
        out: &mut impl FnMut(Vertex) -> Result<(), E>,
    ) -> Result<(), E> {
        let mask = samples.tetra_mask(t);
        let inside = mask.count_ones();
        if inside == 0 || inside == 4 {
            return Ok(());
        }

        if inside == 2 {
            let outside_mask = !mask & 0xf;
            let p = mask.trailing_zeros() as usize;
            let q = (mask & !(1 << p)).trailing_zeros() as usize;
            let r = outside_mask.trailing_zeros() as usize;
            let s = (outside_mask & !(1 << r)).trailing_zeros() as usize;
            let pr = samples.edge_point(t[p], t[r]);
            let ps = samples.edge_point(t[p], t[s]);
            let qs = samples.edge_point(t[q], t[s]);
            let qr = samples.edge_point(t[q], t[r]);
            self.triangle(pr, ps, qs, out)?;
            return self.triangle(pr, qs, qr, out);
        }

        // One corner differs from the other three.
        let lone_mask = if inside == 3 { !mask & 0xf } else { mask };
        let l = lone_mask.trailing_zeros() as usize;
        self.triangle(
            samples.edge_point(t[l], t[(l + 1) % 4]),
            samples.edge_point(t[l], t[(l + 2) % 4]),
            samples.edge_point(t[l], t[(l + 3) % 4]),
            out,
        )
    }

    fn splat<E>(
        &self,
        layout: &GridLayout,
        cell: UVec3,
        out: &mut impl FnMut(Vertex) -> Result<(), E>,
    ) -> Result<(), E> {
        let center = layout.cell_center(cell);
        let n = self.normal(center);
        let p = center - n * self.field.distance(center);
        let helper = if n.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
        let half_size = 0.5 * layout.cell_size().max_element();
        let t = n.cross(helper).normalize() * half_size;
        let b = n.cross(t.normalize()) * half_size;
        let color = self.shading.shade(n);

        let corners = [p - t - b, p + t - b, p + t + b, p - t + b];
        for i in [0, 1, 2, 0, 2, 3] {
            out(Vertex::new(corners[i], n, color))?;
        }
        Ok(())
    }
}
