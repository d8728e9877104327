//! Reference executor for the init/update stages.
//!
//! Runs every invocation of the GPU dispatch, over-dispatched ones
//! included, on the rayon pool in no particular order. Invocations share
//! only the atomic args and the write-once vertex slots, so the append
//! protocol is exercised under real contention.

use glam::UVec3;
use rayon::prelude::*;

use crate::error::SdfGenError;
use crate::options::Options;
use crate::sdf::{SignedDistance, Sphere};
use crate::surface::append::{
    AppendError, AtomicDrawArgs, Reservation, ReservedRange, VertexSlots,
};
use crate::surface::check_capacity;
use crate::surface::indirect::{ArgsState, DrawIndirectArgs, Lifecycle};
use crate::surface::mesher::{CellSamples, Mesher};
use crate::surface::params::{GridLayout, WORKGROUP_SIZE};
use crate::surface::vertex::Vertex;

/// What one update pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Every range reserved, in no particular order.
    pub reservations: Vec<Reservation>,
    /// Cells whose corners disagreed on sign.
    pub active_cells: u32,
    /// Invocations outside the grid that returned immediately.
    pub guarded_invocations: u64,
}

enum Invocation {
    Guarded,
    Inactive,
    Emitted(Reservation),
}

/// CPU twin of [`crate::surface::generator::SurfaceGenerator`].
pub struct CpuSurfaceGenerator<F> {
    field: F,
    layout: GridLayout,
    mesher: Mesher,
    args: AtomicDrawArgs,
    slots: VertexSlots,
    lifecycle: Lifecycle,
}

impl CpuSurfaceGenerator<Sphere> {
    /// Reference executor for the sphere described by `options`.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Options::validate`] or
    /// [`Options::vertex_capacity`].
    pub fn from_options(options: &Options) -> Result<Self, SdfGenError> {
        options.validate()?;
        Self::new(
            options.sphere(),
            options.layout(),
            options.mesher(),
            options.vertex_capacity()?,
        )
    }
}

impl<F: SignedDistance + Sync> CpuSurfaceGenerator<F> {
    /// Executor over `field` with a vertex buffer of `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::CapacityTooSmall`] if an update could
    /// overrun the buffer.
    pub fn new(
        field: F,
        layout: GridLayout,
        mesher: Mesher,
        capacity: u32,
    ) -> Result<Self, SdfGenError> {
        check_capacity(u64::from(capacity), &layout, mesher.strategy)?;
        Ok(Self {
            field,
            layout,
            mesher,
            args: AtomicDrawArgs::default(),
            slots: VertexSlots::new(capacity),
            lifecycle: Lifecycle::new(),
        })
    }

    /// Overwrite the args, as a host upload would. An init is required
    /// before the next update.
    pub fn seed_args(&mut self, args: DrawIndirectArgs) {
        self.args.store(args);
        self.lifecycle.invalidate();
    }

    /// The init stage: one workgroup, only invocation 0 writes.
    pub fn init(&mut self) {
        self.slots.clear();
        let args = &self.args;
        (0..WORKGROUP_SIZE).into_par_iter().for_each(|id| {
            if id == 0 {
                args.reset();
            }
        });
        self.lifecycle.on_init();
    }

    /// The update stage over the full `(ceil(rx/64)*64, ry, rz)` dispatch.
    ///
    /// # Errors
    ///
    /// [`SdfGenError::StaleArgs`] without a preceding [`Self::init`];
    /// [`SdfGenError::Append`] if any invocation broke the append
    /// protocol.
    pub fn update(&mut self) -> Result<UpdateReport, SdfGenError> {
        self.lifecycle.begin_update()?;

        let [wx, wy, wz] = self.layout.update_workgroups();
        let dim_x = (wx * WORKGROUP_SIZE) as usize;
        let dim_y = wy as usize;
        let dim_z = wz as usize;

        let outcomes = (0..dim_x * dim_y * dim_z)
            .into_par_iter()
            .map(|i| {
                let id = UVec3::new(
                    (i % dim_x) as u32,
                    ((i / dim_x) % dim_y) as u32,
                    (i / (dim_x * dim_y)) as u32,
                );
                self.invoke_update(id)
            })
            .collect::<Result<Vec<_>, AppendError>>()?;

        let mut report = UpdateReport::default();
        for outcome in outcomes {
            match outcome {
                Invocation::Guarded => report.guarded_invocations += 1,
                Invocation::Inactive => {}
                Invocation::Emitted(reservation) => {
                    report.active_cells += 1;
                    report.reservations.push(reservation);
                }
            }
        }

        log::debug!(
            "cpu update: {} active cells, {} vertices, {} guarded invocations",
            report.active_cells,
            self.args.snapshot().vertex_count,
            report.guarded_invocations
        );
        Ok(report)
    }

    /// Init followed by update.
    ///
    /// # Errors
    ///
    /// See [`Self::update`].
    pub fn run(&mut self) -> Result<UpdateReport, SdfGenError> {
        self.init();
        self.update()
    }

    fn invoke_update(&self, id: UVec3) -> Result<Invocation, AppendError> {
        if !self.layout.contains(id) {
            return Ok(Invocation::Guarded);
        }
        let samples = CellSamples::sample(&self.field, &self.layout, id);
        let count = self.mesher.vertex_count(&samples);
        let Some(reservation) = self.args.reserve(count) else {
            return Ok(Invocation::Inactive);
        };

        let mut range = ReservedRange::new(&self.slots, reservation)?;
        self.mesher.emit(
            &self.field,
            &self.layout,
            id,
            &samples,
            &mut |vertex| range.push(vertex),
        )?;
        range.finish().map(Invocation::Emitted)
    }

    /// Current indirect args.
    #[must_use]
    pub fn args(&self) -> DrawIndirectArgs {
        self.args.snapshot()
    }

    /// The `vertex_count` vertices of the last update, gap-checked.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::Append`] if a slot below `vertex_count` was
    /// never written, e.g. after seeding garbage args.
    pub fn vertices(&self) -> Result<Vec<Vertex>, SdfGenError> {
        Ok(self.slots.collect(self.args.snapshot().vertex_count)?)
    }

    /// Lifecycle state of the args.
    #[must_use]
    pub fn state(&self) -> ArgsState {
        self.lifecycle.state()
    }

    /// Vertex buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.slots.capacity()
    }

    /// Grid being sampled.
    #[must_use]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::Subtraction;
    use crate::surface::mesher::{MeshingStrategy, Shading};
    use crate::surface::worst_case_vertices;
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const STRATEGIES: [MeshingStrategy; 2] =
        [MeshingStrategy::Splat, MeshingStrategy::MarchingTetrahedra];

    fn mesher(strategy: MeshingStrategy) -> Mesher {
        Mesher {
            strategy,
            shading: Shading::Normal,
        }
    }

    fn generator<F: SignedDistance + Sync>(
        field: F,
        layout: GridLayout,
        strategy: MeshingStrategy,
    ) -> CpuSurfaceGenerator<F> {
        let capacity = worst_case_vertices(&layout, strategy) as u32;
        CpuSurfaceGenerator::new(field, layout, mesher(strategy), capacity)
            .unwrap()
    }

    fn sorted_positions(vertices: &[Vertex]) -> Vec<[u32; 3]> {
        let mut keys: Vec<[u32; 3]> = vertices
            .iter()
            .map(|v| v.position.map(f32::to_bits))
            .collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn single_cell_outside_sphere_emits_nothing() {
        let sphere = Sphere::new(Vec3::splat(5.0), 1.0);
        let layout = GridLayout::new(UVec3::ONE, Vec3::ZERO, Vec3::ONE);
        for strategy in STRATEGIES {
            let mut cpu = generator(sphere, layout, strategy);
            let report = cpu.run().unwrap();
            assert_eq!(cpu.args(), DrawIndirectArgs::INITIAL);
            assert!(report.reservations.is_empty());
            assert_eq!(report.active_cells, 0);
            assert_eq!(report.guarded_invocations, 63);
            assert!(cpu.vertices().unwrap().is_empty());
        }
    }

    #[test]
    fn centered_sphere_on_8_cube() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let layout =
            GridLayout::new(UVec3::splat(8), Vec3::splat(-1.5), Vec3::splat(1.5));
        for strategy in STRATEGIES {
            let mut cpu = generator(sphere, layout, strategy);
            let report = cpu.run().unwrap();
            let args = cpu.args();
            assert!(args.vertex_count > 0);
            assert!(args.vertex_count <= 512 * strategy.max_vertices_per_cell());
            assert_eq!(args.instance_count, 1);
            assert_eq!(args.first_vertex, 0);
            assert_eq!(args.first_instance, 0);
            assert_eq!(cpu.vertices().unwrap().len(), args.vertex_count as usize);
            assert!(report.active_cells > 0);
            assert_eq!(report.guarded_invocations, (64 - 8) * 64);
        }
    }

    #[test]
    fn count_matches_sequential_sum() {
        let sphere = Sphere::new(Vec3::new(0.1, -0.2, 0.05), 0.9);
        let layout =
            GridLayout::new(UVec3::new(9, 7, 11), Vec3::splat(-1.2), Vec3::splat(1.2));
        for strategy in STRATEGIES {
            let mut cpu = generator(sphere, layout, strategy);
            let _ = cpu.run().unwrap();
            let mesher = mesher(strategy);
            let mut expected = 0;
            for z in 0..11 {
                for y in 0..7 {
                    for x in 0..9 {
                        let samples = CellSamples::sample(
                            &sphere,
                            &layout,
                            UVec3::new(x, y, z),
                        );
                        expected += mesher.vertex_count(&samples);
                    }
                }
            }
            assert_eq!(cpu.args().vertex_count, expected);
        }
    }

    #[test]
    fn init_is_idempotent() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let layout = GridLayout::around_sphere(UVec3::splat(4), &sphere, 0.25);
        let mut cpu = generator(sphere, layout, MeshingStrategy::Splat);
        cpu.init();
        cpu.init();
        assert_eq!(cpu.args(), DrawIndirectArgs::INITIAL);
        assert_eq!(cpu.state(), ArgsState::Ready);
    }

    #[test]
    fn init_clears_garbage_args() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let layout = GridLayout::around_sphere(UVec3::splat(4), &sphere, 0.25);
        let mut cpu = generator(sphere, layout, MeshingStrategy::Splat);
        cpu.seed_args(DrawIndirectArgs {
            vertex_count: 12345,
            instance_count: 0,
            first_vertex: 99,
            first_instance: 7,
        });
        assert_eq!(cpu.state(), ArgsState::Uninitialized);
        assert!(matches!(cpu.update(), Err(SdfGenError::StaleArgs)));

        cpu.init();
        assert_eq!(cpu.args(), DrawIndirectArgs::INITIAL);
    }

    #[test]
    fn repeated_update_without_init_is_rejected() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let layout = GridLayout::around_sphere(UVec3::splat(4), &sphere, 0.25);
        let mut cpu = generator(sphere, layout, MeshingStrategy::Splat);
        let first = cpu.run().unwrap();
        let count = cpu.args().vertex_count;
        assert!(matches!(cpu.update(), Err(SdfGenError::StaleArgs)));
        assert_eq!(cpu.args().vertex_count, count);

        // A fresh frame reproduces the same totals.
        let second = cpu.run().unwrap();
        assert_eq!(cpu.args().vertex_count, count);
        assert_eq!(first.active_cells, second.active_cells);
    }

    #[test]
    fn vertex_set_is_deterministic() {
        let sphere = Sphere::new(Vec3::new(0.3, 0.0, -0.1), 0.8);
        let layout = GridLayout::around_sphere(UVec3::new(10, 12, 9), &sphere, 0.2);
        for strategy in STRATEGIES {
            let mut cpu = generator(sphere, layout, strategy);
            let _ = cpu.run().unwrap();
            let first = sorted_positions(&cpu.vertices().unwrap());
            let _ = cpu.run().unwrap();
            let second = sorted_positions(&cpu.vertices().unwrap());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn undersized_buffer_is_rejected() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let layout = GridLayout::around_sphere(UVec3::splat(2), &sphere, 0.0);
        let result = CpuSurfaceGenerator::new(
            sphere,
            layout,
            mesher(MeshingStrategy::MarchingTetrahedra),
            8 * 36 - 1,
        );
        assert!(matches!(
            result,
            Err(SdfGenError::CapacityTooSmall {
                capacity: 287,
                required: 288
            })
        ));
    }

    #[test]
    fn compound_fields_use_the_same_protocol() {
        let outer = Sphere::new(Vec3::ZERO, 1.0);
        let bite = Sphere::new(Vec3::new(0.8, 0.0, 0.0), 0.5);
        let layout = GridLayout::around_sphere(UVec3::splat(12), &outer, 0.2);
        let mut cpu = generator(
            Subtraction(outer, bite),
            layout,
            MeshingStrategy::MarchingTetrahedra,
        );
        let report = cpu.run().unwrap();
        let total: u32 = report.reservations.iter().map(|r| r.len).sum();
        assert_eq!(total, cpu.args().vertex_count);
        assert_eq!(cpu.vertices().unwrap().len(), total as usize);
    }

    #[test]
    fn random_grids_respect_bound_overlap_and_completeness() {
        let mut rng = StdRng::seed_from_u64(0x5df6_e11);
        for _ in 0..24 {
            let resolution = UVec3::new(
                rng.random_range(1..=12),
                rng.random_range(1..=12),
                rng.random_range(1..=12),
            );
            let sphere = Sphere::new(
                Vec3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                ),
                rng.random_range(0.05..1.5),
            );
            let layout = GridLayout::new(
                resolution,
                Vec3::splat(-1.0),
                Vec3::splat(1.0),
            );
            for strategy in STRATEGIES {
                let mut cpu = generator(sphere, layout, strategy);
                let report = cpu.run().unwrap();
                let count = cpu.args().vertex_count;

                assert!(u64::from(count) <= worst_case_vertices(&layout, strategy));

                let mut ranges = report.reservations.clone();
                ranges.sort_by_key(|r| r.base);
                let mut next = 0u64;
                for r in &ranges {
                    assert_eq!(u64::from(r.base), next, "gap or overlap");
                    next = r.end();
                }
                assert_eq!(next, u64::from(count));
                assert_eq!(cpu.vertices().unwrap().len(), count as usize);
            }
        }
    }
}
