//! Surface generation: grid layout, meshing, the append protocol, and the
//! indirect-draw lifecycle, with a GPU executor and a CPU reference.

/// Shared-memory append protocol used by the CPU reference.
pub mod append;
/// Multi-threaded reference executor of the init/update stages.
pub mod cpu;
/// GPU pipelines, buffers, and pass recording.
pub mod generator;
/// Indirect draw arguments and the init/update lifecycle.
pub mod indirect;
/// Per-cell surface extraction strategies.
pub mod mesher;
/// Grid geometry and the shader uniform block.
pub mod params;
/// Output vertex layout.
pub mod vertex;

use crate::error::SdfGenError;
use mesher::MeshingStrategy;
use params::GridLayout;

/// Most vertices one update pass can emit: every cell at its per-cell
/// maximum.
#[must_use]
pub fn worst_case_vertices(layout: &GridLayout, strategy: MeshingStrategy) -> u64 {
    layout.cell_count() * u64::from(strategy.max_vertices_per_cell())
}

/// Reject a vertex buffer that an update pass could overrun.
///
/// # Errors
///
/// Returns [`SdfGenError::CapacityTooSmall`] when `capacity` is below
/// [`worst_case_vertices`].
pub fn check_capacity(
    capacity: u64,
    layout: &GridLayout,
    strategy: MeshingStrategy,
) -> Result<(), SdfGenError> {
    let required = worst_case_vertices(layout, strategy);
    if capacity < required {
        return Err(SdfGenError::CapacityTooSmall { capacity, required });
    }
    Ok(())
}
