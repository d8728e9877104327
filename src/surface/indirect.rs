//! Indirect draw arguments and their per-frame lifecycle.
//!
//! The argument record is written only by the GPU: `init` resets it, then
//! `update` grows `vertex_count` with atomic adds. The host never writes it
//! during normal operation, it only orders the two passes and issues
//! `draw_indirect` afterwards.

use bytemuck::{Pod, Zeroable};

use crate::error::SdfGenError;

/// Arguments consumed by `draw_indirect`, bit-compatible with
/// `wgpu::util::DrawIndirectArgs` (four `u32`, 16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    /// Number of vertices to draw; the append counter.
    pub vertex_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// First vertex to draw.
    pub first_vertex: u32,
    /// First instance to draw.
    pub first_instance: u32,
}

const _: () = assert!(size_of::<DrawIndirectArgs>() == 16);
const _: () = assert!(std::mem::offset_of!(DrawIndirectArgs, vertex_count) == 0);
const _: () = assert!(std::mem::offset_of!(DrawIndirectArgs, instance_count) == 4);
const _: () = assert!(std::mem::offset_of!(DrawIndirectArgs, first_vertex) == 8);
const _: () = assert!(std::mem::offset_of!(DrawIndirectArgs, first_instance) == 12);

impl DrawIndirectArgs {
    /// Size of the record in the args buffer.
    pub const SIZE: u64 = size_of::<Self>() as u64;

    /// State left by `init`: nothing appended, one instance.
    pub const INITIAL: Self = Self {
        vertex_count: 0,
        instance_count: 1,
        first_vertex: 0,
        first_instance: 0,
    };
}

/// Where the argument record is in its per-frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsState {
    /// Contents are unknown: never initialized, seeded by the host, or
    /// already consumed by an update.
    Uninitialized,
    /// `init` has run; `vertex_count` is 0 and an update may append.
    Ready,
}

/// Host-side bookkeeping that enforces `init` before every `update`.
///
/// Without the reset, `vertex_count` would carry over from the previous
/// frame and the draw would include stale vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    state: ArgsState,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Lifecycle of a freshly allocated args buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ArgsState::Uninitialized,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ArgsState {
        self.state
    }

    /// Record that `init` has been issued.
    pub fn on_init(&mut self) {
        self.state = ArgsState::Ready;
    }

    /// Record that an update is about to be issued.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::StaleArgs`] unless `init` has been issued
    /// since the previous update.
    pub fn begin_update(&mut self) -> Result<(), SdfGenError> {
        if self.state != ArgsState::Ready {
            return Err(SdfGenError::StaleArgs);
        }
        self.state = ArgsState::Uninitialized;
        Ok(())
    }

    /// Record that the host overwrote the args buffer.
    pub fn invalidate(&mut self) {
        self.state = ArgsState::Uninitialized;
    }
}
