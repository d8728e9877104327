//! Crate-level error types.

use std::fmt;

use crate::gpu::gpu_context::GpuContextError;
use crate::surface::append::AppendError;

/// Errors produced by the sdfgen crate.
#[derive(Debug)]
pub enum SdfGenError {
    /// GPU context initialization failure.
    Gpu(GpuContextError),
    /// A WGSL module failed to register or compose.
    ShaderCompose(String),
    /// Options failed validation.
    InvalidOptions(String),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// The vertex buffer cannot hold the worst-case emission.
    CapacityTooSmall {
        /// Configured capacity in vertices.
        capacity: u64,
        /// Worst-case vertex count for the grid and meshing strategy.
        required: u64,
    },
    /// The vertex buffer exceeds a device buffer limit.
    CapacityExceedsDevice {
        /// Requested buffer size in bytes.
        bytes: u64,
        /// The device limit it exceeds.
        limit: u64,
    },
    /// The update dispatch exceeds the per-dimension workgroup limit.
    DispatchTooLarge {
        /// Workgroup counts along x, y, z.
        workgroups: [u32; 3],
        /// `max_compute_workgroups_per_dimension` of the device.
        limit: u32,
    },
    /// `update` was requested without a preceding `init`.
    StaleArgs,
    /// The reference executor observed a broken append invariant.
    Append(AppendError),
    /// Mapping a staging buffer failed.
    Readback(String),
    /// Generic I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for SdfGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::ShaderCompose(msg) => {
                write!(f, "shader composition error: {msg}")
            }
            Self::InvalidOptions(msg) => write!(f, "invalid options: {msg}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::CapacityTooSmall { capacity, required } => write!(
                f,
                "vertex capacity {capacity} is below the worst-case \
                 emission of {required} vertices"
            ),
            Self::CapacityExceedsDevice { bytes, limit } => write!(
                f,
                "vertex buffer of {bytes} bytes exceeds the device limit of \
                 {limit} bytes"
            ),
            Self::DispatchTooLarge { workgroups, limit } => write!(
                f,
                "update dispatch {workgroups:?} exceeds {limit} workgroups \
                 per dimension"
            ),
            Self::StaleArgs => {
                write!(f, "update recorded without a preceding init")
            }
            Self::Append(e) => write!(f, "append protocol violated: {e}"),
            Self::Readback(msg) => write!(f, "readback failed: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for SdfGenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Append(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpuContextError> for SdfGenError {
    fn from(e: GpuContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<AppendError> for SdfGenError {
    fn from(e: AppendError) -> Self {
        Self::Append(e)
    }
}

impl From<std::io::Error> for SdfGenError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
