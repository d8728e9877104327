//! GPU resource management utilities.
//!
//! Provides headless wgpu device initialization, compute pipeline
//! boilerplate, staging-buffer readback, and shader composition.

/// wgpu device and queue initialization.
pub mod gpu_context;
/// Shared wgpu boilerplate helpers for compute pipelines.
pub mod pipeline_helpers;
/// Blocking staging-buffer readback.
pub mod readback;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
