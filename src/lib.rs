// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! GPU-resident SDF surface generation with indirect-draw vertex pulling.
//!
//! A compute `update` pass samples a signed distance field over a regular
//! grid, reserves output slots with a single atomic fetch-add per cell, and
//! writes triangle-list vertices straight into a buffer the rasterizer can
//! consume. The same counter doubles as the `vertex_count` of a
//! `draw_indirect` argument block, so drawing exactly the generated geometry
//! needs no CPU readback.
//!
//! # Key entry points
//!
//! - [`surface::generator::SurfaceGenerator`] - the GPU pipelines, buffers,
//!   and the init/update/draw protocol
//! - [`surface::cpu::CpuSurfaceGenerator`] - a multi-threaded reference
//!   executor of the same protocol over any [`sdf::SignedDistance`]
//! - [`options::Options`] - TOML-backed grid, sphere, meshing, and buffer
//!   configuration
//!
//! # Frame protocol
//!
//! `init` must run before every `update`, in a separate compute pass. The
//! order of vertices inside the buffer depends on atomic arrival order and
//! is not stable across runs; the *set* of vertices is.

pub mod error;
pub mod gpu;
pub mod options;
pub mod sdf;
pub mod surface;
