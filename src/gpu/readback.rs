//! Blocking GPU buffer readback through a staging buffer.
//!
//! Generation results normally never leave the GPU; this path exists for
//! tests, the CLI, and debugging.

use std::sync::mpsc;

use crate::error::SdfGenError;
use crate::gpu::gpu_context::GpuContext;

/// Copy `size` bytes from the start of `src` into host memory.
///
/// `src` must have `COPY_SRC` usage. Blocks until the GPU has finished all
/// previously submitted work.
///
/// # Errors
///
/// Returns [`SdfGenError::Readback`] if mapping the staging buffer fails.
pub fn read_buffer(
    context: &GpuContext,
    src: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<u8>, SdfGenError> {
    if size == 0 {
        return Ok(Vec::new());
    }

    let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = context.create_encoder("Readback Encoder");
    encoder.copy_buffer_to_buffer(src, 0, &staging, 0, size);
    let _ = context.submit(encoder);

    let buffer_slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    let _ = context
        .device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| SdfGenError::Readback(e.to_string()))?;

    match receiver.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(SdfGenError::Readback(e.to_string())),
        Err(e) => return Err(SdfGenError::Readback(e.to_string())),
    }

    let bytes = buffer_slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(bytes)
}
