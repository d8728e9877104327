//! Shared wgpu boilerplate helpers for compute pipelines.

/// Compute-visible uniform buffer binding.
pub fn compute_uniform(binding: u32) -> wgpu::BindGroupLayoutEntry {
    compute_buffer(binding, wgpu::BufferBindingType::Uniform)
}

/// Compute-visible storage buffer binding.
pub fn compute_storage(
    binding: u32,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    compute_buffer(
        binding,
        wgpu::BufferBindingType::Storage { read_only },
    )
}

fn compute_buffer(
    binding: u32,
    ty: wgpu::BufferBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Create one compute pipeline per entry point, all sharing `layout` and
/// `shader`.
pub fn create_compute_pipelines<const N: usize>(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    entry_points: [&str; N],
) -> [wgpu::ComputePipeline; N] {
    entry_points.map(|entry_point| {
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{label} {entry_point} Pipeline")),
            layout: Some(layout),
            module: shader,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        })
    })
}
