//! GPU executor: buffers, the `init`/`update` compute pipelines, and the
//! indirect draw that consumes their output.

use wgpu::util::DeviceExt;

use crate::error::SdfGenError;
use crate::gpu::gpu_context::GpuContext;
use crate::gpu::pipeline_helpers::{
    compute_storage, compute_uniform, create_compute_pipelines,
};
use crate::gpu::readback::read_buffer;
use crate::gpu::shader_composer::{
    ShaderComposer, SURFACE_GEN_PATH, SURFACE_GEN_SOURCE,
};
use crate::options::Options;
use crate::surface::check_capacity;
use crate::surface::indirect::{ArgsState, DrawIndirectArgs, Lifecycle};
use crate::surface::mesher::MeshingStrategy;
use crate::surface::params::GridLayout;
use crate::surface::vertex::Vertex;

/// Owns the uniform, vertex, and indirect-args buffers plus the two compute
/// pipelines that fill them.
///
/// Per frame: [`Self::record_frame`] (init, then update in a separate
/// pass), submit, then [`Self::draw_indirect`] inside a render pass. The
/// vertex count never leaves the GPU.
pub struct SurfaceGenerator {
    init_pipeline: wgpu::ComputePipeline,
    update_pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    params_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    args_buffer: wgpu::Buffer,
    layout: GridLayout,
    strategy: MeshingStrategy,
    capacity: u32,
    max_workgroups: u32,
    lifecycle: Lifecycle,
}

impl SurfaceGenerator {
    /// Allocate buffers and build pipelines for `options`.
    ///
    /// The shader is composed with whatever `sdfgen::field` module
    /// `composer` was built with.
    ///
    /// # Errors
    ///
    /// Option validation and capacity errors, device-limit errors
    /// ([`SdfGenError::CapacityExceedsDevice`],
    /// [`SdfGenError::DispatchTooLarge`]), or
    /// [`SdfGenError::ShaderCompose`].
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        options: &Options,
    ) -> Result<Self, SdfGenError> {
        options.validate()?;
        let layout = options.layout();
        let capacity = options.vertex_capacity()?;
        let limits = device.limits();
        check_buffer_limits(&limits, capacity)?;
        check_dispatch(limits.max_compute_workgroups_per_dimension, &layout)?;

        let params = options.surface_params();
        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Surface Params Buffer"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Vertex Buffer"),
            size: u64::from(capacity) * Vertex::SIZE,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let args_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Surface Indirect Args Buffer"),
                contents: bytemuck::bytes_of(&DrawIndirectArgs::INITIAL),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::INDIRECT
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Surface Gen Bind Group Layout"),
                entries: &[
                    compute_uniform(0),
                    compute_storage(1, false),
                    compute_storage(2, false),
                ],
            });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Surface Gen Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: vertex_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: args_buffer.as_entire_binding(),
                },
            ],
        });
        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Surface Gen Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let shader = composer.compose(
            device,
            "Surface Gen Shader",
            SURFACE_GEN_SOURCE,
            SURFACE_GEN_PATH,
        )?;
        let [init_pipeline, update_pipeline] = create_compute_pipelines(
            device,
            "Surface Gen",
            &pipeline_layout,
            &shader,
            ["init", "update"],
        );

        log::info!(
            "surface generator: grid {:?}, {:?}, capacity {} vertices ({} \
             bytes), update dispatch {:?}",
            layout.resolution.to_array(),
            options.meshing.strategy,
            capacity,
            u64::from(capacity) * Vertex::SIZE,
            layout.update_workgroups()
        );

        Ok(Self {
            init_pipeline,
            update_pipeline,
            bind_group,
            params_buffer,
            vertex_buffer,
            args_buffer,
            layout,
            strategy: options.meshing.strategy,
            capacity,
            max_workgroups: limits.max_compute_workgroups_per_dimension,
            lifecycle: Lifecycle::new(),
        })
    }

    /// Upload new grid, sphere, and meshing parameters. The vertex buffer
    /// keeps its size, so the new worst case must still fit.
    ///
    /// # Errors
    ///
    /// Option validation errors, [`SdfGenError::CapacityTooSmall`], or
    /// [`SdfGenError::DispatchTooLarge`]; nothing is uploaded on error.
    pub fn set_options(
        &mut self,
        queue: &wgpu::Queue,
        options: &Options,
    ) -> Result<(), SdfGenError> {
        options.validate()?;
        let layout = options.layout();
        check_capacity(
            u64::from(self.capacity),
            &layout,
            options.meshing.strategy,
        )?;
        check_dispatch(self.max_workgroups, &layout)?;

        queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::bytes_of(&options.surface_params()),
        );
        self.layout = layout;
        self.strategy = options.meshing.strategy;
        log::debug!(
            "surface generator options updated: grid {:?}, {:?}",
            layout.resolution.to_array(),
            self.strategy
        );
        Ok(())
    }

    /// Record the init pass: one workgroup, resets the args to
    /// `(0, 1, 0, 0)`.
    pub fn record_init(&mut self, encoder: &mut wgpu::CommandEncoder) {
        {
            let mut pass =
                encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Surface Init Pass"),
                    timestamp_writes: None,
                });
            pass.set_pipeline(&self.init_pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
        self.lifecycle.on_init();
        log::debug!("recorded surface init");
    }

    /// Record the update pass over the whole grid.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::StaleArgs`] unless [`Self::record_init`] was
    /// called since the previous update.
    pub fn record_update(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<(), SdfGenError> {
        self.lifecycle.begin_update()?;
        let [x, y, z] = self.layout.update_workgroups();
        {
            let mut pass =
                encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Surface Update Pass"),
                    timestamp_writes: None,
                });
            pass.set_pipeline(&self.update_pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(x, y, z);
        }
        log::debug!("recorded surface update ({x}, {y}, {z}) workgroups");
        Ok(())
    }

    /// Record init then update. The pass boundary orders the two.
    ///
    /// # Errors
    ///
    /// Never fails in practice; see [`Self::record_update`].
    pub fn record_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<(), SdfGenError> {
        self.record_init(encoder);
        self.record_update(encoder)
    }

    /// Bind the generated vertices to slot 0 and draw them with the GPU
    /// counts. The caller sets a render pipeline using
    /// [`Vertex::buffer_layout`] beforehand.
    pub fn draw_indirect<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw_indirect(&self.args_buffer, 0);
    }

    /// Overwrite the args buffer from the host. An init is required before
    /// the next update.
    pub fn seed_args(&mut self, queue: &wgpu::Queue, args: DrawIndirectArgs) {
        queue.write_buffer(&self.args_buffer, 0, bytemuck::bytes_of(&args));
        self.lifecycle.invalidate();
    }

    /// Record and submit one frame, then read the args back.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::Readback`] if the readback fails.
    pub fn generate(
        &mut self,
        context: &GpuContext,
    ) -> Result<DrawIndirectArgs, SdfGenError> {
        let mut encoder = context.create_encoder("Surface Gen Encoder");
        self.record_frame(&mut encoder)?;
        let _ = context.submit(encoder);
        self.read_args(context)
    }

    /// Blocking readback of the indirect args.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::Readback`] if mapping fails.
    pub fn read_args(
        &self,
        context: &GpuContext,
    ) -> Result<DrawIndirectArgs, SdfGenError> {
        let bytes =
            read_buffer(context, &self.args_buffer, DrawIndirectArgs::SIZE)?;
        bytemuck::try_pod_read_unaligned(bytes.as_slice())
            .map_err(|e| SdfGenError::Readback(e.to_string()))
    }

    /// Blocking readback of the first `count` vertices.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::Readback`] if `count` exceeds the capacity or
    /// mapping fails.
    pub fn read_vertices(
        &self,
        context: &GpuContext,
        count: u32,
    ) -> Result<Vec<Vertex>, SdfGenError> {
        if count > self.capacity {
            return Err(SdfGenError::Readback(format!(
                "requested {count} vertices from a buffer of {}",
                self.capacity
            )));
        }
        let bytes = read_buffer(
            context,
            &self.vertex_buffer,
            u64::from(count) * Vertex::SIZE,
        )?;
        Ok(bytemuck::pod_collect_to_vec(bytes.as_slice()))
    }

    /// The generated vertex buffer.
    #[must_use]
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    /// The indirect-args buffer.
    #[must_use]
    pub fn args_buffer(&self) -> &wgpu::Buffer {
        &self.args_buffer
    }

    /// Vertex buffer capacity in vertices.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Current grid.
    #[must_use]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Current meshing strategy.
    #[must_use]
    pub fn strategy(&self) -> MeshingStrategy {
        self.strategy
    }

    /// Host-side lifecycle state of the args buffer.
    #[must_use]
    pub fn state(&self) -> ArgsState {
        self.lifecycle.state()
    }

    /// `(label, allocated_bytes)` per buffer, for logging.
    #[must_use]
    pub fn buffer_info(&self) -> [(&'static str, u64); 3] {
        [
            ("params", self.params_buffer.size()),
            ("vertices", self.vertex_buffer.size()),
            ("args", self.args_buffer.size()),
        ]
    }
}

fn check_buffer_limits(
    limits: &wgpu::Limits,
    capacity: u32,
) -> Result<(), SdfGenError> {
    let bytes = u64::from(capacity) * Vertex::SIZE;
    let limit = u64::from(limits.max_storage_buffer_binding_size)
        .min(limits.max_buffer_size);
    if bytes > limit {
        return Err(SdfGenError::CapacityExceedsDevice { bytes, limit });
    }
    Ok(())
}

fn check_dispatch(limit: u32, layout: &GridLayout) -> Result<(), SdfGenError> {
    let workgroups = layout.update_workgroups();
    if workgroups.iter().any(|&n| n > limit) {
        return Err(SdfGenError::DispatchTooLarge { workgroups, limit });
    }
    Ok(())
}
