//! Cloner rendering with wgpu.
//!
//! Orchestrates the per-frame pipeline: a compute dispatch generates one
//! 3x4 transform per instance from the point-cloud attributes and the
//! noise field, then a single indirect instanced draw renders the
//! template mesh with those transforms. The draw-argument buffer
//! (index count, instance count) is written once at activation.

use crate::config::ClonerConfig;
use crate::gradient::CosineGradient;
use crate::mesh::MeshTemplate;
use crate::point_cloud::{Bounds, PointCloud};
use crate::transform::{self, ClonerParams};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use wgpu::util::DeviceExt;

#[derive(Error, Debug)]
pub enum ClonerError {
    #[error("cloner is already active")]
    AlreadyActive,
    #[error("cloner is not active")]
    NotActive,
    #[error("template mesh has no indices")]
    EmptyTemplate,
    #[error("no point cloud is set")]
    MissingPointCloud,
    #[error("no template mesh is set")]
    MissingTemplate,
    #[error("no gradient is set")]
    MissingGradient,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 3],
    _pad: f32,
}

/// Material uniform for the surface shader. Field order matches the
/// WGSL `ClonerMaterial` struct (gradient coefficients, transforms,
/// instance count, activation id).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ClonerMaterial {
    gradient_a: [f32; 4],
    gradient_b: [f32; 4],
    gradient_c: [f32; 4],
    gradient_d: [f32; 4],
    local_to_world: [[f32; 4]; 4],
    world_to_local: [[f32; 4]; 4],
    instance_count: u32,
    unique_id: f32,
    _pad: [f32; 2],
}

/// Monotonic activation ids. Any two simultaneously active cloners get
/// distinct `_UniqueID` values so downstream draw batching can never
/// merge their instancing state.
static NEXT_ACTIVATION_ID: AtomicU32 = AtomicU32::new(1);

fn next_activation_id() -> u32 {
    NEXT_ACTIVATION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Indirect draw arguments for a template with `index_count` indices
/// drawn `instance_count` times.
pub fn draw_args(index_count: u32, instance_count: u32) -> wgpu::util::DrawIndexedIndirectArgs {
    wgpu::util::DrawIndexedIndirectArgs {
        index_count,
        instance_count,
        first_index: 0,
        base_vertex: 0,
        first_instance: 0,
    }
}

/// GPU resources owned by one activation. Created together on `enable`,
/// dropped together on `disable` - no partial lifetimes.
struct PipelineState {
    // Held for the activation lifetime; bound through the bind groups
    #[allow(dead_code)]
    position_buffer: wgpu::Buffer,
    #[allow(dead_code)]
    normal_buffer: wgpu::Buffer,
    #[allow(dead_code)]
    tangent_buffer: wgpu::Buffer,
    transform_buffer: wgpu::Buffer,
    draw_args_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    compute_bind_group: wgpu::BindGroup,
    material_bind_group: wgpu::BindGroup,
    instance_count: u32,
    thread_group_count: u32,
    bounds: Bounds,
    unique_id: u32,
}

// Buffers are kept private to PipelineState; wgpu defers their actual
// destruction until the GPU holds no outstanding references, so drop
// order vs. in-flight work is safe.

/// Renderer for cloned mesh instances.
///
/// State machine: `Inactive -> Active` via [`enable`](Self::enable),
/// `Active -> Inactive` via [`disable`](Self::disable). Per-frame
/// [`update`](Self::update) and [`render`](Self::render) are no-ops
/// while inactive. The noise offset accumulates across the renderer's
/// whole lifetime, surviving enable/disable cycles.
///
/// Known limitation: the draw-args buffer captures the template's index
/// count and the derived instance count at activation time. Changing
/// the template or the point cloud while active leaves it stale; the
/// caller must disable and re-enable to pick up the new counts.
pub struct ClonerRenderer {
    compute_pipeline: wgpu::ComputePipeline,
    compute_bind_group_layout: wgpu::BindGroupLayout,
    render_pipeline: wgpu::RenderPipeline,
    material_bind_group_layout: wgpu::BindGroupLayout,
    camera_bind_group: wgpu::BindGroup,
    camera_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    material_buffer: wgpu::Buffer,
    noise_offset: Vec3,
    state: Option<PipelineState>,
}

impl ClonerRenderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        // The noise primitive is prepended to the kernel source; WGSL
        // has no include mechanism.
        let compute_source = format!(
            "{}\n{}",
            include_str!("../../shaders/noise3d.wgsl"),
            include_str!("../../shaders/cloner_update.wgsl"),
        );
        let compute_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cloner Update Shader"),
            source: wgpu::ShaderSource::Wgsl(compute_source.into()),
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cloner Params Buffer"),
            size: std::mem::size_of::<ClonerParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let compute_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Cloner Compute Bind Group Layout"),
                entries: &[
                    // Params uniform
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Position buffer (read)
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Normal buffer (read)
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Tangent buffer (read)
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Transform buffer (write)
                    wgpu::BindGroupLayoutEntry {
                        binding: 4,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Cloner Compute Pipeline Layout"),
                bind_group_layouts: &[&compute_bind_group_layout],
                push_constant_ranges: &[],
            });

        // The kernel entry is resolved once here, never per frame.
        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Cloner Update Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &compute_shader,
            entry_point: Some("ClonerUpdate"),
            compilation_options: Default::default(),
            cache: None,
        });

        // Render side
        let render_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cloner Surface Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../shaders/cloner_surface.wgsl").into(),
            ),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cloner Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let material_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cloner Material Buffer"),
            size: std::mem::size_of::<ClonerMaterial>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Cloner Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cloner Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let material_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Cloner Material Bind Group Layout"),
                entries: &[
                    // Material uniform
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Transform buffer (read)
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Cloner Render Pipeline Layout"),
                bind_group_layouts: &[&camera_bind_group_layout, &material_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Cloner Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshTemplate::vertex_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Negative effective scale mirrors instances and flips
                // their winding, so faces cannot be culled.
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            compute_pipeline,
            compute_bind_group_layout,
            render_pipeline,
            material_bind_group_layout,
            camera_bind_group,
            camera_buffer,
            params_buffer,
            material_buffer,
            noise_offset: Vec3::ZERO,
            state: None,
        }
    }

    /// Activate: allocate the full buffer set for the given point cloud
    /// and template. Fails without allocating anything if the cloner is
    /// already active or the template is empty.
    pub fn enable(
        &mut self,
        device: &wgpu::Device,
        point_cloud: &PointCloud,
        template: &MeshTemplate,
    ) -> Result<(), ClonerError> {
        if self.state.is_some() {
            return Err(ClonerError::AlreadyActive);
        }
        if template.index_count() == 0 {
            return Err(ClonerError::EmptyTemplate);
        }

        let point_count = point_cloud.point_count();
        let thread_group_count = transform::thread_group_count(point_count);
        let instance_count = transform::instance_count(point_count);

        let position_buffer = point_cloud.create_position_buffer(device);
        let normal_buffer = point_cloud.create_normal_buffer(device);
        let tangent_buffer = point_cloud.create_tangent_buffer(device);

        let transform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cloner Transform Buffer"),
            size: instance_count as u64 * std::mem::size_of::<transform::InstanceTransform>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let draw_args_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cloner Draw Args Buffer"),
            contents: draw_args(template.index_count(), instance_count).as_bytes(),
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_SRC,
        });

        let vertex_buffer = template.create_vertex_buffer(device);
        let index_buffer = template.create_index_buffer(device);

        let compute_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cloner Compute Bind Group"),
            layout: &self.compute_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: position_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: normal_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: tangent_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: transform_buffer.as_entire_binding(),
                },
            ],
        });

        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cloner Material Bind Group"),
            layout: &self.material_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.material_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: transform_buffer.as_entire_binding(),
                },
            ],
        });

        // Slightly expand the bounding volume; the cloud breathes with
        // the noise field.
        let mut bounds = point_cloud.bounds();
        bounds.expand(bounds.extents * 0.25);

        let unique_id = next_activation_id();

        log::info!(
            "Cloner activated: {} points -> {} instances in {} groups (activation {})",
            point_count,
            instance_count,
            thread_group_count,
            unique_id
        );

        self.state = Some(PipelineState {
            position_buffer,
            normal_buffer,
            tangent_buffer,
            transform_buffer,
            draw_args_buffer,
            vertex_buffer,
            index_buffer,
            compute_bind_group,
            material_bind_group,
            instance_count,
            thread_group_count,
            bounds,
            unique_id,
        });

        Ok(())
    }

    /// Deactivate: release the whole buffer set. The next `enable`
    /// recreates it from scratch.
    pub fn disable(&mut self) -> Result<(), ClonerError> {
        match self.state.take() {
            Some(state) => {
                log::info!("Cloner deactivated (activation {})", state.unique_id);
                Ok(())
            }
            None => Err(ClonerError::NotActive),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn instance_count(&self) -> Option<u32> {
        self.state.as_ref().map(|s| s.instance_count)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.state.as_ref().map(|s| s.bounds)
    }

    pub fn noise_offset(&self) -> Vec3 {
        self.noise_offset
    }

    /// Per-frame compute step: advance the noise field, upload the
    /// kernel parameters, and dispatch one workgroup per 64 instances.
    /// Record this into the same encoder as [`render`](Self::render) so
    /// the draw observes this frame's transforms.
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        dt: f32,
        simulating: bool,
        config: &ClonerConfig,
    ) {
        let Some(state) = &self.state else {
            log::warn!("Cloner update called while inactive");
            return;
        };

        self.noise_offset = transform::step_noise_offset(
            self.noise_offset,
            config.noise_motion_vec(),
            dt,
            simulating,
        );

        let params = ClonerParams {
            instance_count: state.instance_count,
            base_scale: config.template_scale,
            scale_noise: config.scale_by_noise,
            noise_frequency: config.noise_frequency,
            noise_offset: self.noise_offset.to_array(),
            normal_modifier: config.normal_modifier,
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Cloner Update Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.compute_pipeline);
        compute_pass.set_bind_group(0, &state.compute_bind_group, &[]);
        compute_pass.dispatch_workgroups(state.thread_group_count, 1, 1);
    }

    /// Per-frame draw: upload material and camera uniforms and issue
    /// one indirect instanced draw against the draw-args buffer. The
    /// pass clears the targets; the draw is skipped when the expanded
    /// bounds fall outside the view frustum or the cloner is inactive.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        gradient: &CosineGradient,
        local_to_world: Mat4,
        view_proj: Mat4,
        camera_pos: Vec3,
    ) {
        let camera_uniform = CameraUniform {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: camera_pos.to_array(),
            _pad: 0.0,
        };
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_uniform));

        if let Some(state) = &self.state {
            let material = ClonerMaterial {
                gradient_a: gradient.coeffs_a().to_array(),
                gradient_b: gradient.coeffs_b().to_array(),
                gradient_c: gradient.coeffs_c2().to_array(),
                gradient_d: gradient.coeffs_d2().to_array(),
                local_to_world: local_to_world.to_cols_array_2d(),
                world_to_local: local_to_world.inverse().to_cols_array_2d(),
                instance_count: state.instance_count,
                unique_id: state.unique_id as f32,
                _pad: [0.0; 2],
            };
            queue.write_buffer(&self.material_buffer, 0, bytemuck::bytes_of(&material));
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Cloner Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.015,
                        g: 0.015,
                        b: 0.03,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let Some(state) = &self.state else {
            return;
        };

        let world_bounds = {
            let mut b = state.bounds;
            b.center = local_to_world.transform_point3(b.center);
            b
        };
        if !bounds_visible(view_proj, world_bounds) {
            return;
        }

        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &state.material_bind_group, &[]);
        render_pass.set_vertex_buffer(0, state.vertex_buffer.slice(..));
        render_pass.set_index_buffer(state.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed_indirect(&state.draw_args_buffer, 0);
    }

    /// Synchronous readback of the draw-args buffer. Diagnostic path,
    /// not called per frame. `None` while inactive or if the readback
    /// fails.
    pub fn read_draw_args(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Option<[u32; 5]> {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let state = self.state.as_ref()?;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cloner Draw Args Staging"),
            size: 5 * std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cloner Draw Args Readback"),
        });
        encoder.copy_buffer_to_buffer(&state.draw_args_buffer, 0, &staging, 0, 20);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let done = Arc::new(AtomicBool::new(false));
        let ok = Arc::new(AtomicBool::new(false));
        let (done_cb, ok_cb) = (done.clone(), ok.clone());
        slice.map_async(wgpu::MapMode::Read, move |result| {
            ok_cb.store(result.is_ok(), Ordering::SeqCst);
            done_cb.store(true, Ordering::SeqCst);
        });

        while !done.load(Ordering::SeqCst) {
            let _ = device.poll(wgpu::PollType::Poll);
        }
        if !ok.load(Ordering::SeqCst) {
            log::error!("Draw args readback failed to map");
            return None;
        }

        let args = {
            let data = slice.get_mapped_range();
            let words: &[u32] = bytemuck::cast_slice(&data);
            [words[0], words[1], words[2], words[3], words[4]]
        };
        staging.unmap();
        Some(args)
    }

    /// Synchronous readback of the generated transforms. Diagnostic
    /// path used by the GPU tests to compare against the CPU reference.
    pub fn read_transforms(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Option<Vec<transform::InstanceTransform>> {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let state = self.state.as_ref()?;
        let size = state.transform_buffer.size();

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cloner Transform Staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cloner Transform Readback"),
        });
        encoder.copy_buffer_to_buffer(&state.transform_buffer, 0, &staging, 0, size);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let done = Arc::new(AtomicBool::new(false));
        let ok = Arc::new(AtomicBool::new(false));
        let (done_cb, ok_cb) = (done.clone(), ok.clone());
        slice.map_async(wgpu::MapMode::Read, move |result| {
            ok_cb.store(result.is_ok(), Ordering::SeqCst);
            done_cb.store(true, Ordering::SeqCst);
        });

        while !done.load(Ordering::SeqCst) {
            let _ = device.poll(wgpu::PollType::Poll);
        }
        if !ok.load(Ordering::SeqCst) {
            return None;
        }

        let transforms = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, transform::InstanceTransform>(&data).to_vec()
        };
        staging.unmap();
        Some(transforms)
    }
}

/// Conservative frustum test: reject only when all corners of the
/// volume are outside the same clip plane.
fn bounds_visible(view_proj: Mat4, bounds: Bounds) -> bool {
    let mut outside = [0u8; 6];
    for ix in [-1.0f32, 1.0] {
        for iy in [-1.0f32, 1.0] {
            for iz in [-1.0f32, 1.0] {
                let corner = bounds.center + bounds.extents * Vec3::new(ix, iy, iz);
                let clip = view_proj * corner.extend(1.0);
                if clip.x < -clip.w {
                    outside[0] += 1;
                }
                if clip.x > clip.w {
                    outside[1] += 1;
                }
                if clip.y < -clip.w {
                    outside[2] += 1;
                }
                if clip.y > clip.w {
                    outside[3] += 1;
                }
                if clip.z < 0.0 {
                    outside[4] += 1;
                }
                if clip.z > clip.w {
                    outside[5] += 1;
                }
            }
        }
    }
    outside.iter().all(|&count| count < 8)
}
