//! Demo scene: one cloner over a procedurally scattered point cloud.
//!
//! Owns the external collaborators (point cloud, template mesh,
//! gradient) and the cloner renderer, and drives the per-frame
//! compute-then-draw sequence in a single submission.

use crate::camera::OrbitCamera;
use crate::config::ClonerConfig;
use crate::gradient::CosineGradient;
use crate::mesh::MeshTemplate;
use crate::point_cloud::PointCloud;
use crate::rendering::{ClonerError, ClonerRenderer};
use glam::Mat4;

pub struct ClonerScene {
    pub camera: OrbitCamera,
    pub config: ClonerConfig,
    /// Whether the noise field advances each frame
    pub simulating: bool,
    renderer: ClonerRenderer,
    point_cloud: Option<PointCloud>,
    template: Option<MeshTemplate>,
    gradient: Option<CosineGradient>,
    local_to_world: Mat4,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
    pending_dt: f32,
}

impl ClonerScene {
    pub fn new(device: &wgpu::Device, surface_config: &wgpu::SurfaceConfiguration) -> Self {
        let renderer = ClonerRenderer::new(device, surface_config.format);
        let depth_view =
            Self::create_depth_texture(device, surface_config.width, surface_config.height);

        let mut scene = Self {
            camera: OrbitCamera::default(),
            config: ClonerConfig::default(),
            simulating: true,
            renderer,
            point_cloud: Some(PointCloud::scatter_sphere(4096, 1.0)),
            template: Some(MeshTemplate::cube()),
            gradient: Some(CosineGradient::default()),
            local_to_world: Mat4::IDENTITY,
            depth_view,
            width: surface_config.width,
            height: surface_config.height,
            pending_dt: 0.0,
        };

        if let Err(e) = scene.enable(device) {
            log::error!("Cloner activation failed: {}", e);
        }
        scene
    }

    /// Activate the cloner. Aborts with a configuration error when any
    /// collaborator is missing; nothing is allocated in that case.
    pub fn enable(&mut self, device: &wgpu::Device) -> Result<(), ClonerError> {
        let point_cloud = self.point_cloud.as_ref().ok_or(ClonerError::MissingPointCloud)?;
        let template = self.template.as_ref().ok_or(ClonerError::MissingTemplate)?;
        if self.gradient.is_none() {
            return Err(ClonerError::MissingGradient);
        }
        self.renderer.enable(device, point_cloud, template)
    }

    pub fn disable(&mut self) -> Result<(), ClonerError> {
        self.renderer.disable()
    }

    pub fn is_active(&self) -> bool {
        self.renderer.is_active()
    }

    /// Flip between active and inactive, logging instead of failing -
    /// the demo key binding uses this.
    pub fn toggle_enabled(&mut self, device: &wgpu::Device) {
        let result = if self.is_active() {
            self.disable()
        } else {
            self.enable(device)
        };
        if let Err(e) = result {
            log::error!("Cloner toggle failed: {}", e);
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.camera.update(dt);
        self.pending_dt = dt;
    }

    pub fn render(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, view: &wgpu::TextureView) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cloner Scene Encoder"),
        });

        // Dispatch first, draw second, same encoder: the draw observes
        // this frame's transforms.
        if self.renderer.is_active() {
            self.renderer.update(
                queue,
                &mut encoder,
                self.pending_dt,
                self.simulating,
                &self.config,
            );
        }

        let aspect = self.width as f32 / self.height.max(1) as f32;
        let gradient = self.gradient.unwrap_or_default();
        self.renderer.render(
            queue,
            &mut encoder,
            view,
            &self.depth_view,
            &gradient,
            self.local_to_world,
            self.camera.view_proj(aspect),
            self.camera.position(),
        );

        queue.submit(std::iter::once(encoder.finish()));
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        self.depth_view = Self::create_depth_texture(device, width, height);
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Cloner Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}
