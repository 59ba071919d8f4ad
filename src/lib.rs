//! # Cloner: GPU-Generated Mesh Instance Swarms
//!
//! Cloner renders a large swarm of mesh instances ("clones") whose
//! per-instance transforms are generated every frame by a compute
//! shader from a source point cloud and a time-varying noise field,
//! then drawn with a single indirect instanced draw call. No
//! per-instance CPU work happens anywhere in the frame loop.
//!
//! ## Architecture Overview
//!
//! ### 1. Transform Generation (GPU compute)
//!
//! - `shaders/cloner_update.wgsl` - the `ClonerUpdate` kernel: one
//!   thread per instance samples the noise field at the point's
//!   position, derives scale and an orientation basis from the point's
//!   normal/tangent, and writes a 3x4 transform
//! - `shaders/noise3d.wgsl` - simplex-noise primitive with analytic
//!   gradient, prepended to the kernel source
//! - [`transform`] - CPU mirror of the kernel plus the count
//!   derivations (`instance_count = max(1, points/64) * 64`)
//! - [`noise`] - CPU mirror of the noise primitive
//!
//! **Key Design**: the CPU mirrors exist so the generator's properties
//! are testable without a GPU; the compute kernel is the production
//! path.
//!
//! ### 2. Pipeline Orchestration ([`rendering`])
//!
//! - [`rendering::ClonerRenderer`] - owns the compute and render
//!   pipelines, the per-activation buffer set (point attributes,
//!   transforms, indirect draw args), and the accumulating noise
//!   offset. Strict `Inactive -> Active -> Inactive` lifecycle.
//!
//! **Key Design**: dispatch and draw are recorded into one command
//! encoder per frame, so the draw always observes the transforms
//! generated that frame.
//!
//! ### 3. Collaborators
//!
//! - [`point_cloud::PointCloud`] - parallel position/normal/tangent
//!   attributes, bounds, and GPU buffer factories
//! - [`mesh::MeshTemplate`] - the template geometry replicated across
//!   all instances
//! - [`gradient::CosineGradient`] - four-coefficient cosine color ramp
//! - [`config::ClonerConfig`] - host-exposed tuning surface (RON)
//!
//! ### 4. Demo Application
//!
//! - [`app::App`] - winit window + wgpu device setup and event loop
//! - [`scene::ClonerScene`] - one cloner over a Fibonacci-scattered
//!   sphere cloud, with an orbit camera ([`camera::OrbitCamera`])
//!
//! ## Dependencies
//!
//! - **Graphics**: `wgpu` (GPU abstraction), `winit` (windowing)
//! - **Math**: `glam` (SIMD math types), `bytemuck` (safe transmutation)
//! - **Diagnostics**: `log` + `env_logger`, `thiserror`
//! - **Serialization**: `serde` + `ron` (human-readable config files)

pub mod app;
pub mod camera;
pub mod config;
pub mod gradient;
pub mod mesh;
pub mod noise;
pub mod point_cloud;
pub mod rendering;
pub mod scene;
pub mod transform;
