//! polysketch
//!
//! Building blocks for 3D modelling experiments: a shared mesh model, spatial
//! indices, procedural generation, curve evaluation, particle and cloth
//! simulation, level of detail, mesh validation and a headless wgpu renderer
//! that draws everything into an image.
//!
//! High-level modules
//! - `math`: vector helpers, bounding boxes and planes
//! - `camera`: look-at camera, projection and the GPU uniform
//! - `data_structures`: meshes, instances, textures (GPU and CPU) and skyboxes
//! - `resources`: helpers to load images/meshes from disk and hot-reload textures
//! - `spatial`: octree, BSP tree and a timing comparison between them
//! - `procedural`: L-systems, style transforms and image-to-depth meshes
//! - `curves`: B-spline, NURBS and Catmull-Rom curves
//! - `simulation`: particles and mass-spring cloth
//! - `clothing`: garments assembled from body parts and draped as cloth
//! - `lod`: vertex-clustering simplification and distance based level selection
//! - `validation`: malformation checks for meshes
//! - `animation`: skeletons, clips and random poses
//! - `context`, `pipelines`, `render`: headless GPU rendering
//!

pub mod animation;
pub mod camera;
pub mod clothing;
pub mod context;
pub mod curves;
pub mod data_structures;
pub mod lod;
pub mod math;
pub mod pipelines;
pub mod procedural;
pub mod render;
pub mod resources;
pub mod simulation;
pub mod spatial;
pub mod validation;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;

/// Initialise `env_logger` once. Subsequent calls only print a warning.
pub fn init_logging() {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };
}
