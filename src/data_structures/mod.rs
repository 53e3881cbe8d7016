//! Core data types: meshes, instances, textures and skyboxes.
//!
//! - `mesh` contains the indexed triangle mesh every other module produces or consumes
//! - `instance` holds per-instance transformation data
//! - `texture` wraps GPU textures and their creation
//! - `cpu_texture` samples and blends images on the CPU
//! - `skybox` holds cube map faces and direction lookups

pub mod cpu_texture;
pub mod instance;
pub mod mesh;
pub mod skybox;
pub mod texture;
