//! Render pipelines.
//!
//! - `basic` builds the instanced, textured mesh pipeline and its bind group layouts
//! - `skybox` draws a cube map behind the scene

pub mod basic;
pub mod skybox;
