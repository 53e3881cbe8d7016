//! Spatial data structures.
//!
//! - `octree` indexes points for box, radius and nearest-neighbour queries
//! - `bsp` partitions triangles by their planes for inside tests and painter's ordering
//! - `compare` measures both against a plain linear scan

pub mod bsp;
pub mod compare;
pub mod octree;
