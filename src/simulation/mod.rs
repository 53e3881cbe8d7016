//! Physical simulation.
//!
//! - `particles` integrates free particles under gravity, drag, attraction and repulsion
//! - `cloth` is a mass-spring cloth with stretch, shear and bend springs

pub mod cloth;
pub mod particles;
