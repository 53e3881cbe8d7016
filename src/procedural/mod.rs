//! Procedural geometry.
//!
//! - `lsystem` grows branching structures from rewriting rules
//! - `style` deforms finished meshes into a stylised look
//! - `depth` lifts photographs into height-mapped meshes

pub mod depth;
pub mod lsystem;
pub mod style;
