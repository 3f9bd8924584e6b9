//! Scene data structures: mesh assets, instances, the scene list and textures.
//!
//! - `mesh` contains the interleaved vertex layout and the GPU-resident
//!   vertex/index buffer pair shared by all instances of a mesh
//! - `instance` holds one renderable occurrence of a mesh with its own
//!   transform and swappable texture binding
//! - `scene` is the flat, fixed-capacity ordered instance list
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod instance;
pub mod mesh;
pub mod scene;
pub mod texture;
