//! boxstream
//!
//! A minimal real-time 3D scene renderer. It loads an OBJ mesh once, places
//! many textured instances of it in a flat fixed-capacity scene, renders them
//! every frame from a keyboard-movable camera, and runs a background streaming
//! thread that decodes replacement texture pixel data off the render thread.
//! Decoded payloads are handed to the render thread under a lock; all GPU
//! object creation and uploads stay on the render thread.
//!
//! High-level modules
//! - `app`: winit application, per-frame update/render loop and shutdown order
//! - `camera`: camera, projection and movement state for view/projection
//! - `context`: central GPU and window context that owns device/queue/pipeline
//! - `data_structures`: scene data models (mesh assets, instances, textures)
//! - `error`: error taxonomy for resource, GPU and streaming failures
//! - `pipelines`: render pipeline construction for the textured scene pass
//! - `resources`: helpers to decode meshes/textures and create GPU resources
//! - `streaming`: background texture decode worker and the hand-off protocol
//!

pub mod app;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod pipelines;
pub mod resources;
pub mod streaming;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;
pub use wgpu::*;
