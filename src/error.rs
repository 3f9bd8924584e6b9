//! Error taxonomy for setup-time and streaming failures.
//!
//! Setup failures ([`ResourceError`], [`GpuError`]) are unrecoverable: they
//! abort startup before any partial scene is rendered. [`StreamingError`] is
//! recoverable: a failed payload is skipped and the affected instance keeps
//! its current texture.

use thiserror::Error;

/// A mesh, texture or shader resource could not be read or decoded.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource not found: {path}")]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode mesh {path}")]
    MeshDecode {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("mesh {path} contains no models")]
    EmptyMesh { path: String },
    #[error("failed to decode image {path}")]
    ImageDecode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Device, surface or adapter acquisition failed. There is no device-loss
/// recovery path, so these are fatal at setup.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found: {0}")]
    NoAdapter(String),
    #[error("failed to acquire GPU device: {0}")]
    DeviceRequest(String),
    #[error("failed to create rendering surface: {0}")]
    Surface(String),
}

/// A texture payload prepared by the streaming worker failed to decode.
#[derive(Debug, Error)]
#[error("texture payload for instance {instance} failed to decode: {reason}")]
pub struct StreamingError {
    pub instance: usize,
    pub reason: String,
}
