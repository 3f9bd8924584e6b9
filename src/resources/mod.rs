use std::path::PathBuf;

use crate::error::ResourceError;

/**
 * This module contains all logic for loading meshes/textures from external
 * files. Decoding is CPU-only and safe to call from any thread; creating the
 * resulting GPU objects is not and stays on the render thread.
 */
pub mod mesh;
pub mod texture;

/// Resolve a resource name against the `assets/` directory next to the
/// binary (populated by `build.rs`).
pub(crate) fn resolve(file_name: &str) -> PathBuf {
    // TODO: pass env for absolute path from lib caller
    std::path::Path::new("./").join("assets").join(file_name)
}

pub fn load_binary(file_name: &str) -> Result<Vec<u8>, ResourceError> {
    std::fs::read(resolve(file_name)).map_err(|source| ResourceError::NotFound {
        path: file_name.to_string(),
        source,
    })
}
