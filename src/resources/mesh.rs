//! OBJ decoding into the interleaved vertex layout.
//!
//! The OBJ parser itself is a black box (`tobj`); this module owns the
//! conversion of its flat attribute arrays into [`MeshVertex`] records and
//! the V flip applied to texture coordinates.

use crate::{data_structures::mesh::MeshVertex, error::ResourceError};

/// A fully decoded mesh, not yet uploaded. Owned exclusively by the caller
/// until upload; discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl DecodedMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Interleave flat position/texcoord/normal arrays into 8 floats per vertex.
///
/// The V coordinate is stored as `1 - v`: image rows run top-down while OBJ
/// texture coordinates run bottom-up, so the flip belongs to the upload
/// convention and is not left to the renderer. Missing texcoords or normals
/// default to zero.
pub fn interleave(positions: &[f32], texcoords: &[f32], normals: &[f32]) -> Vec<MeshVertex> {
    (0..positions.len() / 3)
        .map(|i| MeshVertex {
            position: [
                positions[i * 3],
                positions[i * 3 + 1],
                positions[i * 3 + 2],
            ],
            tex_coords: [
                texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                normals.get(i * 3).map_or(0.0, |f| *f),
                normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
        })
        .collect()
}

/// Decode the first model of an OBJ resource.
///
/// Triangulation and a single shared index per vertex are requested from the
/// parser, so `indices` always holds whole triangles over the interleaved
/// vertex array.
pub fn decode_obj(file_name: &str) -> Result<DecodedMesh, ResourceError> {
    let path = super::resolve(file_name);
    let (models, _materials) = tobj::load_obj(
        &path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| ResourceError::MeshDecode {
        path: file_name.to_string(),
        source,
    })?;

    let model = models
        .into_iter()
        .next()
        .ok_or_else(|| ResourceError::EmptyMesh {
            path: file_name.to_string(),
        })?;
    let mesh = model.mesh;
    let vertices = interleave(&mesh.positions, &mesh.texcoords, &mesh.normals);
    log::debug!(
        "decoded {}: {} vertices, {} triangles",
        file_name,
        vertices.len(),
        mesh.indices.len() / 3
    );
    Ok(DecodedMesh {
        vertices,
        indices: mesh.indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleave_produces_one_record_per_vertex() {
        // Two triangles sharing an edge: 4 vertices, 24 floats of attributes.
        let positions: Vec<f32> = (0..12).map(|i| i as f32).collect();
        let texcoords: Vec<f32> = (0..8).map(|i| i as f32 * 0.1).collect();
        let normals: Vec<f32> = (0..12).map(|_| 1.0).collect();

        let vertices = interleave(&positions, &texcoords, &normals);
        assert_eq!(vertices.len(), 4);
        // 8 floats per vertex in the fixed order.
        assert_eq!(std::mem::size_of_val(&vertices[0]), 8 * 4);
        assert_eq!(vertices[1].position, [3.0, 4.0, 5.0]);
        assert_eq!(vertices[2].normal, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn interleave_flips_texture_v() {
        let positions = [0.0; 3];
        let texcoords = [0.25, 0.75];
        let vertices = interleave(&positions, &texcoords, &[0.0; 3]);
        assert_eq!(vertices[0].tex_coords[0], 0.25);
        assert!((vertices[0].tex_coords[1] - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_attributes_default_to_zero() {
        let positions = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let vertices = interleave(&positions, &[], &[]);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].tex_coords, [0.0, 1.0]);
        assert_eq!(vertices[0].normal, [0.0; 3]);
    }

    #[test]
    fn triangle_count_covers_whole_index_buffer() {
        let decoded = DecodedMesh {
            vertices: Vec::new(),
            indices: vec![0, 1, 2, 2, 1, 3],
        };
        assert_eq!(decoded.triangle_count(), 2);
        assert_eq!(decoded.indices.len(), decoded.triangle_count() * 3);
    }

    #[test]
    fn decode_obj_missing_file_fails() {
        let err = decode_obj("does_not_exist.obj").unwrap_err();
        assert!(matches!(
            err,
            crate::error::ResourceError::MeshDecode { .. }
        ));
    }
}
