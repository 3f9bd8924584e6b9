//! GPU-resident mesh data shared by scene instances.

use wgpu::util::DeviceExt;

use crate::{error::ResourceError, resources};

/// Describes how a vertex type is laid out in a GPU vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Interleaved vertex layout: 8 floats in the fixed order
/// `[px, py, pz, tu, tv, nx, ny, nz]`.
///
/// The texture V coordinate is stored flipped (`1 - v`) at decode time; see
/// [`resources::mesh::interleave`].
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for MeshVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// A vertex/index buffer pair built once from a decoded mesh.
///
/// Created during scene setup and shared read-only by many instances through
/// an `Arc`. Uploading happens exactly once; the decoded CPU-side data is
/// dropped afterwards. The buffers are released when the last instance
/// referencing the asset is dropped.
#[derive(Debug)]
pub struct MeshAsset {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl MeshAsset {
    /// Decode an OBJ resource and upload it. No partially constructed asset
    /// escapes when decoding fails.
    pub fn load(device: &wgpu::Device, file_name: &str) -> Result<Self, ResourceError> {
        let decoded = resources::mesh::decode_obj(file_name)?;
        Ok(Self::from_decoded(device, file_name, &decoded))
    }

    /// Upload an already decoded mesh into fresh GPU buffers.
    pub fn from_decoded(
        device: &wgpu::Device,
        name: &str,
        decoded: &resources::mesh::DecodedMesh,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(&decoded.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(&decoded.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: decoded.indices.len() as u32,
        }
    }
}
