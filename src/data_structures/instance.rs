//! One renderable occurrence of a mesh asset.

use std::sync::Arc;

use cgmath::{Matrix4, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::{mesh::MeshAsset, texture::Texture};

/// The per-instance world matrix as stored on the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    model: [[f32; 4]; 4],
}

/// A lightweight handle pairing a shared mesh, a swappable texture binding
/// and a mutable world transform.
///
/// The mesh is shared read-only across instances; the texture binding is the
/// swap point used by the streaming hand-off; the transform may be
/// reassigned every frame.
#[derive(Debug)]
pub struct SceneInstance {
    mesh: Arc<MeshAsset>,
    texture: Texture,
    texture_bind_group: wgpu::BindGroup,
    /// Base position the instance was placed at during setup.
    pub translation: Vector3<f32>,
    transform: Matrix4<f32>,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
}

impl SceneInstance {
    /// Pure construction apart from the instance's own uniform buffer and
    /// bind groups; no draw calls are issued and the shared mesh is not
    /// touched.
    pub fn bind(
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        model_layout: &wgpu::BindGroupLayout,
        mesh: Arc<MeshAsset>,
        texture: Texture,
        translation: Vector3<f32>,
    ) -> Self {
        let transform = Matrix4::from_translation(translation);
        let model_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Buffer"),
            contents: bytemuck::cast_slice(&[ModelUniform {
                model: transform.into(),
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let model_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: model_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: model_buffer.as_entire_binding(),
            }],
            label: Some("model_bind_group"),
        });
        let texture_bind_group = mk_texture_bind_group(device, texture_layout, &texture);

        Self {
            mesh,
            texture,
            texture_bind_group,
            translation,
            transform,
            model_buffer,
            model_bind_group,
        }
    }

    /// Swap the bound texture. The old texture and bind group are dropped;
    /// the next draw samples the new one.
    pub fn set_texture(
        &mut self,
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        texture: Texture,
    ) {
        self.texture_bind_group = mk_texture_bind_group(device, texture_layout, &texture);
        self.texture = texture;
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn mesh(&self) -> &Arc<MeshAsset> {
        &self.mesh
    }

    pub fn transform(&self) -> Matrix4<f32> {
        self.transform
    }

    /// Reassign the world transform and write it through to the GPU.
    pub fn set_transform(&mut self, queue: &wgpu::Queue, transform: Matrix4<f32>) {
        self.transform = transform;
        queue.write_buffer(
            &self.model_buffer,
            0,
            bytemuck::cast_slice(&[ModelUniform {
                model: transform.into(),
            }]),
        );
    }
}

fn mk_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
        label: Some("instance_texture_bind_group"),
    })
}

/// Render-pass extension for drawing scene instances.
///
/// Precondition, not a checked error: the pass must have the scene pipeline
/// bound and the frame begun before any instance is drawn.
pub trait DrawScene {
    fn draw_instance(&mut self, instance: &SceneInstance, camera_bind_group: &wgpu::BindGroup);
}

impl DrawScene for wgpu::RenderPass<'_> {
    fn draw_instance(&mut self, instance: &SceneInstance, camera_bind_group: &wgpu::BindGroup) {
        self.set_bind_group(0, &instance.texture_bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, &instance.model_bind_group, &[]);
        self.set_vertex_buffer(0, instance.mesh.vertex_buffer.slice(..));
        self.set_index_buffer(instance.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..instance.mesh.num_elements, 0, 0..1);
    }
}
