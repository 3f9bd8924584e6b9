//! Image decoding and texture bind group layout.

use image::GenericImageView;

use crate::{error::ResourceError, resources};

/// Decoded RGBA8 pixel data plus dimensions, not yet uploaded.
///
/// This is the unit the streaming worker produces: plain bytes that any
/// thread may prepare, turned into a GPU texture only on the render thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelData {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PixelData {
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Layout for one diffuse texture + sampler at group 0.
pub fn diffuse_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("diffuse_bind_group_layout"),
    })
}

/// Read and decode an image file into RGBA8 pixel data. CPU-only; safe to
/// call off the render thread.
pub fn decode_image(file_name: &str) -> Result<PixelData, ResourceError> {
    let data = resources::load_binary(file_name)?;
    let img = image::load_from_memory(&data).map_err(|source| ResourceError::ImageDecode {
        path: file_name.to_string(),
        source,
    })?;
    let (width, height) = img.dimensions();
    Ok(PixelData {
        pixels: img.to_rgba8().into_raw(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_image_missing_file_fails() {
        let err = decode_image("does_not_exist.png").unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { .. }));
    }
}
