use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use vulkan::{
    ash::vk, utils::create_gpu_only_image_from_data, VkContext, VkImage, VkImageView, VkSampler,
};

pub const TEXTURE_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/textures/texture.png");

const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Sampled texture bound at binding 1 of the fragment shader.
///
/// Fields are declared in destruction order.
pub struct Texture {
    pub sampler: VkSampler,
    pub view: VkImageView,
    _image: VkImage,
}

impl Texture {
    pub fn from_file(context: &VkContext, path: impl AsRef<Path>) -> Result<Self> {
        let (width, height, pixels) = load_rgba(path)?;
        log::debug!("Uploading {width}x{height} texture");

        let image =
            create_gpu_only_image_from_data(context, TEXTURE_FORMAT, width, height, &pixels)?;
        let view = image.create_image_view(vk::ImageAspectFlags::COLOR)?;

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(context.max_sampler_anisotropy())
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(0.0);
        let sampler = context.create_sampler(&sampler_info)?;

        Ok(Self {
            sampler,
            view,
            _image: image,
        })
    }
}

fn load_rgba(path: impl AsRef<Path>) -> Result<(u32, u32, Vec<u8>)> {
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("Failed to load texture {}", path.display()))?;

    Ok(rgba_pixels(image))
}

/// Width, height and tightly packed RGBA8 pixels, whatever the source layout.
fn rgba_pixels(image: DynamicImage) -> (u32, u32, Vec<u8>) {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    (width, height, rgba.into_raw())
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;

    #[test]
    fn rgb_images_gain_an_opaque_alpha_channel() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 0, 255]));

        let (width, height, pixels) = rgba_pixels(DynamicImage::ImageRgb8(rgb));

        assert_eq!((width, height), (2, 1));
        assert_eq!(pixels, vec![255, 0, 0, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn bundled_texture_decodes_to_rgba() {
        let (width, height, pixels) = load_rgba(TEXTURE_PATH).unwrap();

        assert!(width > 0 && height > 0);
        assert_eq!(pixels.len(), (width * height * 4) as usize);
    }

    #[test]
    fn missing_texture_names_the_path() {
        let err = load_rgba("textures/does_not_exist.png").unwrap_err();

        assert!(err.to_string().contains("does_not_exist.png"));
    }
}
