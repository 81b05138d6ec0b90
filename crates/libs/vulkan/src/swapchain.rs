use std::sync::Arc;

use anyhow::{anyhow, Result};
use ash::{extensions::khr::Swapchain, vk};

use crate::{device::VkDevice, VkContext, VkImageView, VkQueue, VkSemaphore};

const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

pub struct AcquiredImage {
    pub index: u32,
    pub is_suboptimal: bool,
}

pub struct VkSwapchain {
    _device: Arc<VkDevice>,
    inner: Swapchain,
    swapchain_khr: vk::SwapchainKHR,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub present_mode: vk::PresentModeKHR,
    pub images: Vec<vk::Image>,
    pub views: Vec<VkImageView>,
}

impl VkSwapchain {
    pub fn new(context: &VkContext, width: u32, height: u32) -> Result<Self> {
        Self::create(context, width, height, vk::SwapchainKHR::null())
    }

    /// Builds a replacement swapchain, handing this one over as the old swapchain.
    ///
    /// `self` stays valid until dropped by the caller.
    pub fn recreate(&self, context: &VkContext, width: u32, height: u32) -> Result<Self> {
        Self::create(context, width, height, self.swapchain_khr)
    }

    fn create(
        context: &VkContext,
        width: u32,
        height: u32,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Self> {
        log::debug!("Creating vulkan swapchain");
        let device = context.device.clone();

        // Surface support is queried again for every swapchain
        let capabilities = context.get_surface_capabilities()?;
        let formats = context.get_surface_formats()?;
        let present_modes = context.get_surface_present_modes()?;

        let format = choose_surface_format(&formats)
            .ok_or_else(|| anyhow!("Surface does not report any format"))?;
        log::debug!("Swapchain format: {format:?}");

        let present_mode = choose_present_mode(&present_modes);
        log::debug!("Swapchain present mode: {present_mode:?}");

        let extent = choose_extent(&capabilities, width, height);
        log::debug!("Swapchain extent: {extent:?}");

        let image_count = choose_image_count(&capabilities);
        log::debug!("Swapchain image count: {image_count:?}");

        let families_indices = [
            context.graphics_queue.family.index,
            context.present_queue.family.index,
        ];
        let create_info = {
            let mut builder = vk::SwapchainCreateInfoKHR::builder()
                .surface(context.surface.surface_khr)
                .min_image_count(image_count)
                .image_format(format.format)
                .image_color_space(format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT);

            builder = if families_indices[0] != families_indices[1] {
                builder
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&families_indices)
            } else {
                builder.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            builder
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain)
        };

        let inner = Swapchain::new(&device.instance.inner, &device.inner);
        let swapchain_khr = unsafe { inner.create_swapchain(&create_info, None)? };

        // Swapchain images and image views
        let images = unsafe { inner.get_swapchain_images(swapchain_khr)? };
        let views = images
            .iter()
            .map(|image| {
                VkImageView::new(
                    device.clone(),
                    *image,
                    format.format,
                    vk::ImageAspectFlags::COLOR,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            _device: device,
            inner,
            swapchain_khr,
            extent,
            format: format.format,
            present_mode,
            images,
            views,
        })
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Errors carry the raw [`vk::Result`], including `ERROR_OUT_OF_DATE_KHR`,
    /// `TIMEOUT` and `NOT_READY`, so callers can downcast them.
    pub fn acquire_next_image(
        &self,
        timeout: u64,
        semaphore: &VkSemaphore,
    ) -> Result<AcquiredImage> {
        let (index, is_suboptimal) = unsafe {
            self.inner.acquire_next_image(
                self.swapchain_khr,
                timeout,
                semaphore.inner,
                vk::Fence::null(),
            )?
        };

        Ok(AcquiredImage {
            index,
            is_suboptimal,
        })
    }

    /// Returns `true` when the swapchain is suboptimal for the surface.
    pub fn queue_present(
        &self,
        image_index: u32,
        wait_semaphores: &[&VkSemaphore],
        queue: &VkQueue,
    ) -> Result<bool> {
        let swapchains = [self.swapchain_khr];
        let images_indices = [image_index];
        let wait_semaphores = wait_semaphores.iter().map(|s| s.inner).collect::<Vec<_>>();

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&images_indices);

        let result = unsafe { self.inner.queue_present(queue.inner, &present_info)? };

        Ok(result)
    }
}

impl Drop for VkSwapchain {
    fn drop(&mut self) {
        self.views.clear();
        unsafe {
            self.inner.destroy_swapchain(self.swapchain_khr, None);
        }
    }
}

/// Prefers sRGB BGRA8, otherwise takes whatever the surface lists first.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    // A single undefined entry means the surface has no preference
    if formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED {
        return Some(PREFERRED_SURFACE_FORMAT);
    }

    formats
        .iter()
        .find(|f| {
            f.format == PREFERRED_SURFACE_FORMAT.format
                && f.color_space == PREFERRED_SURFACE_FORMAT.color_space
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when available, FIFO otherwise. FIFO support is mandatory.
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's current extent, unless it lets the swapchain decide, in which
/// case the framebuffer size is clamped to the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != std::u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: width.min(max.width).max(min.width),
        height: height.min(max.height).max(min.height),
    }
}

/// One image above the minimum. A maximum of 0 means unbounded.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn capabilities(
        current: (u32, u32),
        min: (u32, u32),
        max: (u32, u32),
        image_counts: (u32, u32),
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: min.0,
                height: min.1,
            },
            max_image_extent: vk::Extent2D {
                width: max.0,
                height: max.1,
            },
            min_image_count: image_counts.0,
            max_image_count: image_counts.1,
            ..Default::default()
        }
    }

    #[test]
    fn surface_format_prefers_srgb_bgra() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let chosen = choose_surface_format(&formats).unwrap();

        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn surface_format_falls_back_to_first() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let chosen = choose_surface_format(&formats).unwrap();

        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn surface_format_undefined_means_any() {
        let formats = [format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR)];

        let chosen = choose_surface_format(&formats).unwrap();

        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn surface_format_none_when_empty() {
        assert!(choose_surface_format(&[]).is_none());
    }

    #[test]
    fn present_mode_prefers_mailbox() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);

        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_uses_current_extent_when_defined() {
        let caps = capabilities((1024, 768), (1, 1), (4096, 4096), (2, 3));

        let extent = choose_extent(&caps, 800, 800);

        assert_eq!((extent.width, extent.height), (1024, 768));
    }

    #[test]
    fn extent_clamps_framebuffer_size_when_undefined() {
        let caps = capabilities((u32::MAX, u32::MAX), (100, 100), (1000, 500), (2, 3));

        let extent = choose_extent(&caps, 2000, 50);

        assert_eq!((extent.width, extent.height), (1000, 100));
    }

    #[test]
    fn image_count_is_one_above_minimum() {
        let caps = capabilities((800, 800), (1, 1), (800, 800), (2, 8));
        assert_eq!(choose_image_count(&caps), 3);
    }

    #[test]
    fn image_count_respects_maximum() {
        let caps = capabilities((800, 800), (1, 1), (800, 800), (3, 3));
        assert_eq!(choose_image_count(&caps), 3);
    }

    #[test]
    fn image_count_unbounded_when_maximum_is_zero() {
        let caps = capabilities((800, 800), (1, 1), (800, 800), (4, 0));
        assert_eq!(choose_image_count(&caps), 5);
    }
}
