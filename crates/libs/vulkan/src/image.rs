use std::sync::Arc;

use anyhow::{bail, Result};
use ash::vk;
use gpu_allocator::{
    vulkan::{Allocation, AllocationCreateDesc},
    MemoryLocation,
};

use crate::{allocator::VkAllocator, device::VkDevice, VkContext};

pub struct VkImage {
    device: Arc<VkDevice>,
    allocator: Arc<VkAllocator>,
    pub(crate) inner: vk::Image,
    allocation: Option<Allocation>,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
}

impl VkImage {
    pub(crate) fn new_2d(
        device: Arc<VkDevice>,
        allocator: Arc<VkAllocator>,
        usage: vk::ImageUsageFlags,
        memory_location: MemoryLocation,
        format: vk::Format,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let extent = vk::Extent3D {
            width,
            height,
            depth: 1,
        };

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(extent)
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let inner = unsafe { device.inner.create_image(&image_info, None)? };
        let requirements = unsafe { device.inner.get_image_memory_requirements(inner) };

        let allocation = allocator.allocate(&AllocationCreateDesc {
            name: "image",
            requirements,
            location: memory_location,
            linear: false,
        })?;

        unsafe {
            device
                .inner
                .bind_image_memory(inner, allocation.memory(), allocation.offset())?
        };

        Ok(Self {
            device,
            allocator,
            inner,
            allocation: Some(allocation),
            format,
            extent,
        })
    }

    pub fn create_image_view(&self, aspect_mask: vk::ImageAspectFlags) -> Result<VkImageView> {
        VkImageView::new(self.device.clone(), self.inner, self.format, aspect_mask)
    }
}

impl VkContext {
    pub fn create_image(
        &self,
        usage: vk::ImageUsageFlags,
        memory_location: MemoryLocation,
        format: vk::Format,
        width: u32,
        height: u32,
    ) -> Result<VkImage> {
        VkImage::new_2d(
            self.device.clone(),
            self.allocator.clone(),
            usage,
            memory_location,
            format,
            width,
            height,
        )
    }
}

impl Drop for VkImage {
    fn drop(&mut self) {
        unsafe { self.device.inner.destroy_image(self.inner, None) };
        if let Some(allocation) = self.allocation.take() {
            if let Err(err) = self.allocator.free(allocation) {
                log::error!("Failed to free image memory: {err:?}");
            }
        }
    }
}

/// Access masks and pipeline stages for an image layout change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_access_mask: vk::AccessFlags,
    pub dst_access_mask: vk::AccessFlags,
    pub src_stage_mask: vk::PipelineStageFlags,
    pub dst_stage_mask: vk::PipelineStageFlags,
}

impl LayoutTransition {
    /// Only the transitions of a staged texture upload are supported.
    pub fn new(old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> Result<Self> {
        let (src_access_mask, dst_access_mask, src_stage_mask, dst_stage_mask) =
            match (old_layout, new_layout) {
                (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
                    vk::AccessFlags::empty(),
                    vk::AccessFlags::TRANSFER_WRITE,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::PipelineStageFlags::TRANSFER,
                ),
                (
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                ) => (
                    vk::AccessFlags::TRANSFER_WRITE,
                    vk::AccessFlags::SHADER_READ,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::FRAGMENT_SHADER,
                ),
                _ => bail!("Unsupported layout transition from {old_layout:?} to {new_layout:?}"),
            };

        Ok(Self {
            old_layout,
            new_layout,
            src_access_mask,
            dst_access_mask,
            src_stage_mask,
            dst_stage_mask,
        })
    }
}

pub struct VkImageView {
    device: Arc<VkDevice>,
    pub(crate) inner: vk::ImageView,
}

impl VkImageView {
    /// Also used for swapchain images, which are owned by the swapchain.
    pub(crate) fn new(
        device: Arc<VkDevice>,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<Self> {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let inner = unsafe { device.inner.create_image_view(&view_info, None)? };

        Ok(Self { device, inner })
    }
}

impl Drop for VkImageView {
    fn drop(&mut self) {
        unsafe { self.device.inner.destroy_image_view(self.inner, None) };
    }
}
