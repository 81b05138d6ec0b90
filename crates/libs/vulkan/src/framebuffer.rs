use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::{device::VkDevice, VkContext, VkImageView, VkRenderPass};

/// Binds one swapchain color view and the shared depth view to a color + depth render pass.
pub struct VkFramebuffer {
    device: Arc<VkDevice>,
    pub(crate) inner: vk::Framebuffer,
    pub extent: vk::Extent2D,
}

impl VkFramebuffer {
    pub(crate) fn new(
        device: Arc<VkDevice>,
        render_pass: &VkRenderPass,
        color_view: &VkImageView,
        depth_view: &VkImageView,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        // Order matches the render pass attachments
        let attachments = [color_view.inner, depth_view.inner];
        let create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass.inner)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let inner = unsafe { device.inner.create_framebuffer(&create_info, None)? };

        Ok(Self {
            device,
            inner,
            extent,
        })
    }

    pub fn render_area(&self) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent,
        }
    }
}

impl VkContext {
    pub fn create_framebuffer(
        &self,
        render_pass: &VkRenderPass,
        color_view: &VkImageView,
        depth_view: &VkImageView,
        extent: vk::Extent2D,
    ) -> Result<VkFramebuffer> {
        VkFramebuffer::new(
            self.device.clone(),
            render_pass,
            color_view,
            depth_view,
            extent,
        )
    }
}

impl Drop for VkFramebuffer {
    fn drop(&mut self) {
        unsafe { self.device.inner.destroy_framebuffer(self.inner, None) };
    }
}
