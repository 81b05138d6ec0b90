use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::{
    device::VkDevice, LayoutTransition, VkBuffer, VkContext, VkDescriptorSet, VkFramebuffer,
    VkImage, VkPipeline, VkPipelineLayout, VkQueueFamily, VkRenderPass,
};

pub struct VkCommandPool {
    device: Arc<VkDevice>,
    pub(crate) inner: vk::CommandPool,
}

impl VkCommandPool {
    pub(crate) fn new(
        device: Arc<VkDevice>,
        queue_family: VkQueueFamily,
        flags: Option<vk::CommandPoolCreateFlags>,
    ) -> Result<Self> {
        let flags = flags.unwrap_or_else(vk::CommandPoolCreateFlags::empty);

        let command_pool_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(queue_family.index)
            .flags(flags);
        let inner = unsafe { device.inner.create_command_pool(&command_pool_info, None)? };

        Ok(Self { device, inner })
    }

    pub fn allocate_command_buffers(
        &self,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> Result<Vec<VkCommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.inner)
            .level(level)
            .command_buffer_count(count);

        let buffers = unsafe { self.device.inner.allocate_command_buffers(&allocate_info)? };
        let buffers = buffers
            .into_iter()
            .map(|inner| VkCommandBuffer {
                device: self.device.clone(),
                inner,
            })
            .collect();

        Ok(buffers)
    }

    pub fn allocate_command_buffer(&self, level: vk::CommandBufferLevel) -> Result<VkCommandBuffer> {
        let mut buffers = self.allocate_command_buffers(level, 1)?;

        Ok(buffers.remove(0))
    }

    pub fn free_command_buffers(&self, buffers: &[VkCommandBuffer]) {
        let buffs = buffers.iter().map(|b| b.inner).collect::<Vec<_>>();
        unsafe { self.device.inner.free_command_buffers(self.inner, &buffs) };
    }

    pub fn free_command_buffer(&self, buffer: &VkCommandBuffer) {
        self.free_command_buffers(std::slice::from_ref(buffer));
    }
}

impl VkContext {
    pub fn create_command_pool(
        &self,
        queue_family: VkQueueFamily,
        flags: Option<vk::CommandPoolCreateFlags>,
    ) -> Result<VkCommandPool> {
        VkCommandPool::new(self.device.clone(), queue_family, flags)
    }
}

impl Drop for VkCommandPool {
    fn drop(&mut self) {
        unsafe { self.device.inner.destroy_command_pool(self.inner, None) };
    }
}

/// Command buffers are released together with the pool they come from.
pub struct VkCommandBuffer {
    device: Arc<VkDevice>,
    pub(crate) inner: vk::CommandBuffer,
}

impl VkCommandBuffer {
    pub fn begin(&self, flags: Option<vk::CommandBufferUsageFlags>) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(flags.unwrap_or_else(vk::CommandBufferUsageFlags::empty));
        unsafe {
            self.device
                .inner
                .begin_command_buffer(self.inner, &begin_info)?
        };

        Ok(())
    }

    pub fn end(&self) -> Result<()> {
        unsafe { self.device.inner.end_command_buffer(self.inner)? };

        Ok(())
    }

    pub fn reset(&self) -> Result<()> {
        unsafe {
            self.device
                .inner
                .reset_command_buffer(self.inner, vk::CommandBufferResetFlags::empty())?
        };

        Ok(())
    }

    pub fn begin_render_pass(
        &self,
        render_pass: &VkRenderPass,
        framebuffer: &VkFramebuffer,
        clear_values: &[vk::ClearValue],
    ) {
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass.inner)
            .framebuffer(framebuffer.inner)
            .render_area(framebuffer.render_area())
            .clear_values(clear_values);

        unsafe {
            self.device.inner.cmd_begin_render_pass(
                self.inner,
                &begin_info,
                vk::SubpassContents::INLINE,
            )
        };
    }

    pub fn end_render_pass(&self) {
        unsafe { self.device.inner.cmd_end_render_pass(self.inner) };
    }

    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: &VkPipeline) {
        unsafe {
            self.device
                .inner
                .cmd_bind_pipeline(self.inner, bind_point, pipeline.inner)
        }
    }

    pub fn bind_vertex_buffer(&self, vertex_buffer: &VkBuffer) {
        unsafe {
            self.device
                .inner
                .cmd_bind_vertex_buffers(self.inner, 0, &[vertex_buffer.inner], &[0])
        };
    }

    pub fn bind_index_buffer(&self, index_buffer: &VkBuffer, index_type: vk::IndexType) {
        unsafe {
            self.device
                .inner
                .cmd_bind_index_buffer(self.inner, index_buffer.inner, 0, index_type)
        };
    }

    pub fn bind_descriptor_sets(
        &self,
        bind_point: vk::PipelineBindPoint,
        layout: &VkPipelineLayout,
        first_set: u32,
        sets: &[&VkDescriptorSet],
    ) {
        let sets = sets.iter().map(|s| s.inner).collect::<Vec<_>>();
        unsafe {
            self.device.inner.cmd_bind_descriptor_sets(
                self.inner,
                bind_point,
                layout.inner,
                first_set,
                &sets,
                &[],
            )
        }
    }

    pub fn set_viewport(&self, width: u32, height: u32) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: width as _,
            height: height as _,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        unsafe {
            self.device
                .inner
                .cmd_set_viewport(self.inner, 0, std::slice::from_ref(&viewport))
        };
    }

    pub fn set_scissor(&self, width: u32, height: u32) {
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D { width, height },
        };

        unsafe {
            self.device
                .inner
                .cmd_set_scissor(self.inner, 0, std::slice::from_ref(&scissor))
        };
    }

    pub fn draw_indexed(&self, index_count: u32) {
        unsafe {
            self.device
                .inner
                .cmd_draw_indexed(self.inner, index_count, 1, 0, 0, 0)
        };
    }

    /// Moves the single color mip and layer of `image` through `transition`.
    pub fn transition_image_layout(&self, image: &VkImage, transition: &LayoutTransition) {
        let barrier = vk::ImageMemoryBarrier::builder()
            .src_access_mask(transition.src_access_mask)
            .dst_access_mask(transition.dst_access_mask)
            .old_layout(transition.old_layout)
            .new_layout(transition.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image.inner)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            self.device.inner.cmd_pipeline_barrier(
                self.inner,
                transition.src_stage_mask,
                transition.dst_stage_mask,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                std::slice::from_ref(&barrier),
            )
        };
    }

    /// `dst_image` must be in `TRANSFER_DST_OPTIMAL` layout.
    pub fn copy_buffer_to_image(&self, src_buffer: &VkBuffer, dst_image: &VkImage) {
        let region = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(dst_image.extent);

        unsafe {
            self.device.inner.cmd_copy_buffer_to_image(
                self.inner,
                src_buffer.inner,
                dst_image.inner,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(&region),
            )
        };
    }

    pub fn copy_buffer(&self, src_buffer: &VkBuffer, dst_buffer: &VkBuffer) {
        let region = vk::BufferCopy::builder()
            .src_offset(0)
            .dst_offset(0)
            .size(src_buffer.size);

        unsafe {
            self.device.inner.cmd_copy_buffer(
                self.inner,
                src_buffer.inner,
                dst_buffer.inner,
                std::slice::from_ref(&region),
            )
        };
    }
}
