use std::{sync::Arc, time::Duration};

use anyhow::Result;
use vulkan::{
    ash::vk, VkCommandBuffer, VkCommandPool, VkContext, VkFence, VkSemaphore, VkSubmitInfo,
};

use crate::{config::timeout_nanos, FrameDevice};

/// [`FrameDevice`] backed by the context's device and graphics queue.
pub struct VkFrameDevice {
    command_pool: VkCommandPool,
    context: Arc<VkContext>,
}

impl VkFrameDevice {
    pub fn new(context: Arc<VkContext>) -> Result<Self> {
        // Slot command buffers are reset individually every frame
        let command_pool = context.create_command_pool(
            context.graphics_queue.family,
            Some(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER),
        )?;

        Ok(Self {
            command_pool,
            context,
        })
    }
}

impl FrameDevice for VkFrameDevice {
    type Fence = VkFence;
    type Semaphore = VkSemaphore;
    type CommandBuffer = VkCommandBuffer;

    fn create_fence(&self, signaled: bool) -> Result<VkFence> {
        let flags = signaled.then(|| vk::FenceCreateFlags::SIGNALED);
        self.context.create_fence(flags)
    }

    fn create_semaphore(&self) -> Result<VkSemaphore> {
        self.context.create_semaphore()
    }

    fn allocate_command_buffer(&self) -> Result<VkCommandBuffer> {
        self.command_pool
            .allocate_command_buffer(vk::CommandBufferLevel::PRIMARY)
    }

    fn wait_for_fence(&self, fence: &VkFence, timeout: Option<Duration>) -> Result<bool> {
        fence.wait(Some(timeout_nanos(timeout)))
    }

    fn reset_fence(&self, fence: &VkFence) -> Result<()> {
        fence.reset()
    }

    fn submit(
        &self,
        command_buffer: &VkCommandBuffer,
        wait: &VkSemaphore,
        signal: &VkSemaphore,
        fence: &VkFence,
    ) -> Result<()> {
        let info = VkSubmitInfo::new(command_buffer)
            .wait(wait, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .signal(signal);
        self.context.graphics_queue.submit(&info, Some(fence))
    }

    fn wait_idle(&self) -> Result<()> {
        self.context.device_wait_idle()
    }
}
