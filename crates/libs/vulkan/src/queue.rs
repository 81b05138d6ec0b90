use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::{device::VkDevice, VkCommandBuffer, VkFence, VkSemaphore};

#[derive(Debug, Clone, Copy)]
pub struct VkQueueFamily {
    pub index: u32,
    flags: vk::QueueFlags,
    queue_count: u32,
    supports_present: bool,
}

impl VkQueueFamily {
    pub(crate) fn new(
        index: u32,
        properties: vk::QueueFamilyProperties,
        supports_present: bool,
    ) -> Self {
        Self {
            index,
            flags: properties.queue_flags,
            queue_count: properties.queue_count,
            supports_present,
        }
    }

    pub fn supports_graphics(&self) -> bool {
        self.flags.contains(vk::QueueFlags::GRAPHICS) && self.queue_count > 0
    }

    pub fn supports_present(&self) -> bool {
        self.supports_present && self.queue_count > 0
    }
}

/// One batch for [`VkQueue::submit`].
///
/// Each wait semaphore comes with the stage it gates.
pub struct VkSubmitInfo<'a> {
    pub command_buffer: &'a VkCommandBuffer,
    pub wait: Option<(&'a VkSemaphore, vk::PipelineStageFlags)>,
    pub signal: Option<&'a VkSemaphore>,
}

impl<'a> VkSubmitInfo<'a> {
    pub fn new(command_buffer: &'a VkCommandBuffer) -> Self {
        Self {
            command_buffer,
            wait: None,
            signal: None,
        }
    }

    pub fn wait(mut self, semaphore: &'a VkSemaphore, stage: vk::PipelineStageFlags) -> Self {
        self.wait = Some((semaphore, stage));
        self
    }

    pub fn signal(mut self, semaphore: &'a VkSemaphore) -> Self {
        self.signal = Some(semaphore);
        self
    }
}

pub struct VkQueue {
    device: Arc<VkDevice>,
    pub family: VkQueueFamily,
    pub(crate) inner: vk::Queue,
}

impl VkQueue {
    pub(crate) fn new(device: Arc<VkDevice>, family: VkQueueFamily, inner: vk::Queue) -> Self {
        Self {
            device,
            family,
            inner,
        }
    }

    /// Submits `info`, signaling `fence` once the batch completes.
    pub fn submit(&self, info: &VkSubmitInfo, fence: Option<&VkFence>) -> Result<()> {
        let command_buffers = [info.command_buffer.inner];
        let (wait_semaphores, wait_stages): (Vec<_>, Vec<_>) = info
            .wait
            .iter()
            .map(|(semaphore, stage)| (semaphore.inner, *stage))
            .unzip();
        let signal_semaphores = info.signal.iter().map(|s| s.inner).collect::<Vec<_>>();

        let submit_info = vk::SubmitInfo::builder()
            .command_buffers(&command_buffers)
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device.inner.queue_submit(
                self.inner,
                std::slice::from_ref(&submit_info),
                fence.map_or_else(vk::Fence::null, |f| f.inner),
            )?
        };

        Ok(())
    }
}
