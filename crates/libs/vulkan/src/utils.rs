use std::mem::size_of_val;

use anyhow::Result;
use ash::vk;
use gpu_allocator::MemoryLocation;

use crate::{LayoutTransition, VkBuffer, VkCommandBuffer, VkContext, VkImage, VkSubmitInfo};

impl VkContext {
    /// Records `executor` into a throwaway command buffer, submits it on the
    /// graphics queue and blocks until it has executed.
    ///
    /// The command buffer is freed whether or not submission succeeds.
    pub fn execute_one_time_commands<R, F: FnOnce(&VkCommandBuffer) -> R>(
        &self,
        executor: F,
    ) -> Result<R> {
        let command_buffer = self
            .command_pool
            .allocate_command_buffer(vk::CommandBufferLevel::PRIMARY)?;

        run_then_release(
            command_buffer,
            |command_buffer| self.record_and_submit(command_buffer, executor),
            |command_buffer| self.command_pool.free_command_buffer(command_buffer),
        )
    }

    fn record_and_submit<R, F: FnOnce(&VkCommandBuffer) -> R>(
        &self,
        command_buffer: &VkCommandBuffer,
        executor: F,
    ) -> Result<R> {
        command_buffer.begin(Some(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT))?;
        let executor_result = executor(command_buffer);
        command_buffer.end()?;

        let fence = self.create_fence(None)?;
        self.graphics_queue
            .submit(&VkSubmitInfo::new(command_buffer), Some(&fence))?;
        fence.wait(None)?;

        Ok(executor_result)
    }
}

/// Runs `run` on `handle`, then `release`s it on success and on failure alike.
fn run_then_release<H, R>(
    handle: H,
    run: impl FnOnce(&H) -> Result<R>,
    release: impl FnOnce(&H),
) -> Result<R> {
    let result = run(&handle);
    release(&handle);
    result
}

fn create_staging_buffer<T: Copy>(context: &VkContext, data: &[T]) -> Result<VkBuffer> {
    let staging_buffer = context.create_buffer(
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryLocation::CpuToGpu,
        size_of_val(data) as _,
    )?;
    staging_buffer.copy_data_to_buffer(data)?;

    Ok(staging_buffer)
}

/// Uploads `data` into a new device local buffer through a staging buffer.
pub fn create_gpu_only_buffer_from_data<T: Copy>(
    context: &VkContext,
    usage: vk::BufferUsageFlags,
    data: &[T],
) -> Result<VkBuffer> {
    let staging_buffer = create_staging_buffer(context, data)?;

    let buffer = context.create_buffer(
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        MemoryLocation::GpuOnly,
        staging_buffer.size,
    )?;

    context.execute_one_time_commands(|cmd_buffer| {
        cmd_buffer.copy_buffer(&staging_buffer, &buffer);
    })?;

    Ok(buffer)
}

/// Uploads tightly packed `pixels` into a new sampled image and leaves it in
/// `SHADER_READ_ONLY_OPTIMAL` layout.
pub fn create_gpu_only_image_from_data(
    context: &VkContext,
    format: vk::Format,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<VkImage> {
    let to_transfer_dst = LayoutTransition::new(
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    )?;
    let to_shader_read = LayoutTransition::new(
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    )?;

    let staging_buffer = create_staging_buffer(context, pixels)?;

    let image = context.create_image(
        vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        MemoryLocation::GpuOnly,
        format,
        width,
        height,
    )?;

    context.execute_one_time_commands(|cmd_buffer| {
        cmd_buffer.transition_image_layout(&image, &to_transfer_dst);
        cmd_buffer.copy_buffer_to_image(&staging_buffer, &image);
        cmd_buffer.transition_image_layout(&image, &to_shader_read);
    })?;

    Ok(image)
}
