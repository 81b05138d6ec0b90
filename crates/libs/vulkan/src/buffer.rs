use std::{
    mem::{align_of, size_of_val},
    sync::Arc,
};

use anyhow::{anyhow, Result};
use ash::vk;
use gpu_allocator::{
    vulkan::{Allocation, AllocationCreateDesc},
    MemoryLocation,
};

use crate::{allocator::VkAllocator, device::VkDevice, VkContext};

pub struct VkBuffer {
    device: Arc<VkDevice>,
    allocator: Arc<VkAllocator>,
    pub(crate) inner: vk::Buffer,
    allocation: Option<Allocation>,
    pub size: vk::DeviceSize,
}

impl VkBuffer {
    pub(crate) fn new(
        device: Arc<VkDevice>,
        allocator: Arc<VkAllocator>,
        usage: vk::BufferUsageFlags,
        memory_location: MemoryLocation,
        size: vk::DeviceSize,
    ) -> Result<Self> {
        let create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let inner = unsafe { device.inner.create_buffer(&create_info, None)? };

        let requirements = unsafe { device.inner.get_buffer_memory_requirements(inner) };
        let allocation = allocator.allocate(&AllocationCreateDesc {
            name: "buffer",
            requirements,
            location: memory_location,
            linear: true,
        })?;

        unsafe {
            device
                .inner
                .bind_buffer_memory(inner, allocation.memory(), allocation.offset())?
        };

        Ok(Self {
            device,
            allocator,
            inner,
            allocation: Some(allocation),
            size,
        })
    }

    /// Writes `data` at the start of a host visible buffer.
    pub fn copy_data_to_buffer<T: Copy>(&self, data: &[T]) -> Result<()> {
        let data_size = size_of_val(data) as vk::DeviceSize;
        if data_size > self.size {
            return Err(anyhow!(
                "Cannot copy {data_size} bytes into a buffer of {} bytes",
                self.size
            ));
        }

        let data_ptr = self
            .allocation
            .as_ref()
            .and_then(Allocation::mapped_ptr)
            .ok_or_else(|| anyhow!("Buffer memory is not host visible"))?
            .as_ptr();

        unsafe {
            let mut align = ash::util::Align::new(data_ptr, align_of::<T>() as _, data_size);
            align.copy_from_slice(data);
        };

        Ok(())
    }
}

impl VkContext {
    pub fn create_buffer(
        &self,
        usage: vk::BufferUsageFlags,
        memory_location: MemoryLocation,
        size: vk::DeviceSize,
    ) -> Result<VkBuffer> {
        VkBuffer::new(
            self.device.clone(),
            self.allocator.clone(),
            usage,
            memory_location,
            size,
        )
    }
}

impl Drop for VkBuffer {
    fn drop(&mut self) {
        unsafe { self.device.inner.destroy_buffer(self.inner, None) };
        if let Some(allocation) = self.allocation.take() {
            if let Err(err) = self.allocator.free(allocation) {
                log::error!("Failed to free buffer memory: {err:?}");
            }
        }
    }
}
