use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use gpu_allocator::{
    vulkan::{Allocation, AllocationCreateDesc, Allocator, AllocatorCreateDesc},
    AllocatorDebugSettings,
};

use crate::{device::VkDevice, instance::VkInstance, physical_device::VkPhysicalDevice};

/// Shared memory allocator.
///
/// Holds on to the device so that the allocator's memory blocks are released
/// before the device itself is destroyed.
pub struct VkAllocator {
    inner: Mutex<Allocator>,
    _device: Arc<VkDevice>,
}

impl VkAllocator {
    pub(crate) fn new(
        instance: &VkInstance,
        physical_device: &VkPhysicalDevice,
        device: Arc<VkDevice>,
    ) -> Result<Self> {
        log::debug!("Creating gpu memory allocator");
        let inner = Allocator::new(&AllocatorCreateDesc {
            instance: instance.inner.clone(),
            device: device.inner.clone(),
            physical_device: physical_device.inner,
            debug_settings: AllocatorDebugSettings {
                log_leaks_on_shutdown: true,
                ..Default::default()
            },
            buffer_device_address: false,
        })?;

        Ok(Self {
            inner: Mutex::new(inner),
            _device: device,
        })
    }

    fn lock(&self) -> Result<MutexGuard<Allocator>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("Gpu allocator lock is poisoned"))
    }

    pub(crate) fn allocate(&self, desc: &AllocationCreateDesc) -> Result<Allocation> {
        Ok(self.lock()?.allocate(desc)?)
    }

    pub(crate) fn free(&self, allocation: Allocation) -> Result<()> {
        self.lock()?.free(allocation)?;

        Ok(())
    }
}
