use std::{ffi::CString, os::raw::c_char, sync::Arc};

use anyhow::Result;
use ash::{vk, Device};

use crate::{
    instance::VkInstance,
    physical_device::VkPhysicalDevice,
    queue::{VkQueue, VkQueueFamily},
};

pub struct VkDevice {
    pub(crate) inner: Device,
    pub(crate) instance: Arc<VkInstance>,
}

impl VkDevice {
    pub(crate) fn new(
        instance: Arc<VkInstance>,
        physical_device: &VkPhysicalDevice,
        queue_families: &[VkQueueFamily],
        required_extensions: &[&str],
    ) -> Result<Self> {
        log::debug!("Creating vulkan device");
        let queue_priorities = [1.0f32];

        let queue_create_infos = {
            let mut indices = queue_families.iter().map(|f| f.index).collect::<Vec<_>>();
            indices.sort_unstable();
            indices.dedup();

            indices
                .iter()
                .map(|index| {
                    vk::DeviceQueueCreateInfo::builder()
                        .queue_family_index(*index)
                        .queue_priorities(&queue_priorities)
                        .build()
                })
                .collect::<Vec<_>>()
        };

        let device_extensions = required_extensions
            .iter()
            .map(|e| CString::new(*e))
            .collect::<Result<Vec<_>, _>>()?;
        let device_extensions_ptrs = device_extensions
            .iter()
            .map(|e| e.as_ptr())
            .collect::<Vec<*const c_char>>();

        let features = vk::PhysicalDeviceFeatures::builder().sampler_anisotropy(true);

        let device_create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extensions_ptrs)
            .enabled_features(&features);

        let inner = unsafe {
            instance
                .inner
                .create_device(physical_device.inner, &device_create_info, None)?
        };

        Ok(Self { inner, instance })
    }

    pub fn get_queue(self: &Arc<Self>, queue_family: VkQueueFamily, queue_index: u32) -> VkQueue {
        let inner = unsafe { self.inner.get_device_queue(queue_family.index, queue_index) };
        VkQueue::new(self.clone(), queue_family, inner)
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.inner.device_wait_idle()? };

        Ok(())
    }
}

impl Drop for VkDevice {
    fn drop(&mut self) {
        unsafe {
            self.inner.destroy_device(None);
        }
    }
}
