use std::sync::Arc;

use anyhow::Result;
use ash::{extensions::khr::Surface, vk};
use raw_window_handle::HasRawWindowHandle;

use crate::instance::VkInstance;

pub struct VkSurface {
    pub(crate) inner: Surface,
    pub(crate) surface_khr: vk::SurfaceKHR,
    _instance: Arc<VkInstance>,
}

impl VkSurface {
    pub(crate) fn new(instance: Arc<VkInstance>, window: &dyn HasRawWindowHandle) -> Result<Self> {
        log::debug!("Creating vulkan surface");
        let inner = Surface::new(&instance.entry, &instance.inner);
        let surface_khr = unsafe {
            ash_window::create_surface(&instance.entry, &instance.inner, window, None)?
        };

        Ok(Self {
            inner,
            surface_khr,
            _instance: instance,
        })
    }
}

impl Drop for VkSurface {
    fn drop(&mut self) {
        unsafe {
            self.inner.destroy_surface(self.surface_khr, None);
        }
    }
}
