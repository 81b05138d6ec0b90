use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use ash::{vk, Entry};
use raw_window_handle::HasRawWindowHandle;

use crate::{
    allocator::VkAllocator, device::VkDevice, instance::VkInstance,
    physical_device::VkPhysicalDevice, surface::VkSurface, VkCommandPool,
    VkQueue, VkVersion,
};

const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

pub struct VkContext {
    pub(crate) command_pool: VkCommandPool,
    pub(crate) allocator: Arc<VkAllocator>,
    pub present_queue: VkQueue,
    pub graphics_queue: VkQueue,
    pub(crate) device: Arc<VkDevice>,
    pub(crate) physical_device: VkPhysicalDevice,
    pub(crate) surface: VkSurface,
    pub(crate) instance: Arc<VkInstance>,
}

impl VkContext {
    pub fn new(
        window: &dyn HasRawWindowHandle,
        api_version: VkVersion,
        app_name: Option<&str>,
        required_extensions: &[&str],
    ) -> Result<Self> {
        // Vulkan instance
        let entry = unsafe { Entry::load()? };
        let instance = Arc::new(VkInstance::new(
            entry,
            window,
            api_version,
            app_name.unwrap_or("Vulkan"),
        )?);

        // Vulkan surface
        let surface = VkSurface::new(instance.clone(), window)?;

        // Physical device
        let physical_device = select_physical_device(&instance, &surface, required_extensions)?;
        let graphics_queue_family = physical_device
            .graphics_family()
            .ok_or_else(|| anyhow!("Selected device has no graphics queue family"))?;
        let present_queue_family = physical_device
            .present_family()
            .ok_or_else(|| anyhow!("Selected device has no present queue family"))?;

        // Vulkan device
        let queue_families = [graphics_queue_family, present_queue_family];
        let device = Arc::new(VkDevice::new(
            instance.clone(),
            &physical_device,
            &queue_families,
            required_extensions,
        )?);
        let graphics_queue = device.get_queue(graphics_queue_family, 0);
        let present_queue = device.get_queue(present_queue_family, 0);

        // Gpu allocator
        let allocator = Arc::new(VkAllocator::new(
            &instance,
            &physical_device,
            device.clone(),
        )?);

        // Command pool for one time submits
        let command_pool = VkCommandPool::new(
            device.clone(),
            graphics_queue_family,
            Some(vk::CommandPoolCreateFlags::TRANSIENT),
        )?;

        Ok(Self {
            command_pool,
            allocator,
            present_queue,
            graphics_queue,
            device,
            physical_device,
            surface,
            instance,
        })
    }

    pub fn physical_device_name(&self) -> &str {
        &self.physical_device.name
    }

    /// Upper bound for `vk::SamplerCreateInfo::max_anisotropy` on this device.
    pub fn max_sampler_anisotropy(&self) -> f32 {
        self.physical_device.limits.max_sampler_anisotropy
    }

    pub fn device_wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    pub fn find_depth_format(&self) -> Result<vk::Format> {
        self.physical_device
            .find_supported_format(
                &self.instance.inner,
                &DEPTH_FORMAT_CANDIDATES,
                vk::ImageTiling::OPTIMAL,
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            )
            .ok_or_else(|| anyhow!("Failed to find a supported depth format"))
    }

    pub fn get_surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        let capabilities = unsafe {
            self.surface.inner.get_physical_device_surface_capabilities(
                self.physical_device.inner,
                self.surface.surface_khr,
            )?
        };

        Ok(capabilities)
    }

    pub fn get_surface_formats(&self) -> Result<Vec<vk::SurfaceFormatKHR>> {
        let formats = unsafe {
            self.surface.inner.get_physical_device_surface_formats(
                self.physical_device.inner,
                self.surface.surface_khr,
            )?
        };

        Ok(formats)
    }

    pub fn get_surface_present_modes(&self) -> Result<Vec<vk::PresentModeKHR>> {
        let present_modes = unsafe {
            self.surface.inner.get_physical_device_surface_present_modes(
                self.physical_device.inner,
                self.surface.surface_khr,
            )?
        };

        Ok(present_modes)
    }
}

fn select_physical_device(
    instance: &VkInstance,
    surface: &VkSurface,
    required_extensions: &[&str],
) -> Result<VkPhysicalDevice> {
    log::debug!("Selecting vulkan physical device");
    let physical_devices = unsafe { instance.inner.enumerate_physical_devices()? };
    if physical_devices.is_empty() {
        bail!("Failed to find GPUs with Vulkan support");
    }

    let mut candidates = physical_devices
        .into_iter()
        .map(|inner| VkPhysicalDevice::new(&instance.inner, surface, inner))
        .collect::<Result<Vec<_>>>()?;
    candidates.retain(|d| d.is_suitable(required_extensions));

    // Stable sort keeps enumeration order among equally scored devices
    candidates.sort_by_key(|d| std::cmp::Reverse(d.score()));
    let physical_device = candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Could not find a suitable device"))?;

    log::info!(
        "Selected physical device: {} ({:?})",
        physical_device.name,
        physical_device.device_type
    );

    Ok(physical_device)
}
