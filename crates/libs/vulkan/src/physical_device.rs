use std::ffi::CStr;

use anyhow::Result;
use ash::{vk, Instance};

use crate::{queue::VkQueueFamily, surface::VkSurface};

#[derive(Debug, Clone)]
pub struct VkPhysicalDevice {
    pub(crate) inner: vk::PhysicalDevice,
    pub(crate) name: String,
    pub(crate) device_type: vk::PhysicalDeviceType,
    pub(crate) limits: vk::PhysicalDeviceLimits,
    pub(crate) supported_features: vk::PhysicalDeviceFeatures,
    pub(crate) queue_families: Vec<VkQueueFamily>,
    pub(crate) supported_extensions: Vec<String>,
    pub(crate) supported_surface_formats: Vec<vk::SurfaceFormatKHR>,
    pub(crate) supported_present_modes: Vec<vk::PresentModeKHR>,
}

impl VkPhysicalDevice {
    pub(crate) fn new(
        instance: &Instance,
        surface: &VkSurface,
        inner: vk::PhysicalDevice,
    ) -> Result<Self> {
        let props = unsafe { instance.get_physical_device_properties(inner) };
        let name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        let supported_features = unsafe { instance.get_physical_device_features(inner) };

        let queue_family_properties =
            unsafe { instance.get_physical_device_queue_family_properties(inner) };
        let queue_families = queue_family_properties
            .into_iter()
            .enumerate()
            .map(|(index, f)| {
                let present_support = unsafe {
                    surface.inner.get_physical_device_surface_support(
                        inner,
                        index as _,
                        surface.surface_khr,
                    )?
                };
                Ok(VkQueueFamily::new(index as _, f, present_support))
            })
            .collect::<Result<_>>()?;

        let extension_properties =
            unsafe { instance.enumerate_device_extension_properties(inner)? };
        let supported_extensions = extension_properties
            .into_iter()
            .map(|p| {
                let name = unsafe { CStr::from_ptr(p.extension_name.as_ptr()) };
                name.to_string_lossy().into_owned()
            })
            .collect();

        let supported_surface_formats = unsafe {
            surface
                .inner
                .get_physical_device_surface_formats(inner, surface.surface_khr)?
        };

        let supported_present_modes = unsafe {
            surface
                .inner
                .get_physical_device_surface_present_modes(inner, surface.surface_khr)?
        };

        Ok(Self {
            inner,
            name,
            device_type: props.device_type,
            limits: props.limits,
            supported_features,
            queue_families,
            supported_extensions,
            supported_surface_formats,
            supported_present_modes,
        })
    }

    pub fn supports_extensions(&self, extensions: &[&str]) -> bool {
        let supported_extensions = self
            .supported_extensions
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>();
        extensions.iter().all(|e| supported_extensions.contains(e))
    }

    pub fn graphics_family(&self) -> Option<VkQueueFamily> {
        self.queue_families
            .iter()
            .find(|f| f.supports_graphics())
            .copied()
    }

    /// Prefers the graphics family when it can also present.
    pub fn present_family(&self) -> Option<VkQueueFamily> {
        match self.graphics_family() {
            Some(family) if family.supports_present() => Some(family),
            _ => self
                .queue_families
                .iter()
                .find(|f| f.supports_present())
                .copied(),
        }
    }

    pub fn is_suitable(&self, required_extensions: &[&str]) -> bool {
        self.graphics_family().is_some()
            && self.present_family().is_some()
            && self.supports_extensions(required_extensions)
            && !self.supported_surface_formats.is_empty()
            && !self.supported_present_modes.is_empty()
            && self.supports_sampler_anisotropy()
    }

    /// Textures are sampled with anisotropic filtering.
    pub fn supports_sampler_anisotropy(&self) -> bool {
        self.supported_features.sampler_anisotropy == vk::TRUE
    }

    /// Discrete gpus win over everything else.
    pub fn score(&self) -> u32 {
        match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 3,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
            vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
            _ => 0,
        }
    }

    pub(crate) fn find_supported_format(
        &self,
        instance: &Instance,
        candidates: &[vk::Format],
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> Option<vk::Format> {
        candidates.iter().copied().find(|format| {
            let props =
                unsafe { instance.get_physical_device_format_properties(self.inner, *format) };
            match tiling {
                vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
                vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
                _ => false,
            }
        })
    }
}
