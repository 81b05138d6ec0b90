use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_void},
};

use anyhow::{bail, Result};
use ash::{extensions::ext::DebugUtils, vk, Entry, Instance};
use raw_window_handle::HasRawWindowHandle;

use crate::VkVersion;

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Validation layers and the debug messenger are only wired in debug builds.
pub(crate) const ENABLE_VALIDATION: bool = cfg!(debug_assertions);

pub struct VkInstance {
    pub(crate) inner: Instance,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    pub(crate) entry: Entry,
}

impl VkInstance {
    pub(crate) fn new(
        entry: Entry,
        window: &dyn HasRawWindowHandle,
        api_version: VkVersion,
        app_name: &str,
    ) -> Result<Self> {
        log::debug!("Creating vulkan instance");
        let app_name = CString::new(app_name)?;
        let engine_name = CString::new("No Engine")?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(app_name.as_c_str())
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(engine_name.as_c_str())
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(api_version.make_api_version());

        let extension_names = ash_window::enumerate_required_extensions(window)?;
        let mut extension_names = extension_names
            .iter()
            .map(|ext| *ext)
            .collect::<Vec<_>>();
        if ENABLE_VALIDATION {
            extension_names.push(DebugUtils::name().as_ptr());
        }

        let layer_names = required_layers(&entry)?;
        let layer_names_ptrs = layer_names
            .iter()
            .map(|name| name.as_ptr())
            .collect::<Vec<*const c_char>>();

        let mut debug_create_info = debug_messenger_create_info();
        let mut instance_create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names_ptrs);
        if ENABLE_VALIDATION {
            // Also covers messages emitted by instance creation itself
            instance_create_info = instance_create_info.push_next(&mut debug_create_info);
        }

        let inner = unsafe { entry.create_instance(&instance_create_info, None)? };

        let debug_utils = if ENABLE_VALIDATION {
            let debug_utils = DebugUtils::new(&entry, &inner);
            let messenger =
                unsafe { debug_utils.create_debug_utils_messenger(&debug_create_info, None)? };
            Some((debug_utils, messenger))
        } else {
            None
        };

        Ok(Self {
            inner,
            debug_utils,
            entry,
        })
    }
}

fn required_layers(entry: &Entry) -> Result<Vec<CString>> {
    if !ENABLE_VALIDATION {
        return Ok(Vec::new());
    }

    let available = entry.enumerate_instance_layer_properties()?;
    let found = available.iter().any(|layer| {
        let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
        name.to_str() == Ok(VALIDATION_LAYER)
    });
    if !found {
        bail!("Validation layer {VALIDATION_LAYER} requested, but not available");
    }

    Ok(vec![CString::new(VALIDATION_LAYER)?])
}

fn debug_messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .flags(vk::DebugUtilsMessengerCreateFlagsEXT::empty())
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
        .build()
}

unsafe extern "system" fn vulkan_debug_callback(
    flag: vk::DebugUtilsMessageSeverityFlagsEXT,
    typ: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _: *mut c_void,
) -> vk::Bool32 {
    use vk::DebugUtilsMessageSeverityFlagsEXT as Flag;

    let message = CStr::from_ptr((*p_callback_data).p_message);
    match flag {
        Flag::VERBOSE => log::debug!("{typ:?} - {message:?}"),
        Flag::INFO => log::info!("{typ:?} - {message:?}"),
        Flag::WARNING => log::warn!("{typ:?} - {message:?}"),
        _ => log::error!("{typ:?} - {message:?}"),
    }
    vk::FALSE
}

impl Drop for VkInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.inner.destroy_instance(None);
        }
    }
}
