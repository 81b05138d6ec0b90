use std::{ffi::CStr, fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use ash::vk;

use crate::{device::VkDevice, VkContext};

/// Entry point shared by every shader stage.
pub const SHADER_ENTRY_POINT: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

pub struct VkShaderModule {
    device: Arc<VkDevice>,
    pub(crate) inner: vk::ShaderModule,
}

impl VkShaderModule {
    pub(crate) fn from_bytes(device: Arc<VkDevice>, source: &[u8]) -> Result<Self> {
        let source = read_shader_from_bytes(source)?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&source);
        let inner = unsafe { device.inner.create_shader_module(&create_info, None)? };

        Ok(Self { device, inner })
    }

    pub fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.inner)
            .name(SHADER_ENTRY_POINT)
            .build()
    }
}

impl VkContext {
    pub fn create_shader_module(&self, source: &[u8]) -> Result<VkShaderModule> {
        VkShaderModule::from_bytes(self.device.clone(), source)
    }

    pub fn create_shader_module_from_file(&self, path: impl AsRef<Path>) -> Result<VkShaderModule> {
        let path = path.as_ref();
        let source = fs::read(path)
            .with_context(|| format!("Failed to read shader file {}", path.display()))?;
        self.create_shader_module(&source)
    }
}

impl Drop for VkShaderModule {
    fn drop(&mut self) {
        unsafe { self.device.inner.destroy_shader_module(self.inner, None) };
    }
}

/// Decodes SPIR-V bytes into words, swapping byte order if needed.
pub fn read_shader_from_bytes(bytes: &[u8]) -> Result<Vec<u32>> {
    let mut cursor = std::io::Cursor::new(bytes);
    Ok(ash::util::read_spv(&mut cursor)?)
}
