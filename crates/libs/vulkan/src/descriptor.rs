use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::{device::VkDevice, VkBuffer, VkContext, VkImageView, VkSampler};

/// Set layout that remembers its bindings so pools can be sized from it.
pub struct VkDescriptorSetLayout {
    device: Arc<VkDevice>,
    pub(crate) inner: vk::DescriptorSetLayout,
    descriptor_counts: Vec<(vk::DescriptorType, u32)>,
}

impl VkDescriptorSetLayout {
    pub(crate) fn new(
        device: Arc<VkDevice>,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> Result<Self> {
        let dsl_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings);
        let inner = unsafe { device.inner.create_descriptor_set_layout(&dsl_info, None)? };
        let descriptor_counts = bindings
            .iter()
            .map(|b| (b.descriptor_type, b.descriptor_count))
            .collect();

        Ok(Self {
            device,
            inner,
            descriptor_counts,
        })
    }
}

impl Drop for VkDescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .inner
                .destroy_descriptor_set_layout(self.inner, None);
        }
    }
}

/// Pool holding exactly `set_count` sets of a single layout.
pub struct VkDescriptorPool {
    device: Arc<VkDevice>,
    pub(crate) inner: vk::DescriptorPool,
}

impl VkDescriptorPool {
    pub(crate) fn new(
        device: Arc<VkDevice>,
        layout: &VkDescriptorSetLayout,
        set_count: u32,
    ) -> Result<Self> {
        let pool_sizes = pool_sizes(&layout.descriptor_counts, set_count);
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(set_count)
            .pool_sizes(&pool_sizes);
        let inner = unsafe { device.inner.create_descriptor_pool(&pool_info, None)? };

        Ok(Self { device, inner })
    }

    pub fn allocate_sets(
        &self,
        layout: &VkDescriptorSetLayout,
        count: u32,
    ) -> Result<Vec<VkDescriptorSet>> {
        let layouts = vec![layout.inner; count as usize];
        let sets_alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.inner)
            .set_layouts(&layouts);
        let sets = unsafe {
            self.device
                .inner
                .allocate_descriptor_sets(&sets_alloc_info)?
        };

        Ok(sets
            .into_iter()
            .map(|inner| VkDescriptorSet {
                device: self.device.clone(),
                inner,
            })
            .collect())
    }
}

impl Drop for VkDescriptorPool {
    fn drop(&mut self) {
        unsafe { self.device.inner.destroy_descriptor_pool(self.inner, None) };
    }
}

/// Freed with its pool.
pub struct VkDescriptorSet {
    device: Arc<VkDevice>,
    pub(crate) inner: vk::DescriptorSet,
}

impl VkDescriptorSet {
    /// Points every binding in `writes` at its resource in a single update.
    pub fn update(&self, writes: &[VkWriteDescriptorSet]) {
        let infos = writes.iter().map(|w| w.kind.info()).collect::<Vec<_>>();

        let descriptor_writes = writes
            .iter()
            .zip(infos.iter())
            .map(|(write, info)| {
                let builder = vk::WriteDescriptorSet::builder()
                    .dst_set(self.inner)
                    .dst_binding(write.binding)
                    .descriptor_type(write.kind.descriptor_type());
                match info {
                    DescriptorInfo::Buffer(info) => {
                        builder.buffer_info(std::slice::from_ref(info)).build()
                    }
                    DescriptorInfo::Image(info) => {
                        builder.image_info(std::slice::from_ref(info)).build()
                    }
                }
            })
            .collect::<Vec<_>>();

        unsafe {
            self.device
                .inner
                .update_descriptor_sets(&descriptor_writes, &[])
        };
    }
}

impl VkContext {
    pub fn create_descriptor_set_layout(
        &self,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> Result<VkDescriptorSetLayout> {
        VkDescriptorSetLayout::new(self.device.clone(), bindings)
    }

    pub fn create_descriptor_pool(
        &self,
        layout: &VkDescriptorSetLayout,
        set_count: u32,
    ) -> Result<VkDescriptorPool> {
        VkDescriptorPool::new(self.device.clone(), layout, set_count)
    }
}

pub struct VkWriteDescriptorSet<'a> {
    pub binding: u32,
    pub kind: VkWriteDescriptorSetKind<'a>,
}

pub enum VkWriteDescriptorSetKind<'a> {
    UniformBuffer {
        buffer: &'a VkBuffer,
    },
    /// The view must be in `SHADER_READ_ONLY_OPTIMAL` layout when sampled.
    CombinedImageSampler {
        view: &'a VkImageView,
        sampler: &'a VkSampler,
    },
}

impl VkWriteDescriptorSetKind<'_> {
    fn descriptor_type(&self) -> vk::DescriptorType {
        match self {
            Self::UniformBuffer { .. } => vk::DescriptorType::UNIFORM_BUFFER,
            Self::CombinedImageSampler { .. } => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        }
    }

    fn info(&self) -> DescriptorInfo {
        match self {
            Self::UniformBuffer { buffer } => DescriptorInfo::Buffer(
                vk::DescriptorBufferInfo::builder()
                    .buffer(buffer.inner)
                    .offset(0)
                    .range(vk::WHOLE_SIZE)
                    .build(),
            ),
            Self::CombinedImageSampler { view, sampler } => DescriptorInfo::Image(
                vk::DescriptorImageInfo::builder()
                    .image_view(view.inner)
                    .sampler(sampler.inner)
                    .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    .build(),
            ),
        }
    }
}

enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

/// Descriptors needed for `set_count` sets, one pool size per descriptor type.
fn pool_sizes(
    descriptor_counts: &[(vk::DescriptorType, u32)],
    set_count: u32,
) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for (ty, count) in descriptor_counts {
        match sizes.iter_mut().find(|s| s.ty == *ty) {
            Some(size) => size.descriptor_count += count * set_count,
            None => sizes.push(vk::DescriptorPoolSize {
                ty: *ty,
                descriptor_count: count * set_count,
            }),
        }
    }
    sizes
}
