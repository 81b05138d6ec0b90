use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use vulkan::{
    ash::vk, gpu_allocator::MemoryLocation, AcquiredImage, VkContext, VkFramebuffer, VkImage,
    VkImageView, VkRenderPass, VkSemaphore, VkSwapchain,
};

use crate::{
    config::timeout_nanos, AcquireOutcome, PresentOutcome, SurfaceExtent, SwapchainProvider,
    VkFrameDevice,
};

/// Everything derived from one swapchain.
///
/// Fields are declared in destruction order.
pub struct SwapchainGeneration {
    framebuffers: Vec<VkFramebuffer>,
    _depth_view: VkImageView,
    _depth_image: VkImage,
    swapchain: VkSwapchain,
}

impl SwapchainGeneration {
    fn new(context: &VkContext, render_pass: &VkRenderPass, swapchain: VkSwapchain) -> Result<Self> {
        let extent = swapchain.extent;

        log::debug!("Creating depth attachment");
        let depth_image = context.create_image(
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            MemoryLocation::GpuOnly,
            render_pass.depth_format,
            extent.width,
            extent.height,
        )?;
        let depth_view = depth_image.create_image_view(vk::ImageAspectFlags::DEPTH)?;

        log::debug!("Creating {} framebuffers", swapchain.views.len());
        let framebuffers = swapchain
            .views
            .iter()
            .map(|color_view| {
                context.create_framebuffer(render_pass, color_view, &depth_view, extent)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            framebuffers,
            _depth_view: depth_view,
            _depth_image: depth_image,
            swapchain,
        })
    }

    pub fn framebuffer(&self, image_index: u32) -> Result<&VkFramebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .ok_or_else(|| anyhow!("No framebuffer for swapchain image {image_index}"))
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    pub fn format(&self) -> vk::Format {
        self.swapchain.format
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.swapchain.present_mode
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }
}

/// Vulkan [`SwapchainProvider`] rendering through a color + depth render pass.
pub struct VkSwapchainProvider {
    generation: SwapchainGeneration,
    render_pass: Arc<VkRenderPass>,
    context: Arc<VkContext>,
}

impl VkSwapchainProvider {
    pub fn new(context: Arc<VkContext>, extent: SurfaceExtent) -> Result<Self> {
        let depth_format = context.find_depth_format()?;
        log::debug!("Depth format: {depth_format:?}");

        let swapchain = VkSwapchain::new(&context, extent.width, extent.height)?;
        let render_pass = Arc::new(
            context.create_color_depth_render_pass(swapchain.format, depth_format)?,
        );
        let generation = SwapchainGeneration::new(&context, &render_pass, swapchain)?;

        Ok(Self {
            generation,
            render_pass,
            context,
        })
    }

    pub fn render_pass(&self) -> &Arc<VkRenderPass> {
        &self.render_pass
    }
}

impl SwapchainProvider<VkFrameDevice> for VkSwapchainProvider {
    type Generation = SwapchainGeneration;

    fn generation(&self) -> &SwapchainGeneration {
        &self.generation
    }

    fn extent(&self) -> SurfaceExtent {
        let extent = self.generation.extent();
        SurfaceExtent::new(extent.width, extent.height)
    }

    fn acquire_next(
        &mut self,
        image_available: &VkSemaphore,
        timeout: Option<Duration>,
    ) -> Result<AcquireOutcome> {
        let result = self
            .generation
            .swapchain
            .acquire_next_image(timeout_nanos(timeout), image_available);

        acquire_outcome(result)
    }

    fn present(&mut self, image_index: u32, render_finished: &VkSemaphore) -> Result<PresentOutcome> {
        let result = self.generation.swapchain.queue_present(
            image_index,
            &[render_finished],
            &self.context.present_queue,
        );

        present_outcome(result)
    }

    fn rebuild(&mut self, extent: SurfaceExtent) -> Result<()> {
        let swapchain = self
            .generation
            .swapchain
            .recreate(&self.context, extent.width, extent.height)
            .context("Failed to recreate swapchain")?;
        if swapchain.format != self.render_pass.color_format {
            log::warn!(
                "Swapchain format changed from {:?} to {:?}",
                self.render_pass.color_format,
                swapchain.format
            );
        }

        let generation = SwapchainGeneration::new(&self.context, &self.render_pass, swapchain)?;
        log::debug!(
            "New swapchain generation has {} images presented in {:?}",
            generation.image_count(),
            generation.present_mode()
        );

        // The old generation goes away only once its replacement is complete
        self.generation = generation;

        Ok(())
    }
}

/// Out of date and timeouts are expected while acquiring. Anything else is fatal.
fn acquire_outcome(result: Result<AcquiredImage>) -> Result<AcquireOutcome> {
    match result {
        Ok(AcquiredImage {
            index,
            is_suboptimal,
        }) => Ok(AcquireOutcome::Acquired {
            image_index: index,
            suboptimal: is_suboptimal,
        }),
        Err(err) => match err.downcast_ref::<vk::Result>().copied() {
            // No image was handed out, so the only way forward is a rebuild
            Some(vk::Result::ERROR_OUT_OF_DATE_KHR) | Some(vk::Result::SUBOPTIMAL_KHR) => {
                Ok(AcquireOutcome::OutOfDate)
            }
            Some(vk::Result::TIMEOUT) | Some(vk::Result::NOT_READY) => {
                Ok(AcquireOutcome::TimedOut)
            }
            _ => Err(err.context("Error while acquiring next image")),
        },
    }
}

/// Out of date and suboptimal presentation both call for a rebuild. Anything else is fatal.
fn present_outcome(result: Result<bool>) -> Result<PresentOutcome> {
    match result {
        Ok(false) => Ok(PresentOutcome::Optimal),
        Ok(true) => Ok(PresentOutcome::Suboptimal),
        Err(err) => match err.downcast_ref::<vk::Result>().copied() {
            Some(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Some(vk::Result::SUBOPTIMAL_KHR) => Ok(PresentOutcome::Suboptimal),
            _ => Err(err.context("Failed to present queue")),
        },
    }
}
