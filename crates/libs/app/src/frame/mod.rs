//! Backend agnostic frame loop.
//!
//! The [`FrameScheduler`] drives one draw iteration per call against a fixed number of
//! frames in flight and rebuilds the swapchain when the surface stops matching it. Device,
//! swapchain and command recording are reached through the traits below so the loop can run
//! against Vulkan or against an in-memory backend.

mod resize;
mod scheduler;
mod slot;

pub use resize::*;
pub use scheduler::*;
pub use slot::*;

use std::time::Duration;

use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SurfaceExtent {
    pub width: u32,
    pub height: u32,
}

impl SurfaceExtent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A surface with no area, e.g. a minimized window.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { image_index: u32, suboptimal: bool },
    OutOfDate,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Optimal,
    Suboptimal,
    OutOfDate,
}

/// What a single [`FrameScheduler::draw_frame`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Work was submitted and presented. `rebuilt` is set when the swapchain was
    /// rebuilt after presenting.
    Presented { rebuilt: bool },
    /// The swapchain was out of date on acquire. Nothing was submitted.
    Skipped,
    /// A rebuild is pending but the surface has no area. Nothing was touched.
    Stalled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_presented: u64,
    pub frames_skipped: u64,
    pub rebuilds: u64,
}

/// Device side of the frame loop: synchronization objects, command buffers and the graphics queue.
pub trait FrameDevice {
    type Fence;
    type Semaphore;
    type CommandBuffer;

    fn create_fence(&self, signaled: bool) -> Result<Self::Fence>;

    fn create_semaphore(&self) -> Result<Self::Semaphore>;

    fn allocate_command_buffer(&self) -> Result<Self::CommandBuffer>;

    /// Returns `false` if `timeout` elapsed before the fence was signaled.
    fn wait_for_fence(&self, fence: &Self::Fence, timeout: Option<Duration>) -> Result<bool>;

    fn reset_fence(&self, fence: &Self::Fence) -> Result<()>;

    /// Submits to the graphics queue. `wait` gates the color attachment output stage,
    /// `signal` and `fence` are signaled on completion.
    fn submit(
        &self,
        command_buffer: &Self::CommandBuffer,
        wait: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> Result<()>;

    fn wait_idle(&self) -> Result<()>;
}

/// Owns the current swapchain generation and replaces it as a whole.
pub trait SwapchainProvider<D: FrameDevice> {
    type Generation;

    fn generation(&self) -> &Self::Generation;

    fn extent(&self) -> SurfaceExtent;

    fn acquire_next(
        &mut self,
        image_available: &D::Semaphore,
        timeout: Option<Duration>,
    ) -> Result<AcquireOutcome>;

    fn present(&mut self, image_index: u32, render_finished: &D::Semaphore)
        -> Result<PresentOutcome>;

    /// Builds the replacement generation for `extent`, then drops the current one.
    ///
    /// Only called once the device is idle.
    fn rebuild(&mut self, extent: SurfaceExtent) -> Result<()>;
}

pub trait CommandRecorder<D: FrameDevice, S: SwapchainProvider<D>> {
    /// Fully re-records `command_buffer` to draw into image `image_index` of `generation`.
    fn record(
        &mut self,
        command_buffer: &D::CommandBuffer,
        generation: &S::Generation,
        image_index: u32,
        frame_index: usize,
    ) -> Result<()>;

    /// Writes the per frame payload of slot `frame_index`. `elapsed` is the time since the
    /// scheduler was created.
    fn update_frame_state(
        &mut self,
        frame_index: usize,
        extent: SurfaceExtent,
        elapsed: Duration,
    ) -> Result<()>;
}

pub trait SurfaceSource {
    fn framebuffer_extent(&self) -> SurfaceExtent;
}
