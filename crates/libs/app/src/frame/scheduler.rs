use std::time::Instant;

use super::{
    AcquireOutcome, CommandRecorder, FrameDevice, FrameSlots, FrameStats, FrameStatus,
    PresentOutcome, ResizeFlag, SurfaceSource, SwapchainProvider,
};
use crate::{FrameConfig, FrameError};

pub struct FrameScheduler<D, S, R>
where
    D: FrameDevice,
    S: SwapchainProvider<D>,
    R: CommandRecorder<D, S>,
{
    slots: FrameSlots<D>,
    recorder: R,
    swapchain: S,
    device: D,
    resize: ResizeFlag,
    config: FrameConfig,
    start: Instant,
    rebuild_pending: bool,
    stalled: bool,
    stats: FrameStats,
}

impl<D, S, R> FrameScheduler<D, S, R>
where
    D: FrameDevice,
    S: SwapchainProvider<D>,
    R: CommandRecorder<D, S>,
{
    pub fn new(
        device: D,
        swapchain: S,
        recorder: R,
        resize: ResizeFlag,
        config: FrameConfig,
    ) -> Result<Self, FrameError> {
        config.validate()?;
        log::debug!(
            "Creating frame scheduler with {} frames in flight",
            config.frames_in_flight
        );

        let slots = FrameSlots::new(&device, config.frames_in_flight)?;

        Ok(Self {
            slots,
            recorder,
            swapchain,
            device,
            resize,
            config,
            start: Instant::now(),
            rebuild_pending: false,
            stalled: false,
            stats: FrameStats::default(),
        })
    }

    /// Runs one frame: wait for the slot, acquire, record, submit, present, advance.
    pub fn draw_frame(&mut self, surface: &impl SurfaceSource) -> Result<FrameStatus, FrameError> {
        if self.rebuild_pending && !self.rebuild_swapchain(surface)? {
            return Ok(FrameStatus::Stalled);
        }

        let frame = self.slots.current_index();
        let slot = self.slots.current();

        if !self
            .device
            .wait_for_fence(&slot.in_flight, self.config.fence_timeout)?
        {
            return Err(FrameError::FenceTimeout { frame });
        }

        let acquired = self
            .swapchain
            .acquire_next(&slot.image_available, self.config.acquire_timeout)?;
        let image_index = match acquired {
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            } => {
                if suboptimal {
                    log::debug!("Acquired image {image_index} from a suboptimal swapchain");
                }
                image_index
            }
            AcquireOutcome::OutOfDate => {
                log::debug!("Swapchain is out of date, skipping frame {frame}");
                self.stats.frames_skipped += 1;
                self.rebuild_pending = true;
                self.rebuild_swapchain(surface)?;
                return Ok(FrameStatus::Skipped);
            }
            AcquireOutcome::TimedOut => return Err(FrameError::AcquireTimeout { frame }),
        };

        // The wait above has returned, and work is about to be submitted
        self.device.reset_fence(&slot.in_flight)?;

        self.recorder.record(
            &slot.command_buffer,
            self.swapchain.generation(),
            image_index,
            frame,
        )?;
        self.recorder
            .update_frame_state(frame, self.swapchain.extent(), self.start.elapsed())?;

        self.device.submit(
            &slot.command_buffer,
            &slot.image_available,
            &slot.render_finished,
            &slot.in_flight,
        )?;

        let presented = self.swapchain.present(image_index, &slot.render_finished)?;
        let resized = self.resize.take();
        let rebuilt = if presented != PresentOutcome::Optimal || resized {
            log::debug!("Rebuilding swapchain after frame {frame} ({presented:?}, resized: {resized})");
            self.rebuild_pending = true;
            self.rebuild_swapchain(surface)?
        } else {
            false
        };

        self.stats.frames_presented += 1;
        self.slots.advance();

        Ok(FrameStatus::Presented { rebuilt })
    }

    /// Waits for the device to go idle and replaces the swapchain generation.
    ///
    /// Returns `false` without touching the device when the surface has no area; the
    /// rebuild stays pending and is retried by the next [`draw_frame`](Self::draw_frame).
    pub fn rebuild_swapchain(&mut self, surface: &impl SurfaceSource) -> Result<bool, FrameError> {
        let extent = surface.framebuffer_extent();
        if extent.is_degenerate() {
            if !self.stalled {
                log::warn!(
                    "Surface is {}x{}, deferring swapchain rebuild",
                    extent.width,
                    extent.height
                );
            }
            self.stalled = true;
            self.rebuild_pending = true;
            return Ok(false);
        }

        // The new generation reflects the current size, so any raised flag is satisfied
        self.resize.take();

        self.device.wait_idle()?;
        self.swapchain.rebuild(extent)?;

        log::debug!("Swapchain rebuilt for {}x{}", extent.width, extent.height);
        self.rebuild_pending = false;
        self.stalled = false;
        self.stats.rebuilds += 1;

        Ok(true)
    }

    pub fn wait_idle(&self) -> Result<(), FrameError> {
        self.device.wait_idle()?;

        Ok(())
    }

    pub fn current_frame(&self) -> usize {
        self.slots.current_index()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    pub fn is_rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn swapchain(&self) -> &S {
        &self.swapchain
    }
}

impl<D, S, R> Drop for FrameScheduler<D, S, R>
where
    D: FrameDevice,
    S: SwapchainProvider<D>,
    R: CommandRecorder<D, S>,
{
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            log::error!("Failed to wait for the device before shutdown: {err:?}");
        }
    }
}
