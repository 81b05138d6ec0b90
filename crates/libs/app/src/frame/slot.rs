use anyhow::Result;

use super::FrameDevice;

/// Synchronization objects and command buffer owned by one frame in flight.
pub struct FrameSlot<D: FrameDevice> {
    pub image_available: D::Semaphore,
    pub render_finished: D::Semaphore,
    pub in_flight: D::Fence,
    pub command_buffer: D::CommandBuffer,
}

impl<D: FrameDevice> FrameSlot<D> {
    fn new(device: &D) -> Result<Self> {
        Ok(Self {
            image_available: device.create_semaphore()?,
            render_finished: device.create_semaphore()?,
            // Signaled so the very first wait on each slot returns immediately
            in_flight: device.create_fence(true)?,
            command_buffer: device.allocate_command_buffer()?,
        })
    }
}

/// Fixed ring of frame slots, allocated once.
pub struct FrameSlots<D: FrameDevice> {
    slots: Vec<FrameSlot<D>>,
    current: usize,
}

impl<D: FrameDevice> FrameSlots<D> {
    pub fn new(device: &D, count: usize) -> Result<Self> {
        log::debug!("Creating {count} frame slots");
        let slots = (0..count)
            .map(|_| FrameSlot::new(device))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { slots, current: 0 })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &FrameSlot<D> {
        &self.slots[self.current]
    }

    pub fn get(&self, index: usize) -> Option<&FrameSlot<D>> {
        self.slots.get(index)
    }

    /// Moves to the next slot, wrapping around, and returns its index.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.slots.len();
        self.current
    }
}
