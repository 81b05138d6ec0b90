//! In-memory backend recording every call the scheduler makes.
//!
//! Fences follow the device rules: a fence may only be reset once signaled, only an unsignaled
//! fence may be submitted, and a submitted fence stays pending until waited on or until the
//! device is idled. Breaking a rule surfaces as a backend error.
#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
    time::Duration,
};

use anyhow::{bail, Result};
use app::{
    AcquireOutcome, CommandRecorder, FrameConfig, FrameDevice, FrameError, FrameScheduler,
    PresentOutcome, ResizeFlag, SurfaceExtent, SurfaceSource, SwapchainProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    WaitFence { fence: usize },
    ResetFence { fence: usize },
    Acquire { semaphore: usize },
    Record { frame: usize, image_index: u32, generation: u64 },
    Update { frame: usize },
    Submit { fence: usize, wait: usize, signal: usize },
    Present { image_index: u32, wait: usize },
    WaitIdle,
    Rebuild { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceState {
    Signaled,
    Unsignaled,
    Pending,
}

#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Present(PresentOutcome),
    Fail,
}

pub struct MockState {
    pub calls: Vec<Call>,
    pub fences: Vec<FenceState>,
    pub semaphores: usize,
    pub command_buffers: usize,
    pub max_pending: usize,
    /// Every fence wait times out.
    pub stuck_fences: bool,
    /// Keyed by 1-based acquire number.
    pub acquire_script: HashMap<u64, AcquireOutcome>,
    /// Keyed by 1-based present number.
    pub present_script: HashMap<u64, Scripted>,
    pub acquires: u64,
    pub presents: u64,
    pub image_count: u32,
    pub next_image: u32,
    pub generations: u64,
    pub elapsed: Vec<Duration>,
}

impl MockState {
    fn new(image_count: u32) -> Self {
        Self {
            calls: Vec::new(),
            fences: Vec::new(),
            semaphores: 0,
            command_buffers: 0,
            max_pending: 0,
            stuck_fences: false,
            acquire_script: HashMap::new(),
            present_script: HashMap::new(),
            acquires: 0,
            presents: 0,
            image_count,
            next_image: 0,
            generations: 0,
            elapsed: Vec::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.fences
            .iter()
            .filter(|f| **f == FenceState::Pending)
            .count()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn positions(&self, predicate: impl Fn(&Call) -> bool) -> Vec<usize> {
        self.calls
            .iter()
            .enumerate()
            .filter(|(_, c)| predicate(c))
            .map(|(index, _)| index)
            .collect()
    }
}

pub type Shared = Rc<RefCell<MockState>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFence(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSemaphore(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockCommandBuffer(pub usize);

pub struct MockDevice {
    state: Shared,
}

impl FrameDevice for MockDevice {
    type Fence = MockFence;
    type Semaphore = MockSemaphore;
    type CommandBuffer = MockCommandBuffer;

    fn create_fence(&self, signaled: bool) -> Result<MockFence> {
        let mut state = self.state.borrow_mut();
        state.fences.push(if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        });
        Ok(MockFence(state.fences.len() - 1))
    }

    fn create_semaphore(&self) -> Result<MockSemaphore> {
        let mut state = self.state.borrow_mut();
        state.semaphores += 1;
        Ok(MockSemaphore(state.semaphores - 1))
    }

    fn allocate_command_buffer(&self) -> Result<MockCommandBuffer> {
        let mut state = self.state.borrow_mut();
        state.command_buffers += 1;
        Ok(MockCommandBuffer(state.command_buffers - 1))
    }

    fn wait_for_fence(&self, fence: &MockFence, _: Option<Duration>) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::WaitFence { fence: fence.0 });
        if state.stuck_fences {
            return Ok(false);
        }

        match state.fences[fence.0] {
            FenceState::Signaled | FenceState::Pending => {
                state.fences[fence.0] = FenceState::Signaled;
                Ok(true)
            }
            // Nothing will ever signal it
            FenceState::Unsignaled => Ok(false),
        }
    }

    fn reset_fence(&self, fence: &MockFence) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::ResetFence { fence: fence.0 });
        if state.fences[fence.0] != FenceState::Signaled {
            bail!("fence {} reset while {:?}", fence.0, state.fences[fence.0]);
        }
        state.fences[fence.0] = FenceState::Unsignaled;
        Ok(())
    }

    fn submit(
        &self,
        _: &MockCommandBuffer,
        wait: &MockSemaphore,
        signal: &MockSemaphore,
        fence: &MockFence,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Submit {
            fence: fence.0,
            wait: wait.0,
            signal: signal.0,
        });
        if state.fences[fence.0] != FenceState::Unsignaled {
            bail!("fence {} submitted while {:?}", fence.0, state.fences[fence.0]);
        }
        state.fences[fence.0] = FenceState::Pending;
        let pending = state.pending();
        state.max_pending = state.max_pending.max(pending);
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::WaitIdle);
        for fence in state.fences.iter_mut() {
            if *fence == FenceState::Pending {
                *fence = FenceState::Signaled;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockGeneration {
    pub id: u64,
    pub extent: SurfaceExtent,
    pub format: &'static str,
    pub present_mode: &'static str,
}

pub struct MockSwapchain {
    state: Shared,
    generation: MockGeneration,
}

impl SwapchainProvider<MockDevice> for MockSwapchain {
    type Generation = MockGeneration;

    fn generation(&self) -> &MockGeneration {
        &self.generation
    }

    fn extent(&self) -> SurfaceExtent {
        self.generation.extent
    }

    fn acquire_next(
        &mut self,
        image_available: &MockSemaphore,
        _: Option<Duration>,
    ) -> Result<AcquireOutcome> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Acquire {
            semaphore: image_available.0,
        });
        state.acquires += 1;

        let acquire = state.acquires;
        if let Some(outcome) = state.acquire_script.remove(&acquire) {
            return Ok(outcome);
        }

        let image_index = state.next_image;
        state.next_image = (image_index + 1) % state.image_count;
        Ok(AcquireOutcome::Acquired {
            image_index,
            suboptimal: false,
        })
    }

    fn present(&mut self, image_index: u32, render_finished: &MockSemaphore) -> Result<PresentOutcome> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Present {
            image_index,
            wait: render_finished.0,
        });
        state.presents += 1;

        let present = state.presents;
        match state.present_script.remove(&present) {
            Some(Scripted::Present(outcome)) => Ok(outcome),
            Some(Scripted::Fail) => bail!("device lost"),
            None => Ok(PresentOutcome::Optimal),
        }
    }

    fn rebuild(&mut self, extent: SurfaceExtent) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Rebuild {
            width: extent.width,
            height: extent.height,
        });
        if state.pending() > 0 {
            bail!("swapchain rebuilt with {} frames in flight", state.pending());
        }

        state.generations += 1;
        state.next_image = 0;
        self.generation = MockGeneration {
            id: state.generations,
            extent,
            ..self.generation
        };
        Ok(())
    }
}

pub struct MockRecorder {
    state: Shared,
}

impl CommandRecorder<MockDevice, MockSwapchain> for MockRecorder {
    fn record(
        &mut self,
        _: &MockCommandBuffer,
        generation: &MockGeneration,
        image_index: u32,
        frame_index: usize,
    ) -> Result<()> {
        self.state.borrow_mut().calls.push(Call::Record {
            frame: frame_index,
            image_index,
            generation: generation.id,
        });
        Ok(())
    }

    fn update_frame_state(
        &mut self,
        frame_index: usize,
        _: SurfaceExtent,
        elapsed: Duration,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Update { frame: frame_index });
        state.elapsed.push(elapsed);
        Ok(())
    }
}

pub struct MockSurface(Cell<SurfaceExtent>);

impl MockSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self(Cell::new(SurfaceExtent::new(width, height)))
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.0.set(SurfaceExtent::new(width, height));
    }
}

impl SurfaceSource for MockSurface {
    fn framebuffer_extent(&self) -> SurfaceExtent {
        self.0.get()
    }
}

pub type MockScheduler = FrameScheduler<MockDevice, MockSwapchain, MockRecorder>;

pub const IMAGE_COUNT: u32 = 3;
pub const INITIAL_EXTENT: SurfaceExtent = SurfaceExtent {
    width: 800,
    height: 600,
};

pub fn try_scheduler(config: FrameConfig) -> (Result<MockScheduler, FrameError>, Shared, ResizeFlag) {
    let state = Rc::new(RefCell::new(MockState::new(IMAGE_COUNT)));
    let resize = ResizeFlag::new();

    let scheduler = FrameScheduler::new(
        MockDevice {
            state: state.clone(),
        },
        MockSwapchain {
            state: state.clone(),
            generation: MockGeneration {
                id: 0,
                extent: INITIAL_EXTENT,
                format: "B8G8R8A8_SRGB",
                present_mode: "MAILBOX",
            },
        },
        MockRecorder {
            state: state.clone(),
        },
        resize.clone(),
        config,
    );

    (scheduler, state, resize)
}

pub fn scheduler(frames_in_flight: usize) -> (MockScheduler, Shared, ResizeFlag) {
    let (scheduler, state, resize) = try_scheduler(FrameConfig {
        frames_in_flight,
        ..Default::default()
    });

    (scheduler.expect("scheduler creation"), state, resize)
}

pub fn surface() -> MockSurface {
    MockSurface::new(INITIAL_EXTENT.width, INITIAL_EXTENT.height)
}
