use thiserror::Error;

/// Errors reported by [`FrameScheduler`](crate::FrameScheduler).
///
/// Out-of-date and suboptimal swapchains are handled by rebuilding and never show up here.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid frame configuration: {0}")]
    InvalidConfig(String),
    #[error("timed out waiting for frame {frame} to complete on the device")]
    FenceTimeout { frame: usize },
    #[error("timed out acquiring a swapchain image for frame {frame}")]
    AcquireTimeout { frame: usize },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
