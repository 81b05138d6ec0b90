use std::time::Duration;

use crate::FrameError;

pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;
pub const DEFAULT_WINDOW_TITLE: &str = "Hello Triangle";
pub const DEFAULT_WINDOW_WIDTH: u32 = 800;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 800;

/// Frame pacing settings. Timeouts of `None` wait forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    pub frames_in_flight: usize,
    pub fence_timeout: Option<Duration>,
    pub acquire_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            fence_timeout: None,
            acquire_timeout: None,
        }
    }
}

impl FrameConfig {
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.frames_in_flight == 0 {
            return Err(FrameError::InvalidConfig(
                "at least one frame must be allowed in flight".to_owned(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_WINDOW_TITLE.to_owned(),
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

/// Converts an optional timeout into the nanosecond form the driver expects.
pub(crate) fn timeout_nanos(timeout: Option<Duration>) -> u64 {
    timeout
        .map(|t| u64::try_from(t.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(u64::MAX)
}
