use anyhow::Result;
use winit::{
    dpi::PhysicalSize,
    event_loop::EventLoop,
    window::{Window, WindowBuilder},
};

use crate::{SurfaceExtent, SurfaceSource, WindowConfig};

pub fn create_window(config: &WindowConfig) -> Result<(Window, EventLoop<()>)> {
    log::debug!("Creating window and event loop");
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .with_resizable(true)
        .build(&event_loop)?;

    Ok((window, event_loop))
}

impl SurfaceSource for Window {
    fn framebuffer_extent(&self) -> SurfaceExtent {
        let size = self.inner_size();
        SurfaceExtent::new(size.width, size.height)
    }
}
