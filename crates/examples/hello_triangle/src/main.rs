mod texture;
mod triangle;

use std::sync::Arc;

use anyhow::Result;
use app::{
    create_window, logging, vulkan::VkContext, vulkan::VkVersion, FrameConfig, FrameScheduler,
    FrameStatus, ResizeFlag, SurfaceSource, VkFrameDevice, VkSwapchainProvider, WindowConfig,
};
use triangle::TriangleRecorder;
use winit::{
    event::{Event, WindowEvent},
    event_loop::ControlFlow,
};

const APP_NAME: &str = "Hello Triangle";
const DEVICE_EXTENSIONS: [&str; 1] = ["VK_KHR_swapchain"];

fn main() -> Result<()> {
    logging::init()?;

    let window_config = WindowConfig::default();
    let (window, event_loop) = create_window(&window_config)?;

    let context = Arc::new(VkContext::new(
        &window,
        VkVersion::from_major_minor(1, 0),
        Some(APP_NAME),
        &DEVICE_EXTENSIONS,
    )?);
    log::info!("Selected physical device: {}", context.physical_device_name());

    let frame_config = FrameConfig::default();
    let swapchain = VkSwapchainProvider::new(context.clone(), window.framebuffer_extent())?;
    let recorder = TriangleRecorder::new(
        &context,
        swapchain.render_pass().clone(),
        frame_config.frames_in_flight,
    )?;
    let device = VkFrameDevice::new(context)?;

    let resize = ResizeFlag::new();
    let mut scheduler =
        FrameScheduler::new(device, swapchain, recorder, resize.clone(), frame_config)?;
    let mut failed = false;

    event_loop.run(move |event, _, control_flow| {
        match event {
            // On resize
            Event::WindowEvent {
                event: WindowEvent::Resized(..),
                ..
            } => {
                log::debug!("Window has been resized");
                resize.raise();
            }
            // Draw
            Event::MainEventsCleared if *control_flow != ControlFlow::Exit => {
                match scheduler.draw_frame(&window) {
                    // Nothing to draw into until the window gets an area again
                    Ok(FrameStatus::Stalled) => *control_flow = ControlFlow::Wait,
                    Ok(_) => *control_flow = ControlFlow::Poll,
                    Err(err) => {
                        log::error!("Failed to draw frame: {err:#}");
                        eprintln!("{APP_NAME}: {err:#}");
                        failed = true;
                        *control_flow = ControlFlow::Exit;
                    }
                }
            }
            // Exit app on request to close window
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => *control_flow = ControlFlow::Exit,
            // Wait for gpu to finish pending work before closing app
            Event::LoopDestroyed => {
                if let Err(err) = scheduler.wait_idle() {
                    log::error!("Failed to wait for gpu to finish work: {err:#}");
                }
                let stats = scheduler.stats();
                log::info!(
                    "Presented {} frames, skipped {}, rebuilt swapchain {} times",
                    stats.frames_presented,
                    stats.frames_skipped,
                    stats.rebuilds
                );
                if failed {
                    std::process::exit(1);
                }
            }
            _ => (),
        }
    });
}
