mod config;
mod error;
mod frame;
mod gpu;
mod swapchain;
mod window;

pub mod logging;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use gpu::*;
pub use swapchain::*;
pub use window::*;

pub extern crate vulkan;
pub extern crate winit;
