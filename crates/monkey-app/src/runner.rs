//! Application runner and event loop.

use std::sync::Arc;
use std::thread;

use ash::vk;
use monkey_core::constants::DEFAULT_WINDOW_SIZE;
use monkey_gpu::command::{begin_command_buffer, end_command_buffer, submit_frame};
use monkey_gpu::{GpuContextBuilder, GpuError};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::app::SpriteApp;
use crate::context::{AppContext, GameState};
use crate::frame::FrameContext;
use crate::timing::window_title;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Window title until the first FPS update replaces it.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Frame rate cap (None for unlimited).
    pub max_fps: Option<u32>,
    /// Enable vsync.
    pub vsync: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Monkey".to_string(),
            width: DEFAULT_WINDOW_SIZE.0,
            height: DEFAULT_WINDOW_SIZE.1,
            max_fps: None,
            vsync: false,
            validation: cfg!(debug_assertions),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Cap the frame rate. Zero means unlimited.
    #[must_use]
    pub fn with_max_fps(mut self, fps: u32) -> Self {
        self.max_fps = (fps > 0).then_some(fps);
        self
    }

    /// Enable or disable vsync.
    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }
}

/// Run a [`SpriteApp`] with the given configuration.
///
/// Initializes logging, creates the window and GPU context, and runs the
/// event loop until the window closes or the app requests exit.
pub fn run_app<A: SpriteApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner::<A> {
        config,
        state: None,
    };

    event_loop.run_app(&mut runner)?;
    Ok(())
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner<A: SpriteApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
}

/// Internal application state.
struct AppState<A: SpriteApp> {
    ctx: AppContext,
    app: A,
    gpu_name: String,
}

impl<A: SpriteApp + 'static> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        // Let the app handle the event first
        if state.app.on_event(&event) {
            return;
        }
        state.ctx.input.process_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.shutdown(event_loop);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = state.frame() {
                    error!("Frame error: {e:#}");
                }
                if state.ctx.state() == GameState::Exit {
                    info!("Exit requested");
                    self.shutdown(event_loop);
                }
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = state.handle_resize(size.width, size.height) {
                    error!("Resize error: {e:#}");
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.ctx.window.request_redraw();
        }
    }
}

impl<A: SpriteApp + 'static> AppRunner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = GpuContextBuilder::new()
            .app_name(&self.config.title)
            .validation(self.config.validation)
            .build()?;

        info!("GPU: {}", gpu.capabilities().summary());
        let gpu_name = gpu.device_name().to_string();

        let max_fps = self.config.max_fps.unwrap_or(0);
        // SAFETY: the window was just created by the event loop
        let mut ctx = unsafe { AppContext::new(window, gpu, self.config.vsync, max_fps)? };

        let app = A::init(&mut ctx)?;

        Ok(AppState { ctx, app, gpu_name })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.cleanup();
        }
        event_loop.exit();
    }
}

impl<A: SpriteApp> AppState<A> {
    /// Update, then render and present one frame.
    fn frame(&mut self) -> anyhow::Result<()> {
        let raw_dt = self.ctx.timer.tick();

        let update = self.app.handle_input(&mut self.ctx, raw_dt).and_then(|()| {
            let dt = self.ctx.clock().scale(raw_dt);
            self.app.update(&mut self.ctx, dt).map(|()| dt)
        });
        self.ctx.input.end_frame();
        let dt = update?;

        if self.ctx.state() == GameState::Exit {
            return Ok(());
        }

        let presented = self.render_frame(dt)?;
        if presented {
            self.ctx.sync.advance();
            self.ctx.frame_count += 1;
        }

        if let Some(delay) = self.ctx.timer.limiter_delay(self.ctx.timer.frame_start().elapsed()) {
            thread::sleep(delay);
        }

        if self.ctx.timer.title_due() {
            let title = window_title(&self.gpu_name, self.ctx.max_fps(), self.ctx.average_fps());
            self.ctx.window.set_title(&title);
        }
        Ok(())
    }

    /// Returns `false` when the frame was skipped for swapchain recreation.
    fn render_frame(&mut self, dt: f32) -> anyhow::Result<bool> {
        let frame_index = self.ctx.sync.current_frame();
        let frame_sync = *self.ctx.sync.current();
        let device = self.ctx.gpu.device();

        // SAFETY: the fence belongs to this device
        unsafe { frame_sync.wait(device)? };

        // SAFETY: swapchain and semaphore are valid
        let acquired = unsafe {
            self.ctx.swapchain.acquire_next_image(
                &self.ctx.surface.swapchain_loader,
                frame_sync.image_available,
                u64::MAX,
            )
        };
        let image_index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(GpuError::SwapchainOutOfDate) => {
                debug!("Swapchain out of date on acquire");
                self.recreate_swapchain()?;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let cmd = frame_sync.command_buffer;
        // SAFETY: the slot's fence has signaled so the command buffer is idle
        unsafe {
            frame_sync.reset(device)?;
            device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
            begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        }

        let mut frame = FrameContext {
            command_buffer: cmd,
            image_index,
            swapchain_image: self.ctx.swapchain.images[image_index as usize],
            swapchain_image_view: self.ctx.swapchain.image_views[image_index as usize],
            frame_index,
            dt,
            frame_number: self.ctx.frame_count,
        };
        self.app.render(&self.ctx, &mut frame)?;

        let device = self.ctx.gpu.device();
        let render_finished = self.ctx.sync.render_finished(image_index);
        // SAFETY: the command buffer was begun above and all handles are live
        unsafe {
            end_command_buffer(device, cmd)?;
            submit_frame(
                device,
                self.ctx.gpu.graphics_queue(),
                cmd,
                frame_sync.image_available,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                render_finished,
                frame_sync.in_flight,
            )?;
        }

        // SAFETY: the image was acquired and its rendering submitted
        let needs_recreate = unsafe {
            self.ctx.swapchain.present(
                &self.ctx.surface.swapchain_loader,
                self.ctx.gpu.graphics_queue(),
                image_index,
                &[render_finished],
            )?
        };
        if needs_recreate {
            debug!("Swapchain suboptimal on present");
            self.recreate_swapchain()?;
        }
        Ok(true)
    }

    fn recreate_swapchain(&mut self) -> anyhow::Result<()> {
        let size = self.ctx.window.inner_size();
        self.handle_resize(size.width, size.height)
    }

    fn handle_resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.ctx.gpu.wait_idle()?;
        // SAFETY: the device is idle
        unsafe { self.ctx.recreate_swapchain(width, height)? };

        let extent = self.ctx.extent();
        self.app.on_resize(&mut self.ctx, extent.width, extent.height)?;

        info!("Resized to {}x{}", extent.width, extent.height);
        Ok(())
    }

    fn cleanup(&mut self) {
        if self.ctx.frame_count > 0 {
            info!(
                "Rendered {} frames, last average {:.1} FPS",
                self.ctx.frame_count,
                self.ctx.average_fps()
            );
        }

        info!("Starting cleanup...");
        if let Err(e) = self.ctx.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        // Let the app cleanup first
        self.app.cleanup(&mut self.ctx);

        // SAFETY: the device is idle
        unsafe { self.ctx.cleanup() };

        info!("Cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = AppConfig::new("demo");
        assert_eq!(config.title, "demo");
        assert_eq!((config.width, config.height), (1440, 960));
        assert_eq!(config.max_fps, None);
        assert!(!config.vsync);
    }

    #[test]
    fn zero_max_fps_is_unlimited() {
        assert_eq!(AppConfig::default().with_max_fps(0).max_fps, None);
        assert_eq!(AppConfig::default().with_max_fps(60).max_fps, Some(60));
    }
}
