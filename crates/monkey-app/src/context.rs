//! Application context.

use std::sync::Arc;

use ash::vk;
use monkey_gpu::swapchain::Swapchain;
use monkey_gpu::{CommandPool, FrameSyncManager, GpuContext, SurfaceContext};
use monkey_input::InputManager;
use tracing::info;
use winit::window::Window;

use crate::timing::FrameTimer;

/// Whether the game advances, is frozen, or is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    Running,
    Paused,
    Exit,
}

/// Game state plus the time scale applied to `update`'s `dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameClock {
    state: GameState,
    time_scale: f32,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            state: GameState::Running,
            time_scale: 1.0,
        }
    }
}

impl GameClock {
    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == GameState::Paused
    }

    /// Freeze game time until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if self.state == GameState::Running {
            self.state = GameState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == GameState::Paused {
            self.state = GameState::Running;
        }
    }

    pub fn request_exit(&mut self) {
        self.state = GameState::Exit;
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Multiply every future `dt` by `scale` (negative values clamp to 0).
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Game time elapsed for a wall-clock frame time of `dt`.
    pub fn scale(&self, dt: f32) -> f32 {
        match self.state {
            GameState::Running => dt * self.time_scale,
            GameState::Paused | GameState::Exit => 0.0,
        }
    }
}

/// Application context shared across all app methods.
///
/// Provides access to the GPU context, window, swapchain, input and the
/// game clock controls.
pub struct AppContext {
    /// The window handle.
    pub window: Arc<Window>,
    /// GPU context with device and queues.
    pub gpu: GpuContext,
    /// Surface context for windowed rendering.
    pub surface: SurfaceContext,
    /// Current swapchain.
    pub swapchain: Swapchain,
    /// Pool the frame command buffers and one-shot uploads come from.
    pub commands: CommandPool,
    /// Keyboard and scroll state for the current frame.
    pub input: InputManager,
    /// Total frames rendered.
    pub frame_count: u64,
    /// Whether vsync is enabled.
    pub vsync: bool,
    pub(crate) sync: FrameSyncManager,
    pub(crate) timer: FrameTimer,
    clock: GameClock,
}

impl AppContext {
    /// Create a new application context.
    ///
    /// # Safety
    /// The window must have valid handles.
    pub(crate) unsafe fn new(
        window: Arc<Window>,
        gpu: GpuContext,
        vsync: bool,
        max_fps: u32,
    ) -> anyhow::Result<Self> {
        // SAFETY: Caller guarantees window has valid handles
        let surface = unsafe { SurfaceContext::from_window(&gpu, window.as_ref())? };

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        // SAFETY: GPU context is valid
        let swapchain = unsafe { surface.create_swapchain(&gpu, width, height, vsync, None)? };

        info!(
            "Swapchain created: {}x{} ({} images)",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.images.len()
        );

        // SAFETY: Device is valid and the family was selected at device creation
        let commands = unsafe {
            CommandPool::new(
                gpu.device(),
                gpu.graphics_queue_family(),
                vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            )?
        };

        // One frame slot per swapchain image
        let image_count = swapchain.images.len();
        // SAFETY: Device and pool are valid
        let sync = unsafe { FrameSyncManager::new(gpu.device(), &commands, image_count, image_count)? };

        Ok(Self {
            window,
            gpu,
            surface,
            swapchain,
            commands,
            input: InputManager::new(),
            frame_count: 0,
            vsync,
            sync,
            timer: FrameTimer::new(max_fps),
            clock: GameClock::default(),
        })
    }

    /// Get the current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    pub fn width(&self) -> u32 {
        self.swapchain.extent.width
    }

    pub fn height(&self) -> u32 {
        self.swapchain.extent.height
    }

    /// Number of frames that may be in flight at once.
    pub fn frames_in_flight(&self) -> usize {
        self.sync.frames_in_flight()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut GameClock {
        &mut self.clock
    }

    pub fn state(&self) -> GameState {
        self.clock.state()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Freeze game time; `update` receives `dt == 0` until [`resume`](Self::resume).
    /// Takes effect on the current frame when called from
    /// [`SpriteApp::handle_input`](crate::SpriteApp::handle_input).
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn resume(&mut self) {
        self.clock.resume();
    }

    /// Ask the runner to shut down after the current frame.
    pub fn request_exit(&mut self) {
        self.clock.request_exit();
    }

    pub fn time_scale(&self) -> f32 {
        self.clock.time_scale()
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.clock.set_time_scale(scale);
    }

    /// Frame rate cap, 0 when unlimited.
    pub fn max_fps(&self) -> u32 {
        self.timer.max_fps()
    }

    pub fn set_max_fps(&mut self, max_fps: u32) {
        self.timer.set_max_fps(max_fps);
        info!(
            "Max FPS set to {}",
            if max_fps == 0 { "unlimited".to_string() } else { max_fps.to_string() }
        );
    }

    /// FPS averaged over the last frames.
    pub fn average_fps(&self) -> f32 {
        self.timer.average_fps()
    }

    /// Recreate the swapchain (e.g., after resize).
    ///
    /// # Safety
    /// The GPU must be idle.
    pub(crate) unsafe fn recreate_swapchain(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        // SAFETY: Caller guarantees GPU is idle
        unsafe {
            self.surface.recreate_swapchain(
                &self.gpu,
                &mut self.swapchain,
                width,
                height,
                self.vsync,
            )?;
            self.sync
                .recreate_render_finished(self.gpu.device(), self.swapchain.images.len())?;
        }

        info!(
            "Swapchain recreated: {}x{}",
            self.swapchain.extent.width, self.swapchain.extent.height
        );
        Ok(())
    }

    /// Cleanup all resources.
    ///
    /// # Safety
    /// The GPU must be idle and all resources must not be in use.
    pub(crate) unsafe fn cleanup(&mut self) {
        let device = self.gpu.device();

        // SAFETY: Caller guarantees GPU is idle and resources are not in use
        unsafe {
            self.sync.destroy(device);
            self.commands.destroy(device);
            self.swapchain.destroy(device, &self.surface.swapchain_loader);
            self.surface.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn running_scales_dt() {
        let mut clock = GameClock::default();
        assert_relative_eq!(clock.scale(0.016), 0.016);
        clock.set_time_scale(0.5);
        assert_relative_eq!(clock.scale(0.016), 0.008);
        clock.set_time_scale(-1.0);
        assert_relative_eq!(clock.scale(0.016), 0.0);
    }

    #[test]
    fn paused_freezes_time() {
        let mut clock = GameClock::default();
        clock.pause();
        assert!(clock.is_paused());
        assert_relative_eq!(clock.scale(0.016), 0.0);

        clock.resume();
        assert_relative_eq!(clock.scale(0.016), 0.016);

        clock.request_exit();
        clock.resume();
        assert_eq!(clock.state(), GameState::Exit);
        assert_relative_eq!(clock.scale(0.016), 0.0);
    }
}
