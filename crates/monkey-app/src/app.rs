//! `SpriteApp` trait definition.

use crate::context::AppContext;
use crate::frame::FrameContext;
use winit::event::WindowEvent;

/// Trait for monkey applications.
///
/// The framework owns the window, GPU context, swapchain and frame loop.
/// Implementors hold their scene and renderer and are driven through these
/// callbacks.
pub trait SpriteApp: Sized {
    /// Initialize the application.
    ///
    /// Called once after the window, GPU context and swapchain exist.
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self>;

    /// React to this frame's input before the game advances.
    ///
    /// `raw_dt` is the wall-clock frame time, unaffected by pause or time
    /// scale. Pausing, resuming or exiting here applies to the `dt` handed to
    /// [`update`](Self::update) in the same frame.
    #[allow(unused_variables)]
    fn handle_input(&mut self, ctx: &mut AppContext, raw_dt: f32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Advance game state.
    ///
    /// `dt` is already scaled by [`AppContext::time_scale`] and is zero while
    /// the game is paused. Input in `ctx.input` reflects this frame's events.
    fn update(&mut self, ctx: &mut AppContext, dt: f32) -> anyhow::Result<()>;

    /// Record this frame's commands into `frame.command_buffer`.
    ///
    /// The command buffer is already begun and will be ended and submitted
    /// by the framework. The swapchain image arrives in `UNDEFINED` layout and
    /// must be left in `PRESENT_SRC_KHR`.
    fn render(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()>;

    /// Handle window resize.
    ///
    /// The swapchain has already been recreated and the device is idle.
    #[allow(unused_variables)]
    fn on_resize(&mut self, ctx: &mut AppContext, width: u32, height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Inspect a window event before the framework does.
    ///
    /// Return `true` to consume the event.
    #[allow(unused_variables)]
    fn on_event(&mut self, event: &WindowEvent) -> bool {
        false
    }

    /// Release resources before shutdown. The GPU is idle.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut AppContext) {}
}
