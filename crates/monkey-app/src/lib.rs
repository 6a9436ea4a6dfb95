//! Application framework for monkey sprite games.
//!
//! This crate provides a trait-based application framework that handles
//! common boilerplate like:
//! - Window creation and management
//! - GPU context initialization
//! - Swapchain creation and recreation
//! - Frame synchronization and frame rate limiting
//! - Keyboard and scroll input collection
//!
//! # Example
//!
//! ```no_run
//! use monkey_app::{run_app, AppConfig, AppContext, FrameContext, SpriteApp};
//!
//! struct MyGame;
//!
//! impl SpriteApp for MyGame {
//!     fn init(_ctx: &mut AppContext) -> anyhow::Result<Self> {
//!         Ok(MyGame)
//!     }
//!
//!     fn update(&mut self, _ctx: &mut AppContext, _dt: f32) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!
//!     fn render(&mut self, _ctx: &AppContext, _frame: &mut FrameContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<MyGame>(AppConfig::new("My game").with_max_fps(144))
//! }
//! ```

mod app;
mod context;
mod frame;
mod runner;
mod timing;

pub use app::SpriteApp;
pub use context::{AppContext, GameClock, GameState};
pub use frame::FrameContext;
pub use runner::{run_app, AppConfig};
pub use timing::{window_title, FrameTimer, FPS_SAMPLES};

// Re-export commonly used types for convenience
pub use monkey_gpu::{CommandPool, GpuContext, GpuContextBuilder};
pub use monkey_input::InputManager;
pub use winit::event::WindowEvent;
