//! Monkey physics sandbox.
//!
//! A player sprite pushed around a walled arena full of floating circles and
//! boxes, lit by point lights.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p monkey-demo
//! ```
//!
//! ## Controls
//!
//! - `A` / `D`: push left / right (animates the player)
//! - `W` / `S`: push up / down
//! - `Space`: spin the center block
//! - `Left` / `Right`: shrink / grow the player's light
//! - `PageUp` / `PageDown`: ambient light on / off
//! - `P` (hold): pause
//! - Numpad `+` / `-`: raise / lower the FPS cap by 30
//! - Mouse wheel: zoom
//! - `Escape`: quit
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod controls;
mod game;
mod scene;

use monkey_app::{run_app, AppConfig};

use crate::game::Game1;

const WIDTH: u32 = 1440;
const HEIGHT: u32 = 960;

fn main() -> anyhow::Result<()> {
    run_app::<Game1>(AppConfig::new("Vulkan Monkey").with_size(WIDTH, HEIGHT))
}
