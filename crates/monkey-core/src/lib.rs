//! Core types and math for the monkey sprite engine.
//!
//! This crate provides the foundational pieces shared by every other crate:
//! - Pixel-space rectangles used to size sprites and physics shapes
//! - Pixel/meter conversion for the physics world
//! - Uniform buffer alignment helpers
//! - Common error types

pub mod error;
pub mod math;

pub use error::{Error, Result};
pub use math::{align_up, m_to_px, px_to_m, to_meters, to_pixels, Rect, PIXELS_PER_METER};

/// Engine-wide constants
pub mod constants {
    /// Number of point light slots in the lighting uniform buffer
    pub const MAX_POINT_LIGHTS: usize = 10;
    /// Texture used by sprites created without an explicit texture list
    pub const DEFAULT_TEXTURE: &str = "textures/default.jpg";
    /// Color the swapchain image is cleared to each frame (sky blue)
    pub const CLEAR_COLOR: [f32; 4] = [0.529, 0.808, 0.922, 1.0];
    /// Depth the depth attachment is cleared to each frame
    pub const CLEAR_DEPTH: f32 = 1.0;
    /// Initial window size in physical pixels
    pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1440, 960);
}
