//! Per-frame context for rendering.

use ash::vk;

/// Context for the current frame being rendered.
pub struct FrameContext {
    /// Command buffer for recording rendering commands.
    pub command_buffer: vk::CommandBuffer,
    /// Index of the acquired swapchain image.
    pub image_index: u32,
    /// The swapchain image for this frame.
    pub swapchain_image: vk::Image,
    /// View of the swapchain image.
    pub swapchain_image_view: vk::ImageView,
    /// Frame-in-flight slot; per-frame GPU resources are indexed by it.
    pub frame_index: usize,
    /// Scaled delta time of the preceding update.
    pub dt: f32,
    /// Current frame number.
    pub frame_number: u64,
}
