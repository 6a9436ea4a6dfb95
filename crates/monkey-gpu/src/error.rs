//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Memory allocation failed.
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Surface creation failed, or the surface cannot be presented to.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// The swapchain no longer matches the surface and must be recreated.
    #[error("Swapchain out of date")]
    SwapchainOutOfDate,

    /// Shader module creation failed.
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// No supported format for an attachment.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A write would exceed the target buffer.
    #[error("Write of {len} bytes at offset {offset} exceeds buffer of {size} bytes")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

/// Result type for GPU operations.
pub type Result<T> = std::result::Result<T, GpuError>;

impl From<GpuError> for monkey_core::Error {
    fn from(err: GpuError) -> Self {
        Self::Gpu(err.to_string())
    }
}
