use monkey_gpu::GpuError;
use thiserror::Error;

use crate::texture::TextureId;

/// Rendering errors.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Core(#[from] monkey_core::Error),

    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureId),

    #[error("A sprite needs at least one texture frame")]
    NoFrames,
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

impl From<ash::vk::Result> for RenderError {
    fn from(result: ash::vk::Result) -> Self {
        Self::Gpu(GpuError::Vulkan(result))
    }
}
