//! Vulkan abstraction layer for the monkey sprite engine.
//!
//! This crate provides:
//! - Vulkan instance and device management
//! - GPU capability detection (uniform alignment, anisotropy)
//! - Memory allocation via gpu-allocator and staging uploads
//! - Command buffer and frame synchronization helpers
//! - Swapchain, descriptor and graphics pipeline handling

pub mod capabilities;
pub mod command;
pub mod context;
pub mod deferred;
pub mod descriptors;
pub mod error;
pub mod image;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod staging;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use capabilities::{GpuCapabilities, GpuVendor};
pub use command::CommandPool;
pub use context::{GpuContext, GpuContextBuilder};
pub use deferred::DeferredDeletionQueue;
pub use descriptors::{
    write_combined_image_sampler, write_uniform_buffer, DescriptorPool, DescriptorSetLayoutBuilder,
};
pub use error::{GpuError, Result};
pub use memory::{GpuAllocator, GpuBuffer, GpuImage};
pub use pipeline::{BlendMode, GraphicsPipeline, GraphicsPipelineConfig};
pub use staging::StagingUploader;
pub use surface::{SurfaceContext, SurfaceSupport, SwapchainPlan};
pub use swapchain::Swapchain;
pub use sync::{create_fence, create_semaphore, FrameSync, FrameSyncManager};
