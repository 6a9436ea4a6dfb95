//! Staging uploads into device-local memory.
//!
//! Data is written into a host-visible staging buffer, copied on the GPU
//! with a one-shot command buffer, and the staging buffer is freed once the
//! copy has completed.

use crate::command::{execute_single_time_commands, CommandPool};
use crate::context::GpuContext;
use crate::error::Result;
use crate::image::{cmd_copy_buffer_to_image, cmd_transition_image};
use crate::memory::{GpuBuffer, GpuImage};
use ash::vk;
use gpu_allocator::MemoryLocation;

/// Uploads data through temporary staging buffers on the graphics queue.
pub struct StagingUploader<'a> {
    gpu: &'a GpuContext,
    pool: &'a CommandPool,
}

impl<'a> StagingUploader<'a> {
    /// Create an uploader using `pool` for its one-shot command buffers.
    pub fn new(gpu: &'a GpuContext, pool: &'a CommandPool) -> Self {
        Self { gpu, pool }
    }

    fn stage(&self, bytes: &[u8], name: &str) -> Result<GpuBuffer> {
        let staging = self.gpu.allocator().lock().create_buffer(
            bytes.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            &format!("{name}_staging"),
        )?;
        if let Err(e) = staging.write_bytes(0, bytes) {
            let mut staging = staging;
            self.gpu.allocator().lock().free_buffer(&mut staging)?;
            return Err(e);
        }
        Ok(staging)
    }

    /// Create a device-local buffer filled with `bytes`.
    ///
    /// `TRANSFER_DST` is added to `usage` automatically.
    pub fn upload_buffer(
        &self,
        bytes: &[u8],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<GpuBuffer> {
        let mut staging = self.stage(bytes, name)?;
        let buffer = self.gpu.allocator().lock().create_buffer(
            bytes.len() as u64,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
            name,
        )?;

        let device = self.gpu.device();
        let region = vk::BufferCopy::default().size(bytes.len() as u64);
        // SAFETY: both buffers are alive until the blocking submit returns
        let copied = unsafe {
            execute_single_time_commands(device, self.pool, self.gpu.graphics_queue(), |cmd| {
                device.cmd_copy_buffer(cmd, staging.buffer, buffer.buffer, &[region]);
            })
        };

        self.gpu.allocator().lock().free_buffer(&mut staging)?;
        match copied {
            Ok(()) => Ok(buffer),
            Err(e) => {
                let mut buffer = buffer;
                self.gpu.allocator().lock().free_buffer(&mut buffer)?;
                Err(e)
            }
        }
    }

    /// Create a sampled `R8G8B8A8_UNORM` image from tightly packed RGBA8 pixels.
    ///
    /// The image ends in `SHADER_READ_ONLY_OPTIMAL`.
    pub fn upload_rgba_image(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        name: &str,
    ) -> Result<GpuImage> {
        let mut staging = self.stage(pixels, name)?;

        let image = self.gpu.allocator().lock().create_image_2d(
            vk::Format::R8G8B8A8_UNORM,
            vk::Extent2D { width, height },
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            name,
        )?;

        let device = self.gpu.device();
        // SAFETY: staging buffer and image are alive until the blocking submit returns
        let copied = unsafe {
            execute_single_time_commands(device, self.pool, self.gpu.graphics_queue(), |cmd| {
                cmd_transition_image(
                    device,
                    cmd,
                    image.image,
                    vk::ImageAspectFlags::COLOR,
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                );
                cmd_copy_buffer_to_image(device, cmd, staging.buffer, image.image, width, height);
                cmd_transition_image(
                    device,
                    cmd,
                    image.image,
                    vk::ImageAspectFlags::COLOR,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                );
            })
        };

        self.gpu.allocator().lock().free_buffer(&mut staging)?;
        match copied {
            Ok(()) => Ok(image),
            Err(e) => {
                let mut image = image;
                self.gpu.allocator().lock().free_image(&mut image)?;
                Err(e)
            }
        }
    }
}
