//! Command pools and command buffer helpers.

use crate::error::{GpuError, Result};
use crate::sync::{create_fence, wait_for_fence};
use ash::vk;

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a new command pool.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(
        device: &ash::Device,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);

        let pool = device.create_command_pool(&create_info, None)?;

        Ok(Self { pool, queue_family })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate a single command buffer.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffer(
        &self,
        device: &ash::Device,
        level: vk::CommandBufferLevel,
    ) -> Result<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(level)
            .command_buffer_count(1);

        device
            .allocate_command_buffers(&alloc_info)?
            .first()
            .copied()
            .ok_or_else(|| GpuError::InvalidState("No command buffer allocated".to_string()))
    }

    /// Destroy the command pool and every buffer allocated from it.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_command_pool(self.pool, None);
    }
}

/// Begin recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn begin_command_buffer(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    flags: vk::CommandBufferUsageFlags,
) -> Result<()> {
    let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
    device.begin_command_buffer(cmd, &begin_info)?;
    Ok(())
}

/// End recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn end_command_buffer(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    device.end_command_buffer(cmd)?;
    Ok(())
}

/// Submit one frame's command buffer.
///
/// Waits on `wait_semaphore` at `wait_stage`, signals `signal_semaphore`
/// and `fence` on completion.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn submit_frame(
    device: &ash::Device,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
    wait_semaphore: vk::Semaphore,
    wait_stage: vk::PipelineStageFlags,
    signal_semaphore: vk::Semaphore,
    fence: vk::Fence,
) -> Result<()> {
    let command_buffers = [cmd];
    let wait_semaphores = [wait_semaphore];
    let wait_stages = [wait_stage];
    let signal_semaphores = [signal_semaphore];

    let submit_info = vk::SubmitInfo::default()
        .command_buffers(&command_buffers)
        .wait_semaphores(&wait_semaphores)
        .wait_dst_stage_mask(&wait_stages)
        .signal_semaphores(&signal_semaphores);

    device.queue_submit(queue, &[submit_info], fence)?;
    Ok(())
}

/// Record and execute a one-shot command buffer, blocking until it completes.
///
/// Used for staging uploads outside the frame loop.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn execute_single_time_commands<F>(
    device: &ash::Device,
    pool: &CommandPool,
    queue: vk::Queue,
    f: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let cmd = pool.allocate_command_buffer(device, vk::CommandBufferLevel::PRIMARY)?;
    let fence = match create_fence(device, false) {
        Ok(fence) => fence,
        Err(e) => {
            device.free_command_buffers(pool.handle(), &[cmd]);
            return Err(e);
        }
    };

    let result = (|| {
        begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        f(cmd);
        end_command_buffer(device, cmd)?;

        let cmd_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&cmd_buffers);
        device.queue_submit(queue, &[submit_info], fence)?;
        wait_for_fence(device, fence, u64::MAX)
    })();

    device.destroy_fence(fence, None);
    device.free_command_buffers(pool.handle(), &[cmd]);

    result
}
