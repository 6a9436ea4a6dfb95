//! Synchronization primitives for frames in flight.
//!
//! Each frame slot owns an image-available semaphore, an in-flight fence and
//! the command buffer recorded for it. Render-finished semaphores are kept
//! per swapchain image instead, since presentation of image N may still be
//! pending when the slot that rendered it is reused.

use crate::command::CommandPool;
use crate::error::Result;
use ash::vk;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = device.create_semaphore(&create_info, None)?;
    Ok(semaphore)
}

/// Create a fence.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = device.create_fence(&create_info, None)?;
    Ok(fence)
}

/// Wait for a fence to be signaled.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(
    device: &ash::Device,
    fence: vk::Fence,
    timeout_ns: u64,
) -> Result<()> {
    device.wait_for_fences(&[fence], true, timeout_ns)?;
    Ok(())
}

/// Reset a fence to unsignaled state.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    device.reset_fences(&[fence])?;
    Ok(())
}

/// Synchronization resources of one frame slot.
#[derive(Clone, Copy, Debug)]
pub struct FrameSync {
    /// Signaled when the acquired swapchain image is ready to be written
    pub image_available: vk::Semaphore,
    /// Signaled when the slot's submission has finished executing
    pub in_flight: vk::Fence,
    /// Primary command buffer recorded for this slot
    pub command_buffer: vk::CommandBuffer,
}

impl FrameSync {
    /// Create frame synchronization resources.
    ///
    /// The fence starts signaled so the first wait returns immediately.
    ///
    /// # Safety
    /// The device and pool must be valid.
    pub unsafe fn new(device: &ash::Device, pool: &CommandPool) -> Result<Self> {
        Ok(Self {
            image_available: create_semaphore(device)?,
            in_flight: create_fence(device, true)?,
            command_buffer: pool.allocate_command_buffer(device, vk::CommandBufferLevel::PRIMARY)?,
        })
    }

    /// Wait until the slot's previous submission has completed.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait(&self, device: &ash::Device) -> Result<()> {
        wait_for_fence(device, self.in_flight, u64::MAX)
    }

    /// Reset the fence before resubmitting.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn reset(&self, device: &ash::Device) -> Result<()> {
        reset_fence(device, self.in_flight)
    }

    /// Destroy the semaphore and fence (the command buffer dies with its pool).
    ///
    /// # Safety
    /// The device must be valid and resources must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_semaphore(self.image_available, None);
        device.destroy_fence(self.in_flight, None);
    }
}

/// Ring of frame slots plus the per-swapchain-image semaphores.
pub struct FrameSyncManager {
    frame_syncs: Vec<FrameSync>,
    render_finished: Vec<vk::Semaphore>,
    current_frame: usize,
}

impl FrameSyncManager {
    /// Create a sync manager for `frames_in_flight` slots and `image_count`
    /// swapchain images.
    ///
    /// # Safety
    /// The device and pool must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        pool: &CommandPool,
        frames_in_flight: usize,
        image_count: usize,
    ) -> Result<Self> {
        let frame_syncs = (0..frames_in_flight)
            .map(|_| FrameSync::new(device, pool))
            .collect::<Result<Vec<_>>>()?;
        let render_finished = (0..image_count)
            .map(|_| create_semaphore(device))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_parts(frame_syncs, render_finished))
    }

    /// Assemble a manager from existing resources.
    pub fn from_parts(frame_syncs: Vec<FrameSync>, render_finished: Vec<vk::Semaphore>) -> Self {
        Self {
            frame_syncs,
            render_finished,
            current_frame: 0,
        }
    }

    /// Get the current frame's sync resources.
    pub fn current(&self) -> &FrameSync {
        &self.frame_syncs[self.current_frame]
    }

    /// Semaphore signaled when rendering into `image_index` has finished.
    pub fn render_finished(&self, image_index: u32) -> vk::Semaphore {
        self.render_finished[image_index as usize]
    }

    /// Advance to the next frame slot.
    pub fn advance(&mut self) {
        self.current_frame = (self.current_frame + 1) % self.frame_syncs.len();
    }

    /// Get the current frame index.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Number of frame slots.
    pub fn frames_in_flight(&self) -> usize {
        self.frame_syncs.len()
    }

    /// Replace the per-image semaphores after the swapchain was recreated.
    ///
    /// # Safety
    /// The device must be valid and the old semaphores must not be in use.
    pub unsafe fn recreate_render_finished(
        &mut self,
        device: &ash::Device,
        image_count: usize,
    ) -> Result<()> {
        for sem in self.render_finished.drain(..) {
            device.destroy_semaphore(sem, None);
        }
        for _ in 0..image_count {
            self.render_finished.push(create_semaphore(device)?);
        }
        Ok(())
    }

    /// Destroy all resources.
    ///
    /// # Safety
    /// The device must be valid and all resources must not be in use.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        for sync in self.frame_syncs.drain(..) {
            sync.destroy(device);
        }
        for sem in self.render_finished.drain(..) {
            device.destroy_semaphore(sem, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_slot() -> FrameSync {
        FrameSync {
            image_available: vk::Semaphore::null(),
            in_flight: vk::Fence::null(),
            command_buffer: vk::CommandBuffer::null(),
        }
    }

    #[test]
    fn ring_wraps_around() {
        let mut manager =
            FrameSyncManager::from_parts(vec![null_slot(); 3], vec![vk::Semaphore::null(); 4]);
        assert_eq!(manager.frames_in_flight(), 3);
        assert_eq!(manager.current_frame(), 0);

        manager.advance();
        manager.advance();
        assert_eq!(manager.current_frame(), 2);
        manager.advance();
        assert_eq!(manager.current_frame(), 0);
    }
}
