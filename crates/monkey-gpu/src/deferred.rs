//! Deferred buffer deletion for multi-frame-in-flight rendering.
//!
//! Buffers that get replaced while earlier frames are still executing (for
//! example the sprite vertex buffer growing after new sprites were spawned)
//! cannot be freed right away. They wait here until every frame that could
//! have referenced them has retired.

use crate::error::Result;
use crate::memory::{GpuAllocator, GpuBuffer};
use std::collections::VecDeque;

/// A buffer pending deletion.
pub struct PendingDeletion {
    /// The buffer to be freed.
    pub buffer: GpuBuffer,
    /// Frame number when this buffer was queued for deletion.
    pub frame_queued: u64,
}

/// Queue for deferred buffer deletions.
pub struct DeferredDeletionQueue {
    pending: VecDeque<PendingDeletion>,
    frames_in_flight: usize,
}

/// Whether a resource queued at `frame_queued` can no longer be in use at
/// `current_frame`.
pub fn is_retired(frame_queued: u64, current_frame: u64, frames_in_flight: usize) -> bool {
    frame_queued < current_frame.saturating_sub(frames_in_flight as u64)
}

impl DeferredDeletionQueue {
    /// Create a new deferred deletion queue.
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            frames_in_flight,
        }
    }

    /// Queue a buffer for deferred deletion.
    pub fn queue(&mut self, buffer: GpuBuffer, frame_number: u64) {
        self.pending.push_back(PendingDeletion {
            buffer,
            frame_queued: frame_number,
        });
    }

    /// Free every buffer that has retired by `current_frame_number`.
    pub fn process(
        &mut self,
        allocator: &mut GpuAllocator,
        current_frame_number: u64,
    ) -> Result<()> {
        // FIFO with non-decreasing frame numbers, so only the front can mature
        while let Some(front) = self.pending.front() {
            if !is_retired(front.frame_queued, current_frame_number, self.frames_in_flight) {
                break;
            }
            if let Some(mut pending) = self.pending.pop_front() {
                allocator.free_buffer(&mut pending.buffer)?;
            }
        }

        Ok(())
    }

    /// Free all pending buffers immediately. Only call once the device is idle.
    pub fn flush(&mut self, allocator: &mut GpuAllocator) -> Result<()> {
        while let Some(mut pending) = self.pending.pop_front() {
            allocator.free_buffer(&mut pending.buffer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retirement_window() {
        // Queued on frame 10 with 3 frames in flight: frames 10..=13 may still use it
        assert!(!is_retired(10, 10, 3));
        assert!(!is_retired(10, 13, 3));
        assert!(is_retired(10, 14, 3));
    }

    #[test]
    fn early_frames_never_underflow() {
        assert!(!is_retired(0, 0, 3));
        assert!(!is_retired(0, 2, 3));
        assert!(is_retired(0, 4, 3));
    }
}
