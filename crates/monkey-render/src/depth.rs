use ash::vk;
use monkey_gpu::image::{create_image_view, find_depth_format, has_stencil};
use monkey_gpu::{GpuContext, GpuImage};

use crate::error::Result;

/// Depth attachment matching the swapchain extent.
pub struct DepthTarget {
    pub image: GpuImage,
    pub view: vk::ImageView,
    pub format: vk::Format,
}

impl DepthTarget {
    /// Pick the depth format the device supports best.
    pub fn select_format(gpu: &GpuContext) -> Result<vk::Format> {
        // SAFETY: instance and physical device outlive the context borrow
        Ok(unsafe { find_depth_format(gpu.instance(), gpu.physical_device())? })
    }

    pub fn new(gpu: &GpuContext, format: vk::Format, extent: vk::Extent2D) -> Result<Self> {
        let mut image = gpu.allocator().lock().create_image_2d(
            format,
            extent,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            "depth_target",
        )?;

        // SAFETY: the image was created on this device just above
        let view = unsafe {
            create_image_view(gpu.device(), image.image, format, vk::ImageAspectFlags::DEPTH)
        };
        match view {
            Ok(view) => Ok(Self { image, view, format }),
            Err(e) => {
                gpu.allocator().lock().free_image(&mut image)?;
                Err(e.into())
            }
        }
    }

    /// Aspects covered by layout transitions of this image.
    pub fn barrier_aspect(&self) -> vk::ImageAspectFlags {
        if has_stencil(self.format) {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        } else {
            vk::ImageAspectFlags::DEPTH
        }
    }

    /// Destroy the view and free the image. The device must be idle.
    pub fn destroy(&mut self, gpu: &GpuContext) -> Result<()> {
        // SAFETY: caller guarantees no submitted work references the view
        unsafe { gpu.device().destroy_image_view(self.view, None) };
        self.view = vk::ImageView::null();
        gpu.allocator().lock().free_image(&mut self.image)?;
        Ok(())
    }
}
