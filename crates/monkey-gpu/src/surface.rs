//! The game window's Vulkan surface.
//!
//! Owns the surface and the extension loaders the swapchain needs, and turns
//! what the surface supports into a [`SwapchainPlan`].

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::swapchain::{
    calculate_extent, select_image_count, select_present_mode, select_surface_format, Swapchain,
};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

pub struct SurfaceContext {
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,
    pub swapchain_loader: ash::khr::swapchain::Device,
}

impl SurfaceContext {
    /// Create the surface for `window`.
    ///
    /// The device's graphics queue also presents, so a surface it cannot
    /// present to is rejected with [`GpuError::SurfaceCreation`].
    ///
    /// # Safety
    /// The GPU context must be valid and the window must have valid handles.
    pub unsafe fn from_window<W>(gpu: &GpuContext, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("no display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("no window handle: {e}")))?;

        let surface = ash_window::create_surface(
            gpu.entry(),
            gpu.instance(),
            display.as_raw(),
            window_handle.as_raw(),
            None,
        )
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        let surface_loader = ash::khr::surface::Instance::new(gpu.entry(), gpu.instance());

        let can_present = surface_loader.get_physical_device_surface_support(
            gpu.physical_device(),
            gpu.graphics_queue_family(),
            surface,
        )?;
        if !can_present {
            surface_loader.destroy_surface(surface, None);
            return Err(GpuError::SurfaceCreation(format!(
                "queue family {} cannot present to this window",
                gpu.graphics_queue_family()
            )));
        }

        Ok(Self {
            surface,
            surface_loader,
            swapchain_loader: ash::khr::swapchain::Device::new(gpu.instance(), gpu.device()),
        })
    }

    /// What the surface currently supports on the selected device.
    pub fn support(&self, gpu: &GpuContext) -> Result<SurfaceSupport> {
        let device = gpu.physical_device();
        // SAFETY: the surface and physical device belong to the same instance
        unsafe {
            Ok(SurfaceSupport {
                capabilities: self
                    .surface_loader
                    .get_physical_device_surface_capabilities(device, self.surface)?,
                formats: self
                    .surface_loader
                    .get_physical_device_surface_formats(device, self.surface)?,
                present_modes: self
                    .surface_loader
                    .get_physical_device_surface_present_modes(device, self.surface)?,
            })
        }
    }

    /// Create a swapchain sized as close to `width` x `height` as the surface
    /// allows.
    ///
    /// # Safety
    /// The GPU context must be valid. `old`, if given, must not be in use.
    pub unsafe fn create_swapchain(
        &self,
        gpu: &GpuContext,
        width: u32,
        height: u32,
        vsync: bool,
        old: Option<&Swapchain>,
    ) -> Result<Swapchain> {
        let plan = self.support(gpu)?.plan(width, height, vsync)?;
        tracing::debug!(
            "Swapchain plan: {:?} / {:?}, {:?}, {} images, {}x{}",
            plan.surface_format.format,
            plan.surface_format.color_space,
            plan.present_mode,
            plan.image_count,
            plan.extent.width,
            plan.extent.height
        );

        Swapchain::new(
            gpu.device(),
            &self.swapchain_loader,
            self.surface,
            &plan,
            old.map(|swapchain| swapchain.swapchain),
        )
    }

    /// Replace `swapchain` with one of the new size, handing the old one to
    /// the driver for reuse before destroying it.
    ///
    /// # Safety
    /// The device must be idle.
    pub unsafe fn recreate_swapchain(
        &self,
        gpu: &GpuContext,
        swapchain: &mut Swapchain,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<()> {
        let fresh = self.create_swapchain(gpu, width, height, vsync, Some(swapchain))?;
        let old = std::mem::replace(swapchain, fresh);
        old.destroy(gpu.device(), &self.swapchain_loader);
        Ok(())
    }

    /// # Safety
    /// No swapchain created from this surface may still exist.
    pub unsafe fn destroy(&self) {
        self.surface_loader.destroy_surface(self.surface, None);
    }
}

/// Capabilities, formats and present modes reported for a surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Pick the swapchain settings for a window of `width` x `height`.
    pub fn plan(&self, width: u32, height: u32, vsync: bool) -> Result<SwapchainPlan> {
        if self.formats.is_empty() || self.present_modes.is_empty() {
            return Err(GpuError::SwapchainCreation(
                "surface reports no formats or present modes".to_string(),
            ));
        }
        Ok(SwapchainPlan {
            surface_format: select_surface_format(&self.formats),
            present_mode: select_present_mode(&self.present_modes, vsync),
            extent: calculate_extent(&self.capabilities, width, height),
            image_count: select_image_count(&self.capabilities),
            pre_transform: self.capabilities.current_transform,
        })
    }
}

/// Settings a swapchain is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainPlan {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_support() -> SurfaceSupport {
        SurfaceSupport {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }

    #[test]
    fn plan_for_default_window() {
        let plan = window_support().plan(1440, 960, false).unwrap();
        assert_eq!(plan.surface_format.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(plan.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!((plan.extent.width, plan.extent.height), (1440, 960));
        assert_eq!(plan.image_count, 3);
        assert_eq!(plan.pre_transform, vk::SurfaceTransformFlagsKHR::IDENTITY);

        let vsync = window_support().plan(1440, 960, true).unwrap();
        assert_eq!(vsync.present_mode, vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn lost_surface_cannot_be_planned() {
        let mut support = window_support();
        support.formats.clear();
        assert!(matches!(
            support.plan(1440, 960, false),
            Err(GpuError::SwapchainCreation(_))
        ));
    }
}
