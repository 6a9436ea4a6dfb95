//! Vulkan instance, device and allocator for the sprite renderer.

use crate::capabilities::GpuCapabilities;
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, select_physical_device};
use crate::memory::GpuAllocator;
use ash::vk;
use parking_lot::Mutex;
use std::sync::Arc;

/// Device extensions the renderer cannot run without.
const DEVICE_EXTENSIONS: [&std::ffi::CStr; 1] = [ash::khr::swapchain::NAME];

/// The Vulkan device and everything created alongside it.
///
/// Rendering, uploads and presentation all go through one graphics queue.
/// Whether that queue can present is checked when the window surface is
/// created.
pub struct GpuContext {
    entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: Arc<ash::Device>,
    capabilities: GpuCapabilities,
    allocator: Mutex<GpuAllocator>,
    graphics_queue_family: u32,
    graphics_queue: vk::Queue,
}

impl GpuContext {
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn capabilities(&self) -> &GpuCapabilities {
        &self.capabilities
    }

    /// Name of the selected GPU, as shown in the window title.
    pub fn device_name(&self) -> &str {
        &self.capabilities.device_name
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Block until every queue has finished its work.
    pub fn wait_idle(&self) -> Result<()> {
        // SAFETY: the device is alive for as long as the context
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        // SAFETY: nothing else owns the device or instance; after the idle
        // wait no submitted work can reference them
        unsafe {
            let _ = self.device.device_wait_idle();
            // The heap frees its VkDeviceMemory, so it goes before the device
            self.allocator.lock().shutdown();
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

/// Options for [`GpuContext`] creation.
pub struct GpuContextBuilder {
    app_name: String,
    enable_validation: bool,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Vulkan Monkey".to_string(),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

impl GpuContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name reported to the driver, usually the window title.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Turn the Khronos validation layer and its debug messenger on or off.
    #[must_use]
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Load Vulkan, pick a Vulkan 1.3 GPU and create its device.
    pub fn build(self) -> Result<GpuContext> {
        // SAFETY: the loaded library stays alive inside the returned context
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))?;

        // SAFETY: entry was just loaded
        let instance = unsafe { create_instance(&entry, &self.app_name, self.enable_validation)? };

        // SAFETY: every handle below comes from this instance
        let (physical_device, capabilities, graphics_queue_family) = unsafe {
            let physical_device = select_physical_device(&instance)?;
            let capabilities = GpuCapabilities::query(&instance, physical_device);
            if !capabilities.meets_requirements() {
                return Err(GpuError::NoSuitableDevice);
            }
            let families = instance.get_physical_device_queue_family_properties(physical_device);
            let family = graphics_family(&families).ok_or(GpuError::NoSuitableDevice)?;
            (physical_device, capabilities, family)
        };
        tracing::info!("Selected GPU: {}", capabilities.summary());

        // SAFETY: physical device and family were validated above
        let (device, graphics_queue) = unsafe {
            create_device(
                &instance,
                physical_device,
                graphics_queue_family,
                capabilities.sampler_anisotropy,
            )?
        };
        let device = Arc::new(device);

        // SAFETY: instance, device and physical device are alive and related
        let allocator = unsafe { GpuAllocator::new(&instance, device.clone(), physical_device)? };

        Ok(GpuContext {
            entry,
            instance,
            physical_device,
            device,
            capabilities,
            allocator: Mutex::new(allocator),
            graphics_queue_family,
            graphics_queue,
        })
    }
}

/// Index of the first queue family that can draw.
fn graphics_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|family| {
            family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|index| index as u32)
}

/// Create the device with dynamic rendering, synchronization2 and, when the
/// GPU has it, sampler anisotropy.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    graphics_queue_family: u32,
    sampler_anisotropy: bool,
) -> Result<(ash::Device, vk::Queue)> {
    let priority = 1.0_f32;
    let queues = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(graphics_queue_family)
        .queue_priorities(std::slice::from_ref(&priority))];

    let extensions: Vec<_> = DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

    let mut vulkan_1_3 = vk::PhysicalDeviceVulkan13Features::default()
        .dynamic_rendering(true)
        .synchronization2(true);
    let mut features = vk::PhysicalDeviceFeatures2::default()
        .features(vk::PhysicalDeviceFeatures::default().sampler_anisotropy(sampler_anisotropy))
        .push_next(&mut vulkan_1_3);

    let info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queues)
        .enabled_extension_names(&extensions)
        .push_next(&mut features);

    let device = instance.create_device(physical_device, &info, None)?;
    let queue = device.get_device_queue(graphics_queue_family, 0);
    Ok((device, queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, queue_count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count,
            ..Default::default()
        }
    }

    #[test]
    fn first_drawing_family_wins() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 0),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, 1),
            family(vk::QueueFlags::GRAPHICS, 4),
        ];
        assert_eq!(graphics_family(&families), Some(2));
    }

    #[test]
    fn compute_only_gpu_is_rejected() {
        assert_eq!(graphics_family(&[family(vk::QueueFlags::COMPUTE, 8)]), None);
        assert_eq!(graphics_family(&[]), None);
    }
}
