//! Vulkan instance creation and physical device selection.

use crate::capabilities::supports_vulkan_1_3;
use crate::error::{GpuError, Result};
use ash::vk;
use std::ffi::{c_char, CStr, CString};

/// Required instance extensions for windowed rendering.
pub fn required_instance_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::xlib_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_enumeration::NAME,
    ]
}

/// Validation layers to enable in debug builds.
pub fn validation_layers() -> [&'static CStr; 1] {
    [c"VK_LAYER_KHRONOS_validation"]
}

/// Create a Vulkan instance.
///
/// Requested validation layers that the loader does not know about are
/// skipped with a warning instead of failing instance creation.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    enable_validation: bool,
) -> Result<ash::Instance> {
    let app_name = CString::new(app_name)
        .map_err(|e| GpuError::Other(format!("Invalid application name: {e}")))?;
    let engine_name = c"Monkey";

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(engine_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_3);

    let extension_names: Vec<*const c_char> = required_instance_extensions()
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    let available_layers = entry.enumerate_instance_layer_properties()?;
    let layer_names: Vec<*const c_char> = if enable_validation {
        validation_layers()
            .into_iter()
            .filter(|layer| {
                let found = available_layers
                    .iter()
                    .any(|props| CStr::from_ptr(props.layer_name.as_ptr()) == *layer);
                if !found {
                    tracing::warn!("Validation layer {:?} not available", layer);
                }
                found
            })
            .map(CStr::as_ptr)
            .collect()
    } else {
        Vec::new()
    };

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    let instance = entry.create_instance(&create_info, None)?;

    Ok(instance)
}

/// Select the best physical device.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn select_physical_device(instance: &ash::Instance) -> Result<vk::PhysicalDevice> {
    let devices = instance.enumerate_physical_devices()?;

    devices
        .into_iter()
        .filter_map(|device| score_physical_device(instance, device).map(|score| (score, device)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, device)| device)
        .ok_or(GpuError::NoSuitableDevice)
}

/// Score a physical device, or `None` if it cannot run the renderer at all.
unsafe fn score_physical_device(instance: &ash::Instance, device: vk::PhysicalDevice) -> Option<u64> {
    let properties = instance.get_physical_device_properties(device);
    if !supports_vulkan_1_3(properties.api_version) {
        return None;
    }

    let has_graphics = instance
        .get_physical_device_queue_family_properties(device)
        .iter()
        .any(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS));
    if !has_graphics {
        return None;
    }

    let memory = instance.get_physical_device_memory_properties(device);
    let vram_mb: u64 = memory
        .memory_heaps
        .iter()
        .take(memory.memory_heap_count as usize)
        .filter(|h| h.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
        .map(|h| h.size / (1024 * 1024))
        .sum();

    Some(device_type_score(properties.device_type) + vram_mb / 1024)
}

/// Base score by device type. Discrete GPUs always outrank integrated ones.
fn device_type_score(device_type: vk::PhysicalDeviceType) -> u64 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 50,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_outranks_integrated() {
        let discrete = device_type_score(vk::PhysicalDeviceType::DISCRETE_GPU);
        let integrated = device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU);
        let cpu = device_type_score(vk::PhysicalDeviceType::CPU);
        // Even a large integrated heap should not beat a discrete card
        assert!(discrete > integrated + 64);
        assert!(integrated > cpu);
        assert!(cpu > 0);
    }

    #[test]
    fn surface_extension_always_requested() {
        assert!(required_instance_extensions().contains(&ash::khr::surface::NAME));
    }
}
