//! GPU capability detection.

use ash::vk;
use monkey_core::align_up;
use std::ffi::CStr;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Check whether an encoded API version is at least Vulkan 1.3.
pub fn supports_vulkan_1_3(api_version: u32) -> bool {
    let major = vk::api_version_major(api_version);
    let minor = vk::api_version_minor(api_version);
    major > 1 || (major == 1 && minor >= 3)
}

/// Detected GPU capabilities.
#[derive(Debug, Clone)]
pub struct GpuCapabilities {
    /// GPU vendor
    pub vendor: GpuVendor,
    /// Device name
    pub device_name: String,
    /// Vulkan API version
    pub api_version: u32,
    /// Driver version
    pub driver_version: u32,
    /// Device-local memory in MB
    pub device_local_memory_mb: u64,

    /// Required alignment of dynamic uniform buffer offsets
    pub min_uniform_buffer_offset_alignment: u64,
    /// Whether anisotropic filtering can be enabled on samplers
    pub sampler_anisotropy: bool,
    /// Upper bound for `maxAnisotropy` on samplers
    pub max_sampler_anisotropy: f32,
    /// Largest 2D image the device can create
    pub max_image_dimension_2d: u32,
}

impl GpuCapabilities {
    /// Query capabilities from a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);
        let memory_properties = instance.get_physical_device_memory_properties(physical_device);

        let device_name = CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        let device_local_memory_mb: u64 = memory_properties
            .memory_heaps
            .iter()
            .take(memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size / (1024 * 1024))
            .sum();

        Self {
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_name,
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            device_local_memory_mb,
            min_uniform_buffer_offset_alignment: properties
                .limits
                .min_uniform_buffer_offset_alignment,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
            max_sampler_anisotropy: properties.limits.max_sampler_anisotropy,
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
        }
    }

    /// Check if the GPU meets minimum requirements for the renderer.
    ///
    /// Dynamic rendering and synchronization2 are core in Vulkan 1.3, so
    /// the API version is the only hard requirement.
    pub fn meets_requirements(&self) -> bool {
        supports_vulkan_1_3(self.api_version)
    }

    /// Size of one slot in a dynamic uniform buffer holding `size`-byte elements.
    pub fn aligned_uniform_size(&self, size: u64) -> u64 {
        align_up(size, self.min_uniform_buffer_offset_alignment)
    }

    /// Anisotropy to request on samplers, or `None` when unsupported.
    pub fn anisotropy(&self, requested: f32) -> Option<f32> {
        self.sampler_anisotropy
            .then(|| requested.min(self.max_sampler_anisotropy))
    }

    /// Get a human-readable summary of capabilities.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}) - Vulkan {}.{}.{} - {} MB VRAM",
            self.device_name,
            self.vendor,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.device_local_memory_mb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(alignment: u64, anisotropy: bool) -> GpuCapabilities {
        GpuCapabilities {
            vendor: GpuVendor::Other(0),
            device_name: "test".to_string(),
            api_version: vk::API_VERSION_1_3,
            driver_version: 0,
            device_local_memory_mb: 0,
            min_uniform_buffer_offset_alignment: alignment,
            sampler_anisotropy: anisotropy,
            max_sampler_anisotropy: 8.0,
            max_image_dimension_2d: 4096,
        }
    }

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0x8086), GpuVendor::Intel);
        assert_eq!(GpuVendor::from_vendor_id(0x1234), GpuVendor::Other(0x1234));
    }

    #[test]
    fn version_requirements() {
        assert!(supports_vulkan_1_3(vk::API_VERSION_1_3));
        assert!(supports_vulkan_1_3(vk::make_api_version(0, 1, 4, 0)));
        assert!(supports_vulkan_1_3(vk::make_api_version(0, 2, 0, 0)));
        assert!(!supports_vulkan_1_3(vk::API_VERSION_1_2));
        assert!(caps(256, true).meets_requirements());
    }

    #[test]
    fn uniform_slots_follow_alignment() {
        // A mat4 is 64 bytes
        assert_eq!(caps(256, true).aligned_uniform_size(64), 256);
        assert_eq!(caps(16, true).aligned_uniform_size(64), 64);
        assert_eq!(caps(64, true).aligned_uniform_size(96), 128);
    }

    #[test]
    fn anisotropy_is_clamped() {
        assert_eq!(caps(256, true).anisotropy(16.0), Some(8.0));
        assert_eq!(caps(256, true).anisotropy(4.0), Some(4.0));
        assert_eq!(caps(256, false).anisotropy(16.0), None);
    }
}
