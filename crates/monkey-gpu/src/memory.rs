//! GPU memory for sprite data.
//!
//! Buffers are host-visible uniform/vertex storage or device-local copies of
//! staged data. Images are single-mip 2D textures and depth targets. Every
//! resource owns its allocation and must be handed back with the matching
//! `free_*` call.

use crate::error::{GpuError, Result};
use ash::vk;
use bytemuck::Pod;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::{AllocatorDebugSettings, MemoryLocation};
use std::sync::Arc;

fn allocation_failed(err: gpu_allocator::AllocationError) -> GpuError {
    GpuError::AllocationFailed(err.to_string())
}

/// Owns the `gpu-allocator` heap for one device.
pub struct GpuAllocator {
    heap: Option<Allocator>,
    device: Arc<ash::Device>,
}

impl GpuAllocator {
    /// # Safety
    /// The instance, device, and physical device must be valid.
    pub unsafe fn new(
        instance: &ash::Instance,
        device: Arc<ash::Device>,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let heap = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: (*device).clone(),
            physical_device,
            debug_settings: AllocatorDebugSettings {
                log_memory_information: cfg!(debug_assertions),
                log_leaks_on_shutdown: true,
                store_stack_traces: cfg!(debug_assertions),
                ..AllocatorDebugSettings::default()
            },
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(allocation_failed)?;

        Ok(Self {
            heap: Some(heap),
            device,
        })
    }

    fn heap(&mut self) -> Result<&mut Allocator> {
        self.heap
            .as_mut()
            .ok_or_else(|| GpuError::InvalidState("allocator already shut down".to_string()))
    }

    fn allocate(
        &mut self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        self.heap()?
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(allocation_failed)
    }

    fn release(&mut self, allocation: Option<Allocation>) -> Result<()> {
        match allocation {
            Some(allocation) => self.heap()?.free(allocation).map_err(allocation_failed),
            None => Ok(()),
        }
    }

    /// Create a buffer of `size` bytes. `CpuToGpu` buffers stay mapped for
    /// their whole lifetime.
    pub fn create_buffer(
        &mut self,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<GpuBuffer> {
        let info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        // SAFETY: the device outlives the allocator
        let buffer = unsafe { self.device.create_buffer(&info, None)? };
        // SAFETY: the buffer was just created on this device
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };

        let bound = self
            .allocate(name, requirements, location, true)
            .and_then(|allocation| {
                // SAFETY: the allocation satisfies the buffer's requirements
                match unsafe {
                    self.device
                        .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                } {
                    Ok(()) => Ok(allocation),
                    Err(e) => {
                        self.release(Some(allocation))?;
                        Err(e.into())
                    }
                }
            });

        match bound {
            Ok(allocation) => Ok(GpuBuffer {
                buffer,
                allocation: Some(allocation),
                size,
            }),
            Err(e) => {
                // SAFETY: the buffer has no memory bound and was never used
                unsafe { self.device.destroy_buffer(buffer, None) };
                Err(e)
            }
        }
    }

    pub fn free_buffer(&mut self, buffer: &mut GpuBuffer) -> Result<()> {
        self.release(buffer.allocation.take())?;
        // SAFETY: caller guarantees no pending GPU work uses the buffer
        unsafe { self.device.destroy_buffer(buffer.buffer, None) };
        buffer.buffer = vk::Buffer::null();
        Ok(())
    }

    /// Create a device-local, single-mip, optimally tiled 2D image.
    pub fn create_image_2d(
        &mut self,
        format: vk::Format,
        extent: vk::Extent2D,
        usage: vk::ImageUsageFlags,
        name: &str,
    ) -> Result<GpuImage> {
        let info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        // SAFETY: the device outlives the allocator
        let image = unsafe { self.device.create_image(&info, None)? };
        // SAFETY: the image was just created on this device
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };

        let bound = self
            .allocate(name, requirements, MemoryLocation::GpuOnly, false)
            .and_then(|allocation| {
                // SAFETY: the allocation satisfies the image's requirements
                match unsafe {
                    self.device
                        .bind_image_memory(image, allocation.memory(), allocation.offset())
                } {
                    Ok(()) => Ok(allocation),
                    Err(e) => {
                        self.release(Some(allocation))?;
                        Err(e.into())
                    }
                }
            });

        match bound {
            Ok(allocation) => Ok(GpuImage {
                image,
                allocation: Some(allocation),
                format,
                extent,
            }),
            Err(e) => {
                // SAFETY: the image has no memory bound and was never used
                unsafe { self.device.destroy_image(image, None) };
                Err(e)
            }
        }
    }

    pub fn free_image(&mut self, image: &mut GpuImage) -> Result<()> {
        self.release(image.allocation.take())?;
        // SAFETY: caller guarantees no pending GPU work uses the image
        unsafe { self.device.destroy_image(image.image, None) };
        image.image = vk::Image::null();
        Ok(())
    }

    /// Release the heap. Must run before the device is destroyed; anything
    /// still allocated is logged as a leak.
    pub fn shutdown(&mut self) {
        drop(self.heap.take());
    }
}

impl Drop for GpuAllocator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A buffer and the memory backing it.
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    pub allocation: Option<Allocation>,
    pub size: u64,
}

impl GpuBuffer {
    /// Pointer to the persistently mapped memory, if host-visible.
    pub fn mapped_ptr(&self) -> Option<*mut u8> {
        self.allocation
            .as_ref()
            .and_then(Allocation::mapped_ptr)
            .map(|p| p.as_ptr().cast::<u8>())
    }

    /// Copy `data` to the start of the buffer.
    pub fn write<T: Pod>(&self, data: &[T]) -> Result<()> {
        self.write_bytes(0, bytemuck::cast_slice(data))
    }

    /// Copy one value to `offset`, e.g. a model matrix into its slot.
    pub fn write_at<T: Pod>(&self, offset: u64, value: &T) -> Result<()> {
        self.write_bytes(offset, bytemuck::bytes_of(value))
    }

    pub fn write_bytes(&self, offset: u64, data: &[u8]) -> Result<()> {
        let ptr = self
            .mapped_ptr()
            .ok_or_else(|| GpuError::InvalidState("buffer is not host-visible".to_string()))?;
        check_range(offset, data.len() as u64, self.size)?;

        // SAFETY: the range fits the buffer and the mapping lives as long as
        // the allocation
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len());
        }
        Ok(())
    }
}

/// Check that `len` bytes at `offset` fit in a buffer of `size` bytes.
pub fn check_range(offset: u64, len: u64, size: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(GpuError::OutOfBounds { offset, len, size }),
    }
}

/// A 2D image and the memory backing it.
pub struct GpuImage {
    pub image: vk::Image,
    pub allocation: Option<Allocation>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}
