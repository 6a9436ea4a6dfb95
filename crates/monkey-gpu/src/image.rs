//! Image helpers: views, layout transitions, copies and depth formats.

use crate::error::{GpuError, Result};
use ash::vk;

/// Depth formats in order of preference.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Whether a depth format carries a stencil aspect.
pub fn has_stencil(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT
    )
}

/// Pick the first depth format usable as an optimally tiled depth attachment.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn find_depth_format(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<vk::Format> {
    DEPTH_FORMAT_CANDIDATES
        .into_iter()
        .find(|&format| {
            instance
                .get_physical_device_format_properties(physical_device, format)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or_else(|| GpuError::UnsupportedFormat("no depth attachment format".to_string()))
}

/// Single mip, single layer subresource range.
pub fn subresource_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Create a 2D image view.
///
/// # Safety
/// The device and image must be valid.
pub unsafe fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> Result<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(subresource_range(aspect_mask));

    Ok(device.create_image_view(&view_info, None)?)
}

/// Stage and access masks on both sides of a layout transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionMasks {
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
}

/// Masks for the layout transitions the renderer performs.
///
/// Unknown pairs fall back to a full barrier.
pub fn transition_masks(old: vk::ImageLayout, new: vk::ImageLayout) -> TransitionMasks {
    use vk::AccessFlags2 as A;
    use vk::ImageLayout as L;
    use vk::PipelineStageFlags2 as S;

    let (src_stage, src_access, dst_stage, dst_access) = match (old, new) {
        (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => {
            (S::TOP_OF_PIPE, A::NONE, S::TRANSFER, A::TRANSFER_WRITE)
        }
        (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => (
            S::TRANSFER,
            A::TRANSFER_WRITE,
            S::FRAGMENT_SHADER,
            A::SHADER_SAMPLED_READ,
        ),
        (L::UNDEFINED, L::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => (
            S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
            A::DEPTH_STENCIL_ATTACHMENT_WRITE,
            S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
            A::DEPTH_STENCIL_ATTACHMENT_READ | A::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ),
        (L::UNDEFINED, L::COLOR_ATTACHMENT_OPTIMAL) => (
            S::COLOR_ATTACHMENT_OUTPUT,
            A::NONE,
            S::COLOR_ATTACHMENT_OUTPUT,
            A::COLOR_ATTACHMENT_WRITE,
        ),
        (L::COLOR_ATTACHMENT_OPTIMAL, L::PRESENT_SRC_KHR) => (
            S::COLOR_ATTACHMENT_OUTPUT,
            A::COLOR_ATTACHMENT_WRITE,
            S::BOTTOM_OF_PIPE,
            A::NONE,
        ),
        _ => (
            S::ALL_COMMANDS,
            A::MEMORY_WRITE,
            S::ALL_COMMANDS,
            A::MEMORY_READ | A::MEMORY_WRITE,
        ),
    };

    TransitionMasks {
        src_stage,
        src_access,
        dst_stage,
        dst_access,
    }
}

/// Record a layout transition for a whole single-mip image.
///
/// # Safety
/// The command buffer must be recording and the image must be valid.
pub unsafe fn cmd_transition_image(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let masks = transition_masks(old_layout, new_layout);
    let barrier = vk::ImageMemoryBarrier2::default()
        .src_stage_mask(masks.src_stage)
        .src_access_mask(masks.src_access)
        .dst_stage_mask(masks.dst_stage)
        .dst_access_mask(masks.dst_access)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(subresource_range(aspect_mask));

    let dependency_info =
        vk::DependencyInfo::default().image_memory_barriers(std::slice::from_ref(&barrier));

    device.cmd_pipeline_barrier2(cmd, &dependency_info);
}

/// Record a copy of tightly packed buffer data into a color image.
///
/// # Safety
/// The command buffer must be recording and the image must be in
/// `TRANSFER_DST_OPTIMAL`.
pub unsafe fn cmd_copy_buffer_to_image(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    buffer: vk::Buffer,
    image: vk::Image,
    width: u32,
    height: u32,
) {
    let region = vk::BufferImageCopy::default()
        .buffer_offset(0)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        })
        .image_offset(vk::Offset3D::default())
        .image_extent(vk::Extent3D {
            width,
            height,
            depth: 1,
        });

    device.cmd_copy_buffer_to_image(
        cmd,
        buffer,
        image,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        &[region],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_transitions() {
        let to_dst = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        assert_eq!(to_dst.dst_stage, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(to_dst.dst_access, vk::AccessFlags2::TRANSFER_WRITE);

        let to_read = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );
        assert_eq!(to_read.src_access, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!(to_read.dst_stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
    }

    #[test]
    fn unknown_transition_is_full_barrier() {
        let masks = transition_masks(
            vk::ImageLayout::GENERAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );
        assert_eq!(masks.src_stage, vk::PipelineStageFlags2::ALL_COMMANDS);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags2::ALL_COMMANDS);
    }

    #[test]
    fn stencil_formats() {
        assert!(!has_stencil(DEPTH_FORMAT_CANDIDATES[0]));
        assert!(has_stencil(vk::Format::D24_UNORM_S8_UINT));
    }
}
