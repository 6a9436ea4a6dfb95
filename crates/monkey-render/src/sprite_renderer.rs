//! Single-pass sprite renderer.
//!
//! Descriptor layout:
//! - set 0 (one per frame in flight): camera UBO (vertex), model UBO with a
//!   dynamic offset per sprite (vertex), lights UBO (fragment)
//! - set 1 (one per texture): combined image sampler (fragment)
//! - push constant: ambient light color (fragment)
//!
//! All sprites share one vertex buffer (4 vertices per slot) and one
//! 6-index buffer; each draw selects its quad with `vertex_offset`.

use ash::vk;
use bytemuck::Pod;
use glam::Mat4;
use gpu_allocator::MemoryLocation;
use hashbrown::HashSet;
use monkey_core::constants::{CLEAR_COLOR, CLEAR_DEPTH};
use monkey_entity::{Transform2D, World};
use monkey_gpu::descriptors::{write_uniform_buffer, DescriptorPool, DescriptorSetLayoutBuilder};
use monkey_gpu::image::cmd_transition_image;
use monkey_gpu::{
    BlendMode, CommandPool, DeferredDeletionQueue, GpuBuffer, GpuContext, GraphicsPipeline,
    GraphicsPipelineConfig, StagingUploader,
};
use tracing::{debug, info};

use crate::camera::{Camera2D, CameraUniforms};
use crate::depth::DepthTarget;
use crate::error::Result;
use crate::light::{AmbientLight, LightsUniform, PointLights};
use crate::slots::{ModelStaging, SlotAllocator};
use crate::sprite::{Sprite, SpriteId};
use crate::texture::{TextureCache, TextureId};
use crate::vertex::{quad, Vertex, QUAD_INDICES, QUAD_VERTICES};

/// Sprite slots allocated up front.
const INITIAL_CAPACITY: u32 = 64;

const MODEL_SIZE: u64 = std::mem::size_of::<Mat4>() as u64;
const AMBIENT_SIZE: u32 = std::mem::size_of::<[f32; 4]>() as u32;

/// Capacity after growing `current` to hold at least `required` slots.
pub fn grown_capacity(current: u32, required: u32) -> u32 {
    if required <= current {
        return current;
    }
    required.max(current.saturating_mul(2)).max(INITIAL_CAPACITY)
}

/// One sprite to draw this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub sprite: SpriteId,
    pub slot: u32,
    pub texture: TextureId,
    pub depth: f32,
    pub version: u64,
    pub model: Mat4,
}

/// Far sprites first so alpha blends over what is behind; creation order
/// breaks ties.
pub fn sort_draws(draws: &mut [DrawItem]) {
    draws.sort_by(|a, b| a.depth.total_cmp(&b.depth).then(a.sprite.cmp(&b.sprite)));
}

/// Uniform buffers and descriptor set of one frame in flight.
struct FrameResources {
    camera: GpuBuffer,
    lights: GpuBuffer,
    models: GpuBuffer,
    model_capacity: u32,
    staging: ModelStaging,
    descriptor_set: vk::DescriptorSet,
}

fn host_buffer(gpu: &GpuContext, size: u64, usage: vk::BufferUsageFlags, name: &str) -> Result<GpuBuffer> {
    Ok(gpu
        .allocator()
        .lock()
        .create_buffer(size, usage, MemoryLocation::CpuToGpu, name)?)
}

fn uniform_size<T: Pod>() -> u64 {
    std::mem::size_of::<T>() as u64
}

/// Draws every entity with a [`Sprite`] component.
pub struct SpriteRenderer {
    pipeline: GraphicsPipeline,
    frame_layout: vk::DescriptorSetLayout,
    descriptor_pool: DescriptorPool,
    frames: Vec<FrameResources>,

    vertex_buffer: GpuBuffer,
    vertex_capacity: u32,
    vertices: Vec<Vertex>,
    index_buffer: GpuBuffer,

    slots: SlotAllocator,
    draws: Vec<DrawItem>,
    ambient: [f32; 4],
    model_stride: u64,

    depth: DepthTarget,
    extent: vk::Extent2D,
    deletion: DeferredDeletionQueue,
    frame_number: u64,
}

impl SpriteRenderer {
    /// Build the pipeline and per-frame resources for `frames_in_flight` frames.
    pub fn new(
        gpu: &GpuContext,
        commands: &CommandPool,
        textures: &TextureCache,
        color_format: vk::Format,
        extent: vk::Extent2D,
        frames_in_flight: usize,
    ) -> Result<Self> {
        let device = gpu.device();
        let model_stride = gpu.capabilities().aligned_uniform_size(MODEL_SIZE);

        // SAFETY: the device is valid for the lifetime of the context
        let frame_layout = unsafe {
            DescriptorSetLayoutBuilder::new()
                .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
                .uniform_buffer_dynamic(1, vk::ShaderStageFlags::VERTEX)
                .uniform_buffer(2, vk::ShaderStageFlags::FRAGMENT)
                .build(device)?
        };

        let depth_format = DepthTarget::select_format(gpu)?;
        let depth = DepthTarget::new(gpu, depth_format, extent)?;

        let config = GraphicsPipelineConfig {
            vertex_shader: monkey_shaders::sprite_vertex_shader().to_vec(),
            fragment_shader: monkey_shaders::sprite_fragment_shader().to_vec(),
            vertex_bindings: vec![Vertex::binding_description()],
            vertex_attributes: Vertex::attribute_descriptions().to_vec(),
            // Flipped sprites must stay visible
            cull_mode: vk::CullModeFlags::NONE,
            blend: BlendMode::Alpha,
            color_formats: vec![color_format],
            depth_format: Some(depth_format),
            ..Default::default()
        };
        let push_constant = vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .offset(0)
            .size(AMBIENT_SIZE);

        // SAFETY: shaders are embedded SPIR-V; layouts are alive
        let pipeline = unsafe {
            GraphicsPipeline::new(
                device,
                &config,
                &[frame_layout, textures.layout()],
                &[push_constant],
            )?
        };

        let sets = frames_in_flight as u32;
        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(2 * sets),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                .descriptor_count(sets),
        ];
        // SAFETY: as above
        let descriptor_pool = unsafe { DescriptorPool::new(device, sets, &pool_sizes)? };
        let layouts = vec![frame_layout; frames_in_flight];
        // SAFETY: as above
        let descriptor_sets = unsafe { descriptor_pool.allocate(device, &layouts)? };

        let mut frames = Vec::with_capacity(frames_in_flight);
        for (i, descriptor_set) in descriptor_sets.into_iter().enumerate() {
            let frame = FrameResources {
                camera: host_buffer(
                    gpu,
                    uniform_size::<CameraUniforms>(),
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    &format!("camera_uniforms_{i}"),
                )?,
                lights: host_buffer(
                    gpu,
                    uniform_size::<LightsUniform>(),
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    &format!("light_uniforms_{i}"),
                )?,
                models: host_buffer(
                    gpu,
                    u64::from(INITIAL_CAPACITY) * model_stride,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    &format!("model_uniforms_{i}"),
                )?,
                model_capacity: INITIAL_CAPACITY,
                staging: ModelStaging::default(),
                descriptor_set,
            };
            // SAFETY: the set is fresh and the buffers outlive it
            unsafe { Self::write_frame_set(device, &frame) };
            frames.push(frame);
        }

        let vertex_buffer = host_buffer(
            gpu,
            Self::vertex_bytes(INITIAL_CAPACITY),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            "sprite_vertices",
        )?;
        let index_buffer = StagingUploader::new(gpu, commands).upload_buffer(
            bytemuck::cast_slice(&QUAD_INDICES),
            vk::BufferUsageFlags::INDEX_BUFFER,
            "sprite_indices",
        )?;

        info!(
            "Sprite renderer ready: {frames_in_flight} frames in flight, model stride {model_stride} bytes, depth {depth_format:?}"
        );

        Ok(Self {
            pipeline,
            frame_layout,
            descriptor_pool,
            frames,
            vertex_buffer,
            vertex_capacity: INITIAL_CAPACITY,
            vertices: Vec::new(),
            index_buffer,
            slots: SlotAllocator::new(frames_in_flight),
            draws: Vec::new(),
            ambient: AmbientLight::default().push_constant(),
            model_stride,
            depth,
            extent,
            deletion: DeferredDeletionQueue::new(frames_in_flight),
            frame_number: 0,
        })
    }

    fn vertex_bytes(sprites: u32) -> u64 {
        u64::from(sprites) * (QUAD_VERTICES * std::mem::size_of::<Vertex>()) as u64
    }

    unsafe fn write_frame_set(device: &ash::Device, frame: &FrameResources) {
        write_uniform_buffer(
            device,
            frame.descriptor_set,
            0,
            vk::DescriptorType::UNIFORM_BUFFER,
            frame.camera.buffer,
            uniform_size::<CameraUniforms>(),
        );
        write_uniform_buffer(
            device,
            frame.descriptor_set,
            1,
            vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
            frame.models.buffer,
            MODEL_SIZE,
        );
        write_uniform_buffer(
            device,
            frame.descriptor_set,
            2,
            vk::DescriptorType::UNIFORM_BUFFER,
            frame.lights.buffer,
            uniform_size::<LightsUniform>(),
        );
    }

    /// Number of sprites drawn by the last [`prepare`](Self::prepare).
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    /// Upload this frame's camera, lights and changed sprite data.
    ///
    /// `frame_index` is the frame-in-flight slot whose fence has already
    /// been waited on.
    pub fn prepare(
        &mut self,
        gpu: &GpuContext,
        frame_index: usize,
        world: &mut World,
        camera: &Camera2D,
        lights: &PointLights,
        ambient: &AmbientLight,
    ) -> Result<()> {
        self.frame_number += 1;
        self.deletion
            .process(&mut gpu.allocator().lock(), self.frame_number)?;

        let mut fresh = Vec::new();
        self.draws.clear();
        for (_, (sprite, transform)) in world.query_mut::<(&mut Sprite, Option<&Transform2D>)>() {
            let depth = transform.map_or(0.0, |t| t.depth);
            if let Some(transform) = transform {
                sprite.set_model(transform.model);
            }
            let (slot, is_new) = self.slots.acquire(sprite.id(), self.frame_number);
            if is_new {
                fresh.push((slot, quad(sprite.rect())));
            }
            self.draws.push(DrawItem {
                sprite: sprite.id(),
                slot,
                texture: sprite.texture(),
                depth,
                version: sprite.version(),
                model: sprite.model(),
            });
        }

        let alive: HashSet<SpriteId> = self.draws.iter().map(|d| d.sprite).collect();
        let released = self.slots.retain(|id| alive.contains(&id), self.frame_number);
        if released > 0 {
            debug!("Released {released} sprite slots");
        }
        sort_draws(&mut self.draws);

        self.upload_vertices(gpu, &fresh)?;
        self.upload_frame(gpu, frame_index, world, camera, lights)?;
        self.ambient = ambient.push_constant();
        Ok(())
    }

    fn upload_vertices(&mut self, gpu: &GpuContext, fresh: &[(u32, [Vertex; QUAD_VERTICES])]) -> Result<()> {
        if fresh.is_empty() {
            return Ok(());
        }
        let high_water = self.slots.high_water();
        self.vertices
            .resize(high_water as usize * QUAD_VERTICES, Vertex::new([0.0; 3], [0.0; 2]));
        for (slot, quad) in fresh {
            let start = *slot as usize * QUAD_VERTICES;
            self.vertices[start..start + QUAD_VERTICES].copy_from_slice(quad);
        }

        if high_water > self.vertex_capacity {
            // The old buffer may still be read by frames in flight
            let capacity = grown_capacity(self.vertex_capacity, high_water);
            let buffer = host_buffer(
                gpu,
                Self::vertex_bytes(capacity),
                vk::BufferUsageFlags::VERTEX_BUFFER,
                "sprite_vertices",
            )?;
            buffer.write(&self.vertices)?;
            let old = std::mem::replace(&mut self.vertex_buffer, buffer);
            self.deletion.queue(old, self.frame_number);
            debug!("Vertex buffer grown to {capacity} sprites");
            self.vertex_capacity = capacity;
            return Ok(());
        }

        // New slots are never read by frames already in flight
        for (slot, quad) in fresh {
            let offset = Self::vertex_bytes(*slot);
            self.vertex_buffer
                .write_bytes(offset, bytemuck::cast_slice(quad))?;
        }
        Ok(())
    }

    fn upload_frame(
        &mut self,
        gpu: &GpuContext,
        frame_index: usize,
        world: &World,
        camera: &Camera2D,
        lights: &PointLights,
    ) -> Result<()> {
        let high_water = self.slots.high_water();
        let stride = self.model_stride;
        let frame = &mut self.frames[frame_index];

        if high_water > frame.model_capacity {
            let capacity = grown_capacity(frame.model_capacity, high_water);
            let models = host_buffer(
                gpu,
                u64::from(capacity) * stride,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                &format!("model_uniforms_{frame_index}"),
            )?;
            let old = std::mem::replace(&mut frame.models, models);
            self.deletion.queue(old, self.frame_number);
            frame.model_capacity = capacity;
            frame.staging.invalidate();
            // SAFETY: this frame's fence was waited on, so its set is idle
            unsafe { Self::write_frame_set(gpu.device(), frame) };
            debug!("Model buffer of frame {frame_index} grown to {capacity} sprites");
        }

        for draw in &self.draws {
            if frame.staging.needs_write(draw.slot, draw.sprite, draw.version) {
                frame
                    .models
                    .write_at(u64::from(draw.slot) * stride, &draw.model)?;
            }
        }

        frame
            .camera
            .write_at(0, &camera.uniforms(camera.focus(world)))?;
        frame.lights.write_at(0, &lights.uniforms(world))?;
        Ok(())
    }

    /// Record the sprite pass into `cmd`, leaving `image` ready to present.
    pub fn record(
        &self,
        gpu: &GpuContext,
        cmd: vk::CommandBuffer,
        frame_index: usize,
        image: vk::Image,
        image_view: vk::ImageView,
        textures: &TextureCache,
    ) -> Result<()> {
        let device = gpu.device();
        let frame = &self.frames[frame_index];
        let layout = self.pipeline.layout;

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(image_view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: CLEAR_COLOR,
                },
            });
        let depth_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.depth.view)
            .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: CLEAR_DEPTH,
                    stencil: 0,
                },
            });
        let render_area = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent: self.extent,
        };
        let rendering_info = vk::RenderingInfo::default()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment))
            .depth_attachment(&depth_attachment);
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.extent.width as f32,
            height: self.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        // SAFETY: cmd is recording; every bound object outlives the submission
        unsafe {
            cmd_transition_image(
                device,
                cmd,
                image,
                vk::ImageAspectFlags::COLOR,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            );
            cmd_transition_image(
                device,
                cmd,
                self.depth.image.image,
                self.depth.barrier_aspect(),
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            );

            device.cmd_begin_rendering(cmd, &rendering_info);
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(cmd, 0, &[render_area]);
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline.pipeline);
            device.cmd_bind_vertex_buffers(cmd, 0, &[self.vertex_buffer.buffer], &[0]);
            device.cmd_bind_index_buffer(cmd, self.index_buffer.buffer, 0, vk::IndexType::UINT32);

            for draw in &self.draws {
                let texture_set = textures
                    .descriptor_set(draw.texture)
                    .or_else(|_| textures.descriptor_set(textures.default_texture()))?;
                let model_offset = (u64::from(draw.slot) * self.model_stride) as u32;

                device.cmd_bind_descriptor_sets(
                    cmd,
                    vk::PipelineBindPoint::GRAPHICS,
                    layout,
                    0,
                    &[frame.descriptor_set],
                    &[model_offset],
                );
                device.cmd_bind_descriptor_sets(
                    cmd,
                    vk::PipelineBindPoint::GRAPHICS,
                    layout,
                    1,
                    &[texture_set],
                    &[],
                );
                device.cmd_push_constants(
                    cmd,
                    layout,
                    vk::ShaderStageFlags::FRAGMENT,
                    0,
                    bytemuck::bytes_of(&self.ambient),
                );
                device.cmd_draw_indexed(
                    cmd,
                    QUAD_INDICES.len() as u32,
                    1,
                    0,
                    (draw.slot as usize * QUAD_VERTICES) as i32,
                    0,
                );
            }

            device.cmd_end_rendering(cmd);
            cmd_transition_image(
                device,
                cmd,
                image,
                vk::ImageAspectFlags::COLOR,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                vk::ImageLayout::PRESENT_SRC_KHR,
            );
        }
        Ok(())
    }

    /// Recreate the depth target for a new swapchain extent. The device must be idle.
    pub fn resize(&mut self, gpu: &GpuContext, extent: vk::Extent2D) -> Result<()> {
        let format = self.depth.format;
        self.depth.destroy(gpu)?;
        self.depth = DepthTarget::new(gpu, format, extent)?;
        self.extent = extent;
        debug!("Sprite renderer resized to {}x{}", extent.width, extent.height);
        Ok(())
    }

    /// Release every GPU object. The device must be idle.
    pub fn destroy(&mut self, gpu: &GpuContext) -> Result<()> {
        let device = gpu.device();
        {
            let mut allocator = gpu.allocator().lock();
            self.deletion.flush(&mut allocator)?;
            for frame in &mut self.frames {
                allocator.free_buffer(&mut frame.camera)?;
                allocator.free_buffer(&mut frame.lights)?;
                allocator.free_buffer(&mut frame.models)?;
            }
            allocator.free_buffer(&mut self.vertex_buffer)?;
            allocator.free_buffer(&mut self.index_buffer)?;
        }
        self.frames.clear();
        self.depth.destroy(gpu)?;
        // SAFETY: caller guarantees the device is idle
        unsafe {
            self.pipeline.destroy(device);
            self.descriptor_pool.destroy(device);
            device.destroy_descriptor_set_layout(self.frame_layout, None);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(sprite: SpriteId, depth: f32) -> DrawItem {
        DrawItem {
            sprite,
            slot: 0,
            texture: TextureId::from_index(0),
            depth,
            version: 0,
            model: Mat4::IDENTITY,
        }
    }

    fn sprite_ids(n: usize) -> Vec<SpriteId> {
        (0..n)
            .map(|_| {
                Sprite::single(monkey_core::Rect::new(0.0, 0.0, 1.0, 1.0), TextureId::from_index(0))
                    .unwrap()
                    .id()
            })
            .collect()
    }

    #[test]
    fn capacity_grows_geometrically() {
        assert_eq!(grown_capacity(64, 10), 64);
        assert_eq!(grown_capacity(64, 65), 128);
        assert_eq!(grown_capacity(64, 300), 300);
        assert_eq!(grown_capacity(0, 1), INITIAL_CAPACITY);
    }

    #[test]
    fn draws_sorted_back_to_front() {
        let ids = sprite_ids(3);
        let mut draws = vec![draw(ids[2], 0.12), draw(ids[1], 0.0), draw(ids[0], 0.0)];
        sort_draws(&mut draws);
        let order: Vec<SpriteId> = draws.iter().map(|d| d.sprite).collect();
        assert_eq!(order, [ids[0], ids[1], ids[2]]);
    }

    #[test]
    fn vertex_region_per_slot() {
        assert_eq!(SpriteRenderer::vertex_bytes(1), 128);
        assert_eq!(SpriteRenderer::vertex_bytes(INITIAL_CAPACITY), 64 * 128);
    }
}
