//! Sprite textures and the descriptor sets that bind them.
//!
//! Every texture is uploaded once as an `R8G8B8A8_UNORM` image and gets its
//! own descriptor set (set 1 of the sprite pipeline). All textures share one
//! immutable sampler baked into the set layout.

use ash::vk;
use hashbrown::HashMap;
use image::RgbaImage;
use monkey_core::Rect;
use monkey_gpu::descriptors::{write_combined_image_sampler, DescriptorPool, DescriptorSetLayoutBuilder};
use monkey_gpu::image::create_image_view;
use monkey_gpu::{CommandPool, GpuContext, GpuImage, StagingUploader};
use tracing::{debug, info, warn};

use crate::error::{RenderError, Result};

/// Maximum number of textures a cache can hold.
pub const TEXTURE_CAPACITY: u32 = 256;

/// Anisotropy requested for the shared sampler, clamped to the device limit.
const REQUESTED_ANISOTROPY: f32 = 16.0;

/// Key of the built-in 1x1 white texture.
const WHITE_KEY: &str = "<white>";

/// Handle to a texture in a [`TextureCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u32);

impl TextureId {
    /// Id of the `index`-th texture loaded into a cache. Ids built by hand
    /// are only meaningful against a cache that loaded that many textures.
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A sampled texture resident on the GPU.
pub struct Texture {
    pub image: GpuImage,
    pub view: vk::ImageView,
    pub descriptor_set: vk::DescriptorSet,
    pub width: u32,
    pub height: u32,
    pub key: String,
}

/// Path-keyed texture store.
pub struct TextureCache {
    textures: Vec<Texture>,
    by_key: HashMap<String, TextureId>,
    sampler: vk::Sampler,
    layout: vk::DescriptorSetLayout,
    pool: DescriptorPool,
    default_texture: TextureId,
}

impl TextureCache {
    /// Create the sampler, set layout and pool, and upload the built-in
    /// white texture.
    pub fn new(gpu: &GpuContext, commands: &CommandPool) -> Result<Self> {
        let device = gpu.device();
        let anisotropy = gpu.capabilities().anisotropy(REQUESTED_ANISOTROPY);
        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(anisotropy.is_some())
            .max_anisotropy(anisotropy.unwrap_or(1.0))
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .min_lod(0.0)
            .max_lod(0.0);

        // SAFETY: the device is valid for the lifetime of the context
        let sampler = unsafe { device.create_sampler(&sampler_info, None)? };

        let immutable = [sampler];
        let pool_sizes = [vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(TEXTURE_CAPACITY)];

        // SAFETY: as above; partial results are destroyed on failure
        let (layout, pool) = unsafe {
            let layout = match DescriptorSetLayoutBuilder::new()
                .combined_image_sampler(0, vk::ShaderStageFlags::FRAGMENT, &immutable)
                .build(device)
            {
                Ok(layout) => layout,
                Err(e) => {
                    device.destroy_sampler(sampler, None);
                    return Err(e.into());
                }
            };
            match DescriptorPool::new(device, TEXTURE_CAPACITY, &pool_sizes) {
                Ok(pool) => (layout, pool),
                Err(e) => {
                    device.destroy_descriptor_set_layout(layout, None);
                    device.destroy_sampler(sampler, None);
                    return Err(e.into());
                }
            }
        };

        let mut cache = Self {
            textures: Vec::new(),
            by_key: HashMap::new(),
            sampler,
            layout,
            pool,
            default_texture: TextureId(0),
        };

        let white = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        match cache.insert_rgba(gpu, commands, WHITE_KEY, &white) {
            Ok(id) => cache.default_texture = id,
            Err(e) => {
                cache.destroy(gpu);
                return Err(e);
            }
        }

        debug!(
            "Texture cache ready (anisotropy: {})",
            anisotropy.map_or_else(|| "off".to_string(), |a| format!("{a}x"))
        );
        Ok(cache)
    }

    /// Load an image file, or return the existing id if the path was loaded before.
    pub fn load(&mut self, gpu: &GpuContext, commands: &CommandPool, path: &str) -> Result<TextureId> {
        if let Some(&id) = self.by_key.get(path) {
            return Ok(id);
        }
        let pixels = image::open(path)?.to_rgba8();
        let id = self.insert_rgba(gpu, commands, path, &pixels)?;
        info!("Loaded texture {path} ({}x{})", pixels.width(), pixels.height());
        Ok(id)
    }

    /// Like [`load`](Self::load), falling back to the default texture on failure.
    pub fn load_or_default(&mut self, gpu: &GpuContext, commands: &CommandPool, path: &str) -> TextureId {
        self.load(gpu, commands, path).unwrap_or_else(|e| {
            warn!("Texture {path} unavailable, using default: {e}");
            // Remember the miss so the file is not retried every spawn
            self.by_key.insert(path.to_string(), self.default_texture);
            self.default_texture
        })
    }

    /// Upload decoded RGBA pixels under `key`.
    pub fn insert_rgba(
        &mut self,
        gpu: &GpuContext,
        commands: &CommandPool,
        key: &str,
        pixels: &RgbaImage,
    ) -> Result<TextureId> {
        if self.textures.len() >= TEXTURE_CAPACITY as usize {
            return Err(monkey_core::Error::CapacityExceeded {
                what: "textures",
                max: TEXTURE_CAPACITY as usize,
            }
            .into());
        }

        let (width, height) = pixels.dimensions();
        let mut image =
            StagingUploader::new(gpu, commands).upload_rgba_image(pixels.as_raw(), width, height, key)?;

        let device = gpu.device();
        // SAFETY: the image was just created on this device and is idle
        let bound = unsafe {
            create_image_view(device, image.image, image.format, vk::ImageAspectFlags::COLOR)
                .and_then(|view| match self.pool.allocate(device, &[self.layout]) {
                    Ok(sets) => Ok((view, sets)),
                    Err(e) => {
                        device.destroy_image_view(view, None);
                        Err(e)
                    }
                })
        };
        let (view, sets) = match bound {
            Ok(bound) => bound,
            Err(e) => {
                gpu.allocator().lock().free_image(&mut image)?;
                return Err(e.into());
            }
        };
        let descriptor_set = sets[0];

        // SAFETY: the set is freshly allocated and not in use
        unsafe {
            write_combined_image_sampler(device, descriptor_set, 0, vk::Sampler::null(), view);
        }

        let id = TextureId::from_index(self.textures.len() as u32);
        self.textures.push(Texture {
            image,
            view,
            descriptor_set,
            width,
            height,
            key: key.to_string(),
        });
        self.by_key.insert(key.to_string(), id);
        Ok(id)
    }

    /// The built-in white texture.
    pub fn default_texture(&self) -> TextureId {
        self.default_texture
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.index())
    }

    /// Descriptor set for `id`, or an error for ids from another cache.
    pub fn descriptor_set(&self, id: TextureId) -> Result<vk::DescriptorSet> {
        self.get(id)
            .map(|t| t.descriptor_set)
            .ok_or(RenderError::UnknownTexture(id))
    }

    /// Layout of set 1 of the sprite pipeline.
    pub fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Destroy every texture and the shared objects. The device must be idle.
    pub fn destroy(&mut self, gpu: &GpuContext) {
        let device = gpu.device();
        let mut allocator = gpu.allocator().lock();
        for mut texture in self.textures.drain(..) {
            // SAFETY: caller guarantees the device is idle
            unsafe { device.destroy_image_view(texture.view, None) };
            if let Err(e) = allocator.free_image(&mut texture.image) {
                warn!("Failed to free texture {}: {e}", texture.key);
            }
        }
        self.by_key.clear();
        // SAFETY: no set allocated from the pool is in use any more
        unsafe {
            self.pool.destroy(device);
            device.destroy_descriptor_set_layout(self.layout, None);
            device.destroy_sampler(self.sampler, None);
        }
    }
}

/// Bounding rects of the opaque areas of an atlas image.
///
/// Scans rows top to bottom. Each opaque pixel not already covered starts a
/// region as wide as its opaque run and as tall as the opaque run below it.
/// Rects are in image pixels (y down), centered with half extents.
pub fn opaque_regions(image: &RgbaImage) -> Vec<Rect> {
    let (width, height) = image.dimensions();
    let opaque = |x: u32, y: u32| image.get_pixel(x, y)[3] > 0;

    // (x, y, w, h) with x, y the top-left corner
    let mut regions: Vec<(u32, u32, u32, u32)> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if !opaque(x, y) {
                continue;
            }
            let covered = regions
                .iter()
                .any(|&(rx, ry, rw, rh)| (rx..rx + rw).contains(&x) && (ry..ry + rh).contains(&y));
            if covered {
                continue;
            }
            let w = (x..width).take_while(|&cx| opaque(cx, y)).count() as u32;
            let h = (y..height).take_while(|&cy| opaque(x, cy)).count() as u32;
            regions.push((x, y, w, h));
        }
    }

    debug!("Found {} opaque regions in {width}x{height} image", regions.len());
    regions
        .into_iter()
        .map(|(x, y, w, h)| {
            let (half_w, half_h) = (w as f32 / 2.0, h as f32 / 2.0);
            Rect::new(x as f32 + half_w, y as f32 + half_h, half_w, half_h)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn atlas() -> RgbaImage {
        let mut img = RgbaImage::new(8, 4);
        for (x, y) in [(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)] {
            img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
        for y in 1..4 {
            for x in 5..7 {
                img.put_pixel(x, y, Rgba([0, 0, 255, 128]));
            }
        }
        img
    }

    #[test]
    fn finds_separate_blocks() {
        let regions = opaque_regions(&atlas());
        assert_eq!(
            regions,
            vec![Rect::new(1.5, 1.0, 1.5, 1.0), Rect::new(6.0, 2.5, 1.0, 1.5)]
        );
    }

    #[test]
    fn transparent_image_has_no_regions() {
        assert!(opaque_regions(&RgbaImage::new(4, 4)).is_empty());
    }

    #[test]
    fn region_touching_the_edge() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([1, 1, 1, 1]));
        assert_eq!(opaque_regions(&img), vec![Rect::new(1.5, 1.0, 1.5, 1.0)]);
    }
}
