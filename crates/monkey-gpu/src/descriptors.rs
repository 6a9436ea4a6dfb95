//! Descriptor set management.

use crate::error::Result;
use ash::vk;

/// Descriptor set layout builder.
///
/// The lifetime ties the builder to any immutable samplers baked into the
/// layout; they only need to outlive [`DescriptorSetLayoutBuilder::build`].
pub struct DescriptorSetLayoutBuilder<'a> {
    bindings: Vec<vk::DescriptorSetLayoutBinding<'a>>,
}

impl<'a> DescriptorSetLayoutBuilder<'a> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Add a binding.
    #[must_use]
    pub fn binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        count: u32,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(count)
                .stage_flags(stage_flags),
        );
        self
    }

    /// Add a uniform buffer binding.
    #[must_use]
    pub fn uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.binding(binding, vk::DescriptorType::UNIFORM_BUFFER, 1, stage_flags)
    }

    /// Add a dynamic uniform buffer binding (offset supplied at bind time).
    #[must_use]
    pub fn uniform_buffer_dynamic(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.binding(
            binding,
            vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
            1,
            stage_flags,
        )
    }

    /// Add a combined image sampler binding.
    ///
    /// When `immutable_samplers` is non-empty the samplers are baked into the
    /// layout and only the image view has to be written later.
    #[must_use]
    pub fn combined_image_sampler(
        mut self,
        binding: u32,
        stage_flags: vk::ShaderStageFlags,
        immutable_samplers: &'a [vk::Sampler],
    ) -> Self {
        let mut layout_binding = vk::DescriptorSetLayoutBinding::default()
            .binding(binding)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(stage_flags);
        if !immutable_samplers.is_empty() {
            layout_binding = layout_binding.immutable_samplers(immutable_samplers);
        }
        self.bindings.push(layout_binding);
        self
    }

    /// Bindings added so far.
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding<'a>] {
        &self.bindings
    }

    /// Build the descriptor set layout.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn build(self, device: &ash::Device) -> Result<vk::DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&self.bindings);

        let layout = device.create_descriptor_set_layout(&layout_info, None)?;
        Ok(layout)
    }
}

impl Default for DescriptorSetLayoutBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor pool for allocating descriptor sets.
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Create a new descriptor pool.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> Result<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes)
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);

        let pool = device.create_descriptor_pool(&create_info, None)?;
        Ok(Self { pool })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    /// Allocate descriptor sets.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate(
        &self,
        device: &ash::Device,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        let sets = device.allocate_descriptor_sets(&alloc_info)?;
        Ok(sets)
    }

    /// Return descriptor sets to the pool.
    ///
    /// # Safety
    /// The device must be valid and the sets must not be in use.
    pub unsafe fn free(&self, device: &ash::Device, sets: &[vk::DescriptorSet]) -> Result<()> {
        device.free_descriptor_sets(self.pool, sets)?;
        Ok(())
    }

    /// Destroy the pool.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_descriptor_pool(self.pool, None);
    }
}

/// Write a buffer descriptor of the given type (plain or dynamic uniform).
///
/// For dynamic uniform buffers `range` is the size of one element and the
/// per-draw offset is supplied to `cmd_bind_descriptor_sets`.
///
/// # Safety
/// Device and buffer must be valid.
pub unsafe fn write_uniform_buffer(
    device: &ash::Device,
    dst_set: vk::DescriptorSet,
    binding: u32,
    descriptor_type: vk::DescriptorType,
    buffer: vk::Buffer,
    range: u64,
) {
    let buffer_info = vk::DescriptorBufferInfo::default()
        .buffer(buffer)
        .offset(0)
        .range(range);

    let write = vk::WriteDescriptorSet::default()
        .dst_set(dst_set)
        .dst_binding(binding)
        .descriptor_type(descriptor_type)
        .buffer_info(std::slice::from_ref(&buffer_info));

    device.update_descriptor_sets(&[write], &[]);
}

/// Write a combined image sampler descriptor.
///
/// Pass `vk::Sampler::null()` when the layout uses an immutable sampler.
///
/// # Safety
/// Device, sampler, and image view must be valid.
pub unsafe fn write_combined_image_sampler(
    device: &ash::Device,
    dst_set: vk::DescriptorSet,
    binding: u32,
    sampler: vk::Sampler,
    image_view: vk::ImageView,
) {
    let image_info = vk::DescriptorImageInfo::default()
        .sampler(sampler)
        .image_view(image_view)
        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

    let write = vk::WriteDescriptorSet::default()
        .dst_set(dst_set)
        .dst_binding(binding)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .image_info(std::slice::from_ref(&image_info));

    device.update_descriptor_sets(&[write], &[]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_bindings() {
        let samplers = [vk::Sampler::null()];
        let builder = DescriptorSetLayoutBuilder::new()
            .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
            .uniform_buffer_dynamic(1, vk::ShaderStageFlags::VERTEX)
            .combined_image_sampler(2, vk::ShaderStageFlags::FRAGMENT, &samplers);

        let bindings = builder.bindings();
        assert_eq!(bindings.len(), 3);
        assert_eq!(
            bindings[1].descriptor_type,
            vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
        );
        assert_eq!(bindings[2].binding, 2);
        assert_eq!(bindings[2].stage_flags, vk::ShaderStageFlags::FRAGMENT);
        assert!(!bindings[2].p_immutable_samplers.is_null());
    }

    #[test]
    fn sampler_without_immutable_samplers() {
        let builder = DescriptorSetLayoutBuilder::new().combined_image_sampler(
            0,
            vk::ShaderStageFlags::FRAGMENT,
            &[],
        );
        assert!(builder.bindings()[0].p_immutable_samplers.is_null());
    }
}
