//! Sprite vertex format.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use monkey_core::Rect;

/// Indices of the two triangles of a sprite quad.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Vertices per sprite quad.
pub const QUAD_VERTICES: usize = 4;

/// Sprite vertex, laid out to match `sprite.vert`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(pos: [f32; 3], uv: [f32; 2]) -> Self {
        Self { pos, uv }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<Self>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription::default()
                .location(0)
                .binding(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(std::mem::offset_of!(Self, pos) as u32),
            vk::VertexInputAttributeDescription::default()
                .location(1)
                .binding(0)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(std::mem::offset_of!(Self, uv) as u32),
        ]
    }
}

/// Quad centered on the origin with the half extents of `rect`.
///
/// The rect position is not baked in; sprites are placed by their model
/// matrix.
pub fn quad(rect: &Rect) -> [Vertex; QUAD_VERTICES] {
    let (w, h) = (rect.size.x, rect.size.y);
    [
        Vertex::new([-w, -h, 0.0], [0.0, 1.0]),
        Vertex::new([w, -h, 0.0], [1.0, 1.0]),
        Vertex::new([w, h, 0.0], [1.0, 0.0]),
        Vertex::new([-w, h, 0.0], [0.0, 0.0]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_shader() {
        assert_eq!(std::mem::size_of::<Vertex>(), 20);
        assert_eq!(Vertex::binding_description().stride, 20);

        let attributes = Vertex::attribute_descriptions();
        let locations: Vec<u32> = attributes.iter().map(|a| a.location).collect();
        let offsets: Vec<u32> = attributes.iter().map(|a| a.offset).collect();
        assert_eq!(locations, [0, 1]);
        assert_eq!(offsets, [0, 12]);
    }

    #[test]
    fn quad_corners_and_uvs() {
        let verts = quad(&Rect::new(100.0, 100.0, 30.0, 40.0));
        assert_eq!(verts[0].pos, [-30.0, -40.0, 0.0]);
        assert_eq!(verts[2].pos, [30.0, 40.0, 0.0]);
        // Bottom of the quad samples the bottom row of the image
        assert_eq!(verts[0].uv, [0.0, 1.0]);
        assert_eq!(verts[3].uv, [0.0, 0.0]);
    }

    #[test]
    fn indices_cover_both_triangles() {
        let mut seen = QUAD_INDICES.to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen, [0, 1, 2, 3]);
    }
}
