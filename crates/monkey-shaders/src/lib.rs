//! Sprite shaders for the monkey engine.
//!
//! GLSL sources live in `shaders/` and are compiled to SPIR-V by the build
//! script. The vertex stage reads the camera and the per-sprite model
//! matrix; the fragment stage samples the sprite texture and applies the
//! ambient and point lights.

use std::sync::OnceLock;

/// Embedded SPIR-V bytecode (raw bytes, may not be aligned).
mod spirv_bytes {
    pub static SPRITE_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/sprite_vert.spv"));
    pub static SPRITE_FRAG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/sprite_frag.spv"));
}

/// Convert byte slice to u32 words (SPIR-V requires 4-byte alignment).
fn bytes_to_spirv(bytes: &[u8]) -> Vec<u32> {
    debug_assert!(bytes.len() % 4 == 0, "SPIR-V length must be a multiple of 4");
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

static SPRITE_VERT_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();
static SPRITE_FRAG_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();

/// Sprite vertex shader.
pub fn sprite_vertex_shader() -> &'static [u32] {
    SPRITE_VERT_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::SPRITE_VERT))
}

/// Sprite fragment shader.
pub fn sprite_fragment_shader() -> &'static [u32] {
    SPRITE_FRAG_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::SPRITE_FRAG))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn sprite_shaders_load() {
        for shader in [sprite_vertex_shader(), sprite_fragment_shader()] {
            assert_eq!(shader[0], SPIRV_MAGIC, "Invalid SPIR-V magic number");
            assert!(shader.len() > 20, "Shader too small");
        }
    }

    #[test]
    fn words_are_little_endian() {
        assert_eq!(bytes_to_spirv(&[0x03, 0x02, 0x23, 0x07]), vec![SPIRV_MAGIC]);
    }
}
