//! Sprite rendering for the monkey engine.
//!
//! This crate provides:
//! - The sprite vertex format and quad geometry
//! - Path-keyed texture loading with a shared immutable sampler
//! - The `Sprite` component with animation frames
//! - A 2D orthographic camera that can follow an entity
//! - Point and ambient lights
//! - `SpriteRenderer`, a single dynamic-rendering pass over all sprites

pub mod camera;
pub mod depth;
pub mod error;
pub mod light;
pub mod slots;
pub mod sprite;
pub mod sprite_renderer;
pub mod texture;
pub mod vertex;

pub use camera::{Camera2D, CameraUniforms, DEFAULT_CAMERA_POSITION};
pub use depth::DepthTarget;
pub use error::{RenderError, Result};
pub use light::{AmbientLight, LightUniform, LightsUniform, PointLight, PointLights};
pub use sprite::{Sprite, SpriteId};
pub use sprite_renderer::SpriteRenderer;
pub use texture::{opaque_regions, Texture, TextureCache, TextureId};
pub use vertex::{quad, Vertex, QUAD_INDICES};
