//! Point and ambient lights.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};
use monkey_core::constants::MAX_POINT_LIGHTS;
use monkey_entity::{Attachment, Entity, World};

/// A light that brightens sprites within `radius` pixels of its position.
///
/// `color.rgb` is the tint and `color.a` the intensity.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub color: Vec4,
    pub position: Vec2,
    pub radius: f32,
    pub on: bool,
    pub attached: Option<Attachment>,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            position: Vec2::ZERO,
            radius: 0.0,
            on: false,
            attached: None,
        }
    }
}

impl PointLight {
    pub fn turn_on(&mut self) {
        self.on = true;
    }

    pub fn turn_off(&mut self) {
        self.on = false;
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.color.w = alpha;
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Follow an entity's transform instead of `position`.
    pub fn attach_to(&mut self, entity: Entity) {
        self.attached = Some(Attachment(entity));
    }

    pub fn detach(&mut self) {
        self.attached = None;
    }

    /// GPU data, resolving an attachment through `world`.
    pub fn uniform(&self, world: &World) -> LightUniform {
        let position = self
            .attached
            .and_then(|attachment| attachment.position(world))
            .unwrap_or(self.position);
        LightUniform {
            color: self.color.to_array(),
            position: position.to_array(),
            radius: self.radius,
            on: if self.on { 1.0 } else { 0.0 },
        }
    }
}

/// Fixed pool of point lights backing the lights uniform buffer.
#[derive(Debug, Default)]
pub struct PointLights {
    lights: Vec<PointLight>,
}

impl PointLights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a light, returning its index.
    pub fn spawn(&mut self) -> monkey_core::Result<usize> {
        if self.lights.len() >= MAX_POINT_LIGHTS {
            tracing::warn!("Point light pool is full ({MAX_POINT_LIGHTS})");
            return Err(monkey_core::Error::CapacityExceeded {
                what: "point lights",
                max: MAX_POINT_LIGHTS,
            });
        }
        self.lights.push(PointLight::default());
        Ok(self.lights.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&PointLight> {
        self.lights.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PointLight> {
        self.lights.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointLight> {
        self.lights.iter()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Contents of the lights uniform buffer. Unused slots are off.
    pub fn uniforms(&self, world: &World) -> LightsUniform {
        let mut uniforms = LightsUniform::zeroed();
        for (slot, light) in uniforms.lights.iter_mut().zip(&self.lights) {
            *slot = light.uniform(world);
        }
        uniforms
    }
}

/// One point light in std140 layout (32 byte array stride).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub color: [f32; 4],
    pub position: [f32; 2],
    pub radius: f32,
    pub on: f32,
}

/// The lights uniform block of `sprite.frag`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightsUniform {
    pub lights: [LightUniform; MAX_POINT_LIGHTS],
}

/// Light applied evenly to every sprite.
///
/// Pushed to the fragment shader as a push constant; `color.a` is the
/// intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vec4,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self { color: Vec4::ONE }
    }
}

impl AmbientLight {
    pub const fn new(color: Vec4) -> Self {
        Self { color }
    }

    pub fn push_constant(&self) -> [f32; 4] {
        self.color.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monkey_entity::Transform2D;

    #[test]
    fn uniform_layout_matches_std140() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 32);
        assert_eq!(std::mem::size_of::<LightsUniform>(), 32 * MAX_POINT_LIGHTS);
    }

    #[test]
    fn pool_is_bounded() {
        let mut lights = PointLights::new();
        for i in 0..MAX_POINT_LIGHTS {
            assert_eq!(lights.spawn().unwrap(), i);
        }
        assert!(matches!(
            lights.spawn(),
            Err(monkey_core::Error::CapacityExceeded { max: MAX_POINT_LIGHTS, .. })
        ));
        assert_eq!(lights.len(), MAX_POINT_LIGHTS);
    }

    #[test]
    fn uniforms_follow_attachment() {
        let mut world = World::new();
        let anchor = world.spawn((Transform2D::at_pixels(Vec2::new(10.0, 20.0), 0.0),));

        let mut lights = PointLights::new();
        let first = lights.spawn().unwrap();
        let light = lights.get_mut(first).unwrap();
        light.turn_on();
        light.set_alpha(0.8);
        light.set_radius(150.0);
        light.set_position(Vec2::new(-1.0, -1.0));
        light.attach_to(anchor);

        let uniforms = lights.uniforms(&world);
        assert_eq!(
            uniforms.lights[0],
            LightUniform {
                color: [1.0, 1.0, 1.0, 0.8],
                position: [10.0, 20.0],
                radius: 150.0,
                on: 1.0,
            }
        );
        assert_eq!(uniforms.lights[1], LightUniform::default());

        world.despawn(anchor).unwrap();
        assert_eq!(lights.uniforms(&world).lights[0].position, [-1.0, -1.0]);
    }

    #[test]
    fn ambient_defaults_to_full_white() {
        assert_eq!(AmbientLight::default().push_constant(), [1.0; 4]);
    }
}
