//! Entity components for the monkey sprite engine.
//!
//! Uses hecs as the ECS backend. Rendering and physics attach their own
//! components (`Sprite`, `RigidBody`) next to the [`Transform2D`] defined here.

mod transform;

pub use hecs::{Entity, World};
pub use transform::Transform2D;

/// Human-readable label for debugging and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

/// An entity that a camera or light follows.
///
/// The follower resolves the entity's transform every frame, so it tracks
/// physics-driven movement without any extra bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attachment(pub Entity);

impl Attachment {
    pub const fn entity(self) -> Entity {
        self.0
    }

    /// World-space pixel position of the attached entity, or `None` once it
    /// has been despawned or has no [`Transform2D`].
    pub fn position(self, world: &World) -> Option<glam::Vec2> {
        world
            .get::<&Transform2D>(self.0)
            .ok()
            .map(|transform| transform.position())
    }
}

impl From<Entity> for Attachment {
    fn from(entity: Entity) -> Self {
        Self(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn attachment_follows_transform() {
        let mut world = World::new();
        let mut transform = Transform2D::default();
        transform.set_from_physics(Vec2::new(1.0, -2.0), 0.0);
        let anchored = Attachment(world.spawn((transform, Name("light anchor".into()))));
        let bare = Attachment(world.spawn((Name("no transform".into()),)));

        assert_eq!(anchored.position(&world), Some(Vec2::new(32.0, -64.0)));
        assert_eq!(bare.position(&world), None);

        if let Ok(mut transform) = world.get::<&mut Transform2D>(anchored.entity()) {
            transform.set_from_physics(Vec2::new(0.5, 0.0), 0.0);
        }
        assert_eq!(anchored.position(&world), Some(Vec2::new(16.0, 0.0)));

        world.despawn(anchored.entity()).unwrap();
        assert_eq!(anchored.position(&world), None);
    }
}
