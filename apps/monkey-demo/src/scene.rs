//! The sandbox scene: player, floating objects, arena walls and lights.

use glam::{Vec2, Vec4};
use monkey_app::{CommandPool, GpuContext};
use monkey_core::constants::{DEFAULT_TEXTURE, MAX_POINT_LIGHTS};
use monkey_core::Rect;
use monkey_entity::{Entity, Name, Transform2D, World};
use monkey_physics::{BodyKind, PhysicsWorld, RigidBody, RigidBodyHandle, ShapeMaterial, DEFAULT_GRAVITY};
use monkey_render::{PointLights, Sprite, TextureCache, TextureId};
use rand::Rng;
use tracing::info;

/// Spawn rounds; each spawns one object of every kind.
const OBJECT_ROUNDS: usize = 100;
/// Objects are scattered within this many pixels of the origin.
const SPAWN_EXTENT: f32 = 800.0;
const WALL_OFFSET: f32 = 850.0;
const WALL_HALF_THICKNESS: f32 = 5.0;
const PLAYER_DEPTH: f32 = 0.12;
const PLAYER_FRAMES: usize = 16;

/// Textures the scene draws with.
pub struct SceneTextures {
    pub player: Vec<TextureId>,
    pub sun: TextureId,
    pub cd: TextureId,
    pub circle: TextureId,
    pub circle_maze: TextureId,
    pub plain: TextureId,
}

impl SceneTextures {
    /// Load every texture, substituting the default for missing files.
    pub fn load(cache: &mut TextureCache, gpu: &GpuContext, commands: &CommandPool) -> Self {
        let mut load = |path: &str| cache.load_or_default(gpu, commands, path);
        let player = (1..=PLAYER_FRAMES)
            .map(|i| load(&format!("textures/anim_{i:02}.png")))
            .collect();
        Self {
            player,
            sun: load("textures/sun.png"),
            cd: load("textures/cd.png"),
            circle: load("textures/circle.png"),
            circle_maze: load("textures/circle-maze.png"),
            plain: load(DEFAULT_TEXTURE),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Box,
    /// Circle with the given radius as a fraction of the rect's half width.
    Circle(f32),
}

/// Entities and physics of the running game.
pub struct Scene {
    pub world: World,
    pub physics: PhysicsWorld,
    pub player: Entity,
    pub player_body: RigidBodyHandle,
    /// Kinematic bar in the middle of the arena.
    pub block: RigidBodyHandle,
    /// Invisible entity the wandering light follows.
    pub light_anchor: Entity,
    pub objects: Vec<Entity>,
}

impl Scene {
    pub fn build(textures: &SceneTextures, rng: &mut impl Rng) -> anyhow::Result<Self> {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(DEFAULT_GRAVITY);

        let player_rect = Rect::new(0.0, 0.0, 30.0, 40.0);
        let player_body = physics.create_body(BodyKind::Dynamic, player_rect.pos, 0.0);
        physics.add_box(
            player_body,
            player_rect.size.x * 0.8,
            player_rect.size.y * 0.7,
            ShapeMaterial::default(),
        )?;
        physics.set_fixed_rotation(player_body, true)?;
        physics.set_restitution(player_body, 0.0)?;
        physics.set_gravity_scale(player_body, 0.0)?;
        let player = world.spawn((
            Name("player".to_string()),
            Sprite::new(player_rect, textures.player.clone())?,
            Transform2D::at_pixels(player_rect.pos, PLAYER_DEPTH),
            RigidBody(player_body),
        ));

        let light_anchor = world.spawn((Name("light anchor".to_string()), Transform2D::default()));

        let mut scene = Self {
            world,
            physics,
            player,
            player_body,
            block: player_body,
            light_anchor,
            objects: Vec::new(),
        };

        for _ in 0..OBJECT_ROUNDS {
            let kinds = [
                (textures.sun, Shape::Circle(1.0 / 2.5)),
                (textures.cd, Shape::Circle(1.0)),
                (textures.circle, Shape::Circle(1.0)),
                (textures.circle_maze, Shape::Circle(1.0)),
                (textures.plain, Shape::Box),
            ];
            for (texture, shape) in kinds {
                let rect = random_rect(rng, matches!(shape, Shape::Circle(_)));
                scene.spawn_object(rect, texture, shape, BodyKind::Dynamic)?;
            }
        }
        scene.float_objects()?;

        let walls = [
            Rect::new(0.0, WALL_OFFSET, WALL_OFFSET, WALL_HALF_THICKNESS),
            Rect::new(0.0, -WALL_OFFSET, WALL_OFFSET, WALL_HALF_THICKNESS),
            Rect::new(-WALL_OFFSET, 0.0, WALL_HALF_THICKNESS, WALL_OFFSET),
            Rect::new(WALL_OFFSET, 0.0, WALL_HALF_THICKNESS, WALL_OFFSET),
        ];
        for wall in walls {
            scene.spawn_object(wall, textures.plain, Shape::Box, BodyKind::Static)?;
        }

        let block = scene.spawn_object(
            Rect::new(0.0, 0.0, 5.0, 450.0),
            textures.plain,
            Shape::Box,
            BodyKind::Kinematic,
        )?;
        scene.block = scene.body_of(block)?;

        info!(
            "Scene built: {} objects, {} bodies",
            scene.objects.len(),
            scene.physics.body_count()
        );
        Ok(scene)
    }

    fn spawn_object(
        &mut self,
        rect: Rect,
        texture: TextureId,
        shape: Shape,
        kind: BodyKind,
    ) -> anyhow::Result<Entity> {
        let body = self.physics.create_body(kind, rect.pos, 0.0);
        match shape {
            Shape::Box => self
                .physics
                .add_box(body, rect.size.x, rect.size.y, ShapeMaterial::default())?,
            Shape::Circle(scale) => self.physics.add_circle(
                body,
                rect.size.x * scale,
                Vec2::ZERO,
                ShapeMaterial::default(),
            )?,
        }
        let entity = self.world.spawn((
            Sprite::single(rect, texture)?,
            Transform2D::at_pixels(rect.pos, 0.0),
            RigidBody(body),
        ));
        self.objects.push(entity);
        Ok(entity)
    }

    /// Let objects drift slowly up or down depending on sprite id parity.
    fn float_objects(&mut self) -> anyhow::Result<()> {
        for &entity in &self.objects {
            let id = self.world.get::<&Sprite>(entity)?.id().get();
            let body = self.world.get::<&RigidBody>(entity)?.0;
            let scale = if id % 2 == 0 { 0.01 } else { -0.01 };
            self.physics.set_gravity_scale(body, scale)?;
        }
        Ok(())
    }

    fn body_of(&self, entity: Entity) -> anyhow::Result<RigidBodyHandle> {
        Ok(self.world.get::<&RigidBody>(entity)?.0)
    }

    /// Light 0 follows the player, light 1 the wandering anchor, and the
    /// rest follow every fifth object.
    pub fn light_up(&self, lights: &mut PointLights) -> anyhow::Result<()> {
        for index in 0..MAX_POINT_LIGHTS {
            let slot = lights.spawn()?;
            let Some(light) = lights.get_mut(slot) else {
                continue;
            };
            let (target, alpha, radius) = match index {
                0 => (self.player, 1.0, 100.0),
                1 => (self.light_anchor, 0.8, 150.0),
                i => match self.objects.get(i * 5) {
                    Some(&object) => (object, 0.6, 20.0),
                    None => continue,
                },
            };
            light.attach_to(target);
            light.set_color(Vec4::ONE);
            light.set_alpha(alpha);
            light.set_radius(radius);
            light.turn_on();
        }
        Ok(())
    }
}

/// Random object rect within the arena. Circles get equal half extents.
fn random_rect(rng: &mut impl Rng, square: bool) -> Rect {
    let x = rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT);
    let y = rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT);
    let half_w = rng.gen_range(10.0..17.0);
    let half_h = if square { half_w } else { rng.gen_range(10.0..17.0) };
    Rect::new(x, y, half_w, half_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use monkey_entity::Attachment;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FLOATING: usize = OBJECT_ROUNDS * 5;

    fn textures() -> SceneTextures {
        let player = (0..PLAYER_FRAMES as u32).map(TextureId::from_index).collect();
        SceneTextures {
            player,
            sun: TextureId::from_index(16),
            cd: TextureId::from_index(17),
            circle: TextureId::from_index(18),
            circle_maze: TextureId::from_index(19),
            plain: TextureId::from_index(20),
        }
    }

    fn scene() -> Scene {
        Scene::build(&textures(), &mut StdRng::seed_from_u64(42)).unwrap()
    }

    fn texture_of(scene: &Scene, entity: Entity) -> TextureId {
        scene.world.get::<&Sprite>(entity).unwrap().texture()
    }

    #[test]
    fn objects_walls_and_block() {
        let scene = scene();
        let textures = textures();

        assert_eq!(scene.objects.len(), FLOATING + 4 + 1);
        // Every object plus the player has a body; the light anchor does not
        assert_eq!(scene.physics.body_count(), scene.objects.len() + 1);

        let kinds = [
            textures.sun,
            textures.cd,
            textures.circle,
            textures.circle_maze,
            textures.plain,
        ];
        for (i, &object) in scene.objects[..FLOATING].iter().enumerate() {
            assert_eq!(texture_of(&scene, object), kinds[i % 5]);
            let body = scene.body_of(object).unwrap();
            assert_eq!(scene.physics.body_kind(body).unwrap(), BodyKind::Dynamic);
        }

        for &wall in &scene.objects[FLOATING..FLOATING + 4] {
            let body = scene.body_of(wall).unwrap();
            assert_eq!(scene.physics.body_kind(body).unwrap(), BodyKind::Static);
            assert_eq!(texture_of(&scene, wall), textures.plain);
        }

        let block = scene.objects[FLOATING + 4];
        assert_eq!(scene.body_of(block).unwrap(), scene.block);
        assert_eq!(scene.physics.body_kind(scene.block).unwrap(), BodyKind::Kinematic);

        assert_eq!(scene.physics.body_kind(scene.player_body).unwrap(), BodyKind::Dynamic);
        assert_relative_eq!(scene.physics.gravity_scale(scene.player_body).unwrap(), 0.0);
        assert_eq!(
            scene.world.get::<&Sprite>(scene.player).unwrap().frames().len(),
            PLAYER_FRAMES
        );
    }

    #[test]
    fn objects_drift_by_sprite_parity() {
        let scene = scene();
        let (mut up, mut down) = (0, 0);
        for &object in &scene.objects[..FLOATING] {
            let id = scene.world.get::<&Sprite>(object).unwrap().id().get();
            let scale = scene.physics.gravity_scale(scene.body_of(object).unwrap()).unwrap();
            if id % 2 == 0 {
                assert_relative_eq!(scale, 0.01);
                up += 1;
            } else {
                assert_relative_eq!(scale, -0.01);
                down += 1;
            }
        }
        assert!(up > 0 && down > 0);
    }

    #[test]
    fn lights_follow_player_anchor_and_every_fifth_object() {
        let scene = scene();
        let mut lights = PointLights::new();
        scene.light_up(&mut lights).unwrap();
        assert_eq!(lights.len(), MAX_POINT_LIGHTS);

        let player = lights.get(0).unwrap();
        assert_eq!(player.attached, Some(Attachment(scene.player)));
        assert_relative_eq!(player.radius, 100.0);
        assert_relative_eq!(player.color.w, 1.0);

        let wandering = lights.get(1).unwrap();
        assert_eq!(wandering.attached, Some(Attachment(scene.light_anchor)));
        assert_relative_eq!(wandering.radius, 150.0);
        assert_relative_eq!(wandering.color.w, 0.8);

        for i in 2..MAX_POINT_LIGHTS {
            let light = lights.get(i).unwrap();
            assert_eq!(light.attached, Some(Attachment(scene.objects[i * 5])));
            assert_relative_eq!(light.radius, 20.0);
            assert_relative_eq!(light.color.w, 0.6);
        }
        assert!(lights.iter().all(|light| light.on));
    }

    #[test]
    fn random_rects_stay_in_arena() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let rect = random_rect(&mut rng, false);
            assert!(rect.pos.x.abs() <= SPAWN_EXTENT && rect.pos.y.abs() <= SPAWN_EXTENT);
            assert!((10.0..17.0).contains(&rect.size.x));
            assert!((10.0..17.0).contains(&rect.size.y));
            assert!(rect.max().x < WALL_OFFSET - WALL_HALF_THICKNESS);
        }
    }

    #[test]
    fn circle_rects_are_square() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let rect = random_rect(&mut rng, true);
            assert_eq!(rect.size.x, rect.size.y);
        }
    }
}
