use glam::Vec2;
use monkey_core::{px_to_m, to_meters, to_pixels};
use monkey_entity::{Transform2D, World};
use rapier2d::prelude::*;

use crate::{PhysicsError, Result, RigidBody};

/// Gravity in m/s² applied to every body with a gravity scale of 1.
pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, -5.0);

/// Longest interval integrated in one solver step.
const MAX_SUBSTEP: f32 = 1.0 / 60.0;
/// Cap on solver steps per call, so a long stall does not spiral.
const MAX_SUBSTEPS: u32 = 8;

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Moved by forces, gravity and contacts.
    Dynamic,
    /// Never moves.
    Static,
    /// Moved only by the velocities set on it.
    Kinematic,
}

impl From<BodyKind> for RigidBodyType {
    fn from(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Dynamic => Self::Dynamic,
            BodyKind::Static => Self::Fixed,
            BodyKind::Kinematic => Self::KinematicVelocityBased,
        }
    }
}

impl From<RigidBodyType> for BodyKind {
    fn from(kind: RigidBodyType) -> Self {
        match kind {
            RigidBodyType::Dynamic => Self::Dynamic,
            RigidBodyType::Fixed => Self::Static,
            RigidBodyType::KinematicVelocityBased | RigidBodyType::KinematicPositionBased => {
                Self::Kinematic
            }
        }
    }
}

/// Surface properties of a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeMaterial {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for ShapeMaterial {
    fn default() -> Self {
        Self {
            density: 10.0,
            friction: 1.0,
            restitution: 0.1,
        }
    }
}

/// A ray hit, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub body: Option<RigidBodyHandle>,
    pub point: Vec2,
    pub distance: f32,
}

/// The rapier2d simulation and all of its bookkeeping sets.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(DEFAULT_GRAVITY)
    }
}

impl PhysicsWorld {
    /// Create an empty world with the given gravity in m/s².
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity: vector![gravity.x, gravity.y],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// World gravity in m/s².
    pub fn gravity(&self) -> Vec2 {
        Vec2::new(self.gravity.x, self.gravity.y)
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Create a body centered at `pos_px`.
    pub fn create_body(&mut self, kind: BodyKind, pos_px: Vec2, angle: f32) -> RigidBodyHandle {
        let pos = to_meters(pos_px);
        let body = RigidBodyBuilder::new(kind.into())
            .translation(vector![pos.x, pos.y])
            .rotation(angle)
            .build();
        self.bodies.insert(body)
    }

    /// Remove a body and its colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> Result<()> {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .map(|_| ())
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Attach a box with the given half extents in pixels.
    pub fn add_box(
        &mut self,
        handle: RigidBodyHandle,
        half_w_px: f32,
        half_h_px: f32,
        material: ShapeMaterial,
    ) -> Result<()> {
        let collider = ColliderBuilder::cuboid(px_to_m(half_w_px), px_to_m(half_h_px));
        self.attach(handle, collider, material)
    }

    /// Attach a circle of `radius_px`, offset from the body center by `offset_px`.
    pub fn add_circle(
        &mut self,
        handle: RigidBodyHandle,
        radius_px: f32,
        offset_px: Vec2,
        material: ShapeMaterial,
    ) -> Result<()> {
        let offset = to_meters(offset_px);
        let collider =
            ColliderBuilder::ball(px_to_m(radius_px)).translation(vector![offset.x, offset.y]);
        self.attach(handle, collider, material)
    }

    fn attach(
        &mut self,
        handle: RigidBodyHandle,
        collider: ColliderBuilder,
        material: ShapeMaterial,
    ) -> Result<()> {
        if !self.bodies.contains(handle) {
            return Err(PhysicsError::UnknownBody(handle));
        }
        let collider = collider
            .density(material.density)
            .friction(material.friction)
            .restitution(material.restitution)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        Ok(())
    }

    fn body_mut(&mut self, handle: RigidBodyHandle) -> Result<&mut rapier2d::prelude::RigidBody> {
        self.bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Apply an impulse in N·s at the center of mass, waking the body.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec2) -> Result<()> {
        self.body_mut(handle)?
            .apply_impulse(vector![impulse.x, impulse.y], true);
        Ok(())
    }

    /// Angular velocity in rad/s.
    pub fn angular_velocity(&self, handle: RigidBodyHandle) -> Result<f32> {
        self.bodies
            .get(handle)
            .map(|body| body.angvel())
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Set the angular velocity in rad/s.
    pub fn set_angular_velocity(&mut self, handle: RigidBodyHandle, angvel: f32) -> Result<()> {
        self.body_mut(handle)?.set_angvel(angvel, true);
        Ok(())
    }

    /// How strongly world gravity acts on the body.
    pub fn gravity_scale(&self, handle: RigidBodyHandle) -> Result<f32> {
        self.bodies
            .get(handle)
            .map(|body| body.gravity_scale())
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Scale how strongly world gravity acts on the body.
    pub fn set_gravity_scale(&mut self, handle: RigidBodyHandle, scale: f32) -> Result<()> {
        self.body_mut(handle)?.set_gravity_scale(scale, true);
        Ok(())
    }

    pub fn body_kind(&self, handle: RigidBodyHandle) -> Result<BodyKind> {
        self.bodies
            .get(handle)
            .map(|body| body.body_type().into())
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Change whether the body is dynamic, static or kinematic.
    pub fn set_body_kind(&mut self, handle: RigidBodyHandle, kind: BodyKind) -> Result<()> {
        self.body_mut(handle)?.set_body_type(kind.into(), true);
        Ok(())
    }

    /// Prevent contacts and impulses from rotating the body.
    pub fn set_fixed_rotation(&mut self, handle: RigidBodyHandle, fixed: bool) -> Result<()> {
        self.body_mut(handle)?.lock_rotations(fixed, true);
        Ok(())
    }

    /// Set the restitution of every collider attached to the body.
    pub fn set_restitution(&mut self, handle: RigidBodyHandle, restitution: f32) -> Result<()> {
        let attached = self.body_mut(handle)?.colliders().to_vec();
        for collider in attached {
            if let Some(collider) = self.colliders.get_mut(collider) {
                collider.set_restitution(restitution);
            }
        }
        Ok(())
    }

    /// Body pose as (center in meters, angle in radians).
    pub fn body_transform(&self, handle: RigidBodyHandle) -> Result<(Vec2, f32)> {
        let body = self
            .bodies
            .get(handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        let iso = body.position();
        Ok((
            Vec2::new(iso.translation.x, iso.translation.y),
            iso.rotation.angle(),
        ))
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// A non-positive `dt` (paused game) does nothing. Long frames are split
    /// into substeps of at most 1/60 s.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        let substeps = ((dt / MAX_SUBSTEP).ceil() as u32).clamp(1, MAX_SUBSTEPS);
        if substeps == MAX_SUBSTEPS && dt > MAX_SUBSTEP * MAX_SUBSTEPS as f32 {
            tracing::debug!("Physics step of {dt:.3}s truncated to {MAX_SUBSTEPS} substeps");
        }
        self.integration_parameters.dt = (dt / substeps as f32).min(MAX_SUBSTEP);

        for _ in 0..substeps {
            self.pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &(),
                &(),
            );
        }
    }

    /// Copy every body's pose into the `Transform2D` of its entity.
    pub fn sync_transforms(&self, world: &mut World) {
        for (_, (body, transform)) in world.query_mut::<(&RigidBody, &mut Transform2D)>() {
            if let Ok((pos, angle)) = self.body_transform(body.0) {
                transform.set_from_physics(pos, angle);
            }
        }
    }

    /// Cast a ray from `origin_px` along `dir` for at most `max_px` pixels.
    ///
    /// Uses the collider positions from the last [`step`](Self::step).
    pub fn cast_ray(&self, origin_px: Vec2, dir: Vec2, max_px: f32) -> Option<RaycastHit> {
        let dir = dir.try_normalize()?;
        let origin = to_meters(origin_px);
        let ray = Ray::new(point![origin.x, origin.y], vector![dir.x, dir.y]);

        let (collider, toi) = self.query_pipeline.cast_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            px_to_m(max_px),
            true,
            QueryFilter::default(),
        )?;

        Some(RaycastHit {
            body: self.colliders.get(collider).and_then(Collider::parent),
            point: to_pixels(origin + dir * toi),
            distance: monkey_core::m_to_px(toi),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(world: &mut PhysicsWorld, seconds: f32) {
        let frames = (seconds * 60.0) as u32;
        for _ in 0..frames {
            world.step(1.0 / 60.0);
        }
    }

    #[test]
    fn dynamic_body_falls_static_stays() {
        let mut physics = PhysicsWorld::default();
        let falling = physics.create_body(BodyKind::Dynamic, Vec2::new(0.0, 320.0), 0.0);
        physics
            .add_box(falling, 16.0, 16.0, ShapeMaterial::default())
            .unwrap();
        let wall = physics.create_body(BodyKind::Static, Vec2::new(500.0, 0.0), 0.0);
        physics
            .add_box(wall, 5.0, 100.0, ShapeMaterial::default())
            .unwrap();

        run(&mut physics, 1.0);

        let (pos, _) = physics.body_transform(falling).unwrap();
        // Starts at 10 m, gravity 5 m/s² for one second: roughly 2.5 m lower
        assert!(pos.y < 10.0 - 2.0, "body did not fall: {pos}");
        assert_eq!(physics.body_transform(wall).unwrap().0, Vec2::new(500.0 / 32.0, 0.0));
    }

    #[test]
    fn paused_step_is_noop() {
        let mut physics = PhysicsWorld::default();
        let body = physics.create_body(BodyKind::Dynamic, Vec2::new(64.0, 64.0), 0.0);
        physics
            .add_circle(body, 8.0, Vec2::ZERO, ShapeMaterial::default())
            .unwrap();

        physics.step(0.0);
        physics.step(-1.0);
        assert_eq!(physics.body_transform(body).unwrap().0, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn zero_gravity_scale_and_impulse() {
        let mut physics = PhysicsWorld::default();
        let body = physics.create_body(BodyKind::Dynamic, Vec2::ZERO, 0.0);
        physics
            .add_box(body, 30.0, 40.0, ShapeMaterial::default())
            .unwrap();
        physics.set_gravity_scale(body, 0.0).unwrap();
        physics.set_fixed_rotation(body, true).unwrap();

        physics.apply_impulse(body, Vec2::new(100.0, 0.0)).unwrap();
        run(&mut physics, 0.5);

        let (pos, angle) = physics.body_transform(body).unwrap();
        assert!(pos.x > 0.0);
        assert_relative_eq!(pos.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(angle, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn kinematic_body_spins() {
        let mut physics = PhysicsWorld::default();
        let block = physics.create_body(BodyKind::Kinematic, Vec2::ZERO, 0.0);
        physics
            .add_box(block, 5.0, 450.0, ShapeMaterial::default())
            .unwrap();
        physics.set_angular_velocity(block, -1.0).unwrap();
        assert_relative_eq!(physics.angular_velocity(block).unwrap(), -1.0);

        run(&mut physics, 0.5);
        let (pos, angle) = physics.body_transform(block).unwrap();
        assert_eq!(pos, Vec2::ZERO);
        assert_relative_eq!(angle, -0.5, epsilon = 0.02);
    }

    #[test]
    fn kinematic_switch_ignores_gravity() {
        let mut physics = PhysicsWorld::default();
        let body = physics.create_body(BodyKind::Dynamic, Vec2::new(0.0, 320.0), 0.0);
        physics
            .add_box(body, 16.0, 16.0, ShapeMaterial::default())
            .unwrap();

        physics.set_body_kind(body, BodyKind::Kinematic).unwrap();
        assert_eq!(physics.body_kind(body).unwrap(), BodyKind::Kinematic);
        run(&mut physics, 1.0);
        assert_eq!(physics.body_transform(body).unwrap().0, Vec2::new(0.0, 10.0));

        physics.set_body_kind(body, BodyKind::Dynamic).unwrap();
        run(&mut physics, 1.0);
        assert!(physics.body_transform(body).unwrap().0.y < 9.0);
    }

    #[test]
    fn gravity_scale_round_trips() {
        let mut physics = PhysicsWorld::default();
        let body = physics.create_body(BodyKind::Dynamic, Vec2::ZERO, 0.0);
        assert_relative_eq!(physics.gravity_scale(body).unwrap(), 1.0);
        physics.set_gravity_scale(body, -0.01).unwrap();
        assert_relative_eq!(physics.gravity_scale(body).unwrap(), -0.01);
    }

    #[test]
    fn transforms_sync_into_entities() {
        let mut physics = PhysicsWorld::default();
        let mut world = World::new();
        let body = physics.create_body(BodyKind::Static, Vec2::new(96.0, -32.0), 0.25);
        let entity = world.spawn((Transform2D::default(), RigidBody(body)));

        physics.sync_transforms(&mut world);

        let transform = world.get::<&Transform2D>(entity).unwrap();
        assert_relative_eq!(transform.position().x, 96.0, epsilon = 1e-3);
        assert_relative_eq!(transform.position().y, -32.0, epsilon = 1e-3);
        assert_relative_eq!(transform.angle, 0.25, epsilon = 1e-5);
    }

    #[test]
    fn removed_bodies_are_unknown() {
        let mut physics = PhysicsWorld::default();
        let body = physics.create_body(BodyKind::Dynamic, Vec2::ZERO, 0.0);
        physics.remove_body(body).unwrap();
        assert_eq!(physics.body_count(), 0);
        assert_eq!(
            physics.apply_impulse(body, Vec2::X),
            Err(PhysicsError::UnknownBody(body))
        );
        assert!(physics
            .add_box(body, 1.0, 1.0, ShapeMaterial::default())
            .is_err());
    }

    #[test]
    fn ray_hits_wall() {
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let wall = physics.create_body(BodyKind::Static, Vec2::new(320.0, 0.0), 0.0);
        physics
            .add_box(wall, 5.0, 850.0, ShapeMaterial::default())
            .unwrap();
        physics.step(1.0 / 60.0);

        let hit = physics.cast_ray(Vec2::ZERO, Vec2::X, 1000.0).unwrap();
        assert_eq!(hit.body, Some(wall));
        assert_relative_eq!(hit.distance, 315.0, epsilon = 0.1);
        assert!(physics.cast_ray(Vec2::ZERO, -Vec2::X, 1000.0).is_none());
        assert!(physics.cast_ray(Vec2::ZERO, Vec2::ZERO, 1000.0).is_none());
    }
}
