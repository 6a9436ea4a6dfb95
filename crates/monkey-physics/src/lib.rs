//! 2D rigid-body physics for the monkey sprite engine.
//!
//! Wraps rapier2d. All public positions and sizes are in pixels and are
//! converted to meters (32 px per meter) at this boundary; the solver itself
//! only ever sees meters.

mod world;

pub use rapier2d::prelude::RigidBodyHandle;
pub use world::{BodyKind, PhysicsWorld, RaycastHit, ShapeMaterial, DEFAULT_GRAVITY};

use thiserror::Error;

/// Physics errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsError {
    /// The handle does not refer to a live body.
    #[error("Unknown rigid body {0:?}")]
    UnknownBody(RigidBodyHandle),
}

/// Result type for physics operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;

/// Component linking an entity to its rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigidBody(pub RigidBodyHandle);
