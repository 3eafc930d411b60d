//! Rigid-body collaborator boundary
//!
//! The race core never integrates or resolves contacts itself. It talks to a
//! `PhysicsWorld` through opaque handles and maps collider handles back to
//! agents and zones on its own side.

pub mod headless;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use headless::HeadlessWorld;

/// Opaque handle to a rigid body owned by the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Opaque handle to a collider owned by the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderHandle(pub u32);

/// How a body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Integrated and pushed around by contacts
    Dynamic,
    /// Moved explicitly by the caller, pushes dynamic bodies
    Kinematic,
    /// Never moves
    Fixed,
}

/// Description for creating a body
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl BodyDesc {
    pub fn dynamic(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            position,
            velocity: Vec2::ZERO,
        }
    }

    pub fn kinematic(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            position,
            velocity: Vec2::ZERO,
        }
    }

    pub fn fixed(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Fixed,
            position,
            velocity: Vec2::ZERO,
        }
    }
}

/// Collider shapes the race needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Circle { radius: f32 },
    /// Axis-aligned box with half-extents
    Box { half_extents: Vec2 },
}

impl ColliderShape {
    /// Does a circle at `point` (relative to the shape's center) overlap this shape?
    pub fn overlaps_circle(&self, point: Vec2, radius: f32) -> bool {
        match *self {
            ColliderShape::Circle { radius: r } => point.length() <= r + radius,
            ColliderShape::Box { half_extents } => {
                let closest = point.clamp(-half_extents, half_extents);
                (point - closest).length() <= radius
            }
        }
    }
}

/// Description for attaching a collider to a body
#[derive(Debug, Clone, Copy)]
pub struct ColliderDesc {
    pub body: BodyHandle,
    pub shape: ColliderShape,
    /// Sensors report overlap events but never push anything
    pub sensor: bool,
    pub restitution: f32,
}

impl ColliderDesc {
    pub fn solid(body: BodyHandle, shape: ColliderShape, restitution: f32) -> Self {
        Self {
            body,
            shape,
            sensor: false,
            restitution,
        }
    }

    pub fn sensor(body: BodyHandle, shape: ColliderShape) -> Self {
        Self {
            body,
            shape,
            sensor: true,
            restitution: 0.0,
        }
    }
}

/// Overlap/contact notifications queued by the world during `step`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEvent {
    Started(ColliderHandle, ColliderHandle),
    Stopped(ColliderHandle, ColliderHandle),
}

/// Interface contract for the rigid-body solver
pub trait PhysicsWorld {
    /// Advances the world by `dt` seconds, queueing collision events.
    fn step(&mut self, dt: f32);

    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    fn create_collider(&mut self, desc: ColliderDesc) -> ColliderHandle;

    /// Removes a body and every collider attached to it.
    fn remove_body(&mut self, body: BodyHandle);

    fn position(&self, body: BodyHandle) -> Option<Vec2>;
    fn set_position(&mut self, body: BodyHandle, position: Vec2);

    fn velocity(&self, body: BodyHandle) -> Option<Vec2>;
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2);

    fn angular_velocity(&self, body: BodyHandle) -> Option<f32>;
    fn set_angular_velocity(&mut self, body: BodyHandle, angular_velocity: f32);

    /// Adds `impulse` (mass-normalized) to a dynamic body's velocity.
    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec2);

    /// Takes every event queued since the last drain, in arrival order.
    fn drain_collision_events(&mut self) -> Vec<CollisionEvent>;
}
