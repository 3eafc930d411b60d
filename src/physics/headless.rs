//! Headless point-mass world
//!
//! A small deterministic implementation of `PhysicsWorld` used by tests and
//! the command-line runner. Dynamic circles fall under gravity, bounce off
//! fixed and kinematic solids, and report sensor overlaps. Dynamic bodies do
//! not collide with each other.

use std::collections::BTreeSet;

use glam::Vec2;

use super::{
    BodyDesc, BodyHandle, BodyKind, ColliderDesc, ColliderHandle, ColliderShape, CollisionEvent,
    PhysicsWorld,
};

/// Default downward gravity (pixels/s²)
pub const DEFAULT_GRAVITY: f32 = 900.0;
/// Per-second velocity retention for dynamic bodies
const LINEAR_DAMPING: f32 = 0.08;
/// Vertical distance beyond which circle solids are not tested (must exceed
/// the largest solid circle radius plus the largest dynamic radius)
const BROAD_PHASE_RANGE: f32 = 160.0;

#[derive(Debug, Clone)]
struct Body {
    kind: BodyKind,
    pos: Vec2,
    vel: Vec2,
    angular_vel: f32,
    colliders: Vec<u32>,
}

#[derive(Debug, Clone)]
struct Collider {
    body: u32,
    shape: ColliderShape,
    sensor: bool,
    restitution: f32,
}

/// Deterministic world for headless races
#[derive(Debug, Clone)]
pub struct HeadlessWorld {
    gravity: Vec2,
    bodies: Vec<Option<Body>>,
    colliders: Vec<Option<Collider>>,
    /// (dynamic collider, sensor collider) pairs currently overlapping
    overlapping: BTreeSet<(u32, u32)>,
    events: Vec<CollisionEvent>,
}

impl Default for HeadlessWorld {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, DEFAULT_GRAVITY))
    }
}

impl HeadlessWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            bodies: Vec::new(),
            colliders: Vec::new(),
            overlapping: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    /// Number of live bodies (used to check resource release)
    pub fn body_count(&self) -> usize {
        self.bodies.iter().flatten().count()
    }

    pub fn contains_body(&self, body: BodyHandle) -> bool {
        self.body(body).is_some()
    }

    fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle.0 as usize).and_then(|b| b.as_ref())
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle.0 as usize).and_then(|b| b.as_mut())
    }

    /// Radius used for a dynamic collider (boxes use their bounding circle)
    fn dynamic_radius(shape: &ColliderShape) -> f32 {
        match *shape {
            ColliderShape::Circle { radius } => radius,
            ColliderShape::Box { half_extents } => half_extents.length(),
        }
    }

    fn integrate(&mut self, dt: f32) {
        let retain = (1.0 - LINEAR_DAMPING * dt).max(0.0);
        for body in self.bodies.iter_mut().flatten() {
            match body.kind {
                BodyKind::Dynamic => {
                    body.vel += self.gravity * dt;
                    body.vel *= retain;
                    body.pos += body.vel * dt;
                }
                BodyKind::Kinematic => {
                    body.pos += body.vel * dt;
                }
                BodyKind::Fixed => {}
            }
        }
    }

    fn resolve_contacts(&mut self) {
        let mut circles: Vec<(Vec2, ColliderShape, f32)> = Vec::new();
        let mut boxes: Vec<(Vec2, ColliderShape, f32)> = Vec::new();
        for collider in self.colliders.iter().flatten().filter(|c| !c.sensor) {
            let Some(body) = self.bodies.get(collider.body as usize).and_then(|b| b.as_ref())
            else {
                continue;
            };
            if body.kind == BodyKind::Dynamic {
                continue;
            }
            match collider.shape {
                ColliderShape::Circle { .. } => {
                    circles.push((body.pos, collider.shape, collider.restitution))
                }
                ColliderShape::Box { .. } => {
                    boxes.push((body.pos, collider.shape, collider.restitution))
                }
            }
        }
        // Sorted by depth so each body only scans nearby pegs
        circles.sort_by(|a, b| a.0.y.total_cmp(&b.0.y));

        for slot in 0..self.colliders.len() {
            let Some(collider) = self.colliders[slot].as_ref() else {
                continue;
            };
            if collider.sensor {
                continue;
            }
            let radius = Self::dynamic_radius(&collider.shape);
            let Some(body) = self
                .bodies
                .get_mut(collider.body as usize)
                .and_then(|b| b.as_mut())
            else {
                continue;
            };
            if body.kind != BodyKind::Dynamic {
                continue;
            }

            let y = body.pos.y;
            let lo = circles.partition_point(|c| c.0.y < y - BROAD_PHASE_RANGE);
            let nearby = circles[lo..]
                .iter()
                .take_while(|c| c.0.y <= y + BROAD_PHASE_RANGE);
            for (center, shape, restitution) in nearby.chain(boxes.iter()) {
                if let Some((normal, depth)) = penetration(body.pos - *center, radius, shape) {
                    body.pos += normal * depth;
                    let vn = body.vel.dot(normal);
                    if vn < 0.0 {
                        body.vel -= normal * vn * (1.0 + restitution);
                    }
                }
            }
        }
    }

    fn update_sensors(&mut self) {
        let sensors: Vec<(u32, u32, Vec2, ColliderShape)> = self
            .colliders
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| {
                let c = c.as_ref().filter(|c| c.sensor)?;
                let body = self.bodies.get(c.body as usize)?.as_ref()?;
                Some((idx as u32, c.body, body.pos, c.shape))
            })
            .collect();

        let mut current = BTreeSet::new();
        for (dyn_idx, dyn_collider) in self.colliders.iter().enumerate() {
            let Some(dyn_collider) = dyn_collider.as_ref().filter(|c| !c.sensor) else {
                continue;
            };
            let Some(body) = self
                .bodies
                .get(dyn_collider.body as usize)
                .and_then(|b| b.as_ref())
            else {
                continue;
            };
            if body.kind != BodyKind::Dynamic {
                continue;
            }
            let radius = Self::dynamic_radius(&dyn_collider.shape);

            for &(sensor_idx, sensor_body, sensor_pos, shape) in &sensors {
                if sensor_body != dyn_collider.body
                    && shape.overlaps_circle(body.pos - sensor_pos, radius)
                {
                    current.insert((dyn_idx as u32, sensor_idx));
                }
            }
        }

        for &(a, b) in current.difference(&self.overlapping) {
            self.events
                .push(CollisionEvent::Started(ColliderHandle(a), ColliderHandle(b)));
        }
        for &(a, b) in self.overlapping.difference(&current) {
            self.events
                .push(CollisionEvent::Stopped(ColliderHandle(a), ColliderHandle(b)));
        }
        self.overlapping = current;
    }
}

/// Push-out normal and depth for a circle at `rel` (relative to the shape center)
fn penetration(rel: Vec2, radius: f32, shape: &ColliderShape) -> Option<(Vec2, f32)> {
    match *shape {
        ColliderShape::Circle { radius: r } => {
            let dist = rel.length();
            let overlap = r + radius - dist;
            if overlap <= 0.0 {
                return None;
            }
            let normal = if dist > 1e-4 { rel / dist } else { Vec2::NEG_Y };
            Some((normal, overlap))
        }
        ColliderShape::Box { half_extents } => {
            let closest = rel.clamp(-half_extents, half_extents);
            let d = rel - closest;
            let dist = d.length();
            if dist > 1e-4 {
                let overlap = radius - dist;
                return (overlap > 0.0).then(|| (d / dist, overlap));
            }
            // Center inside the box: exit through the nearest face
            let dx = half_extents.x - rel.x.abs();
            let dy = half_extents.y - rel.y.abs();
            if dx < dy {
                Some((Vec2::new(rel.x.signum(), 0.0), dx + radius))
            } else {
                Some((Vec2::new(0.0, rel.y.signum()), dy + radius))
            }
        }
    }
}

impl PhysicsWorld for HeadlessWorld {
    fn step(&mut self, dt: f32) {
        self.integrate(dt);
        self.resolve_contacts();
        self.update_sensors();
    }

    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Some(Body {
            kind: desc.kind,
            pos: desc.position,
            vel: desc.velocity,
            angular_vel: 0.0,
            colliders: Vec::new(),
        }));
        handle
    }

    fn create_collider(&mut self, desc: ColliderDesc) -> ColliderHandle {
        let handle = ColliderHandle(self.colliders.len() as u32);
        self.colliders.push(Some(Collider {
            body: desc.body.0,
            shape: desc.shape,
            sensor: desc.sensor,
            restitution: desc.restitution,
        }));
        if let Some(body) = self.body_mut(desc.body) {
            body.colliders.push(handle.0);
        }
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) {
        let Some(removed) = self.bodies.get_mut(body.0 as usize).and_then(|b| b.take()) else {
            return;
        };
        for collider in removed.colliders {
            if let Some(slot) = self.colliders.get_mut(collider as usize) {
                *slot = None;
            }
            self.overlapping
                .retain(|&(a, b)| a != collider && b != collider);
        }
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.body(body).map(|b| b.pos)
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.pos = position;
        }
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.body(body).map(|b| b.vel)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.vel = velocity;
        }
    }

    fn angular_velocity(&self, body: BodyHandle) -> Option<f32> {
        self.body(body).map(|b| b.angular_vel)
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, angular_velocity: f32) {
        if let Some(b) = self.body_mut(body) {
            b.angular_vel = angular_velocity;
        }
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec2) {
        if let Some(b) = self.body_mut(body) {
            if b.kind == BodyKind::Dynamic {
                b.vel += impulse;
            }
        }
    }

    fn drain_collision_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.events)
    }
}
