//! Procedural course layout
//!
//! Walls, a staggered peg field, the finish funnel and the zone catalog.
//! Zones are enumerated once here and looked up by index when a sensor
//! reports an overlap.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::physics::{BodyDesc, BodyHandle, ColliderDesc, ColliderHandle, ColliderShape, PhysicsWorld};
use crate::settings::RaceSettings;

/// Peg radius
pub const PEG_RADIUS: f32 = 8.0;
/// Vertical distance between peg rows
pub const PEG_ROW_SPACING: f32 = 72.0;
/// Horizontal distance between pegs in a row
pub const PEG_SPACING: f32 = 64.0;
/// Bumpers at or above this trigger radius use the mega tier
pub const MEGA_BUMPER_RADIUS: f32 = 36.0;
/// Height of the speed-gate sensor band
pub const GATE_BAND_HEIGHT: f32 = 16.0;
/// Wall thickness (half-extent)
const WALL_HALF: f32 = 20.0;

/// Gameplay zone kinds with their tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneKind {
    /// Anti-speedrun band; bounces agents until `expires_at` (sim seconds)
    SpeedGate { index: u8, expires_at: f32 },
    /// One-shot teleport to `exit`
    Warp { exit: Vec2 },
    BoostPad {
        /// Downward speed floor for trailing agents
        catch_up_speed: f32,
        /// Mild forward push for the middle of the pack
        boost: f32,
        /// Velocity multiplier for leaders
        leader_factor: f32,
        /// Max lateral wobble added to leaders
        wobble: f32,
    },
    SlowPad {
        factor: f32,
        /// Extra multiplier for top-10% agents
        leader_penalty: f32,
        cooldown: f32,
    },
    Magnet {
        pull_point: Vec2,
        snap_factor: f32,
        strength: f32,
        duration: f32,
        cooldown: f32,
    },
    Bomb {
        radius: f32,
        power: f32,
        cooldown: f32,
    },
    Bumper { power: f32, toward_center: bool },
    Finish,
}

impl ZoneKind {
    pub fn label(&self) -> &'static str {
        match self {
            ZoneKind::SpeedGate { .. } => "gate",
            ZoneKind::Warp { .. } => "warp",
            ZoneKind::BoostPad { .. } => "boost",
            ZoneKind::SlowPad { .. } => "slow",
            ZoneKind::Magnet { .. } => "magnet",
            ZoneKind::Bomb { .. } => "bomb",
            ZoneKind::Bumper { .. } => "bumper",
            ZoneKind::Finish => "finish",
        }
    }
}

/// Horizontal oscillation for moving zones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneMotion {
    pub origin: Vec2,
    pub amplitude: f32,
    pub period: f32,
}

impl ZoneMotion {
    pub fn position_at(&self, t: f32) -> Vec2 {
        let phase = (t / self.period) * TAU;
        self.origin + Vec2::new(phase.sin() * self.amplitude, 0.0)
    }
}

/// A tagged region of the course
#[derive(Debug, Clone)]
pub struct Zone {
    pub kind: ZoneKind,
    pub center: Vec2,
    pub shape: ColliderShape,
    pub body: BodyHandle,
    pub collider: ColliderHandle,
    pub motion: Option<ZoneMotion>,
    /// Per-zone cooldown gate (sim seconds)
    pub ready_at: f32,
}

impl Zone {
    /// Trigger radius (boxes report their half-width)
    pub fn radius(&self) -> f32 {
        match self.shape {
            ColliderShape::Circle { radius } => radius,
            ColliderShape::Box { half_extents } => half_extents.x,
        }
    }

    pub fn is_mega(&self) -> bool {
        matches!(self.kind, ZoneKind::Bumper { .. }) && self.radius() >= MEGA_BUMPER_RADIUS
    }
}

/// Built course: geometry handles plus the race-relevant depths
#[derive(Debug, Clone)]
pub struct Course {
    pub width: f32,
    pub height: f32,
    /// Depth of the finish line
    pub finish_y: f32,
    /// Center of the finish opening
    pub finish_point: Vec2,
    /// Start of the final stretch (golden-moment eligibility, rescue aim)
    pub final_stretch_y: f32,
    /// Checkpoint depths, ascending
    pub checkpoints: Vec<f32>,
    pub zones: Vec<Zone>,
    /// Walls, pegs and funnel bodies
    pub solids: Vec<BodyHandle>,
}

impl Course {
    /// Lay out the course in `world`
    pub fn build(world: &mut dyn PhysicsWorld, settings: &RaceSettings, rng: &mut Pcg32) -> Self {
        let width = WORLD_WIDTH;
        let height = settings.course_height;
        let finish_y = height - FINISH_INSET;
        let mut course = Course {
            width,
            height,
            finish_y,
            finish_point: Vec2::new(width * 0.5, finish_y),
            final_stretch_y: finish_y * settings.final_stretch_fraction,
            checkpoints: settings
                .checkpoint_fractions
                .iter()
                .map(|f| f * finish_y)
                .collect(),
            zones: Vec::new(),
            solids: Vec::new(),
        };

        course.build_walls(world);
        course.build_pegs(world, rng);
        course.build_funnel(world);
        course.build_zones(world, settings, rng);

        log::info!(
            "Course built: {}x{}, {} solids, {} zones, {} checkpoints",
            width,
            height,
            course.solids.len(),
            course.zones.len(),
            course.checkpoints.len()
        );
        course
    }

    fn add_solid(&mut self, world: &mut dyn PhysicsWorld, pos: Vec2, shape: ColliderShape) {
        let body = world.create_body(BodyDesc::fixed(pos));
        world.create_collider(ColliderDesc::solid(body, shape, 0.5));
        self.solids.push(body);
    }

    fn add_zone(
        &mut self,
        world: &mut dyn PhysicsWorld,
        kind: ZoneKind,
        center: Vec2,
        shape: ColliderShape,
        motion: Option<ZoneMotion>,
    ) {
        let desc = if motion.is_some() {
            BodyDesc::kinematic(center)
        } else {
            BodyDesc::fixed(center)
        };
        let body = world.create_body(desc);
        let collider = world.create_collider(ColliderDesc::sensor(body, shape));
        self.zones.push(Zone {
            kind,
            center,
            shape,
            body,
            collider,
            motion,
            ready_at: 0.0,
        });
    }

    fn build_walls(&mut self, world: &mut dyn PhysicsWorld) {
        let half = Vec2::new(WALL_HALF, self.height * 0.5 + WALL_HALF);
        let mid = self.height * 0.5;
        self.add_solid(
            world,
            Vec2::new(-WALL_HALF, mid),
            ColliderShape::Box { half_extents: half },
        );
        self.add_solid(
            world,
            Vec2::new(self.width + WALL_HALF, mid),
            ColliderShape::Box { half_extents: half },
        );
    }

    fn build_pegs(&mut self, world: &mut dyn PhysicsWorld, rng: &mut Pcg32) {
        let first_row = SPAWN_TOP + SPAWN_BAND + 120.0;
        let last_row = self.finish_y - 360.0;
        let mut y = first_row;
        let mut row = 0u32;
        while y < last_row {
            let offset = if row % 2 == 0 { 0.0 } else { PEG_SPACING * 0.5 };
            let mut x = PEG_SPACING * 0.5 + offset;
            while x < self.width - PEG_SPACING * 0.25 {
                // Occasional gaps keep the field from becoming a perfect lattice
                if rng.random::<f32>() > 0.08 {
                    let jitter = Vec2::new(rng.random_range(-6.0..6.0), rng.random_range(-6.0..6.0));
                    self.add_solid(
                        world,
                        Vec2::new(x, y) + jitter,
                        ColliderShape::Circle { radius: PEG_RADIUS },
                    );
                }
                x += PEG_SPACING;
            }
            y += PEG_ROW_SPACING;
            row += 1;
        }
    }

    /// Two sloped peg lines steering everything toward the finish opening
    fn build_funnel(&mut self, world: &mut dyn PhysicsWorld) {
        let top = self.finish_y - 300.0;
        let bottom = self.finish_y - 40.0;
        let left_end = self.finish_point.x - FINISH_HALF_WIDTH;
        let right_end = self.finish_point.x + FINISH_HALF_WIDTH;
        let step = PEG_RADIUS * 1.5;

        let lines = [
            (Vec2::new(0.0, top), Vec2::new(left_end, bottom)),
            (Vec2::new(self.width, top), Vec2::new(right_end, bottom)),
        ];
        for (from, to) in lines {
            let count = ((to - from).length() / step).ceil() as u32;
            for i in 0..=count {
                let t = i as f32 / count.max(1) as f32;
                self.add_solid(
                    world,
                    from.lerp(to, t),
                    ColliderShape::Circle { radius: PEG_RADIUS },
                );
            }
        }
    }

    fn build_zones(&mut self, world: &mut dyn PhysicsWorld, settings: &RaceSettings, rng: &mut Pcg32) {
        let mods = &settings.modifiers;
        let finish_y = self.finish_y;
        let width = self.width;
        let field_top = SPAWN_TOP + SPAWN_BAND + 200.0;
        let field_bottom = finish_y - 420.0;
        let random_point = |rng: &mut Pcg32, lo: f32, hi: f32| {
            let (lo, hi) = (field_top.max(lo), field_bottom.min(hi));
            let y = if hi > lo { rng.random_range(lo..hi) } else { lo };
            Vec2::new(rng.random_range(80.0..width - 80.0), y)
        };

        if mods.speed_gates {
            // A gate at depth fraction f stays closed until f of the minimum round time
            for (index, fraction) in [0.15_f32, 0.4, 0.6].into_iter().enumerate() {
                let y = finish_y * fraction;
                self.add_zone(
                    world,
                    ZoneKind::SpeedGate {
                        index: index as u8,
                        expires_at: settings.min_round_secs * fraction,
                    },
                    Vec2::new(width * 0.5, y),
                    ColliderShape::Box {
                        half_extents: Vec2::new(width * 0.5, GATE_BAND_HEIGHT * 0.5),
                    },
                    None,
                );
            }
        }

        if mods.warps {
            let entry = random_point(rng, finish_y * 0.2, finish_y * 0.3);
            let exit = Vec2::new(rng.random_range(120.0..width - 120.0), finish_y * 0.45);
            self.add_zone(
                world,
                ZoneKind::Warp { exit },
                entry,
                ColliderShape::Circle { radius: 28.0 },
                None,
            );
        }

        if mods.boost_pads {
            for _ in 0..4 {
                let center = random_point(rng, 0.0, f32::MAX);
                self.add_zone(
                    world,
                    ZoneKind::BoostPad {
                        catch_up_speed: 650.0,
                        boost: 220.0,
                        leader_factor: 0.55,
                        wobble: 160.0,
                    },
                    center,
                    ColliderShape::Box {
                        half_extents: Vec2::new(44.0, 8.0),
                    },
                    None,
                );
            }
        }

        if mods.slow_pads {
            for _ in 0..3 {
                let center = random_point(rng, 0.0, f32::MAX);
                self.add_zone(
                    world,
                    ZoneKind::SlowPad {
                        factor: 0.55,
                        leader_penalty: 0.6,
                        cooldown: 0.4,
                    },
                    center,
                    ColliderShape::Box {
                        half_extents: Vec2::new(52.0, 8.0),
                    },
                    None,
                );
            }
        }

        if mods.magnets {
            for _ in 0..2 {
                let center = random_point(rng, finish_y * 0.5, f32::MAX);
                self.add_zone(
                    world,
                    ZoneKind::Magnet {
                        pull_point: center - Vec2::new(0.0, 60.0),
                        snap_factor: 0.15,
                        strength: 900.0,
                        duration: 1.2,
                        cooldown: 3.0,
                    },
                    center,
                    ColliderShape::Circle { radius: 40.0 },
                    None,
                );
            }
        }

        if mods.bombs {
            for _ in 0..2 {
                let center = random_point(rng, 0.0, f32::MAX);
                self.add_zone(
                    world,
                    ZoneKind::Bomb {
                        radius: 180.0,
                        power: 700.0,
                        cooldown: 4.0,
                    },
                    center,
                    ColliderShape::Circle { radius: 22.0 },
                    None,
                );
            }
        }

        if mods.bumpers {
            for i in 0..6 {
                let center = random_point(rng, 0.0, f32::MAX);
                let radius = if i % 3 == 0 { 42.0 } else { 22.0 };
                let motion = (i % 2 == 1).then(|| ZoneMotion {
                    origin: center,
                    amplitude: rng.random_range(60.0..140.0),
                    period: rng.random_range(2.5..5.0),
                });
                self.add_zone(
                    world,
                    ZoneKind::Bumper {
                        power: 520.0,
                        toward_center: i % 4 == 3,
                    },
                    center,
                    ColliderShape::Circle { radius },
                    motion,
                );
            }
        }

        self.add_zone(
            world,
            ZoneKind::Finish,
            Vec2::new(self.finish_point.x, finish_y + FINISH_INSET * 0.5),
            ColliderShape::Box {
                half_extents: Vec2::new(FINISH_HALF_WIDTH, FINISH_INSET * 0.5),
            },
            None,
        );
    }

    /// Index of the finish zone
    pub fn finish_zone(&self) -> Option<usize> {
        self.zones.iter().position(|z| z.kind == ZoneKind::Finish)
    }

    /// Move kinematic zones to their position at sim time `t`
    pub fn animate_zones(&mut self, world: &mut dyn PhysicsWorld, t: f32) {
        for zone in &mut self.zones {
            if let Some(motion) = zone.motion {
                let pos = motion.position_at(t);
                zone.center = pos;
                world.set_position(zone.body, pos);
            }
        }
    }

    /// True when `pos` has crossed the finish line inside the opening
    pub fn is_finish_crossing(&self, pos: Vec2) -> bool {
        pos.y >= self.finish_y && (pos.x - self.finish_point.x).abs() <= FINISH_HALF_WIDTH
    }

    /// True when `pos` has left the playable area
    pub fn is_out_of_bounds(&self, pos: Vec2) -> bool {
        pos.y > self.height + OUT_OF_BOUNDS_MARGIN
            || pos.x < -OUT_OF_BOUNDS_MARGIN
            || pos.x > self.width + OUT_OF_BOUNDS_MARGIN
    }

    /// Release every body the course created
    pub fn release(&mut self, world: &mut dyn PhysicsWorld) {
        for body in self.solids.drain(..) {
            world.remove_body(body);
        }
        for zone in self.zones.drain(..) {
            world.remove_body(zone.body);
        }
    }
}
