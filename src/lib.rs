//! Marble Rush - A mass-participant marble race
//!
//! Core modules:
//! - `sim`: Deterministic race rules (progress, modifiers, cuts, lifecycle)
//! - `physics`: Rigid-body collaborator boundary plus a headless world
//! - `camera`: Spectator camera director
//! - `snapshot`: Throttled UI-facing projection of race state
//! - `engine`: Command surface and frame loop
//! - `settings`: Data-driven race tuning

pub mod camera;
pub mod cues;
pub mod engine;
pub mod physics;
pub mod settings;
pub mod sim;
pub mod snapshot;

pub use engine::{Engine, EngineError, Participant};
pub use settings::{ModifierConfig, RaceSettings, WarpPolicy};

use glam::Vec2;

/// Race configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame at normal time scale
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Frame time clamp so a stalled host can't trigger runaway catch-up
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// World dimensions (y grows downward, toward the finish)
    pub const WORLD_WIDTH: f32 = 900.0;
    pub const DEFAULT_WORLD_HEIGHT: f32 = 6000.0;
    /// Extra room past the world edge before an agent counts as fallen out
    pub const OUT_OF_BOUNDS_MARGIN: f32 = 200.0;

    /// Marble defaults
    pub const MARBLE_RADIUS: f32 = 6.0;
    /// Hard velocity cap (prevents solver tunnelling)
    pub const MAX_SPEED: f32 = 1400.0;

    /// Spawn band at the top of the course
    pub const SPAWN_TOP: f32 = 40.0;
    pub const SPAWN_BAND: f32 = 160.0;

    /// Distance of the finish line above the bottom of the world
    pub const FINISH_INSET: f32 = 150.0;
    /// Half-width of the finish opening
    pub const FINISH_HALF_WIDTH: f32 = 140.0;

    /// Default viewport used by the headless runner
    pub const VIEWPORT_WIDTH: f32 = 900.0;
    pub const VIEWPORT_HEIGHT: f32 = 700.0;
}

/// Clamp a velocity to the global speed cap
#[inline]
pub fn clamp_speed(vel: Vec2) -> Vec2 {
    vel.clamp_length_max(consts::MAX_SPEED)
}

/// Unit vector from `from` toward `to`, or straight down when they coincide
#[inline]
pub fn direction_or_down(from: Vec2, to: Vec2) -> Vec2 {
    let d = to - from;
    if d.length_squared() < 1e-6 {
        Vec2::Y
    } else {
        d.normalize()
    }
}

/// Exponential smoothing factor for a given rate and frame delta
#[inline]
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}
