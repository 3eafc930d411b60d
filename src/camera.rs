//! Spectator camera director
//!
//! Three modes with fixed precedence: manual (user pan or peek) beats focus
//! (one named agent) beats auto (follow the leader, or hold on the finish
//! once the race is decided). Everything except manual moves is smoothed
//! exponentially, and shake is layered on top of the resolved position.
//! Timers here run on wall time.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::physics::PhysicsWorld;
use crate::sim::progress::ranked_alive;
use crate::sim::state::Agent;
use crate::smoothing_factor;

/// Camera mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    #[default]
    Auto,
    Focus,
    Manual,
}

/// Camera tuning
#[derive(Debug, Clone, Copy)]
pub struct CameraConfig {
    /// Smoothing rate while following the leader (1/s)
    pub follow_rate: f32,
    /// Smoothing rate while focused on an agent (1/s)
    pub focus_rate: f32,
    /// How long a pan keeps manual control (seconds)
    pub manual_secs: f32,
    /// How long a jump peek lasts before restoring (seconds)
    pub peek_secs: f32,
    /// How long a focus request lasts (seconds)
    pub focus_secs: f32,
    /// Leaders whose body trails their recorded progress by more than this
    /// are skipped by auto-follow (just warped or sent back)
    pub lag_tolerance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_rate: 4.0,
            focus_rate: 6.0,
            manual_secs: 4.0,
            peek_secs: 3.0,
            focus_secs: 8.0,
            lag_tolerance: 400.0,
        }
    }
}

/// Active focus request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusTarget {
    pub agent_id: u32,
    pub until: f32,
}

/// One-slot save for a peek
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedView {
    pub mode: CameraMode,
    pub position: Vec2,
    pub focus: Option<FocusTarget>,
}

/// Time-bounded additive offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shake {
    pub magnitude: f32,
    pub started_at: f32,
    pub until: f32,
}

impl Shake {
    /// Offset at `now`, decaying linearly to zero
    pub fn offset(&self, now: f32) -> Vec2 {
        if now >= self.until {
            return Vec2::ZERO;
        }
        let span = (self.until - self.started_at).max(1e-3);
        let strength = self.magnitude * (self.until - now) / span;
        Vec2::new((now * 53.0).sin(), (now * 47.0).cos()) * strength
    }
}

/// Positions the camera may chase this frame
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraTargets {
    pub leader: Option<Vec2>,
    /// Position of the focused agent, if it is still on course
    pub focus: Option<Vec2>,
    /// Finish-area hold during the finish sequence
    pub hold: Option<Vec2>,
}

/// Camera director state
#[derive(Debug, Clone)]
pub struct Camera {
    pub config: CameraConfig,
    mode: CameraMode,
    /// View center in world space
    position: Vec2,
    viewport: Vec2,
    world: Vec2,
    focus: Option<FocusTarget>,
    manual_until: f32,
    saved: Option<SavedView>,
    shake: Option<Shake>,
}

impl Camera {
    pub fn new(world: Vec2, viewport: Vec2) -> Self {
        let mut camera = Self {
            config: CameraConfig::default(),
            mode: CameraMode::Auto,
            position: Vec2::new(world.x * 0.5, 0.0),
            viewport,
            world,
            focus: None,
            manual_until: 0.0,
            saved: None,
            shake: None,
        };
        camera.position = camera.clamp(camera.position);
        camera
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn world_size(&self) -> Vec2 {
        self.world
    }

    pub fn focus(&self) -> Option<FocusTarget> {
        self.focus
    }

    /// Seconds left on the focus request
    pub fn focus_remaining(&self, now: f32) -> Option<f32> {
        self.focus
            .filter(|f| now < f.until)
            .map(|f| f.until - now)
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
        self.position = self.clamp(self.position);
    }

    /// Keep the view inside the world (centered when the world is smaller)
    fn clamp(&self, pos: Vec2) -> Vec2 {
        let half = self.viewport * 0.5;
        let axis = |v: f32, half: f32, size: f32| {
            if size <= half * 2.0 {
                size * 0.5
            } else {
                v.clamp(half, size - half)
            }
        };
        Vec2::new(
            axis(pos.x, half.x, self.world.x),
            axis(pos.y, half.y, self.world.y),
        )
    }

    /// User drag: immediate move, manual mode for a while
    pub fn pan_by(&mut self, delta: Vec2, now: f32) {
        self.mode = CameraMode::Manual;
        self.manual_until = self.manual_until.max(now + self.config.manual_secs);
        self.position = self.clamp(self.position + delta);
    }

    /// Minimap peek: remember the current view (one slot) and jump
    pub fn jump_to(&mut self, point: Vec2, now: f32) {
        if self.saved.is_none() {
            self.saved = Some(SavedView {
                mode: self.mode,
                position: self.position,
                focus: self.focus,
            });
        }
        self.mode = CameraMode::Manual;
        self.manual_until = now + self.config.peek_secs;
        self.position = self.clamp(point);
    }

    /// Lock onto an agent for a while (manual still takes precedence)
    pub fn focus_on(&mut self, agent_id: u32, now: f32) {
        self.focus = Some(FocusTarget {
            agent_id,
            until: now + self.config.focus_secs,
        });
        // A later peek restore should land on the new focus
        if let Some(saved) = self.saved.as_mut() {
            saved.focus = self.focus;
            saved.mode = CameraMode::Focus;
        }
    }

    /// Add impact shake; the stronger of overlapping shakes wins
    pub fn shake(&mut self, magnitude: f32, duration: f32, now: f32) {
        let current = self.shake.map(|s| s.offset(now).length()).unwrap_or(0.0);
        if magnitude >= current {
            self.shake = Some(Shake {
                magnitude,
                started_at: now,
                until: now + duration,
            });
        }
    }

    fn resolve_mode(&mut self, now: f32, targets: &CameraTargets) -> CameraMode {
        if now < self.manual_until {
            return CameraMode::Manual;
        }
        if let Some(saved) = self.saved.take() {
            self.focus = saved.focus;
            if saved.mode == CameraMode::Manual {
                // Back to where the user had panned, for a fresh window
                self.position = saved.position;
                self.manual_until = now + self.config.manual_secs;
                return CameraMode::Manual;
            }
        }
        match self.focus {
            Some(f) if now < f.until && targets.focus.is_some() => CameraMode::Focus,
            _ => {
                self.focus = None;
                CameraMode::Auto
            }
        }
    }

    /// Advance one frame of `dt` wall seconds at wall time `now`
    pub fn update(&mut self, dt: f32, now: f32, targets: &CameraTargets) {
        self.mode = self.resolve_mode(now, targets);
        let (target, rate) = match self.mode {
            CameraMode::Manual => (None, 0.0),
            CameraMode::Focus => (targets.focus, self.config.focus_rate),
            CameraMode::Auto => (targets.hold.or(targets.leader), self.config.follow_rate),
        };
        if let Some(target) = target {
            let t = smoothing_factor(rate, dt);
            self.position = self.clamp(self.position.lerp(target, t));
        }
        if self.shake.is_some_and(|s| now >= s.until) {
            self.shake = None;
        }
    }

    /// Resolved position plus shake
    pub fn emitted_position(&self, now: f32) -> Vec2 {
        let offset = self.shake.map(|s| s.offset(now)).unwrap_or(Vec2::ZERO);
        self.position + offset
    }
}

/// Position auto-follow should chase: the best-ranked agent whose body is
/// near its recorded progress, else the plain leader
pub fn pick_leader(agents: &[Agent], world: &dyn PhysicsWorld, lag_tolerance: f32) -> Option<Vec2> {
    let mut fallback = None;
    for idx in ranked_alive(agents) {
        let agent = &agents[idx];
        let Some(pos) = agent.body.and_then(|b| world.position(b)) else {
            continue;
        };
        if pos.y >= agent.progress_y - lag_tolerance {
            return Some(pos);
        }
        fallback.get_or_insert(pos);
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyDesc, HeadlessWorld};

    const DT: f32 = 1.0 / 60.0;

    fn camera() -> Camera {
        Camera::new(Vec2::new(900.0, 6000.0), Vec2::new(900.0, 700.0))
    }

    fn run(camera: &mut Camera, from: f32, secs: f32, targets: &CameraTargets) -> f32 {
        let mut now = from;
        while now < from + secs {
            now += DT;
            camera.update(DT, now, targets);
        }
        now
    }

    #[test]
    fn test_auto_follows_leader_smoothly() {
        let mut cam = camera();
        let targets = CameraTargets {
            leader: Some(Vec2::new(450.0, 3000.0)),
            ..Default::default()
        };
        cam.update(DT, DT, &targets);
        // One frame moves part of the way, not all of it
        assert!(cam.position().y > 350.0 && cam.position().y < 3000.0);
        run(&mut cam, DT, 5.0, &targets);
        assert!((cam.position().y - 3000.0).abs() < 1.0);
    }

    #[test]
    fn test_manual_takes_precedence() {
        let mut cam = camera();
        cam.pan_by(Vec2::new(0.0, 1000.0), 0.0);
        let panned = cam.position();
        cam.focus_on(3, 0.0);
        let targets = CameraTargets {
            leader: Some(Vec2::new(450.0, 5000.0)),
            focus: Some(Vec2::new(450.0, 4000.0)),
            hold: None,
        };
        let now = run(&mut cam, 0.0, 3.5, &targets);
        assert_eq!(cam.mode(), CameraMode::Manual);
        assert_eq!(cam.emitted_position(now), panned);

        // Manual expires, the pending focus takes over
        run(&mut cam, now, 1.0, &targets);
        assert_eq!(cam.mode(), CameraMode::Focus);
        assert_ne!(cam.position(), panned);
    }

    #[test]
    fn test_peek_restores_previous_mode() {
        let mut cam = camera();
        cam.focus_on(1, 0.0);
        let targets = CameraTargets {
            leader: Some(Vec2::new(450.0, 5000.0)),
            focus: Some(Vec2::new(450.0, 2000.0)),
            hold: None,
        };
        let now = run(&mut cam, 0.0, 1.0, &targets);
        assert_eq!(cam.mode(), CameraMode::Focus);

        cam.jump_to(Vec2::new(450.0, 5500.0), now);
        // A second jump during the peek keeps the original save
        cam.jump_to(Vec2::new(450.0, 4500.0), now + 0.5);
        assert!((cam.position().y - 4500.0).abs() < 1e-3);
        let now = run(&mut cam, now + 0.5, 3.5, &targets);
        assert_eq!(cam.mode(), CameraMode::Focus);
        assert_eq!(cam.focus().map(|f| f.agent_id), Some(1));
        assert!(now > 0.0);
    }

    #[test]
    fn test_focus_drops_when_target_gone() {
        let mut cam = camera();
        cam.focus_on(1, 0.0);
        let targets = CameraTargets {
            leader: Some(Vec2::new(450.0, 5000.0)),
            ..Default::default()
        };
        cam.update(DT, DT, &targets);
        assert_eq!(cam.mode(), CameraMode::Auto);
        assert!(cam.focus().is_none());
    }

    #[test]
    fn test_hold_beats_leader_in_auto() {
        let mut cam = camera();
        let targets = CameraTargets {
            leader: Some(Vec2::new(450.0, 2000.0)),
            focus: None,
            hold: Some(Vec2::new(450.0, 5700.0)),
        };
        run(&mut cam, 0.0, 5.0, &targets);
        assert!((cam.position().y - 5650.0).abs() < 1.0);
    }

    #[test]
    fn test_shake_is_bounded() {
        let mut cam = camera();
        cam.shake(12.0, 0.5, 1.0);
        let offset = cam.emitted_position(1.1) - cam.position();
        assert!(offset.length() > 0.0 && offset.length() <= 12.0 * 2f32.sqrt());
        cam.update(DT, 1.6, &CameraTargets::default());
        assert_eq!(cam.emitted_position(1.6), cam.position());
    }

    #[test]
    fn test_pick_leader_skips_lagging_body() {
        let mut world = HeadlessWorld::new(Vec2::ZERO);
        let mut a = Agent::new(0, "A".into(), 0, Vec2::ZERO);
        let mut b = Agent::new(1, "B".into(), 0, Vec2::ZERO);
        // A leads on paper but was sent back to the top
        a.progress_y = 4000.0;
        a.body = Some(world.create_body(BodyDesc::dynamic(Vec2::new(300.0, 100.0))));
        b.progress_y = 3000.0;
        b.body = Some(world.create_body(BodyDesc::dynamic(Vec2::new(500.0, 3000.0))));
        let agents = vec![a, b];
        assert_eq!(pick_leader(&agents, &world, 400.0), Some(Vec2::new(500.0, 3000.0)));
        assert_eq!(pick_leader(&agents[..1], &world, 400.0), Some(Vec2::new(300.0, 100.0)));
    }
}
