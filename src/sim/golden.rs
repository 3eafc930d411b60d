//! Golden-moment slow motion
//!
//! Watches the top three for a near-tied contest at the finish line and
//! opens a short slow-motion window. Windows and cooldowns run on wall time
//! so slowing the simulation doesn't stretch them.

use glam::Vec2;

use super::progress::top_n;
use super::state::RaceContext;
use crate::cues::CueKind;
use crate::physics::PhysicsWorld;
use crate::settings::RaceSettings;

/// One of the current leaders as the detector sees it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contender {
    pub progress_y: f32,
    /// Physical position this tick
    pub position: Vec2,
}

/// Geometry the detector checks contenders against
#[derive(Debug, Clone, Copy)]
pub struct GoldenZone {
    pub final_stretch_y: f32,
    pub finish_point: Vec2,
    /// Max depth difference between two contenders
    pub depth_tolerance: f32,
    /// One of the pair must be this close to the finish point
    pub finish_radius: f32,
}

/// True when two contenders are both in the final stretch, level with each
/// other, and at least one of them is close to the finish point
pub fn is_golden_moment(contenders: &[Contender], zone: &GoldenZone) -> bool {
    for (i, a) in contenders.iter().enumerate() {
        for b in &contenders[i + 1..] {
            let in_stretch =
                a.progress_y >= zone.final_stretch_y && b.progress_y >= zone.final_stretch_y;
            let level = (a.position.y - b.position.y).abs() < zone.depth_tolerance;
            let near_finish = a.position.distance(zone.finish_point) <= zone.finish_radius
                || b.position.distance(zone.finish_point) <= zone.finish_radius;
            if in_stretch && level && near_finish {
                return true;
            }
        }
    }
    false
}

/// Slow-motion window and re-arm cooldown
#[derive(Debug, Clone, Default)]
pub struct GoldenDirector {
    /// Wall time the current window closes
    active_until: Option<f32>,
    /// Wall time the detector re-arms
    rearm_at: f32,
    /// Windows opened this round
    pub triggered: u32,
}

impl GoldenDirector {
    pub fn is_active(&self, real_now: f32) -> bool {
        self.active_until.is_some_and(|until| real_now < until)
    }

    /// Seconds left in the current window
    pub fn remaining(&self, real_now: f32) -> Option<f32> {
        self.active_until
            .filter(|&until| real_now < until)
            .map(|until| until - real_now)
    }

    /// Time scale contributed by slow motion (1.0 when inactive)
    pub fn time_scale(&self, real_now: f32, settings: &RaceSettings) -> f32 {
        if self.is_active(real_now) {
            settings.golden_time_scale
        } else {
            1.0
        }
    }

    /// Fire if armed and the contenders qualify. Returns true on a new window.
    pub fn poll(
        &mut self,
        real_now: f32,
        contenders: &[Contender],
        zone: &GoldenZone,
        finishers: usize,
        settings: &RaceSettings,
    ) -> bool {
        if self.is_active(real_now) || real_now < self.rearm_at {
            return false;
        }
        if finishers >= settings.golden_max_finishers {
            return false;
        }
        if !is_golden_moment(contenders, zone) {
            return false;
        }
        let until = real_now + settings.golden_duration_secs;
        self.active_until = Some(until);
        self.rearm_at = until + settings.golden_cooldown_secs;
        self.triggered += 1;
        true
    }
}

/// Run the director for one tick against the race context
pub fn update_golden(ctx: &mut RaceContext, world: &dyn PhysicsWorld) -> bool {
    let contenders: Vec<Contender> = top_n(&ctx.agents, 3)
        .into_iter()
        .filter_map(|i| {
            let agent = &ctx.agents[i];
            let position = world.position(agent.body?)?;
            Some(Contender {
                progress_y: agent.progress_y,
                position,
            })
        })
        .collect();
    let zone = GoldenZone {
        final_stretch_y: ctx.course.final_stretch_y,
        finish_point: ctx.course.finish_point,
        depth_tolerance: ctx.settings.golden_depth_tolerance,
        finish_radius: ctx.settings.golden_finish_radius,
    };
    let now = ctx.clock.real_time;
    let finishers = ctx.finish_record.len();

    if ctx
        .golden
        .poll(now, &contenders, &zone, finishers, &ctx.settings)
    {
        log::info!(
            "Golden moment: slow motion x{} for {:.1}s",
            ctx.settings.golden_time_scale,
            ctx.settings.golden_duration_secs
        );
        ctx.push_cue(CueKind::SlowMotion, None);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Participant;
    use crate::physics::HeadlessWorld;
    use crate::settings::ModifierConfig;

    fn zone() -> GoldenZone {
        GoldenZone {
            final_stretch_y: 5000.0,
            finish_point: Vec2::new(450.0, 5850.0),
            depth_tolerance: 30.0,
            finish_radius: 260.0,
        }
    }

    fn contender(y: f32, x: f32) -> Contender {
        Contender {
            progress_y: y,
            position: Vec2::new(x, y),
        }
    }

    #[test]
    fn test_detects_close_pair_at_finish() {
        let leaders = [contender(5700.0, 440.0), contender(5710.0, 470.0), contender(4000.0, 100.0)];
        assert!(is_golden_moment(&leaders, &zone()));
    }

    #[test]
    fn test_rejects_spread_or_far_contest() {
        // Too far apart in depth
        let spread = [contender(5700.0, 440.0), contender(5600.0, 470.0)];
        assert!(!is_golden_moment(&spread, &zone()));
        // Level, but nowhere near the finish
        let far = [contender(5100.0, 440.0), contender(5110.0, 470.0)];
        assert!(!is_golden_moment(&far, &zone()));
        // Only one contender
        assert!(!is_golden_moment(&[contender(5800.0, 450.0)], &zone()));
    }

    #[test]
    fn test_window_then_cooldown() {
        let settings = RaceSettings::default();
        let leaders = [contender(5700.0, 440.0), contender(5710.0, 470.0)];
        let mut director = GoldenDirector::default();

        assert!(director.poll(1.0, &leaders, &zone(), 0, &settings));
        assert_eq!(director.time_scale(2.0, &settings), settings.golden_time_scale);
        assert!(!director.poll(2.0, &leaders, &zone(), 0, &settings));

        // Window over, still cooling down
        assert_eq!(director.time_scale(4.5, &settings), 1.0);
        assert!(!director.poll(10.0, &leaders, &zone(), 0, &settings));

        assert!(director.poll(14.5, &leaders, &zone(), 0, &settings));
        assert_eq!(director.triggered, 2);
    }

    #[test]
    fn test_never_after_decided() {
        let settings = RaceSettings::default();
        let leaders = [contender(5700.0, 440.0), contender(5710.0, 470.0)];
        let mut director = GoldenDirector::default();
        assert!(!director.poll(1.0, &leaders, &zone(), settings.golden_max_finishers, &settings));
        assert_eq!(director.remaining(1.0), None);
    }

    #[test]
    fn test_update_golden_on_race() {
        let mut world = HeadlessWorld::new(Vec2::ZERO);
        let settings = RaceSettings {
            modifiers: ModifierConfig::plain(),
            ..Default::default()
        };
        let participants: Vec<_> = (0..6).map(|i| Participant::new(format!("G{i}"), 0)).collect();
        let mut ctx = RaceContext::new(settings, &participants, &mut world);
        ctx.round.start();
        assert!(!update_golden(&mut ctx, &world));

        let finish = ctx.course.finish_point;
        let stretch = ctx.course.final_stretch_y;
        for (id, dx) in [(1usize, -12.0), (4, 12.0)] {
            let agent = &mut ctx.agents[id];
            agent.progress_y = stretch + 40.0;
            if let Some(body) = agent.body {
                world.set_position(body, finish + Vec2::new(dx, -40.0));
            }
        }
        ctx.clock.real_time = 2.0;
        assert!(update_golden(&mut ctx, &world));
        assert_eq!(ctx.cues.last().map(|c| c.kind), Some(CueKind::SlowMotion));
        assert_eq!(ctx.golden.time_scale(2.5, &ctx.settings), ctx.settings.golden_time_scale);
        // Already open: no second window
        assert!(!update_golden(&mut ctx, &world));
        assert_eq!(ctx.golden.triggered, 1);
    }
}
