//! Stuck detection and rescue
//!
//! Dense peg fields grow pockets that can hold a marble forever. Every alive
//! agent runs two timers off its last forward motion: a short one that
//! nudges, and a long one that escalates (a strong kick first, a trip back
//! to the start on the second consecutive episode).

use glam::Vec2;
use rand::Rng;

use super::state::{Agent, RaceContext};
use crate::cues::CueKind;
use crate::physics::PhysicsWorld;
use crate::{clamp_speed, consts::*, direction_or_down};

/// Impulse for the short-timer nudge
pub const NUDGE_IMPULSE: f32 = 260.0;
/// Speed of the first escalation kick
pub const KICK_SPEED: f32 = 700.0;
/// Progress past the escalation mark that ends a stuck episode
pub const EPISODE_CLEAR_DISTANCE: f32 = 120.0;

/// What the supervisor did this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescueAction {
    None,
    Nudged,
    Kicked,
    Respawned,
}

/// Restart both timers from the current depth (after warps, bounces, respawns)
pub fn reset_timers(agent: &mut Agent, physical_y: f32, now: f32) {
    agent.last_progress_y = physical_y;
    agent.last_moved_at = now;
    agent.last_nudge_at = now;
}

/// Run the supervisor for one agent at physical position `pos`
pub fn supervise(
    ctx: &mut RaceContext,
    world: &mut dyn PhysicsWorld,
    idx: usize,
    pos: Vec2,
) -> RescueAction {
    let now = ctx.clock.sim_time;
    let noise = ctx.settings.stuck_noise;
    let nudge_after = ctx.settings.stuck_nudge_secs;
    let escalate_after = ctx.settings.stuck_escalate_secs;
    let final_stretch_y = ctx.course.final_stretch_y;
    let finish_point = ctx.course.finish_point;
    let width = ctx.course.width;

    let agent = &mut ctx.agents[idx];
    let Some(body) = agent.body else {
        return RescueAction::None;
    };

    if pos.y > agent.last_progress_y + noise {
        agent.last_progress_y = pos.y;
        agent.last_moved_at = now;
        agent.last_nudge_at = now;
        if agent.rescue_stage > 0 && agent.progress_y > agent.rescue_mark + EPISODE_CLEAR_DISTANCE {
            agent.rescue_stage = 0;
        }
        return RescueAction::None;
    }

    let stalled_for = now - agent.last_moved_at;
    let id = agent.id;

    if stalled_for >= escalate_after {
        let action = if agent.rescue_stage == 0 {
            agent.rescue_stage = 1;
            agent.rescue_mark = agent.progress_y;
            let aim = if agent.progress_y >= final_stretch_y {
                direction_or_down(pos, finish_point)
            } else {
                let lateral = ctx.rng.random_range(-0.6..0.6);
                Vec2::new(lateral, 1.0).normalize()
            };
            world.set_velocity(body, clamp_speed(aim * KICK_SPEED));
            reset_timers(agent, pos.y, now);
            RescueAction::Kicked
        } else {
            // Second consecutive episode: rejoin the field from the top
            agent.rescue_stage = 0;
            let x = ctx.rng.random_range(80.0..width - 80.0);
            let spawn = Vec2::new(x, SPAWN_TOP + SPAWN_BAND * 0.5);
            world.set_position(body, spawn);
            world.set_velocity(body, Vec2::ZERO);
            reset_timers(agent, spawn.y, now);
            RescueAction::Respawned
        };
        log::debug!("Agent {} stuck {:.1}s: {:?}", id, stalled_for, action);
        ctx.push_cue(CueKind::Rescue, Some(id));
        return action;
    }

    if now - agent.last_nudge_at >= nudge_after {
        agent.last_nudge_at = now;
        let dir = if agent.progress_y >= final_stretch_y {
            direction_or_down(pos, finish_point)
        } else {
            let lateral = ctx.rng.random_range(-0.8..0.8);
            Vec2::new(lateral, 1.0).normalize()
        };
        world.apply_impulse(body, dir * NUDGE_IMPULSE);
        return RescueAction::Nudged;
    }

    RescueAction::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Participant;
    use crate::physics::HeadlessWorld;
    use crate::settings::{ModifierConfig, RaceSettings};

    fn setup() -> (HeadlessWorld, RaceContext) {
        let mut world = HeadlessWorld::new(Vec2::ZERO);
        let settings = RaceSettings {
            modifiers: ModifierConfig::plain(),
            ..Default::default()
        };
        let ctx = RaceContext::new(settings, &[Participant::new("A", 0)], &mut world);
        (world, ctx)
    }

    fn run_stalled(ctx: &mut RaceContext, world: &mut HeadlessWorld, until: f32) -> Vec<RescueAction> {
        let pos = Vec2::new(300.0, 2000.0);
        let mut actions = Vec::new();
        while ctx.clock.sim_time < until {
            ctx.clock.sim_time += SIM_DT;
            let action = supervise(ctx, world, 0, pos);
            if action != RescueAction::None {
                actions.push(action);
            }
        }
        actions
    }

    #[test]
    fn test_motion_resets_timers() {
        let (mut world, mut ctx) = setup();
        ctx.clock.sim_time = 3.0;
        let action = supervise(&mut ctx, &mut world, 0, Vec2::new(300.0, 500.0));
        assert_eq!(action, RescueAction::None);
        assert_eq!(ctx.agents[0].last_moved_at, 3.0);
        assert_eq!(ctx.agents[0].last_progress_y, 500.0);
    }

    #[test]
    fn test_nudge_then_kick_then_respawn() {
        let (mut world, mut ctx) = setup();
        ctx.agents[0].last_progress_y = 2000.0;
        ctx.agents[0].progress_y = 2000.0;

        let actions = run_stalled(&mut ctx, &mut world, 4.1);
        assert_eq!(
            actions,
            vec![RescueAction::Nudged, RescueAction::Nudged, RescueAction::Kicked]
        );
        assert_eq!(ctx.agents[0].rescue_stage, 1);

        // Still wedged at the same depth: next escalation sends it back up
        let actions = run_stalled(&mut ctx, &mut world, 8.3);
        assert_eq!(actions.last(), Some(&RescueAction::Respawned));
        let body = ctx.agents[0].body.unwrap();
        assert!(world.position(body).unwrap().y < SPAWN_TOP + SPAWN_BAND);
        // Respawning never costs ranking progress
        assert_eq!(ctx.agents[0].progress_y, 2000.0);
    }

    #[test]
    fn test_kick_aims_at_finish_in_final_stretch() {
        let (mut world, mut ctx) = setup();
        let y = ctx.course.final_stretch_y + 10.0;
        ctx.agents[0].progress_y = y;
        ctx.agents[0].last_progress_y = y;
        ctx.clock.sim_time = ctx.settings.stuck_escalate_secs + 0.1;
        let pos = Vec2::new(100.0, y);
        assert_eq!(supervise(&mut ctx, &mut world, 0, pos), RescueAction::Kicked);
        let vel = world.velocity(ctx.agents[0].body.unwrap()).unwrap();
        let expected = direction_or_down(pos, ctx.course.finish_point);
        assert!(vel.normalize().dot(expected) > 0.99);
    }
}
