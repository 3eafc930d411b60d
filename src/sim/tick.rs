//! Fixed timestep simulation tick
//!
//! One call advances the race by exactly one step:
//! 1. clock + rank invalidation
//! 2. moving zones, then the physics step
//! 3. drain collision events and dispatch (agent, zone) pairs in order
//! 4. per-agent scan: bounds, finish, progress, magnet pull, rescue
//! 5. once-per-tick controllers: checkpoint cuts, golden moment, lifecycle

use super::checkpoint::{CutAction, update_checkpoints};
use super::golden::update_golden;
use super::modifiers::{apply_magnet_pull, dispatch};
use super::progress::record_progress;
use super::rescue::supervise;
use super::round::RoundEvent;
use super::state::{ColliderOwner, EliminationReason, RaceContext};
use crate::clamp_speed;
use crate::cues::CueKind;
use crate::physics::{ColliderHandle, CollisionEvent, PhysicsWorld};

/// What happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Modifier triggers dispatched
    pub dispatched: usize,
    pub fallen: usize,
    pub finished: usize,
    pub cut: Option<CutAction>,
    pub golden: bool,
    pub round_events: Vec<RoundEvent>,
}

/// Resolve a collider pair to (agent id, zone index), in either order
fn agent_zone_pair(ctx: &RaceContext, a: ColliderHandle, b: ColliderHandle) -> Option<(u32, usize)> {
    match (ctx.owners.get(&a)?, ctx.owners.get(&b)?) {
        (&ColliderOwner::Agent(id), &ColliderOwner::Zone(zone))
        | (&ColliderOwner::Zone(zone), &ColliderOwner::Agent(id)) => Some((id, zone)),
        _ => None,
    }
}

/// Advance the race by one fixed step of `dt` sim seconds
pub fn tick(ctx: &mut RaceContext, world: &mut dyn PhysicsWorld, dt: f32) -> TickReport {
    let mut report = TickReport::default();
    if !ctx.round.is_running() {
        return report;
    }

    ctx.clock.tick += 1;
    ctx.clock.sim_time += dt;
    ctx.ranks.invalidate();
    let now = ctx.clock.sim_time;

    ctx.course.animate_zones(world, now);
    world.step(dt);

    // Only entries trigger modifiers; exits carry no gameplay
    for event in world.drain_collision_events() {
        let CollisionEvent::Started(a, b) = event else {
            continue;
        };
        if let Some((agent_id, zone_idx)) = agent_zone_pair(ctx, a, b) {
            dispatch(ctx, world, agent_id, zone_idx);
            report.dispatched += 1;
        }
    }

    let finish_y = ctx.course.finish_y;
    for idx in 0..ctx.agents.len() {
        let agent = &ctx.agents[idx];
        if !agent.is_alive() {
            continue;
        }
        let Some(body) = agent.body else { continue };
        let Some(pos) = world.position(body) else {
            continue;
        };
        let id = agent.id;

        if ctx.course.is_out_of_bounds(pos) {
            if ctx.eliminate(world, id, EliminationReason::Fall) {
                log::debug!("Agent {} fell out at ({:.0}, {:.0})", id, pos.x, pos.y);
                report.fallen += 1;
            }
            continue;
        }
        // Positional fallback for a sensor pass the solver missed
        if ctx.course.is_finish_crossing(pos) {
            if ctx.record_finish(world, id) {
                report.finished += 1;
            }
            continue;
        }

        let running = ctx.round.is_running();
        record_progress(&mut ctx.agents[idx], pos.y, finish_y, running);
        apply_magnet_pull(ctx, world, idx, pos, dt);
        supervise(ctx, world, idx, pos);

        if let Some(body) = ctx.agents[idx].body
            && let Some(vel) = world.velocity(body)
        {
            world.set_velocity(body, clamp_speed(vel));
        }
    }
    ctx.ranks.invalidate();

    if ctx.settings.modifiers.checkpoint_cuts {
        report.cut = Some(update_checkpoints(ctx, world));
    }
    if ctx.settings.modifiers.golden_moments {
        report.golden = update_golden(ctx, world);
    }

    let finishers = ctx.finish_record.len();
    let alive = ctx.alive_count();
    report.round_events = ctx.round.update(now, finishers, alive, &ctx.settings);
    for event in &report.round_events {
        match *event {
            RoundEvent::SequenceBegan { winner_id } => {
                let name = ctx
                    .agents
                    .get(winner_id as usize)
                    .map(|a| a.name.as_str())
                    .unwrap_or("?");
                log::info!("Winner: {} ({:.2}s), finish sequence started", name, now);
                ctx.push_cue(CueKind::Win, Some(winner_id));
            }
            RoundEvent::FastForward => {
                log::info!(
                    "{} finishers in, fast-forward x{}",
                    finishers,
                    ctx.settings.fast_forward_scale
                );
            }
            RoundEvent::Finished => {
                log::info!(
                    "Round finished at {:.2}s: {} finished, {} fell, {} cut, {} still on course",
                    now,
                    ctx.counts.finished,
                    ctx.counts.fallen,
                    ctx.counts.cut,
                    alive
                );
            }
        }
    }

    report
}
