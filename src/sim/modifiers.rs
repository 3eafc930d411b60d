//! Modifier catalog
//!
//! One handler per zone kind. Handlers are called from the tick's
//! drain-and-dispatch step with an (agent, zone) pair, read the cached rank
//! tiers, and mutate the agent's body. Cooldowns are the only guard against
//! repeated triggers within a tick. Only the warp touches `progress_y`.

use glam::Vec2;
use rand::Rng;

use super::course::ZoneKind;
use super::progress::{RankThresholds, record_progress};
use super::rescue::reset_timers;
use super::state::{MagnetPull, RaceContext};
use crate::cues::CueKind;
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::settings::WarpPolicy;
use crate::{clamp_speed, direction_or_down};

/// Chance that a gate past the first lets an agent straight through
pub const GATE_JACKPOT_CHANCE: f64 = 0.05;
/// Per-agent boost pad cooldown (seconds)
pub const BOOST_COOLDOWN: f32 = 1.0;
/// Per-agent bumper cooldown (seconds)
pub const BUMPER_COOLDOWN: f32 = 0.25;
/// Random spread applied to bumper speed
pub const BUMPER_JITTER: f32 = 0.1;

/// Result of a speed-gate encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Already through, or the gate has expired
    Open,
    Denied,
    /// Let through after an earlier bounce
    Passed,
    /// Lucky first-encounter pass
    Jackpot,
}

/// Apply the zone at `zone_idx` to agent `agent_id`. Eliminated agents and
/// stale handles are ignored.
pub fn dispatch(ctx: &mut RaceContext, world: &mut dyn PhysicsWorld, agent_id: u32, zone_idx: usize) {
    let Some(agent) = ctx.agents.get(agent_id as usize) else {
        return;
    };
    if !agent.is_alive() {
        return;
    }
    let Some(body) = agent.body else {
        return;
    };
    let Some(zone) = ctx.course.zones.get(zone_idx) else {
        return;
    };
    let (kind, center) = (zone.kind, zone.center);
    let now = ctx.clock.sim_time;

    match kind {
        ZoneKind::SpeedGate { index, expires_at } => {
            speed_gate(ctx, world, agent_id, body, index, expires_at, center.y);
        }
        ZoneKind::Warp { exit } => {
            warp(ctx, world, agent_id, body, exit);
        }
        ZoneKind::BoostPad {
            catch_up_speed,
            boost,
            leader_factor,
            wobble,
        } => boost_pad(
            ctx,
            world,
            agent_id,
            body,
            catch_up_speed,
            boost,
            leader_factor,
            wobble,
        ),
        ZoneKind::SlowPad {
            factor,
            leader_penalty,
            cooldown,
        } => slow_pad(ctx, world, agent_id, body, zone_idx, factor, leader_penalty, cooldown),
        ZoneKind::Magnet {
            pull_point,
            snap_factor,
            strength,
            duration,
            cooldown,
        } => {
            let pull = MagnetPull {
                point: pull_point,
                strength,
                until: now + duration,
            };
            magnet(ctx, world, agent_id, body, zone_idx, pull, snap_factor, cooldown);
        }
        ZoneKind::Bomb {
            radius,
            power,
            cooldown,
        } => {
            bomb(ctx, world, zone_idx, radius, power, cooldown);
        }
        ZoneKind::Bumper {
            power,
            toward_center,
        } => {
            bumper(ctx, world, agent_id, body, zone_idx, power, toward_center);
        }
        ZoneKind::Finish => {
            ctx.record_finish(world, agent_id);
        }
    }
}

fn thresholds(ctx: &mut RaceContext) -> RankThresholds {
    ctx.ranks.get(ctx.clock.tick, &ctx.agents)
}

fn set_velocity(world: &mut dyn PhysicsWorld, body: BodyHandle, vel: Vec2) {
    world.set_velocity(body, clamp_speed(vel));
}

/// Anti-speedrun gate: the first encounter bounces, except a 5% jackpot on
/// gates after the first. A bounced agent passes on its next crossing.
#[allow(clippy::too_many_arguments)]
pub fn speed_gate(
    ctx: &mut RaceContext,
    world: &mut dyn PhysicsWorld,
    agent_id: u32,
    body: BodyHandle,
    index: u8,
    expires_at: f32,
    band_y: f32,
) -> GateOutcome {
    let now = ctx.clock.sim_time;
    let finish_x = ctx.course.finish_point.x;
    let bit = 1u32 << index;
    let agent = &mut ctx.agents[agent_id as usize];

    if now >= expires_at || agent.effects.gate_passed(index) {
        return GateOutcome::Open;
    }
    if agent.effects.gate_denied(index) {
        agent.effects.gates_passed |= bit;
        return GateOutcome::Passed;
    }
    if index >= 1 && ctx.rng.random_bool(GATE_JACKPOT_CHANCE) {
        agent.effects.gates_passed |= bit;
        log::debug!("Agent {} hit the jackpot at gate {}", agent_id, index);
        ctx.push_cue(CueKind::GateJackpot, Some(agent_id));
        return GateOutcome::Jackpot;
    }

    agent.effects.gates_denied |= bit;
    let Some(pos) = world.position(body) else {
        return GateOutcome::Denied;
    };
    // Back up above the band, drifting toward the finish column
    let toward = (finish_x - pos.x).signum();
    let lateral = toward * ctx.rng.random_range(60.0..200.0);
    let lift = ctx.rng.random_range(320.0..480.0);
    let above = Vec2::new(pos.x, pos.y.min(band_y - super::course::GATE_BAND_HEIGHT - 8.0));
    world.set_position(body, above);
    set_velocity(world, body, Vec2::new(lateral, -lift));
    reset_timers(agent, above.y, now);
    log::debug!("Agent {} bounced at gate {}", agent_id, index);
    ctx.push_cue(CueKind::GateDenied, Some(agent_id));
    GateOutcome::Denied
}

/// One-shot forward teleport for the tier selected by the warp policy.
/// Returns true if the agent warped.
pub fn warp(
    ctx: &mut RaceContext,
    world: &mut dyn PhysicsWorld,
    agent_id: u32,
    body: BodyHandle,
    exit: Vec2,
) -> bool {
    let ranks = thresholds(ctx);
    let policy = ctx.settings.modifiers.warp_policy;
    let now = ctx.clock.sim_time;
    let finish_y = ctx.course.finish_y;
    let running = ctx.round.is_running();
    let agent = &mut ctx.agents[agent_id as usize];

    if agent.effects.warp_used {
        return false;
    }
    let eligible = match policy {
        WarpPolicy::Leaders => ranks.is_top30(agent.progress_y),
        WarpPolicy::Trailers => ranks.is_bottom30(agent.progress_y),
    };
    if !eligible {
        return false;
    }

    agent.effects.warp_used = true;
    let landing = exit + Vec2::new(ctx.rng.random_range(-20.0..20.0), 0.0);
    world.set_position(body, landing);
    set_velocity(world, body, Vec2::new(0.0, 120.0));
    record_progress(agent, landing.y, finish_y, running);
    reset_timers(agent, landing.y, now);
    agent.rescue_stage = 0;
    log::debug!("Agent {} warped to {:.0}", agent_id, landing.y);
    ctx.ranks.invalidate();
    ctx.push_cue(CueKind::Warp, Some(agent_id));
    true
}

/// Rank-conditional pad: leaders get slowed and wobbled, trailers get a
/// speed floor, the middle gets a mild push.
#[allow(clippy::too_many_arguments)]
pub fn boost_pad(
    ctx: &mut RaceContext,
    world: &mut dyn PhysicsWorld,
    agent_id: u32,
    body: BodyHandle,
    catch_up_speed: f32,
    boost: f32,
    leader_factor: f32,
    wobble: f32,
) {
    let now = ctx.clock.sim_time;
    if now < ctx.agents[agent_id as usize].effects.boost_ready_at {
        return;
    }
    let ranks = thresholds(ctx);
    let Some(mut vel) = world.velocity(body) else {
        return;
    };
    let agent = &mut ctx.agents[agent_id as usize];
    agent.effects.boost_ready_at = now + BOOST_COOLDOWN;

    if ranks.is_top10(agent.progress_y) {
        vel *= leader_factor;
        vel.x += ctx.rng.random_range(-wobble..=wobble);
    } else if ranks.is_bottom30(agent.progress_y) {
        vel.y = vel.y.max(catch_up_speed);
    } else {
        vel.y += boost;
    }
    set_velocity(world, body, vel);
    ctx.push_cue(CueKind::Boost, Some(agent_id));
}

/// Uniform slowdown with an extra penalty for leaders; per-zone cooldown
#[allow(clippy::too_many_arguments)]
pub fn slow_pad(
    ctx: &mut RaceContext,
    world: &mut dyn PhysicsWorld,
    agent_id: u32,
    body: BodyHandle,
    zone_idx: usize,
    factor: f32,
    leader_penalty: f32,
    cooldown: f32,
) {
    let now = ctx.clock.sim_time;
    if now < ctx.course.zones[zone_idx].ready_at {
        return;
    }
    let ranks = thresholds(ctx);
    let Some(mut vel) = world.velocity(body) else {
        return;
    };
    ctx.course.zones[zone_idx].ready_at = now + cooldown;

    vel *= factor;
    if ranks.is_top10(ctx.agents[agent_id as usize].progress_y) {
        vel *= leader_penalty;
    }
    set_velocity(world, body, vel);
    ctx.push_cue(CueKind::Slow, Some(agent_id));
}

/// Leaders only: velocity snapped down, then a sustained pull toward the
/// magnet's core. Returns true if it triggered.
#[allow(clippy::too_many_arguments)]
pub fn magnet(
    ctx: &mut RaceContext,
    world: &mut dyn PhysicsWorld,
    agent_id: u32,
    body: BodyHandle,
    zone_idx: usize,
    pull: MagnetPull,
    snap_factor: f32,
    cooldown: f32,
) -> bool {
    let now = ctx.clock.sim_time;
    if now < ctx.course.zones[zone_idx].ready_at {
        return false;
    }
    let ranks = thresholds(ctx);
    if !ranks.is_top10(ctx.agents[agent_id as usize].progress_y) {
        return false;
    }
    let Some(vel) = world.velocity(body) else {
        return false;
    };
    ctx.course.zones[zone_idx].ready_at = now + cooldown;
    set_velocity(world, body, vel * snap_factor);
    ctx.agents[agent_id as usize].effects.magnet = Some(pull);
    log::debug!("Magnet {} grabbed agent {}", zone_idx, agent_id);
    ctx.push_cue(CueKind::Magnet, Some(agent_id));
    true
}

/// Apply an active magnet pull for one tick, clearing it once expired
pub fn apply_magnet_pull(
    ctx: &mut RaceContext,
    world: &mut dyn PhysicsWorld,
    idx: usize,
    pos: Vec2,
    dt: f32,
) {
    let now = ctx.clock.sim_time;
    let agent = &mut ctx.agents[idx];
    let Some(pull) = agent.effects.magnet else {
        return;
    };
    if now >= pull.until {
        agent.effects.magnet = None;
        return;
    }
    if let Some(body) = agent.body {
        world.apply_impulse(body, direction_or_down(pos, pull.point) * pull.strength * dt);
    }
}

/// Radial blast with linear falloff on every living agent in range.
/// Returns how many agents were hit.
pub fn bomb(
    ctx: &mut RaceContext,
    world: &mut dyn PhysicsWorld,
    zone_idx: usize,
    radius: f32,
    power: f32,
    cooldown: f32,
) -> usize {
    let now = ctx.clock.sim_time;
    let zone = &mut ctx.course.zones[zone_idx];
    if now < zone.ready_at {
        return 0;
    }
    zone.ready_at = now + cooldown;
    let origin = zone.center;

    let mut hit = 0;
    for agent in ctx.agents.iter().filter(|a| a.is_alive()) {
        let Some(body) = agent.body else { continue };
        let Some(pos) = world.position(body) else { continue };
        let dist = pos.distance(origin);
        if dist > radius {
            continue;
        }
        let falloff = 1.0 - dist / radius;
        let dir = if dist > 1e-3 { (pos - origin) / dist } else { Vec2::NEG_Y };
        world.apply_impulse(body, dir * power * falloff);
        if let Some(vel) = world.velocity(body) {
            set_velocity(world, body, vel);
        }
        hit += 1;
    }
    log::debug!("Bomb {} went off, {} agents caught", zone_idx, hit);
    ctx.push_cue(CueKind::Bomb, None);
    hit
}

/// Kick away from the bumper (or toward the course center line) at the
/// greater of current speed and configured power, with a little jitter
pub fn bumper(
    ctx: &mut RaceContext,
    world: &mut dyn PhysicsWorld,
    agent_id: u32,
    body: BodyHandle,
    zone_idx: usize,
    power: f32,
    toward_center: bool,
) -> bool {
    let now = ctx.clock.sim_time;
    if now < ctx.agents[agent_id as usize].effects.bumper_ready_at {
        return false;
    }
    let (Some(pos), Some(vel)) = (world.position(body), world.velocity(body)) else {
        return false;
    };
    let zone = &ctx.course.zones[zone_idx];
    let center_x = ctx.course.width * 0.5;
    let mega = zone.is_mega();
    let dir = if toward_center {
        Vec2::new(center_x - pos.x, 40.0).normalize_or(Vec2::Y)
    } else {
        direction_or_down(zone.center, pos)
    };

    let jitter = 1.0 + ctx.rng.random_range(-BUMPER_JITTER..BUMPER_JITTER);
    let speed = vel.length().max(power) * jitter;
    set_velocity(world, body, dir * speed);
    ctx.agents[agent_id as usize].effects.bumper_ready_at = now + BUMPER_COOLDOWN;
    let cue = if mega { CueKind::BumperMega } else { CueKind::Bumper };
    ctx.push_cue(cue, Some(agent_id));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Participant;
    use crate::physics::HeadlessWorld;
    use crate::settings::{ModifierConfig, RaceSettings};
    use crate::sim::course::GATE_BAND_HEIGHT;
    use crate::sim::state::EliminationReason;

    fn setup(n: usize, settings: RaceSettings) -> (HeadlessWorld, RaceContext) {
        let mut world = HeadlessWorld::new(Vec2::ZERO);
        let participants: Vec<_> = (0..n)
            .map(|i| Participant::new(format!("M{i}"), i as u32))
            .collect();
        let mut ctx = RaceContext::new(settings, &participants, &mut world);
        ctx.round.start();
        (world, ctx)
    }

    /// Progress 100, 200, ... so the last agent leads
    fn spread_progress(ctx: &mut RaceContext) {
        for (i, agent) in ctx.agents.iter_mut().enumerate() {
            agent.progress_y = 100.0 * (i as f32 + 1.0);
        }
        ctx.ranks.invalidate();
    }

    fn handles(ctx: &RaceContext) -> Vec<BodyHandle> {
        ctx.agents.iter().map(|a| a.body.unwrap()).collect()
    }

    #[test]
    fn test_first_gate_always_bounces_once() {
        let (mut world, mut ctx) = setup(1, RaceSettings::default());
        let bodies = handles(&ctx);
        for seed in 0..200 {
            ctx.agents[0].effects.gates_denied = 0;
            ctx.agents[0].effects.gates_passed = 0;
            ctx.rng = rand::SeedableRng::seed_from_u64(seed);
            let b = bodies[0];
            let first = speed_gate(&mut ctx, &mut world, 0, b, 0, 100.0, 1000.0);
            assert_eq!(first, GateOutcome::Denied);
            let second = speed_gate(&mut ctx, &mut world, 0, b, 0, 100.0, 1000.0);
            assert_eq!(second, GateOutcome::Passed);
            let third = speed_gate(&mut ctx, &mut world, 0, b, 0, 100.0, 1000.0);
            assert_eq!(third, GateOutcome::Open);
        }
    }

    #[test]
    fn test_gate_bounce_moves_above_band() {
        let (mut world, mut ctx) = setup(1, RaceSettings::default());
        let bodies = handles(&ctx);
        let b = bodies[0];
        world.set_position(b, Vec2::new(200.0, 1005.0));
        speed_gate(&mut ctx, &mut world, 0, b, 0, 100.0, 1000.0);
        let pos = world.position(b).unwrap();
        assert!(pos.y < 1000.0 - GATE_BAND_HEIGHT);
        let vel = world.velocity(b).unwrap();
        assert!(vel.y < 0.0);
        // Drifts toward the finish column (center x = 450)
        assert!(vel.x > 0.0);
    }

    #[test]
    fn test_later_gate_jackpot_rate() {
        let (mut world, mut ctx) = setup(1, RaceSettings::default());
        let bodies = handles(&ctx);
        let b = bodies[0];
        let trials = 20_000;
        let mut jackpots = 0;
        for _ in 0..trials {
            ctx.agents[0].effects.gates_denied = 0;
            ctx.agents[0].effects.gates_passed = 0;
            if speed_gate(&mut ctx, &mut world, 0, b, 1, 100.0, 1000.0) == GateOutcome::Jackpot {
                jackpots += 1;
            }
        }
        let rate = jackpots as f64 / trials as f64;
        assert!((rate - 0.05).abs() < 0.01, "jackpot rate {rate}");
    }

    #[test]
    fn test_expired_gate_is_open() {
        let (mut world, mut ctx) = setup(1, RaceSettings::default());
        let bodies = handles(&ctx);
        ctx.clock.sim_time = 50.0;
        let b = bodies[0];
        assert_eq!(
            speed_gate(&mut ctx, &mut world, 0, b, 0, 20.0, 1000.0),
            GateOutcome::Open
        );
        assert_eq!(ctx.agents[0].effects.gates_denied, 0);
    }

    #[test]
    fn test_warp_leaders_only_once() {
        let (mut world, mut ctx) = setup(10, RaceSettings::default());
        let bodies = handles(&ctx);
        spread_progress(&mut ctx);
        let exit = Vec2::new(400.0, 3000.0);

        // Agent 0 trails the field
        assert!(!warp(&mut ctx, &mut world, 0, bodies[0], exit));
        // Agent 8 is in the top 30%
        assert!(warp(&mut ctx, &mut world, 8, bodies[8], exit));
        assert!(ctx.agents[8].progress_y >= 3000.0);
        assert!((world.position(bodies[8]).unwrap().y - 3000.0).abs() < 0.01);
        // One-shot
        assert!(!warp(&mut ctx, &mut world, 8, bodies[8], exit));
    }

    #[test]
    fn test_warp_trailers_policy() {
        let mut settings = RaceSettings::default();
        settings.modifiers.warp_policy = WarpPolicy::Trailers;
        let (mut world, mut ctx) = setup(10, settings);
        let bodies = handles(&ctx);
        spread_progress(&mut ctx);
        let exit = Vec2::new(400.0, 3000.0);
        assert!(!warp(&mut ctx, &mut world, 9, bodies[9], exit));
        assert!(warp(&mut ctx, &mut world, 0, bodies[0], exit));
    }

    #[test]
    fn test_boost_pad_tiers() {
        let (mut world, mut ctx) = setup(10, RaceSettings::default());
        let bodies = handles(&ctx);
        spread_progress(&mut ctx);
        for id in [0, 5, 9] {
            world.set_velocity(bodies[id as usize], Vec2::new(0.0, 100.0));
        }

        boost_pad(&mut ctx, &mut world, 0, bodies[0], 650.0, 220.0, 0.5, 0.0);
        assert_eq!(world.velocity(bodies[0]).unwrap().y, 650.0);

        boost_pad(&mut ctx, &mut world, 5, bodies[5], 650.0, 220.0, 0.5, 0.0);
        assert_eq!(world.velocity(bodies[5]).unwrap().y, 320.0);

        boost_pad(&mut ctx, &mut world, 9, bodies[9], 650.0, 220.0, 0.5, 0.0);
        assert_eq!(world.velocity(bodies[9]).unwrap().y, 50.0);

        // Per-agent cooldown
        world.set_velocity(bodies[5], Vec2::new(0.0, 100.0));
        boost_pad(&mut ctx, &mut world, 5, bodies[5], 650.0, 220.0, 0.5, 0.0);
        assert_eq!(world.velocity(bodies[5]).unwrap().y, 100.0);
    }

    #[test]
    fn test_slow_pad_zone_cooldown() {
        let (mut world, mut ctx) = setup(10, RaceSettings::default());
        let bodies = handles(&ctx);
        spread_progress(&mut ctx);
        let zone_idx = ctx.course.finish_zone().unwrap();
        for id in [4, 5, 9] {
            world.set_velocity(bodies[id as usize], Vec2::new(0.0, 100.0));
        }

        slow_pad(&mut ctx, &mut world, 4, bodies[4], zone_idx, 0.5, 0.5, 1.0);
        assert_eq!(world.velocity(bodies[4]).unwrap().y, 50.0);
        // Zone cooling down: a different agent is unaffected
        slow_pad(&mut ctx, &mut world, 5, bodies[5], zone_idx, 0.5, 0.5, 1.0);
        assert_eq!(world.velocity(bodies[5]).unwrap().y, 100.0);

        ctx.clock.sim_time = 2.0;
        ctx.clock.tick = 1;
        slow_pad(&mut ctx, &mut world, 9, bodies[9], zone_idx, 0.5, 0.5, 1.0);
        assert_eq!(world.velocity(bodies[9]).unwrap().y, 25.0);
    }

    #[test]
    fn test_magnet_only_grabs_leaders() {
        let (mut world, mut ctx) = setup(10, RaceSettings::default());
        let bodies = handles(&ctx);
        spread_progress(&mut ctx);
        let zone_idx = ctx.course.finish_zone().unwrap();
        let pull = MagnetPull {
            point: Vec2::new(450.0, 500.0),
            strength: 900.0,
            until: 1.0,
        };
        world.set_velocity(bodies[9], Vec2::new(0.0, 400.0));

        assert!(!magnet(&mut ctx, &mut world, 3, bodies[3], zone_idx, pull, 0.1, 3.0));
        assert!(magnet(&mut ctx, &mut world, 9, bodies[9], zone_idx, pull, 0.1, 3.0));
        assert!((world.velocity(bodies[9]).unwrap().y - 40.0).abs() < 1e-3);
        assert_eq!(ctx.agents[9].effects.magnet, Some(pull));

        let pos = Vec2::new(450.0, 700.0);
        apply_magnet_pull(&mut ctx, &mut world, 9, pos, 0.1);
        assert!(world.velocity(bodies[9]).unwrap().y < 40.0);

        ctx.clock.sim_time = 1.5;
        apply_magnet_pull(&mut ctx, &mut world, 9, pos, 0.1);
        assert!(ctx.agents[9].effects.magnet.is_none());
    }

    #[test]
    fn test_bomb_falloff_and_skips_eliminated() {
        let settings = RaceSettings {
            modifiers: ModifierConfig::plain(),
            ..Default::default()
        };
        let (mut world, mut ctx) = setup(3, settings);
        let bodies = handles(&ctx);
        let zone_idx = ctx.course.finish_zone().unwrap();
        let origin = ctx.course.zones[zone_idx].center;
        world.set_position(bodies[0], origin + Vec2::new(50.0, 0.0));
        world.set_position(bodies[1], origin + Vec2::new(150.0, 0.0));
        world.set_position(bodies[2], origin + Vec2::new(20.0, 0.0));
        ctx.eliminate(&mut world, 2, EliminationReason::Fall);

        assert_eq!(bomb(&mut ctx, &mut world, zone_idx, 200.0, 800.0, 4.0), 2);
        let near = world.velocity(bodies[0]).unwrap();
        let far = world.velocity(bodies[1]).unwrap();
        assert!((near.x - 600.0).abs() < 1e-3);
        assert!((far.x - 200.0).abs() < 1e-3);
        // Cooling down
        assert_eq!(bomb(&mut ctx, &mut world, zone_idx, 200.0, 800.0, 4.0), 0);
    }

    #[test]
    fn test_bumper_speed_and_cooldown() {
        let (mut world, mut ctx) = setup(1, RaceSettings::default());
        let bodies = handles(&ctx);
        let zone_idx = ctx
            .course
            .zones
            .iter()
            .position(|z| matches!(z.kind, ZoneKind::Bumper { toward_center: false, .. }))
            .unwrap();
        let center = ctx.course.zones[zone_idx].center;
        let b = bodies[0];
        world.set_position(b, center + Vec2::new(0.0, 10.0));
        world.set_velocity(b, Vec2::new(0.0, 50.0));

        assert!(bumper(&mut ctx, &mut world, 0, b, zone_idx, 500.0, false));
        let vel = world.velocity(b).unwrap();
        assert!(vel.y > 0.0);
        assert!(vel.length() >= 450.0 && vel.length() <= 550.0);
        assert!(!bumper(&mut ctx, &mut world, 0, b, zone_idx, 500.0, false));
    }

    #[test]
    fn test_dispatch_ignores_eliminated() {
        let (mut world, mut ctx) = setup(2, RaceSettings::default());
        let finish = ctx.course.finish_zone().unwrap();
        ctx.eliminate(&mut world, 1, EliminationReason::Cut);
        dispatch(&mut ctx, &mut world, 1, finish);
        assert!(ctx.finish_record.is_empty());
        dispatch(&mut ctx, &mut world, 0, finish);
        assert_eq!(ctx.finish_record.winner().map(|e| e.id), Some(0));
    }
}
