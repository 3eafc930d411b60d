//! Race state and core simulation types
//!
//! `RaceContext` is the one simulation context per round. Every component
//! function takes it by reference; nothing lives in globals.

use std::collections::HashMap;

use glam::Vec2;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::checkpoint::CheckpointController;
use super::course::Course;
use super::golden::GoldenDirector;
use super::progress::RankCache;
use super::round::RoundState;
use crate::consts::*;
use crate::cues::{Cue, CueKind};
use crate::engine::Participant;
use crate::physics::{BodyDesc, BodyHandle, ColliderDesc, ColliderHandle, ColliderShape, PhysicsWorld};
use crate::settings::RaceSettings;

/// Why an agent left the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationReason {
    /// Left the world bounds
    Fall,
    /// Removed by a checkpoint cut
    Cut,
    /// Crossed the finish (a good elimination)
    Finish,
}

/// Sustained pull left behind by a magnet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnetPull {
    pub point: Vec2,
    pub strength: f32,
    pub until: f32,
}

/// Per-agent modifier bookkeeping
#[derive(Debug, Clone, Default)]
pub struct AgentEffects {
    /// One-shot warp already consumed
    pub warp_used: bool,
    /// Gates that have bounced this agent (bit per gate index)
    pub gates_denied: u32,
    /// Gates this agent has been let through (bit per gate index)
    pub gates_passed: u32,
    pub boost_ready_at: f32,
    pub bumper_ready_at: f32,
    pub magnet: Option<MagnetPull>,
}

impl AgentEffects {
    pub fn gate_denied(&self, gate: u8) -> bool {
        self.gates_denied & (1 << gate) != 0
    }

    pub fn gate_passed(&self, gate: u8) -> bool {
        self.gates_passed & (1 << gate) != 0
    }
}

/// One participant and its bookkeeping record
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: u32,
    pub name: String,
    pub color: u32,
    /// Physical body; `None` once released
    pub body: Option<BodyHandle>,
    pub spawn: Vec2,
    /// Best depth reached (monotonic ranking key)
    pub progress_y: f32,
    /// Depth baseline for stagnation detection
    pub last_progress_y: f32,
    pub last_moved_at: f32,
    pub last_nudge_at: f32,
    /// 0 = fresh, 1 = already kicked once this stuck episode
    pub rescue_stage: u8,
    /// Progress at the last escalation (episode clears once well past it)
    pub rescue_mark: f32,
    pub effects: AgentEffects,
    pub eliminated: Option<EliminationReason>,
}

impl Agent {
    pub fn new(id: u32, name: String, color: u32, spawn: Vec2) -> Self {
        Self {
            id,
            name,
            color,
            body: None,
            spawn,
            progress_y: spawn.y,
            last_progress_y: spawn.y,
            last_moved_at: 0.0,
            last_nudge_at: 0.0,
            rescue_stage: 0,
            rescue_mark: spawn.y,
            effects: AgentEffects::default(),
            eliminated: None,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.eliminated.is_none()
    }
}

/// One arrival at the finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishEntry {
    pub id: u32,
    pub name: String,
    pub color: u32,
    /// Simulation time of arrival (seconds)
    pub time: f32,
}

/// Arrival-ordered, deduplicated finish list; first entry is the winner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinishRecord {
    entries: Vec<FinishEntry>,
}

impl FinishRecord {
    /// Append an arrival. Returns false if the agent already finished.
    pub fn push(&mut self, entry: FinishEntry) -> bool {
        if self.contains(entry.id) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn winner(&self) -> Option<&FinishEntry> {
        self.entries.first()
    }

    pub fn position_of(&self, id: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn entries(&self) -> &[FinishEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a collider belongs to (collider → identity table)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderOwner {
    Agent(u32),
    Zone(usize),
}

/// Simulation and wall clocks
#[derive(Debug, Clone, Copy, Default)]
pub struct RaceClock {
    /// Fixed ticks since start
    pub tick: u64,
    /// Simulated seconds since start
    pub sim_time: f32,
    /// Host frame seconds since start (drives slow-motion windows)
    pub real_time: f32,
}

/// Elimination tallies
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EliminationCounts {
    pub fallen: usize,
    pub cut: usize,
    pub finished: usize,
}

/// Complete per-round simulation context
#[derive(Debug)]
pub struct RaceContext {
    pub settings: RaceSettings,
    pub course: Course,
    /// All agents, indexed by id
    pub agents: Vec<Agent>,
    /// Collider → agent/zone lookup
    pub owners: HashMap<ColliderHandle, ColliderOwner>,
    /// Agent id → its collider
    pub agent_colliders: Vec<ColliderHandle>,
    pub finish_record: FinishRecord,
    pub round: RoundState,
    pub ranks: RankCache,
    pub checkpoints: CheckpointController,
    pub golden: GoldenDirector,
    pub clock: RaceClock,
    pub counts: EliminationCounts,
    pub rng: Pcg32,
    /// Cues produced since the last drain
    pub cues: Vec<Cue>,
}

impl RaceContext {
    /// Build the course and spawn one agent per participant (round stays idle)
    pub fn new(
        settings: RaceSettings,
        participants: &[Participant],
        world: &mut dyn PhysicsWorld,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(settings.seed);
        let course = Course::build(world, &settings, &mut rng);

        let mut owners = HashMap::new();
        for (idx, zone) in course.zones.iter().enumerate() {
            owners.insert(zone.collider, ColliderOwner::Zone(idx));
        }

        // Shuffled spawn slots so list order doesn't decide the start grid
        let mut slots = spawn_slots(participants.len(), course.width);
        slots.shuffle(&mut rng);

        let mut agents = Vec::with_capacity(participants.len());
        let mut agent_colliders = Vec::with_capacity(participants.len());
        for (i, (participant, slot)) in participants.iter().zip(slots).enumerate() {
            let id = i as u32;
            let mut agent = Agent::new(id, participant.name.clone(), participant.color, slot);
            let body = world.create_body(BodyDesc::dynamic(slot));
            let collider = world.create_collider(ColliderDesc::solid(
                body,
                ColliderShape::Circle {
                    radius: MARBLE_RADIUS,
                },
                0.4,
            ));
            agent.body = Some(body);
            owners.insert(collider, ColliderOwner::Agent(id));
            agent_colliders.push(collider);
            agents.push(agent);
        }

        let checkpoints = CheckpointController::new(course.checkpoints.clone());

        Self {
            settings,
            course,
            agents,
            owners,
            agent_colliders,
            finish_record: FinishRecord::default(),
            round: RoundState::default(),
            ranks: RankCache::default(),
            checkpoints,
            golden: GoldenDirector::default(),
            clock: RaceClock::default(),
            counts: EliminationCounts::default(),
            rng,
            cues: Vec::new(),
        }
    }

    pub fn now(&self) -> f32 {
        self.clock.sim_time
    }

    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_alive()).count()
    }

    pub fn agent_by_name(&self, name: &str) -> Option<&Agent> {
        self.agents
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn push_cue(&mut self, kind: CueKind, agent: Option<u32>) {
        self.cues.push(Cue { kind, agent });
    }

    /// Mark an agent eliminated and release its body. Returns false when the
    /// agent was already out (the transition happens at most once).
    pub fn eliminate(
        &mut self,
        world: &mut dyn PhysicsWorld,
        id: u32,
        reason: EliminationReason,
    ) -> bool {
        let Some(agent) = self.agents.get_mut(id as usize) else {
            return false;
        };
        if agent.eliminated.is_some() {
            return false;
        }
        agent.eliminated = Some(reason);
        agent.effects.magnet = None;
        if let Some(body) = agent.body.take() {
            world.remove_body(body);
        }
        if let Some(collider) = self.agent_colliders.get(id as usize) {
            self.owners.remove(collider);
        }
        match reason {
            EliminationReason::Fall => self.counts.fallen += 1,
            EliminationReason::Cut => self.counts.cut += 1,
            EliminationReason::Finish => self.counts.finished += 1,
        }
        true
    }

    /// Record a finish arrival: append to the finish record and retire the agent
    pub fn record_finish(&mut self, world: &mut dyn PhysicsWorld, id: u32) -> bool {
        let Some(agent) = self.agents.get(id as usize) else {
            return false;
        };
        if !agent.is_alive() {
            return false;
        }
        let entry = FinishEntry {
            id,
            name: agent.name.clone(),
            color: agent.color,
            time: self.clock.sim_time,
        };
        if !self.finish_record.push(entry) {
            return false;
        }
        // Finishing is the only way past the cap
        if let Some(agent) = self.agents.get_mut(id as usize) {
            agent.progress_y = agent.progress_y.max(self.course.finish_y);
        }
        self.eliminate(world, id, EliminationReason::Finish);
        self.round.note_finish(id);
        self.push_cue(CueKind::Finish, Some(id));
        log::debug!(
            "Agent {} finished #{} at {:.2}s",
            id,
            self.finish_record.len(),
            self.clock.sim_time
        );
        true
    }

    /// Release every body this round still owns (agents and course)
    pub fn teardown(&mut self, world: &mut dyn PhysicsWorld) {
        for agent in &mut self.agents {
            if let Some(body) = agent.body.take() {
                world.remove_body(body);
            }
        }
        self.course.release(world);
        self.owners.clear();
        self.cues.clear();
    }
}

/// Evenly spread spawn points across the spawn band
fn spawn_slots(count: usize, width: f32) -> Vec<Vec2> {
    let margin = 60.0;
    let usable = (width - margin * 2.0).max(1.0);
    let spacing = MARBLE_RADIUS * 2.0 + 4.0;
    let per_row = ((usable / spacing).floor() as usize).max(1);
    let rows = count.div_ceil(per_row).max(1);
    let row_gap = (SPAWN_BAND / rows as f32).min(spacing);
    (0..count)
        .map(|i| {
            let row = i / per_row;
            let col = i % per_row;
            let stagger = if row % 2 == 0 { 0.0 } else { spacing * 0.5 };
            Vec2::new(
                margin + col as f32 * spacing + stagger,
                SPAWN_TOP + row as f32 * row_gap,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::HeadlessWorld;

    fn participants(n: usize) -> Vec<Participant> {
        (0..n)
            .map(|i| Participant::new(format!("M{i}"), i as u32))
            .collect()
    }

    #[test]
    fn test_finish_record_dedups() {
        let mut record = FinishRecord::default();
        let entry = |id| FinishEntry {
            id,
            name: format!("M{id}"),
            color: 0,
            time: 1.0,
        };
        assert!(record.push(entry(4)));
        assert!(record.push(entry(2)));
        assert!(!record.push(entry(4)));
        assert_eq!(record.len(), 2);
        assert_eq!(record.winner().map(|e| e.id), Some(4));
        assert_eq!(record.position_of(2), Some(1));
    }

    #[test]
    fn test_eliminate_releases_body_once() {
        let mut world = HeadlessWorld::default();
        let mut ctx = RaceContext::new(RaceSettings::default(), &participants(3), &mut world);
        let body = ctx.agents[1].body.unwrap();
        let before = world.body_count();

        assert!(ctx.eliminate(&mut world, 1, EliminationReason::Fall));
        assert!(!ctx.eliminate(&mut world, 1, EliminationReason::Cut));
        assert_eq!(world.body_count(), before - 1);
        assert!(!world.contains_body(body));
        assert_eq!(ctx.agents[1].eliminated, Some(EliminationReason::Fall));
        assert_eq!(ctx.counts.fallen, 1);
        assert_eq!(ctx.counts.cut, 0);
        assert!(
            !ctx.owners
                .values()
                .any(|o| *o == ColliderOwner::Agent(1))
        );
    }

    #[test]
    fn test_record_finish_once() {
        let mut world = HeadlessWorld::default();
        let mut ctx = RaceContext::new(RaceSettings::default(), &participants(2), &mut world);
        assert!(ctx.record_finish(&mut world, 0));
        assert!(!ctx.record_finish(&mut world, 0));
        assert_eq!(ctx.finish_record.len(), 1);
        assert_eq!(ctx.agents[0].eliminated, Some(EliminationReason::Finish));
        assert!(ctx.agents[0].progress_y >= ctx.course.finish_y);
    }

    #[test]
    fn test_spawns_inside_band() {
        let mut world = HeadlessWorld::default();
        let ctx = RaceContext::new(RaceSettings::default(), &participants(500), &mut world);
        assert_eq!(ctx.agents.len(), 500);
        for agent in &ctx.agents {
            assert!(agent.spawn.y >= SPAWN_TOP && agent.spawn.y < SPAWN_TOP + SPAWN_BAND);
            assert!(agent.spawn.x > 0.0 && agent.spawn.x < ctx.course.width);
        }
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut world = HeadlessWorld::default();
        let mut ctx = RaceContext::new(RaceSettings::default(), &participants(10), &mut world);
        ctx.eliminate(&mut world, 3, EliminationReason::Cut);
        ctx.teardown(&mut world);
        assert_eq!(world.body_count(), 0);
    }
}
