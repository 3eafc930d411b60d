//! Checkpoint cuts
//!
//! Ordered depth thresholds. When the leader reaches the next one the cut is
//! announced, and after a short delay the lowest-ranked survivors are
//! eliminated. Victims are picked at execution, not at announcement.

use super::progress::{leader, ranked_alive};
use super::state::{EliminationReason, RaceContext};
use crate::cues::CueKind;
use crate::physics::PhysicsWorld;
use crate::settings::RaceSettings;

/// A cut between announcement and execution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutState {
    pub checkpoint_index: usize,
    /// Sim time at which the cut executes
    pub execute_at: f32,
    pub cut_count: usize,
}

/// Outcome of one controller poll
#[derive(Debug, Clone, PartialEq)]
pub enum CutAction {
    None,
    Announced(CutState),
    /// Too few victims; the checkpoint is consumed with no effect
    Skipped { checkpoint_index: usize, cut_count: usize },
    /// The cut is due; the caller removes the victims
    Execute(CutState),
}

/// Victims for a cut over `alive` agents: `floor(alive * fraction)`
#[inline]
pub fn cut_size(alive: usize, fraction: f32) -> usize {
    (alive as f32 * fraction).floor() as usize
}

/// waiting(index) → announced → waiting(index + 1), terminal once every
/// checkpoint is consumed
#[derive(Debug, Clone, Default)]
pub struct CheckpointController {
    thresholds: Vec<f32>,
    next: usize,
    active: Option<CutState>,
}

impl CheckpointController {
    /// `thresholds` must be ascending depths
    pub fn new(thresholds: Vec<f32>) -> Self {
        Self {
            thresholds,
            next: 0,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&CutState> {
        self.active.as_ref()
    }

    /// Index of the next checkpoint still waiting
    pub fn next_index(&self) -> usize {
        self.next
    }

    pub fn is_done(&self) -> bool {
        self.active.is_none() && self.next >= self.thresholds.len()
    }

    /// Advance the state machine. `allow_announce` gates new announcements;
    /// an already-announced cut still executes.
    pub fn poll(
        &mut self,
        now: f32,
        leader_progress: Option<f32>,
        alive: usize,
        settings: &RaceSettings,
        allow_announce: bool,
    ) -> CutAction {
        if let Some(active) = self.active {
            if now >= active.execute_at {
                self.active = None;
                self.next = active.checkpoint_index + 1;
                return CutAction::Execute(active);
            }
            return CutAction::None;
        }

        if !allow_announce {
            return CutAction::None;
        }
        let Some(&threshold) = self.thresholds.get(self.next) else {
            return CutAction::None;
        };
        match leader_progress {
            Some(progress) if progress >= threshold => {}
            _ => return CutAction::None,
        }

        let checkpoint_index = self.next;
        let cut_count = cut_size(alive, settings.cut_fraction);
        if cut_count < settings.min_cut_victims {
            self.next += 1;
            return CutAction::Skipped {
                checkpoint_index,
                cut_count,
            };
        }

        let state = CutState {
            checkpoint_index,
            execute_at: now + settings.cut_announce_secs,
            cut_count,
        };
        self.active = Some(state);
        CutAction::Announced(state)
    }
}

/// Run the controller for one tick against the race context. Returns the
/// action taken, with `Execute` meaning the victims are already eliminated.
pub fn update_checkpoints(ctx: &mut RaceContext, world: &mut dyn PhysicsWorld) -> CutAction {
    let now = ctx.clock.sim_time;
    let leader_progress = leader(&ctx.agents).map(|i| ctx.agents[i].progress_y);
    let alive = ctx.alive_count();
    // No new cuts once the race is being decided
    let allow_announce = ctx.round.sequence().is_none();

    let action = ctx
        .checkpoints
        .poll(now, leader_progress, alive, &ctx.settings, allow_announce);

    match &action {
        CutAction::None => {}
        CutAction::Announced(state) => {
            log::info!(
                "Checkpoint {} reached: cutting {} of {} in {:.1}s",
                state.checkpoint_index + 1,
                state.cut_count,
                alive,
                state.execute_at - now
            );
            ctx.push_cue(CueKind::CutAnnounce, None);
        }
        CutAction::Skipped {
            checkpoint_index,
            cut_count,
        } => {
            log::info!(
                "Checkpoint {} skipped ({} victims < {})",
                checkpoint_index + 1,
                cut_count,
                ctx.settings.min_cut_victims
            );
        }
        CutAction::Execute(state) => {
            let order = ranked_alive(&ctx.agents);
            // Never empty the field: somebody has to be able to finish
            let count = state.cut_count.min(order.len().saturating_sub(1));
            let victims: Vec<u32> = order[order.len() - count..]
                .iter()
                .map(|&i| ctx.agents[i].id)
                .collect();
            for &id in &victims {
                ctx.eliminate(world, id, EliminationReason::Cut);
            }
            ctx.ranks.invalidate();
            log::info!(
                "Checkpoint {} cut {} agents, {} remain",
                state.checkpoint_index + 1,
                victims.len(),
                ctx.alive_count()
            );
            ctx.push_cue(CueKind::Cut, None);
        }
    }
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Participant;
    use crate::physics::HeadlessWorld;
    use crate::settings::ModifierConfig;
    use glam::Vec2;

    fn setup(n: usize) -> (HeadlessWorld, RaceContext) {
        let mut world = HeadlessWorld::new(Vec2::ZERO);
        let settings = RaceSettings {
            modifiers: ModifierConfig::plain(),
            ..Default::default()
        };
        let participants: Vec<_> = (0..n)
            .map(|i| Participant::new(format!("M{i}"), 0))
            .collect();
        let mut ctx = RaceContext::new(settings, &participants, &mut world);
        ctx.round.start();
        // Agent i sits at depth 1000 + i, so low ids trail
        for (i, agent) in ctx.agents.iter_mut().enumerate() {
            agent.progress_y = 1000.0 + i as f32;
        }
        (world, ctx)
    }

    fn push_leader_past_first(ctx: &mut RaceContext) {
        let first = ctx.course.checkpoints[0];
        let last = ctx.agents.len() - 1;
        ctx.agents[last].progress_y = first + 1.0;
    }

    #[test]
    fn test_cut_size_floor() {
        assert_eq!(cut_size(120, 0.1), 12);
        assert_eq!(cut_size(49, 0.1), 4);
        assert_eq!(cut_size(0, 0.1), 0);
    }

    #[test]
    fn test_waits_for_leader() {
        let (mut world, mut ctx) = setup(60);
        assert_eq!(update_checkpoints(&mut ctx, &mut world), CutAction::None);
        assert!(ctx.checkpoints.active().is_none());
    }

    #[test]
    fn test_cut_removes_lowest_twelve_of_120() {
        let (mut world, mut ctx) = setup(120);
        push_leader_past_first(&mut ctx);

        let CutAction::Announced(state) = update_checkpoints(&mut ctx, &mut world) else {
            panic!("expected announcement");
        };
        assert_eq!(state.cut_count, 12);
        assert_eq!(ctx.alive_count(), 120);

        // Still counting down
        ctx.clock.sim_time = state.execute_at - 0.5;
        assert_eq!(update_checkpoints(&mut ctx, &mut world), CutAction::None);

        ctx.clock.sim_time = state.execute_at;
        assert!(matches!(
            update_checkpoints(&mut ctx, &mut world),
            CutAction::Execute(_)
        ));
        assert_eq!(ctx.alive_count(), 108);
        assert_eq!(ctx.counts.cut, 12);
        for agent in &ctx.agents[..12] {
            assert_eq!(agent.eliminated, Some(EliminationReason::Cut));
        }
        assert!(ctx.agents[12..].iter().all(|a| a.is_alive()));
        assert_eq!(ctx.checkpoints.next_index(), 1);
    }

    #[test]
    fn test_victims_chosen_at_execution() {
        let (mut world, mut ctx) = setup(50);
        push_leader_past_first(&mut ctx);
        let CutAction::Announced(state) = update_checkpoints(&mut ctx, &mut world) else {
            panic!("expected announcement");
        };
        assert_eq!(state.cut_count, 5);

        // Agent 0 surges during the countdown
        ctx.agents[0].progress_y = 1500.0;
        ctx.clock.sim_time = state.execute_at;
        update_checkpoints(&mut ctx, &mut world);
        assert!(ctx.agents[0].is_alive());
        assert!(ctx.agents[1..6].iter().all(|a| !a.is_alive()));
    }

    #[test]
    fn test_skipped_below_fifty() {
        let (mut world, mut ctx) = setup(49);
        push_leader_past_first(&mut ctx);
        assert_eq!(
            update_checkpoints(&mut ctx, &mut world),
            CutAction::Skipped {
                checkpoint_index: 0,
                cut_count: 4
            }
        );
        assert_eq!(ctx.alive_count(), 49);
        assert_eq!(ctx.checkpoints.next_index(), 1);
        assert!(ctx.checkpoints.active().is_none());
    }

    #[test]
    fn test_each_checkpoint_once() {
        let mut controller = CheckpointController::new(vec![100.0, 200.0]);
        let settings = RaceSettings::default();
        assert!(matches!(
            controller.poll(0.0, Some(250.0), 100, &settings, true),
            CutAction::Announced(CutState { checkpoint_index: 0, .. })
        ));
        assert!(matches!(
            controller.poll(5.0, Some(250.0), 100, &settings, true),
            CutAction::Execute(_)
        ));
        assert!(matches!(
            controller.poll(5.0, Some(250.0), 90, &settings, true),
            CutAction::Announced(CutState { checkpoint_index: 1, .. })
        ));
        controller.poll(10.0, Some(250.0), 90, &settings, true);
        assert!(controller.is_done());
        assert_eq!(
            controller.poll(20.0, Some(9999.0), 90, &settings, true),
            CutAction::None
        );
    }

    #[test]
    fn test_no_announcement_when_disallowed() {
        let mut controller = CheckpointController::new(vec![100.0]);
        let settings = RaceSettings::default();
        assert_eq!(
            controller.poll(0.0, Some(500.0), 100, &settings, false),
            CutAction::None
        );
        assert_eq!(controller.next_index(), 0);
    }
}
