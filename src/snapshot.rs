//! UI snapshot projection
//!
//! A read-only, serializable view of the race for the host UI. Produced at
//! most every `snapshot_interval_secs` of wall time, immediately on
//! significant cues, and exactly once for the terminal state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, CameraMode};
use crate::sim::progress::ranked_alive;
use crate::sim::round::RoundPhase;
use crate::sim::state::{FinishEntry, RaceContext};

/// Leaderboard length
pub const LEADERBOARD_SIZE: usize = 10;

/// One leaderboard line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// 1-based position
    pub rank: usize,
    pub id: u32,
    pub name: String,
    pub color: u32,
    pub progress_y: f32,
    pub finished: bool,
    /// Sim time of arrival, for finishers
    pub finish_time: Option<f32>,
    pub highlighted: bool,
    pub focused: bool,
}

/// Pending checkpoint cut
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutNotice {
    /// 1-based checkpoint number
    pub checkpoint: usize,
    pub seconds_left: f32,
    pub victims: usize,
}

/// Active focus request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusNotice {
    pub name: String,
    pub seconds_left: f32,
}

/// Transient banners; absent fields are not shown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notices {
    pub cut: Option<CutNotice>,
    /// Seconds of slow motion left
    pub slow_motion: Option<f32>,
    /// Fast-forward multiplier while active
    pub fast_forward: Option<f32>,
    pub focus: Option<FocusNotice>,
    /// Seconds until the post-finish hold ends
    pub post_finish: Option<f32>,
    pub winner: Option<String>,
}

/// Everything the UI needs for one update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub phase: RoundPhase,
    /// Simulated seconds since start
    pub elapsed: f32,
    pub total: usize,
    pub alive: usize,
    pub finished: usize,
    /// Fallen plus cut
    pub eliminated: usize,
    pub fallen: usize,
    pub cut: usize,
    pub leaderboard: Vec<LeaderboardRow>,
    pub camera: Vec2,
    pub camera_mode: CameraMode,
    pub world: Vec2,
    pub viewport: Vec2,
    pub notices: Notices,
    /// Full arrival list, only on the terminal snapshot
    pub finish_record: Option<Vec<FinishEntry>>,
}

/// Build a snapshot from the current state
pub fn project(
    ctx: &RaceContext,
    camera: &Camera,
    highlight: Option<&str>,
    real_now: f32,
) -> RaceSnapshot {
    let now = ctx.clock.sim_time;
    let focus_id = camera.focus().map(|f| f.agent_id);
    let is_highlighted =
        |name: &str| highlight.is_some_and(|h| !h.is_empty() && name.eq_ignore_ascii_case(h));

    let mut leaderboard: Vec<LeaderboardRow> = ctx
        .finish_record
        .entries()
        .iter()
        .take(LEADERBOARD_SIZE)
        .map(|entry| LeaderboardRow {
            rank: 0,
            id: entry.id,
            name: entry.name.clone(),
            color: entry.color,
            progress_y: ctx.course.finish_y,
            finished: true,
            finish_time: Some(entry.time),
            highlighted: is_highlighted(&entry.name),
            focused: focus_id == Some(entry.id),
        })
        .collect();
    let open = LEADERBOARD_SIZE - leaderboard.len();
    leaderboard.extend(ranked_alive(&ctx.agents).into_iter().take(open).map(|idx| {
        let agent = &ctx.agents[idx];
        LeaderboardRow {
            rank: 0,
            id: agent.id,
            name: agent.name.clone(),
            color: agent.color,
            progress_y: agent.progress_y,
            finished: false,
            finish_time: None,
            highlighted: is_highlighted(&agent.name),
            focused: focus_id == Some(agent.id),
        }
    }));
    for (i, row) in leaderboard.iter_mut().enumerate() {
        row.rank = i + 1;
    }

    let running = ctx.round.is_running();
    let name_of = |id: u32| ctx.agents.get(id as usize).map(|a| a.name.clone());
    let fast_forward = ctx.round.time_scale(&ctx.settings);
    let notices = Notices {
        cut: ctx.checkpoints.active().map(|cut| CutNotice {
            checkpoint: cut.checkpoint_index + 1,
            seconds_left: (cut.execute_at - now).max(0.0),
            victims: cut.cut_count,
        }),
        slow_motion: ctx.golden.remaining(real_now),
        fast_forward: (fast_forward > 1.0).then_some(fast_forward),
        focus: camera.focus_remaining(real_now).and_then(|secs| {
            Some(FocusNotice {
                name: name_of(focus_id?)?,
                seconds_left: secs,
            })
        }),
        post_finish: if running {
            ctx.round.post_finish_remaining(now)
        } else {
            None
        },
        winner: ctx.round.winner().and_then(name_of),
    };

    let counts = ctx.counts;
    RaceSnapshot {
        phase: ctx.round.phase(),
        elapsed: now,
        total: ctx.agents.len(),
        alive: ctx.alive_count(),
        finished: counts.finished,
        eliminated: counts.fallen + counts.cut,
        fallen: counts.fallen,
        cut: counts.cut,
        leaderboard,
        camera: camera.emitted_position(real_now),
        camera_mode: camera.mode(),
        world: camera.world_size(),
        viewport: camera.viewport(),
        notices,
        finish_record: ctx
            .round
            .is_finished()
            .then(|| ctx.finish_record.entries().to_vec()),
    }
}

/// Emission throttle
#[derive(Debug, Clone)]
pub struct SnapshotProjector {
    interval: f32,
    last_emit: Option<f32>,
    terminal_sent: bool,
}

impl SnapshotProjector {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            last_emit: None,
            terminal_sent: false,
        }
    }

    /// Decide whether to emit at wall time `real_now`. The terminal state is
    /// emitted exactly once, and nothing follows it.
    pub fn should_emit(&mut self, real_now: f32, significant: bool, terminal: bool) -> bool {
        if self.terminal_sent {
            return false;
        }
        let due = match self.last_emit {
            None => true,
            Some(last) => real_now - last >= self.interval,
        };
        if terminal || significant || due {
            self.last_emit = Some(real_now);
            self.terminal_sent = terminal;
            return true;
        }
        false
    }

    pub fn terminal_sent(&self) -> bool {
        self.terminal_sent
    }

    pub fn reset(&mut self) {
        self.last_emit = None;
        self.terminal_sent = false;
    }
}
