//! Progress and rank tracking
//!
//! `progress_y` is each agent's best depth and the only ranking key. Rank
//! tiers are percentile cutoffs over alive agents, recomputed at most once
//! per tick.

use super::state::Agent;

/// Fraction of the field counted as "top 10%"
pub const TOP_TIER: f32 = 0.1;
/// Fraction counted as "top 30%" / "bottom 30%"
pub const WIDE_TIER: f32 = 0.3;

/// Clamp a physical depth into recordable progress.
///
/// While the round is running the finish line itself is excluded, so only
/// an actual finish moves an agent past everyone still on the course.
#[inline]
pub fn clamp_progress(physical_y: f32, finish_y: f32, running: bool) -> f32 {
    if running {
        physical_y.min(finish_y - 1.0)
    } else {
        physical_y
    }
}

/// Update an agent's best progress. Returns true if it advanced.
pub fn record_progress(agent: &mut Agent, physical_y: f32, finish_y: f32, running: bool) -> bool {
    let clamped = clamp_progress(physical_y, finish_y, running);
    if clamped > agent.progress_y {
        agent.progress_y = clamped;
        true
    } else {
        false
    }
}

/// Number of agents in a tier: `ceil(count * fraction)`, at least 1
#[inline]
pub fn tier_size(count: usize, fraction: f32) -> usize {
    ((count as f32 * fraction).ceil() as usize).max(1)
}

/// Percentile cutoffs over alive agents
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankThresholds {
    /// Alive agents the cutoffs were computed over
    pub alive: usize,
    /// Minimum progress to be top 10%
    pub top10: f32,
    /// Minimum progress to be top 30%
    pub top30: f32,
    /// Maximum progress to be bottom 30%
    pub bottom30: f32,
}

impl RankThresholds {
    /// Compute cutoffs from alive agents' progress values
    pub fn compute<'a>(agents: impl IntoIterator<Item = &'a Agent>) -> Self {
        let mut progress: Vec<f32> = agents
            .into_iter()
            .filter(|a| a.is_alive())
            .map(|a| a.progress_y)
            .collect();
        if progress.is_empty() {
            return Self::default();
        }
        // Descending
        progress.sort_by(|a, b| b.total_cmp(a));
        let n = progress.len();
        let top10 = progress[tier_size(n, TOP_TIER) - 1];
        let top30 = progress[tier_size(n, WIDE_TIER) - 1];
        let bottom30 = progress[n - tier_size(n, WIDE_TIER)];
        Self {
            alive: n,
            top10,
            top30,
            bottom30,
        }
    }

    pub fn is_top10(&self, progress: f32) -> bool {
        self.alive > 0 && progress >= self.top10
    }

    pub fn is_top30(&self, progress: f32) -> bool {
        self.alive > 0 && progress >= self.top30
    }

    pub fn is_bottom30(&self, progress: f32) -> bool {
        self.alive > 0 && progress <= self.bottom30
    }
}

/// Per-tick lazy cache for `RankThresholds`
#[derive(Debug, Clone, Default)]
pub struct RankCache {
    cached: Option<(u64, RankThresholds)>,
}

impl RankCache {
    /// Thresholds for `tick`, computing them on first use within that tick
    pub fn get(&mut self, tick: u64, agents: &[Agent]) -> RankThresholds {
        match self.cached {
            Some((t, thresholds)) if t == tick => thresholds,
            _ => {
                let thresholds = RankThresholds::compute(agents);
                self.cached = Some((tick, thresholds));
                thresholds
            }
        }
    }

    /// Drop the cached value (start of every tick, and after eliminations)
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

/// Alive agent indices ordered by progress, best first. Equal progress keeps
/// insertion order.
pub fn ranked_alive(agents: &[Agent]) -> Vec<usize> {
    let mut order: Vec<usize> = agents
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_alive())
        .map(|(i, _)| i)
        .collect();
    // sort_by is stable
    order.sort_by(|&a, &b| agents[b].progress_y.total_cmp(&agents[a].progress_y));
    order
}

/// Top `n` alive agent indices
pub fn top_n(agents: &[Agent], n: usize) -> Vec<usize> {
    let mut order = ranked_alive(agents);
    order.truncate(n);
    order
}

/// Alive agent with the best progress (first inserted wins ties)
pub fn leader(agents: &[Agent]) -> Option<usize> {
    agents
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_alive())
        .fold(None, |best: Option<usize>, (i, a)| match best {
            Some(b) if agents[b].progress_y >= a.progress_y => Some(b),
            _ => Some(i),
        })
}
