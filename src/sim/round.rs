//! Round lifecycle
//!
//! idle → running → finished. A finish sequence opens inside `running` once
//! the minimum duration has passed and somebody has finished; it ends at the
//! hard stop, or at the post-finish deadline if nobody is left on course.

use serde::{Deserialize, Serialize};

use crate::settings::RaceSettings;

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    Idle,
    Running,
    Finished,
}

/// The bounded window after the race is decided
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinishSequence {
    /// First-ever finish record entry
    pub winner_id: u32,
    pub started_at: f32,
    /// End of the camera hold / countdown
    pub post_finish_deadline: f32,
    pub hard_stop_deadline: f32,
    pub fast_forward: bool,
}

/// Transition notifications from `RoundState::update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    SequenceBegan { winner_id: u32 },
    FastForward,
    Finished,
}

/// Round phase plus the finish sequence, owned by the lifecycle
#[derive(Debug, Clone, Default)]
pub struct RoundState {
    phase: RoundPhase,
    /// First finisher, recorded even before the minimum duration
    winner_candidate: Option<u32>,
    sequence: Option<FinishSequence>,
}

impl RoundState {
    /// idle → running, clearing every per-round field
    pub fn start(&mut self) {
        *self = Self {
            phase: RoundPhase::Running,
            ..Self::default()
        };
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RoundPhase::Running
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RoundPhase::Finished
    }

    pub fn sequence(&self) -> Option<&FinishSequence> {
        self.sequence.as_ref()
    }

    /// Decided winner, once the finish sequence has begun
    pub fn winner(&self) -> Option<u32> {
        self.sequence.map(|s| s.winner_id)
    }

    /// Record an arrival; only the first one becomes the winner candidate
    pub fn note_finish(&mut self, id: u32) {
        if self.winner_candidate.is_none() {
            self.winner_candidate = Some(id);
        }
    }

    /// Seconds until the post-finish countdown ends
    pub fn post_finish_remaining(&self, now: f32) -> Option<f32> {
        self.sequence
            .map(|s| (s.post_finish_deadline - now).max(0.0))
    }

    /// Time scale contributed by fast-forward (1.0 when inactive)
    pub fn time_scale(&self, settings: &RaceSettings) -> f32 {
        match self.sequence {
            Some(s) if s.fast_forward && self.is_running() => settings.fast_forward_scale,
            _ => 1.0,
        }
    }

    /// Advance the lifecycle at sim time `now`
    pub fn update(
        &mut self,
        now: f32,
        finishers: usize,
        alive: usize,
        settings: &RaceSettings,
    ) -> Vec<RoundEvent> {
        let mut events = Vec::new();
        if !self.is_running() {
            return events;
        }

        if self.sequence.is_none()
            && let Some(winner_id) = self.winner_candidate
            && now >= settings.min_round_secs
        {
            self.sequence = Some(FinishSequence {
                winner_id,
                started_at: now,
                post_finish_deadline: now + settings.post_finish_secs,
                hard_stop_deadline: now + settings.hard_stop_secs,
                fast_forward: false,
            });
            events.push(RoundEvent::SequenceBegan { winner_id });
        }

        match self.sequence.as_mut() {
            Some(seq) => {
                if !seq.fast_forward
                    && settings.fast_forward_finishers > 0
                    && finishers >= settings.fast_forward_finishers
                {
                    seq.fast_forward = true;
                    events.push(RoundEvent::FastForward);
                }
                let emptied = alive == 0 && now >= seq.post_finish_deadline;
                if now >= seq.hard_stop_deadline || emptied {
                    self.phase = RoundPhase::Finished;
                    events.push(RoundEvent::Finished);
                }
            }
            None => {
                // Nobody on course and nobody finished: no finish can ever come
                if alive == 0 && self.winner_candidate.is_none() {
                    self.phase = RoundPhase::Finished;
                    events.push(RoundEvent::Finished);
                }
            }
        }
        events
    }

    /// Force the round over (destroy/reset)
    pub fn stop(&mut self) {
        self.phase = RoundPhase::Finished;
    }
}
