//! One-shot renderer/audio cues
//!
//! The simulation pushes cues as things happen; the engine drains them once
//! per frame into whatever sink the host installed. Delivery is best-effort:
//! a missing sink simply drops them.

use serde::{Deserialize, Serialize};

/// Cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueKind {
    /// Round started
    Start,
    /// Agent bounced by a speed gate
    GateDenied,
    /// Agent won the gate jackpot and slipped through
    GateJackpot,
    Warp,
    Boost,
    Slow,
    Magnet,
    Bomb,
    Bumper,
    /// Large bumper tier
    BumperMega,
    /// Checkpoint cut announced
    CutAnnounce,
    /// Checkpoint cut executed
    Cut,
    /// Agent crossed the finish
    Finish,
    /// Finish sequence began with a fixed winner
    Win,
    /// Golden-moment slow motion started
    SlowMotion,
    /// Stuck agent was kicked or sent back to the start
    Rescue,
}

/// A cue with the agent it concerns (when there is one)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub kind: CueKind,
    pub agent: Option<u32>,
}

impl Cue {
    /// Cues that should force an immediate UI snapshot
    pub fn is_significant(&self) -> bool {
        matches!(
            self.kind,
            CueKind::Start
                | CueKind::CutAnnounce
                | CueKind::Cut
                | CueKind::Finish
                | CueKind::Win
                | CueKind::SlowMotion
        )
    }
}

/// Receiver for cues (audio player, particle spawner, ...)
pub trait CueSink {
    /// Must not block; failures are the sink's own business.
    fn play(&mut self, cue: Cue);
}

/// Sink that records cues, handy for tests and replay logs
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub cues: Vec<Cue>,
}

impl CueSink for RecordingSink {
    fn play(&mut self, cue: Cue) {
        self.cues.push(cue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_significant_cues() {
        let cue = |kind, agent| Cue { kind, agent };
        assert!(cue(CueKind::Win, None).is_significant());
        assert!(cue(CueKind::Finish, Some(3)).is_significant());
        assert!(!cue(CueKind::Boost, Some(3)).is_significant());
    }
}
