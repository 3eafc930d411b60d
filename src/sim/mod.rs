//! Deterministic race simulation
//!
//! All race rules live here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by agent id, then collision event order)
//! - No rendering or platform dependencies

pub mod checkpoint;
pub mod course;
pub mod golden;
pub mod modifiers;
pub mod progress;
pub mod rescue;
pub mod round;
pub mod state;
pub mod tick;

pub use checkpoint::{CheckpointController, CutAction, CutState};
pub use course::{Course, Zone, ZoneKind, ZoneMotion};
pub use golden::GoldenDirector;
pub use progress::{RankCache, RankThresholds, leader, ranked_alive, record_progress, top_n};
pub use rescue::RescueAction;
pub use round::{FinishSequence, RoundEvent, RoundPhase, RoundState};
pub use state::{
    Agent, AgentEffects, ColliderOwner, EliminationCounts, EliminationReason, FinishEntry,
    FinishRecord, RaceClock, RaceContext,
};
pub use tick::{TickReport, tick};
