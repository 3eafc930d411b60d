//! Race settings and modifier tuning
//!
//! Loaded from JSON by the headless runner; every field has a default so a
//! partial file only overrides what it names.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_WORLD_HEIGHT;
use crate::engine::EngineError;

/// Which end of the field the one-shot warp favors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WarpPolicy {
    /// Only top-30% agents may warp (pushes the pack forward)
    #[default]
    Leaders,
    /// Only bottom-30% agents may warp (catch-up device)
    Trailers,
}

impl fmt::Display for WarpPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WarpPolicy::Leaders => "leaders",
            WarpPolicy::Trailers => "trailers",
        })
    }
}

impl FromStr for WarpPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "leaders" | "top" => Ok(WarpPolicy::Leaders),
            "trailers" | "bottom" => Ok(WarpPolicy::Trailers),
            other => Err(format!("unknown warp policy '{other}' (leaders|trailers)")),
        }
    }
}

/// Per-modifier enable flags, passed with the start command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierConfig {
    pub speed_gates: bool,
    pub warps: bool,
    pub boost_pads: bool,
    pub slow_pads: bool,
    pub magnets: bool,
    pub bombs: bool,
    pub bumpers: bool,
    /// Checkpoint cuts (mass elimination)
    pub checkpoint_cuts: bool,
    /// Golden-moment slow motion
    pub golden_moments: bool,
    pub warp_policy: WarpPolicy,
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            speed_gates: true,
            warps: true,
            boost_pads: true,
            slow_pads: true,
            magnets: true,
            bombs: true,
            bumpers: true,
            checkpoint_cuts: true,
            golden_moments: true,
            warp_policy: WarpPolicy::Leaders,
        }
    }
}

impl ModifierConfig {
    /// Everything off: pegs, walls and the finish only
    pub fn plain() -> Self {
        Self {
            speed_gates: false,
            warps: false,
            boost_pads: false,
            slow_pads: false,
            magnets: false,
            bombs: false,
            bumpers: false,
            checkpoint_cuts: false,
            golden_moments: false,
            warp_policy: WarpPolicy::Leaders,
        }
    }
}

/// Race tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    /// Run seed for course layout, spawn shuffle and modifier rolls
    pub seed: u64,
    /// Total course height in world units
    pub course_height: f32,

    // === Round lifecycle ===
    /// Minimum elapsed time before a finish sequence may begin (seconds)
    pub min_round_secs: f32,
    /// Camera hold / countdown after the finish sequence begins (seconds)
    pub post_finish_secs: f32,
    /// Hard stop after the finish sequence begins (seconds)
    pub hard_stop_secs: f32,
    /// Finisher count that activates fast-forward (0 disables)
    pub fast_forward_finishers: usize,
    /// Time scale while fast-forwarding
    pub fast_forward_scale: f32,

    // === Checkpoint cuts ===
    /// Checkpoint depths as fractions of the finish depth, ascending
    pub checkpoint_fractions: Vec<f32>,
    /// Fraction of alive agents removed per cut
    pub cut_fraction: f32,
    /// Cuts removing fewer agents than this are skipped
    pub min_cut_victims: usize,
    /// Delay between announcement and execution (seconds)
    pub cut_announce_secs: f32,

    // === Golden moment ===
    /// Final-stretch start as a fraction of the finish depth
    pub final_stretch_fraction: f32,
    /// Max physical depth difference between contenders (pixels)
    pub golden_depth_tolerance: f32,
    /// At least one contender must be this close to the finish point
    pub golden_finish_radius: f32,
    pub golden_time_scale: f32,
    pub golden_duration_secs: f32,
    pub golden_cooldown_secs: f32,
    /// Golden moments stop once this many finishers are recorded
    pub golden_max_finishers: usize,

    // === Stuck rescue ===
    /// Forward motion below this is noise (pixels)
    pub stuck_noise: f32,
    pub stuck_nudge_secs: f32,
    pub stuck_escalate_secs: f32,

    // === Snapshot ===
    pub snapshot_interval_secs: f32,

    pub modifiers: ModifierConfig,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            seed: 0x5eed_ba11,
            course_height: DEFAULT_WORLD_HEIGHT,

            min_round_secs: 60.0,
            post_finish_secs: 6.0,
            hard_stop_secs: 10.0,
            fast_forward_finishers: 3,
            fast_forward_scale: 3.0,

            checkpoint_fractions: vec![0.3, 0.5, 0.7],
            cut_fraction: 0.1,
            min_cut_victims: 5,
            cut_announce_secs: 2.0,

            final_stretch_fraction: 0.9,
            golden_depth_tolerance: 30.0,
            golden_finish_radius: 260.0,
            golden_time_scale: 0.2,
            golden_duration_secs: 3.0,
            golden_cooldown_secs: 10.0,
            golden_max_finishers: 1,

            stuck_noise: 2.0,
            stuck_nudge_secs: 1.5,
            stuck_escalate_secs: 4.0,

            snapshot_interval_secs: 0.1,

            modifiers: ModifierConfig::default(),
        }
    }
}

impl RaceSettings {
    /// Settings with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Parse settings from JSON (missing fields fall back to defaults)
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded race settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Reject settings that would break lifecycle or cut invariants
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_round_secs < 0.0 {
            return Err(EngineError::InvalidSettings("min_round_secs must be >= 0"));
        }
        if self.hard_stop_secs < self.post_finish_secs {
            return Err(EngineError::InvalidSettings(
                "hard_stop_secs must be >= post_finish_secs",
            ));
        }
        if !(0.0..=1.0).contains(&self.cut_fraction) {
            return Err(EngineError::InvalidSettings("cut_fraction must be within 0..=1"));
        }
        if self
            .checkpoint_fractions
            .windows(2)
            .any(|w| w[0] >= w[1])
        {
            return Err(EngineError::InvalidSettings(
                "checkpoint_fractions must be strictly ascending",
            ));
        }
        if self
            .checkpoint_fractions
            .iter()
            .any(|f| !(0.0..1.0).contains(f))
        {
            return Err(EngineError::InvalidSettings(
                "checkpoint_fractions must be within 0..1",
            ));
        }
        if self.golden_time_scale <= 0.0 || self.fast_forward_scale <= 0.0 {
            return Err(EngineError::InvalidSettings("time scales must be positive"));
        }
        if self.course_height < 3000.0 {
            return Err(EngineError::InvalidSettings("course_height must be >= 3000"));
        }
        Ok(())
    }
}
