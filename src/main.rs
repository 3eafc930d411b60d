//! Marble Rush headless runner
//!
//! Runs one race on the headless physics world and prints the terminal
//! snapshot as JSON.

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use marble_rush::{
    Engine, EngineError, Participant, RaceSettings, WarpPolicy, consts::*, physics::HeadlessWorld,
};
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

/// Frame length the runner feeds the engine (a 60 Hz display)
#[cfg(not(target_arch = "wasm32"))]
const FRAME_DT: f32 = 1.0 / 60.0;
/// Give up after this much wall time
#[cfg(not(target_arch = "wasm32"))]
const MAX_RACE_SECS: f32 = 1800.0;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(name = "marble-rush")]
#[command(about = "Run one headless marble race and print the final snapshot", long_about = None)]
struct Args {
    /// Number of marbles
    #[arg(default_value_t = 100)]
    participants: usize,

    /// RNG seed (overrides the config file)
    seed: Option<u64>,

    /// Settings JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which end of the field may warp (leaders|trailers)
    #[arg(long)]
    warp_policy: Option<WarpPolicy>,
}

/// Spread colors around the hue wheel (golden-angle steps)
#[cfg(not(target_arch = "wasm32"))]
fn participant_color(index: usize) -> u32 {
    let hue = (index as f32 * 137.507_77) % 360.0;
    let sector = hue / 60.0;
    let x = 1.0 - (sector % 2.0 - 1.0).abs();
    let (r, g, b) = match sector as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let channel = |v: f32| ((0.25 + 0.75 * v) * 255.0) as u32;
    (channel(r) << 16) | (channel(g) << 8) | channel(b)
}

#[cfg(not(target_arch = "wasm32"))]
fn run(args: Args) -> Result<(), EngineError> {
    let mut settings = match &args.config {
        Some(path) => RaceSettings::load_from_path(path)?,
        None => RaceSettings::default(),
    };
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(policy) = args.warp_policy {
        settings.modifiers.warp_policy = policy;
    }
    log::info!(
        "{} participants, seed {:#x}, warp policy {}",
        args.participants,
        settings.seed,
        settings.modifiers.warp_policy
    );

    let participants: Vec<Participant> = (0..args.participants)
        .map(|i| Participant::new(format!("Marble {:03}", i + 1), participant_color(i)))
        .collect();
    let modifiers = settings.modifiers.clone();

    let mut engine: Engine<HeadlessWorld> = Engine::new(settings);
    engine.attach_world(HeadlessWorld::default());
    engine.set_viewport(VIEWPORT_WIDTH, VIEWPORT_HEIGHT);
    engine.start(&participants, None, modifiers)?;

    let Some(snapshot) = engine.run_to_completion(FRAME_DT, MAX_RACE_SECS) else {
        log::warn!("Race produced no snapshot");
        return Ok(());
    };
    if let Some(winner) = &snapshot.notices.winner {
        log::info!("{} wins after {:.1}s", winner, snapshot.elapsed);
    } else {
        log::warn!("No winner after {:.1}s", snapshot.elapsed);
    }
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    engine.destroy();
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("Marble Rush (headless) starting...");

    if let Err(e) = run(args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host page; nothing to run here
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["marble-rush"]).unwrap();
        assert_eq!(args.participants, 100);
        assert_eq!(args.seed, None);
        assert!(args.config.is_none());
        assert!(args.warp_policy.is_none());
    }

    #[test]
    fn test_args_positional_and_flags() {
        let args = Args::try_parse_from([
            "marble-rush",
            "250",
            "42",
            "--config",
            "race.json",
            "--warp-policy",
            "trailers",
        ])
        .unwrap();
        assert_eq!(args.participants, 250);
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.config, Some(PathBuf::from("race.json")));
        assert_eq!(args.warp_policy, Some(WarpPolicy::Trailers));
    }

    #[test]
    fn test_args_rejects_bad_input() {
        assert!(Args::try_parse_from(["marble-rush", "many"]).is_err());
        assert!(Args::try_parse_from(["marble-rush", "10", "1", "2"]).is_err());
        assert!(Args::try_parse_from(["marble-rush", "--warp-policy", "middle"]).is_err());
        assert!(Args::try_parse_from(["marble-rush", "--config"]).is_err());
    }

    #[test]
    fn test_colors_are_distinct() {
        let colors: std::collections::BTreeSet<u32> = (0..50).map(participant_color).collect();
        assert_eq!(colors.len(), 50);
    }
}
