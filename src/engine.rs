//! Engine command surface and frame loop
//!
//! Owns the physics collaborator, the per-round `RaceContext`, the camera
//! and the snapshot throttle. The host calls `frame(dt)` once per display
//! frame; each frame runs zero or more fixed ticks through an accumulator.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::{Camera, CameraTargets, pick_leader};
use crate::consts::*;
use crate::cues::{CueKind, CueSink};
use crate::physics::{HeadlessWorld, PhysicsWorld};
use crate::settings::{ModifierConfig, RaceSettings};
use crate::sim::state::RaceContext;
use crate::sim::tick;
use crate::snapshot::{RaceSnapshot, SnapshotProjector, project};

/// Errors surfaced to the host
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot start: {collaborator} collaborator is not initialized")]
    NotInitialized { collaborator: &'static str },
    #[error("cannot start a round without participants")]
    NoParticipants,
    #[error("invalid settings: {0}")]
    InvalidSettings(&'static str),
    #[error("failed to parse settings: {0}")]
    Config(#[from] serde_json::Error),
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
}

/// One entrant as supplied by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    /// 0xRRGGBB
    pub color: u32,
}

impl Participant {
    pub fn new(name: impl Into<String>, color: u32) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// Camera shake for impactful cues (magnitude, seconds)
fn shake_for(kind: CueKind) -> Option<(f32, f32)> {
    match kind {
        CueKind::Bomb => Some((10.0, 0.4)),
        CueKind::Cut => Some((8.0, 0.5)),
        CueKind::BumperMega => Some((5.0, 0.25)),
        CueKind::Win => Some((6.0, 0.6)),
        _ => None,
    }
}

/// Race engine
pub struct Engine<P: PhysicsWorld = HeadlessWorld> {
    settings: RaceSettings,
    world: Option<P>,
    viewport: Option<Vec2>,
    race: Option<RaceContext>,
    camera: Option<Camera>,
    projector: SnapshotProjector,
    highlight: Option<String>,
    sink: Option<Box<dyn CueSink>>,
    accumulator: f32,
    /// Wall seconds since the round started
    real_time: f32,
}

impl<P: PhysicsWorld> Engine<P> {
    pub fn new(settings: RaceSettings) -> Self {
        let projector = SnapshotProjector::new(settings.snapshot_interval_secs);
        Self {
            settings,
            world: None,
            viewport: None,
            race: None,
            camera: None,
            projector,
            highlight: None,
            sink: None,
            accumulator: 0.0,
            real_time: 0.0,
        }
    }

    /// Install the physics collaborator
    pub fn attach_world(&mut self, world: P) {
        self.world = Some(world);
    }

    /// Report the render surface size (marks the renderer ready)
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        let viewport = Vec2::new(width, height);
        self.viewport = Some(viewport);
        if let Some(camera) = self.camera.as_mut() {
            camera.set_viewport(viewport);
        }
    }

    pub fn set_cue_sink(&mut self, sink: Box<dyn CueSink>) {
        self.sink = Some(sink);
    }

    pub fn settings(&self) -> &RaceSettings {
        &self.settings
    }

    pub fn race(&self) -> Option<&RaceContext> {
        self.race.as_ref()
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn world(&self) -> Option<&P> {
        self.world.as_ref()
    }

    /// Start a new round. Rejected without touching any state if a
    /// collaborator is missing or the settings are invalid.
    pub fn start(
        &mut self,
        participants: &[Participant],
        highlight: Option<&str>,
        modifiers: ModifierConfig,
    ) -> Result<(), EngineError> {
        if self.world.is_none() {
            log::warn!("Start rejected: no physics world attached");
            return Err(EngineError::NotInitialized {
                collaborator: "physics",
            });
        }
        let Some(viewport) = self.viewport else {
            log::warn!("Start rejected: renderer has not reported a viewport");
            return Err(EngineError::NotInitialized {
                collaborator: "renderer",
            });
        };
        if participants.is_empty() {
            return Err(EngineError::NoParticipants);
        }
        let mut settings = self.settings.clone();
        settings.modifiers = modifiers;
        settings.validate()?;

        self.destroy();
        let Some(world) = self.world.as_mut() else {
            return Err(EngineError::NotInitialized {
                collaborator: "physics",
            });
        };

        let mut race = RaceContext::new(settings.clone(), participants, world);
        race.round.start();
        race.push_cue(CueKind::Start, None);
        log::info!(
            "Round started: {} participants, seed {:#x}",
            participants.len(),
            settings.seed
        );

        self.camera = Some(Camera::new(
            Vec2::new(race.course.width, race.course.height),
            viewport,
        ));
        self.settings = settings;
        self.race = Some(race);
        self.highlight = highlight.map(str::to_owned);
        self.projector.reset();
        self.accumulator = 0.0;
        self.real_time = 0.0;
        Ok(())
    }

    pub fn set_highlight(&mut self, name: Option<&str>) {
        self.highlight = name.map(str::to_owned);
    }

    pub fn pan_camera(&mut self, dx: f32, dy: f32) {
        if let Some(camera) = self.camera.as_mut() {
            camera.pan_by(Vec2::new(dx, dy), self.real_time);
        }
    }

    /// Focus on an agent by name. False if unknown or no longer racing.
    pub fn focus_camera(&mut self, name: &str) -> bool {
        let (Some(race), Some(camera)) = (self.race.as_ref(), self.camera.as_mut()) else {
            return false;
        };
        match race.agent_by_name(name) {
            Some(agent) if agent.is_alive() => {
                camera.focus_on(agent.id, self.real_time);
                true
            }
            _ => {
                log::debug!("Focus request for '{}' ignored", name);
                false
            }
        }
    }

    /// Peek at a world point; the previous view comes back afterwards
    pub fn jump_camera(&mut self, x: f32, y: f32) {
        if let Some(camera) = self.camera.as_mut() {
            camera.jump_to(Vec2::new(x, y), self.real_time);
        }
    }

    /// Tear down the current round and release every physical body
    pub fn destroy(&mut self) {
        if let Some(mut race) = self.race.take() {
            if let Some(world) = self.world.as_mut() {
                race.teardown(world);
            }
            race.round.stop();
            log::info!("Round torn down at {:.2}s", race.clock.sim_time);
        }
        self.camera = None;
        self.accumulator = 0.0;
    }

    /// Advance one display frame of `dt` wall seconds. Returns a snapshot
    /// when one is due.
    pub fn frame(&mut self, dt: f32) -> Option<RaceSnapshot> {
        let (Some(race), Some(world), Some(camera)) =
            (self.race.as_mut(), self.world.as_mut(), self.camera.as_mut())
        else {
            return None;
        };

        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        self.real_time += dt;
        race.clock.real_time = self.real_time;

        if race.round.is_running() {
            let scale = race.golden.time_scale(self.real_time, &race.settings)
                * race.round.time_scale(&race.settings);
            self.accumulator += dt * scale;
            let max_steps = (MAX_SUBSTEPS as f32 * scale.max(1.0)).ceil() as u32;

            let mut steps = 0;
            while self.accumulator >= SIM_DT && steps < max_steps {
                tick(race, world, SIM_DT);
                self.accumulator -= SIM_DT;
                steps += 1;
                if !race.round.is_running() {
                    self.accumulator = 0.0;
                    break;
                }
            }
            // Drop backlog the cap couldn't absorb
            self.accumulator = self.accumulator.min(SIM_DT);
        }

        let mut significant = false;
        for cue in race.cues.drain(..) {
            significant |= cue.is_significant();
            if let Some((magnitude, secs)) = shake_for(cue.kind) {
                camera.shake(magnitude, secs, self.real_time);
            }
            if let Some(sink) = self.sink.as_mut() {
                sink.play(cue);
            }
        }

        let focus = camera
            .focus()
            .and_then(|f| race.agents.get(f.agent_id as usize))
            .and_then(|a| a.body)
            .and_then(|b| world.position(b));
        let targets = CameraTargets {
            leader: pick_leader(&race.agents, &*world, camera.config.lag_tolerance),
            focus,
            hold: race.round.sequence().map(|_| race.course.finish_point),
        };
        camera.update(dt, self.real_time, &targets);

        let terminal = race.round.is_finished();
        if self.projector.should_emit(self.real_time, significant, terminal) {
            Some(project(race, camera, self.highlight.as_deref(), self.real_time))
        } else {
            None
        }
    }

    /// Drive frames of `frame_dt` until the round finishes or `max_wall_secs`
    /// pass. Returns the last snapshot produced.
    pub fn run_to_completion(&mut self, frame_dt: f32, max_wall_secs: f32) -> Option<RaceSnapshot> {
        let mut last = None;
        let mut elapsed = 0.0;
        while elapsed < max_wall_secs {
            if let Some(snapshot) = self.frame(frame_dt) {
                last = Some(snapshot);
            }
            elapsed += frame_dt;
            let finished = self.race.as_ref().is_none_or(|r| r.round.is_finished());
            if finished && self.projector.terminal_sent() {
                break;
            }
        }
        last
    }
}
