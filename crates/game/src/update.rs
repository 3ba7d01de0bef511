//! The per-frame pipeline: input, movement, physics, shooting, targets, sync, render.

use audio::{AudioSink, SoundId};
use engine_core::Vec3;
use input::FrameInput;

use crate::collab::{FrameContext, RenderSink};
use crate::hud::SessionEvent;
use crate::player::MovementMode;
use crate::session::Session;
use crate::spawner::TargetEvent;
use crate::state::{GameOverReason, SessionState};

/// Volume of the jump sound.
const JUMP_VOLUME: f32 = 0.5;

impl<R: RenderSink, A: AudioSink> Session<R, A> {
    /// Advance one display frame by the wall clock.
    pub fn tick(&mut self) {
        let dt = self.clock.tick();
        self.run_frame(dt);
    }

    /// Advance one display frame of `raw_dt` seconds. Long stalls are clamped.
    pub fn frame(&mut self, raw_dt: f32) {
        let dt = self.clock.advance(raw_dt);
        self.run_frame(dt);
    }

    fn run_frame(&mut self, dt: f32) {
        // 1. Input: look deltas and edges are seen by this frame only.
        let frame = self.input.take_frame(&self.config.bindings);
        if frame.pause {
            match self.flow.state() {
                SessionState::Playing => {
                    self.pause();
                }
                SessionState::Paused => {
                    self.resume();
                }
                SessionState::Settings => {
                    self.close_settings();
                }
                SessionState::Start | SessionState::GameOver => {}
            }
        }

        // 2. Orientation and movement, against the pre-step body state.
        let playing = self.flow.is_playing();
        let drive = if playing {
            self.movement.mode = MovementMode::Active;
            self.movement.apply_look(&frame);
            frame
        } else {
            self.movement.mode = MovementMode::Suppressed;
            FrameInput::default()
        };
        if self.flow.physics_runs() {
            self.movement.update_grounded(&mut self.player, &self.physics);
            let outcome = self.movement.update(&mut self.player, &mut self.physics, &drive);
            if outcome.jumped {
                self.audio.play(SoundId::Jump, None, JUMP_VOLUME);
            }

            // 3. Fixed-step physics.
            let c = &self.config.physics;
            let report = self.physics.step(c.fixed_timestep, dt, c.max_substeps);
            if report.faulted {
                log::warn!("Frame continued after a physics fault ({} substeps ran)", report.substeps);
            }
        }

        // 4. Viewpoint, then the weapon reads it.
        let viewpoint = self.movement.viewpoint(&self.player, &self.physics);
        self.renderer.set_viewpoint(viewpoint);

        if playing {
            self.weapons_stage(&frame, dt);
            self.time_left -= dt;
            if self.time_left <= 0.0 {
                self.time_left = 0.0;
                self.end_round(GameOverReason::TimeUp);
            }
        }

        let mut ctx = FrameContext {
            physics: &mut self.physics,
            renderer: &mut self.renderer,
            audio: &mut self.audio,
            visuals: &mut self.visuals,
        };

        // 5. Target bookkeeping.
        if self.flow.is_playing() {
            self.targets.tick(dt, &mut ctx);
        }
        for event in self.targets.drain_events() {
            match event {
                TargetEvent::Spawned { id, kind } => self.events.push(SessionEvent::TargetSpawned { id, kind }),
                TargetEvent::Despawned { id, kind } => self.events.push(SessionEvent::TargetLost { id, kind }),
                // Already reported as a hit.
                TargetEvent::Destroyed { .. } => {}
            }
        }

        // 6. Visual sync and the listener.
        self.targets.sync_visuals(&mut ctx);
        let view = ctx.renderer.viewpoint();
        ctx.audio.update_listener(view.position, view.forward(), Vec3::Y);
        ctx.audio.cleanup();

        // 7. Render.
        ctx.renderer.render(dt);
    }

    fn weapons_stage(&mut self, frame: &FrameInput, dt: f32) {
        if self.weapon.update(dt) {
            self.events.push(SessionEvent::ReloadFinished);
        }

        let mut ctx = FrameContext {
            physics: &mut self.physics,
            renderer: &mut self.renderer,
            audio: &mut self.audio,
            visuals: &mut self.visuals,
        };
        if frame.reload && self.weapon.reload(&mut ctx) {
            self.events.push(SessionEvent::ReloadStarted);
        }
        if frame.fire {
            let viewpoint = ctx.renderer.viewpoint();
            let report = self.weapon.trigger_shoot(&viewpoint, self.player.body, &mut self.targets, &mut ctx);
            self.apply_shot(&report);
        }
    }
}
