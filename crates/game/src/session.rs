//! The session context: owns physics, input, targets, scoring and the two
//! output collaborators for one round of play.

use audio::AudioSink;
use engine_core::{Time, Vec3};
use input::InputState;
use physics::PhysicsWorld;
use rand::prelude::*;

use crate::arena::Arena;
use crate::collab::{FrameContext, RenderSink, VisualIds};
use crate::config::GameConfig;
use crate::error::SessionError;
use crate::hud::{FinalResult, HudSnapshot, SessionEvent};
use crate::player::{MovementController, Player};
use crate::scoring::ScoreBoard;
use crate::spawner::TargetManager;
use crate::state::{GameOverReason, SessionState, StateMachine};
use crate::target::{TargetId, TargetKind};
use crate::weapons::{ShotReport, Weapon};

/// One shooting-range round and everything it needs.
pub struct Session<R: RenderSink, A: AudioSink> {
    pub config: GameConfig,
    pub physics: PhysicsWorld,
    pub input: InputState,
    pub renderer: R,
    pub audio: A,
    pub visuals: VisualIds,
    pub arena: Arena,
    pub player: Player,
    pub movement: MovementController,
    pub weapon: Weapon,
    pub targets: TargetManager,
    pub score: ScoreBoard,
    pub flow: StateMachine,
    /// Seconds left in the round.
    pub time_left: f32,
    pub clock: Time,
    pub(crate) events: Vec<SessionEvent>,
    pub(crate) final_result: Option<FinalResult>,
}

impl<R: RenderSink, A: AudioSink> Session<R, A> {
    /// Build the arena and player and wait on the title screen. Fails when the
    /// config is unusable or the renderer cannot initialise.
    pub fn new(config: GameConfig, mut renderer: R, mut audio: A, seed: u64) -> Result<Self, SessionError> {
        config.validate()?;
        renderer.init().map_err(SessionError::RendererUnavailable)?;

        let mut physics = PhysicsWorld::with_gravity(config.physics.gravity);
        let mut visuals = VisualIds::new();
        let mut rng = StdRng::seed_from_u64(seed);

        let arena = {
            let mut ctx = FrameContext {
                physics: &mut physics,
                renderer: &mut renderer,
                audio: &mut audio,
                visuals: &mut visuals,
            };
            Arena::build(&config.arena, &mut rng, &mut ctx)
        };
        let player = Player::spawn(&mut physics, &config.movement, config.session.max_health);
        let movement = MovementController::new(&config.movement, config.sensitivity, config.touch_sensitivity);
        let targets = TargetManager::new(
            &config.targets,
            config.scoring.partial_hit_fraction,
            StdRng::seed_from_u64(rng.gen()),
        );

        audio.set_music_volume(config.music_volume);
        audio.set_sfx_volume(config.sfx_volume);
        audio.set_reverb(config.spatial_reverb, config.reverb_quality);

        log::info!("Session ready (seed {})", seed);
        Ok(Self {
            physics,
            input: InputState::with_dead_zone(config.movement.joystick_dead_zone),
            renderer,
            audio,
            visuals,
            arena,
            player,
            movement,
            weapon: Weapon::new(&config.weapon),
            targets,
            score: ScoreBoard::new(&config.scoring),
            flow: StateMachine::new(),
            time_left: config.session.duration,
            clock: Time::with_max_delta(config.physics.max_frame_delta),
            events: Vec::new(),
            final_result: None,
            config,
        })
    }

    pub fn state(&self) -> SessionState {
        self.flow.state()
    }

    pub fn final_result(&self) -> Option<FinalResult> {
        self.final_result
    }

    /// Events since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn hud(&self) -> HudSnapshot {
        HudSnapshot {
            state: self.flow.state(),
            score: self.score.score,
            ammo: self.weapon.ammo,
            max_ammo: self.weapon.max_ammo,
            reserve_ammo: self.weapon.reserve_ammo,
            reloading: self.weapon.is_reloading,
            reload_progress: self.weapon.reload_progress(),
            health: self.player.health.current,
            max_health: self.player.health.max,
            time_left: self.time_left.max(0.0),
            combo_multiplier: self.score.combo_multiplier(),
            consecutive_hits: self.score.consecutive_hits,
            max_consecutive_hits: self.score.max_consecutive_hits,
            active_targets: self.targets.active_count(),
            final_result: self.final_result,
        }
    }

    /// Put a specific target up, bypassing the spawn timer.
    pub fn spawn_target(&mut self, kind: TargetKind, position: Vec3) -> TargetId {
        let mut ctx = FrameContext {
            physics: &mut self.physics,
            renderer: &mut self.renderer,
            audio: &mut self.audio,
            visuals: &mut self.visuals,
        };
        self.targets.spawn(kind, position, engine_core::Quat::IDENTITY, &mut ctx)
    }

    /// Hurt the player. Ignored once the round is over.
    pub fn damage_player(&mut self, amount: f32) {
        if !self.flow.is_playing() {
            return;
        }
        let emptied = self.player.damage(amount);
        self.events.push(SessionEvent::PlayerDamaged { amount, health: self.player.health.current });
        if emptied {
            self.end_round(GameOverReason::Eliminated);
        }
    }

    /// Enter GameOver and publish the result. Later calls do nothing.
    pub(crate) fn end_round(&mut self, reason: GameOverReason) {
        let from = self.flow.state();
        if self.flow.game_over(reason).is_none() {
            return;
        }
        let result = FinalResult {
            score: self.score.score,
            max_combo: self.score.max_consecutive_hits,
            reason,
        };
        self.final_result = Some(result);
        self.movement.mode = crate::player::MovementMode::Suppressed;
        self.input.set_cursor_locked(false);
        self.audio.stop_music();
        self.events.push(SessionEvent::StateChanged { from, to: SessionState::GameOver });
        self.events.push(SessionEvent::GameOver(result));
        log::info!(
            "Game over ({:?}): score {}, best combo {}",
            reason,
            result.score,
            result.max_combo
        );
    }

    /// Turn a shot's target hits into score, combo and player damage, in ray order.
    pub(crate) fn apply_shot(&mut self, report: &ShotReport) {
        if report.reload_started {
            self.events.push(SessionEvent::ReloadStarted);
        }
        for hit in &report.hits {
            let before = self.score.consecutive_hits;
            let event = self.score.register_hit(hit.outcome.points, hit.outcome.destroyed);
            self.events.push(SessionEvent::TargetHit {
                id: hit.outcome.id,
                kind: hit.outcome.kind,
                destroyed: hit.outcome.destroyed,
                score_delta: event.delta,
                point: hit.point,
            });
            if event.consecutive_hits != before {
                self.events.push(SessionEvent::ComboChanged {
                    consecutive_hits: event.consecutive_hits,
                    multiplier: event.multiplier,
                });
            }
            if event.player_damage > 0.0 {
                self.damage_player(event.player_damage);
            }
        }
        if report.missed {
            let combo_broken = self.score.register_miss();
            self.events.push(SessionEvent::Missed { combo_broken });
        }
    }
}
