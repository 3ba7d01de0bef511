//! Range - headless shooting-range round.
//!
//! Plays one round against the null renderer with a simple aim-and-fire
//! driver, logging hits and the final result. Useful for tuning `config.ron`.

use anyhow::Result;
use audio::AudioOutput;
use engine_core::Vec3;
use game::{GameConfig, NullRenderer, Session, SessionEvent, SessionState};
use input::{ElementState, MouseButton};

const FRAME: f32 = 1.0 / 60.0;
/// Frames between trigger pulls of the driver.
const FIRE_EVERY: u64 = 20;
/// Hard stop in case the round never ends.
const MAX_FRAMES: u64 = 60 * 60 * 10;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GameConfig::load();
    let audio = AudioOutput::init(&config.audio_settings(), &config.sound_dir);
    let seed: u64 = rand::random();
    let mut session = Session::new(config, NullRenderer::new(), audio, seed)?;

    log::info!("Starting range round");

    // Let the player settle on the floor before the round starts.
    for _ in 0..60 {
        session.frame(FRAME);
    }
    session.start();

    let mut frame: u64 = 0;
    while session.state() != SessionState::GameOver && frame < MAX_FRAMES {
        aim_at_nearest(&mut session);
        if frame % FIRE_EVERY == 0 {
            session.handle_mouse_button(MouseButton::Left, ElementState::Pressed);
            session.handle_mouse_button(MouseButton::Left, ElementState::Released);
        }
        session.frame(FRAME);
        frame += 1;

        for event in session.drain_events() {
            match event {
                SessionEvent::TargetHit { kind, destroyed, score_delta, .. } => {
                    log::info!(
                        "Hit {} target{} ({:+})",
                        kind.name(),
                        if destroyed { ", destroyed" } else { "" },
                        score_delta
                    );
                }
                SessionEvent::ComboChanged { consecutive_hits, multiplier } if multiplier > 1.0 => {
                    log::info!("Combo x{:.1} ({} hits)", multiplier, consecutive_hits);
                }
                SessionEvent::PlayerDamaged { health, .. } => log::info!("Health {:.0}", health),
                _ => {}
            }
        }
        if frame % 600 == 0 {
            let hud = session.hud();
            log::info!(
                "{} | score {} | ammo {} | targets {}",
                hud.time_display(),
                hud.score,
                hud.ammo_display(),
                hud.active_targets
            );
        }
    }

    match session.final_result() {
        Some(result) => log::info!(
            "Round over ({:?}): score {}, best combo {}",
            result.reason,
            result.score,
            result.max_combo
        ),
        None => log::warn!("Round did not finish within {} frames", MAX_FRAMES),
    }
    Ok(())
}

/// Point the look targets at the closest non-penalty target.
fn aim_at_nearest<R: game::RenderSink, A: audio::AudioSink>(session: &mut Session<R, A>) {
    let eye = session.player.eye_position(&session.physics);
    let nearest = session
        .targets
        .ids()
        .into_iter()
        .filter_map(|id| {
            let target = session.targets.get(id)?;
            let transform = session.targets.transform(id)?;
            (!target.kind.is_penalty()).then_some(transform.position)
        })
        .min_by(|a, b| a.distance_squared(eye).total_cmp(&b.distance_squared(eye)));

    let Some(position) = nearest else {
        return;
    };
    let direction = (position - eye).normalize_or_zero();
    if direction == Vec3::ZERO {
        return;
    }
    let limit = session.movement.config().pitch_limit;
    session.movement.target_yaw = engine_core::wrap_angle(f32::atan2(-direction.x, -direction.z));
    session.movement.target_pitch = direction.y.clamp(-1.0, 1.0).asin().clamp(-limit, limit);
}
