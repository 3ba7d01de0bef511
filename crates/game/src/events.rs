//! Device events and the session commands the UI issues (start, pause, settings, reset).

use audio::AudioSink;
use engine_core::Vec2;
use input::{ElementState, KeyCode, MouseButton, TouchButton};

use crate::collab::{FrameContext, RenderSink};
use crate::hud::SessionEvent;
use crate::player::MovementMode;
use crate::session::Session;
use crate::state::SessionState;

impl<R: RenderSink, A: AudioSink> Session<R, A> {
    // ── Device events ──────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        self.input.process_keyboard(key, state);
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        self.input.process_mouse_button(button, state);
    }

    /// Raw pointer motion, only counted while the cursor is locked.
    pub fn handle_mouse_motion(&mut self, delta: (f64, f64)) {
        self.input.process_mouse_motion(delta);
    }

    pub fn handle_cursor_moved(&mut self, position: (f64, f64)) {
        self.input.process_cursor_position(position);
    }

    pub fn handle_touch_look(&mut self, delta: Vec2) {
        self.input.process_touch_look(delta);
    }

    pub fn handle_joystick(&mut self, offset: Option<Vec2>, radius: f32) {
        match offset {
            Some(offset) => self.input.set_joystick(offset, radius),
            None => self.input.release_joystick(),
        }
    }

    pub fn handle_touch_button(&mut self, button: TouchButton) {
        self.input.press_touch_button(button);
    }

    /// The platform took the pointer away (alt-tab, browser escape). Pauses play.
    pub fn handle_pointer_lock(&mut self, locked: bool) {
        self.input.set_cursor_locked(locked);
        if !locked && self.flow.is_playing() {
            self.pause();
        }
    }

    pub fn handle_focus_lost(&mut self) {
        self.input.clear();
        if self.flow.is_playing() {
            self.pause();
        }
    }

    // ── Commands ───────────────────────────────────────────────────────────

    fn changed(&mut self, from: SessionState, to: SessionState) {
        self.events.push(SessionEvent::StateChanged { from, to });
    }

    /// Title screen → play. The first frame of play spawns a target.
    pub fn start(&mut self) -> bool {
        let from = self.flow.state();
        let Some(to) = self.flow.start() else {
            return false;
        };
        self.targets.prime_for_start();
        self.time_left = self.config.session.duration;
        self.movement.mode = MovementMode::Active;
        // Whatever was clicked to start must not also fire.
        self.input.set_cursor_locked(true);
        self.input.clear_frame();

        self.audio.set_music_ducked(false);
        self.audio.play_music();
        self.changed(from, to);
        log::info!("Round started ({}s)", self.config.session.duration);
        true
    }

    pub fn pause(&mut self) -> bool {
        let from = self.flow.state();
        let Some(to) = self.flow.pause() else {
            return false;
        };
        self.movement.mode = MovementMode::Suppressed;
        self.input.set_cursor_locked(false);
        self.audio.set_music_ducked(true);
        self.changed(from, to);
        true
    }

    pub fn resume(&mut self) -> bool {
        let from = self.flow.state();
        let Some(to) = self.flow.resume() else {
            return false;
        };
        self.movement.mode = MovementMode::Active;
        self.input.set_cursor_locked(true);
        self.audio.set_music_ducked(false);
        self.changed(from, to);
        true
    }

    pub fn open_settings(&mut self) -> bool {
        let from = self.flow.state();
        let Some(to) = self.flow.open_settings() else {
            return false;
        };
        self.movement.mode = MovementMode::Suppressed;
        self.input.set_cursor_locked(false);
        self.audio.set_music_ducked(true);
        self.changed(from, to);
        true
    }

    /// Leave settings, applying any mix and sensitivity changes made there.
    pub fn close_settings(&mut self) -> bool {
        let from = self.flow.state();
        let Some(to) = self.flow.close_settings() else {
            return false;
        };
        self.apply_settings();
        let playing = to == SessionState::Playing;
        self.movement.mode = if playing { MovementMode::Active } else { MovementMode::Suppressed };
        self.input.set_cursor_locked(playing);
        self.audio.set_music_ducked(!playing);
        self.changed(from, to);
        true
    }

    /// Push the current config's mix and look settings to their consumers.
    pub fn apply_settings(&mut self) {
        self.audio.set_music_volume(self.config.music_volume);
        self.audio.set_sfx_volume(self.config.sfx_volume);
        self.audio.set_reverb(self.config.spatial_reverb, self.config.reverb_quality);
        self.movement.sensitivity = self.config.sensitivity;
        self.movement.touch_sensitivity = self.config.touch_sensitivity.clamp(0.1, 3.0);
    }

    /// Back to the title screen with a fresh round: player, weapon, score,
    /// timer, look state and targets all start over.
    pub fn reset(&mut self) {
        let from = self.flow.state();
        self.audio.stop_all();

        let mut ctx = FrameContext {
            physics: &mut self.physics,
            renderer: &mut self.renderer,
            audio: &mut self.audio,
            visuals: &mut self.visuals,
        };
        self.targets.reset(&mut ctx);

        self.player.reset(&mut self.physics, &self.config.movement);
        self.movement.reset();
        self.movement.mode = MovementMode::Suppressed;
        self.weapon.reset();
        self.score.reset();
        self.time_left = self.config.session.duration;
        self.input.clear();
        self.input.set_cursor_locked(false);
        self.physics.reset_clock();
        self.final_result = None;

        let to = self.flow.reset();
        self.changed(from, to);
        log::info!("Session reset");
    }
}

#[cfg(test)]
mod tests {
    use crate::collab::{NullRenderer, RecordingAudio};
    use crate::config::GameConfig;
    use crate::session::Session;
    use crate::state::SessionState;

    fn session() -> Session<NullRenderer, RecordingAudio> {
        Session::new(GameConfig::default(), NullRenderer::new(), RecordingAudio::new(), 5).unwrap()
    }

    #[test]
    fn start_plays_music_and_locks_cursor() {
        let mut s = session();
        assert!(s.start());
        assert!(s.audio.music_playing);
        assert!(s.input.is_cursor_locked());
        assert!(!s.start());
    }

    #[test]
    fn starting_click_does_not_fire() {
        let mut s = session();
        s.handle_pointer_lock(true);
        s.handle_mouse_button(input::MouseButton::Left, input::ElementState::Pressed);
        s.start();
        s.frame(1.0 / 60.0);
        assert_eq!(s.weapon.ammo, 15);
        assert_eq!(s.audio.count(audio::SoundId::Shoot), 0);
    }

    #[test]
    fn pause_ducks_music_until_resume() {
        let mut s = session();
        s.start();
        assert!(s.pause());
        assert!(s.audio.ducked);
        assert!(s.open_settings());
        assert_eq!(s.state(), SessionState::Settings);
        assert!(s.close_settings());
        assert_eq!(s.state(), SessionState::Paused);
        assert!(s.resume());
        assert!(!s.audio.ducked);
    }

    #[test]
    fn losing_the_pointer_pauses_play() {
        let mut s = session();
        s.start();
        s.handle_pointer_lock(false);
        assert_eq!(s.state(), SessionState::Paused);
    }

    #[test]
    fn reset_returns_to_title_and_stops_audio() {
        let mut s = session();
        s.start();
        s.weapon.ammo = 2;
        s.score.score = 40;
        s.reset();
        assert_eq!(s.state(), SessionState::Start);
        assert_eq!(s.weapon.ammo, 15);
        assert_eq!(s.score.score, 0);
        assert_eq!(s.audio.stop_all_calls, 1);
        assert!(!s.audio.music_playing);
    }
}
