//! Input handling for keyboard, mouse and touch.
//!
//! Raw device events accumulate into [`InputState`]; once per frame the
//! simulation calls [`InputState::take_frame`], which hands back a
//! [`FrameInput`] snapshot and zeroes the look accumulators and edge sets so
//! nothing is applied twice.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Dead zone of the on-screen joystick, as a fraction of its radius.
pub const DEFAULT_JOYSTICK_DEAD_ZONE: f32 = 0.1;

/// Rebindable keys. Stored in the game config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_forward")]
    pub forward: KeyCode,
    #[serde(default = "default_backward")]
    pub backward: KeyCode,
    #[serde(default = "default_left")]
    pub left: KeyCode,
    #[serde(default = "default_right")]
    pub right: KeyCode,
    #[serde(default = "default_jump")]
    pub jump: KeyCode,
    #[serde(default = "default_reload")]
    pub reload: KeyCode,
    #[serde(default = "default_pause")]
    pub pause: KeyCode,
}

fn default_forward() -> KeyCode {
    KeyCode::KeyW
}
fn default_backward() -> KeyCode {
    KeyCode::KeyS
}
fn default_left() -> KeyCode {
    KeyCode::KeyA
}
fn default_right() -> KeyCode {
    KeyCode::KeyD
}
fn default_jump() -> KeyCode {
    KeyCode::Space
}
fn default_reload() -> KeyCode {
    KeyCode::KeyR
}
fn default_pause() -> KeyCode {
    KeyCode::Escape
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: default_forward(),
            backward: default_backward(),
            left: default_left(),
            right: default_right(),
            jump: default_jump(),
            reload: default_reload(),
            pause: default_pause(),
        }
    }
}

/// On-screen action buttons of the touch layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchButton {
    Fire,
    Jump,
    Reload,
}

/// Everything the simulation reads from input in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInput {
    /// x = strafe right, y = forward. Length never exceeds 1.
    pub movement: Vec2,
    /// Pointer movement in pixels since the last frame (locked cursor only).
    pub pointer_delta: Vec2,
    /// Touch-drag movement in pixels on the look area since the last frame.
    pub touch_delta: Vec2,
    pub fire: bool,
    pub reload: bool,
    pub jump: bool,
    pub pause: bool,
}

/// Manages input state between frames.
#[derive(Debug)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed since the last frame.
    keys_pressed: HashSet<KeyCode>,
    /// Keys released since the last frame.
    keys_released: HashSet<KeyCode>,

    /// Mouse buttons currently held.
    mouse_held: HashSet<MouseButton>,
    /// Mouse buttons pressed since the last frame.
    mouse_pressed: HashSet<MouseButton>,

    /// Touch buttons tapped since the last frame.
    touch_pressed: HashSet<TouchButton>,

    /// Mouse position in window coordinates.
    mouse_position: Vec2,
    /// Accumulated pointer delta while the cursor is locked.
    pointer_accum: Vec2,
    /// Accumulated touch-look delta.
    touch_accum: Vec2,

    /// Normalized joystick deflection while a thumb is on it.
    joystick: Option<Vec2>,
    joystick_dead_zone: f32,

    /// Whether the cursor is captured/locked.
    cursor_locked: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::with_dead_zone(DEFAULT_JOYSTICK_DEAD_ZONE)
    }

    pub fn with_dead_zone(dead_zone: f32) -> Self {
        Self {
            keys_held: HashSet::new(),
            keys_pressed: HashSet::new(),
            keys_released: HashSet::new(),
            mouse_held: HashSet::new(),
            mouse_pressed: HashSet::new(),
            touch_pressed: HashSet::new(),
            mouse_position: Vec2::ZERO,
            pointer_accum: Vec2::ZERO,
            touch_accum: Vec2::ZERO,
            joystick: None,
            joystick_dead_zone: dead_zone.clamp(0.0, 0.95),
            cursor_locked: false,
        }
    }

    /// Process a keyboard event.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key);
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
                self.keys_released.insert(key);
            }
        }
    }

    /// Process a mouse button event.
    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.mouse_held.contains(&button) {
                    self.mouse_pressed.insert(button);
                }
                self.mouse_held.insert(button);
            }
            ElementState::Released => {
                self.mouse_held.remove(&button);
            }
        }
    }

    /// Process raw mouse movement. Ignored unless the cursor is locked.
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        if !self.cursor_locked {
            return;
        }
        self.pointer_accum.x += delta.0 as f32;
        self.pointer_accum.y += delta.1 as f32;
    }

    /// Process cursor position update.
    pub fn process_cursor_position(&mut self, position: (f64, f64)) {
        self.mouse_position = Vec2::new(position.0 as f32, position.1 as f32);
    }

    /// Drag on the touch look area.
    pub fn process_touch_look(&mut self, delta: Vec2) {
        self.touch_accum += delta;
    }

    /// Thumb on the virtual joystick at `offset` pixels from its centre
    /// (screen coordinates, +y down). Each axis is clamped to the radius,
    /// screen-down becomes backward, and deflections inside the dead zone read as zero.
    pub fn set_joystick(&mut self, offset: Vec2, radius: f32) {
        if !(radius > 0.0) {
            self.joystick = Some(Vec2::ZERO);
            return;
        }
        let mut v = (offset / radius).clamp(Vec2::splat(-1.0), Vec2::splat(1.0));
        v.y = -v.y;
        if v.length() < self.joystick_dead_zone {
            v = Vec2::ZERO;
        }
        self.joystick = Some(v);
    }

    pub fn release_joystick(&mut self) {
        self.joystick = None;
    }

    pub fn press_touch_button(&mut self, button: TouchButton) {
        self.touch_pressed.insert(button);
    }

    // Query methods

    /// Check if a key is currently held.
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Check if a key was pressed since the last frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a key was released since the last frame.
    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Check if a mouse button is held.
    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Get the mouse position in window coordinates.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Check if the cursor is locked.
    pub fn is_cursor_locked(&self) -> bool {
        self.cursor_locked
    }

    /// Set cursor lock state. Unlocking discards pending pointer motion.
    pub fn set_cursor_locked(&mut self, locked: bool) {
        self.cursor_locked = locked;
        if !locked {
            self.pointer_accum = Vec2::ZERO;
        }
    }

    /// Movement intent: the joystick while a thumb is on it, otherwise the
    /// bound keys. x = strafe, y = forward, length at most 1.
    pub fn movement_intent(&self, bindings: &KeyBindings) -> Vec2 {
        if let Some(stick) = self.joystick {
            return stick.clamp_length_max(1.0);
        }

        let mut movement = Vec2::ZERO;
        if self.is_key_held(bindings.forward) {
            movement.y += 1.0;
        }
        if self.is_key_held(bindings.backward) {
            movement.y -= 1.0;
        }
        if self.is_key_held(bindings.left) {
            movement.x -= 1.0;
        }
        if self.is_key_held(bindings.right) {
            movement.x += 1.0;
        }

        movement.normalize_or_zero()
    }

    /// Snapshot this frame's input and clear everything that must only be
    /// seen once: look accumulators and press edges. Held keys persist.
    pub fn take_frame(&mut self, bindings: &KeyBindings) -> FrameInput {
        let frame = FrameInput {
            movement: self.movement_intent(bindings),
            pointer_delta: std::mem::take(&mut self.pointer_accum),
            touch_delta: std::mem::take(&mut self.touch_accum),
            fire: (self.cursor_locked && self.mouse_pressed.contains(&MouseButton::Left))
                || self.touch_pressed.contains(&TouchButton::Fire),
            reload: self.is_key_pressed(bindings.reload)
                || self.touch_pressed.contains(&TouchButton::Reload),
            jump: self.is_key_pressed(bindings.jump)
                || self.touch_pressed.contains(&TouchButton::Jump),
            pause: self.is_key_pressed(bindings.pause),
        };
        self.clear_edges();
        frame
    }

    /// Throw away this frame's look deltas and press edges unread, e.g. the
    /// click that started a round. Held keys persist.
    pub fn clear_frame(&mut self) {
        self.pointer_accum = Vec2::ZERO;
        self.touch_accum = Vec2::ZERO;
        self.clear_edges();
    }

    fn clear_edges(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.mouse_pressed.clear();
        self.touch_pressed.clear();
    }

    /// Drop every held key, button and pending delta (focus lost, session reset).
    pub fn clear(&mut self) {
        self.keys_held.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.mouse_held.clear();
        self.mouse_pressed.clear();
        self.touch_pressed.clear();
        self.pointer_accum = Vec2::ZERO;
        self.touch_accum = Vec2::ZERO;
        self.joystick = None;
    }
}

// Re-export for convenience
pub use winit::event::{ElementState, MouseButton};
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_keys_are_normalized() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        input.process_keyboard(KeyCode::KeyD, ElementState::Pressed);
        let intent = input.movement_intent(&KeyBindings::default());
        assert!((intent.length() - 1.0).abs() < 1e-5);
        assert!(intent.x > 0.0 && intent.y > 0.0);
    }

    #[test]
    fn rebound_keys_drive_movement() {
        let bindings = KeyBindings {
            forward: KeyCode::ArrowUp,
            ..KeyBindings::default()
        };
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert_eq!(input.movement_intent(&bindings), Vec2::ZERO);
        input.process_keyboard(KeyCode::ArrowUp, ElementState::Pressed);
        assert_eq!(input.movement_intent(&bindings), Vec2::Y);
    }

    #[test]
    fn cleared_frame_drops_edges_but_keeps_held_keys() {
        let bindings = KeyBindings::default();
        let mut input = InputState::new();
        input.set_cursor_locked(true);
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.process_mouse_motion((6.0, 1.0));

        input.clear_frame();
        let frame = input.take_frame(&bindings);
        assert!(!frame.fire);
        assert!(!frame.jump);
        assert_eq!(frame.pointer_delta, Vec2::ZERO);
        assert_eq!(frame.movement, Vec2::Y);
    }

    #[test]
    fn look_delta_is_consumed_once() {
        let bindings = KeyBindings::default();
        let mut input = InputState::new();
        input.set_cursor_locked(true);
        input.process_mouse_motion((4.0, -2.0));
        input.process_mouse_motion((1.0, 0.0));
        input.process_touch_look(Vec2::new(3.0, 3.0));

        let first = input.take_frame(&bindings);
        assert_eq!(first.pointer_delta, Vec2::new(5.0, -2.0));
        assert_eq!(first.touch_delta, Vec2::new(3.0, 3.0));

        let second = input.take_frame(&bindings);
        assert_eq!(second.pointer_delta, Vec2::ZERO);
        assert_eq!(second.touch_delta, Vec2::ZERO);
    }

    #[test]
    fn pointer_motion_needs_locked_cursor() {
        let mut input = InputState::new();
        input.process_mouse_motion((10.0, 10.0));
        assert_eq!(input.take_frame(&KeyBindings::default()).pointer_delta, Vec2::ZERO);
    }

    #[test]
    fn press_edges_last_one_frame() {
        let bindings = KeyBindings::default();
        let mut input = InputState::new();
        input.set_cursor_locked(true);
        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.process_keyboard(KeyCode::KeyR, ElementState::Pressed);
        let frame = input.take_frame(&bindings);
        assert!(frame.fire && frame.reload);

        // Still held, but no new edge.
        let frame = input.take_frame(&bindings);
        assert!(!frame.fire && !frame.reload);
    }

    #[test]
    fn joystick_inverts_y_and_applies_dead_zone() {
        let mut input = InputState::with_dead_zone(0.2);
        input.set_joystick(Vec2::new(0.0, -60.0), 50.0);
        assert_eq!(input.movement_intent(&KeyBindings::default()), Vec2::Y);

        input.set_joystick(Vec2::new(5.0, 5.0), 50.0);
        assert_eq!(input.movement_intent(&KeyBindings::default()), Vec2::ZERO);

        input.set_joystick(Vec2::new(50.0, -50.0), 50.0);
        assert!(input.movement_intent(&KeyBindings::default()).length() <= 1.0);

        input.release_joystick();
        assert_eq!(input.movement_intent(&KeyBindings::default()), Vec2::ZERO);
    }

    #[test]
    fn touch_buttons_map_to_actions() {
        let mut input = InputState::new();
        input.press_touch_button(TouchButton::Fire);
        input.press_touch_button(TouchButton::Jump);
        let frame = input.take_frame(&KeyBindings::default());
        assert!(frame.fire && frame.jump && !frame.reload);
    }
}
