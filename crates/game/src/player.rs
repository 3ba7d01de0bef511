//! Player body and the force-driven movement/orientation controller.
//!
//! Yaw lives on the rigid body: the controller steers the body toward a target
//! heading and reads the heading back from it. Pitch never touches physics and
//! only tilts the viewpoint.

use engine_core::{wrap_angle, yaw_of, Health, Quat, Transform, Vec2, Vec3};
use input::FrameInput;
use physics::{BodyDesc, BodyShape, BodyTag, CollisionGroup, MaterialTag, PhysicsWorld, RigidBodyHandle};

use crate::config::MovementConfig;

/// Physical state of the player.
#[derive(Debug, Clone)]
pub struct Player {
    pub body: RigidBodyHandle,
    pub half_extents: Vec3,
    /// Eye height above the feet.
    pub eye_height: f32,
    pub grounded: bool,
    /// Simulation time of the last ground ray hit.
    pub last_ground_contact: Option<f64>,
    pub health: Health,
}

impl Player {
    /// Create the player body at `config.initial_position`.
    pub fn spawn(physics: &mut PhysicsWorld, config: &MovementConfig, max_health: f32) -> Self {
        let body = physics.add_body(
            &BodyDesc::dynamic(
                BodyShape::Cuboid { half_extents: config.half_extents },
                config.initial_position,
                config.mass,
            )
            .with_material(MaterialTag::Player)
            .with_group(CollisionGroup::Player)
            .with_tag(BodyTag::Player, None)
            .with_damping(config.linear_damping, config.angular_damping)
            .with_sleep(false)
            .upright(),
        );
        log::debug!("Player body spawned at {:?}", config.initial_position);
        Self {
            body,
            half_extents: config.half_extents,
            eye_height: config.eye_height,
            grounded: false,
            last_ground_contact: None,
            health: Health::new(max_health),
        }
    }

    /// Back to the spawn point, facing -Z, full health.
    pub fn reset(&mut self, physics: &mut PhysicsWorld, config: &MovementConfig) {
        physics.teleport(self.body, config.spawn_position, Quat::IDENTITY);
        self.grounded = false;
        self.last_ground_contact = None;
        self.health.restore();
    }

    pub fn position(&self, physics: &PhysicsWorld) -> Vec3 {
        physics
            .body_transform(self.body)
            .map(|t| t.position)
            .unwrap_or(Vec3::ZERO)
    }

    /// World position of the eye.
    pub fn eye_position(&self, physics: &PhysicsWorld) -> Vec3 {
        self.position(physics) + Vec3::Y * (self.eye_height - self.half_extents.y)
    }

    /// Subtract health. Returns true only on the hit that empties it.
    pub fn damage(&mut self, amount: f32) -> bool {
        self.health.take_damage(amount)
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }
}

/// Whether the controller reads input this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementMode {
    Active,
    /// Outside of play: input ignored, horizontal motion bled off.
    Suppressed,
}

/// What happened during one controller update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementOutcome {
    pub jumped: bool,
    /// Force applied for this frame's physics step.
    pub force: Vec3,
}

/// Turns input into forces and a heading on the player's body.
#[derive(Debug, Clone)]
pub struct MovementController {
    pub mode: MovementMode,
    /// Heading the body is steered toward, in [0, 2π).
    pub target_yaw: f32,
    /// Visual-only look angle, clamped to ±pitch_limit.
    pub target_pitch: f32,
    pub sensitivity: f32,
    pub touch_sensitivity: f32,
    config: MovementConfig,
}

impl MovementController {
    pub fn new(config: &MovementConfig, sensitivity: f32, touch_sensitivity: f32) -> Self {
        Self {
            mode: MovementMode::Suppressed,
            target_yaw: 0.0,
            target_pitch: 0.0,
            sensitivity,
            touch_sensitivity: touch_sensitivity.clamp(0.1, 3.0),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Forget look targets (session reset).
    pub fn reset(&mut self) {
        self.target_yaw = 0.0;
        self.target_pitch = 0.0;
    }

    /// Fold this frame's pointer and touch deltas into the look targets.
    /// Dragging right turns right, dragging down looks down.
    pub fn apply_look(&mut self, frame: &FrameInput) {
        let pointer = frame.pointer_delta * self.sensitivity;
        let touch = frame.touch_delta
            * self.sensitivity
            * self.touch_sensitivity
            * self.config.mobile_look_multiplier;
        let delta: Vec2 = pointer + touch;
        if delta == Vec2::ZERO {
            return;
        }
        self.target_yaw = wrap_angle(self.target_yaw - delta.x);
        let limit = self.config.pitch_limit;
        self.target_pitch = (self.target_pitch - delta.y).clamp(-limit, limit);
    }

    /// Refresh the grounded flag from a short ray under the body. A lost
    /// contact keeps counting for `ground_grace` seconds of simulation time.
    pub fn update_grounded(&self, player: &mut Player, physics: &PhysicsWorld) {
        let now = physics.time();
        // Falling or rising fast means the ray is just grazing something.
        let vertical = physics.linvel(player.body).y;
        if vertical.abs() < 1.0
            && physics
                .cast_ground(player.body, player.half_extents.y, self.config.ground_ray_margin)
                .is_some()
        {
            player.last_ground_contact = Some(now);
        }
        player.grounded = player
            .last_ground_contact
            .map(|t| now - t <= self.config.ground_grace as f64)
            .unwrap_or(false);
    }

    /// Drive the body for the coming physics step. Must run before the step:
    /// directions come from the body's current rotation.
    pub fn update(
        &mut self,
        player: &mut Player,
        physics: &mut PhysicsWorld,
        frame: &FrameInput,
    ) -> MovementOutcome {
        match self.mode {
            MovementMode::Suppressed => {
                self.suppress(player, physics);
                MovementOutcome::default()
            }
            MovementMode::Active => self.drive(player, physics, frame),
        }
    }

    fn suppress(&self, player: &Player, physics: &mut PhysicsWorld) {
        let keep = self.config.suppressed_damping;
        physics.set_force(player.body, Vec3::ZERO);
        let v = physics.linvel(player.body);
        physics.set_linvel(player.body, Vec3::new(v.x * keep, v.y, v.z * keep));
        let w = physics.angvel(player.body);
        physics.set_angvel(player.body, Vec3::new(w.x, w.y * keep, w.z));
    }

    fn drive(&self, player: &mut Player, physics: &mut PhysicsWorld, frame: &FrameInput) -> MovementOutcome {
        let Some(body) = physics.body_transform(player.body) else {
            return MovementOutcome::default();
        };
        let c = &self.config;
        let mut outcome = MovementOutcome::default();

        let intent = frame.movement.clamp_length_max(1.0);
        let direction = (body.flat_right() * intent.x + body.flat_forward() * intent.y).normalize_or_zero();

        let mut velocity = physics.linvel(player.body);
        let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
        let speed = horizontal.length();

        outcome.force = if direction != Vec3::ZERO {
            direction * c.acceleration_force * intent.length()
        } else if speed > c.braking_min_speed {
            -horizontal / speed * c.acceleration_force * c.braking_factor
        } else {
            Vec3::ZERO
        };
        physics.set_force(player.body, outcome.force);

        if speed > c.max_speed {
            let capped = horizontal / speed * c.max_speed;
            velocity.x = capped.x;
            velocity.z = capped.z;
        }
        if frame.jump && player.grounded {
            velocity.y = c.jump_speed;
            player.grounded = false;
            player.last_ground_contact = None;
            outcome.jumped = true;
        }
        physics.set_linvel(player.body, velocity);

        // Steer the heading; physics keeps only spin about Y.
        let target = Quat::from_rotation_y(self.target_yaw);
        physics.set_rotation(player.body, body.rotation.slerp(target, c.yaw_smoothing).normalize());
        let w = physics.angvel(player.body);
        physics.set_angvel(player.body, Vec3::new(0.0, w.y, 0.0));

        outcome
    }

    /// Heading of the body right now.
    pub fn yaw(&self, player: &Player, physics: &PhysicsWorld) -> f32 {
        physics
            .body_transform(player.body)
            .map(|t| yaw_of(t.rotation))
            .unwrap_or(self.target_yaw)
    }

    pub fn pitch(&self) -> f32 {
        self.target_pitch
    }

    /// Eye transform: body heading plus visual pitch.
    pub fn viewpoint(&self, player: &Player, physics: &PhysicsWorld) -> Transform {
        Transform::from_yaw_pitch(
            player.eye_position(physics),
            self.yaw(player, physics),
            self.target_pitch,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (PhysicsWorld, Player, MovementController) {
        let mut physics = PhysicsWorld::new();
        physics.add_ground_plane();
        let config = MovementConfig::default();
        let mut player = Player::spawn(&mut physics, &config, 100.0);
        player.reset(&mut physics, &config);
        let controller = MovementController::new(&config, 0.0022, 1.0);
        (physics, player, controller)
    }

    fn run(physics: &mut PhysicsWorld, player: &mut Player, controller: &mut MovementController, frame: FrameInput, frames: usize) {
        for _ in 0..frames {
            controller.apply_look(&frame);
            controller.update_grounded(player, physics);
            controller.update(player, physics, &frame);
            physics.step(1.0 / 60.0, 1.0 / 60.0, 5);
        }
    }

    #[test]
    fn look_accumulates_and_clamps_pitch() {
        let (_, _, mut controller) = setup();
        let frame = FrameInput { pointer_delta: Vec2::new(100.0, 10_000.0), ..Default::default() };
        controller.apply_look(&frame);
        assert!((controller.target_yaw - wrap_angle(-0.22)).abs() < 1e-4);
        assert!((controller.target_pitch + controller.config().pitch_limit).abs() < 1e-6);
    }

    #[test]
    fn touch_look_is_scaled_down() {
        let (_, _, mut controller) = setup();
        controller.apply_look(&FrameInput { touch_delta: Vec2::new(-100.0, 0.0), ..Default::default() });
        assert!((controller.target_yaw - 100.0 * 0.0022 * 0.7).abs() < 1e-4);
    }

    #[test]
    fn forward_input_moves_along_facing_and_caps_speed() {
        let (mut physics, mut player, mut controller) = setup();
        controller.mode = MovementMode::Active;
        let start = player.position(&physics);
        let frame = FrameInput { movement: Vec2::new(0.0, 1.0), ..Default::default() };
        run(&mut physics, &mut player, &mut controller, frame, 180);

        let moved = player.position(&physics) - start;
        assert!(moved.z < -3.0, "moved {:?}", moved);
        assert!(moved.x.abs() < 0.05);
        let v = physics.linvel(player.body);
        assert!(Vec3::new(v.x, 0.0, v.z).length() <= 6.0 + 0.5);
    }

    #[test]
    fn body_yaw_follows_target_and_pitch_stays_off_the_body() {
        let (mut physics, mut player, mut controller) = setup();
        controller.mode = MovementMode::Active;
        controller.target_yaw = 1.0;
        controller.target_pitch = 0.8;
        run(&mut physics, &mut player, &mut controller, FrameInput::default(), 60);

        assert!((controller.yaw(&player, &physics) - 1.0).abs() < 1e-2);
        let body = physics.body_transform(player.body).unwrap();
        assert!((body.rotation * Vec3::Y).dot(Vec3::Y) > 0.999);
        let eye = controller.viewpoint(&player, &physics);
        assert!(eye.forward().y > 0.7);
    }

    #[test]
    fn suppressed_mode_bleeds_horizontal_speed() {
        let (mut physics, mut player, mut controller) = setup();
        physics.set_linvel(player.body, Vec3::new(5.0, 0.0, 0.0));
        controller.update(&mut player, &mut physics, &FrameInput {
            movement: Vec2::new(1.0, 0.0),
            ..Default::default()
        });
        assert!((physics.linvel(player.body).x - 0.5).abs() < 1e-4);
    }

    #[test]
    fn jump_only_when_grounded() {
        let (mut physics, mut player, mut controller) = setup();
        controller.mode = MovementMode::Active;
        let jump = FrameInput { jump: true, ..Default::default() };

        // Still falling from the spawn height.
        controller.update_grounded(&mut player, &physics);
        assert!(!controller.update(&mut player, &mut physics, &jump).jumped);

        run(&mut physics, &mut player, &mut controller, FrameInput::default(), 120);
        controller.update_grounded(&mut player, &physics);
        assert!(player.grounded);
        let outcome = controller.update(&mut player, &mut physics, &jump);
        assert!(outcome.jumped);
        assert!((physics.linvel(player.body).y - 7.5).abs() < 1e-4);
    }

    #[test]
    fn eye_sits_at_eye_height_above_the_feet() {
        let (mut physics, mut player, mut controller) = setup();
        run(&mut physics, &mut player, &mut controller, FrameInput::default(), 120);
        let eye = player.eye_position(&physics);
        assert!((eye.y - 1.6).abs() < 0.05, "eye at {}", eye.y);
    }
}
