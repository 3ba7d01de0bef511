//! Game configuration (input, audio, tuning). Loaded from config.ron at startup.

use audio::{AudioSettings, ReverbQuality};
use glam::Vec3;
use input::KeyBindings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SessionError;

/// Persistent game settings. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Radians of yaw/pitch per pixel of pointer movement.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    /// Player-facing multiplier for touch look (slider 0.1–3.0).
    #[serde(default = "default_touch_sensitivity")]
    pub touch_sensitivity: f32,
    #[serde(default = "default_music_volume")]
    pub music_volume: f32,
    #[serde(default = "default_sfx_volume")]
    pub sfx_volume: f32,
    /// Send positioned effects through the reverb bus.
    #[serde(default = "default_true")]
    pub spatial_reverb: bool,
    #[serde(default)]
    pub reverb_quality: ReverbQuality,
    /// Directory holding the sound files named by `SoundId::file_name`.
    #[serde(default = "default_sound_dir")]
    pub sound_dir: PathBuf,
    #[serde(default)]
    pub bindings: KeyBindings,

    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub weapon: WeaponConfig,
    #[serde(default)]
    pub targets: TargetConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
}

fn default_sensitivity() -> f32 {
    0.0022
}
fn default_touch_sensitivity() -> f32 {
    1.0
}
fn default_music_volume() -> f32 {
    0.5
}
fn default_sfx_volume() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}
fn default_sound_dir() -> PathBuf {
    PathBuf::from("assets/sounds")
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            touch_sensitivity: default_touch_sensitivity(),
            music_volume: default_music_volume(),
            sfx_volume: default_sfx_volume(),
            spatial_reverb: default_true(),
            reverb_quality: ReverbQuality::default(),
            sound_dir: default_sound_dir(),
            bindings: KeyBindings::default(),
            physics: PhysicsConfig::default(),
            movement: MovementConfig::default(),
            weapon: WeaponConfig::default(),
            targets: TargetConfig::default(),
            scoring: ScoringConfig::default(),
            session: SessionConfig::default(),
            arena: ArenaConfig::default(),
        }
    }
}

// ── Tuning sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    /// Seconds per simulated increment.
    pub fixed_timestep: f32,
    /// Increments allowed per frame before the remaining time is dropped.
    pub max_substeps: u32,
    /// Longest wall-clock frame fed to the pipeline (tab switches, hitches).
    pub max_frame_delta: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: physics::DEFAULT_GRAVITY,
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 5,
            max_frame_delta: engine_core::DEFAULT_MAX_DELTA,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Newtons pushed toward the input direction.
    pub acceleration_force: f32,
    /// Fraction of `acceleration_force` used to brake when there is no input.
    pub braking_factor: f32,
    /// Horizontal speed below which braking stops.
    pub braking_min_speed: f32,
    /// Horizontal speed cap (m/s).
    pub max_speed: f32,
    /// Slerp factor per frame from the body's rotation toward the target yaw.
    pub yaw_smoothing: f32,
    /// Pitch is clamped to ±this (radians).
    pub pitch_limit: f32,
    /// Extra scale on touch look.
    pub mobile_look_multiplier: f32,
    /// Velocity kept per frame while movement is suppressed.
    pub suppressed_damping: f32,
    pub jump_speed: f32,
    /// Seconds a lost ground contact still counts as grounded.
    pub ground_grace: f32,
    /// Extra ray length below the feet.
    pub ground_ray_margin: f32,
    /// Eye height above the feet.
    pub eye_height: f32,
    pub half_extents: Vec3,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Where the player body is created.
    pub initial_position: Vec3,
    /// Where the player body is put back on reset.
    pub spawn_position: Vec3,
    /// Joystick deflection (fraction of radius) ignored as noise.
    pub joystick_dead_zone: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            acceleration_force: 800.0,
            braking_factor: 0.3,
            braking_min_speed: 0.1,
            max_speed: 6.0,
            yaw_smoothing: 0.25,
            pitch_limit: std::f32::consts::FRAC_PI_2 - 0.05,
            mobile_look_multiplier: 0.7,
            suppressed_damping: 0.1,
            jump_speed: 7.5,
            ground_grace: 0.1,
            ground_ray_margin: 0.1,
            eye_height: 1.6,
            half_extents: Vec3::new(0.4, 0.85, 0.4),
            mass: 70.0,
            linear_damping: 0.6,
            angular_damping: 1.0,
            initial_position: Vec3::new(0.0, 5.0, 5.0),
            spawn_position: Vec3::new(0.0, 1.5, 5.0),
            joystick_dead_zone: input::DEFAULT_JOYSTICK_DEAD_ZONE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub max_ammo: u32,
    pub reserve_ammo: u32,
    /// Seconds.
    pub reload_time: f32,
    /// Seconds between shots.
    pub cooldown: f32,
    pub range: f32,
    pub damage: u32,
    /// Penetration power lost per penetrable layer passed.
    pub penetration_reduction: f32,
    pub shoot_volume: f32,
    pub reload_volume: f32,
    pub miss_volume: f32,
    pub empty_volume: f32,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            max_ammo: 15,
            reserve_ammo: 90,
            reload_time: 1.5,
            cooldown: 0.12,
            range: 300.0,
            damage: 1,
            penetration_reduction: 0.7,
            shoot_volume: 0.8,
            reload_volume: 0.7,
            miss_volume: 0.6,
            empty_volume: 0.6,
        }
    }
}

/// Relative chance of each target kind. Equal weights give a uniform pick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindWeights {
    pub standard: f32,
    pub bonus: f32,
    pub penalty: f32,
    pub cover: f32,
}

impl Default for KindWeights {
    fn default() -> Self {
        Self { standard: 1.0, bonus: 1.0, penalty: 1.0, cover: 1.0 }
    }
}

impl KindWeights {
    pub fn as_array(&self) -> [f32; 4] {
        [self.standard, self.bonus, self.penalty, self.cover]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub max_targets: usize,
    pub spawn_interval_base: f32,
    pub spawn_interval_variance: f32,
    pub spawn_interval_min: f32,
    /// Lower corner of the spawn volume.
    pub spawn_min: Vec3,
    /// Upper corner of the spawn volume.
    pub spawn_max: Vec3,
    /// Targets below this height are swept.
    pub floor_y: f32,
    /// Targets farther than this from the origin are swept.
    pub max_distance: f32,
    /// Impulse per point of damage, pushed into the surface.
    pub hit_impulse: f32,
    /// Spawn tumble impulse as a fraction of the target's mass.
    pub spawn_impulse: f32,
    pub weights: KindWeights,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            max_targets: 12,
            spawn_interval_base: 1.3,
            spawn_interval_variance: 0.6,
            spawn_interval_min: 0.4,
            spawn_min: Vec3::new(-18.0, 0.8, -28.0),
            spawn_max: Vec3::new(18.0, 7.0, -12.0),
            floor_y: -20.0,
            max_distance: 500.0,
            hit_impulse: 5.0,
            spawn_impulse: 0.5,
            weights: KindWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// (consecutive hits, multiplier), ascending by hits.
    pub combo_thresholds: Vec<(u32, f32)>,
    /// Share of a target's points awarded for damaging it without destroying it.
    pub partial_hit_fraction: f32,
    /// Player health lost per penalty hit.
    pub penalty_damage: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            combo_thresholds: vec![(1, 1.0), (5, 1.5), (10, 2.0), (15, 2.5), (25, 3.0)],
            partial_hit_fraction: 0.1,
            penalty_damage: 15.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds per round.
    pub duration: f32,
    pub max_health: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { duration: 90.0, max_health: 100.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Edge length of the square floor.
    pub size: f32,
    pub wall_height: f32,
    pub wall_thickness: f32,
    /// Random static boxes scattered on the floor. 0 keeps the range open.
    pub obstacle_count: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self { size: 100.0, wall_height: 10.0, wall_thickness: 2.0, obstacle_count: 0 }
    }
}

impl GameConfig {
    /// Load config from `config.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str::<GameConfig>(&data) {
                Ok(c) => match c.validate() {
                    Ok(()) => return c,
                    Err(e) => log::warn!("Rejected config at {:?}: {}, using defaults", path, e),
                },
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Save current config to `config.ron`. Logs on error.
    pub fn save(&self) {
        let path = config_path();
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(&path, s) {
                log::warn!("Could not write config to {:?}: {}", path, e);
            }
        }
    }

    /// Mix settings handed to the audio collaborator.
    pub fn audio_settings(&self) -> AudioSettings {
        AudioSettings {
            music_volume: self.music_volume,
            sfx_volume: self.sfx_volume,
            reverb_enabled: self.spatial_reverb,
            reverb_quality: self.reverb_quality,
        }
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), SessionError> {
        let invalid = |msg: &str| Err(SessionError::InvalidConfig(msg.to_string()));

        // `!(x > 0.0)` also rejects NaN.
        if !(self.physics.fixed_timestep > 0.0) {
            return invalid("physics.fixed_timestep must be positive");
        }
        if self.physics.max_substeps == 0 {
            return invalid("physics.max_substeps must be at least 1");
        }
        if !(self.physics.max_frame_delta > 0.0) {
            return invalid("physics.max_frame_delta must be positive");
        }
        if !(self.movement.max_speed > 0.0) || !(self.movement.mass > 0.0) {
            return invalid("movement.max_speed and movement.mass must be positive");
        }
        if !(0.0..=1.0).contains(&self.movement.yaw_smoothing) {
            return invalid("movement.yaw_smoothing must be within 0..=1");
        }
        if self.weapon.max_ammo == 0 {
            return invalid("weapon.max_ammo must be at least 1");
        }
        if !(self.weapon.range > 0.0) {
            return invalid("weapon.range must be positive");
        }
        if self.weapon.cooldown < 0.0 || self.weapon.reload_time < 0.0 {
            return invalid("weapon timings must not be negative");
        }
        let t = &self.targets;
        // Spawn sampling ranges must be finite or sampling panics.
        if !t.spawn_min.is_finite() || !t.spawn_max.is_finite() {
            return invalid("targets spawn volume must be finite");
        }
        if t.spawn_min.cmpgt(t.spawn_max).any() {
            return invalid("targets.spawn_min must not exceed targets.spawn_max");
        }
        if !t.spawn_interval_base.is_finite() || !t.spawn_interval_variance.is_finite() {
            return invalid("targets spawn interval must be finite");
        }
        if !(t.spawn_interval_min > 0.0) || t.spawn_interval_variance < 0.0 {
            return invalid("targets spawn interval must be positive");
        }
        let weights = t.weights.as_array();
        if weights.iter().any(|w| !(*w >= 0.0)) || weights.iter().sum::<f32>() <= 0.0 {
            return invalid("targets.weights must be non-negative with a positive sum");
        }
        let thresholds = &self.scoring.combo_thresholds;
        if thresholds.is_empty() {
            return invalid("scoring.combo_thresholds must not be empty");
        }
        if thresholds.windows(2).any(|w| w[1].0 <= w[0].0 || w[1].1 < w[0].1) {
            return invalid("scoring.combo_thresholds must ascend in hits and multiplier");
        }
        if !(self.session.duration > 0.0) || !(self.session.max_health > 0.0) {
            return invalid("session.duration and session.max_health must be positive");
        }
        Ok(())
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_ron_fills_missing_fields_with_defaults() {
        let config: GameConfig =
            ron::from_str("(sensitivity: 0.004, weapon: (max_ammo: 30))").unwrap();
        assert_eq!(config.sensitivity, 0.004);
        assert_eq!(config.weapon.max_ammo, 30);
        assert_eq!(config.weapon.reserve_ammo, 90);
        assert_eq!(config.targets.max_targets, 12);
        assert_eq!(config.scoring.combo_thresholds.len(), 5);
    }

    #[test]
    fn validate_rejects_inverted_spawn_volume() {
        let mut config = GameConfig::default();
        config.targets.spawn_min.x = 30.0;
        assert!(matches!(config.validate(), Err(SessionError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_non_finite_spawn_ranges() {
        let mut config = GameConfig::default();
        config.targets.spawn_min.x = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.targets.spawn_max.y = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.targets.spawn_interval_variance = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.targets.spawn_interval_variance = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_thresholds() {
        let mut config = GameConfig::default();
        config.scoring.combo_thresholds.clear();
        assert!(config.validate().is_err());

        config.scoring.combo_thresholds = vec![(1, 2.0), (5, 1.5)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timestep() {
        let mut config = GameConfig::default();
        config.physics.fixed_timestep = 0.0;
        assert!(config.validate().is_err());
        config.physics.fixed_timestep = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = GameConfig::load_from(Path::new("definitely/not/here/config.ron"));
        assert_eq!(config.session.duration, 90.0);
    }
}
