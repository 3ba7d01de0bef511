//! Audio for the range using Kira.
//!
//! Gameplay code talks to the [`AudioSink`] trait only. [`AudioOutput`]
//! resolves at startup to either a Kira-backed [`AudioSystem`] or
//! [`AudioOutput::Unavailable`]; every call is fire-and-forget and failures
//! are logged, never returned. Positioned effects play through emitters in a
//! Kira spatial scene that follows the player's viewpoint.

use anyhow::Result;
use engine_core::{Quat, Vec3};
use kira::{
    effect::reverb::{ReverbBuilder, ReverbHandle},
    manager::{backend::DefaultBackend, AudioManager, AudioManagerSettings},
    sound::static_sound::{StaticSoundData, StaticSoundHandle, StaticSoundSettings},
    spatial::{
        emitter::{EmitterDistances, EmitterHandle, EmitterSettings},
        listener::{ListenerHandle, ListenerSettings},
        scene::{SpatialSceneHandle, SpatialSceneSettings},
    },
    track::{TrackBuilder, TrackHandle, TrackRoutes},
    tween::Tween,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Smallest volume ever sent to the mixer. Zero gains are avoided so fades stay well defined.
pub const MIN_VOLUME: f32 = 0.0001;
/// Share of a positioned sound fed into the reverb.
pub const REVERB_SEND: f32 = 0.35;
/// Music level while the game is paused or the settings screen is open.
pub const MUSIC_DUCK_FACTOR: f32 = 0.3;

/// Clamp a user volume into the range the mixer accepts.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return MIN_VOLUME;
    }
    volume.clamp(MIN_VOLUME, 1.0)
}

/// Every sound the game can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundId {
    HitStandard,
    HitBonus,
    HitPenalty,
    HitWood,
    Miss,
    Shoot,
    Reload,
    EmptyClip,
    Jump,
    Music,
}

impl SoundId {
    pub const ALL: [SoundId; 10] = [
        SoundId::HitStandard,
        SoundId::HitBonus,
        SoundId::HitPenalty,
        SoundId::HitWood,
        SoundId::Miss,
        SoundId::Shoot,
        SoundId::Reload,
        SoundId::EmptyClip,
        SoundId::Jump,
        SoundId::Music,
    ];

    /// File name inside the sound directory.
    pub fn file_name(self) -> &'static str {
        match self {
            SoundId::HitStandard => "hit_standard.wav",
            SoundId::HitBonus => "hit_bonus.wav",
            SoundId::HitPenalty => "hit_penalty.wav",
            SoundId::HitWood => "hit_wood.wav",
            SoundId::Miss => "miss.wav",
            SoundId::Shoot => "shoot.wav",
            SoundId::Reload => "reload.wav",
            SoundId::EmptyClip => "empty_clip.wav",
            SoundId::Jump => "jump.wav",
            SoundId::Music => "background_music.mp3",
        }
    }
}

/// Size of the simulated room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReverbQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl ReverbQuality {
    /// (feedback, damping) of the reverb effect.
    pub fn parameters(self) -> (f64, f64) {
        match self {
            ReverbQuality::Low => (0.6, 0.6),
            ReverbQuality::Medium => (0.8, 0.4),
            ReverbQuality::High => (0.9, 0.2),
        }
    }
}

/// Startup mix settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSettings {
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub reverb_enabled: bool,
    pub reverb_quality: ReverbQuality,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            music_volume: 0.5,
            sfx_volume: 0.7,
            reverb_enabled: true,
            reverb_quality: ReverbQuality::Medium,
        }
    }
}

/// What the simulation needs from audio.
pub trait AudioSink {
    /// Play a one-shot effect, positioned in the world when `position` is set.
    fn play(&mut self, sound: SoundId, position: Option<Vec3>, volume: f32);
    fn play_music(&mut self);
    fn stop_music(&mut self);
    fn stop_all(&mut self);
    fn set_music_volume(&mut self, volume: f32);
    fn set_sfx_volume(&mut self, volume: f32);
    /// Lower the music while the game is not being played.
    fn set_music_ducked(&mut self, ducked: bool);
    fn set_reverb(&mut self, enabled: bool, quality: ReverbQuality);
    /// Update listener position and orientation (call each frame).
    fn update_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3);
    /// Drop bookkeeping for sounds that finished.
    fn cleanup(&mut self) {}
}

/// Current levels of the mix, independent of the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixLevels {
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub ducked: bool,
    pub reverb_enabled: bool,
    pub reverb_quality: ReverbQuality,
}

impl MixLevels {
    pub fn new(settings: &AudioSettings) -> Self {
        Self {
            music_volume: clamp_volume(settings.music_volume),
            sfx_volume: clamp_volume(settings.sfx_volume),
            ducked: false,
            reverb_enabled: settings.reverb_enabled,
            reverb_quality: settings.reverb_quality,
        }
    }

    pub fn music_output(&self) -> f32 {
        let factor = if self.ducked { MUSIC_DUCK_FACTOR } else { 1.0 };
        clamp_volume(self.music_volume * factor)
    }

    /// Gain of the reverb return. Silent (but not zero) when reverb is off.
    pub fn reverb_output(&self) -> f32 {
        if self.reverb_enabled {
            1.0
        } else {
            MIN_VOLUME
        }
    }
}

/// Attenuation range of positioned sounds, in metres.
const EMITTER_DISTANCES: EmitterDistances = EmitterDistances {
    min_distance: 1.0,
    max_distance: 100.0,
};

/// Listener orientation facing `forward` with `up` as the vertical hint.
/// Falls back to identity when the two are parallel.
pub fn listener_orientation(forward: Vec3, up: Vec3) -> Quat {
    // Compute orientation quaternion from forward and up vectors
    let forward = forward.normalize_or_zero();
    let right = forward.cross(up).normalize_or_zero();
    if right == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let corrected_up = right.cross(forward).normalize();
    let rotation = glam::Mat3::from_cols(right, corrected_up, -forward);
    Quat::from_mat3(&rotation)
}

fn mint_vec(v: Vec3) -> mint::Vector3<f32> {
    mint::Vector3 { x: v.x, y: v.y, z: v.z }
}

fn mint_quat(q: Quat) -> mint::Quaternion<f32> {
    mint::Quaternion {
        v: mint::Vector3 { x: q.x, y: q.y, z: q.z },
        s: q.w,
    }
}

/// A playing one-shot. Positioned sounds keep their emitter alive until they stop.
struct ActiveSound {
    handle: StaticSoundHandle,
    _emitter: Option<EmitterHandle>,
}

/// Kira-backed audio: separate music and dry effect tracks, plus a spatial
/// scene whose listener feeds a world track that sends into the reverb.
pub struct AudioSystem {
    manager: AudioManager,
    music_track: TrackHandle,
    sfx_track: TrackHandle,
    world_track: TrackHandle,
    reverb_track: TrackHandle,
    reverb: ReverbHandle,
    spatial_scene: SpatialSceneHandle,
    listener: ListenerHandle,
    sounds: HashMap<SoundId, StaticSoundData>,
    active_sounds: Vec<ActiveSound>,
    music: Option<StaticSoundHandle>,
    levels: MixLevels,
}

impl AudioSystem {
    /// Create a new audio system on the default output device.
    pub fn new(settings: &AudioSettings) -> Result<Self> {
        let mut manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())?;

        let levels = MixLevels::new(settings);
        let (feedback, damping) = levels.reverb_quality.parameters();
        let mut reverb_builder = TrackBuilder::new().volume(levels.reverb_output() as f64);
        let reverb = reverb_builder.add_effect(
            ReverbBuilder::new()
                .feedback(feedback)
                .damping(damping)
                .mix(1.0),
        );
        let reverb_track = manager.add_sub_track(reverb_builder)?;

        let music_track =
            manager.add_sub_track(TrackBuilder::new().volume(levels.music_output() as f64))?;
        let sfx_track =
            manager.add_sub_track(TrackBuilder::new().volume(levels.sfx_volume as f64))?;
        let world_track = manager.add_sub_track(
            TrackBuilder::new()
                .volume(levels.sfx_volume as f64)
                .routes(TrackRoutes::new().with_route(&reverb_track, REVERB_SEND as f64)),
        )?;

        let mut spatial_scene = manager.add_spatial_scene(SpatialSceneSettings::default())?;
        let listener = spatial_scene.add_listener(
            mint_vec(Vec3::ZERO),
            mint_quat(Quat::IDENTITY),
            ListenerSettings::new().track(&world_track),
        )?;

        Ok(Self {
            manager,
            music_track,
            sfx_track,
            world_track,
            reverb_track,
            reverb,
            spatial_scene,
            listener,
            sounds: HashMap::new(),
            active_sounds: Vec::new(),
            music: None,
            levels,
        })
    }

    /// Load a sound from a file.
    pub fn load_sound(&mut self, sound: SoundId, path: &Path) -> Result<()> {
        let sound_data = StaticSoundData::from_file(path)?;
        self.sounds.insert(sound, sound_data);
        Ok(())
    }

    /// Load every known sound from `dir`. Missing files are logged and that
    /// sound stays silent. Returns how many loaded.
    pub fn load_all(&mut self, dir: &Path) -> usize {
        let mut loaded = 0;
        for sound in SoundId::ALL {
            let path = dir.join(sound.file_name());
            match self.load_sound(sound, &path) {
                Ok(()) => loaded += 1,
                Err(e) => log::warn!("Could not load sound {:?} from {:?}: {}", sound, path, e),
            }
        }
        log::info!("Loaded {}/{} sounds", loaded, SoundId::ALL.len());
        loaded
    }

    pub fn levels(&self) -> MixLevels {
        self.levels
    }

    fn try_play(&mut self, sound: SoundId, position: Option<Vec3>, volume: f32) -> Result<()> {
        // Clone the sound data first to avoid borrow conflict
        let Some(sound_data) = self.sounds.get(&sound).cloned() else {
            return Ok(());
        };
        let settings = StaticSoundSettings::new().volume(clamp_volume(volume) as f64);
        let (settings, emitter) = match position {
            Some(p) => {
                let emitter = self.create_emitter(p)?;
                (settings.output_destination(&emitter), Some(emitter))
            }
            None => (settings.output_destination(&self.sfx_track), None),
        };
        let handle = self.manager.play(sound_data.with_settings(settings))?;
        self.active_sounds.push(ActiveSound { handle, _emitter: emitter });
        Ok(())
    }

    /// Create a spatial emitter at a position.
    fn create_emitter(&mut self, position: Vec3) -> Result<EmitterHandle> {
        let emitter = self.spatial_scene.add_emitter(
            mint_vec(position),
            EmitterSettings::new()
                .distances(EMITTER_DISTANCES)
                .persist_until_sounds_finish(true),
        )?;
        Ok(emitter)
    }

    fn try_play_music(&mut self) -> Result<()> {
        let Some(sound_data) = self.sounds.get(&SoundId::Music) else {
            return Ok(());
        };
        let settings = StaticSoundSettings::new()
            .loop_region(..)
            .output_destination(&self.music_track);
        let handle = self.manager.play(sound_data.clone().with_settings(settings))?;
        self.music = Some(handle);
        Ok(())
    }

    fn apply_music_volume(&mut self) {
        let _ = self
            .music_track
            .set_volume(self.levels.music_output() as f64, Tween::default());
    }
}

impl AudioSink for AudioSystem {
    fn play(&mut self, sound: SoundId, position: Option<Vec3>, volume: f32) {
        if let Err(e) = self.try_play(sound, position, volume) {
            log::warn!("Could not play {:?}: {}", sound, e);
        }
    }

    fn play_music(&mut self) {
        if self.music.is_some() {
            return;
        }
        if let Err(e) = self.try_play_music() {
            log::warn!("Could not start music: {}", e);
        }
    }

    fn stop_music(&mut self) {
        if let Some(mut music) = self.music.take() {
            let _ = music.stop(Tween::default());
        }
    }

    fn stop_all(&mut self) {
        for sound in &mut self.active_sounds {
            let _ = sound.handle.stop(Tween::default());
        }
        self.active_sounds.clear();
        self.stop_music();
    }

    fn set_music_volume(&mut self, volume: f32) {
        self.levels.music_volume = clamp_volume(volume);
        self.apply_music_volume();
    }

    fn set_sfx_volume(&mut self, volume: f32) {
        self.levels.sfx_volume = clamp_volume(volume);
        let v = self.levels.sfx_volume as f64;
        let _ = self.sfx_track.set_volume(v, Tween::default());
        let _ = self.world_track.set_volume(v, Tween::default());
    }

    fn set_music_ducked(&mut self, ducked: bool) {
        if self.levels.ducked != ducked {
            self.levels.ducked = ducked;
            self.apply_music_volume();
        }
    }

    fn set_reverb(&mut self, enabled: bool, quality: ReverbQuality) {
        self.levels.reverb_enabled = enabled;
        self.levels.reverb_quality = quality;
        let (feedback, damping) = quality.parameters();
        let _ = self.reverb.set_feedback(feedback, Tween::default());
        let _ = self.reverb.set_damping(damping, Tween::default());
        let _ = self
            .reverb_track
            .set_volume(self.levels.reverb_output() as f64, Tween::default());
    }

    fn update_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        self.listener.set_position(mint_vec(position), Tween::default());
        self.listener
            .set_orientation(mint_quat(listener_orientation(forward, up)), Tween::default());
    }

    /// Clean up finished sounds.
    fn cleanup(&mut self) {
        self.active_sounds
            .retain(|sound| sound.handle.state() != kira::sound::PlaybackState::Stopped);
    }
}

/// Audio as resolved at startup.
pub enum AudioOutput {
    Kira(Box<AudioSystem>),
    /// No device or backend; every call is a no-op.
    Unavailable,
}

impl AudioOutput {
    /// Open the default device and load sounds from `sound_dir`, falling back
    /// to `Unavailable` when no device can be opened.
    pub fn init(settings: &AudioSettings, sound_dir: &Path) -> Self {
        match AudioSystem::new(settings) {
            Ok(mut system) => {
                system.load_all(sound_dir);
                AudioOutput::Kira(Box::new(system))
            }
            Err(e) => {
                log::warn!("Audio unavailable, continuing silently: {}", e);
                AudioOutput::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, AudioOutput::Kira(_))
    }
}

impl AudioSink for AudioOutput {
    fn play(&mut self, sound: SoundId, position: Option<Vec3>, volume: f32) {
        if let AudioOutput::Kira(system) = self {
            system.play(sound, position, volume);
        }
    }

    fn play_music(&mut self) {
        if let AudioOutput::Kira(system) = self {
            system.play_music();
        }
    }

    fn stop_music(&mut self) {
        if let AudioOutput::Kira(system) = self {
            system.stop_music();
        }
    }

    fn stop_all(&mut self) {
        if let AudioOutput::Kira(system) = self {
            system.stop_all();
        }
    }

    fn set_music_volume(&mut self, volume: f32) {
        if let AudioOutput::Kira(system) = self {
            system.set_music_volume(volume);
        }
    }

    fn set_sfx_volume(&mut self, volume: f32) {
        if let AudioOutput::Kira(system) = self {
            system.set_sfx_volume(volume);
        }
    }

    fn set_music_ducked(&mut self, ducked: bool) {
        if let AudioOutput::Kira(system) = self {
            system.set_music_ducked(ducked);
        }
    }

    fn set_reverb(&mut self, enabled: bool, quality: ReverbQuality) {
        if let AudioOutput::Kira(system) = self {
            system.set_reverb(enabled, quality);
        }
    }

    fn update_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        if let AudioOutput::Kira(system) = self {
            system.update_listener(position, forward, up);
        }
    }

    fn cleanup(&mut self) {
        if let AudioOutput::Kira(system) = self {
            system.cleanup();
        }
    }
}

// Re-export for convenience
pub use kira;
