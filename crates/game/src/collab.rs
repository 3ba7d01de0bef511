//! Seams to the outside world: the render collaborator trait, visual ids, and
//! the headless doubles used by the `range` binary and tests.

use std::collections::HashMap;

use audio::{AudioSink, ReverbQuality, SoundId};
use engine_core::{Transform, TransformRaw, Vec3, VisualHandle};
use physics::PhysicsWorld;

use crate::target::TargetKind;

/// What a visual represents, so the renderer can pick a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Ground,
    Wall,
    Obstacle,
    Target(TargetKind),
}

/// Everything the renderer needs to build a box visual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualDesc {
    pub kind: VisualKind,
    pub half_extents: Vec3,
    /// 0xRRGGBB
    pub color: u32,
    pub transform: Transform,
}

/// What the simulation needs from the renderer.
pub trait RenderSink {
    /// Acquire the drawing context. Failing here keeps the session from starting.
    fn init(&mut self) -> Result<(), String> {
        Ok(())
    }
    fn add_visual(&mut self, handle: VisualHandle, desc: &VisualDesc);
    /// Drop the visual and any GPU resources it retains.
    fn remove_visual(&mut self, handle: VisualHandle);
    fn update_visual(&mut self, handle: VisualHandle, transform: TransformRaw);
    fn set_viewpoint(&mut self, viewpoint: Transform);
    /// World transform of the eye. Shots originate here.
    fn viewpoint(&self) -> Transform;
    fn render(&mut self, dt: f32);
}

/// Hands out visual handles. Never reuses one.
#[derive(Debug, Default)]
pub struct VisualIds {
    next: u64,
}

impl VisualIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> VisualHandle {
        let handle = VisualHandle(self.next);
        self.next += 1;
        handle
    }
}

/// Mutable view of the collaborators a frame stage may touch.
pub struct FrameContext<'a> {
    pub physics: &'a mut PhysicsWorld,
    pub renderer: &'a mut dyn RenderSink,
    pub audio: &'a mut dyn AudioSink,
    pub visuals: &'a mut VisualIds,
}

// ── Headless doubles ───────────────────────────────────────────────────────

/// Renderer that draws nothing and remembers what it was told.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub visuals: HashMap<VisualHandle, VisualDesc>,
    pub removed: Vec<VisualHandle>,
    pub last_transforms: HashMap<VisualHandle, TransformRaw>,
    pub updates: u64,
    pub frames: u64,
    viewpoint: Transform,
    fail_init: Option<String>,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer whose `init` reports `reason`.
    pub fn failing(reason: &str) -> Self {
        Self { fail_init: Some(reason.to_string()), ..Self::default() }
    }

    pub fn live_count(&self) -> usize {
        self.visuals.len()
    }
}

impl RenderSink for NullRenderer {
    fn init(&mut self) -> Result<(), String> {
        match &self.fail_init {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn add_visual(&mut self, handle: VisualHandle, desc: &VisualDesc) {
        self.visuals.insert(handle, *desc);
    }

    fn remove_visual(&mut self, handle: VisualHandle) {
        if self.visuals.remove(&handle).is_some() {
            self.last_transforms.remove(&handle);
            self.removed.push(handle);
        } else {
            log::warn!("remove_visual on unknown handle {:?}", handle);
        }
    }

    fn update_visual(&mut self, handle: VisualHandle, transform: TransformRaw) {
        self.updates += 1;
        self.last_transforms.insert(handle, transform);
    }

    fn set_viewpoint(&mut self, viewpoint: Transform) {
        self.viewpoint = viewpoint;
    }

    fn viewpoint(&self) -> Transform {
        self.viewpoint
    }

    fn render(&mut self, _dt: f32) {
        self.frames += 1;
    }
}

/// Audio sink that keeps a log of every request.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    pub played: Vec<(SoundId, Option<Vec3>, f32)>,
    pub music_playing: bool,
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub ducked: bool,
    pub reverb: Option<(bool, ReverbQuality)>,
    pub stop_all_calls: u32,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, sound: SoundId) -> usize {
        self.played.iter().filter(|(s, _, _)| *s == sound).count()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, sound: SoundId, position: Option<Vec3>, volume: f32) {
        self.played.push((sound, position, volume));
    }

    fn play_music(&mut self) {
        self.music_playing = true;
    }

    fn stop_music(&mut self) {
        self.music_playing = false;
    }

    fn stop_all(&mut self) {
        self.music_playing = false;
        self.stop_all_calls += 1;
    }

    fn set_music_volume(&mut self, volume: f32) {
        self.music_volume = volume;
    }

    fn set_sfx_volume(&mut self, volume: f32) {
        self.sfx_volume = volume;
    }

    fn set_music_ducked(&mut self, ducked: bool) {
        self.ducked = ducked;
    }

    fn set_reverb(&mut self, enabled: bool, quality: ReverbQuality) {
        self.reverb = Some((enabled, quality));
    }

    fn update_listener(&mut self, _position: Vec3, _forward: Vec3, _up: Vec3) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_ids_are_unique() {
        let mut ids = VisualIds::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_ne!(a, b);
    }

    #[test]
    fn null_renderer_tracks_live_visuals() {
        let mut renderer = NullRenderer::new();
        let desc = VisualDesc {
            kind: VisualKind::Wall,
            half_extents: Vec3::ONE,
            color: 0x808080,
            transform: Transform::default(),
        };
        renderer.add_visual(VisualHandle(1), &desc);
        renderer.add_visual(VisualHandle(2), &desc);
        renderer.remove_visual(VisualHandle(1));
        renderer.remove_visual(VisualHandle(1));
        assert_eq!(renderer.live_count(), 1);
        assert_eq!(renderer.removed, vec![VisualHandle(1)]);
    }

    #[test]
    fn failing_renderer_reports_reason() {
        let mut renderer = NullRenderer::failing("no adapter");
        assert_eq!(renderer.init(), Err("no adapter".to_string()));
    }
}
