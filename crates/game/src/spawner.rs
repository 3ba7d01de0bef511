//! Target lifecycle: timed spawning, hit processing, out-of-bounds sweeps.
//!
//! The manager owns every live target. Other systems refer to targets by
//! [`TargetId`] and change them only through [`TargetManager::process_hit`].
//! Removal happens either inside `process_hit` (destroyed) or from the pending
//! queue drained at the start of the next spawn tick (left the play volume).

use std::collections::{BTreeSet, HashMap};

use engine_core::{Quat, Transform, Vec3};
use hecs::{Entity, World};
use physics::{BodyDesc, BodyShape, BodyTag, CollisionGroup, MaterialTag};
use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;

use crate::collab::{FrameContext, VisualDesc, VisualKind};
use crate::config::TargetConfig;
use crate::target::{TargetEntity, TargetId, TargetKind};

const TARGET_LINEAR_DAMPING: f32 = 0.05;
const TARGET_ANGULAR_DAMPING: f32 = 0.1;
const HIT_SOUND_VOLUME: f32 = 1.0;

/// What `process_hit` did to a live target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    pub id: TargetId,
    pub kind: TargetKind,
    pub destroyed: bool,
    /// Score this hit is worth before any combo multiplier.
    pub score_delta: i64,
    pub was_penalty: bool,
    pub was_penetrable: bool,
    /// The kind's point value.
    pub points: i64,
    pub remaining_health: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitResult {
    /// The id is not live (already destroyed or swept). Nothing happened.
    Stale,
    Hit(HitOutcome),
}

/// Lifecycle notifications, drained by the session each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetEvent {
    Spawned { id: TargetId, kind: TargetKind },
    Destroyed { id: TargetId, kind: TargetKind, position: Vec3 },
    /// Left the play volume and was swept.
    Despawned { id: TargetId, kind: TargetKind },
}

/// Owns the live targets and decides when new ones appear.
pub struct TargetManager {
    world: World,
    index: HashMap<TargetId, Entity>,
    next_id: u64,

    /// Time since the last spawn.
    pub spawn_timer: f32,
    /// Interval the timer must reach before the next spawn.
    pub next_interval: f32,

    /// Out-of-bounds targets waiting for the next tick.
    pending_removal: BTreeSet<TargetId>,
    events: Vec<TargetEvent>,

    config: TargetConfig,
    partial_hit_fraction: f32,
    kinds: Option<WeightedIndex<f32>>,
    rng: StdRng,
}

impl TargetManager {
    /// `partial_hit_fraction` sets the base value of a hit that does not destroy.
    pub fn new(config: &TargetConfig, partial_hit_fraction: f32, rng: StdRng) -> Self {
        let kinds = match WeightedIndex::new(config.weights.as_array()) {
            Ok(dist) => Some(dist),
            Err(e) => {
                log::warn!("Unusable target weights ({}), picking kinds uniformly", e);
                None
            }
        };
        Self {
            world: World::new(),
            index: HashMap::new(),
            next_id: 0,
            spawn_timer: 0.0,
            next_interval: config.spawn_interval_base * 0.5,
            pending_removal: BTreeSet::new(),
            events: Vec::new(),
            config: config.clone(),
            partial_hit_fraction,
            kinds,
            rng,
        }
    }

    pub fn active_count(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, id: TargetId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: TargetId) -> Option<TargetEntity> {
        let entity = *self.index.get(&id)?;
        self.world.get::<&TargetEntity>(entity).ok().map(|t| *t)
    }

    /// Last transform mirrored from the target's body.
    pub fn transform(&self, id: TargetId) -> Option<Transform> {
        let entity = *self.index.get(&id)?;
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    /// Live ids, ascending.
    pub fn ids(&self) -> Vec<TargetId> {
        let mut ids: Vec<_> = self.index.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn pending_removals(&self) -> usize {
        self.pending_removal.len()
    }

    pub fn drain_events(&mut self) -> Vec<TargetEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Spawning ───────────────────────────────────────────────────────────

    /// One spawn tick: sweep last frame's out-of-bounds targets, then spawn if
    /// the interval has elapsed and the cap allows. Returns the new target.
    pub fn tick(&mut self, dt: f32, ctx: &mut FrameContext) -> Option<TargetId> {
        self.drain_pending(ctx);

        self.spawn_timer += dt;
        if self.index.len() >= self.config.max_targets || self.spawn_timer < self.next_interval {
            return None;
        }
        let id = self.spawn_random(ctx);
        self.spawn_timer = 0.0;
        self.next_interval = self.random_interval();
        Some(id)
    }

    /// Next spawn interval: base ± variance, never below the minimum.
    pub fn random_interval(&mut self) -> f32 {
        let c = &self.config;
        let jitter = if c.spawn_interval_variance > 0.0 {
            self.rng.gen_range(-c.spawn_interval_variance..=c.spawn_interval_variance)
        } else {
            0.0
        };
        (c.spawn_interval_base + jitter).max(c.spawn_interval_min)
    }

    fn pick_kind(&mut self) -> TargetKind {
        let index = match &self.kinds {
            Some(dist) => dist.sample(&mut self.rng),
            None => self.rng.gen_range(0..TargetKind::ALL.len()),
        };
        TargetKind::ALL[index]
    }

    /// Spawn a random kind somewhere in the spawn volume, with a tumble.
    pub fn spawn_random(&mut self, ctx: &mut FrameContext) -> TargetId {
        let kind = self.pick_kind();
        let (min, max) = (self.config.spawn_min, self.config.spawn_max);
        let position = Vec3::new(
            self.rng.gen_range(min.x..=max.x),
            self.rng.gen_range(min.y..=max.y),
            self.rng.gen_range(min.z..=max.z),
        );
        let rotation = Quat::from_rotation_y(self.rng.gen_range(0.0..std::f32::consts::TAU));
        let id = self.spawn(kind, position, rotation, ctx);

        // Off-centre push so boards tumble as they drop.
        let strength = self.config.spawn_impulse * kind.mass();
        let impulse = Vec3::new(
            self.rng.gen_range(-0.5..=0.5) * strength,
            self.rng.gen_range(0.0..=0.5) * strength,
            self.rng.gen_range(-0.5..=0.5) * strength,
        );
        let he = kind.half_extents() * 0.5;
        let offset = Vec3::new(
            self.rng.gen_range(-he.x..=he.x),
            self.rng.gen_range(-he.y..=he.y),
            self.rng.gen_range(-he.z..=he.z),
        );
        if let Some(target) = self.get(id) {
            ctx.physics.apply_impulse_at_point(target.body, impulse, position + offset);
        }
        id
    }

    /// Put up one target: one body, one entity, one visual, linked by id.
    pub fn spawn(
        &mut self,
        kind: TargetKind,
        position: Vec3,
        rotation: Quat,
        ctx: &mut FrameContext,
    ) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;

        let half_extents = kind.half_extents();
        let visual = ctx.visuals.allocate();
        let body = ctx.physics.add_body(
            &BodyDesc::dynamic(BodyShape::Cuboid { half_extents }, position, kind.mass())
                .with_rotation(rotation)
                .with_material(MaterialTag::Target)
                .with_group(CollisionGroup::Target)
                .with_tag(BodyTag::Target(id.0), Some(visual))
                .with_damping(TARGET_LINEAR_DAMPING, TARGET_ANGULAR_DAMPING),
        );
        let transform = Transform::from_position_rotation(position, rotation);
        ctx.renderer.add_visual(
            visual,
            &VisualDesc {
                kind: VisualKind::Target(kind),
                half_extents,
                color: kind.color(),
                transform,
            },
        );

        let entity = self.world.spawn((
            TargetEntity { id, kind, health: kind.health(), body, visual },
            transform,
        ));
        self.index.insert(id, entity);
        self.events.push(TargetEvent::Spawned { id, kind });
        log::debug!("Spawned {} target {:?} at {:?}", kind.name(), id, position);
        id
    }

    // ── Hits ───────────────────────────────────────────────────────────────

    /// Apply `damage` to a live target: hit sound at `point`, a push into the
    /// surface, and removal when health runs out. Stale ids are a no-op.
    pub fn process_hit(
        &mut self,
        id: TargetId,
        point: Vec3,
        normal: Vec3,
        damage: u32,
        ctx: &mut FrameContext,
    ) -> HitResult {
        let Some(&entity) = self.index.get(&id) else {
            return HitResult::Stale;
        };
        let (kind, body, remaining) = match self.world.get::<&mut TargetEntity>(entity) {
            Ok(mut target) if target.health > 0 => {
                target.health = target.health.saturating_sub(damage);
                (target.kind, target.body, target.health)
            }
            _ => return HitResult::Stale,
        };

        ctx.audio.play(kind.hit_sound(), Some(point), HIT_SOUND_VOLUME);
        let impulse = -normal.normalize_or_zero() * self.config.hit_impulse * damage as f32;
        ctx.physics.apply_impulse_at_point(body, impulse, point);

        let destroyed = remaining == 0;
        let points = kind.points();
        let score_delta = if destroyed {
            points
        } else if points >= 0 {
            (points as f64 * self.partial_hit_fraction as f64).round() as i64
        } else {
            0
        };

        if destroyed {
            self.remove(id, ctx);
            self.events.push(TargetEvent::Destroyed { id, kind, position: point });
            log::debug!("Destroyed {} target {:?}", kind.name(), id);
        } else {
            log::debug!("Hit {} target {:?}, {} left", kind.name(), id, remaining);
        }

        HitResult::Hit(HitOutcome {
            id,
            kind,
            destroyed,
            score_delta,
            was_penalty: kind.is_penalty(),
            was_penetrable: kind.penetrable(),
            points,
            remaining_health: remaining,
        })
    }

    // ── Sync & removal ─────────────────────────────────────────────────────

    /// Mirror body transforms onto visuals and queue targets that left the
    /// play volume. Sleeping bodies keep their last visual transform.
    pub fn sync_visuals(&mut self, ctx: &mut FrameContext) {
        let floor = self.config.floor_y;
        let max_distance_sq = self.config.max_distance * self.config.max_distance;
        let mut out_of_bounds = Vec::new();

        for (_, (target, mirrored)) in self.world.query_mut::<(&TargetEntity, &mut Transform)>() {
            let Some(transform) = ctx.physics.body_transform(target.body) else {
                out_of_bounds.push(target.id);
                continue;
            };
            let p = transform.position;
            if p.y < floor || p.length_squared() > max_distance_sq {
                out_of_bounds.push(target.id);
            }
            if ctx.physics.is_sleeping(target.body) {
                continue;
            }
            *mirrored = transform;
            ctx.renderer.update_visual(target.visual, transform.into());
        }

        for id in out_of_bounds {
            if self.pending_removal.insert(id) {
                log::debug!("Target {:?} left the play volume", id);
            }
        }
    }

    /// Queue a target for removal at the next tick.
    pub fn schedule_removal(&mut self, id: TargetId) {
        if self.index.contains_key(&id) {
            self.pending_removal.insert(id);
        }
    }

    fn drain_pending(&mut self, ctx: &mut FrameContext) {
        for id in std::mem::take(&mut self.pending_removal) {
            if let Some(target) = self.remove(id, ctx) {
                self.events.push(TargetEvent::Despawned { id, kind: target.kind });
            }
        }
    }

    /// Remove the entity, its body and its visual together.
    fn remove(&mut self, id: TargetId, ctx: &mut FrameContext) -> Option<TargetEntity> {
        let entity = self.index.remove(&id)?;
        let target = self.world.get::<&TargetEntity>(entity).ok().map(|t| *t);
        if self.world.despawn(entity).is_err() {
            log::warn!("Target {:?} had no entity", id);
        }
        let target = target?;

        let visual = match ctx.physics.remove_body(target.body) {
            Some(removed) => removed.visual.unwrap_or(target.visual),
            None => target.visual,
        };
        ctx.renderer.remove_visual(visual);
        Some(target)
    }

    /// Remove every target and restart the cadence: ids from 0, first spawn
    /// after half the base interval.
    pub fn reset(&mut self, ctx: &mut FrameContext) {
        for id in self.ids() {
            self.remove(id, ctx);
        }
        self.world.clear();
        self.index.clear();
        self.pending_removal.clear();
        self.events.clear();
        self.next_id = 0;
        self.spawn_timer = 0.0;
        self.next_interval = self.config.spawn_interval_base * 0.5;
        log::debug!("Target manager reset");
    }

    /// Make the first tick of a round spawn at once.
    pub fn prime_for_start(&mut self) {
        self.spawn_timer = self.next_interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{NullRenderer, RecordingAudio, VisualIds};
    use audio::SoundId;
    use physics::PhysicsWorld;

    struct Rig {
        physics: PhysicsWorld,
        renderer: NullRenderer,
        audio: RecordingAudio,
        visuals: VisualIds,
        manager: TargetManager,
    }

    impl Rig {
        fn new() -> Self {
            let mut physics = PhysicsWorld::new();
            physics.add_ground_plane();
            Self {
                physics,
                renderer: NullRenderer::new(),
                audio: RecordingAudio::new(),
                visuals: VisualIds::new(),
                manager: TargetManager::new(&TargetConfig::default(), 0.1, StdRng::seed_from_u64(3)),
            }
        }

        fn with<T>(&mut self, f: impl FnOnce(&mut TargetManager, &mut FrameContext) -> T) -> T {
            let mut ctx = FrameContext {
                physics: &mut self.physics,
                renderer: &mut self.renderer,
                audio: &mut self.audio,
                visuals: &mut self.visuals,
            };
            f(&mut self.manager, &mut ctx)
        }

        fn spawn(&mut self, kind: TargetKind) -> TargetId {
            self.with(|m, ctx| m.spawn(kind, Vec3::new(0.0, 1.6, -10.0), Quat::IDENTITY, ctx))
        }

        fn hit(&mut self, id: TargetId) -> HitResult {
            self.with(|m, ctx| m.process_hit(id, Vec3::new(0.0, 1.6, -9.85), Vec3::Z, 1, ctx))
        }
    }

    fn destroyed_events(events: &[TargetEvent]) -> usize {
        events.iter().filter(|e| matches!(e, TargetEvent::Destroyed { .. })).count()
    }

    #[test]
    fn spawn_links_body_entity_and_visual() {
        let mut rig = Rig::new();
        let id = rig.spawn(TargetKind::Bonus);
        let target = rig.manager.get(id).unwrap();
        assert_eq!(rig.physics.body_tag(target.body), Some(BodyTag::Target(id.0)));
        assert!(rig.renderer.visuals.contains_key(&target.visual));
        assert_eq!(target.health, 1);
    }

    #[test]
    fn ids_are_monotonic() {
        let mut rig = Rig::new();
        let a = rig.spawn(TargetKind::Standard);
        let _ = rig.hit(a);
        let b = rig.spawn(TargetKind::Standard);
        assert!(b > a);
    }

    #[test]
    fn health_hits_destroy_exactly_once_for_every_kind() {
        for kind in TargetKind::ALL {
            let mut rig = Rig::new();
            let id = rig.spawn(kind);
            for n in 1..kind.health() {
                match rig.hit(id) {
                    HitResult::Hit(outcome) => {
                        assert!(!outcome.destroyed);
                        assert_eq!(outcome.remaining_health, kind.health() - n);
                    }
                    HitResult::Stale => panic!("target vanished early"),
                }
                assert!(rig.manager.contains(id));
            }
            match rig.hit(id) {
                HitResult::Hit(outcome) => assert!(outcome.destroyed),
                HitResult::Stale => panic!("final hit was stale"),
            }
            assert!(!rig.manager.contains(id));
            assert_eq!(rig.hit(id), HitResult::Stale);

            let events = rig.manager.drain_events();
            assert_eq!(destroyed_events(&events), 1);
            assert_eq!(rig.renderer.live_count(), 0);
        }
    }

    #[test]
    fn cover_hit_awards_partial_value() {
        let mut rig = Rig::new();
        let id = rig.spawn(TargetKind::Cover);
        match rig.hit(id) {
            HitResult::Hit(outcome) => {
                assert_eq!(outcome.score_delta, 1);
                assert!(outcome.was_penetrable);
                assert_eq!(outcome.remaining_health, 2);
            }
            HitResult::Stale => panic!("stale"),
        }
        assert_eq!(rig.audio.count(SoundId::HitWood), 1);
    }

    #[test]
    fn hit_pushes_the_target_away_from_the_shooter() {
        let mut rig = Rig::new();
        let id = rig.spawn(TargetKind::Cover);
        rig.hit(id);
        let body = rig.manager.get(id).unwrap().body;
        assert!(rig.physics.linvel(body).z < 0.0);
    }

    #[test]
    fn out_of_bounds_targets_leave_on_the_next_tick() {
        let mut rig = Rig::new();
        let id = rig.with(|m, ctx| m.spawn(TargetKind::Standard, Vec3::new(0.0, -30.0, 0.0), Quat::IDENTITY, ctx));
        rig.with(|m, ctx| m.sync_visuals(ctx));
        assert!(rig.manager.contains(id));
        assert_eq!(rig.manager.pending_removals(), 1);

        rig.with(|m, ctx| m.tick(0.0, ctx));
        assert!(!rig.manager.contains(id));
        assert_eq!(rig.manager.pending_removals(), 0);
        assert!(rig
            .manager
            .drain_events()
            .iter()
            .any(|e| matches!(e, TargetEvent::Despawned { id: gone, .. } if *gone == id)));
    }

    #[test]
    fn spawn_cadence_respects_cap_and_interval() {
        let mut rig = Rig::new();
        rig.manager.prime_for_start();
        assert!(rig.with(|m, ctx| m.tick(0.016, ctx)).is_some());
        assert!(rig.manager.next_interval >= 0.4);
        assert!(rig.with(|m, ctx| m.tick(0.1, ctx)).is_none());

        for _ in 0..2000 {
            rig.with(|m, ctx| m.tick(0.05, ctx));
        }
        assert!(rig.manager.active_count() <= 12);
    }

    #[test]
    fn random_spawns_stay_in_the_volume() {
        let mut rig = Rig::new();
        let config = TargetConfig::default();
        for _ in 0..20 {
            let id = rig.with(|m, ctx| m.spawn_random(ctx));
            let t = rig.manager.transform(id).unwrap();
            assert!(t.position.cmpge(config.spawn_min).all());
            assert!(t.position.cmple(config.spawn_max).all());
        }
    }

    #[test]
    fn reset_clears_everything_and_restarts_ids() {
        let mut rig = Rig::new();
        rig.spawn(TargetKind::Standard);
        rig.spawn(TargetKind::Cover);
        rig.with(|m, ctx| m.reset(ctx));
        assert_eq!(rig.manager.active_count(), 0);
        assert_eq!(rig.renderer.live_count(), 0);
        assert_eq!(rig.spawn(TargetKind::Standard), TargetId(0));
        assert!((rig.manager.next_interval - 0.65).abs() < 1e-6);
    }
}
