//! The range pistol: magazine, cooldown, reload timer and penetrating hitscan.

use audio::SoundId;
use engine_core::{Transform, Vec3};
use physics::{BodyTag, RaycastHit, RigidBodyHandle};

use crate::collab::FrameContext;
use crate::config::WeaponConfig;
use crate::spawner::{HitOutcome, HitResult, TargetManager};
use crate::target::TargetId;

/// What the weapon can do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponState {
    Ready,
    /// Between shots.
    Cooling,
    Reloading,
}

/// One target the shot resolved against, in ray order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedHit {
    pub outcome: HitOutcome,
    pub point: Vec3,
    /// Penetration power left when the shot reached this target.
    pub power: f32,
}

/// Everything one pull of the trigger did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotReport {
    /// A round left the barrel.
    pub fired: bool,
    /// The trigger met an empty magazine.
    pub empty: bool,
    pub reload_started: bool,
    pub hits: Vec<ResolvedHit>,
    /// Where a non-target body stopped the shot.
    pub obstruction: Option<Vec3>,
    /// Fired but no target was struck.
    pub missed: bool,
}

/// Player weapon state.
#[derive(Debug, Clone)]
pub struct Weapon {
    pub max_ammo: u32,
    pub ammo: u32,
    pub reserve_ammo: u32,
    pub reload_time: f32,
    pub cooldown: f32,
    pub range: f32,
    pub damage: u32,
    pub penetration_reduction: f32,

    // State
    pub time_since_last_shot: f32,
    pub reload_timer: f32,
    pub is_reloading: bool,

    config: WeaponConfig,
}

impl Weapon {
    pub fn new(config: &WeaponConfig) -> Self {
        Self {
            max_ammo: config.max_ammo,
            ammo: config.max_ammo,
            reserve_ammo: config.reserve_ammo,
            reload_time: config.reload_time,
            cooldown: config.cooldown,
            range: config.range,
            damage: config.damage,
            penetration_reduction: config.penetration_reduction,
            // The first shot is never held back by the cooldown.
            time_since_last_shot: config.cooldown,
            reload_timer: 0.0,
            is_reloading: false,
            config: config.clone(),
        }
    }

    /// Full magazine and reserve, no reload in progress.
    pub fn reset(&mut self) {
        *self = Self::new(&self.config);
    }

    pub fn state(&self) -> WeaponState {
        if self.is_reloading {
            WeaponState::Reloading
        } else if self.time_since_last_shot < self.cooldown {
            WeaponState::Cooling
        } else {
            WeaponState::Ready
        }
    }

    /// Advance timers. Returns true on the frame a reload completes.
    pub fn update(&mut self, dt: f32) -> bool {
        self.time_since_last_shot += dt;

        if self.is_reloading {
            self.reload_timer -= dt;
            if self.reload_timer <= 0.0 {
                self.finish_reload();
                return true;
            }
        }
        false
    }

    /// 0 at reload start, 1 when done. 0 when not reloading.
    pub fn reload_progress(&self) -> f32 {
        if !self.is_reloading || self.reload_time <= 0.0 {
            return 0.0;
        }
        (1.0 - self.reload_timer / self.reload_time).clamp(0.0, 1.0)
    }

    /// Start reloading. Does nothing when full, already reloading or out of reserve.
    pub fn start_reload(&mut self) -> bool {
        if self.is_reloading || self.ammo >= self.max_ammo || self.reserve_ammo == 0 {
            return false;
        }
        self.is_reloading = true;
        self.reload_timer = self.reload_time;
        log::info!("Reloading ({} in reserve)", self.reserve_ammo);
        true
    }

    /// `start_reload` plus the reload sound.
    pub fn reload(&mut self, ctx: &mut FrameContext) -> bool {
        let started = self.start_reload();
        if started {
            ctx.audio.play(SoundId::Reload, None, self.config.reload_volume);
        }
        started
    }

    fn finish_reload(&mut self) {
        let needed = self.max_ammo.saturating_sub(self.ammo);
        let moved = needed.min(self.reserve_ammo);

        self.ammo += moved;
        self.reserve_ammo -= moved;
        self.is_reloading = false;
        self.reload_timer = 0.0;
        log::info!("Reload complete: {} / {}", self.ammo, self.reserve_ammo);
    }

    /// Pull the trigger. Blocked while reloading or cooling down; an empty
    /// magazine starts a reload instead of firing.
    pub fn trigger_shoot(
        &mut self,
        viewpoint: &Transform,
        shooter: RigidBodyHandle,
        targets: &mut TargetManager,
        ctx: &mut FrameContext,
    ) -> ShotReport {
        let mut report = ShotReport::default();
        if self.state() != WeaponState::Ready {
            return report;
        }
        if self.ammo == 0 {
            report.empty = true;
            ctx.audio.play(SoundId::EmptyClip, None, self.config.empty_volume);
            report.reload_started = self.reload(ctx);
            return report;
        }

        self.ammo -= 1;
        self.time_since_last_shot = 0.0;
        report.fired = true;
        ctx.audio.play(SoundId::Shoot, None, self.config.shoot_volume);

        // All hits are gathered before any target is touched, so removals
        // below cannot disturb the query.
        let hits = ctx
            .physics
            .cast_ray(viewpoint.position, viewpoint.forward(), self.range, Some(shooter));
        let tagged: Vec<(Option<BodyTag>, RaycastHit)> = hits
            .into_iter()
            .map(|hit| (hit.body.and_then(|b| ctx.physics.body_tag(b)), hit))
            .collect();

        self.resolve_penetration(&tagged, targets, ctx, &mut report);

        if report.hits.is_empty() {
            report.missed = true;
            ctx.audio.play(SoundId::Miss, None, self.config.miss_volume);
        }
        log::debug!(
            "Shot: {} target hit(s), ammo {} / {}",
            report.hits.len(),
            self.ammo,
            self.reserve_ammo
        );
        report
    }

    fn resolve_penetration(
        &self,
        hits: &[(Option<BodyTag>, RaycastHit)],
        targets: &mut TargetManager,
        ctx: &mut FrameContext,
        report: &mut ShotReport,
    ) {
        let mut power = 1.0_f32;

        for (tag, hit) in hits {
            if power <= 0.0 {
                break;
            }
            let Some(BodyTag::Target(id)) = tag else {
                // Ground, walls, obstacles and untagged bodies stop the round.
                report.obstruction = Some(hit.point);
                break;
            };

            match targets.process_hit(TargetId(*id), hit.point, hit.normal, self.damage, ctx) {
                // Removed earlier this frame; nothing there any more.
                HitResult::Stale => continue,
                HitResult::Hit(outcome) => {
                    report.hits.push(ResolvedHit { outcome, point: hit.point, power });
                    if outcome.was_penetrable && !outcome.destroyed {
                        power -= self.penetration_reduction;
                    } else {
                        power = 0.0;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{NullRenderer, RecordingAudio, VisualIds};
    use crate::config::TargetConfig;
    use crate::target::TargetKind;
    use audio::SoundId;
    use engine_core::Quat;
    use physics::{BodyDesc, BodyShape, ColliderHandle, PhysicsWorld};
    use rand::{rngs::StdRng, SeedableRng};

    const EYE: Vec3 = Vec3::new(0.0, 1.6, 5.0);

    struct Range {
        physics: PhysicsWorld,
        renderer: NullRenderer,
        audio: RecordingAudio,
        visuals: VisualIds,
        targets: TargetManager,
        shooter: RigidBodyHandle,
        weapon: Weapon,
    }

    impl Range {
        fn new() -> Self {
            let mut physics = PhysicsWorld::new();
            let shooter = physics.add_body(&BodyDesc::fixed(BodyShape::Ball { radius: 0.3 }, EYE));
            Self {
                physics,
                renderer: NullRenderer::new(),
                audio: RecordingAudio::new(),
                visuals: VisualIds::new(),
                targets: TargetManager::new(&TargetConfig::default(), 0.1, StdRng::seed_from_u64(9)),
                shooter,
                weapon: Weapon::new(&WeaponConfig::default()),
            }
        }

        fn ctx(&mut self) -> (&mut Weapon, &mut TargetManager, FrameContext<'_>) {
            (
                &mut self.weapon,
                &mut self.targets,
                FrameContext {
                    physics: &mut self.physics,
                    renderer: &mut self.renderer,
                    audio: &mut self.audio,
                    visuals: &mut self.visuals,
                },
            )
        }

        fn put(&mut self, kind: TargetKind, z: f32) -> TargetId {
            let (_, targets, mut ctx) = self.ctx();
            targets.spawn(kind, Vec3::new(0.0, EYE.y, z), Quat::IDENTITY, &mut ctx)
        }

        fn wall(&mut self, z: f32) {
            self.physics.add_body(&BodyDesc::fixed(
                BodyShape::Cuboid { half_extents: Vec3::new(2.0, 3.0, 0.2) },
                Vec3::new(0.0, 1.5, z),
            ));
        }

        fn shoot(&mut self) -> ShotReport {
            let shooter = self.shooter;
            let (weapon, targets, mut ctx) = self.ctx();
            weapon.trigger_shoot(&Transform::from_yaw_pitch(EYE, 0.0, 0.0), shooter, targets, &mut ctx)
        }

        fn health(&self, id: TargetId) -> Option<u32> {
            self.targets.get(id).map(|t| t.health)
        }
    }

    fn kinds(report: &ShotReport) -> Vec<(TargetKind, bool)> {
        report.hits.iter().map(|h| (h.outcome.kind, h.outcome.destroyed)).collect()
    }

    #[test]
    fn destroyed_target_stops_the_shot() {
        let mut range = Range::new();
        let front = range.put(TargetKind::Standard, -5.0);
        let back = range.put(TargetKind::Standard, -8.0);

        let report = range.shoot();

        assert_eq!(kinds(&report), vec![(TargetKind::Standard, true)]);
        assert_eq!(report.hits[0].outcome.id, front);
        assert!(range.targets.contains(back));
        assert_eq!(range.health(back), Some(1));
        assert!(!report.missed);
    }

    #[test]
    fn cover_destroyed_by_the_shot_does_not_let_it_through() {
        let mut range = Range::new();
        let cover = range.put(TargetKind::Cover, -3.0);
        let behind = range.put(TargetKind::Standard, -8.0);
        for _ in 0..2 {
            let (_, targets, mut ctx) = range.ctx();
            targets.process_hit(cover, Vec3::new(0.0, EYE.y, -2.8), Vec3::Z, 1, &mut ctx);
        }
        assert_eq!(range.health(cover), Some(1));

        let report = range.shoot();

        assert_eq!(kinds(&report), vec![(TargetKind::Cover, true)]);
        assert!(!range.targets.contains(cover));
        assert!(range.targets.contains(behind));
    }

    #[test]
    fn wall_in_front_of_a_target_is_a_miss() {
        let mut range = Range::new();
        range.wall(-3.0);
        let target = range.put(TargetKind::Standard, -8.0);

        let report = range.shoot();

        assert!(report.fired);
        assert!(report.hits.is_empty());
        assert!(report.missed);
        let stop = report.obstruction.unwrap();
        assert!((stop.z - -2.8).abs() < 1e-3);
        assert!(range.targets.contains(target));
        assert_eq!(range.audio.count(SoundId::Miss), 1);
    }

    #[test]
    fn second_cover_uses_up_the_remaining_power() {
        let mut range = Range::new();
        let first = range.put(TargetKind::Cover, -3.0);
        let second = range.put(TargetKind::Cover, -6.0);
        let last = range.put(TargetKind::Standard, -10.0);

        let report = range.shoot();

        assert_eq!(kinds(&report), vec![(TargetKind::Cover, false), (TargetKind::Cover, false)]);
        assert_eq!(report.hits[0].power, 1.0);
        assert!((report.hits[1].power - 0.3).abs() < 1e-6);
        assert_eq!(range.health(first), Some(2));
        assert_eq!(range.health(second), Some(2));
        assert_eq!(range.health(last), Some(1));
    }

    #[test]
    fn stale_hit_is_skipped_without_costing_power() {
        let mut range = Range::new();
        let gone = range.put(TargetKind::Cover, -3.0);
        let live = range.put(TargetKind::Standard, -8.0);
        {
            let (_, targets, mut ctx) = range.ctx();
            for _ in 0..3 {
                targets.process_hit(gone, Vec3::new(0.0, EYE.y, -2.8), Vec3::Z, 1, &mut ctx);
            }
        }
        assert!(!range.targets.contains(gone));

        let hit = |z: f32| RaycastHit {
            body: None,
            collider: ColliderHandle::invalid(),
            distance: EYE.z - z,
            point: Vec3::new(0.0, EYE.y, z),
            normal: Vec3::Z,
        };
        let hits = vec![
            (Some(BodyTag::Target(gone.0)), hit(-2.8)),
            (Some(BodyTag::Target(live.0)), hit(-7.85)),
        ];
        let mut report = ShotReport::default();
        let (weapon, targets, mut ctx) = range.ctx();
        weapon.resolve_penetration(&hits, targets, &mut ctx, &mut report);

        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].outcome.id, live);
        assert!(report.hits[0].outcome.destroyed);
        assert_eq!(report.hits[0].power, 1.0);
        assert_eq!(report.obstruction, None);
    }

    #[test]
    fn first_shot_is_ready() {
        let weapon = Weapon::new(&WeaponConfig::default());
        assert_eq!(weapon.state(), WeaponState::Ready);
        assert_eq!(weapon.ammo, 15);
        assert_eq!(weapon.reserve_ammo, 90);
    }

    #[test]
    fn reload_is_refused_when_full_or_without_reserve() {
        let mut weapon = Weapon::new(&WeaponConfig::default());
        assert!(!weapon.start_reload());

        weapon.ammo = 3;
        weapon.reserve_ammo = 0;
        assert!(!weapon.start_reload());
    }

    #[test]
    fn reload_never_overfills_the_magazine() {
        let mut weapon = Weapon::new(&WeaponConfig::default());
        weapon.ammo = 10;
        weapon.reserve_ammo = 500;
        assert!(weapon.start_reload());
        assert_eq!(weapon.state(), WeaponState::Reloading);
        assert!(!weapon.start_reload());

        assert!(!weapon.update(1.0));
        assert!(weapon.reload_progress() > 0.6);
        assert!(weapon.update(0.6));
        assert_eq!(weapon.ammo, 15);
        assert_eq!(weapon.reserve_ammo, 495);
        assert_eq!(weapon.state(), WeaponState::Ready);
    }

    #[test]
    fn reload_takes_what_reserve_has() {
        let mut weapon = Weapon::new(&WeaponConfig::default());
        weapon.ammo = 0;
        weapon.reserve_ammo = 4;
        weapon.start_reload();
        weapon.update(2.0);
        assert_eq!(weapon.ammo, 4);
        assert_eq!(weapon.reserve_ammo, 0);
    }

    #[test]
    fn cooldown_gates_the_next_shot() {
        let mut weapon = Weapon::new(&WeaponConfig::default());
        weapon.time_since_last_shot = 0.0;
        assert_eq!(weapon.state(), WeaponState::Cooling);
        weapon.update(0.05);
        assert_eq!(weapon.state(), WeaponState::Cooling);
        weapon.update(0.08);
        assert_eq!(weapon.state(), WeaponState::Ready);
    }

    #[test]
    fn reset_restores_everything() {
        let mut weapon = Weapon::new(&WeaponConfig::default());
        weapon.ammo = 0;
        weapon.reserve_ammo = 0;
        weapon.is_reloading = true;
        weapon.reset();
        assert_eq!(weapon.ammo, 15);
        assert_eq!(weapon.reserve_ammo, 90);
        assert!(!weapon.is_reloading);
    }
}
