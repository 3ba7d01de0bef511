//! Static range geometry: floor, boundary walls and optional scattered cover boxes.

use engine_core::{Quat, Transform, Vec3, VisualHandle};
use physics::{BodyDesc, BodyShape, RigidBodyHandle};
use rand::Rng;

use crate::collab::{FrameContext, VisualDesc, VisualKind};
use crate::config::ArenaConfig;

const GROUND_COLOR: u32 = 0x556b2f;
const WALL_COLOR: u32 = 0x808080;
const OBSTACLE_COLOR: u32 = 0x8b7d6b;

const OBSTACLE_MIN_SIZE: f32 = 1.5;
const OBSTACLE_MAX_SIZE: f32 = 5.0;
const OBSTACLE_MAX_HEIGHT: f32 = 7.5;
/// Obstacles stay inside ±this on X and Z.
const OBSTACLE_SPREAD: f32 = 45.0;
/// Keep the spawn point clear.
const OBSTACLE_CENTER_CLEARANCE: f32 = 5.0;
const OBSTACLE_PLACEMENT_ATTEMPTS: u32 = 30;

/// Handles of everything the arena put into the world.
#[derive(Debug, Default)]
pub struct Arena {
    pub bodies: Vec<RigidBodyHandle>,
    pub visuals: Vec<VisualHandle>,
    pub obstacle_positions: Vec<Vec3>,
}

impl Arena {
    /// Build the floor and walls, then try to scatter `obstacle_count` boxes.
    pub fn build(config: &ArenaConfig, rng: &mut impl Rng, ctx: &mut FrameContext) -> Self {
        let mut arena = Self::default();

        let ground = ctx.physics.add_ground_plane();
        let half = config.size * 0.5;
        arena.add_visual(
            ctx,
            ground,
            VisualKind::Ground,
            Vec3::new(half, 0.05, half),
            Transform::from_position(Vec3::new(0.0, -0.05, 0.0)),
            GROUND_COLOR,
        );

        let t = config.wall_thickness;
        let h = config.wall_height;
        let offset = half + t * 0.5;
        let walls = [
            // North / south span the corners.
            (Vec3::new(0.0, h * 0.5, -offset), Vec3::new(half + t, h * 0.5, t * 0.5)),
            (Vec3::new(0.0, h * 0.5, offset), Vec3::new(half + t, h * 0.5, t * 0.5)),
            // East / west.
            (Vec3::new(offset, h * 0.5, 0.0), Vec3::new(t * 0.5, h * 0.5, half)),
            (Vec3::new(-offset, h * 0.5, 0.0), Vec3::new(t * 0.5, h * 0.5, half)),
        ];
        for (position, half_extents) in walls {
            let body = ctx
                .physics
                .add_body(&BodyDesc::fixed(BodyShape::Cuboid { half_extents }, position));
            arena.add_visual(
                ctx,
                body,
                VisualKind::Wall,
                half_extents,
                Transform::from_position(position),
                WALL_COLOR,
            );
        }

        for _ in 0..config.obstacle_count {
            arena.place_obstacle(rng, ctx);
        }
        if arena.obstacle_positions.len() < config.obstacle_count {
            log::warn!(
                "Placed {} of {} obstacles, ran out of room",
                arena.obstacle_positions.len(),
                config.obstacle_count
            );
        }

        log::debug!(
            "Arena built: {} bodies, {} obstacles",
            arena.bodies.len(),
            arena.obstacle_positions.len()
        );
        arena
    }

    fn place_obstacle(&mut self, rng: &mut impl Rng, ctx: &mut FrameContext) -> bool {
        let spacing_sq = (OBSTACLE_MAX_SIZE + 1.0) * (OBSTACLE_MAX_SIZE + 1.0);

        for _ in 0..OBSTACLE_PLACEMENT_ATTEMPTS {
            let width = rng.gen_range(OBSTACLE_MIN_SIZE..OBSTACLE_MAX_SIZE);
            let depth = rng.gen_range(OBSTACLE_MIN_SIZE..OBSTACLE_MAX_SIZE);
            let height = rng.gen_range(OBSTACLE_MIN_SIZE..OBSTACLE_MAX_HEIGHT);
            let x = rng.gen_range(-OBSTACLE_SPREAD..OBSTACLE_SPREAD);
            let z = rng.gen_range(-OBSTACLE_SPREAD..OBSTACLE_SPREAD);

            let footprint = Vec3::new(x, 0.0, z);
            if footprint.length() < OBSTACLE_CENTER_CLEARANCE {
                continue;
            }
            if self
                .obstacle_positions
                .iter()
                .any(|p| Vec3::new(p.x, 0.0, p.z).distance_squared(footprint) < spacing_sq)
            {
                continue;
            }

            let position = Vec3::new(x, height * 0.5, z);
            let rotation = Quat::from_rotation_y(rng.gen_range(0.0..std::f32::consts::TAU));
            let half_extents = Vec3::new(width, height, depth) * 0.5;
            let body = ctx.physics.add_body(
                &BodyDesc::fixed(BodyShape::Cuboid { half_extents }, position)
                    .with_rotation(rotation),
            );
            self.add_visual(
                ctx,
                body,
                VisualKind::Obstacle,
                half_extents,
                Transform::from_position_rotation(position, rotation),
                OBSTACLE_COLOR,
            );
            self.obstacle_positions.push(position);
            return true;
        }
        false
    }

    fn add_visual(
        &mut self,
        ctx: &mut FrameContext,
        body: RigidBodyHandle,
        kind: VisualKind,
        half_extents: Vec3,
        transform: Transform,
        color: u32,
    ) {
        let handle = ctx.visuals.allocate();
        ctx.renderer.add_visual(handle, &VisualDesc { kind, half_extents, color, transform });
        self.bodies.push(body);
        self.visuals.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{NullRenderer, RecordingAudio, VisualIds};
    use physics::{BodyTag, PhysicsWorld};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn build(obstacles: usize, seed: u64) -> (Arena, PhysicsWorld, NullRenderer) {
        let mut physics = PhysicsWorld::new();
        let mut renderer = NullRenderer::new();
        let mut audio = RecordingAudio::new();
        let mut visuals = VisualIds::new();
        let config = ArenaConfig { obstacle_count: obstacles, ..ArenaConfig::default() };
        let mut rng = StdRng::seed_from_u64(seed);
        let arena = {
            let mut ctx = FrameContext {
                physics: &mut physics,
                renderer: &mut renderer,
                audio: &mut audio,
                visuals: &mut visuals,
            };
            Arena::build(&config, &mut rng, &mut ctx)
        };
        (arena, physics, renderer)
    }

    #[test]
    fn open_range_has_floor_and_four_walls() {
        let (arena, physics, renderer) = build(0, 1);
        assert_eq!(arena.bodies.len(), 5);
        assert_eq!(renderer.live_count(), 5);
        for body in &arena.bodies {
            assert_eq!(physics.body_tag(*body), Some(BodyTag::Environment));
        }
    }

    #[test]
    fn walls_stop_shots_at_the_boundary() {
        let (_, physics, _) = build(0, 1);
        let hit = physics
            .raycast(Vec3::new(0.0, 2.0, 0.0), -Vec3::Z, 300.0, None)
            .expect("north wall");
        assert!((hit.distance - 50.0).abs() < 1e-3);
    }

    #[test]
    fn obstacles_keep_clear_of_centre_and_each_other() {
        let (arena, _, _) = build(12, 7);
        assert!(!arena.obstacle_positions.is_empty());
        for (i, a) in arena.obstacle_positions.iter().enumerate() {
            assert!(Vec3::new(a.x, 0.0, a.z).length() >= OBSTACLE_CENTER_CLEARANCE);
            assert!(a.x.abs() <= OBSTACLE_SPREAD && a.z.abs() <= OBSTACLE_SPREAD);
            for b in &arena.obstacle_positions[i + 1..] {
                let d = Vec3::new(a.x - b.x, 0.0, a.z - b.z).length();
                assert!(d >= OBSTACLE_MAX_SIZE + 1.0);
            }
        }
    }
}
