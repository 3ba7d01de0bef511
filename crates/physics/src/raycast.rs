//! Raycasting for weapon hit detection and ground checks.

use std::collections::HashSet;

use crate::physics_world::{to_vec3, to_vector};
use crate::PhysicsWorld;
use engine_core::Vec3;
use rapier3d::prelude::*;

/// Result of a raycast query.
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    /// The body owning the struck collider. `None` for parentless colliders.
    pub body: Option<RigidBodyHandle>,
    /// The collider that was hit.
    pub collider: ColliderHandle,
    /// Distance along the ray to the hit point.
    pub distance: f32,
    /// World position of the hit.
    pub point: Vec3,
    /// Surface normal at the hit point.
    pub normal: Vec3,
}

/// Surfaces steeper than this (normal · up) are walls, not floor. Roughly 60°.
pub const GROUND_NORMAL_MIN_DOT: f32 = 0.5;

impl PhysicsWorld {
    fn make_hit(&self, ray: &Ray, collider: ColliderHandle, intersection: RayIntersection) -> RaycastHit {
        let point = ray.point_at(intersection.time_of_impact);
        RaycastHit {
            body: self.collider_set.get(collider).and_then(|c| c.parent()),
            collider,
            distance: intersection.time_of_impact,
            point: Vec3::new(point.x, point.y, point.z),
            normal: to_vec3(&intersection.normal),
        }
    }

    /// Every body the segment `origin → origin + direction * max_distance`
    /// passes through, closest first, one hit per body. `exclude` (usually the
    /// shooter) is skipped entirely.
    pub fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Vec<RaycastHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || !(max_distance > 0.0) {
            return Vec::new();
        }
        let ray = Ray::new(point![origin.x, origin.y, origin.z], to_vector(direction));

        let mut filter = QueryFilter::default();
        if let Some(body) = exclude {
            filter = filter.exclude_rigid_body(body);
        }
        let mut hits = Vec::new();

        self.query_pipeline.intersections_with_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter,
            |collider, intersection: RayIntersection| {
                hits.push(self.make_hit(&ray, collider, intersection));
                true // Continue searching
            },
        );

        // Sort by distance (use unwrap_or to avoid panic on NaN)
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));

        // A body with several colliders is only reported at its nearest one.
        let mut seen = HashSet::new();
        hits.retain(|hit| match hit.body {
            Some(body) => seen.insert(body),
            None => true,
        });
        hits
    }

    /// Cast a ray and return the first hit.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<RaycastHit> {
        self.cast_ray(origin, direction, max_distance, exclude)
            .into_iter()
            .next()
    }

    /// Short downward ray from a body's centre against fixed geometry only.
    /// Reports a hit when something walkable lies within `half_height + margin`.
    pub fn cast_ground(
        &self,
        body: RigidBodyHandle,
        half_height: f32,
        margin: f32,
    ) -> Option<RaycastHit> {
        let origin = to_vec3(self.rigid_body_set.get(body)?.translation());
        let ray = Ray::new(point![origin.x, origin.y, origin.z], vector![0.0, -1.0, 0.0]);
        let filter = QueryFilter::only_fixed().exclude_rigid_body(body);

        self.query_pipeline
            .cast_ray_and_get_normal(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                half_height + margin,
                true,
                filter,
            )
            .map(|(collider, intersection)| self.make_hit(&ray, collider, intersection))
            .filter(|hit| hit.normal.dot(Vec3::Y) > GROUND_NORMAL_MIN_DOT)
    }
}
