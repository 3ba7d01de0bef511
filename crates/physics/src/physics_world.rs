//! Physics world management with Rapier3D.

use std::panic::{self, AssertUnwindSafe};

use crate::collision::{decode_user_data, encode_user_data, BodyTag, CollisionGroup, MaterialTag};
use engine_core::{FixedStep, Quat, Transform, Vec3, VisualHandle};
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;

/// Gravity of the range, a little heavier than Earth so jumps feel snappy.
pub const DEFAULT_GRAVITY: f32 = -10.5;

/// Whether a body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Mass 0: ground, walls, obstacles.
    Fixed,
    Dynamic,
}

/// Collision shape of a body's single collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Cuboid { half_extents: Vec3 },
    Ball { radius: f32 },
    /// Infinite floor facing +Y through the body origin.
    Ground,
}

/// Everything needed to create one rigid body with one collider.
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub shape: BodyShape,
    pub position: Vec3,
    pub rotation: Quat,
    /// Total mass for dynamic bodies. Ignored for fixed ones.
    pub mass: f32,
    pub material: MaterialTag,
    pub group: CollisionGroup,
    pub tag: BodyTag,
    pub visual: Option<VisualHandle>,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub can_sleep: bool,
    /// Only allow rotation about world Y (upright characters).
    pub upright: bool,
}

impl BodyDesc {
    /// A fixed body in the environment group.
    pub fn fixed(shape: BodyShape, position: Vec3) -> Self {
        Self {
            kind: BodyKind::Fixed,
            shape,
            position,
            rotation: Quat::IDENTITY,
            mass: 0.0,
            material: MaterialTag::Ground,
            group: CollisionGroup::Environment,
            tag: BodyTag::Environment,
            visual: None,
            linear_damping: 0.0,
            angular_damping: 0.0,
            can_sleep: true,
            upright: false,
        }
    }

    pub fn dynamic(shape: BodyShape, position: Vec3, mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            mass,
            material: MaterialTag::Default,
            ..Self::fixed(shape, position)
        }
    }

    pub fn ground() -> Self {
        Self::fixed(BodyShape::Ground, Vec3::ZERO)
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_material(mut self, material: MaterialTag) -> Self {
        self.material = material;
        self
    }

    pub fn with_group(mut self, group: CollisionGroup) -> Self {
        self.group = group;
        self
    }

    pub fn with_tag(mut self, tag: BodyTag, visual: Option<VisualHandle>) -> Self {
        self.tag = tag;
        self.visual = visual;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    pub fn upright(mut self) -> Self {
        self.upright = true;
        self
    }
}

/// What a removed body was attached to, so the caller can dispose of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedBody {
    pub tag: BodyTag,
    pub visual: Option<VisualHandle>,
}

/// Outcome of one `step` call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    /// Fixed increments actually simulated.
    pub substeps: u32,
    /// Wall time discarded because the substep cap was hit.
    pub dropped: f32,
    /// A substep panicked or produced non-finite state; later substeps were skipped.
    pub faulted: bool,
}

/// Main physics world containing all simulation state.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
    clock: FixedStep,
    /// Simulated seconds since creation.
    time: f64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

pub(crate) fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_rotation(q: Quat) -> Rotation<Real> {
    UnitQuaternion::from_quaternion(rapier3d::na::Quaternion::new(q.w, q.x, q.y, q.z))
}

fn to_quat(r: &Rotation<Real>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w)
}

impl PhysicsWorld {
    /// Create a new physics world with the range's default gravity.
    pub fn new() -> Self {
        Self::with_gravity(DEFAULT_GRAVITY)
    }

    /// Create an empty world pulling along -Y with `gravity_y` (negative = down).
    pub fn with_gravity(gravity_y: f32) -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![0.0, gravity_y, 0.0],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            clock: FixedStep::new(),
            time: 0.0,
        }
    }

    /// Advance the simulation by `wall_dt` seconds of wall time using fixed
    /// increments of `fixed_dt`, never more than `max_substeps` in one call.
    ///
    /// A substep that panics inside the solver, or that leaves a body with a
    /// non-finite position, is logged and ends the call; the world keeps
    /// whatever state it had.
    pub fn step(&mut self, fixed_dt: f32, wall_dt: f32, max_substeps: u32) -> StepReport {
        let budget = self.clock.consume(fixed_dt, wall_dt, max_substeps);
        let mut report = StepReport {
            substeps: 0,
            dropped: budget.dropped,
            faulted: false,
        };
        if budget.dropped > 0.0 {
            log::trace!("physics dropped {:.3}s of wall time", budget.dropped);
        }

        self.integration_parameters.dt = fixed_dt;
        for _ in 0..budget.substeps {
            if let Err(reason) = self.step_once() {
                log::error!("physics step failed: {}", reason);
                report.faulted = true;
                break;
            }
            report.substeps += 1;
            self.time += fixed_dt as f64;
        }
        report
    }

    fn step_once(&mut self) -> Result<(), String> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.physics_pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.rigid_body_set,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &(),
                &(),
            );
        }));
        if let Err(payload) = outcome {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "solver panicked".to_string());
            return Err(reason);
        }

        let unstable = self
            .rigid_body_set
            .iter()
            .filter(|(_, body)| {
                let t = body.translation();
                !(t.x.is_finite() && t.y.is_finite() && t.z.is_finite())
            })
            .count();
        if unstable > 0 {
            return Err(format!("{} bodies left with non-finite positions", unstable));
        }
        Ok(())
    }

    /// Simulated time in seconds, advanced only by completed substeps.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Forget accumulated but unsimulated wall time.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }

    /// Update query pipeline for raycasting.
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Create a body and its collider, and make it visible to ray casts at once.
    pub fn add_body(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        let builder = match desc.kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .linear_damping(desc.linear_damping)
                .angular_damping(desc.angular_damping)
                .can_sleep(desc.can_sleep),
        };
        let mut builder = builder
            .translation(to_vector(desc.position))
            .rotation(to_rotation(desc.rotation).scaled_axis())
            .user_data(encode_user_data(desc.tag, desc.visual));
        if desc.upright {
            builder = builder.enabled_rotations(false, true, false);
        }
        let handle = self.rigid_body_set.insert(builder.build());

        let collider = match desc.shape {
            BodyShape::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            BodyShape::Ball { radius } => ColliderBuilder::ball(radius),
            BodyShape::Ground => ColliderBuilder::halfspace(Vector::y_axis()),
        };
        let mut collider = collider
            .friction(desc.material.friction())
            .restitution(desc.material.restitution())
            .friction_combine_rule(desc.material.combine_rule())
            .restitution_combine_rule(desc.material.combine_rule())
            .collision_groups(desc.group.interaction_groups());
        if desc.kind == BodyKind::Dynamic {
            collider = collider.mass(desc.mass.max(0.001));
        }
        self.collider_set
            .insert_with_parent(collider.build(), handle, &mut self.rigid_body_set);

        self.update_query_pipeline();
        handle
    }

    /// Add a ground plane at y = 0.
    pub fn add_ground_plane(&mut self) -> RigidBodyHandle {
        self.add_body(&BodyDesc::ground())
    }

    /// Remove a rigid body and its colliders. Returns what the body was tagged
    /// with so the owner can release the matching visual; `None` if the handle
    /// was already gone.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> Option<RemovedBody> {
        let body = self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        )?;
        self.update_query_pipeline();
        let (tag, visual) = decode_user_data(body.user_data);
        Some(RemovedBody { tag, visual })
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn body_tag(&self, handle: RigidBodyHandle) -> Option<BodyTag> {
        self.rigid_body_set
            .get(handle)
            .map(|body| decode_user_data(body.user_data).0)
    }

    /// Get the transform of a rigid body.
    pub fn body_transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.rigid_body_set.get(handle).map(|body| {
            Transform::from_position_rotation(to_vec3(body.translation()), to_quat(body.rotation()))
        })
    }

    pub fn is_sleeping(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .get(handle)
            .map(|body| body.is_sleeping())
            .unwrap_or(false)
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> Vec3 {
        self.rigid_body_set
            .get(handle)
            .map(|body| to_vec3(body.linvel()))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn set_linvel(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn angvel(&self, handle: RigidBodyHandle) -> Vec3 {
        self.rigid_body_set
            .get(handle)
            .map(|body| to_vec3(body.angvel()))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn set_angvel(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_angvel(to_vector(velocity), true);
        }
    }

    pub fn set_rotation(&mut self, handle: RigidBodyHandle, rotation: Quat) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_rotation(to_rotation(rotation), true);
        }
    }

    /// Teleport a body and zero its motion.
    pub fn teleport(&mut self, handle: RigidBodyHandle, position: Vec3, rotation: Quat) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(to_vector(position), true);
            body.set_rotation(to_rotation(rotation), true);
            body.set_linvel(Vector::zeros(), true);
            body.set_angvel(Vector::zeros(), true);
            body.reset_forces(true);
            body.reset_torques(true);
        }
    }

    /// Replace the persistent force on a body (rapier keeps forces across steps).
    pub fn set_force(&mut self, handle: RigidBodyHandle, force: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.reset_forces(true);
            body.add_force(to_vector(force), true);
        }
    }

    /// Apply an impulse to a dynamic body.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_impulse(to_vector(impulse), true);
        }
    }

    /// Apply an impulse at a world-space point, adding spin for off-centre hits.
    pub fn apply_impulse_at_point(&mut self, handle: RigidBodyHandle, impulse: Vec3, point: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_impulse_at_point(to_vector(impulse), point![point.x, point.y, point.z], true);
        }
    }

    pub fn mass(&self, handle: RigidBodyHandle) -> f32 {
        self.rigid_body_set
            .get(handle)
            .map(|body| body.mass())
            .unwrap_or(0.0)
    }
}
