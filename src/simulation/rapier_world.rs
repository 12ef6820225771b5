//! [`PhysicsEngine`] backend on rapier2d
//!
//! Rapier works in SI-style units (length/s, length/s²); the runtime talks
//! in ticks. This adapter owns the whole rapier pipeline and converts at
//! the boundary:
//!
//! - velocity:   px/tick × fps            = px/s
//! - force:      mass·px/tick² × fps²     = mass·px/s²
//! - gravity:    scale × 1e6              = px/s² along +y (Y down)
//! - frictionAir (fraction lost per tick) → linear damping
//!
//! Collider density is chosen so that rapier's mass equals the body's
//! declared mass.

use std::collections::HashMap;

use log::debug;
use rapier2d_f64::prelude::*;

use crate::error::EngineError;
use crate::simulation::engine::{BodyDesc, BodyHandle, PhysicsEngine, ShapeDesc};
use crate::simulation::states::{BodyState, Material, NVec2};
use crate::simulation::units::{FRAME_RATE, GRAVITY_SCALE_DIVISOR};

/// Per-body data rapier does not keep in the form we need
#[derive(Debug, Clone)]
struct BodyMeta {
    label: String,
    area: f64,
    mass: f64,
    material: Material,
}

pub struct RapierWorld {
    frame_rate: f64, // nominal ticks per second
    gravity_scale: f64,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    meta: HashMap<RigidBodyHandle, BodyMeta>,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(FRAME_RATE)
    }
}

fn to_rapier(handle: BodyHandle) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(handle.index, handle.generation)
}

fn from_rapier(handle: RigidBodyHandle) -> BodyHandle {
    let (index, generation) = handle.into_raw_parts();
    BodyHandle { index, generation }
}

/// Linear damping that removes `friction_air` of the velocity every tick
fn damping_for(friction_air: f64, frame_rate: f64) -> f64 {
    let fa = friction_air.clamp(0.0, 0.999);
    fa * frame_rate / (1.0 - fa)
}

fn convex_piece(vertices: &[NVec2]) -> Result<SharedShape, EngineError> {
    let points: Vec<Point<Real>> = vertices.iter().map(|v| point![v.x, v.y]).collect();
    SharedShape::convex_polyline(points)
        .ok_or_else(|| EngineError::InvalidShape(format!("{} vertices are not a convex outline", vertices.len())))
}

fn shared_shape(shape: &ShapeDesc) -> Result<SharedShape, EngineError> {
    match shape {
        ShapeDesc::Rectangle { width, height } => {
            if !(*width > 0.0 && *height > 0.0) {
                return Err(EngineError::InvalidShape(format!("rectangle {width}×{height}")));
            }
            Ok(SharedShape::cuboid(width / 2.0, height / 2.0))
        }
        ShapeDesc::Circle { radius } => {
            if !(*radius > 0.0) {
                return Err(EngineError::InvalidShape(format!("circle radius {radius}")));
            }
            Ok(SharedShape::ball(*radius))
        }
        ShapeDesc::Polygon { vertices } => convex_piece(vertices),
        ShapeDesc::Compound { pieces, .. } => {
            let parts = pieces
                .iter()
                .map(|piece| Ok((Isometry::identity(), convex_piece(piece)?)))
                .collect::<Result<Vec<_>, EngineError>>()?;
            if parts.is_empty() {
                return Err(EngineError::InvalidShape("compound shape has no pieces".into()));
            }
            Ok(SharedShape::compound(parts))
        }
    }
}

impl RapierWorld {
    pub fn new(frame_rate: f64) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = 1.0 / frame_rate;
        Self {
            frame_rate,
            gravity_scale: 0.0,
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            meta: HashMap::new(),
        }
    }

    fn body(&self, handle: BodyHandle) -> Result<&RigidBody, EngineError> {
        self.rigid_body_set
            .get(to_rapier(handle))
            .ok_or_else(|| EngineError::UnknownBody(handle.to_string()))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, EngineError> {
        self.rigid_body_set
            .get_mut(to_rapier(handle))
            .ok_or_else(|| EngineError::UnknownBody(handle.to_string()))
    }

    fn meta(&self, handle: BodyHandle) -> Result<&BodyMeta, EngineError> {
        self.meta
            .get(&to_rapier(handle))
            .ok_or_else(|| EngineError::UnknownBody(handle.to_string()))
    }

    /// Rapier's own view of mass, for checks against the declared value
    pub fn rapier_mass(&self, handle: BodyHandle) -> Option<f64> {
        self.rigid_body_set.get(to_rapier(handle)).map(|b| b.mass())
    }

    fn collider_handles(&self, handle: BodyHandle) -> Result<Vec<ColliderHandle>, EngineError> {
        Ok(self.body(handle)?.colliders().to_vec())
    }

    fn update_colliders(
        &mut self,
        handle: BodyHandle,
        mut f: impl FnMut(&mut Collider),
    ) -> Result<(), EngineError> {
        for ch in self.collider_handles(handle)? {
            if let Some(collider) = self.collider_set.get_mut(ch) {
                f(collider);
            }
        }
        Ok(())
    }
}

impl PhysicsEngine for RapierWorld {
    fn set_gravity_scale(&mut self, scale: f64) {
        self.gravity_scale = scale;
    }

    fn gravity_scale(&self) -> f64 {
        self.gravity_scale
    }

    fn add_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, EngineError> {
        let shape = shared_shape(&desc.shape)?;
        let area = desc.shape.area();
        if !(area > 0.0 && desc.mass.is_finite() && desc.mass > 0.0) {
            return Err(EngineError::InvalidShape(format!(
                "{}: area {area}, mass {}",
                desc.label, desc.mass
            )));
        }

        let fps = self.frame_rate;
        let s = desc.state;
        let damping = damping_for(desc.material.friction_air, fps);
        let mut builder = if desc.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        }
        .translation(vector![s.position.x, s.position.y])
        .rotation(s.angle)
        .linvel(vector![s.velocity.x * fps, s.velocity.y * fps])
        .angvel(s.angular_velocity * fps)
        .linear_damping(damping)
        .angular_damping(damping)
        .can_sleep(false);
        if desc.fixed_rotation {
            builder = builder.lock_rotations();
        }
        let rb = self.rigid_body_set.insert(builder.build());

        let collider = ColliderBuilder::new(shape)
            .density(desc.mass / area)
            .restitution(desc.material.restitution)
            .friction(desc.material.friction)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .build();
        self.collider_set
            .insert_with_parent(collider, rb, &mut self.rigid_body_set);

        self.meta.insert(
            rb,
            BodyMeta {
                label: desc.label.clone(),
                area,
                mass: desc.mass,
                material: desc.material,
            },
        );
        let handle = from_rapier(rb);
        debug!("rapier: added {} as {handle}", desc.label);
        Ok(handle)
    }

    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), EngineError> {
        let rb = to_rapier(handle);
        self.rigid_body_set
            .remove(
                rb,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .ok_or_else(|| EngineError::UnknownBody(handle.to_string()))?;
        if let Some(meta) = self.meta.remove(&rb) {
            debug!("rapier: removed {} ({handle})", meta.label);
        }
        Ok(())
    }

    fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    fn body_state(&self, handle: BodyHandle) -> Result<BodyState, EngineError> {
        let body = self.body(handle)?;
        let fps = self.frame_rate;
        let t = body.translation();
        let v = body.linvel();
        Ok(BodyState {
            position: NVec2::new(t.x, t.y),
            angle: body.rotation().angle(),
            velocity: NVec2::new(v.x / fps, v.y / fps),
            angular_velocity: body.angvel() / fps,
        })
    }

    fn set_position(&mut self, handle: BodyHandle, position: NVec2) -> Result<(), EngineError> {
        let body = self.body_mut(handle)?;
        let angle = body.rotation().angle();
        body.set_position(Isometry::new(vector![position.x, position.y], angle), true);
        Ok(())
    }

    fn set_angle(&mut self, handle: BodyHandle, angle: f64) -> Result<(), EngineError> {
        let body = self.body_mut(handle)?;
        let t = *body.translation();
        body.set_position(Isometry::new(t, angle), true);
        Ok(())
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: NVec2) -> Result<(), EngineError> {
        let fps = self.frame_rate;
        self.body_mut(handle)?
            .set_linvel(vector![velocity.x * fps, velocity.y * fps], true);
        Ok(())
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, omega: f64) -> Result<(), EngineError> {
        let fps = self.frame_rate;
        self.body_mut(handle)?.set_angvel(omega * fps, true);
        Ok(())
    }

    fn mass(&self, handle: BodyHandle) -> Result<f64, EngineError> {
        Ok(self.meta(handle)?.mass)
    }

    fn set_mass(&mut self, handle: BodyHandle, mass: f64) -> Result<(), EngineError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(EngineError::InvalidShape(format!("mass {mass}")));
        }
        let area = self.meta(handle)?.area;
        self.update_colliders(handle, |c| c.set_density(mass / area))?;
        if let Some(meta) = self.meta.get_mut(&to_rapier(handle)) {
            meta.mass = mass;
        }
        Ok(())
    }

    fn material(&self, handle: BodyHandle) -> Result<Material, EngineError> {
        Ok(self.meta(handle)?.material)
    }

    fn set_material(&mut self, handle: BodyHandle, material: Material) -> Result<(), EngineError> {
        self.update_colliders(handle, |c| {
            c.set_restitution(material.restitution);
            c.set_friction(material.friction);
        })?;
        let damping = damping_for(material.friction_air, self.frame_rate);
        let body = self.body_mut(handle)?;
        body.set_linear_damping(damping);
        body.set_angular_damping(damping);
        if let Some(meta) = self.meta.get_mut(&to_rapier(handle)) {
            meta.material = material;
        }
        Ok(())
    }

    fn is_static(&self, handle: BodyHandle) -> Result<bool, EngineError> {
        Ok(self.body(handle)?.is_fixed())
    }

    fn set_static(&mut self, handle: BodyHandle, is_static: bool) -> Result<(), EngineError> {
        let body = self.body_mut(handle)?;
        if is_static {
            body.set_linvel(vector![0.0, 0.0], false);
            body.set_angvel(0.0, false);
            body.set_body_type(RigidBodyType::Fixed, true);
        } else {
            body.set_body_type(RigidBodyType::Dynamic, true);
        }
        Ok(())
    }

    fn apply_force(
        &mut self,
        handle: BodyHandle,
        point: NVec2,
        force: NVec2,
    ) -> Result<(), EngineError> {
        let k = self.frame_rate * self.frame_rate;
        self.body_mut(handle)?.add_force_at_point(
            vector![force.x * k, force.y * k],
            point![point.x, point.y],
            true,
        );
        Ok(())
    }

    fn step(&mut self, dt_ms: f64) {
        self.integration_parameters.dt = dt_ms / 1000.0;
        let gravity = vector![0.0, self.gravity_scale * GRAVITY_SCALE_DIVISOR];
        self.physics_pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        // forces act for a single step
        for (_, body) in self.rigid_body_set.iter_mut() {
            body.reset_forces(false);
        }
    }

    fn bodies_at_point(&self, point: NVec2) -> Vec<BodyHandle> {
        let pt = point![point.x, point.y];
        // collider poses only sync on step; go through the parent so a body
        // moved while paused is hit where it is drawn
        let mut hits: Vec<BodyHandle> = self
            .collider_set
            .iter()
            .filter_map(|(_, c)| {
                let parent = c.parent()?;
                let body = self.rigid_body_set.get(parent)?;
                let pose = c
                    .position_wrt_parent()
                    .map_or(*body.position(), |local| body.position() * local);
                c.shape()
                    .contains_point(&pose, &pt)
                    .then(|| from_rapier(parent))
            })
            .collect();
        hits.sort();
        hits.dedup();
        hits
    }
}
