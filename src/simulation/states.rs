//! Engine-space state types for bodies in a scene.
//!
//! All values here are in engine space: pixel positions with Y down,
//! velocities as per-tick deltas, angles with the engine's sense of
//! rotation.
//!
//! - `BodyState`    kinematic state read back from the engine each tick
//! - `Material`     contact and damping coefficients
//! - `InitialState` everything reset restores

use nalgebra::Vector2;
pub type NVec2 = Vector2<f64>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: NVec2, // centre of mass, px
    pub angle: f64, // radians
    pub velocity: NVec2, // px/tick
    pub angular_velocity: f64, // radians/tick
}

impl BodyState {
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.velocity.iter().all(|v| v.is_finite())
            && self.angle.is_finite()
            && self.angular_velocity.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub restitution: f64,
    pub friction: f64,
    pub friction_static: f64,
    pub friction_air: f64, // fraction of velocity lost per tick
}

/// Snapshot taken at assembly, restored by reset
#[derive(Debug, Clone, PartialEq)]
pub struct InitialState {
    pub state: BodyState,
    pub material: Material,
    pub mass: f64,
    pub is_static: bool,
}
