//! Physics backend seam
//!
//! The runtime drives a rigid-body engine only through [`PhysicsEngine`].
//! Everything crossing this trait is in engine space (pixels, Y down,
//! per-tick velocities, force in mass·px/tick²); the backend is
//! responsible for mapping that onto its own units.
//!
//! - [`BodyHandle`] opaque, engine-owned body reference
//! - [`ShapeDesc`]  collision geometry, body-local, pixels
//! - [`BodyDesc`]   everything needed to create one body

use std::f64::consts::PI;
use std::fmt;

use crate::error::EngineError;
use crate::simulation::states::{BodyState, Material, NVec2};

/// Mass per px² used when a body declares no mass
pub const DEFAULT_DENSITY: f64 = 0.001;

/// Opaque reference to a body owned by an engine world.
/// Handles are never reused while a body is alive; a stale handle is
/// reported as [`EngineError::UnknownBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.index, self.generation)
    }
}

/// Collision geometry centred on the body origin
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeDesc {
    Rectangle { width: f64, height: f64 },
    Circle { radius: f64 },
    /// Single convex outline, counter-clockwise
    Polygon { vertices: Vec<NVec2> },
    /// Convex pieces of a concave outline. `outline` is kept for drawing.
    Compound {
        outline: Vec<NVec2>,
        pieces: Vec<Vec<NVec2>>,
    },
}

impl ShapeDesc {
    pub fn area(&self) -> f64 {
        match self {
            ShapeDesc::Rectangle { width, height } => width * height,
            ShapeDesc::Circle { radius } => PI * radius * radius,
            ShapeDesc::Polygon { vertices } => polygon_area(vertices).abs(),
            ShapeDesc::Compound { pieces, .. } => {
                pieces.iter().map(|p| polygon_area(p).abs()).sum()
            }
        }
    }

    /// Outline for drawing, body-local. Circles have none.
    pub fn outline(&self) -> Vec<NVec2> {
        match self {
            ShapeDesc::Rectangle { width, height } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                vec![
                    NVec2::new(-hw, -hh),
                    NVec2::new(hw, -hh),
                    NVec2::new(hw, hh),
                    NVec2::new(-hw, hh),
                ]
            }
            ShapeDesc::Circle { .. } => Vec::new(),
            ShapeDesc::Polygon { vertices } => vertices.clone(),
            ShapeDesc::Compound { outline, .. } => outline.clone(),
        }
    }
}

/// Signed shoelace area, positive for counter-clockwise
pub fn polygon_area(vertices: &[NVec2]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    0.5 * twice
}

/// Everything the engine needs to create one body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub label: String,
    pub shape: ShapeDesc,
    pub state: BodyState,
    pub material: Material,
    pub mass: f64,
    pub is_static: bool,
    pub fixed_rotation: bool, // infinite inertia
}

/// Rigid-body world operations used by the runtime
pub trait PhysicsEngine {
    /// Gravity as an engine gravity scale (see `UnitConverter::to_engine_gravity_scale`)
    fn set_gravity_scale(&mut self, scale: f64);
    fn gravity_scale(&self) -> f64;

    fn add_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, EngineError>;
    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), EngineError>;
    fn body_count(&self) -> usize;

    fn body_state(&self, handle: BodyHandle) -> Result<BodyState, EngineError>;
    fn set_position(&mut self, handle: BodyHandle, position: NVec2) -> Result<(), EngineError>;
    fn set_angle(&mut self, handle: BodyHandle, angle: f64) -> Result<(), EngineError>;
    fn set_velocity(&mut self, handle: BodyHandle, velocity: NVec2) -> Result<(), EngineError>;
    fn set_angular_velocity(&mut self, handle: BodyHandle, omega: f64) -> Result<(), EngineError>;

    fn mass(&self, handle: BodyHandle) -> Result<f64, EngineError>;
    fn set_mass(&mut self, handle: BodyHandle, mass: f64) -> Result<(), EngineError>;
    fn material(&self, handle: BodyHandle) -> Result<Material, EngineError>;
    fn set_material(&mut self, handle: BodyHandle, material: Material) -> Result<(), EngineError>;
    fn is_static(&self, handle: BodyHandle) -> Result<bool, EngineError>;
    fn set_static(&mut self, handle: BodyHandle, is_static: bool) -> Result<(), EngineError>;

    /// Force acting during the next step only, applied at `point` (world, px)
    fn apply_force(
        &mut self,
        handle: BodyHandle,
        point: NVec2,
        force: NVec2,
    ) -> Result<(), EngineError>;

    /// Advance the world by `dt_ms`
    fn step(&mut self, dt_ms: f64);

    /// Every body whose collision shape contains `point`
    fn bodies_at_point(&self, point: NVec2) -> Vec<BodyHandle>;
}
