//! Addressable body properties
//!
//! Config documents name properties with dotted paths (`"velocity.x"`).
//! They are parsed once, at load time, into [`Property`]; every read and
//! write afterwards goes through the typed accessors in this module.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::EngineError;
use crate::simulation::engine::{BodyHandle, PhysicsEngine};
use crate::simulation::states::NVec2;

/// How a property converts between real-world and engine units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    PositionX,
    PositionY,
    MotionX, // velocity or acceleration, per tick in engine space
    MotionY,
    Angle,
    AngularVelocity,
    Dimension, // scale only
    Raw,       // unitless or already in engine units
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    PositionX,
    PositionY,
    VelocityX,
    VelocityY,
    AccelerationX,
    AccelerationY,
    Angle,
    AngularVelocity,
    Mass,
    Restitution,
    Friction,
    FrictionStatic,
    FrictionAir,
    IsStatic,
}

/// A dotted path that names no known property
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown property path `{0}`")]
pub struct UnknownProperty(pub String);

impl Property {
    pub const ALL: [Property; 14] = [
        Property::PositionX,
        Property::PositionY,
        Property::VelocityX,
        Property::VelocityY,
        Property::AccelerationX,
        Property::AccelerationY,
        Property::Angle,
        Property::AngularVelocity,
        Property::Mass,
        Property::Restitution,
        Property::Friction,
        Property::FrictionStatic,
        Property::FrictionAir,
        Property::IsStatic,
    ];

    /// Canonical dotted path
    pub fn path(self) -> &'static str {
        match self {
            Property::PositionX => "position.x",
            Property::PositionY => "position.y",
            Property::VelocityX => "velocity.x",
            Property::VelocityY => "velocity.y",
            Property::AccelerationX => "acceleration.x",
            Property::AccelerationY => "acceleration.y",
            Property::Angle => "angle",
            Property::AngularVelocity => "angularVelocity",
            Property::Mass => "mass",
            Property::Restitution => "restitution",
            Property::Friction => "friction",
            Property::FrictionStatic => "frictionStatic",
            Property::FrictionAir => "frictionAir",
            Property::IsStatic => "isStatic",
        }
    }

    pub fn conversion(self) -> Conversion {
        match self {
            Property::PositionX => Conversion::PositionX,
            Property::PositionY => Conversion::PositionY,
            Property::VelocityX | Property::AccelerationX => Conversion::MotionX,
            Property::VelocityY | Property::AccelerationY => Conversion::MotionY,
            Property::Angle => Conversion::Angle,
            Property::AngularVelocity => Conversion::AngularVelocity,
            Property::Mass
            | Property::Restitution
            | Property::Friction
            | Property::FrictionStatic
            | Property::FrictionAir
            | Property::IsStatic => Conversion::Raw,
        }
    }

    /// Acceleration is derived by the runtime and cannot be written
    pub fn is_writable(self) -> bool {
        !matches!(self, Property::AccelerationX | Property::AccelerationY)
    }

    /// Display unit for readouts, given the scene's length unit
    pub fn unit_label(self, length: &str) -> String {
        match self.conversion() {
            Conversion::PositionX | Conversion::PositionY | Conversion::Dimension => {
                length.to_string()
            }
            Conversion::MotionX | Conversion::MotionY => match self {
                Property::AccelerationX | Property::AccelerationY => format!("{length}/s²"),
                _ => format!("{length}/s"),
            },
            Conversion::Angle => "rad".to_string(),
            Conversion::AngularVelocity => "rad/s".to_string(),
            Conversion::Raw => match self {
                Property::Mass => "kg".to_string(),
                _ => String::new(),
            },
        }
    }
}

impl FromStr for Property {
    type Err = UnknownProperty;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        // bare `x` / `y` predate the dotted form
        let path = match path {
            "x" => "position.x",
            "y" => "position.y",
            other => other,
        };
        Property::ALL
            .iter()
            .copied()
            .find(|p| p.path() == path)
            .ok_or_else(|| UnknownProperty(path.to_string()))
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// =========================================================================================
// Getter / setter table (engine units)
// =========================================================================================

impl Property {
    /// Engine-space value on a live body. `acceleration` comes from the
    /// runtime's side-table since the engine has no such property.
    pub fn read<E: PhysicsEngine + ?Sized>(
        self,
        engine: &E,
        handle: BodyHandle,
        acceleration: NVec2,
    ) -> Result<f64, EngineError> {
        let value = match self {
            Property::PositionX => engine.body_state(handle)?.position.x,
            Property::PositionY => engine.body_state(handle)?.position.y,
            Property::VelocityX => engine.body_state(handle)?.velocity.x,
            Property::VelocityY => engine.body_state(handle)?.velocity.y,
            Property::AccelerationX => acceleration.x,
            Property::AccelerationY => acceleration.y,
            Property::Angle => engine.body_state(handle)?.angle,
            Property::AngularVelocity => engine.body_state(handle)?.angular_velocity,
            Property::Mass => engine.mass(handle)?,
            Property::Restitution => engine.material(handle)?.restitution,
            Property::Friction => engine.material(handle)?.friction,
            Property::FrictionStatic => engine.material(handle)?.friction_static,
            Property::FrictionAir => engine.material(handle)?.friction_air,
            Property::IsStatic => {
                if engine.is_static(handle)? {
                    1.0
                } else {
                    0.0
                }
            }
        };
        Ok(value)
    }

    /// Write an engine-space value. Returns `false` for read-only properties.
    pub fn write<E: PhysicsEngine + ?Sized>(
        self,
        engine: &mut E,
        handle: BodyHandle,
        value: f64,
    ) -> Result<bool, EngineError> {
        match self {
            Property::PositionX | Property::PositionY => {
                let mut p = engine.body_state(handle)?.position;
                if self == Property::PositionX {
                    p.x = value;
                } else {
                    p.y = value;
                }
                engine.set_position(handle, p)?;
            }
            Property::VelocityX | Property::VelocityY => {
                let mut v = engine.body_state(handle)?.velocity;
                if self == Property::VelocityX {
                    v.x = value;
                } else {
                    v.y = value;
                }
                engine.set_velocity(handle, v)?;
            }
            Property::AccelerationX | Property::AccelerationY => return Ok(false),
            Property::Angle => engine.set_angle(handle, value)?,
            Property::AngularVelocity => engine.set_angular_velocity(handle, value)?,
            Property::Mass => engine.set_mass(handle, value)?,
            Property::Restitution
            | Property::Friction
            | Property::FrictionStatic
            | Property::FrictionAir => {
                let mut m = engine.material(handle)?;
                match self {
                    Property::Restitution => m.restitution = value,
                    Property::Friction => m.friction = value,
                    Property::FrictionStatic => m.friction_static = value,
                    _ => m.friction_air = value,
                }
                engine.set_material(handle, m)?;
            }
            Property::IsStatic => engine.set_static(handle, value != 0.0)?,
        }
        Ok(true)
    }
}
