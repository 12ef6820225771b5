//! Real-world units ⇄ engine space
//!
//! Real-world (scene config): origin bottom-left, Y up, lengths in the
//! scene unit, velocities per second.
//!
//! Engine space: origin top-left of a fixed canvas, Y down, lengths in
//! pixels, velocities and accelerations as per-tick deltas.
//!
//! Every `to_*` has an exact `from_*` inverse.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::simulation::property::{Conversion, Property};

pub const CANVAS_WIDTH: f64 = 800.0;
pub const CANVAS_HEIGHT: f64 = 600.0;
pub const FRAME_RATE: f64 = 60.0;

/// Divisor mapping a real-world gravity to the engine's gravity scale.
/// The engine applies gravity as `scale · Δt_ms²` per tick.
pub const GRAVITY_SCALE_DIVISOR: f64 = 1_000_000.0;

/// Length unit of a scene
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    M,
    Cm,
    Km,
    Ft,
    In,
}

impl Unit {
    pub fn label(self) -> &'static str {
        match self {
            Unit::M => "meters",
            Unit::Cm => "centimeters",
            Unit::Km => "kilometers",
            Unit::Ft => "feet",
            Unit::In => "inches",
        }
    }

    pub fn abbrev(self) -> &'static str {
        match self {
            Unit::M => "m",
            Unit::Cm => "cm",
            Unit::Km => "km",
            Unit::Ft => "ft",
            Unit::In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    pub unit: Unit,
    pub pixels_per_unit: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub frame_rate: f64, // ticks per second
}

impl UnitConverter {
    /// Converter on the default 800×600 canvas at 60 ticks/s
    pub fn new(unit: Unit, pixels_per_unit: f64) -> Result<Self, ConfigError> {
        Self::with_canvas(unit, pixels_per_unit, CANVAS_WIDTH, CANVAS_HEIGHT, FRAME_RATE)
    }

    pub fn with_canvas(
        unit: Unit,
        pixels_per_unit: f64,
        canvas_width: f64,
        canvas_height: f64,
        frame_rate: f64,
    ) -> Result<Self, ConfigError> {
        if !(pixels_per_unit.is_finite() && pixels_per_unit > 0.0) {
            return Err(ConfigError::invalid(
                "pixelsPerUnit",
                format!("must be a positive number, got {pixels_per_unit}"),
            ));
        }
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(ConfigError::invalid(
                "frameRate",
                format!("must be a positive number, got {frame_rate}"),
            ));
        }
        Ok(Self {
            unit,
            pixels_per_unit,
            canvas_width,
            canvas_height,
            frame_rate,
        })
    }

    pub fn unit_label(&self) -> &'static str {
        self.unit.abbrev()
    }

    /// Canvas size in scene units
    pub fn simulation_dimensions(&self) -> (f64, f64) {
        (
            self.canvas_width / self.pixels_per_unit,
            self.canvas_height / self.pixels_per_unit,
        )
    }

    // ==========================================
    // Position
    // ==========================================

    pub fn to_pixels_x(&self, value: f64) -> f64 {
        value * self.pixels_per_unit
    }

    pub fn from_pixels_x(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_unit
    }

    pub fn to_pixels_y(&self, value: f64) -> f64 {
        self.canvas_height - value * self.pixels_per_unit
    }

    pub fn from_pixels_y(&self, pixels: f64) -> f64 {
        (self.canvas_height - pixels) / self.pixels_per_unit
    }

    // ==========================================
    // Velocity and acceleration (per tick in engine space)
    // ==========================================

    pub fn to_pixels_velocity_x(&self, value: f64) -> f64 {
        value * self.pixels_per_unit / self.frame_rate
    }

    pub fn from_pixels_velocity_x(&self, pixels: f64) -> f64 {
        pixels * self.frame_rate / self.pixels_per_unit
    }

    pub fn to_pixels_velocity_y(&self, value: f64) -> f64 {
        -value * self.pixels_per_unit / self.frame_rate
    }

    pub fn from_pixels_velocity_y(&self, pixels: f64) -> f64 {
        -pixels * self.frame_rate / self.pixels_per_unit
    }

    // ==========================================
    // Dimensions (scale only)
    // ==========================================

    pub fn to_pixels_dimension(&self, value: f64) -> f64 {
        value * self.pixels_per_unit
    }

    pub fn from_pixels_dimension(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_unit
    }

    // ==========================================
    // Rotation (the Y flip reverses the sense of rotation)
    // ==========================================

    pub fn to_pixels_angle(&self, radians: f64) -> f64 {
        -radians
    }

    pub fn from_pixels_angle(&self, radians: f64) -> f64 {
        -radians
    }

    pub fn to_pixels_angular_velocity(&self, radians_per_s: f64) -> f64 {
        -radians_per_s / self.frame_rate
    }

    pub fn from_pixels_angular_velocity(&self, radians_per_tick: f64) -> f64 {
        -radians_per_tick * self.frame_rate
    }

    // ==========================================
    // Forces (engine force = mass · px / tick²)
    // ==========================================

    pub fn to_pixels_force_x(&self, newtons: f64) -> f64 {
        newtons * self.pixels_per_unit / (self.frame_rate * self.frame_rate)
    }

    pub fn to_pixels_force_y(&self, newtons: f64) -> f64 {
        -newtons * self.pixels_per_unit / (self.frame_rate * self.frame_rate)
    }

    // ==========================================
    // Gravity
    // ==========================================

    /// Engine gravity scale for a real-world downward acceleration.
    pub fn to_engine_gravity_scale(&self, gravity: f64) -> f64 {
        gravity * self.pixels_per_unit / GRAVITY_SCALE_DIVISOR
    }

    // ==========================================
    // Property dispatch
    // ==========================================

    pub fn to_pixels(&self, conversion: Conversion, value: f64) -> f64 {
        match conversion {
            Conversion::PositionX => self.to_pixels_x(value),
            Conversion::PositionY => self.to_pixels_y(value),
            Conversion::MotionX => self.to_pixels_velocity_x(value),
            Conversion::MotionY => self.to_pixels_velocity_y(value),
            Conversion::Angle => self.to_pixels_angle(value),
            Conversion::AngularVelocity => self.to_pixels_angular_velocity(value),
            Conversion::Dimension => self.to_pixels_dimension(value),
            Conversion::Raw => value,
        }
    }

    pub fn from_pixels(&self, conversion: Conversion, pixels: f64) -> f64 {
        match conversion {
            Conversion::PositionX => self.from_pixels_x(pixels),
            Conversion::PositionY => self.from_pixels_y(pixels),
            Conversion::MotionX => self.from_pixels_velocity_x(pixels),
            Conversion::MotionY => self.from_pixels_velocity_y(pixels),
            Conversion::Angle => self.from_pixels_angle(pixels),
            Conversion::AngularVelocity => self.from_pixels_angular_velocity(pixels),
            Conversion::Dimension => self.from_pixels_dimension(pixels),
            Conversion::Raw => pixels,
        }
    }

    pub fn to_pixels_property(&self, property: Property, value: f64) -> f64 {
        self.to_pixels(property.conversion(), value)
    }

    pub fn from_pixels_property(&self, property: Property, pixels: f64) -> f64 {
        self.from_pixels(property.conversion(), pixels)
    }

    /// Conversion class for a raw dotted path. Paths that name no known
    /// property are treated as dimensions (scale only).
    pub fn conversion_for_path(path: &str) -> Conversion {
        match path.parse::<Property>() {
            Ok(p) => p.conversion(),
            Err(_) => {
                log::debug!("unrecognised property path `{path}`, converting as a dimension");
                Conversion::Dimension
            }
        }
    }

    pub fn to_pixels_path(&self, path: &str, value: f64) -> f64 {
        self.to_pixels(Self::conversion_for_path(path), value)
    }

    pub fn from_pixels_path(&self, path: &str, pixels: f64) -> f64 {
        self.from_pixels(Self::conversion_for_path(path), pixels)
    }
}
