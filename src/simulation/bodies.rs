//! Body factory registry
//!
//! Maps a body `type` discriminant to a factory that turns real-world
//! geometry into an engine [`ShapeDesc`] in pixels. Built-ins:
//!
//! - `rectangle` width × height
//! - `circle`    radius
//! - `polygon`   regular polygon, `sides` and circumradius
//! - `vertex`    arbitrary simple outline, decomposed when concave
//!
//! Further kinds can be registered at runtime; the assembler skips any
//! object whose kind has no factory.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::configuration::config::BodyConfig;
use crate::error::ShapeError;
use crate::simulation::engine::ShapeDesc;
use crate::simulation::geometry::{decompose, prepare_outline};
use crate::simulation::states::NVec2;
use crate::simulation::units::UnitConverter;

/// Builds the pixel-space shape for one body kind
pub type BodyFactory =
    Box<dyn Fn(&BodyConfig, &UnitConverter) -> Result<ShapeDesc, ShapeError> + Send + Sync>;

pub struct BodyRegistry {
    factories: BTreeMap<String, BodyFactory>,
}

impl Default for BodyRegistry {
    /// Registry with the four built-in kinds
    fn default() -> Self {
        Self::new()
            .with("rectangle", rectangle)
            .with("circle", circle)
            .with("polygon", polygon)
            .with("vertex", vertex)
    }
}

impl BodyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register (or replace) the factory for `kind`
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&BodyConfig, &UnitConverter) -> Result<ShapeDesc, ShapeError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn with<F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&BodyConfig, &UnitConverter) -> Result<ShapeDesc, ShapeError> + Send + Sync + 'static,
    {
        self.register(kind, factory);
        self
    }

    pub fn factory(&self, kind: &str) -> Option<&BodyFactory> {
        self.factories.get(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

// =========================================================================================
// Built-in factories
// =========================================================================================

/// Positive, finite length converted to pixels
fn dimension(
    cfg: &BodyConfig,
    field: &'static str,
    value: Option<f64>,
    units: &UnitConverter,
) -> Result<f64, ShapeError> {
    let v = value.ok_or_else(|| ShapeError::MissingField {
        kind: cfg.kind.clone(),
        field,
    })?;
    if !(v.is_finite() && v > 0.0) {
        return Err(ShapeError::InvalidField {
            kind: cfg.kind.clone(),
            field,
            message: format!("must be a positive length, got {v}"),
        });
    }
    Ok(units.to_pixels_dimension(v))
}

pub fn rectangle(cfg: &BodyConfig, units: &UnitConverter) -> Result<ShapeDesc, ShapeError> {
    Ok(ShapeDesc::Rectangle {
        width: dimension(cfg, "width", cfg.width, units)?,
        height: dimension(cfg, "height", cfg.height, units)?,
    })
}

pub fn circle(cfg: &BodyConfig, units: &UnitConverter) -> Result<ShapeDesc, ShapeError> {
    Ok(ShapeDesc::Circle {
        radius: dimension(cfg, "radius", cfg.radius, units)?,
    })
}

/// Vertices of a regular polygon around the origin. The first vertex sits
/// half a central angle past the +x axis, so an even-sided polygon has a
/// flat bottom edge.
pub fn regular_polygon(sides: u32, radius: f64) -> Vec<NVec2> {
    let theta = 2.0 * PI / sides as f64;
    let offset = theta * 0.5;
    (0..sides)
        .map(|i| {
            let angle = offset + i as f64 * theta;
            NVec2::new(angle.cos() * radius, angle.sin() * radius)
        })
        .collect()
}

pub fn polygon(cfg: &BodyConfig, units: &UnitConverter) -> Result<ShapeDesc, ShapeError> {
    let sides = cfg.sides.ok_or_else(|| ShapeError::MissingField {
        kind: cfg.kind.clone(),
        field: "sides",
    })?;
    if sides < 3 {
        return Err(ShapeError::InvalidField {
            kind: cfg.kind.clone(),
            field: "sides",
            message: format!("need at least 3, got {sides}"),
        });
    }
    let radius = dimension(cfg, "radius", cfg.radius, units)?;
    Ok(ShapeDesc::Polygon {
        vertices: regular_polygon(sides, radius),
    })
}

/// Outline scaled to pixels (not Y-flipped), recentred on its centroid.
/// Concave outlines become a compound of convex pieces.
pub fn vertex(cfg: &BodyConfig, units: &UnitConverter) -> Result<ShapeDesc, ShapeError> {
    let raw = cfg.vertices.as_ref().ok_or_else(|| ShapeError::MissingField {
        kind: cfg.kind.clone(),
        field: "vertices",
    })?;
    if raw.iter().any(|v| !(v.x.is_finite() && v.y.is_finite())) {
        return Err(ShapeError::InvalidField {
            kind: cfg.kind.clone(),
            field: "vertices",
            message: "coordinates must be finite".into(),
        });
    }
    let scaled: Vec<NVec2> = raw
        .iter()
        .map(|v| NVec2::new(units.to_pixels_dimension(v.x), units.to_pixels_dimension(v.y)))
        .collect();

    let (outline, _centroid) = prepare_outline(&scaled)?;
    let mut pieces = decompose(&outline)?;
    if pieces.len() == 1 {
        let vertices = pieces.remove(0);
        return Ok(ShapeDesc::Polygon { vertices });
    }
    Ok(ShapeDesc::Compound { outline, pieces })
}
