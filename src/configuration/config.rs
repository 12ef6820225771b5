//! Configuration types for loading scenes from JSON (or YAML).
//!
//! This module defines the `serde`-deserializable scene document. A scene
//! consists of:
//!
//! - [`EnvironmentConfig`]  – walls, gravity, unit and scale
//! - [`ObjectConfig`]       – one rigid body with its initial state
//! - [`ControlConfig`]      – a slider or toggle bound to an object property
//! - [`OutputGroupConfig`]  – live readouts
//! - [`GraphConfig`]        – time-series graphs
//! - [`SceneConfig`]        – top-level wrapper
//!
//! # JSON format
//!
//! ```json
//! {
//!   "title": "Toss Ball",
//!   "description": "Throw a ball straight up",
//!   "environment": { "walls": ["bottom"], "gravity": 9.8, "unit": "m", "pixelsPerUnit": 10 },
//!   "objects": [
//!     { "id": "ball", "x": 40, "y": 5, "body": { "type": "circle", "radius": 2 },
//!       "velocity": { "x": 0, "y": 20 } }
//!   ],
//!   "controls": [
//!     { "type": "slider", "label": "Launch speed", "targetObj": "ball",
//!       "property": "velocity.y", "min": 0, "max": 30, "step": 0.5, "defaultValue": 20 }
//!   ],
//!   "outputs": [ { "title": "Ball", "values": [ { "label": "Height", "targetObj": "ball", "property": "position.y" } ] } ],
//!   "graphs": [ { "type": "line", "title": "Velocity", "yAxisRange": { "min": -30, "max": 30 },
//!                 "lines": [ { "label": "vy", "color": "#ff6bff", "targetObj": "ball", "property": "velocity.y" } ] } ]
//! }
//! ```
//!
//! Only `title` and `objects` are required. Discriminated items (`body`,
//! controls, graphs) keep their `type` as a string so that an unknown
//! variant is skipped at assembly instead of rejecting the whole document.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::simulation::units::Unit;

fn default_gravity() -> f64 {
    9.8
}

fn default_pixels_per_unit() -> f64 {
    10.0
}

/// Plain `{x, y}` pair in real-world units (Y-up).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2Config {
    pub x: f64,
    pub y: f64,
}

impl Vec2Config {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which canvas edges get a static wall.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Wall {
    Left,
    Right,
    Top,
    Bottom,
}

/// World boundaries and the real-world ⇄ pixel transform
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub walls: BTreeSet<Wall>, // which edges are closed
    #[serde(default = "default_gravity")]
    pub gravity: f64, // downward acceleration in unit/s²
    #[serde(default)]
    pub unit: Unit, // length unit of every value in the scene
    #[serde(default = "default_pixels_per_unit")]
    pub pixels_per_unit: f64, // scale, must be > 0
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            walls: BTreeSet::new(),
            gravity: default_gravity(),
            unit: Unit::default(),
            pixels_per_unit: default_pixels_per_unit(),
        }
    }
}

/// Shape descriptor. `kind` selects the factory in the body registry; the
/// remaining fields are read by whichever factory handles that kind.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BodyConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sides: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<Vec<Vec2Config>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl BodyConfig {
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self {
            kind: "rectangle".into(),
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn circle(radius: f64) -> Self {
        Self {
            kind: "circle".into(),
            radius: Some(radius),
            ..Self::default()
        }
    }

    pub fn polygon(sides: u32, radius: f64) -> Self {
        Self {
            kind: "polygon".into(),
            sides: Some(sides),
            radius: Some(radius),
            ..Self::default()
        }
    }

    pub fn vertex(vertices: Vec<Vec2Config>) -> Self {
        Self {
            kind: "vertex".into(),
            vertices: Some(vertices),
            ..Self::default()
        }
    }

    /// Required fields of the built-in kinds. Unknown kinds have none.
    fn required_fields(&self) -> &'static [&'static str] {
        match self.kind.as_str() {
            "rectangle" => &["width", "height"],
            "circle" => &["radius"],
            "polygon" => &["sides", "radius"],
            "vertex" => &["vertices"],
            _ => &[],
        }
    }

    fn has_field(&self, field: &str) -> bool {
        match field {
            "width" => self.width.is_some(),
            "height" => self.height.is_some(),
            "radius" => self.radius.is_some(),
            "sides" => self.sides.is_some(),
            "vertices" => self.vertices.is_some(),
            _ => false,
        }
    }
}

/// When a configured force starts acting
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForceMode {
    Impulse, // applied for a single tick
    #[default]
    Continuous, // applied every tick until pause or reset
}

/// Force applied to an object a fixed wall-clock delay after play
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedForceConfig {
    pub x: f64, // newtons (kg·unit/s²), +x right
    pub y: f64, // newtons, +y up
    #[serde(default)]
    pub mode: ForceMode,
    #[serde(default)]
    pub delay_ms: f64,
}

/// Configuration for a single body's initial state
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectConfig {
    pub id: String, // join key for controls, outputs and graphs
    pub x: f64, // real-world position, origin bottom-left
    pub y: f64,
    pub body: BodyConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec2Config>, // unit/s, +y up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<Vec2Config>, // unit/s², display seed only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restitution: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction_static: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction_air: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inertia: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>, // radians, counter-clockwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angular_velocity: Option<f64>, // radians/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_force: Option<AppliedForceConfig>,
}

impl ObjectConfig {
    pub const DEFAULT_RESTITUTION: f64 = 0.8;
    pub const DEFAULT_FRICTION: f64 = 0.1;
    pub const DEFAULT_FRICTION_STATIC: f64 = 0.5;
    pub const DEFAULT_FRICTION_AIR: f64 = 0.0;

    /// Minimal object with every optional field unset
    pub fn new(id: impl Into<String>, x: f64, y: f64, body: BodyConfig) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            body,
            velocity: None,
            acceleration: None,
            restitution: None,
            friction: None,
            friction_static: None,
            friction_air: None,
            inertia: None,
            is_static: None,
            mass: None,
            angle: None,
            angular_velocity: None,
            applied_force: None,
        }
    }
}

/// Value held by a control
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum ControlValue {
    Bool(bool),
    Number(f64),
}

impl ControlValue {
    pub fn as_f64(self) -> f64 {
        match self {
            ControlValue::Number(v) => v,
            ControlValue::Bool(true) => 1.0,
            ControlValue::Bool(false) => 0.0,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            ControlValue::Bool(b) => b,
            ControlValue::Number(v) => v != 0.0,
        }
    }
}

/// Interactive control. `kind` selects the entry in the control registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub target_obj: String,
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ControlValue>,
}

impl ControlConfig {
    pub fn slider(
        label: impl Into<String>,
        target_obj: impl Into<String>,
        property: impl Into<String>,
        (min, max, step): (f64, f64, f64),
        default_value: f64,
    ) -> Self {
        Self {
            kind: "slider".into(),
            label: label.into(),
            target_obj: target_obj.into(),
            property: property.into(),
            min: Some(min),
            max: Some(max),
            step: Some(step),
            default_value: Some(ControlValue::Number(default_value)),
        }
    }

    pub fn toggle(
        label: impl Into<String>,
        target_obj: impl Into<String>,
        property: impl Into<String>,
        default_value: bool,
    ) -> Self {
        Self {
            kind: "toggle".into(),
            label: label.into(),
            target_obj: target_obj.into(),
            property: property.into(),
            min: None,
            max: None,
            step: None,
            default_value: Some(ControlValue::Bool(default_value)),
        }
    }
}

/// One live readout
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputValueConfig {
    pub label: String,
    pub target_obj: String,
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>, // display label, derived when absent
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutputGroupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub values: Vec<OutputValueConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

/// One plotted line
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    pub label: String,
    #[serde(default)]
    pub color: String,
    pub target_obj: String,
    pub property: String,
}

/// Graph configuration. `kind` selects the entry in the graph registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_range: Option<AxisRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    #[serde(default)]
    pub lines: Vec<LineConfig>,
}

/// Top-level scene document
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    pub objects: Vec<ObjectConfig>,
    #[serde(default)]
    pub controls: Vec<ControlConfig>,
    #[serde(default)]
    pub outputs: Vec<OutputGroupConfig>,
    #[serde(default)]
    pub graphs: Vec<GraphConfig>,
}

impl SceneConfig {
    /// Empty scene with default environment
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            environment: EnvironmentConfig::default(),
            objects: Vec::new(),
            controls: Vec::new(),
            outputs: Vec::new(),
            graphs: Vec::new(),
        }
    }

    /// Parse and validate a JSON scene document
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: SceneConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a YAML scene document
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: SceneConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a scene from disk. `.yaml`/`.yml` files are read as YAML,
    /// everything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn object(&self, id: &str) -> Option<&ObjectConfig> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Structural checks that serde cannot express. Dangling `targetObj`
    /// references are not errors here; see [`SceneConfig::dangling_references`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::invalid("title", "must not be empty"));
        }

        let env = &self.environment;
        if !(env.pixels_per_unit.is_finite() && env.pixels_per_unit > 0.0) {
            return Err(ConfigError::invalid(
                "environment.pixelsPerUnit",
                format!("must be a positive number, got {}", env.pixels_per_unit),
            ));
        }
        if !env.gravity.is_finite() {
            return Err(ConfigError::invalid("environment.gravity", "must be finite"));
        }

        let mut seen = HashSet::new();
        for (i, obj) in self.objects.iter().enumerate() {
            if obj.id.is_empty() {
                return Err(ConfigError::invalid(format!("objects[{i}].id"), "must not be empty"));
            }
            if !seen.insert(obj.id.as_str()) {
                return Err(ConfigError::DuplicateId(obj.id.clone()));
            }
            if !(obj.x.is_finite() && obj.y.is_finite()) {
                return Err(ConfigError::invalid(
                    format!("objects[{i}]"),
                    "position must be finite",
                ));
            }
            if obj.body.kind.is_empty() {
                return Err(ConfigError::invalid(format!("objects[{i}].body.type"), "missing"));
            }
            for field in obj.body.required_fields() {
                if !obj.body.has_field(field) {
                    return Err(ConfigError::invalid(
                        format!("objects[{i}].body.{field}"),
                        format!("required for {} bodies", obj.body.kind),
                    ));
                }
            }
            if let Some(mass) = obj.mass {
                if !(mass.is_finite() && mass > 0.0) {
                    return Err(ConfigError::invalid(
                        format!("objects[{i}].mass"),
                        "must be a positive number",
                    ));
                }
            }
        }

        for (i, control) in self.controls.iter().enumerate() {
            if control.kind == "slider" {
                let (Some(min), Some(max), Some(step)) = (control.min, control.max, control.step)
                else {
                    return Err(ConfigError::invalid(
                        format!("controls[{i}]"),
                        "slider needs min, max and step",
                    ));
                };
                if min > max || step <= 0.0 {
                    return Err(ConfigError::invalid(
                        format!("controls[{i}]"),
                        format!("bad slider range {min}..{max} step {step}"),
                    ));
                }
            }
        }

        for (i, graph) in self.graphs.iter().enumerate() {
            if graph.kind != "line" {
                continue;
            }
            match graph.y_axis_range {
                Some(range) if range.min <= range.max => {}
                Some(_) => {
                    return Err(ConfigError::invalid(
                        format!("graphs[{i}].yAxisRange"),
                        "min must not exceed max",
                    ))
                }
                None => {
                    return Err(ConfigError::invalid(
                        format!("graphs[{i}].yAxisRange"),
                        "required for line graphs",
                    ))
                }
            }
        }

        Ok(())
    }

    /// `(where, targetObj)` for every binding whose target names no object
    pub fn dangling_references(&self) -> Vec<(String, String)> {
        let ids: HashSet<&str> = self.objects.iter().map(|o| o.id.as_str()).collect();
        let mut out = Vec::new();
        for c in &self.controls {
            if !ids.contains(c.target_obj.as_str()) {
                out.push((format!("control {}", c.label), c.target_obj.clone()));
            }
        }
        for group in &self.outputs {
            for v in &group.values {
                if !ids.contains(v.target_obj.as_str()) {
                    out.push((format!("output {}", v.label), v.target_obj.clone()));
                }
            }
        }
        for g in &self.graphs {
            for l in &g.lines {
                if !ids.contains(l.target_obj.as_str()) {
                    out.push((format!("graph line {}", l.label), l.target_obj.clone()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let cfg = SceneConfig::from_json_str(r#"{"title": "Empty", "objects": []}"#).unwrap();
        assert_eq!(cfg.environment.gravity, 9.8);
        assert_eq!(cfg.environment.pixels_per_unit, 10.0);
        assert_eq!(cfg.environment.unit, Unit::M);
        assert!(cfg.controls.is_empty() && cfg.outputs.is_empty() && cfg.graphs.is_empty());
    }

    #[test]
    fn missing_objects_is_rejected() {
        let err = SceneConfig::from_json_str(r#"{"title": "No objects"}"#).unwrap_err();
        assert!(err.to_string().contains("objects"), "{err}");
    }

    #[test]
    fn missing_nested_field_is_rejected() {
        let text = r#"{"title": "t", "objects": [{"id": "a", "x": 0, "y": 0, "body": {"type": "circle"}}]}"#;
        let err = SceneConfig::from_json_str(text).unwrap_err();
        assert!(err.to_string().contains("radius"), "{err}");
    }

    #[test]
    fn unknown_body_kind_passes_validation() {
        let text = r#"{"title": "t", "objects": [{"id": "a", "x": 0, "y": 0, "body": {"type": "blob"}}]}"#;
        assert!(SceneConfig::from_json_str(text).is_ok());
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let text = r#"{"title": "t", "objects": [], "environment": {"pixelsPerUnit": 0}}"#;
        assert!(matches!(
            SceneConfig::from_json_str(text),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut cfg = SceneConfig::new("dup");
        cfg.objects.push(ObjectConfig::new("a", 1.0, 1.0, BodyConfig::circle(1.0)));
        cfg.objects.push(ObjectConfig::new("a", 2.0, 1.0, BodyConfig::circle(1.0)));
        assert!(matches!(cfg.validate(), Err(ConfigError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn walls_deduplicate() {
        let text = r#"{"title": "t", "objects": [], "environment": {"walls": ["left", "left", "bottom"]}}"#;
        let cfg = SceneConfig::from_json_str(text).unwrap();
        assert_eq!(cfg.environment.walls.len(), 2);
    }
}
