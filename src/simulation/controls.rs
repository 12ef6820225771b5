//! Control registry and bindings
//!
//! A control couples a widget value (real-world units) to one property of
//! one object. The registry maps the control `type` discriminant to a
//! [`ControlKind`], which describes the widget and vets incoming values.
//! The resulting [`ControlPanel`] holds the current value of every control
//! keyed by label; the runtime pushes values into bodies.

use std::collections::BTreeMap;

use log::warn;

use crate::configuration::config::{ControlConfig, ControlValue};
use crate::error::{ConfigError, SimError};
use crate::simulation::property::Property;

/// What a host needs to draw a control
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlWidget {
    Slider { min: f64, max: f64, step: f64 },
    Toggle,
}

/// Behaviour of one control discriminant
pub trait ControlKind: Send + Sync {
    fn widget(&self, cfg: &ControlConfig) -> Result<ControlWidget, ConfigError>;

    /// Value held before the user touches the control
    fn initial_value(&self, cfg: &ControlConfig, widget: &ControlWidget) -> ControlValue;

    /// Normalise a value coming from the host; `Err` names the expected type
    fn accept(&self, widget: &ControlWidget, value: ControlValue) -> Result<ControlValue, &'static str>;
}

/// Numeric slider, values clamped into `[min, max]`
pub struct Slider;

impl ControlKind for Slider {
    fn widget(&self, cfg: &ControlConfig) -> Result<ControlWidget, ConfigError> {
        match (cfg.min, cfg.max, cfg.step) {
            (Some(min), Some(max), Some(step)) if min <= max && step > 0.0 => {
                Ok(ControlWidget::Slider { min, max, step })
            }
            _ => Err(ConfigError::invalid(
                format!("control {}", cfg.label),
                "slider needs min <= max and step > 0",
            )),
        }
    }

    fn initial_value(&self, cfg: &ControlConfig, widget: &ControlWidget) -> ControlValue {
        let fallback = match widget {
            ControlWidget::Slider { min, .. } => *min,
            ControlWidget::Toggle => 0.0,
        };
        let v = match cfg.default_value {
            Some(ControlValue::Number(v)) => v,
            _ => fallback,
        };
        self.accept(widget, ControlValue::Number(v))
            .unwrap_or(ControlValue::Number(fallback))
    }

    fn accept(&self, widget: &ControlWidget, value: ControlValue) -> Result<ControlValue, &'static str> {
        let ControlValue::Number(v) = value else {
            return Err("number");
        };
        if !v.is_finite() {
            return Err("number");
        }
        match widget {
            ControlWidget::Slider { min, max, .. } => Ok(ControlValue::Number(v.clamp(*min, *max))),
            ControlWidget::Toggle => Ok(ControlValue::Number(v)),
        }
    }
}

/// Boolean switch
pub struct Toggle;

impl ControlKind for Toggle {
    fn widget(&self, _cfg: &ControlConfig) -> Result<ControlWidget, ConfigError> {
        Ok(ControlWidget::Toggle)
    }

    fn initial_value(&self, cfg: &ControlConfig, _widget: &ControlWidget) -> ControlValue {
        ControlValue::Bool(cfg.default_value.map_or(false, ControlValue::as_bool))
    }

    fn accept(&self, _widget: &ControlWidget, value: ControlValue) -> Result<ControlValue, &'static str> {
        match value {
            ControlValue::Bool(_) => Ok(value),
            ControlValue::Number(_) => Err("boolean"),
        }
    }
}

pub struct ControlRegistry {
    kinds: BTreeMap<String, Box<dyn ControlKind>>,
}

impl Default for ControlRegistry {
    fn default() -> Self {
        let mut reg = Self::new();
        reg.register("slider", Box::new(Slider));
        reg.register("toggle", Box::new(Toggle));
        reg
    }
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, kind: impl Into<String>, control: Box<dyn ControlKind>) {
        self.kinds.insert(kind.into(), control);
    }

    pub fn get(&self, kind: &str) -> Option<&dyn ControlKind> {
        self.kinds.get(kind).map(|k| k.as_ref())
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }
}

/// One live control
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub label: String,
    pub kind: String,
    pub target: String,
    pub property: Option<Property>, // None: path did not parse, writes dropped
    pub widget: ControlWidget,
    pub value: ControlValue,
}

impl Control {
    /// Property and real-world value to push into the target, if writable
    pub fn binding(&self) -> Option<(Property, f64)> {
        let property = self.property.filter(|p| p.is_writable())?;
        Some((property, self.value.as_f64()))
    }
}

/// Every control of a scene, in config order
#[derive(Debug, Clone, Default)]
pub struct ControlPanel {
    controls: Vec<Control>,
}

impl ControlPanel {
    /// Build from config. Unknown kinds and bad widgets are skipped with a
    /// warning; unknown or read-only properties give an inert control.
    pub fn build(configs: &[ControlConfig], registry: &ControlRegistry) -> Self {
        let mut controls = Vec::with_capacity(configs.len());
        for cfg in configs {
            let Some(kind) = registry.get(&cfg.kind) else {
                warn!("control {}: unknown type `{}`, skipped", cfg.label, cfg.kind);
                continue;
            };
            let widget = match kind.widget(cfg) {
                Ok(w) => w,
                Err(e) => {
                    warn!("control {}: {e}, skipped", cfg.label);
                    continue;
                }
            };
            let property = match cfg.property.parse::<Property>() {
                Ok(p) if p.is_writable() => Some(p),
                Ok(p) => {
                    warn!("control {}: {p} is derived and cannot be written", cfg.label);
                    Some(p)
                }
                Err(e) => {
                    warn!("control {}: {e}", cfg.label);
                    None
                }
            };
            controls.push(Control {
                label: cfg.label.clone(),
                kind: cfg.kind.clone(),
                target: cfg.target_obj.clone(),
                property,
                widget,
                value: kind.initial_value(cfg, &widget),
            });
        }
        Self { controls }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Control> {
        self.controls.iter()
    }

    pub fn get(&self, label: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.label == label)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Update the held value of `label`
    pub fn set(
        &mut self,
        label: &str,
        value: ControlValue,
        registry: &ControlRegistry,
    ) -> Result<&Control, SimError> {
        let control = self
            .controls
            .iter_mut()
            .find(|c| c.label == label)
            .ok_or_else(|| SimError::UnknownControl(label.to_string()))?;
        let kind = registry
            .get(&control.kind)
            .ok_or_else(|| SimError::UnknownControl(label.to_string()))?;
        control.value = kind
            .accept(&control.widget, value)
            .map_err(|expected| SimError::ControlValue {
                label: label.to_string(),
                expected,
            })?;
        Ok(control)
    }
}
