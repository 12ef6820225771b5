//! Outputs and graphs: derived observations of a running scene
//!
//! Both read body properties through a [`PropertySource`], which hands back
//! real-world values already converted and clamped. Outputs are recomputed
//! every tick and never retained; graphs append one [`DataPoint`] per tick
//! while the clock runs.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use crate::configuration::config::{AxisRange, GraphConfig, OutputGroupConfig};
use crate::error::ConfigError;
use crate::simulation::property::Property;

/// Readings with magnitude below this display as exactly zero
pub const DISPLAY_EPSILON: f64 = 0.01;

pub fn clamp_small(value: f64) -> f64 {
    if value.abs() < DISPLAY_EPSILON {
        0.0
    } else {
        value
    }
}

/// Real-world view of live body properties
pub trait PropertySource {
    /// Converted, clamped value; `None` when the target is missing
    fn read(&self, target: &str, property: Property) -> Option<f64>;
}

// =========================================================================================
// Outputs
// =========================================================================================

#[derive(Debug, Clone)]
struct OutputBinding {
    group: Option<String>,
    label: String,
    target: String,
    property: Option<Property>,
    unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputReading {
    pub group: Option<String>,
    pub label: String,
    pub value: Option<f64>,
    pub unit: String,
}

impl OutputReading {
    /// Two decimals plus unit, or `—` when the value is unavailable
    pub fn display_value(&self) -> String {
        match self.value {
            Some(v) if self.unit.is_empty() => format!("{v:.2}"),
            Some(v) => format!("{v:.2} {}", self.unit),
            None => "—".to_string(),
        }
    }
}

impl fmt::Display for OutputReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.display_value())
    }
}

/// Live readouts, recomputed each tick
#[derive(Debug, Clone, Default)]
pub struct OutputPanel {
    bindings: Vec<OutputBinding>,
    readings: Vec<OutputReading>,
}

impl OutputPanel {
    /// `length_unit` is the scene unit abbreviation used for derived labels
    pub fn build(groups: &[OutputGroupConfig], length_unit: &str) -> Self {
        let mut bindings = Vec::new();
        for group in groups {
            for value in &group.values {
                let property = match value.property.parse::<Property>() {
                    Ok(p) => Some(p),
                    Err(e) => {
                        warn!("output {}: {e}", value.label);
                        None
                    }
                };
                let unit = value.unit.clone().unwrap_or_else(|| {
                    property.map(|p| p.unit_label(length_unit)).unwrap_or_default()
                });
                bindings.push(OutputBinding {
                    group: group.title.clone(),
                    label: value.label.clone(),
                    target: value.target_obj.clone(),
                    property,
                    unit,
                });
            }
        }
        let readings = bindings
            .iter()
            .map(|b| OutputReading {
                group: b.group.clone(),
                label: b.label.clone(),
                value: None,
                unit: b.unit.clone(),
            })
            .collect();
        Self { bindings, readings }
    }

    pub fn refresh(&mut self, source: &dyn PropertySource) {
        for (binding, reading) in self.bindings.iter().zip(self.readings.iter_mut()) {
            reading.value = binding
                .property
                .and_then(|p| source.read(&binding.target, p));
        }
    }

    pub fn readings(&self) -> &[OutputReading] {
        &self.readings
    }
}

// =========================================================================================
// Graphs
// =========================================================================================

/// One sample: simulation time plus one value per line label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub time: f64, // simulation seconds
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphLine {
    pub label: String,
    pub color: String,
    pub target: String,
    pub property: Option<Property>,
}

/// A time-series collector
pub trait Graph: Send + Sync {
    fn kind(&self) -> &str;
    fn title(&self) -> &str;
    fn lines(&self) -> &[GraphLine];
    fn points(&self) -> &[DataPoint];

    /// Append a sample taken at simulation `time`
    fn record(&mut self, time: f64, source: &dyn PropertySource);
    fn clear(&mut self);

    /// Display domains `((x_min, x_max), (y_min, y_max))`
    fn domains(&self) -> ((f64, f64), (f64, f64));
}

pub struct LineGraph {
    title: String,
    y_range: AxisRange,
    y_label: Option<String>,
    lines: Vec<GraphLine>,
    points: Vec<DataPoint>,
}

/// Visible time window always spans at least this many seconds
const MIN_X_SPAN: f64 = 5.0;

impl LineGraph {
    pub fn from_config(cfg: &GraphConfig) -> Result<Self, ConfigError> {
        let y_range = cfg.y_axis_range.ok_or_else(|| {
            ConfigError::invalid(format!("graph {}", cfg.title), "line graph needs yAxisRange")
        })?;
        let lines = cfg
            .lines
            .iter()
            .map(|l| {
                let property = l.property.parse::<Property>().map_err(|e| {
                    warn!("graph {} line {}: {e}", cfg.title, l.label);
                    e
                });
                GraphLine {
                    label: l.label.clone(),
                    color: l.color.clone(),
                    target: l.target_obj.clone(),
                    property: property.ok(),
                }
            })
            .collect();
        Ok(Self {
            title: cfg.title.clone(),
            y_range,
            y_label: cfg.y_axis_label.clone(),
            lines,
            points: Vec::new(),
        })
    }

    pub fn y_label(&self) -> &str {
        self.y_label.as_deref().unwrap_or("Value")
    }

    pub fn x_domain(&self) -> (f64, f64) {
        let last = self.points.last().map_or(0.0, |p| p.time);
        (0.0, last.max(MIN_X_SPAN))
    }

    /// Configured range, or the data extent plus 10% padding when the
    /// data leaves it
    pub fn y_domain(&self) -> (f64, f64) {
        let AxisRange { min, max } = self.y_range;
        let (lo, hi) = self
            .points
            .iter()
            .flat_map(|p| p.values.values())
            .fold((min, max), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if lo < min || hi > max {
            let pad = (hi - lo) * 0.1;
            (lo - pad, hi + pad)
        } else {
            (min, max)
        }
    }
}

impl Graph for LineGraph {
    fn kind(&self) -> &str {
        "line"
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn lines(&self) -> &[GraphLine] {
        &self.lines
    }

    fn points(&self) -> &[DataPoint] {
        &self.points
    }

    fn record(&mut self, time: f64, source: &dyn PropertySource) {
        if let Some(last) = self.points.last() {
            if time <= last.time {
                debug!("graph {}: sample at {time} not after {}, dropped", self.title, last.time);
                return;
            }
        }
        let values = self
            .lines
            .iter()
            .filter_map(|line| {
                let v = source.read(&line.target, line.property?)?;
                Some((line.label.clone(), v))
            })
            .collect();
        self.points.push(DataPoint { time, values });
    }

    fn clear(&mut self) {
        self.points.clear();
    }

    fn domains(&self) -> ((f64, f64), (f64, f64)) {
        (self.x_domain(), self.y_domain())
    }
}

/// Builds a graph from its config
pub type GraphConstructor = fn(&GraphConfig) -> Result<Box<dyn Graph>, ConfigError>;

fn line_graph(cfg: &GraphConfig) -> Result<Box<dyn Graph>, ConfigError> {
    Ok(Box::new(LineGraph::from_config(cfg)?))
}

pub struct GraphRegistry {
    constructors: BTreeMap<String, GraphConstructor>,
}

impl Default for GraphRegistry {
    fn default() -> Self {
        let mut reg = Self::new();
        reg.register("line", line_graph);
        reg
    }
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, kind: impl Into<String>, constructor: GraphConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    pub fn get(&self, kind: &str) -> Option<GraphConstructor> {
        self.constructors.get(kind).copied()
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build every graph whose kind is known; the rest are skipped with a warning
    pub fn build_all(&self, configs: &[GraphConfig]) -> Vec<Box<dyn Graph>> {
        configs
            .iter()
            .filter_map(|cfg| {
                let Some(construct) = self.get(&cfg.kind) else {
                    warn!("graph {}: unknown type `{}`, not built", cfg.title, cfg.kind);
                    return None;
                };
                construct(cfg)
                    .map_err(|e| warn!("graph {}: {e}", cfg.title))
                    .ok()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::config::LineConfig;

    struct Fixed(f64);

    impl PropertySource for Fixed {
        fn read(&self, target: &str, _property: Property) -> Option<f64> {
            (target == "ball").then_some(self.0)
        }
    }

    fn graph_config() -> GraphConfig {
        GraphConfig {
            kind: "line".into(),
            title: "Height".into(),
            y_axis_range: Some(AxisRange { min: 0.0, max: 10.0 }),
            y_axis_label: None,
            lines: vec![
                LineConfig {
                    label: "y".into(),
                    color: "#fff".into(),
                    target_obj: "ball".into(),
                    property: "position.y".into(),
                },
                LineConfig {
                    label: "ghost".into(),
                    color: "#000".into(),
                    target_obj: "nobody".into(),
                    property: "position.y".into(),
                },
            ],
        }
    }

    #[test]
    fn small_values_clamp_to_zero() {
        assert_eq!(clamp_small(0.009), 0.0);
        assert_eq!(clamp_small(-0.0099), 0.0);
        assert_eq!(clamp_small(0.01), 0.01);
    }

    #[test]
    fn missing_targets_are_omitted_from_points() {
        let mut g = LineGraph::from_config(&graph_config()).unwrap();
        g.record(0.1, &Fixed(3.0));
        let p = &g.points()[0];
        assert_eq!(p.values.get("y"), Some(&3.0));
        assert!(!p.values.contains_key("ghost"));
    }

    #[test]
    fn non_increasing_time_is_dropped() {
        let mut g = LineGraph::from_config(&graph_config()).unwrap();
        g.record(0.2, &Fixed(1.0));
        g.record(0.2, &Fixed(2.0));
        g.record(0.1, &Fixed(2.0));
        assert_eq!(g.points().len(), 1);
    }

    #[test]
    fn domains_follow_the_data() {
        let mut g = LineGraph::from_config(&graph_config()).unwrap();
        assert_eq!(g.domains(), ((0.0, 5.0), (0.0, 10.0)));
        g.record(6.0, &Fixed(20.0));
        let ((_, x_max), (y_min, y_max)) = g.domains();
        assert_eq!(x_max, 6.0);
        assert!((y_min - -2.0).abs() < 1e-12);
        assert!((y_max - 22.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_graph_kind_is_not_built() {
        let mut cfg = graph_config();
        cfg.kind = "pie".into();
        assert!(GraphRegistry::default().build_all(&[cfg]).is_empty());
    }

    #[test]
    fn readings_show_dash_for_missing_targets() {
        let groups = vec![OutputGroupConfig {
            title: None,
            values: vec![crate::configuration::config::OutputValueConfig {
                label: "Speed".into(),
                target_obj: "nobody".into(),
                property: "velocity.x".into(),
                unit: None,
            }],
        }];
        let mut panel = OutputPanel::build(&groups, "m");
        panel.refresh(&Fixed(1.0));
        assert_eq!(panel.readings()[0].unit, "m/s");
        assert_eq!(panel.readings()[0].display_value(), "—");
    }
}
