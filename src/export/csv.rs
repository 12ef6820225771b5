//! CSV export of recorded graph data
//!
//! Lines from every graph that target the same object are merged by
//! timestamp into one table:
//!
//! ```text
//! time,Height,Speed
//! 0.0167,4.998611,0.163333
//! ```
//!
//! `time` is written with 4 decimals, values with 6; a line with no sample
//! at a timestamp leaves its cell empty.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use crate::error::ExportError;
use crate::simulation::observe::Graph;

/// `object id → line labels` over every graph, labels in first-seen order
pub fn tracked_objects(graphs: &[Box<dyn Graph>]) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for line in graphs.iter().flat_map(|g| g.lines()) {
        let labels = out.entry(line.target.clone()).or_default();
        if !labels.contains(&line.label) {
            labels.push(line.label.clone());
        }
    }
    out
}

/// Write the selected lines of `object` as CSV, rows ordered by time.
/// Labels the object does not track are ignored. Returns the row count.
pub fn export_csv<W: Write>(
    graphs: &[Box<dyn Graph>],
    object: &str,
    labels: &[String],
    writer: W,
) -> Result<usize, ExportError> {
    if labels.is_empty() {
        return Err(ExportError::NothingSelected);
    }
    let tracked = tracked_objects(graphs);
    let Some(available) = tracked.get(object) else {
        return Err(ExportError::UnknownObject(object.to_string()));
    };
    let columns: Vec<&str> = labels
        .iter()
        .map(String::as_str)
        .filter(|l| available.iter().any(|a| a == l))
        .collect();
    if columns.is_empty() {
        return Err(ExportError::NothingSelected);
    }
    let selected: BTreeSet<&str> = columns.iter().copied().collect();

    let mut rows: Vec<(f64, BTreeMap<&str, f64>)> = Vec::new();
    for graph in graphs {
        let lines: Vec<&str> = graph
            .lines()
            .iter()
            .filter(|l| l.target == object && selected.contains(l.label.as_str()))
            .map(|l| l.label.as_str())
            .collect();
        if lines.is_empty() {
            continue;
        }
        for point in graph.points() {
            let mut values = BTreeMap::new();
            for label in &lines {
                if let Some(&v) = point.values.get(*label) {
                    values.insert(*label, v);
                }
            }
            rows.push((point.time, values));
        }
    }
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));

    // merge samples sharing a timestamp
    let mut merged: Vec<(f64, BTreeMap<&str, f64>)> = Vec::with_capacity(rows.len());
    for (time, values) in rows {
        match merged.last_mut() {
            Some((t, acc)) if *t == time => acc.extend(values),
            _ => merged.push((time, values)),
        }
    }

    let mut out = ::csv::Writer::from_writer(writer);
    out.write_record(std::iter::once("time").chain(columns.iter().copied()))?;
    for (time, values) in &merged {
        let mut record = vec![format!("{time:.4}")];
        for label in &columns {
            record.push(
                values
                    .get(label)
                    .map(|v| format!("{v:.6}"))
                    .unwrap_or_default(),
            );
        }
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(merged.len())
}
