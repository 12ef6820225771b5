//! Versioned scene storage
//!
//! Every save creates a new record; an edit of an existing scene points
//! back at it through `parent_id`, so the history of a scene is a chain of
//! records rather than in-place updates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// One stored scene document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneRecord {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub json: Value,
    pub from_ai: bool,
    pub parent_id: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Listing entry, without the document body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<u64>,
}

pub trait SceneStore {
    /// Store `json` as a new record and return its id
    fn create(&mut self, json: Value, from_ai: bool, parent_id: Option<u64>) -> Result<u64, StoreError>;

    fn get(&self, id: u64) -> Result<Value, StoreError>;

    /// Every record, newest first
    fn list(&self) -> Vec<SceneSummary>;
}

fn text_field(json: &Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<u64, SceneRecord>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: u64) -> Option<&SceneRecord> {
        self.records.get(&id)
    }

    /// Ids from `id` back to the original scene
    pub fn lineage(&self, id: u64) -> Result<Vec<u64>, StoreError> {
        let mut out = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let record = self.records.get(&current).ok_or(StoreError::NotFound(current))?;
            out.push(current);
            cursor = record.parent_id;
        }
        Ok(out)
    }
}

impl SceneStore for MemoryStore {
    fn create(&mut self, json: Value, from_ai: bool, parent_id: Option<u64>) -> Result<u64, StoreError> {
        if let Some(parent) = parent_id {
            if !self.records.contains_key(&parent) {
                return Err(StoreError::MissingParent(parent));
            }
        }
        self.next_id += 1;
        let id = self.next_id;
        let record = SceneRecord {
            id,
            created_at: Utc::now(),
            title: text_field(&json, "title"),
            description: text_field(&json, "description"),
            json,
            from_ai,
            parent_id,
        };
        info!("stored scene {id} (parent {parent_id:?}, ai: {from_ai})");
        self.records.insert(id, record);
        Ok(id)
    }

    fn get(&self, id: u64) -> Result<Value, StoreError> {
        self.records
            .get(&id)
            .map(|r| r.json.clone())
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Vec<SceneSummary> {
        let mut out: Vec<SceneSummary> = self
            .records
            .values()
            .map(|r| SceneSummary {
                id: r.id,
                title: r.title.clone(),
                description: r.description.clone(),
                created_at: r.created_at,
                parent_id: r.parent_id,
            })
            .collect();
        // ids break ties between records created within one clock tick
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }
}
