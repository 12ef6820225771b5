//! Error types for scene loading, assembly and the runtime loop
//!
//! - [`ConfigError`] – scene document could not be parsed or validated
//! - [`ShapeError`]  – one object's geometry is unusable (recoverable per object)
//! - [`EngineError`] – the physics backend rejected an operation
//! - [`SimError`]    – runtime lifecycle and tick failures
//! - [`ExportError`], [`StoreError`], [`ChatError`] – collaborator failures

use std::path::PathBuf;

use thiserror::Error;

/// Scene document errors. Reported before any engine object is created.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid scene YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("duplicate object id: {0}")]
    DuplicateId(String),

    #[error("no scene object (with `title` and `objects`) found in text")]
    NotAScene,
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Geometry errors, fatal to a single object's creation only.
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("{kind} body is missing `{field}`")]
    MissingField { kind: String, field: &'static str },

    #[error("{kind} body has invalid `{field}`: {message}")]
    InvalidField {
        kind: String,
        field: &'static str,
        message: String,
    },

    #[error("vertex body needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("vertex outline has zero area")]
    Degenerate,

    #[error("vertex outline is self-intersecting (edges {0} and {1})")]
    SelfIntersecting(usize, usize),

    #[error("vertex outline could not be decomposed into convex pieces")]
    Decomposition,
}

/// Errors raised by a [`crate::simulation::engine::PhysicsEngine`] backend.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("engine rejected shape: {0}")]
    InvalidShape(String),

    #[error("body {0} is not part of the world")]
    UnknownBody(String),

    #[error("body {id} reached a non-finite state")]
    NonFinite { id: String },
}

/// Runtime errors surfaced to the host.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create object {id}: {source}")]
    Assembly {
        id: String,
        #[source]
        source: EngineError,
    },

    #[error("simulation is not loaded")]
    NotLoaded,

    #[error("simulation is already loaded")]
    AlreadyLoaded,

    #[error("no control labelled {0}")]
    UnknownControl(String),

    #[error("control {label} expects a {expected} value")]
    ControlValue { label: String, expected: &'static str },

    #[error("physics tick {tick} failed, simulation paused: {source}")]
    Tick {
        tick: u64,
        #[source]
        source: EngineError,
    },
}

/// CSV export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("select at least one data line to export")]
    NothingSelected,

    #[error("object {0} is not tracked by any graph")]
    UnknownObject(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Persistence collaborator errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("scene {0} not found")]
    NotFound(u64),

    #[error("parent scene {0} does not exist")]
    MissingParent(u64),
}

/// AI chat collaborator errors.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("environment variable {0} is not set")]
    MissingEndpoint(&'static str),

    #[error("chat request failed: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("chat service reported: {0}")]
    Remote(String),

    #[error("chat response could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Scene(#[from] ConfigError),
}
