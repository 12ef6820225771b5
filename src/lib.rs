pub mod error;
pub mod simulation;
pub mod configuration;
pub mod visualization;
pub mod export;
pub mod service;

pub use error::{ChatError, ConfigError, EngineError, ExportError, ShapeError, SimError, StoreError};

pub use simulation::states::{BodyState, Material, NVec2};
pub use simulation::units::{Unit, UnitConverter};
pub use simulation::property::Property;
pub use simulation::engine::{BodyDesc, BodyHandle, PhysicsEngine, ShapeDesc};
pub use simulation::rapier_world::RapierWorld;
pub use simulation::bodies::BodyRegistry;
pub use simulation::controls::{ControlPanel, ControlRegistry};
pub use simulation::observe::{Graph, GraphRegistry, OutputReading};
pub use simulation::clock::ClockState;
pub use simulation::scene::Scene;
pub use simulation::runtime::{FrameReport, Registries, Simulation};

pub use configuration::config::{ControlValue, ObjectConfig, SceneConfig};

pub use export::csv::{export_csv, tracked_objects};
pub use service::store::{MemoryStore, SceneStore};
pub use service::chat::{extract_scene, ChatClient, HttpChatClient};

#[cfg(feature = "viewer")]
pub use visualization::viewer::run_viewer;
