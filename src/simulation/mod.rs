pub mod units;
pub mod property;
pub mod states;
pub mod engine;
pub mod rapier_world;
pub mod geometry;
pub mod bodies;
pub mod controls;
pub mod observe;
pub mod clock;
pub mod scene;
pub mod runtime;
