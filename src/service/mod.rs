//! Collaborators outside the simulation loop
//!
//! - [`store`] versioned scene persistence
//! - [`chat`]  AI scene generation over HTTP

pub mod store;
pub mod chat;
