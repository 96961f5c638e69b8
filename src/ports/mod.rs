//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (the remote artifact host
//! and the fitted survival model).

mod model;
mod source;

pub use model::{ModelError, SurvivalModel};
pub use source::{ArtifactSource, FetchError};
