//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement the
//! startup (fetch + load) and per-submission (assess) use cases.

pub mod artifacts;
mod inference;

pub use artifacts::{
    load_artifacts, ArtifactError, ArtifactFetcher, ArtifactPaths, FetchOutcome, LoadedArtifacts,
};
pub use inference::RiskService;
