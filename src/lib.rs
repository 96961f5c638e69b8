//! # Cardiosurv
//!
//! 5-year cardiovascular risk estimation for people living with HIV, from a
//! pre-trained random survival forest.
//!
//! This crate provides:
//! - Download and on-disk caching of the model artifacts
//! - A terminal form mapping clinical variables to model input columns
//! - Survival prediction, risk estimate and survival curve rendering
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (clinical variables, input records, survival curves)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (survival forest, HTTP download)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{FeatureSchema, InputRecord, RiskAssessment, RiskEstimate, SurvivalCurve};

/// Result type for Cardiosurv operations
pub type Result<T> = std::result::Result<T, CardiosurvError>;

/// Main error type for Cardiosurv
#[derive(Debug, thiserror::Error)]
pub enum CardiosurvError {
    #[error("Artifact error: {0}")]
    Artifact(#[from] application::ArtifactError),

    #[error("Prediction failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Invalid input: {0}")]
    Encoding(#[from] domain::EncodingError),

    #[error("{0}")]
    Bounds(#[from] domain::BoundsError),
}
