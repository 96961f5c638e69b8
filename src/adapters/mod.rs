//! Adapters layer: Concrete implementations of ports.
//!
//! - `forest`: random survival forest loaded from a JSON export
//! - `http`: blocking HTTP download of remote artifacts

pub mod forest;
pub mod http;

pub use forest::{ForestError, RandomSurvivalForest};
pub use http::HttpArtifactSource;
