//! Domain layer: clinical variables, input records and survival results.
//!
//! Plain Rust types; no I/O happens here.

mod record;
mod survival;
pub mod variables;

pub use record::{
    encode, reconcile, EncodingError, FeatureSchema, InputRecord, ModelInput, SchemaError,
};
pub use survival::{CurveError, RiskAssessment, RiskEstimate, SurvivalCurve, RISK_HORIZON_YEARS};
pub use variables::{
    BoundsError, CategoricalVariable, NumericVariable, CATEGORICAL_VARIABLES, NUMERIC_VARIABLES,
};
