//! Risk service: turns one form submission into a 5-year risk estimate.
//!
//! The pipeline for a submission:
//! - Reconcile the input record against the feature schema
//! - Predict the survival function
//! - Evaluate it at the risk horizon

use std::sync::Arc;

use crate::domain::{
    reconcile, FeatureSchema, InputRecord, RiskAssessment, RiskEstimate, RISK_HORIZON_YEARS,
};
use crate::ports::{ModelError, SurvivalModel};
use crate::CardiosurvError;

/// Service computing risk estimates from a loaded model.
///
/// The model and schema are loaded once at startup and shared read-only;
/// the service never mutates them.
pub struct RiskService<M>
where
    M: SurvivalModel,
{
    model: Arc<M>,
    schema: Arc<FeatureSchema>,
}

impl<M> RiskService<M>
where
    M: SurvivalModel,
{
    /// Create a new risk service.
    pub fn new(model: Arc<M>, schema: Arc<FeatureSchema>) -> Self {
        Self { model, schema }
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Compute the risk assessment for one submission.
    ///
    /// A failure here only affects this submission; the service stays usable.
    ///
    /// # Errors
    /// Returns `CardiosurvError::Model` if the model rejects the row or its
    /// survival curve cannot be evaluated at the horizon.
    pub fn assess(&self, record: &InputRecord) -> Result<RiskAssessment, CardiosurvError> {
        tracing::debug!("Step 1: Reconciling record against feature schema...");
        let input = reconcile(record, &self.schema);

        tracing::debug!("Step 2: Predicting survival function ({} features)...", input.len());
        let curve = self.model.predict_survival_function(&input)?;

        tracing::debug!("Step 3: Evaluating survival at {} years...", RISK_HORIZON_YEARS);
        let estimate =
            RiskEstimate::from_curve(&curve, RISK_HORIZON_YEARS).map_err(ModelError::from)?;

        tracing::info!(
            "Risk computed over {} time points (horizon={}y)",
            curve.times().len(),
            RISK_HORIZON_YEARS
        );

        Ok(RiskAssessment::new(estimate, curve))
    }
}
