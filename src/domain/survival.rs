//! Survival curves and the risk estimate derived from them.

use serde::{Deserialize, Serialize};

/// Horizon (years) at which the event risk is reported.
pub const RISK_HORIZON_YEARS: f64 = 5.0;

/// Errors building or evaluating a survival curve.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("Survival curve has no points")]
    Empty,

    #[error("Survival curve has {times} time points but {probabilities} probabilities")]
    LengthMismatch { times: usize, probabilities: usize },

    #[error("Survival curve time points must be finite and strictly increasing (index {0})")]
    UnorderedTimes(usize),

    #[error("Survival probability {value} at index {index} is outside [0, 1]")]
    ProbabilityOutOfRange { index: usize, value: f64 },

    #[error("Time {time} is outside the curve domain [0, {max}]")]
    OutOfDomain { time: f64, max: f64 },
}

/// A survival function sampled on increasing time points.
///
/// Evaluated as a right-continuous step function that holds the last reached
/// value between points. Times before the first point are clamped to it.
///
/// Deserialization goes through [`SurvivalCurve::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurvePoints")]
pub struct SurvivalCurve {
    times: Vec<f64>,
    probabilities: Vec<f64>,
}

#[derive(Deserialize)]
struct CurvePoints {
    times: Vec<f64>,
    probabilities: Vec<f64>,
}

impl TryFrom<CurvePoints> for SurvivalCurve {
    type Error = CurveError;

    fn try_from(points: CurvePoints) -> Result<Self, Self::Error> {
        Self::new(points.times, points.probabilities)
    }
}

impl SurvivalCurve {
    /// Create a curve from paired time points and survival probabilities.
    ///
    /// # Errors
    /// Returns `CurveError` if the arrays are empty or of different lengths,
    /// times are not finite and strictly increasing, or a probability is
    /// outside [0, 1].
    pub fn new(times: Vec<f64>, probabilities: Vec<f64>) -> Result<Self, CurveError> {
        if times.len() != probabilities.len() {
            return Err(CurveError::LengthMismatch {
                times: times.len(),
                probabilities: probabilities.len(),
            });
        }
        if times.is_empty() {
            return Err(CurveError::Empty);
        }

        for (i, t) in times.iter().enumerate() {
            if !t.is_finite() || (i > 0 && *t <= times[i - 1]) {
                return Err(CurveError::UnorderedTimes(i));
            }
        }

        for (index, p) in probabilities.iter().enumerate() {
            if !(0.0..=1.0).contains(p) {
                return Err(CurveError::ProbabilityOutOfRange { index, value: *p });
            }
        }

        Ok(Self {
            times,
            probabilities,
        })
    }

    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[must_use]
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Last time point, the upper end of the evaluation domain.
    #[must_use]
    pub fn max_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// (time, probability) pairs, e.g. for plotting.
    #[must_use]
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.times
            .iter()
            .copied()
            .zip(self.probabilities.iter().copied())
            .collect()
    }

    /// Survival probability at `time`.
    ///
    /// # Errors
    /// Returns `CurveError::OutOfDomain` if `time` is not finite, negative, or
    /// past the last time point.
    pub fn evaluate(&self, time: f64) -> Result<f64, CurveError> {
        let max = self.max_time();
        if !time.is_finite() || time < 0.0 || time > max {
            return Err(CurveError::OutOfDomain { time, max });
        }

        // Number of time points <= time, at least the first one.
        let reached = self.times.partition_point(|t| *t <= time).max(1);
        Ok(self.probabilities[reached - 1])
    }
}

/// Probability that the event occurs by the horizon: `1 - S(horizon)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskEstimate {
    pub horizon_years: f64,
    pub survival: f64,
    pub risk: f64,
}

impl RiskEstimate {
    /// Derive the risk at `horizon_years` from a survival curve.
    ///
    /// # Errors
    /// Returns `CurveError` if the horizon is outside the curve's domain.
    pub fn from_curve(curve: &SurvivalCurve, horizon_years: f64) -> Result<Self, CurveError> {
        let survival = curve.evaluate(horizon_years)?;
        Ok(Self::from_survival(survival, horizon_years))
    }

    #[must_use]
    pub fn from_survival(survival: f64, horizon_years: f64) -> Self {
        Self {
            horizon_years,
            survival,
            risk: 1.0 - survival,
        }
    }

    /// Risk as a percentage with two decimals, e.g. `8.00%`.
    #[must_use]
    pub fn percent_label(&self) -> String {
        format!("{:.2}%", self.risk * 100.0)
    }
}

/// Outcome of one risk computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub estimate: RiskEstimate,
    pub curve: SurvivalCurve,
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

impl RiskAssessment {
    #[must_use]
    pub fn new(estimate: RiskEstimate, curve: SurvivalCurve) -> Self {
        Self {
            estimate,
            curve,
            computed_at: chrono::Utc::now(),
        }
    }
}
