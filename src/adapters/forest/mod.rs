//! Random survival forest adapter.
//!
//! Loads a forest exported to JSON and implements [`SurvivalModel`] by
//! routing the row through every tree and averaging the survival estimates
//! stored in the reached leaves.
//!
//! # Artifact format
//!
//! ```json
//! {
//!   "n_features": 2,
//!   "feature_names": ["Age", "Sex_Woman"],
//!   "unique_times": [1.0, 3.0, 6.0],
//!   "trees": [
//!     { "nodes": [
//!       { "feature": 0, "threshold": 50.5, "left": 1, "right": 2 },
//!       { "survival": [0.99, 0.97, 0.93] },
//!       { "survival": [0.97, 0.90, 0.81] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Nodes are stored in pre-order: a split's children always come after it.
//! A row goes left when `value <= threshold`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ModelInput, SurvivalCurve};
use crate::ports::{ModelError, SurvivalModel};

/// Upper bound on input width accepted from an artifact.
const MAX_FEATURES: usize = 4096;

/// Errors raised while loading a forest artifact.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    #[error("Cannot read forest from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed forest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid forest: {0}")]
    Invalid(String),
}

/// One node of a survival tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        survival: Vec<f64>,
    },
}

/// A single survival tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalTree {
    pub nodes: Vec<TreeNode>,
}

impl SurvivalTree {
    /// Survival estimate of the leaf reached by `row`.
    fn leaf_for(&self, row: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { survival } => return survival,
            }
        }
    }

    fn validate(&self, tree_index: usize, n_features: usize, n_times: usize) -> Result<(), ForestError> {
        if self.nodes.is_empty() {
            return Err(ForestError::Invalid(format!("tree {tree_index} has no nodes")));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ForestError::Invalid(format!(
                            "tree {tree_index} node {i} splits on feature {feature}, model has {n_features}"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ForestError::Invalid(format!(
                            "tree {tree_index} node {i} has a NaN threshold"
                        )));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(ForestError::Invalid(format!(
                                "tree {tree_index} node {i} points to invalid child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { survival } => {
                    if survival.len() != n_times {
                        return Err(ForestError::Invalid(format!(
                            "tree {tree_index} leaf {i} has {} survival values, expected {n_times}",
                            survival.len()
                        )));
                    }
                    if survival.iter().any(|p| !(0.0..=1.0).contains(p)) {
                        return Err(ForestError::Invalid(format!(
                            "tree {tree_index} leaf {i} has a survival value outside [0, 1]"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// A fitted random survival forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomSurvivalForest {
    pub n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub unique_times: Vec<f64>,
    pub trees: Vec<SurvivalTree>,
}

impl RandomSurvivalForest {
    /// Load and validate a forest from a JSON file.
    ///
    /// # Errors
    /// Returns `ForestError` if the file cannot be read, is not valid JSON,
    /// or fails structural validation.
    pub fn load(path: &Path) -> Result<Self, ForestError> {
        let bytes = std::fs::read(path).map_err(|source| ForestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let forest = Self::from_json_slice(&bytes)?;

        tracing::info!(
            "Loaded survival forest from {:?} (trees={}, n_features={}, time_points={})",
            path,
            forest.trees.len(),
            forest.n_features,
            forest.unique_times.len()
        );

        Ok(forest)
    }

    /// Parse and validate a forest from JSON bytes.
    ///
    /// # Errors
    /// See [`RandomSurvivalForest::load`].
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ForestError> {
        let forest: Self = serde_json::from_slice(bytes)?;
        forest.validate()?;
        Ok(forest)
    }

    fn validate(&self) -> Result<(), ForestError> {
        if self.n_features == 0 || self.n_features > MAX_FEATURES {
            return Err(ForestError::Invalid(format!(
                "feature count {} outside 1..={MAX_FEATURES}",
                self.n_features
            )));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                return Err(ForestError::Invalid(format!(
                    "{} feature names for {} features",
                    names.len(),
                    self.n_features
                )));
            }
        }
        if self.trees.is_empty() {
            return Err(ForestError::Invalid("forest has no trees".into()));
        }
        if self.unique_times.is_empty() {
            return Err(ForestError::Invalid("forest has no time points".into()));
        }
        for (i, t) in self.unique_times.iter().enumerate() {
            if !t.is_finite() || (i > 0 && *t <= self.unique_times[i - 1]) {
                return Err(ForestError::Invalid(format!(
                    "time points must be finite and strictly increasing (index {i})"
                )));
            }
        }

        let n_times = self.unique_times.len();
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.n_features, n_times)?;
        }

        Ok(())
    }
}

impl SurvivalModel for RandomSurvivalForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_survival_function(&self, input: &ModelInput) -> Result<SurvivalCurve, ModelError> {
        let row = input.values();
        if row.len() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        if let Some(names) = &self.feature_names {
            if let Some((index, (expected, actual))) = names
                .iter()
                .zip(input.columns())
                .enumerate()
                .find(|(_, (expected, actual))| expected != actual)
            {
                return Err(ModelError::ColumnMismatch {
                    index,
                    expected: expected.clone(),
                    actual: actual.clone(),
                });
            }
        }

        if let Some(i) = row.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteInput(input.columns()[i].clone()));
        }

        let mut survival = vec![0.0; self.unique_times.len()];
        for tree in &self.trees {
            for (acc, p) in survival.iter_mut().zip(tree.leaf_for(row)) {
                *acc += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        for p in survival.iter_mut() {
            // Averaging can drift past 1.0 by an ulp.
            *p = (*p / n_trees).clamp(0.0, 1.0);
        }

        Ok(SurvivalCurve::new(self.unique_times.clone(), survival)?)
    }
}
