//! Input records and their reconciliation against the model's feature schema.
//!
//! A form submission produces an [`InputRecord`]: numeric measurements plus
//! reference-coded indicator columns. Before inference the record is
//! reconciled into a [`ModelInput`] whose columns are exactly the
//! [`FeatureSchema`], position for position.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::variables::{indicator_column, CategoricalVariable, NumericVariable};

/// Errors from categorical encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("{variable}: '{selected}' is not one of the allowed options")]
    UnknownOption { variable: String, selected: String },

    #[error("{variable}: no options declared")]
    NoOptions { variable: String },
}

/// Errors from feature schema construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Feature schema is empty")]
    Empty,

    #[error("Feature schema lists column '{0}' more than once")]
    DuplicateColumn(String),
}

/// Reference-category dummy encoding of one categorical selection.
///
/// Produces one `<variable>_<option>` column per non-reference option, in
/// option order. The selected option gets 1.0, all others 0.0; selecting the
/// reference (first) option yields all zeros.
///
/// # Errors
/// Returns `EncodingError` if `options` is empty or `selected` is not among
/// them.
pub fn encode(
    variable: &str,
    options: &[&str],
    selected: &str,
) -> Result<Vec<(String, f64)>, EncodingError> {
    let Some((_reference, others)) = options.split_first() else {
        return Err(EncodingError::NoOptions {
            variable: variable.to_string(),
        });
    };

    if !options.contains(&selected) {
        return Err(EncodingError::UnknownOption {
            variable: variable.to_string(),
            selected: selected.to_string(),
        });
    }

    Ok(others
        .iter()
        .map(|option| {
            let value = if *option == selected { 1.0 } else { 0.0 };
            (indicator_column(variable, option), value)
        })
        .collect())
}

/// One row of named feature values, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    columns: Vec<(String, f64)>,
}

impl InputRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from the form's numeric values and categorical choices.
    ///
    /// Numeric values are expected to have passed their control's bounds
    /// check already.
    ///
    /// # Errors
    /// Returns `EncodingError` if a categorical choice is not a declared option.
    pub fn collect<'a, N, C>(numeric: N, categorical: C) -> Result<Self, EncodingError>
    where
        N: IntoIterator<Item = (&'a NumericVariable, f64)>,
        C: IntoIterator<Item = (&'a CategoricalVariable, &'a str)>,
    {
        let mut record = Self::new();

        for (variable, value) in numeric {
            record.insert(variable.column, value);
        }

        for (variable, selected) in categorical {
            for (column, value) in encode(variable.column, variable.options, selected)? {
                record.insert(column, value);
            }
        }

        Ok(record)
    }

    /// Set a column, replacing an existing value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: f64) {
        let column = column.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| *value)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

/// Ordered list of columns the trained model expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema from its ordered column names.
    ///
    /// # Errors
    /// Returns `SchemaError` if the list is empty or contains duplicates.
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }

        Ok(Self { columns })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<'de> Deserialize<'de> for FeatureSchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let columns = Vec::<String>::deserialize(deserializer)?;
        Self::new(columns).map_err(serde::de::Error::custom)
    }
}

/// A record projected onto a feature schema.
///
/// `columns` equals the schema it was reconciled against, in order;
/// `values[i]` belongs to `columns[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl ModelInput {
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|i| self.values[i])
    }
}

/// Reconcile a record against the schema.
///
/// Phase 1 zero-fills every schema column the record lacks. Phase 2 projects
/// the padded record onto the schema order; record columns the schema does
/// not know are left out.
#[must_use]
pub fn reconcile(record: &InputRecord, schema: &FeatureSchema) -> ModelInput {
    // Phase 1: set difference, zero-fill.
    let mut padded = record.clone();
    let missing: Vec<&String> = schema
        .columns()
        .iter()
        .filter(|column| !record.contains(column))
        .collect();
    for column in &missing {
        padded.insert(column.as_str(), 0.0);
    }

    let schema_columns: HashSet<&str> = schema.columns().iter().map(String::as_str).collect();
    let dropped = padded
        .column_names()
        .filter(|name| !schema_columns.contains(name))
        .count();

    tracing::debug!(
        "Reconciled record: {} columns collected, {} zero-filled, {} not in schema",
        record.len(),
        missing.len(),
        dropped
    );

    // Phase 2: positional projection.
    let values = schema
        .columns()
        .iter()
        .map(|column| padded.get(column).unwrap_or(0.0))
        .collect();

    ModelInput {
        columns: schema.columns().to_vec(),
        values,
    }
}
