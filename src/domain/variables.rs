//! Clinical variables collected by the form.
//!
//! Column names match the training data of the survival forest; the first
//! option of every categorical variable is its reference category.

/// Error raised when a numeric entry falls outside its declared bounds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundsError {
    #[error("{label}: not a valid number")]
    NotANumber { label: &'static str },

    #[error("{label}: value must be a whole number")]
    NotAnInteger { label: &'static str },

    #[error("{label}: value must be at least {min}")]
    BelowMinimum { label: &'static str, min: f64 },

    #[error("{label}: value must be at most {max}")]
    AboveMaximum { label: &'static str, max: f64 },
}

/// A numeric clinical measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericVariable {
    /// Model column name
    pub column: &'static str,
    /// Label shown next to the control
    pub label: &'static str,
    /// Initial value of the control
    pub default: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Whole numbers only (counts, years)
    pub integer: bool,
}

impl NumericVariable {
    /// Parse a raw entry and check it against the declared bounds.
    ///
    /// # Errors
    /// Returns `BoundsError` if the entry is unparsable, fractional for an
    /// integer variable, or out of range.
    pub fn parse(&self, raw: &str) -> Result<f64, BoundsError> {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| BoundsError::NotANumber { label: self.label })?;
        self.check(value)
    }

    /// Check an already parsed value against the declared bounds.
    ///
    /// # Errors
    /// See [`NumericVariable::parse`].
    pub fn check(&self, value: f64) -> Result<f64, BoundsError> {
        if !value.is_finite() {
            return Err(BoundsError::NotANumber { label: self.label });
        }
        if self.integer && value.fract() != 0.0 {
            return Err(BoundsError::NotAnInteger { label: self.label });
        }
        if let Some(min) = self.min {
            if value < min {
                return Err(BoundsError::BelowMinimum {
                    label: self.label,
                    min,
                });
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(BoundsError::AboveMaximum {
                    label: self.label,
                    max,
                });
            }
        }
        Ok(value)
    }

    /// Whether the control may accept a leading minus sign.
    #[must_use]
    pub fn allows_negative(&self) -> bool {
        self.min.map_or(true, |min| min < 0.0)
    }

    /// Render a value the way the control displays it.
    #[must_use]
    pub fn format_value(&self, value: f64) -> String {
        if self.integer {
            format!("{value:.0}")
        } else {
            format!("{value}")
        }
    }

    /// Short bounds hint, e.g. `0-100` or `>= 0`.
    #[must_use]
    pub fn hint(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{min}-{max}"),
            (Some(min), None) => format!(">= {min}"),
            (None, Some(max)) => format!("<= {max}"),
            (None, None) => String::new(),
        }
    }
}

/// A categorical clinical attribute, dummy-encoded against its first option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoricalVariable {
    /// Model column prefix
    pub column: &'static str,
    /// Allowed options; the first one is the reference category
    pub options: &'static [&'static str],
}

impl CategoricalVariable {
    /// Label shown next to the control.
    #[must_use]
    pub fn label(&self) -> String {
        self.column.replace('_', " ")
    }

    /// The reference option (encoded as all zeros).
    #[must_use]
    pub fn reference(&self) -> &'static str {
        self.options[0]
    }

    /// Indicator columns this variable can produce, in option order.
    pub fn indicator_columns(&self) -> impl Iterator<Item = String> + '_ {
        self.options[1..]
            .iter()
            .map(move |option| indicator_column(self.column, option))
    }
}

/// Name of the indicator column for one option of a categorical variable.
#[must_use]
pub fn indicator_column(variable: &str, option: &str) -> String {
    format!("{variable}_{option}")
}

/// Numeric variables, in form order.
pub static NUMERIC_VARIABLES: [NumericVariable; 9] = [
    NumericVariable {
        column: "Age",
        label: "Age",
        default: 45.0,
        min: Some(0.0),
        max: Some(100.0),
        integer: true,
    },
    NumericVariable {
        column: "CD4_Nadir",
        label: "CD4 nadir",
        default: 350.0,
        min: Some(0.0),
        max: None,
        integer: true,
    },
    NumericVariable {
        column: "CD8_Nadir",
        label: "CD8 nadir",
        default: 1000.0,
        min: Some(0.0),
        max: None,
        integer: true,
    },
    NumericVariable {
        column: "CD4_CD8_Ratio",
        label: "CD4/CD8 ratio",
        default: 0.5,
        min: Some(0.0),
        max: None,
        integer: false,
    },
    NumericVariable {
        column: "Cholesterol",
        label: "Total cholesterol (mg/dL)",
        default: 180.0,
        min: None,
        max: None,
        integer: false,
    },
    NumericVariable {
        column: "HDL",
        label: "HDL (mg/dL)",
        default: 50.0,
        min: None,
        max: None,
        integer: false,
    },
    NumericVariable {
        column: "Triglycerides",
        label: "Triglycerides (mg/dL)",
        default: 150.0,
        min: None,
        max: None,
        integer: false,
    },
    NumericVariable {
        column: "Non_HDL_Cholesterol",
        label: "Non-HDL cholesterol (mg/dL)",
        default: 130.0,
        min: None,
        max: None,
        integer: false,
    },
    NumericVariable {
        column: "Triglyceride_HDL_Ratio",
        label: "TG/HDL ratio",
        default: 3.0,
        min: None,
        max: None,
        integer: false,
    },
];

/// Categorical variables, in form order.
pub static CATEGORICAL_VARIABLES: [CategoricalVariable; 12] = [
    CategoricalVariable {
        column: "Sex",
        options: &["Man", "Woman"],
    },
    CategoricalVariable {
        column: "Transmission_mode",
        options: &[
            "Homo/Bisexual",
            "Injecting Drug User",
            "Heterosexual",
            "Other or Unknown",
        ],
    },
    CategoricalVariable {
        column: "Origin",
        options: &["Spain", "Not Spain"],
    },
    CategoricalVariable {
        column: "Education_Level",
        options: &[
            "No studies",
            "Primary",
            "Secondary/High School",
            "University",
            "Other/Unknown",
        ],
    },
    CategoricalVariable {
        column: "AIDS",
        options: &["No", "Yes"],
    },
    CategoricalVariable {
        column: "Viral_Load",
        options: &["< 100.000 copies/ml", "≥ 100.000 copies/ml"],
    },
    CategoricalVariable {
        column: "ART",
        options: &["2NRTI+1NNRTI", "2NRTI+1IP", "2NRTI+1II", "Other"],
    },
    CategoricalVariable {
        column: "Hepatitis_C",
        options: &["Negative", "Positive"],
    },
    CategoricalVariable {
        column: "Anticore_HBV",
        options: &["Negative", "Positive"],
    },
    CategoricalVariable {
        column: "HBP",
        options: &["No", "Yes"],
    },
    CategoricalVariable {
        column: "Smoking",
        options: &["No Smoking", "Current Smoking", "Past Smoking"],
    },
    CategoricalVariable {
        column: "Diabetes",
        options: &["No", "Yes"],
    },
];

/// Every column the form can produce, numeric first, then indicators.
#[must_use]
pub fn form_columns() -> Vec<String> {
    NUMERIC_VARIABLES
        .iter()
        .map(|v| v.column.to_string())
        .chain(CATEGORICAL_VARIABLES.iter().flat_map(|v| v.indicator_columns()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_bounds() {
        let age = &NUMERIC_VARIABLES[0];
        assert_eq!(age.parse("45"), Ok(45.0));
        assert!(matches!(
            age.parse("101"),
            Err(BoundsError::AboveMaximum { .. })
        ));
        assert!(matches!(
            age.parse("-1"),
            Err(BoundsError::BelowMinimum { .. })
        ));
        assert!(matches!(
            age.parse("45.5"),
            Err(BoundsError::NotAnInteger { .. })
        ));
        assert!(matches!(age.parse("abc"), Err(BoundsError::NotANumber { .. })));
    }

    #[test]
    fn test_unbounded_lipids_accept_anything_finite() {
        let chol = NUMERIC_VARIABLES
            .iter()
            .find(|v| v.column == "Cholesterol")
            .expect("cholesterol declared");
        assert_eq!(chol.parse("-5.5"), Ok(-5.5));
        assert!(chol.allows_negative());
        assert!(chol.parse("inf").is_err());
    }

    #[test]
    fn test_defaults_are_within_bounds() {
        for var in &NUMERIC_VARIABLES {
            assert_eq!(var.check(var.default), Ok(var.default), "{}", var.column);
        }
    }

    #[test]
    fn test_categorical_labels_and_columns() {
        let mode = &CATEGORICAL_VARIABLES[1];
        assert_eq!(mode.label(), "Transmission mode");
        assert_eq!(mode.reference(), "Homo/Bisexual");
        let cols: Vec<String> = mode.indicator_columns().collect();
        assert_eq!(
            cols,
            vec![
                "Transmission_mode_Injecting Drug User",
                "Transmission_mode_Heterosexual",
                "Transmission_mode_Other or Unknown",
            ]
        );
    }

    #[test]
    fn test_form_columns_count() {
        // 9 numeric + sum(options - 1) over categorical variables
        let indicators: usize = CATEGORICAL_VARIABLES
            .iter()
            .map(|v| v.options.len() - 1)
            .sum();
        assert_eq!(indicators, 20);
        assert_eq!(form_columns().len(), 29);
    }
}
