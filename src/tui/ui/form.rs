//! Clinical data entry form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::domain::{
    BoundsError, CategoricalVariable, InputRecord, NumericVariable, CATEGORICAL_VARIABLES,
    NUMERIC_VARIABLES,
};
use crate::tui::styles::MedicalTheme;
use crate::CardiosurvError;

/// One control of the form.
#[derive(Debug, Clone)]
pub enum FormField {
    /// Free numeric entry checked against the variable's bounds
    Numeric {
        variable: &'static NumericVariable,
        buffer: String,
        accepted: f64,
    },
    /// Option picker; index 0 is the reference option
    Categorical {
        variable: &'static CategoricalVariable,
        selected: usize,
    },
}

impl FormField {
    fn numeric(variable: &'static NumericVariable) -> Self {
        Self::Numeric {
            variable,
            buffer: variable.format_value(variable.default),
            accepted: variable.default,
        }
    }

    fn categorical(variable: &'static CategoricalVariable) -> Self {
        Self::Categorical {
            variable,
            selected: 0,
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Numeric { variable, .. } => variable.label.to_string(),
            Self::Categorical { variable, .. } => variable.label(),
        }
    }
}

/// Form state: every declared variable with its current value.
pub struct FormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for FormState {
    fn default() -> Self {
        let fields = NUMERIC_VARIABLES
            .iter()
            .map(FormField::numeric)
            .chain(CATEGORICAL_VARIABLES.iter().map(FormField::categorical))
            .collect();

        Self {
            fields,
            selected_field: 0,
            error_message: None,
        }
    }
}

impl FormState {
    /// Move to the next field, committing the current one.
    pub fn next_field(&mut self) {
        self.commit_current();
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    /// Move to the previous field, committing the current one.
    pub fn prev_field(&mut self) {
        self.commit_current();
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Accept the current numeric entry, or revert it if out of bounds.
    ///
    /// Returns `false` if the entry was rejected.
    pub fn commit_current(&mut self) -> bool {
        self.try_commit().is_ok()
    }

    fn try_commit(&mut self) -> Result<(), BoundsError> {
        let FormField::Numeric {
            variable,
            buffer,
            accepted,
        } = &mut self.fields[self.selected_field]
        else {
            return Ok(());
        };

        match variable.parse(buffer) {
            Ok(value) => {
                *accepted = value;
                Ok(())
            }
            Err(e) => {
                *buffer = variable.format_value(*accepted);
                self.error_message = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Type a character into the current numeric field.
    ///
    /// Returns `true` if the character was accepted.
    pub fn input_char(&mut self, c: char) -> bool {
        let FormField::Numeric {
            variable, buffer, ..
        } = &mut self.fields[self.selected_field]
        else {
            return false;
        };

        let allowed = c.is_ascii_digit()
            || (c == '.' && !variable.integer && !buffer.contains('.'))
            || (c == '-' && variable.allows_negative() && buffer.is_empty());
        if allowed {
            buffer.push(c);
            self.error_message = None;
        }
        allowed
    }

    /// Delete the last character of the current numeric field.
    pub fn delete_char(&mut self) -> bool {
        match &mut self.fields[self.selected_field] {
            FormField::Numeric { buffer, .. } => buffer.pop().is_some(),
            FormField::Categorical { .. } => false,
        }
    }

    /// Clear the current numeric field.
    pub fn clear_field(&mut self) -> bool {
        match &mut self.fields[self.selected_field] {
            FormField::Numeric { buffer, .. } if !buffer.is_empty() => {
                buffer.clear();
                true
            }
            _ => false,
        }
    }

    /// Step the current categorical field to the next or previous option.
    pub fn cycle_option(&mut self, forward: bool) -> bool {
        let FormField::Categorical { variable, selected } = &mut self.fields[self.selected_field]
        else {
            return false;
        };

        let n = variable.options.len();
        *selected = if forward {
            (*selected + 1) % n
        } else {
            (*selected + n - 1) % n
        };
        true
    }

    /// Select an option of a categorical variable by label.
    ///
    /// Returns `false` if the variable or option does not exist.
    pub fn select_option(&mut self, column: &str, option: &str) -> bool {
        for field in &mut self.fields {
            if let FormField::Categorical { variable, selected } = field {
                if variable.column == column {
                    if let Some(i) = variable.options.iter().position(|o| *o == option) {
                        *selected = i;
                        return true;
                    }
                    return false;
                }
            }
        }
        false
    }

    /// Collect the current values into an input record.
    ///
    /// # Errors
    /// Returns `CardiosurvError::Bounds` for the first rejected numeric entry
    /// and `CardiosurvError::Encoding` for an undeclared option.
    pub fn to_input_record(&mut self) -> Result<InputRecord, CardiosurvError> {
        self.try_commit()?;

        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for field in &self.fields {
            match field {
                FormField::Numeric {
                    variable, buffer, ..
                } => {
                    let value = variable.parse(buffer)?;
                    numeric.push((*variable, value));
                }
                FormField::Categorical { variable, selected } => {
                    categorical.push((*variable, variable.options[*selected]));
                }
            }
        }

        Ok(InputRecord::collect(numeric, categorical)?)
    }
}

/// Render the form: measurements on the left, characteristics on the right.
pub fn render_form(f: &mut Frame, area: Rect, state: &FormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let split = NUMERIC_VARIABLES.len();
    render_field_column(
        f,
        columns[0],
        " Clinical Measurements ",
        &state.fields[..split],
        0,
        state.selected_field,
    );
    render_field_column(
        f,
        columns[1],
        " Patient Characteristics ",
        &state.fields[split..],
        split,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    title: &str,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let focused = (offset..offset + fields.len()).contains(&selected);
    let block = Block::default()
        .title(Span::styled(title, MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(if focused {
            MedicalTheme::border_focused()
        } else {
            MedicalTheme::border()
        });

    let lines: Vec<Line> = fields
        .iter()
        .enumerate()
        .flat_map(|(i, field)| {
            let row = field_line(field, offset + i == selected);
            [row, Line::from("")]
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn field_line(field: &FormField, is_selected: bool) -> Line<'static> {
    let label_style = if is_selected {
        MedicalTheme::selected()
    } else {
        MedicalTheme::text_secondary()
    };
    let label = Span::styled(format!(" {} ", field.label()), label_style);

    match field {
        FormField::Numeric {
            variable, buffer, ..
        } => {
            let mut spans = vec![label, Span::raw(" "), Span::styled(buffer.clone(), MedicalTheme::text())];
            if is_selected {
                spans.push(Span::styled("▌", MedicalTheme::subtitle()));
            }
            let hint = variable.hint();
            if !hint.is_empty() {
                spans.push(Span::styled(format!("  ({hint})"), MedicalTheme::text_muted()));
            }
            Line::from(spans)
        }
        FormField::Categorical { variable, selected } => {
            let value_style = if is_selected {
                MedicalTheme::subtitle()
            } else {
                MedicalTheme::text()
            };
            Line::from(vec![
                label,
                Span::raw(" "),
                Span::styled(
                    format!("‹ {} ›", variable.options[*selected]),
                    value_style,
                ),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(state: &mut FormState, label: &str) {
        state.selected_field = state
            .fields
            .iter()
            .position(|f| f.label() == label)
            .expect("field exists");
    }

    #[test]
    fn test_defaults_build_reference_record() {
        let mut state = FormState::default();
        assert_eq!(state.fields.len(), 21);

        let record = state.to_input_record().expect("record");
        assert_eq!(record.get("Age"), Some(45.0));
        assert_eq!(record.get("CD4_CD8_Ratio"), Some(0.5));
        assert_eq!(record.get("Sex_Woman"), Some(0.0));
        assert_eq!(record.len(), 29);
    }

    #[test]
    fn test_out_of_range_entry_is_reverted() {
        let mut state = FormState::default();
        select(&mut state, "Age");
        state.clear_field();
        for c in "150".chars() {
            assert!(state.input_char(c));
        }
        state.next_field();

        assert!(state.error_message.as_deref().unwrap_or("").contains("at most 100"));
        let record = state.to_input_record().expect("record");
        assert_eq!(record.get("Age"), Some(45.0));
    }

    #[test]
    fn test_rejected_entry_blocks_collection() {
        let mut state = FormState::default();
        select(&mut state, "Age");
        state.clear_field();
        assert!(matches!(
            state.to_input_record(),
            Err(CardiosurvError::Bounds(BoundsError::NotANumber { label: "Age" }))
        ));
        // The control reverted to the last accepted value.
        assert_eq!(state.to_input_record().expect("record").get("Age"), Some(45.0));
    }

    #[test]
    fn test_integer_fields_refuse_decimal_point_and_minus() {
        let mut state = FormState::default();
        select(&mut state, "CD4 nadir");
        assert!(!state.input_char('.'));
        assert!(!state.input_char('-'));
        assert!(!state.input_char('x'));

        select(&mut state, "CD4/CD8 ratio");
        state.clear_field();
        assert!(state.input_char('0'));
        assert!(state.input_char('.'));
        assert!(!state.input_char('.'));
        assert!(state.input_char('7'));
        assert_eq!(state.to_input_record().expect("record").get("CD4_CD8_Ratio"), Some(0.7));
    }

    #[test]
    fn test_cycle_and_select_options() {
        let mut state = FormState::default();
        select(&mut state, "Smoking");
        assert!(state.cycle_option(false));
        let record = state.to_input_record().expect("record");
        assert_eq!(record.get("Smoking_Past Smoking"), Some(1.0));
        assert_eq!(record.get("Smoking_Current Smoking"), Some(0.0));

        assert!(state.cycle_option(true));
        let record = state.to_input_record().expect("record");
        assert_eq!(record.get("Smoking_Past Smoking"), Some(0.0));

        assert!(state.select_option("Sex", "Woman"));
        assert!(!state.select_option("Sex", "Unknown"));
        assert_eq!(state.to_input_record().expect("record").get("Sex_Woman"), Some(1.0));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = FormState::default();
        state.prev_field();
        assert_eq!(state.selected_field, state.fields.len() - 1);
        state.next_field();
        assert_eq!(state.selected_field, 0);
    }
}
