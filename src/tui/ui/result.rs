//! Risk result panel: headline estimate and survival curve chart.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, LegendPosition, Paragraph, Wrap},
    Frame,
};

use crate::domain::{RiskAssessment, SurvivalCurve};
use crate::tui::styles::MedicalTheme;

/// Result panel state
#[derive(Debug, Clone, Default)]
pub enum ResultState {
    /// Nothing computed for the current form values
    #[default]
    Idle,
    /// Risk computed for the current form values
    Shown { assessment: RiskAssessment },
    /// The last computation failed
    Error { message: String },
}

/// Points tracing the curve as a step function from t = 0.
///
/// The first value is held back to 0, matching [`SurvivalCurve::evaluate`].
#[must_use]
pub fn step_points(curve: &SurvivalCurve) -> Vec<(f64, f64)> {
    let probabilities = curve.probabilities();
    let mut points = Vec::with_capacity(curve.times().len() * 2);
    let mut previous = probabilities[0];
    points.push((0.0, previous));
    for (t, p) in curve.points().into_iter().skip(1) {
        points.push((t, previous));
        points.push((t, p));
        previous = p;
    }
    points
}

/// Render the result panel
pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    match state {
        ResultState::Idle => render_idle(f, area),
        ResultState::Shown { assessment } => render_assessment(f, area, assessment),
        ResultState::Error { message } => render_error(f, area, message),
    }
}

fn render_idle(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "Fill in the patient data",
            MedicalTheme::text_secondary(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", MedicalTheme::text_muted()),
            Span::styled("[Enter]", MedicalTheme::key_hint()),
            Span::styled(" to compute risk", MedicalTheme::text_muted()),
        ]),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title(Span::styled(" 5-Year Risk ", MedicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_assessment(f: &mut Frame, area: Rect, assessment: &RiskAssessment) {
    let block = Block::default()
        .title(Span::styled(" 5-Year Risk ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border_focused());

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Headline
            Constraint::Length(3), // Gauge
            Constraint::Min(8),    // Chart
        ])
        .split(inner);

    let estimate = &assessment.estimate;
    let headline = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!(
                    "Estimated {}-year cardiovascular event risk: ",
                    estimate.horizon_years
                ),
                MedicalTheme::text(),
            ),
            Span::styled(estimate.percent_label(), MedicalTheme::risk_value()),
        ]),
        Line::from(Span::styled(
            format!(
                "Survival at {} years: {:.2}%  │  computed {}",
                estimate.horizon_years,
                estimate.survival * 100.0,
                assessment.computed_at.format("%H:%M:%S UTC")
            ),
            MedicalTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(headline, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(MedicalTheme::info())
        .ratio(estimate.risk.clamp(0.0, 1.0))
        .label(estimate.percent_label());
    f.render_widget(gauge, chunks[1]);

    render_survival_chart(f, chunks[2], assessment);
}

fn render_survival_chart(f: &mut Frame, area: Rect, assessment: &RiskAssessment) {
    let horizon = assessment.estimate.horizon_years;
    let curve_points = step_points(&assessment.curve);
    let marker_points = [(horizon, 0.0), (horizon, 1.0)];
    let x_max = assessment.curve.max_time().max(horizon);

    let datasets = vec![
        Dataset::default()
            .name("Estimated survival")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(MedicalTheme::curve())
            .data(&curve_points),
        Dataset::default()
            .name(format!("{horizon} years"))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(MedicalTheme::horizon_marker())
            .data(&marker_points),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(Span::styled(
                    " Estimated Survival Curve ",
                    MedicalTheme::subtitle(),
                ))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .x_axis(
            Axis::default()
                .title(Span::styled("Time (years)", MedicalTheme::text_secondary()))
                .style(MedicalTheme::text_muted())
                .bounds([0.0, x_max])
                .labels(vec![
                    "0".to_string(),
                    format!("{:.1}", x_max / 2.0),
                    format!("{x_max:.1}"),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled(
                    "P(no event)",
                    MedicalTheme::text_secondary(),
                ))
                .style(MedicalTheme::text_muted())
                .bounds([0.0, 1.0])
                .labels(vec!["0.0", "0.5", "1.0"]),
        )
        .legend_position(Some(LegendPosition::BottomLeft))
        .hidden_legend_constraints((Constraint::Percentage(60), Constraint::Percentage(60)));

    f.render_widget(chart, area);
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "! Risk could not be computed",
            MedicalTheme::danger().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message, MedicalTheme::text())),
        Line::from(""),
        Line::from(Span::styled(
            "Adjust the form and press [Enter] to try again",
            MedicalTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(MedicalTheme::danger()),
    );

    f.render_widget(content, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_points_hold_value_between_times() {
        let curve = SurvivalCurve::new(vec![2.0, 5.0], vec![0.9, 0.8]).expect("curve");
        assert_eq!(
            step_points(&curve),
            vec![(0.0, 0.9), (5.0, 0.9), (5.0, 0.8)]
        );
        for (t, p) in step_points(&curve) {
            if t < 5.0 {
                assert_eq!(curve.evaluate(t), Ok(p));
            }
        }
    }
}
