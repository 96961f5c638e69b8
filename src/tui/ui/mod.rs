//! UI module: View components for the TUI.

pub mod form;
pub mod result;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::MedicalTheme;
use form::{render_form, FormState};
use result::{render_result, ResultState};

/// Render the whole single-page view.
pub fn render_page(f: &mut Frame, area: Rect, form: &FormState, result: &ResultState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form + result
            Constraint::Length(3), // Key hints
            Constraint::Length(3), // Disclaimer
        ])
        .split(area);

    render_header(f, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    render_form(f, body[0], form);
    render_result(f, body[1], result);

    render_footer(f, chunks[2], form);
    render_disclaimer(f, chunks[3]);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Cardiosurv", MedicalTheme::title()),
        Span::styled(" │ ", MedicalTheme::text_muted()),
        Span::styled(
            "5-Year Cardiovascular Risk in People Living with HIV",
            MedicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_footer(f: &mut Frame, area: Rect, form: &FormState) {
    let content = if let Some(ref error) = form.error_message {
        Line::from(Span::styled(format!("! {error}"), MedicalTheme::danger()))
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", MedicalTheme::key_hint()),
            Span::styled("Navigate ", MedicalTheme::key_desc()),
            Span::styled("[←→] ", MedicalTheme::key_hint()),
            Span::styled("Change option ", MedicalTheme::key_desc()),
            Span::styled("[Del] ", MedicalTheme::key_hint()),
            Span::styled("Clear ", MedicalTheme::key_desc()),
            Span::styled("[Enter] ", MedicalTheme::key_hint()),
            Span::styled("Compute risk ", MedicalTheme::key_desc()),
            Span::styled("[Esc] ", MedicalTheme::key_hint()),
            Span::styled("Quit", MedicalTheme::key_desc()),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![Line::from(vec![Span::styled(
        "DISCLAIMER: This tool provides indicative estimates and does not replace professional medical evaluation.",
        MedicalTheme::text_muted(),
    )])];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(MedicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
