// src/ui/widgets/footer.rs

use crate::app::{App, AppState, View};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the footer widget, which displays available actions.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let spans = match app.state {
        AppState::Idle => Line::from(vec![
            key("Enter"),
            Span::raw(" scan, "),
            key("Tab"),
            Span::raw(" profile, "),
            key("Esc"),
            Span::raw(" quit"),
        ]),
        AppState::Finished | AppState::Failed(_) => {
            let history = if app.view == View::History { "ide history, " } else { "istory, " };
            Line::from(vec![
                key("[N]"),
                Span::raw("ew scan, "),
                key("[H]"),
                Span::raw(history),
                key("[L]"),
                Span::raw("ogs, "),
                key("Tab"),
                Span::raw(" profile, "),
                key("[Q]"),
                Span::raw("uit"),
            ])
        }
        AppState::Scanning => Line::from("Scanning... Press Esc to quit."),
    };

    let footer = Paragraph::new(spans).alignment(Alignment::Center);
    frame.render_widget(footer, area);
}
