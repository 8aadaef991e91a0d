// src/ui/widgets/input.rs
use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

/// Renders the URL input box. The title shows the profile used for the
/// headline score.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let title = Line::from(vec![
        Span::raw("Target URL "),
        Span::styled(format!("[profile: {}]", app.profile), Style::new().fg(Color::Cyan)),
    ]);
    let input_block = Block::default().borders(Borders::ALL).title(title);
    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    if matches!(app.state, AppState::Idle) && !app.show_disclaimer {
        frame.set_cursor_position((area.x + app.input.chars().count() as u16 + 1, area.y + 1));
    }
}
