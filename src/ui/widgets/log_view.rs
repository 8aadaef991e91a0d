// src/ui/widgets/log_view.rs

use crate::app::App;
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation},
};

/// Splits "DATE TIME rest" so the timestamp can be dimmed. Lines in any
/// other shape are returned whole.
fn styled_line(line: &str) -> Line<'_> {
    let mut parts = line.splitn(3, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(time), Some(rest)) => Line::from(vec![
            Span::styled(format!("{} {}", date, time), Style::default().fg(Color::DarkGray)),
            Span::raw(format!(" {}", rest)),
        ]),
        _ => Line::from(line),
    }
}

/// Renders the tail of the log file with a horizontal scrollbar for long
/// lines. Only the rows that fit are shown, newest at the bottom.
pub fn render_log_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .title("Logs (scroll with ← →)")
        .borders(Borders::ALL);
    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let visible = usize::from(inner_area.height.saturating_sub(1));
    let start = app.log_content.len().saturating_sub(visible);
    let shown = &app.log_content[start..];

    let max_width = shown.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    app.log_horizontal_scroll_state = app.log_horizontal_scroll_state.content_length(max_width);

    let log_lines: Vec<Line> = shown.iter().map(|line| styled_line(line)).collect();
    let log_paragraph = Paragraph::new(log_lines).scroll((0, app.log_horizontal_scroll as u16));
    frame.render_widget(log_paragraph, inner_area);

    let scrollbar = Scrollbar::new(ScrollbarOrientation::HorizontalBottom).thumb_symbol("■");
    let scrollbar_area = Rect {
        x: inner_area.x,
        y: inner_area.y + inner_area.height.saturating_sub(1),
        width: inner_area.width,
        height: 1,
    };
    frame.render_stateful_widget(scrollbar, scrollbar_area, &mut app.log_horizontal_scroll_state);
}
