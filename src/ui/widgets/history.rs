// src/ui/widgets/history.rs

use super::analysis_view::score_style;
use crate::app::App;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// Lists every stored record, most recently written first.
pub fn render_history(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Scan History ({}) - Enter opens a record", app.history.len()));

    if app.history.is_empty() {
        let empty = Paragraph::new("No scans stored yet.").alignment(Alignment::Center).block(block);
        frame.render_widget(empty, area);
        return;
    }

    let profile = app.profile;
    let items: Vec<ListItem> = app
        .history
        .iter()
        .map(|record| {
            let score = record.scores.for_profile(profile);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>2}  ", score), score_style(Some(score)).bold()),
                Span::styled(
                    format!("{}  ", record.timestamp.format("%Y-%m-%d %H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(record.url.as_str()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(list, area, &mut app.history_list_state);
}
