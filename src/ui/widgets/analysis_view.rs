// src/ui/widgets/analysis_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use prism_scan::core::catalog::{self, ProbeCategory};
use prism_scan::core::scoring::parse_line;
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

pub fn score_style(score: Option<u8>) -> Style {
    match score {
        Some(8..) => Style::default().fg(Color::Green),
        Some(5..=7) => Style::default().fg(Color::Yellow),
        Some(_) => Style::default().fg(Color::Red),
        None => Style::default().fg(Color::DarkGray),
    }
}

pub fn render_analysis_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Probe Results (Navigate with ↑ ↓)");

    let Some(record) = app.record.as_ref().filter(|_| matches!(app.state, AppState::Finished)) else {
        let content = match &app.state {
            AppState::Scanning => {
                let spinner_char = SPINNER_CHARS[app.spinner_frame];
                Paragraph::new(Line::from(vec![
                    Span::styled(format!("{} ", spinner_char), Style::default().fg(Color::Cyan)),
                    Span::raw("Running all probes... Please wait."),
                ]))
            }
            AppState::Failed(message) => Paragraph::new(vec![
                Line::from("Scan failed".bold().fg(Color::Red)),
                Line::from(""),
                Line::from(message.as_str()),
            ])
            .wrap(Wrap { trim: true }),
            _ => Paragraph::new("Probe results will appear here..."),
        };
        frame.render_widget(content.alignment(Alignment::Center).block(main_block), area);
        return;
    };

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Min(0)])
        .split(inner_area);

    let items: Vec<ListItem> = record
        .probes
        .iter()
        .map(|entry| {
            let score = parse_line(&entry.result);
            let prefix = match catalog::get_probe_detail(&entry.name).map(|d| d.category) {
                Some(ProbeCategory::Privacy) => "[PRIV] ",
                Some(ProbeCategory::Security) => "[SEC]  ",
                None => "       ",
            };
            let badge = score.map_or_else(|| " -- ".to_string(), |s| format!("{:>2}  ", s));
            ListItem::new(Line::from(vec![
                Span::styled(badge, score_style(score).bold()),
                Span::styled(prefix, Style::default().fg(Color::DarkGray)),
                Span::raw(entry.name.as_str()),
            ]))
        })
        .collect();

    let probe_list = List::new(items)
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(probe_list, chunks[0], &mut app.probe_list_state);

    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let Some(entry) = app.selected_probe() else {
        let p = Paragraph::new("Select a probe above to see details.")
            .alignment(Alignment::Center)
            .block(detail_block);
        frame.render_widget(p, chunks[1]);
        return;
    };

    let mut text = vec![
        Line::from("RESULT:".yellow().bold()),
        Line::from(entry.result.as_str()),
    ];
    if let Some(detail) = catalog::get_probe_detail(&entry.name) {
        text.extend([
            Line::from(""),
            Line::from(format!("WHAT IT CHECKS ({}):", detail.category).yellow().bold()),
            Line::from(detail.description),
            Line::from(""),
            Line::from("HOW TO IMPROVE:".yellow().bold()),
            Line::from(detail.remediation),
        ]);
    }
    let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(detail_block);
    frame.render_widget(p, chunks[1]);
}
