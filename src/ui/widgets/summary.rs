// src/ui/widgets/summary.rs

use super::analysis_view::score_style;
use crate::app::App;
use prism_scan::core::aggregator::WeightProfileName;
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};
use strum::IntoEnumIterator;

/// Renders the five aggregate scores of the current record.
///
/// The score for the selected profile is shown as the headline with an
/// animated gauge; the others are listed below it, the selected one
/// highlighted. The adversarial score may be 0 or 11 and is shown as is.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Headline score
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(7), // All aggregates
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Record metadata
        ])
        .split(area);

    let Some(record) = app.record.as_ref() else {
        return;
    };
    let headline = record.scores.for_profile(app.profile);

    // --- Headline ---
    let rating = match headline {
        9.. => "Excellent",
        7..=8 => "Good",
        5..=6 => "Needs Improvement",
        _ => "Poor",
    };
    let score_text = Text::from(vec![
        Line::from(format!("{} score", app.profile).bold()),
        Line::from(format!("{}/10 ({})", headline, rating)).style(score_style(Some(headline))),
    ]);
    frame.render_widget(Paragraph::new(score_text).alignment(Alignment::Center), summary_chunks[0]);

    let gauge = Gauge::default()
        .percent(u16::from(app.displayed_score.min(10)) * 10)
        .label("")
        .style(score_style(Some(app.displayed_score)));
    frame.render_widget(gauge, summary_chunks[1]);

    // --- Aggregates ---
    let mut lines: Vec<Line> = WeightProfileName::iter()
        .map(|name| {
            let marker = if name == app.profile { "▶ " } else { "  " };
            let line = Line::from(vec![
                Span::raw(marker),
                Span::raw(format!("{:<10}", name.to_string())),
                Span::styled(
                    format!("{:>2}", record.scores.for_profile(name)),
                    score_style(Some(record.scores.for_profile(name))),
                ),
            ]);
            if name == app.profile { line.bold() } else { line }
        })
        .collect();
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::raw(format!("{:<10}", "adversarial")),
        Span::styled(format!("{:>2}", record.scores.adversarial), Style::default().fg(Color::Magenta)),
    ]));
    let aggregates = Paragraph::new(lines).block(Block::default().title("AGGREGATES".bold()));
    frame.render_widget(aggregates, summary_chunks[3]);

    // --- Metadata ---
    let meta = Text::from(vec![
        Line::from(vec![Span::raw("Key: "), Span::styled(record.url.as_str(), Style::default().fg(Color::Cyan))]),
        Line::from(format!("Probes: {}", record.probes.len())),
        Line::from(format!("Duration: {:.2}s", record.duration)),
        Line::from(format!("Stored: {}", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))),
    ]);
    frame.render_widget(Paragraph::new(meta).wrap(Wrap { trim: true }), summary_chunks[5]);
}
