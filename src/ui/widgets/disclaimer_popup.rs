// src/ui/widgets/disclaimer_popup.rs

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    text::Line,
};

/// Renders the start-up notice as a centered popup over the rest of the UI.
pub fn render_disclaimer_popup(frame: &mut Frame, area: Rect) {
    let disclaimer_text = Text::from(vec![
        Line::from("BEFORE YOU SCAN".bold().yellow()),
        Line::from(""),
        Line::from("PrismScan sends ordinary HTTP requests and TLS handshakes to the URL you enter, plus a handful of requests for common directories. It does not exploit anything, but it is still traffic you are responsible for."),
        Line::from(""),
        Line::from("Only scan sites you own or are authorized to assess. Scores are heuristic: a high score is not proof of security and a low one is not proof of a vulnerability."),
        Line::from(""),
        Line::from("Results are cached per URL: scanning the same page again returns the stored record."),
        Line::from(""),
        Line::from("Press ".bold() + "Enter".bold().yellow() + " to continue, ".bold() + "Esc".bold().yellow() + " to quit".bold()),
    ]);

    let block = Block::default()
        .title("Notice")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let popup_area = centered_rect(60, 50, area);

    let popup = Paragraph::new(disclaimer_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// A `Rect` of the given size percentages centered within `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}