// src/ui/layout.rs

use ratatui::layout::{Constraint, Direction, Layout, Rect};

// Below this width the summary moves under the report instead of beside it.
const NARROW_WIDTH: u16 = 100;

/// Screen regions for one frame. `log_panel` is empty while logs are hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub input: Rect,
    pub report: Rect,
    pub summary: Rect,
    pub log_panel: Rect,
    pub footer: Rect,
}

/// Splits the frame into the URL input, the content area and the footer.
///
/// On wide terminals the content area holds the report (or history), the
/// score summary and the optional log panel side by side. On narrow ones the
/// report and summary are stacked, and the log panel takes the right third.
pub fn create_layout(frame_size: Rect, show_logs: bool) -> AppLayout {
    let [input, content, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame_size);

    let (main, log_panel) = if show_logs {
        let share = if frame_size.width < NARROW_WIDTH { 34 } else { 33 };
        let [main, logs] =
            Layout::horizontal([Constraint::Percentage(100 - share), Constraint::Percentage(share)])
                .areas(content);
        (main, logs)
    } else {
        (content, Rect::default())
    };

    let [report, summary] = if frame_size.width < NARROW_WIDTH {
        Layout::vertical([Constraint::Min(8), Constraint::Length(17)]).areas(main)
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(67), Constraint::Percentage(33)])
            .areas(main)
    };

    AppLayout { input, report, summary, log_panel, footer }
}
