// src/app.rs

use prism_scan::core::aggregator::{WeightProfileName, select_profile};
use prism_scan::core::coordinator::ScanOutcome;
use prism_scan::core::models::{ProbeEntry, ScanRecord};
use prism_scan::logging::read_log_tail;
use ratatui::widgets::{ListState, ScrollbarState};
use strum::IntoEnumIterator;

pub const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

const LOG_TAIL_LINES: usize = 200;

pub enum AppState {
    Idle,
    Scanning,
    Finished,
    Failed(String),
}

/// Which list the main panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Report,
    History,
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub view: View,
    pub input: String,
    pub show_disclaimer: bool,
    pub show_logs: bool,
    /// Profile used for the headline score of the next and current scan.
    pub profile: WeightProfileName,
    pub record: Option<ScanRecord>,
    pub history: Vec<ScanRecord>,
    pub probe_list_state: ListState,
    pub history_list_state: ListState,
    pub spinner_frame: usize,
    /// Animated towards the headline score on every tick.
    pub displayed_score: u8,
    pub log_content: Vec<String>,
    pub log_horizontal_scroll: usize,
    pub log_horizontal_scroll_state: ScrollbarState,
}

impl App {
    pub fn new(profile: WeightProfileName) -> Self {
        Self {
            should_quit: false,
            state: AppState::Idle,
            view: View::Report,
            input: String::new(),
            show_disclaimer: true,
            show_logs: false,
            profile,
            record: None,
            history: Vec::new(),
            probe_list_state: ListState::default(),
            history_list_state: ListState::default(),
            spinner_frame: 0,
            displayed_score: 0,
            log_content: Vec::new(),
            log_horizontal_scroll: 0,
            log_horizontal_scroll_state: ScrollbarState::default(),
        }
    }

    pub fn on_tick(&mut self) {
        if matches!(self.state, AppState::Scanning) {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
        let target = self.headline().unwrap_or(0);
        if self.displayed_score < target {
            self.displayed_score += 1;
        } else if self.displayed_score > target {
            self.displayed_score -= 1;
        }
        if self.show_logs {
            self.log_content = read_log_tail(LOG_TAIL_LINES);
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// The URL to submit, with `https://` added when no scheme was typed.
    pub fn target_url(&self) -> Option<String> {
        let raw = self.input.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.contains("://") {
            Some(raw.to_string())
        } else {
            Some(format!("https://{}", raw))
        }
    }

    pub fn start_scan(&mut self) {
        self.state = AppState::Scanning;
        self.view = View::Report;
        self.spinner_frame = 0;
    }

    pub fn finish_scan(&mut self, outcome: ScanOutcome) {
        self.profile = outcome.profile;
        self.record = Some(outcome.record);
        self.probe_list_state.select(Some(0));
        self.state = AppState::Finished;
    }

    pub fn fail_scan(&mut self, message: String) {
        self.record = None;
        self.state = AppState::Failed(message);
    }

    pub fn set_history(&mut self, records: Vec<ScanRecord>) {
        let selected = (!records.is_empty()).then_some(0);
        self.history = records;
        self.history_list_state.select(selected);
    }

    /// The aggregate of the current record under the selected profile.
    pub fn headline(&self) -> Option<u8> {
        self.record.as_ref().map(|r| r.scores.for_profile(self.profile))
    }

    /// Moves to the next profile, resolving it by name like any other
    /// profile selection.
    pub fn cycle_profile(&mut self) {
        let names: Vec<WeightProfileName> = WeightProfileName::iter().collect();
        let current = names.iter().position(|n| *n == self.profile).unwrap_or(0);
        let next = names[(current + 1) % names.len()].to_string();
        if let Ok(profile) = select_profile(&next) {
            self.profile = profile;
        }
    }

    pub fn toggle_history(&mut self) {
        self.view = match self.view {
            View::Report => View::History,
            View::History => View::Report,
        };
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
        if self.show_logs {
            self.log_content = read_log_tail(LOG_TAIL_LINES);
        }
    }

    pub fn selected_probe(&self) -> Option<&ProbeEntry> {
        let record = self.record.as_ref()?;
        record.probes.get(self.probe_list_state.selected()?)
    }

    /// Shows a record picked from the history in the report view.
    pub fn open_selected_history(&mut self) {
        let picked = self
            .history_list_state
            .selected()
            .and_then(|i| self.history.get(i))
            .cloned();
        if let Some(record) = picked {
            self.record = Some(record);
            self.probe_list_state.select(Some(0));
            self.state = AppState::Finished;
            self.view = View::Report;
        }
    }

    pub fn select_next(&mut self) {
        let (state, len) = self.active_list();
        if len > 0 {
            let next = state.selected().map_or(0, |i| (i + 1).min(len - 1));
            state.select(Some(next));
        }
    }

    pub fn select_previous(&mut self) {
        let (state, len) = self.active_list();
        if len > 0 {
            let previous = state.selected().map_or(0, |i| i.saturating_sub(1));
            state.select(Some(previous));
        }
    }

    fn active_list(&mut self) -> (&mut ListState, usize) {
        match self.view {
            View::Report => {
                let len = self.record.as_ref().map_or(0, |r| r.probes.len());
                (&mut self.probe_list_state, len)
            }
            View::History => (&mut self.history_list_state, self.history.len()),
        }
    }

    pub fn scroll_logs_left(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_sub(4);
        self.log_horizontal_scroll_state =
            self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn scroll_logs_right(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_add(4);
        self.log_horizontal_scroll_state =
            self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.view = View::Report;
        self.input = String::new();
        self.record = None;
        self.probe_list_state = ListState::default();
        self.displayed_score = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_cycles_through_every_profile() {
        let mut app = App::new(WeightProfileName::Normal);
        let mut seen = vec![app.profile];
        for _ in 0..4 {
            app.cycle_profile();
            seen.push(app.profile);
        }
        assert_eq!(
            seen,
            [
                WeightProfileName::Normal,
                WeightProfileName::Privacy,
                WeightProfileName::Security,
                WeightProfileName::Random,
                WeightProfileName::Normal,
            ]
        );
    }

    #[test]
    fn bare_hosts_get_an_https_scheme() {
        let mut app = App::new(WeightProfileName::Normal);
        assert_eq!(app.target_url(), None);
        app.input = "example.com/login?next=/".into();
        assert_eq!(app.target_url().as_deref(), Some("https://example.com/login?next=/"));
        app.input = "http://example.com".into();
        assert_eq!(app.target_url().as_deref(), Some("http://example.com"));
    }
}
