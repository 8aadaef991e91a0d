// src/core/scoring.rs

//! The textual contract between probes and the aggregator.
//!
//! A probe's typed `(score, details)` pair is rendered into a display line,
//! and the aggregator later re-derives the score from that line alone. The
//! aggregator never sees the integer the probe returned.

use crate::core::models::{Details, MAX_SCORE, MIN_SCORE, ProbeResult};
use once_cell::sync::Lazy;
use regex::Regex;

static SCORE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Score:\s*(\d+(?:\.\d+)?)(?:/10)?").unwrap());

/// Renders `"Score: {score}/10 - {joined details}"`.
pub fn format_line(score: u8, details: &Details) -> String {
    format!("Score: {}/10 - {}", score, details.joined())
}

pub fn format_result(result: &ProbeResult) -> String {
    format_line(result.score, &result.details)
}

/// Extracts the first `Score: <n>[/10]` token from a display line.
///
/// The number is rounded half-to-even and clamped to [1,10]. Returns `None`
/// when the line carries no score token; such lines are left out of every
/// aggregate.
pub fn parse_line(line: &str) -> Option<u8> {
    let captures = SCORE_TOKEN.captures(line)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    let rounded = value.round_ties_even();
    Some(rounded.clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_single_and_list_details() {
        assert_eq!(format_line(7, &Details::from("ok")), "Score: 7/10 - ok");
        let lines = Details::Lines(vec!["HSTS missing".into(), "CSP missing".into()]);
        assert_eq!(format_line(4, &lines), "Score: 4/10 - HSTS missing; CSP missing");
    }

    #[test]
    fn every_valid_score_survives_the_round_trip() {
        for score in MIN_SCORE..=MAX_SCORE {
            let line = format_result(&ProbeResult::new(score, "Score: 3/10 appears in details too"));
            assert_eq!(parse_line(&line), Some(score));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_takes_first_match() {
        assert_eq!(parse_line("score: 8 - fine"), Some(8));
        assert_eq!(parse_line("SCORE:3/10 then Score: 9/10"), Some(3));
    }

    #[test]
    fn parse_rounds_half_to_even_and_clamps() {
        assert_eq!(parse_line("Score: 6.5/10"), Some(6));
        assert_eq!(parse_line("Score: 7.5/10"), Some(8));
        assert_eq!(parse_line("Score: 6.51"), Some(7));
        assert_eq!(parse_line("Score: 0/10"), Some(1));
        assert_eq!(parse_line("Score: 0.4"), Some(1));
        assert_eq!(parse_line("Score: 42/10"), Some(10));
    }

    #[test]
    fn parse_miss_returns_none() {
        assert_eq!(parse_line("Could not fetch page"), None);
        assert_eq!(parse_line("Score - pending"), None);
        assert_eq!(parse_line(""), None);
    }
}
