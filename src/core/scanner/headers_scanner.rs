// src/core/scanner/headers_scanner.rs

use super::page::Page;
use super::{Tally, Verdicts};
use crate::core::models::ProbeResult;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// --- Security Headers ---

/// Hardening headers and the penalty for leaving each one out.
const SECURITY_HEADERS: &[(&str, &str, i32)] = &[
    ("strict-transport-security", "Strict-Transport-Security", 3),
    ("x-frame-options", "X-Frame-Options", 2),
    ("x-content-type-options", "X-Content-Type-Options", 2),
    ("referrer-policy", "Referrer-Policy", 1),
    ("x-xss-protection", "X-XSS-Protection", 1),
    ("permissions-policy", "Permissions-Policy", 1),
];

const SECURITY_HEADER_VERDICTS: Verdicts = Verdicts {
    clean: "All essential security headers are in place.",
    moderate: "Some security headers are missing; review recommended.",
    high: "Few to no security headers detected; fix as soon as possible.",
};

/// Looks up a header, logging whether it was found.
///
/// Non-UTF-8 values count as present and are shown as a placeholder.
fn check_header<'a>(page: &'a Page, name: &str) -> Option<&'a str> {
    debug!(header_name = name, "Checking for header.");
    match page.headers.get(name) {
        Some(value) => {
            let shown = value.to_str().unwrap_or("[Invalid UTF-8]");
            debug!(header_name = name, value = shown, "Header found.");
            Some(shown)
        }
        None => {
            debug!(header_name = name, "Header not found.");
            None
        }
    }
}

pub fn assess_security_headers(page: &Page) -> ProbeResult {
    let mut tally = Tally::new();
    for (key, display, penalty) in SECURITY_HEADERS {
        match check_header(page, key) {
            Some(value) => tally.note(format!("{}: {}", display, value)),
            None => tally.deduct(*penalty, format!("Missing {}", display)),
        }
    }
    tally.finish(&SECURITY_HEADER_VERDICTS)
}

// --- Content Security Policy ---

const CSP_REQUIRED_DIRECTIVES: &[&str] = &["default-src", "script-src", "object-src", "frame-ancestors"];

static CSP_SCRIPT_SRC: Lazy<Regex> = Lazy::new(|| Regex::new(r"script-src\s+([^;]+)").unwrap());

const CSP_VERDICTS: Verdicts = Verdicts {
    clean: "Content Security Policy looks strong.",
    moderate: "Content Security Policy has weaknesses worth tightening.",
    high: "Content Security Policy is weak or largely ineffective.",
};

pub fn assess_csp(page: &Page) -> ProbeResult {
    let Some(csp) = check_header(page, "content-security-policy") else {
        return ProbeResult::new(1, vec!["No CSP header found. Major security risk!".to_string()]);
    };

    let mut tally = Tally::new();
    let missing: Vec<&str> = CSP_REQUIRED_DIRECTIVES
        .iter()
        .copied()
        .filter(|directive| !csp.contains(directive))
        .collect();
    if !missing.is_empty() {
        tally.deduct(3, format!("Missing directives: {}", missing.join(", ")));
    }

    if csp.contains('*') {
        tally.deduct(3, "Found wildcard '*' in policy");
    }
    if csp.contains("unsafe-inline") {
        tally.deduct(4, "Found 'unsafe-inline' in policy");
    }
    if csp.contains("unsafe-eval") {
        tally.deduct(4, "Found 'unsafe-eval' in policy");
    }

    let external: Vec<&str> = CSP_SCRIPT_SRC
        .captures(csp)
        .and_then(|caps| caps.get(1))
        .map(|sources| {
            sources
                .as_str()
                .split_whitespace()
                .filter(|source| source.starts_with("http") && !source.contains("self"))
                .collect()
        })
        .unwrap_or_default();
    if !external.is_empty() {
        tally.deduct(2, format!("External script sources: {}", external.join(", ")));
    }

    tally.finish(&CSP_VERDICTS)
}

// --- Data Leakage ---

/// Headers that disclose internal details, with their penalty.
const LEAKY_HEADERS: &[(&str, &str, i32)] = &[
    ("server", "Server", 2),
    ("x-powered-by", "X-Powered-By", 2),
    ("x-aspnet-version", "X-AspNet-Version", 2),
    ("x-aspnetmvc-version", "X-AspNetMvc-Version", 2),
    ("x-backend-server", "X-Backend-Server", 2),
    ("via", "Via", 1),
    ("forwarded", "Forwarded", 2),
    ("x-forwarded-for", "X-Forwarded-For", 2),
    ("x-real-ip", "X-Real-IP", 1),
];

static PRIVATE_IP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:10\.\d{1,3}\.\d{1,3}\.\d{1,3}|192\.168\.\d{1,3}\.\d{1,3}|172\.(?:1[6-9]|2\d|3[0-1])\.\d{1,3}\.\d{1,3})\b",
    )
    .unwrap()
});

const LEAKAGE_VERDICTS: Verdicts = Verdicts {
    clean: "All clear: no obvious data leakage headers present.",
    moderate: "Some headers could leak information; review recommended.",
    high: "High risk: several headers expose internal details.",
};

pub fn assess_data_leakage(page: &Page) -> ProbeResult {
    let mut tally = Tally::new();
    for (key, display, penalty) in LEAKY_HEADERS {
        if let Some(value) = check_header(page, key) {
            tally.deduct(*penalty, format!("{}: {}", display, value));
            if PRIVATE_IP.is_match(value) {
                tally.deduct(2, format!("{} contains a private IP address", display));
            }
        }
    }
    tally.finish(&LEAKAGE_VERDICTS)
}
