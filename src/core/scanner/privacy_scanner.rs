// src/core/scanner/privacy_scanner.rs

//! Privacy heuristics: third-party scripts and collectors, tracker markers,
//! referrer and Do-Not-Track signals, cookie flags.

use super::page::{Page, inline_scripts, select};
use super::{Tally, Verdicts};
use crate::core::models::{MAX_SCORE, ProbeResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Request header sent by the probes that check Do-Not-Track handling.
pub const DNT_REQUEST: &[(&str, &str)] = &[("dnt", "1")];

// --- Host Tables ---

/// Notes and deducts for every host from `heavy` (-2) and `light` (-1) found in `text`.
fn tally_hosts(tally: &mut Tally, text: &str, heavy: &[&str], light: &[&str], kind: &str) {
    let text = text.to_ascii_lowercase();
    for host in heavy.iter().filter(|host| text.contains(*host)) {
        tally.deduct(2, format!("Heavy {}: {}", kind, host));
    }
    for host in light.iter().filter(|host| text.contains(*host)) {
        tally.deduct(1, format!("Light {}: {}", kind, host));
    }
}

// --- Script Hygiene ---

const SCRIPT_HYGIENE_VERDICTS: Verdicts = Verdicts {
    clean: "All scripts use HTTPS and have proper SRI/crossorigin.",
    moderate: "Some scripts need SRI/HTTPS adjustments.",
    high: "Major gaps: review script tags for SRI and HTTPS.",
};

pub fn assess_tracker_scripts(page: &Page) -> ProbeResult {
    let doc = page.document();
    let mut tally = Tally::new();

    for (index, script) in select(&doc, "script").into_iter().enumerate() {
        let number = index + 1;
        let element = script.value();
        match element.attr("src") {
            Some(src) => {
                if !src.to_ascii_lowercase().starts_with("https://") {
                    tally.deduct(3, format!("Script #{} ({}): insecure protocol", number, src));
                }
                match element.attr("integrity") {
                    None => tally.deduct(1, format!("Script #{} ({}): missing integrity attribute", number, src)),
                    Some(_) if element.attr("crossorigin").is_none() => {
                        tally.deduct(1, format!("Script #{} ({}): missing crossorigin", number, src))
                    }
                    Some(_) => {}
                }
            }
            None => tally.deduct(2, format!("Inline script #{}", number)),
        }
    }
    tally.finish(&SCRIPT_HYGIENE_VERDICTS)
}

// --- Third-Party Scripts ---

const HEAVY_SCRIPT_HOSTS: &[&str] = &[
    "connect.facebook.net",
    "www.google-analytics.com",
    "www.googletagmanager.com",
    "static.doubleclick.net",
];
const LIGHT_SCRIPT_HOSTS: &[&str] = &["hotjar.com", "platform.twitter.com", "cdn.instagram.com"];

const THIRD_PARTY_SCRIPT_VERDICTS: Verdicts = Verdicts {
    clean: "No known third-party scripts found.",
    moderate: "Some third-party scripts detected; review advised.",
    high: "Many third-party scripts; privacy could be at risk.",
};

pub fn assess_third_party_scripts(page: &Page) -> ProbeResult {
    let doc = page.document();
    let mut tally = Tally::new();
    for src in select(&doc, "script[src]").iter().filter_map(|s| s.value().attr("src")) {
        let lowered = src.to_ascii_lowercase();
        if let Some(host) = HEAVY_SCRIPT_HOSTS.iter().find(|h| lowered.contains(*h)) {
            tally.deduct(2, format!("Heavy script from {}: {}", host, src));
        }
        if let Some(host) = LIGHT_SCRIPT_HOSTS.iter().find(|h| lowered.contains(*h)) {
            tally.deduct(1, format!("Light embed from {}: {}", host, src));
        }
    }
    tally.finish(&THIRD_PARTY_SCRIPT_VERDICTS)
}

// --- Tracker Audit ---

const HEAVY_TRACKERS: &[&str] = &[
    "connect.facebook.net",
    "www.google-analytics.com",
    "www.googletagmanager.com",
    "static.doubleclick.net",
    "bat.bing.com",
];
const LIGHT_TRACKERS: &[&str] = &[
    "stats.wp.com",
    "pixel.quantserve.com",
    "cdn.taboola.com",
    "cdn.segment.com",
    "hotjar.com",
];

const TRACKER_AUDIT_VERDICTS: Verdicts = Verdicts {
    clean: "No recognised third-party trackers.",
    moderate: "Some tracking present; worth reviewing.",
    high: "High tracker load detected; privacy looks weak.",
};

pub fn assess_tracker_audit(page: &Page) -> ProbeResult {
    let mut tally = Tally::new();
    tally_hosts(&mut tally, &page.body, HEAVY_TRACKERS, LIGHT_TRACKERS, "tracker");
    tally.finish(&TRACKER_AUDIT_VERDICTS)
}

// --- Data Collection ---

const HEAVY_COLLECTORS: &[&str] = &[
    "www.google-analytics.com",
    "cdn.segment.com",
    "api.mixpanel.com",
    "analytics.hubspot.com",
];
const LIGHT_COLLECTORS: &[&str] = &["cdn.taboola.com", "widgets.outbrain.com", "pixel.quantserve.com"];

const COLLECTION_VERDICTS: Verdicts = Verdicts {
    clean: "No obvious third-party data collectors found.",
    moderate: "Some data-collection references spotted; review advised.",
    high: "High volume of data collection endpoints detected.",
};

pub fn assess_data_collection(page: &Page) -> ProbeResult {
    let mut tally = Tally::new();
    tally_hosts(&mut tally, &page.body, HEAVY_COLLECTORS, LIGHT_COLLECTORS, "collector");
    tally.finish(&COLLECTION_VERDICTS)
}

// --- Tracker Detection ---

/// Substrings that betray a tracker, with their penalty. The first match wins.
const TRACKER_MARKERS: &[(&str, i32)] = &[
    ("ga(", 1),
    ("gtag(", 1),
    ("fbq(", 2),
    ("mixpanel", 2),
    ("segment", 2),
    ("hotjar", 2),
    ("clicky", 1),
    ("chartbeat", 1),
    ("scorecardresearch", 2),
    ("quantserve", 2),
    ("criteo", 1),
    ("doubleclick", 2),
    ("twitter", 1),
    ("piwik", 1),
    ("matomo", 1),
    ("cookiebot", 1),
    ("pixel", 1),
    ("tracking", 1),
];

fn first_marker(text: &str) -> Option<(&'static str, i32)> {
    let lowered = text.to_ascii_lowercase();
    TRACKER_MARKERS.iter().copied().find(|(marker, _)| lowered.contains(marker))
}

const TRACKER_DETECTION_VERDICTS: Verdicts = Verdicts {
    clean: "No obvious tracker indicators found.",
    moderate: "Some tracker indicators present.",
    high: "Heavy tracking detected.",
};

pub fn assess_tracker_detection(page: &Page) -> ProbeResult {
    let doc = page.document();
    let mut tally = Tally::new();

    for element in select(&doc, "script, img, iframe, link") {
        let attr = if element.value().name() == "link" { "href" } else { "src" };
        let Some(link) = element.value().attr(attr) else {
            continue;
        };
        if let Some((marker, cost)) = first_marker(link) {
            tally.deduct(cost, format!("Resource '{}' matched '{}'", link, marker));
        }
    }

    for script in inline_scripts(&doc) {
        if let Some((marker, cost)) = first_marker(&script) {
            tally.deduct(cost, format!("Inline script contains '{}'", marker));
        }
    }

    for cookie in &page.cookies {
        if let Some((_, cost)) = first_marker(&cookie.name) {
            tally.deduct(cost, format!("Cookie '{}' suggests tracking", cookie.name));
        }
    }

    tally.finish(&TRACKER_DETECTION_VERDICTS)
}

// --- Referrer & DNT ---

const GOOD_REFERRER_POLICIES: &[&str] =
    &["no-referrer", "strict-origin", "same-origin", "strict-origin-when-cross-origin"];
const ACCEPTABLE_REFERRER_POLICIES: &[&str] = &["origin", "origin-when-cross-origin"];
const POOR_REFERRER_POLICIES: &[&str] = &["no-referrer-when-downgrade", "unsafe-url"];

const REFERRER_VERDICTS: Verdicts = Verdicts {
    clean: "Referrer and DNT look configured for privacy.",
    moderate: "Some settings OK, but a few tweaks recommended.",
    high: "Privacy is weak here: defaults or missing headers.",
};

/// The `content` of `<meta name="dnt">`, lowercased. Outer `None` when absent.
fn dnt_meta(page: &Page) -> Option<String> {
    let doc = page.document();
    select(&doc, "meta[name]")
        .into_iter()
        .find(|meta| meta.value().attr("name").is_some_and(|n| n.eq_ignore_ascii_case("dnt")))
        .map(|meta| meta.value().attr("content").unwrap_or_default().trim().to_ascii_lowercase())
}

fn is_opt_out(value: &str) -> bool {
    matches!(value, "1" | "true")
}

pub fn assess_referrer_dnt(page: &Page) -> ProbeResult {
    let mut tally = Tally::new();

    match page.header("referrer-policy").map(|v| v.trim().to_ascii_lowercase()) {
        Some(policy) if GOOD_REFERRER_POLICIES.contains(&policy.as_str()) => {
            tally.note(format!("Referrer-Policy: {} looks solid for privacy", policy));
        }
        Some(policy) if ACCEPTABLE_REFERRER_POLICIES.contains(&policy.as_str()) => {
            tally.deduct(1, format!("Referrer-Policy: {} is acceptable but could be stricter", policy));
        }
        Some(policy) if POOR_REFERRER_POLICIES.contains(&policy.as_str()) => {
            tally.deduct(3, format!("Referrer-Policy: {} may leak URLs", policy));
        }
        Some(policy) => tally.deduct(2, format!("Referrer-Policy: unrecognised value '{}'", policy)),
        None => tally.deduct(4, "No Referrer-Policy header found"),
    }

    match dnt_meta(page) {
        Some(content) if is_opt_out(&content) => tally.note(format!("DNT meta tag content: '{}'", content)),
        Some(content) => tally.deduct(1, format!("DNT meta tag is ambiguous: '{}'", content)),
        None => tally.deduct(2, "No <meta name=\"dnt\"> tag detected"),
    }

    tally.finish(&REFERRER_VERDICTS)
}

// --- Do Not Track Support ---

static DNT_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)honou?r do not track|respects? do not track|supports? do not track|do not track policy|dnt is honou?red",
    )
    .unwrap()
});

const DNT_VERDICTS: Verdicts = Verdicts {
    clean: "The site appears to honour Do-Not-Track.",
    moderate: "Some hints of DNT support, but not definitive.",
    high: "DNT support is unclear.",
};

pub fn assess_dnt_support(page: &Page) -> ProbeResult {
    let mut tally = Tally::new();

    if page.has_header("dnt") {
        tally.note("Server replies with a DNT header");
    } else {
        tally.deduct(1, "No DNT header echoed in the response");
    }

    match dnt_meta(page) {
        Some(content) if is_opt_out(&content) => tally.note(format!("Found <meta name='dnt' content='{}'>", content)),
        Some(content) => tally.deduct(1, format!("DNT meta tag present but ambiguous: '{}'", content)),
        None => tally.deduct(2, "No <meta name='dnt'> tag spotted"),
    }

    if DNT_PHRASES.is_match(&page.body) {
        tally.note("Page text promises DNT support");
    } else {
        tally.deduct(3, "No phrase explicitly mentioning Do Not Track");
    }

    tally.finish(&DNT_VERDICTS)
}

// --- Cookie Flags ---

const COOKIE_VERDICTS: Verdicts = Verdicts {
    clean: "Every cookie carries Secure and HttpOnly.",
    moderate: "Some cookies need attention.",
    high: "Many cookies are missing basic protections.",
};

pub fn assess_cookie_privacy(page: &Page) -> ProbeResult {
    if page.cookies.is_empty() {
        return ProbeResult::new(MAX_SCORE, vec!["No cookies set; nothing to check.".to_string()]);
    }

    let mut tally = Tally::new();
    for cookie in &page.cookies {
        debug!(cookie = %cookie.name, secure = cookie.secure, http_only = cookie.http_only, "Inspecting cookie.");
        tally.note(format!("{}: Secure={}, HttpOnly={}", cookie.name, cookie.secure, cookie.http_only));
        if !cookie.secure {
            tally.deduct(2, format!("{} is missing the Secure flag", cookie.name));
        }
        if !cookie.http_only {
            tally.deduct(2, format!("{} is missing the HttpOnly flag", cookie.name));
        }
    }
    tally.finish(&COOKIE_VERDICTS)
}
