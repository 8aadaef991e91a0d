// src/core/scanner/server_scanner.rs

use super::page::{FetchOptions, Page, select};
use super::{Probe, Tally, Verdicts, sample};
use crate::core::models::ProbeResult;
use reqwest::Version;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING};
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

// --- Directory Listing ---

/// Paths commonly left browsable by mistake.
const COMMON_DIRECTORIES: &[&str] = &[
    "backup", "logs", "admin", "config", "private", "database", "server-status",
];

const BACKUP_EXTENSIONS: &[&str] = &[".bak", ".log"];
const SENSITIVE_EXTENSIONS: &[&str] = &[".sql", ".env", ".xml", ".conf", ".json", ".yml", ".ini"];

const LISTING_VERDICTS: Verdicts = Verdicts {
    clean: "No open directory listings found.",
    moderate: "Open directory listings found; disable autoindex.",
    high: "Open directory listings expose sensitive files.",
};

/// Scores the bodies fetched from the probed directories.
pub fn assess_listings(listings: &[(String, String)]) -> ProbeResult {
    let mut tally = Tally::new();

    for (url, body) in listings {
        if !body.contains("Index of") {
            continue;
        }
        tally.deduct(3, format!("Directory listing enabled at {}", url));

        let doc = Html::parse_document(body);
        let files: Vec<String> = select(&doc, "a[href]")
            .iter()
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_ascii_lowercase)
            .collect();
        let listed_with = |extensions: &[&str]| -> Vec<String> {
            files
                .iter()
                .filter(|file| extensions.iter().any(|ext| file.ends_with(ext)))
                .cloned()
                .collect()
        };

        let backups = listed_with(BACKUP_EXTENSIONS);
        if !backups.is_empty() {
            tally.deduct(5, format!("Backup or log files listed: {}", sample(&backups)));
        }
        let sensitive = listed_with(SENSITIVE_EXTENSIONS);
        if !sensitive.is_empty() {
            tally.deduct(4, format!("Sensitive files listed: {}", sample(&sensitive)));
        }
    }

    if listings.is_empty() {
        tally.note("No common directories were reachable");
    }
    tally.finish(&LISTING_VERDICTS)
}

pub struct DirectoryListingProbe {
    options: FetchOptions,
}

impl DirectoryListingProbe {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }
}

impl Probe for DirectoryListingProbe {
    fn name(&self) -> &'static str {
        "Passive Directory Listing Security Scan"
    }

    fn run(&self, url: &str) -> ProbeResult {
        info!(target = url, "Starting directory listing scan.");
        let base = match Url::parse(url) {
            Ok(base) => base,
            Err(e) => return ProbeResult::failure(format!("Invalid URL: {}", e)),
        };

        let mut listings = Vec::new();
        for dir in COMMON_DIRECTORIES {
            let Ok(target) = base.join(&format!("/{}/", dir)) else {
                continue;
            };
            match Page::fetch(target.as_str(), &self.options) {
                Ok(page) if page.is_success() => listings.push((target.to_string(), page.body)),
                Ok(page) => debug!(path = %target, status = page.status, "Directory not served."),
                Err(diagnostic) => debug!(path = %target, %diagnostic, "Directory request failed."),
            }
        }
        assess_listings(&listings)
    }
}

// --- Performance & Configuration ---

const LARGE_PAGE_BYTES: usize = 500 * 1024;
const MANY_RESOURCES: usize = 50;

const PERFORMANCE_VERDICTS: Verdicts = Verdicts {
    clean: "Server configuration follows performance best practices.",
    moderate: "Some performance settings could be improved.",
    high: "Server configuration has significant performance problems.",
};

/// Whether the connection would be reused after this response.
fn keeps_alive(page: &Page) -> bool {
    let connection = page.header("connection").map(str::to_ascii_lowercase);
    match page.version {
        Version::HTTP_2 | Version::HTTP_3 => true,
        Version::HTTP_10 => connection.is_some_and(|c| c.contains("keep-alive")),
        _ => !connection.is_some_and(|c| c.contains("close")),
    }
}

/// `content_encoding` comes from a separate request that advertised compression support.
pub fn assess_performance(page: &Page, content_encoding: Option<&str>) -> ProbeResult {
    let mut tally = Tally::new();

    if page.redirected {
        tally.deduct(2, format!("Redirected to {}", page.final_url));
    }
    if page.version == Version::HTTP_2 || page.version == Version::HTTP_3 {
        tally.note(format!("Protocol: {:?}", page.version));
    } else {
        tally.deduct(2, format!("HTTP/2 not negotiated ({:?})", page.version));
    }

    match content_encoding.map(str::to_ascii_lowercase) {
        Some(encoding) if encoding.contains("gzip") || encoding.contains("br") => {
            tally.note(format!("Compression: {}", encoding));
        }
        _ => tally.deduct(2, "No gzip or brotli compression"),
    }

    let max_age = page.header("cache-control").and_then(|value| {
        value
            .split(',')
            .filter_map(|directive| directive.trim().strip_prefix("max-age="))
            .find_map(|secs| secs.trim().parse::<u64>().ok())
    });
    match max_age {
        Some(secs) if secs >= 3600 => tally.note(format!("Cache max-age: {}s", secs)),
        Some(secs) => tally.deduct(1, format!("Short cache max-age ({}s)", secs)),
        None => tally.deduct(1, "No cache max-age set"),
    }

    if !keeps_alive(page) {
        tally.deduct(2, "Persistent connections disabled");
    }

    let size = page.body.len();
    if size > LARGE_PAGE_BYTES {
        tally.deduct(3, format!("Large page ({} KB)", size / 1024));
    }
    let resources = select(&page.document(), "script[src], link[href], img[src]").len();
    if resources > MANY_RESOURCES {
        tally.deduct(2, format!("{} external resources referenced", resources));
    }

    tally.finish(&PERFORMANCE_VERDICTS)
}

pub struct PerformanceProbe {
    options: FetchOptions,
}

impl PerformanceProbe {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    /// The `Content-Encoding` a compression-capable client would receive.
    fn negotiated_encoding(&self, url: &str) -> Option<String> {
        let client = self.options.client().ok()?;
        let response = client
            .head(url)
            .header(ACCEPT_ENCODING, "gzip, deflate, br")
            .send()
            .inspect_err(|e| debug!(url, error = %e, "Compression check failed."))
            .ok()?;
        response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

impl Probe for PerformanceProbe {
    fn name(&self) -> &'static str {
        "Passive Performance & Configuration Analysis Scan"
    }

    fn run(&self, url: &str) -> ProbeResult {
        info!(target = url, "Starting performance scan.");
        let page = match Page::fetch(url, &self.options) {
            Ok(page) => page,
            Err(diagnostic) => {
                warn!(target = url, %diagnostic, "Performance scan could not fetch the page.");
                return ProbeResult::failure(diagnostic);
            }
        };
        let encoding = self.negotiated_encoding(url);
        assess_performance(&page, encoding.as_deref())
    }
}
