// src/core/scanner/fingerprint_scanner.rs

use super::page::{Page, inline_scripts, select};
use super::{Tally, Verdicts};
use crate::core::models::{MAX_SCORE, ProbeResult};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::cmp::Ordering;
use tracing::debug;

/// Where in the response a library signature is looked for.
enum Check<'a> {
    /// A pattern in a specific HTTP header.
    Header(&'a str, &'a Lazy<Regex>),
    /// A pattern in the content of a named meta tag.
    MetaTag(&'a str, &'a Lazy<Regex>),
    /// A pattern anywhere in the HTML body.
    Body(&'a Lazy<Regex>),
    /// A pattern in the `src` attribute of `<script>` tags.
    ScriptSrc(&'a Lazy<Regex>),
    /// A pattern in the `href` attribute of `<link>` tags.
    LinkHref(&'a Lazy<Regex>),
}

/// How to spot one library and read its version.
struct LibraryRule<'a> {
    library: &'a str,
    check: Check<'a>,
}

// Every regex captures the version in group 1.
static RE_JQUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)jquery[-.@/]?(\d+\.\d+(?:\.\d+)?)(?:\.slim)?(?:\.min)?\.js").unwrap());
static RE_JQUERY_FN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\.fn\.jquery:\s*"(\d+\.\d+(?:\.\d+)?)""#).unwrap());
static RE_JQUERY_UI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)jquery-?ui[-/@.]?(\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_BOOTSTRAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)bootstrap[-/@.]v?(\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_ANGULARJS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)angular(?:js)?[-/@.](1\.\d+(?:\.\d+)?)").unwrap());
static RE_VUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)vue@(\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_REACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)react(?:-dom)?@(\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_LODASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)lodash(?:\.js)?[-/@](\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_MOMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)moment(?:\.js)?[-/@](\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_HANDLEBARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)handlebars(?:\.js)?[-/@]v?(\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_WORDPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"WordPress (\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_WP_VER: Lazy<Regex> = Lazy::new(|| Regex::new(r"/wp-(?:includes|content)/[^'\x22]*\?ver=(\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_JOOMLA: Lazy<Regex> = Lazy::new(|| Regex::new(r"Joomla! (\d+\.\d+(?:\.\d+)?)").unwrap());
static RE_MOOTOOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"mootools-core\.js\?(\d+\.\d+\.\d+)").unwrap());
static RE_DRUPAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Drupal (\d+(?:\.\d+)*)").unwrap());
static RE_PHP: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHP/(\d+\.\d+(?:\.\d+)?)").unwrap());

/// The master list of library and CMS version signatures.
static RULES: &[LibraryRule] = &[
    LibraryRule { library: "jQuery", check: Check::ScriptSrc(&RE_JQUERY) },
    LibraryRule { library: "jQuery", check: Check::Body(&RE_JQUERY_FN) },
    LibraryRule { library: "jQuery UI", check: Check::ScriptSrc(&RE_JQUERY_UI) },
    LibraryRule { library: "Bootstrap", check: Check::ScriptSrc(&RE_BOOTSTRAP) },
    LibraryRule { library: "Bootstrap", check: Check::LinkHref(&RE_BOOTSTRAP) },
    LibraryRule { library: "AngularJS", check: Check::ScriptSrc(&RE_ANGULARJS) },
    LibraryRule { library: "Vue.js", check: Check::ScriptSrc(&RE_VUE) },
    LibraryRule { library: "React", check: Check::ScriptSrc(&RE_REACT) },
    LibraryRule { library: "Lodash", check: Check::ScriptSrc(&RE_LODASH) },
    LibraryRule { library: "Moment.js", check: Check::ScriptSrc(&RE_MOMENT) },
    LibraryRule { library: "Handlebars", check: Check::ScriptSrc(&RE_HANDLEBARS) },
    LibraryRule { library: "WordPress", check: Check::MetaTag("generator", &RE_WORDPRESS) },
    LibraryRule { library: "WordPress", check: Check::Body(&RE_WP_VER) },
    LibraryRule { library: "Joomla", check: Check::MetaTag("generator", &RE_JOOMLA) },
    LibraryRule { library: "Joomla", check: Check::ScriptSrc(&RE_MOOTOOLS) },
    LibraryRule { library: "Drupal", check: Check::MetaTag("generator", &RE_DRUPAL) },
    LibraryRule { library: "PHP", check: Check::Header("x-powered-by", &RE_PHP) },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedLibrary {
    pub name: String,
    pub version: String,
}

/// Applies every rule to the page; the first version found per library wins.
pub fn detect_libraries(page: &Page) -> Vec<DetectedLibrary> {
    let doc = page.document();
    let mut found: Vec<DetectedLibrary> = Vec::new();

    debug!(total_rules = RULES.len(), "Applying library rules.");
    for rule in RULES {
        if found.iter().any(|lib| lib.name == rule.library) {
            continue;
        }
        let version = match &rule.check {
            Check::Header(name, re) => check_with_regex(page.header(name), re),
            Check::MetaTag(name, re) => check_meta_tag(&doc, name, re),
            Check::Body(re) => check_with_regex(Some(&page.body), re),
            Check::ScriptSrc(re) => check_attribute(&doc, "script[src]", "src", re),
            Check::LinkHref(re) => check_attribute(&doc, "link[href]", "href", re),
        };
        if let Some(version) = version {
            debug!(library = rule.library, %version, "Rule matched.");
            found.push(DetectedLibrary { name: rule.library.to_string(), version });
        }
    }
    found
}

/// The first capture group of `re` in `text`, if it matched.
fn check_with_regex(text: Option<&str>, re: &Regex) -> Option<String> {
    let caps = re.captures(text?)?;
    caps.get(1).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty())
}

fn check_meta_tag(doc: &Html, name: &str, re: &Regex) -> Option<String> {
    select(doc, "meta[name][content]")
        .into_iter()
        .filter(|el| el.value().attr("name").is_some_and(|n| n.eq_ignore_ascii_case(name)))
        .find_map(|el| check_with_regex(el.value().attr("content"), re))
}

fn check_attribute(doc: &Html, css: &str, attribute: &str, re: &Regex) -> Option<String> {
    select(doc, css)
        .into_iter()
        .find_map(|el| check_with_regex(el.value().attr(attribute), re))
}

// --- Outdated Plugins ---

pub fn assess_outdated_plugins(page: &Page) -> ProbeResult {
    let libraries = detect_libraries(page);
    if libraries.is_empty() {
        return ProbeResult::new(MAX_SCORE, vec!["No versioned libraries or CMS detected.".to_string()]);
    }

    let mut tally = Tally::new();
    for lib in &libraries {
        tally.deduct(2, format!("Found {} v{}", lib.name, lib.version));
    }
    tally.note(format!("{} versioned component(s) exposed", libraries.len()));
    tally.finish(&Verdicts {
        clean: "No versioned components exposed.",
        moderate: "Some exposed component versions may be outdated.",
        high: "Many exposed component versions; update and hide them.",
    })
}

// --- Vulnerability Cross-Reference ---

/// A version range with a published advisory: everything below `fixed_in`.
struct Advisory {
    library: &'static str,
    fixed_in: &'static str,
    summary: &'static str,
}

const ADVISORIES: &[Advisory] = &[
    Advisory { library: "jQuery", fixed_in: "3.5.0", summary: "XSS via htmlPrefilter (CVE-2020-11022)" },
    Advisory { library: "jQuery UI", fixed_in: "1.13.0", summary: "XSS in option handling (CVE-2021-41182)" },
    Advisory { library: "Bootstrap", fixed_in: "4.3.1", summary: "XSS in tooltip data-template (CVE-2019-8331)" },
    Advisory { library: "AngularJS", fixed_in: "2.0.0", summary: "end-of-life branch with open XSS advisories" },
    Advisory { library: "Lodash", fixed_in: "4.17.21", summary: "command injection in template (CVE-2021-23337)" },
    Advisory { library: "Moment.js", fixed_in: "2.29.4", summary: "ReDoS in RFC 2822 parsing (CVE-2022-31129)" },
    Advisory { library: "Handlebars", fixed_in: "4.7.7", summary: "remote code execution (CVE-2021-23369)" },
    Advisory { library: "WordPress", fixed_in: "5.8.3", summary: "SQL injection in WP_Query (CVE-2022-21661)" },
    Advisory { library: "Drupal", fixed_in: "7.58", summary: "remote code execution (CVE-2018-7600)" },
    Advisory { library: "PHP", fixed_in: "8.1.0", summary: "branch no longer receives security fixes" },
];

/// Compares dotted numeric versions, padding the shorter one with zeros.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.').map(|part| part.parse().unwrap_or(0)).collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| a.get(i).unwrap_or(&0).cmp(b.get(i).unwrap_or(&0)))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

const VULNERABILITY_VERDICTS: Verdicts = Verdicts {
    clean: "No detected component matches a known vulnerable version.",
    moderate: "Known vulnerable component versions detected.",
    high: "Several known vulnerable components detected; patch urgently.",
};

pub fn assess_vulnerabilities(page: &Page) -> ProbeResult {
    let libraries = detect_libraries(page);
    let mut tally = Tally::new();

    for lib in &libraries {
        let advisory = ADVISORIES
            .iter()
            .find(|a| a.library == lib.name && compare_versions(&lib.version, a.fixed_in) == Ordering::Less);
        match advisory {
            Some(advisory) => tally.deduct(
                3,
                format!("{} {} < {}: {}", lib.name, lib.version, advisory.fixed_in, advisory.summary),
            ),
            None => tally.note(format!("{} {}: no known advisory", lib.name, lib.version)),
        }
    }
    if libraries.is_empty() {
        tally.note("No versioned components to cross-reference");
    }
    tally.finish(&VULNERABILITY_VERDICTS)
}

// --- Browser Fingerprinting ---

/// Script APIs and libraries used to fingerprint visitors, with their penalty.
const FINGERPRINT_INDICATORS: &[(&str, i32)] = &[
    ("toDataURL", 2),
    ("getContext('2d')", 1),
    ("getContext(\"2d\")", 1),
    ("getContext('webgl')", 2),
    ("getContext(\"webgl\")", 2),
    ("FingerprintJS", 3),
    ("Fingerprint2", 3),
    ("clientjs", 2),
    ("canvas fingerprint", 2),
    ("audioContext", 2),
    ("navigator.plugins", 1),
    ("devicePixelRatio", 1),
    ("screen.width", 1),
    ("screen.height", 1),
    ("screen.colorDepth", 1),
    ("timezone", 1),
    ("navigator.languages", 1),
    ("hardwareConcurrency", 1),
];

const FINGERPRINT_VERDICTS: Verdicts = Verdicts {
    clean: "No significant fingerprinting methods detected.",
    moderate: "Moderate risk: some fingerprinting techniques detected.",
    high: "High risk: numerous fingerprinting techniques detected.",
};

pub fn assess_fingerprinting(page: &Page) -> ProbeResult {
    let doc = page.document();
    let mut tally = Tally::new();

    for script in inline_scripts(&doc) {
        let lowered = script.to_lowercase();
        for (indicator, penalty) in FINGERPRINT_INDICATORS {
            if lowered.contains(&indicator.to_lowercase()) {
                tally.deduct(*penalty, format!("Inline script uses '{}'", indicator));
            }
        }
    }

    let own_host = page.host();
    for src in select(&doc, "script[src]").iter().filter_map(|s| s.value().attr("src")) {
        let third_party = page
            .resolve(src)
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|host| Some(&host) != own_host.as_ref());
        if !third_party {
            continue;
        }
        let lowered = src.to_lowercase();
        if let Some((indicator, penalty)) = FINGERPRINT_INDICATORS
            .iter()
            .find(|(indicator, _)| lowered.contains(&indicator.to_lowercase()))
        {
            tally.deduct(*penalty, format!("External script '{}' matches '{}'", src, indicator));
        }
    }

    tally.finish(&FINGERPRINT_VERDICTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::page::fixture;

    const URL: &str = "https://example.com/";

    #[test]
    fn detects_versions_from_scripts_meta_and_headers() {
        let body = r#"<html><head>
            <meta name="generator" content="WordPress 5.7.2">
            <script src="https://code.jquery.com/jquery-3.4.1.min.js"></script>
            <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@4.6.2/dist/css/bootstrap.min.css">
            </head></html>"#;
        let page = fixture(URL, &[("x-powered-by", "PHP/7.4.3")], body);
        let names: Vec<(String, String)> =
            detect_libraries(&page).into_iter().map(|l| (l.name, l.version)).collect();
        assert_eq!(
            names,
            vec![
                ("jQuery".to_string(), "3.4.1".to_string()),
                ("Bootstrap".to_string(), "4.6.2".to_string()),
                ("WordPress".to_string(), "5.7.2".to_string()),
                ("PHP".to_string(), "7.4.3".to_string()),
            ]
        );
    }

    #[test]
    fn version_comparison_pads_missing_components() {
        assert_eq!(compare_versions("3.4.1", "3.5.0"), Ordering::Less);
        assert_eq!(compare_versions("3.5", "3.5.0"), Ordering::Equal);
        assert_eq!(compare_versions("4.17.21", "4.17.3"), Ordering::Greater);
    }

    #[test]
    fn vulnerable_versions_cost_three_points_each() {
        let body = r#"
            <script src="https://code.jquery.com/jquery-1.12.4.min.js"></script>
            <script src="https://cdnjs.cloudflare.com/ajax/libs/lodash.js/4.17.21/lodash.min.js"></script>
            <script src="https://cdnjs.cloudflare.com/ajax/libs/moment.js/2.24.0/moment.min.js"></script>"#;
        let result = assess_vulnerabilities(&fixture(URL, &[], body));
        assert_eq!(result.score, 4);
        let joined = result.details.joined();
        assert!(joined.contains("jQuery 1.12.4 < 3.5.0"));
        assert!(joined.contains("Lodash 4.17.21: no known advisory"));
    }

    #[test]
    fn outdated_plugins_penalise_every_exposed_version() {
        let body = r#"<script src="https://unpkg.com/vue@2.6.14/dist/vue.js"></script>
                      <script src="https://unpkg.com/react@17.0.2/umd/react.production.min.js"></script>"#;
        assert_eq!(assess_outdated_plugins(&fixture(URL, &[], body)).score, 6);
        assert_eq!(assess_outdated_plugins(&fixture(URL, &[], "<p>plain</p>")).score, 10);
    }

    #[test]
    fn fingerprinting_checks_inline_and_third_party_scripts() {
        let body = r#"
            <script>var c = document.createElement('canvas'); c.getContext('2d'); c.toDataURL();</script>
            <script src="https://cdn.example.net/fingerprintjs/v3/fp.min.js"></script>
            <script src="/static/fingerprintjs.js"></script>"#;
        // inline: getContext('2d') -1, toDataURL -2; external FingerprintJS -3
        let result = assess_fingerprinting(&fixture(URL, &[], body));
        assert_eq!(result.score, 4);
    }
}
