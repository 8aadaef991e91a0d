// src/core/scanner/content_scanner.rs

//! Heuristics that read the page body: XSS and SQL injection hints, mixed
//! content and CSRF protections.

use super::page::{Page, inline_scripts, select};
use super::{Tally, Verdicts, sample};
use crate::core::models::ProbeResult;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use tracing::debug;

// --- XSS ---

/// Calls that commonly turn untrusted input into script execution.
const RISKY_JS: &[&str] = &[
    "eval(",
    "document.write(",
    "innerHTML",
    "setTimeout(",
    "setInterval(",
    "unescape(",
    "location.href",
    "location.assign(",
    "localStorage.setItem(",
    "sessionStorage.setItem(",
    "Function(",
];

const XSS_VERDICTS: Verdicts = Verdicts {
    clean: "No significant XSS risks detected.",
    moderate: "Moderate XSS risk: some improvements needed.",
    high: "High XSS risk: multiple red flags.",
};

pub fn assess_xss(page: &Page) -> ProbeResult {
    if !page.is_success() {
        return ProbeResult::failure(format!("Could not fetch page (HTTP {}).", page.status));
    }
    let mut tally = Tally::new();

    let risky: Vec<&str> = RISKY_JS.iter().copied().filter(|call| page.body.contains(call)).collect();
    if !risky.is_empty() {
        tally.deduct(3, format!("Insecure JS calls: {}", risky.join(", ")));
    }

    if !page.has_header("content-security-policy") {
        tally.deduct(3, "Missing header: Content-Security-Policy");
    }
    if !page.has_header("x-xss-protection") {
        tally.deduct(2, "Missing header: X-XSS-Protection");
    }

    let reflected: Vec<String> = page
        .query_pairs()
        .into_iter()
        .filter(|(_, value)| !value.is_empty() && page.body.contains(value.as_str()))
        .map(|(name, _)| name)
        .collect();
    if !reflected.is_empty() {
        tally.deduct(2, format!("Reflected params: {}", reflected.join(", ")));
    }

    let inline = inline_scripts(&page.document()).len();
    if inline > 0 {
        tally.deduct(2, format!("Inline scripts found: {} block(s)", inline));
    }

    tally.finish(&XSS_VERDICTS)
}

// --- SQL Injection ---

static SQL_ERRORS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        r"You have an error in your SQL syntax",
        r"Warning: mysql_fetch_array\(",
        r"Warning: mysql_fetch_assoc\(",
        r"Unclosed quotation mark",
        r"Microsoft OLE DB Provider for SQL Server",
        r"ORA-01756",
        r"SQLSTATE\[[0-9]{5}\]",
    ]
    .into_iter()
    .map(|pattern| (pattern, Regex::new(&format!("(?i){}", pattern)).unwrap()))
    .collect()
});

static SUSPICIOUS_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:id|user|login|name|page|search|query|q)$").unwrap());

const SQL_VERDICTS: Verdicts = Verdicts {
    clean: "No SQL-injection red flags detected.",
    moderate: "Potential SQL-injection issues found.",
    high: "High risk: SQL injection likely possible.",
};

pub fn assess_sql_injection(page: &Page) -> ProbeResult {
    let mut tally = Tally::new();

    let errors: Vec<String> = SQL_ERRORS
        .iter()
        .filter(|(_, re)| re.is_match(&page.body))
        .map(|(pattern, _)| pattern.to_string())
        .collect();
    if !errors.is_empty() {
        tally.deduct(5, format!("SQL errors exposed: {}", sample(&errors)));
    }

    let suspects: Vec<String> = page
        .query_pairs()
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| SUSPICIOUS_PARAM.is_match(name))
        .collect();
    if !suspects.is_empty() {
        tally.deduct(3, format!("Suspicious params: {}", suspects.join(", ")));
    }

    let missing: Vec<&str> = [("content-security-policy", "Content-Security-Policy"), ("x-frame-options", "X-Frame-Options")]
        .into_iter()
        .filter(|(key, _)| !page.has_header(key))
        .map(|(_, display)| display)
        .collect();
    if !missing.is_empty() {
        tally.deduct(2, format!("Missing headers: {}", missing.join(", ")));
    }

    tally.finish(&SQL_VERDICTS)
}

// --- Mixed Content ---

/// Resource kinds, the tags that load them and the per-resource penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Script,
    Stylesheet,
    Iframe,
    Image,
    Other,
}

impl Resource {
    fn penalty(self) -> i32 {
        match self {
            Resource::Script | Resource::Iframe => 3,
            Resource::Stylesheet => 2,
            Resource::Image | Resource::Other => 1,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Resource::Script => "script",
            Resource::Stylesheet => "stylesheet",
            Resource::Iframe => "iframe",
            Resource::Image => "image",
            Resource::Other => "other resource",
        }
    }

    fn of_tag(tag: &str) -> Self {
        match tag {
            "script" => Resource::Script,
            "link" => Resource::Stylesheet,
            "iframe" => Resource::Iframe,
            "img" => Resource::Image,
            _ => Resource::Other,
        }
    }
}

const MIXED_VERDICTS: Verdicts = Verdicts {
    clean: "No mixed content detected.",
    moderate: "Some resources are loaded over plain HTTP.",
    high: "Significant mixed content: many resources load over plain HTTP.",
};

pub fn assess_mixed_content(page: &Page) -> ProbeResult {
    let doc = page.document();
    let mut found: Vec<(Resource, Vec<String>)> = [
        Resource::Script,
        Resource::Stylesheet,
        Resource::Iframe,
        Resource::Image,
        Resource::Other,
    ]
    .into_iter()
    .map(|kind| (kind, Vec::new()))
    .collect();

    // Navigation links are not subresources.
    for element in select(&doc, "[src], [href]") {
        let tag = element.value().name();
        if tag == "a" {
            continue;
        }
        let link = element.value().attr("src").or_else(|| element.value().attr("href"));
        let Some(resolved) = link.and_then(|link| page.resolve(link)) else {
            continue;
        };
        if resolved.scheme() == "http" {
            let kind = Resource::of_tag(tag);
            if let Some((_, urls)) = found.iter_mut().find(|(k, _)| *k == kind) {
                urls.push(resolved.to_string());
            }
        }
    }

    let mut tally = Tally::new();
    for (kind, urls) in &found {
        if urls.is_empty() {
            continue;
        }
        debug!(kind = kind.label(), count = urls.len(), "Insecure resources found.");
        tally.deduct(
            kind.penalty() * urls.len() as i32,
            format!("{} insecure {}(s): {}", urls.len(), kind.label(), sample(urls)),
        );
    }
    tally.finish(&MIXED_VERDICTS)
}

// --- CSRF ---

const CSRF_VERDICTS: Verdicts = Verdicts {
    clean: "No CSRF weaknesses detected.",
    moderate: "Some CSRF protections are missing.",
    high: "High CSRF risk: key protections are missing.",
};

pub fn assess_csrf(page: &Page) -> ProbeResult {
    let doc = page.document();
    let mut tally = Tally::new();

    let forms = select(&doc, "form");
    let hidden = Selector::parse("input[type=hidden]").ok();
    let unprotected = forms
        .iter()
        .filter(|form| {
            let has_token = hidden.as_ref().is_some_and(|selector| {
                form.select(selector).any(|input| {
                    let name = input.value().attr("name").unwrap_or_default().to_ascii_lowercase();
                    name.contains("csrf") || name.contains("authenticity")
                })
            });
            !has_token
        })
        .count();
    if forms.is_empty() {
        tally.note("No forms found");
    } else if unprotected > 0 {
        tally.deduct(4, format!("{} form(s) missing CSRF token", unprotected));
    } else {
        tally.note("All forms include a hidden CSRF token");
    }

    if page.has_header("x-frame-options") {
        tally.note("Required security headers are present");
    } else {
        tally.deduct(3, "Missing headers: X-Frame-Options");
    }

    let weak_cookies = page
        .cookies
        .iter()
        .filter(|cookie| {
            !cookie.secure || !matches!(cookie.same_site.as_deref(), Some("lax") | Some("strict"))
        })
        .count();
    if weak_cookies > 0 {
        tally.deduct(2, format!("{} cookie(s) lack Secure/SameSite", weak_cookies));
    }

    match page.header("access-control-allow-origin") {
        Some(allowed) if allowed == "*" || Some(allowed.to_string()) != page.origin() => {
            tally.deduct(3, format!("CORS allows {}", allowed));
        }
        Some(_) => tally.note("CORS restricted to same origin"),
        None => tally.note("No CORS header found"),
    }

    tally.finish(&CSRF_VERDICTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::page::fixture;

    const HARDENED: &[(&str, &str)] = &[
        ("content-security-policy", "default-src 'self'"),
        ("x-xss-protection", "1; mode=block"),
        ("x-frame-options", "DENY"),
    ];

    #[test]
    fn clean_page_has_no_xss_findings() {
        let page = fixture("https://example.com/", HARDENED, "<html><body><p>Hello</p></body></html>");
        assert_eq!(assess_xss(&page).score, 10);
    }

    #[test]
    fn xss_heuristics_stack() {
        let body = r#"<html><body><p>You searched for boots</p>
            <script>document.write(location.href)</script></body></html>"#;
        let page = fixture("https://example.com/search?q=boots", &[], body);
        // risky js -3, csp -3, x-xss -2, reflected -2, inline -2
        let result = assess_xss(&page);
        assert_eq!(result.score, 1);
        let joined = result.details.joined();
        assert!(joined.contains("Reflected params: q (-2)"));
        assert!(joined.contains("Inline scripts found: 1 block(s) (-2)"));
        assert!(joined.ends_with("High XSS risk: multiple red flags."));
    }

    #[test]
    fn error_status_is_a_probe_failure() {
        let mut page = fixture("https://example.com/", HARDENED, "");
        page.status = 503;
        assert_eq!(assess_xss(&page).score, 1);
    }

    #[test]
    fn sql_errors_and_params_are_flagged() {
        let body = "<pre>You have an error in your SQL syntax near ''</pre>";
        let page = fixture("https://example.com/item?id=5&ref=mail", HARDENED, body);
        // errors -5, id param -3
        let result = assess_sql_injection(&page);
        assert_eq!(result.score, 2);
        assert!(result.details.joined().contains("Suspicious params: id (-3)"));
    }

    #[test]
    fn quiet_page_has_no_sql_findings() {
        let page = fixture("https://example.com/about", HARDENED, "<p>About us</p>");
        assert_eq!(assess_sql_injection(&page).score, 10);
    }

    #[test]
    fn mixed_content_penalises_each_insecure_resource() {
        let body = r#"<html><head>
            <script src="http://cdn.example.net/app.js"></script>
            <link rel="stylesheet" href="http://cdn.example.net/site.css">
            <script src="/local.js"></script>
            </head><body>
            <img src="http://img.example.net/a.png">
            <a href="http://elsewhere.example/">not a subresource</a>
            </body></html>"#;
        let page = fixture("https://example.com/", &[], body);
        // script -3, stylesheet -2, image -1
        let result = assess_mixed_content(&page);
        assert_eq!(result.score, 4);
        let joined = result.details.joined();
        assert!(joined.contains("1 insecure script(s): http://cdn.example.net/app.js (-3)"));
        assert!(!joined.contains("elsewhere"));
    }

    #[test]
    fn secure_resources_are_not_mixed_content() {
        let body = r#"<script src="https://cdn.example.net/app.js"></script><img src="/a.png">"#;
        assert_eq!(assess_mixed_content(&fixture("https://example.com/", &[], body)).score, 10);
    }

    #[test]
    fn csrf_checks_forms_headers_cookies_and_cors() {
        let body = r#"<form action="/login" method="post">
                <input type="text" name="user">
            </form>
            <form action="/comment" method="post">
                <input type="hidden" name="csrf_token" value="x">
            </form>"#;
        let page = fixture(
            "https://example.com/",
            &[("set-cookie", "sid=1; Secure"), ("access-control-allow-origin", "*")],
            body,
        );
        // token -4, xfo -3, cookie -2, cors -3
        let result = assess_csrf(&page);
        assert_eq!(result.score, 1);
        assert!(result.details.joined().contains("1 form(s) missing CSRF token (-4)"));
    }

    #[test]
    fn same_origin_cors_and_protected_forms_pass() {
        let body = r#"<form><input type="hidden" name="authenticity_token" value="x"></form>"#;
        let page = fixture(
            "https://example.com/",
            &[
                ("x-frame-options", "DENY"),
                ("set-cookie", "sid=1; Secure; SameSite=Lax"),
                ("access-control-allow-origin", "https://example.com"),
            ],
            body,
        );
        assert_eq!(assess_csrf(&page).score, 10);
    }
}
