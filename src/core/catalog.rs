// src/core/catalog.rs

//! A static, read-only description of every built-in probe: what it looks at
//! and how a site owner can improve the score. The TUI shows these next to
//! the stored result line.

use std::fmt;

/// Which summary lens a probe mostly contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProbeCategory {
    Security,
    Privacy,
}

impl fmt::Display for ProbeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeCategory::Security => write!(f, "Security"),
            ProbeCategory::Privacy => write!(f, "Privacy"),
        }
    }
}

pub struct ProbeDetail {
    /// Must match `Probe::name` of the probe it describes.
    pub name: &'static str,
    pub category: ProbeCategory,
    pub description: &'static str,
    pub remediation: &'static str,
}

static CATALOG: &[ProbeDetail] = &[
    // --- Application Security ---
    ProbeDetail {
        name: "Passive XSS Security Scan",
        category: ProbeCategory::Security,
        description: "Looks for risky JavaScript sinks such as innerHTML, document.write and eval, query parameters reflected into the page, inline scripts, and missing CSP or X-XSS-Protection headers.",
        remediation: "Encode untrusted data before inserting it into the DOM, avoid eval-style sinks, move inline scripts into files and deploy a strict Content-Security-Policy.",
    },
    ProbeDetail {
        name: "Passive Vulnerability Cross-Reference Scan",
        category: ProbeCategory::Security,
        description: "Detects JavaScript library and CMS versions exposed by the page and cross-references them with versions that have published security advisories.",
        remediation: "Upgrade each flagged component to at least the fixed version shown and keep a dependency update routine.",
    },
    ProbeDetail {
        name: "Passive SSL/TLS Certificate Validation Scan",
        category: ProbeCategory::Security,
        description: "Connects to the HTTPS port and inspects the certificate: expiry, trust chain for the host name, self-signing, RSA key size and support for TLS 1.2 or newer.",
        remediation: "Use a certificate from a trusted CA with a key of at least 2048 bits, automate renewal well before expiry and disable protocols older than TLS 1.2.",
    },
    ProbeDetail {
        name: "Passive SQL Injection Security Scan",
        category: ProbeCategory::Security,
        description: "Searches the response for database error messages and flags query parameters whose values contain SQL metacharacters or keywords.",
        remediation: "Use parameterized queries everywhere, never echo database errors to visitors and validate input on the server.",
    },
    ProbeDetail {
        name: "Passive Security Headers Scan",
        category: ProbeCategory::Security,
        description: "Checks for the standard hardening headers: Strict-Transport-Security, X-Frame-Options, X-Content-Type-Options, Referrer-Policy, X-XSS-Protection and Permissions-Policy.",
        remediation: "Configure the web server or application framework to send every missing header with a restrictive value.",
    },
    ProbeDetail {
        name: "Passive Performance & Configuration Analysis Scan",
        category: ProbeCategory::Security,
        description: "Reviews transport configuration: redirects, HTTP/2, compression, cache lifetime, persistent connections, page weight and the number of referenced resources.",
        remediation: "Serve the final URL directly, enable HTTP/2 and gzip or brotli, set a cache max-age of at least an hour and trim heavy pages.",
    },
    ProbeDetail {
        name: "Passive Outdated Plugin Security Scan",
        category: ProbeCategory::Security,
        description: "Counts the library, framework and CMS versions the page discloses. Every visible version helps an attacker pick a known exploit.",
        remediation: "Keep components current and strip version numbers from file names, generator tags and response headers.",
    },
    ProbeDetail {
        name: "Passive Mixed Content Detection Scan",
        category: ProbeCategory::Security,
        description: "Finds resources loaded over plain HTTP from an HTTPS page. Scripts and frames are the most dangerous, then stylesheets, then images.",
        remediation: "Load every resource over HTTPS, or add 'upgrade-insecure-requests' to the Content-Security-Policy.",
    },
    ProbeDetail {
        name: "Passive Directory Listing Security Scan",
        category: ProbeCategory::Security,
        description: "Requests common directories such as /backup/ and /logs/ and reports auto-generated index pages, especially ones listing backups, logs or configuration files.",
        remediation: "Disable directory indexes on the web server and move backups and configuration files out of the document root.",
    },
    ProbeDetail {
        name: "Passive CSRF Security Scan",
        category: ProbeCategory::Security,
        description: "Looks for forms without an anti-CSRF token, cookies without SameSite, a missing X-Frame-Options header and a wildcard CORS policy.",
        remediation: "Add a per-session token to every state-changing form, set SameSite on session cookies and restrict Access-Control-Allow-Origin.",
    },
    ProbeDetail {
        name: "Passive CSP Security Scan",
        category: ProbeCategory::Security,
        description: "Evaluates the Content-Security-Policy header: required directives, wildcards, 'unsafe-inline', 'unsafe-eval' and external script hosts.",
        remediation: "Define default-src, script-src, object-src and frame-ancestors, drop the unsafe keywords and prefer nonces or hashes over host allow-lists.",
    },
    ProbeDetail {
        name: "Passive HTTPS Security Scan",
        category: ProbeCategory::Security,
        description: "Builds a score from HTTPS best practices: serving over HTTPS, a modern TLS handshake, a comfortably valid certificate and HSTS.",
        remediation: "Redirect all traffic to HTTPS, support TLS 1.2 or newer, renew certificates early and send Strict-Transport-Security.",
    },
    ProbeDetail {
        name: "Passive Data Leakage HTTP Headers Scan",
        category: ProbeCategory::Security,
        description: "Reports headers that disclose server software, framework versions, backend hosts or private IP addresses.",
        remediation: "Remove or genericize Server, X-Powered-By and proxy headers at the edge.",
    },
    // --- Privacy ---
    ProbeDetail {
        name: "Passive Privacy Tracker Script Scan",
        category: ProbeCategory::Privacy,
        description: "Inspects every script tag for plain-HTTP sources, missing Subresource Integrity, integrity without crossorigin, and inline code.",
        remediation: "Serve scripts over HTTPS with integrity and crossorigin attributes and keep inline code to a minimum.",
    },
    ProbeDetail {
        name: "Passive Privacy Third-Party Script Evaluation Scan",
        category: ProbeCategory::Privacy,
        description: "Identifies scripts loaded from known analytics, advertising and session-recording hosts.",
        remediation: "Remove third-party scripts you do not need and self-host or consent-gate the rest.",
    },
    ProbeDetail {
        name: "Passive Privacy & Tracker Audit Scan",
        category: ProbeCategory::Privacy,
        description: "Searches the whole page for references to tracker domains, including pixels and iframes that are not scripts.",
        remediation: "Audit embedded widgets and pixels and load trackers only after the visitor consents.",
    },
    ProbeDetail {
        name: "Passive Third-Party Data Collection Scan",
        category: ProbeCategory::Privacy,
        description: "Finds data collection endpoints from analytics and advertising providers referenced by the page.",
        remediation: "Limit data sent to third parties, prefer privacy-friendly analytics and document every collector in the privacy policy.",
    },
    ProbeDetail {
        name: "Passive Tracker Detection Scan",
        category: ProbeCategory::Privacy,
        description: "Looks for tracker markers in resource URLs, inline script calls such as gtag( or fbq(, and tracking cookie names.",
        remediation: "Remove tracking calls that are not essential and gate the rest behind consent.",
    },
    ProbeDetail {
        name: "Passive Fingerprinting Detection Scan",
        category: ProbeCategory::Privacy,
        description: "Detects browser fingerprinting techniques such as canvas and WebGL reads, audio context probing, plugin and screen enumeration, and fingerprinting libraries.",
        remediation: "Drop fingerprinting libraries and avoid collecting device characteristics that are not needed to serve the page.",
    },
    ProbeDetail {
        name: "Passive Referrer & DNT Analysis Scan",
        category: ProbeCategory::Privacy,
        description: "Rates the Referrer-Policy header and checks whether the page declares its Do Not Track stance.",
        remediation: "Send 'Referrer-Policy: strict-origin-when-cross-origin' or stricter and state how Do Not Track is handled.",
    },
    ProbeDetail {
        name: "Passive Do Not Track Support Scan",
        category: ProbeCategory::Privacy,
        description: "Sends a DNT request and looks for an acknowledging response header, a DNT meta tag and a published Do Not Track policy.",
        remediation: "Honour DNT requests, acknowledge them in a response header and describe the behaviour in the privacy policy.",
    },
    ProbeDetail {
        name: "Passive Cookie Privacy Scan",
        category: ProbeCategory::Privacy,
        description: "Checks every cookie set by the response for the Secure and HttpOnly flags.",
        remediation: "Set Secure and HttpOnly on every cookie that does not have to be read by scripts.",
    },
];

/// Looks up the catalogue entry for a probe by its display name.
pub fn get_probe_detail(name: &str) -> Option<&'static ProbeDetail> {
    CATALOG.iter().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::core::scanner::default_registry;

    #[test]
    fn every_builtin_probe_is_described() {
        let registry = default_registry(&Settings::default());
        for name in registry.names() {
            assert!(get_probe_detail(name).is_some(), "no catalogue entry for {name}");
        }
        assert_eq!(CATALOG.len(), registry.len());
    }

    #[test]
    fn unknown_names_have_no_entry() {
        assert!(get_probe_detail("Active Port Scan").is_none());
        assert_eq!(
            get_probe_detail("Passive Cookie Privacy Scan").map(|d| d.category),
            Some(ProbeCategory::Privacy)
        );
    }
}
