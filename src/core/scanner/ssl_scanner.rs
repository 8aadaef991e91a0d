// src/core/scanner/ssl_scanner.rs

use super::page::{FetchOptions, Page};
use super::{Probe, Tally, Verdicts, clamp_score};
use crate::core::models::ProbeResult;
use chrono::{DateTime, Utc};
use native_tls::{Protocol, TlsConnector};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

// --- TLS Inspection ---

/// What a handshake with the target revealed about its certificate.
#[derive(Debug, Clone)]
pub struct CertificateFacts {
    pub subject: String,
    pub issuer: String,
    pub not_after: DateTime<Utc>,
    pub days_left: i64,
    pub self_signed: bool,
    pub rsa_bits: Option<usize>,
    /// The chain validated against the system roots for this host name.
    pub trusted: bool,
    /// A handshake limited to TLS 1.2 or newer succeeded.
    pub modern_tls: bool,
}

/// Host and port of an `https://` URL; other schemes are probed on 443.
fn tls_endpoint(url: &str) -> Result<(String, u16), String> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| "URL has no host".to_string())?
        .to_string();
    let port = match parsed.scheme() {
        "https" => parsed.port_or_known_default().unwrap_or(443),
        _ => 443,
    };
    Ok((host, port))
}

fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, String> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("DNS resolution failed: {}", e))?
        .next()
        .ok_or_else(|| format!("No address found for {}", host))?;
    debug!(host, %addr, "Connecting TCP stream.");
    let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
        error!(error = %e, "TCP connection failed");
        format!("TCP Connection Error: {}", e)
    })?;
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|_| stream.set_write_timeout(Some(timeout)))
        .map_err(|e| format!("Socket configuration error: {}", e))?;
    Ok(stream)
}

/// Whether a handshake made with `connector` completes.
fn handshake_succeeds(connector: &TlsConnector, host: &str, port: u16, timeout: Duration) -> bool {
    match connect(host, port, timeout) {
        Ok(stream) => match connector.connect(host, stream) {
            Ok(_) => true,
            Err(e) => {
                debug!(host, error = %e, "Handshake rejected.");
                false
            }
        },
        Err(_) => false,
    }
}

/// Performs the handshakes and parses the peer certificate. Blocking.
pub fn inspect_tls(url: &str, timeout: Duration) -> Result<CertificateFacts, String> {
    let (host, port) = tls_endpoint(url)?;
    debug!(host, port, "Performing TLS inspection.");

    let permissive = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| {
            error!(error = %e, "Failed to create TlsConnector");
            format!("TlsConnector Error: {}", e)
        })?;

    let stream = connect(&host, port, timeout)?;
    let stream = permissive.connect(&host, stream).map_err(|e| {
        error!(error = %e, "TLS handshake failed");
        format!("TLS Handshake Error: {}", e)
    })?;

    let cert = match stream.peer_certificate() {
        Ok(Some(cert)) => cert,
        Ok(None) => return Err("Server presented no certificate".to_string()),
        Err(e) => {
            error!(error = %e, "Failed to retrieve peer certificate from stream");
            return Err(format!("Could not get peer certificate: {}", e));
        }
    };
    let cert_der = cert.to_der().map_err(|e| {
        error!(error = %e, "Failed to convert certificate to DER format");
        format!("Could not convert certificate to DER: {}", e)
    })?;
    let (_, x509) = parse_x509_certificate(&cert_der).map_err(|e| {
        error!(error = %e, "Failed to parse X.509 certificate");
        format!("X.509 Parse Error: {}", e)
    })?;
    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Successfully parsed certificate.");

    let not_after = asn1_time_to_chrono_utc(&x509.validity().not_after);
    let rsa_bits = match x509.public_key().parsed() {
        Ok(PublicKey::RSA(rsa)) => Some(rsa.key_size()),
        _ => None,
    };

    let trusted = TlsConnector::new()
        .map(|verified| handshake_succeeds(&verified, &host, port, timeout))
        .unwrap_or(false);
    let modern_tls = TlsConnector::builder()
        .min_protocol_version(Some(Protocol::Tlsv12))
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map(|modern| handshake_succeeds(&modern, &host, port, timeout))
        .unwrap_or(false);

    Ok(CertificateFacts {
        subject: x509.subject().to_string(),
        issuer: x509.issuer().to_string(),
        days_left: not_after.signed_duration_since(Utc::now()).num_days(),
        not_after,
        self_signed: x509.subject().as_raw() == x509.issuer().as_raw(),
        rsa_bits,
        trusted,
        modern_tls,
    })
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

// --- Certificate Validation ---

const CERTIFICATE_VERDICTS: Verdicts = Verdicts {
    clean: "Certificate and TLS configuration look healthy.",
    moderate: "Certificate has issues worth fixing.",
    high: "Certificate is invalid or badly configured.",
};

pub fn assess_certificate(facts: &CertificateFacts) -> ProbeResult {
    let mut tally = Tally::new();
    tally.note(format!("Issuer: {}", facts.issuer));

    if facts.days_left < 0 {
        tally.deduct(5, format!("Certificate expired on {}", facts.not_after.format("%Y-%m-%d")));
    } else if facts.days_left < 30 {
        tally.deduct(3, format!("Certificate expires in {} days", facts.days_left));
    } else {
        tally.note(format!("Certificate valid for {} more days", facts.days_left));
    }
    if facts.self_signed {
        tally.deduct(3, "Certificate is self-signed");
    }
    if !facts.trusted {
        tally.deduct(3, "Certificate chain is not trusted for this host");
    }
    if !facts.modern_tls {
        tally.deduct(5, "TLS 1.2 or newer is not supported");
    }
    if let Some(bits) = facts.rsa_bits.filter(|bits| *bits < 2048) {
        tally.deduct(2, format!("Weak RSA key ({} bits)", bits));
    }
    tally.finish(&CERTIFICATE_VERDICTS)
}

pub struct CertificateProbe {
    timeout: Duration,
}

impl CertificateProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Probe for CertificateProbe {
    fn name(&self) -> &'static str {
        "Passive SSL/TLS Certificate Validation Scan"
    }

    fn run(&self, url: &str) -> ProbeResult {
        info!(target = url, "Starting SSL/TLS scan.");
        match inspect_tls(url, self.timeout) {
            Ok(facts) => assess_certificate(&facts),
            Err(diagnostic) => {
                warn!(target = url, %diagnostic, "TLS inspection failed.");
                ProbeResult::failure(diagnostic)
            }
        }
    }
}

// --- HTTPS Posture ---

/// Builds the score up from zero: each good practice earns points.
pub fn assess_https(facts: Option<&CertificateFacts>, hsts: Option<&str>) -> ProbeResult {
    let mut score = 2;
    let mut notes = vec!["Site is served over HTTPS (+2)".to_string()];

    match facts {
        Some(facts) => {
            if facts.modern_tls {
                score += 3;
                notes.push("TLS 1.2 or newer negotiated (+3)".to_string());
            } else {
                notes.push("Only legacy TLS versions accepted".to_string());
            }
            if facts.days_left < 0 {
                score -= 3;
                notes.push("Certificate has expired (-3)".to_string());
            } else if facts.days_left > 180 {
                score += 3;
                notes.push(format!("Certificate valid for {} days (+3)", facts.days_left));
            } else if facts.days_left >= 30 {
                score += 2;
                notes.push(format!("Certificate valid for {} days (+2)", facts.days_left));
            } else {
                notes.push(format!("Certificate expires in {} days", facts.days_left));
            }
        }
        None => notes.push("TLS details unavailable".to_string()),
    }

    match hsts {
        Some(value) => {
            score += 3;
            notes.push(format!("HSTS enabled: {} (+3)", value));
        }
        None => notes.push("HSTS header missing".to_string()),
    }

    ProbeResult::new(clamp_score(score), notes)
}

pub struct HttpsProbe {
    options: FetchOptions,
}

impl HttpsProbe {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }
}

impl Probe for HttpsProbe {
    fn name(&self) -> &'static str {
        "Passive HTTPS Security Scan"
    }

    fn run(&self, url: &str) -> ProbeResult {
        info!(target = url, "Starting HTTPS posture scan.");
        if !url.to_ascii_lowercase().starts_with("https://") {
            return ProbeResult::new(1, vec!["Site is not served over HTTPS".to_string()]);
        }

        let facts = inspect_tls(url, self.options.timeout)
            .inspect_err(|diagnostic| warn!(target = url, %diagnostic, "TLS inspection failed."))
            .ok();
        let page = match Page::fetch(url, &self.options) {
            Ok(page) => page,
            Err(diagnostic) => return ProbeResult::failure(diagnostic),
        };
        assess_https(facts.as_ref(), page.header("strict-transport-security"))
    }
}
