// src/core/scanner/page.rs

use reqwest::Version;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, SET_COOKIE};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

// --- Fetch Options ---

/// Request settings shared by every page-fetching probe.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("PrismScan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchOptions {
    /// Same options with a different request timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self { timeout, user_agent: self.user_agent.clone() }
    }

    pub fn client(&self) -> Result<Client, String> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to build HTTP client");
                format!("HTTP client error: {}", e)
            })
    }
}

// --- Cookies ---

/// The attributes of one `Set-Cookie` response header that the probes care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
}

impl SetCookie {
    /// Parses a raw `Set-Cookie` value. Returns `None` when there is no cookie name.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let name = parts.next()?.split('=').next()?.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = SetCookie {
            name: name.to_string(),
            secure: false,
            http_only: false,
            same_site: None,
        };
        for attribute in parts {
            let (key, value) = match attribute.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (attribute.trim(), None),
            };
            match key.to_ascii_lowercase().as_str() {
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "samesite" => cookie.same_site = value.map(str::to_ascii_lowercase),
                _ => {}
            }
        }
        Some(cookie)
    }
}

// --- Page ---

/// One fetched HTML page with everything the heuristics inspect.
#[derive(Debug, Clone)]
pub struct Page {
    /// The URL as submitted, query string included.
    pub requested_url: String,
    /// Where the client ended up after following redirects.
    pub final_url: String,
    pub status: u16,
    pub version: Version,
    pub redirected: bool,
    pub headers: HeaderMap,
    pub body: String,
    pub cookies: Vec<SetCookie>,
}

impl Page {
    pub fn new(url: &str, status: u16, headers: HeaderMap, body: String) -> Self {
        let cookies = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(SetCookie::parse)
            .collect();
        Self {
            requested_url: url.to_string(),
            final_url: url.to_string(),
            status,
            version: Version::HTTP_11,
            redirected: false,
            headers,
            body,
            cookies,
        }
    }

    pub fn fetch(url: &str, options: &FetchOptions) -> Result<Self, String> {
        Self::fetch_with(url, options, &[])
    }

    /// GETs `url`, adding `extra_headers` to the request.
    pub fn fetch_with(
        url: &str,
        options: &FetchOptions,
        extra_headers: &[(&'static str, &'static str)],
    ) -> Result<Self, String> {
        let client = options.client()?;
        let mut request = client.get(url);
        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }

        let response = request.send().map_err(|e| {
            error!(url, error = %e, "HTTP request failed");
            format!("Could not fetch page: {}", e)
        })?;

        let status = response.status().as_u16();
        let version = response.version();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.text().map_err(|e| {
            error!(url, error = %e, "Failed to read response body");
            format!("Failed to read response body: {}", e)
        })?;
        debug!(url, status, bytes = body.len(), "Page fetched.");

        let mut page = Page::new(url, status, headers, body);
        page.redirected = !same_location(url, &final_url);
        page.final_url = final_url;
        page.version = version;
        Ok(page)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Decoded query parameters of the submitted URL.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        Url::parse(&self.requested_url)
            .map(|url| url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect())
            .unwrap_or_default()
    }

    /// `scheme://host[:port]` of the submitted URL.
    pub fn origin(&self) -> Option<String> {
        Url::parse(&self.requested_url)
            .ok()
            .map(|url| url.origin().ascii_serialization())
    }

    pub fn host(&self) -> Option<String> {
        Url::parse(&self.requested_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
    }

    /// Resolves a possibly relative link against the submitted URL.
    pub fn resolve(&self, link: &str) -> Option<Url> {
        Url::parse(&self.requested_url).ok()?.join(link).ok()
    }
}

/// Elements of `doc` matching a CSS selector. An invalid selector matches nothing.
pub fn select<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|selector| doc.select(&selector).collect())
        .unwrap_or_default()
}

/// The text of every `<script>` element without a `src` attribute.
pub fn inline_scripts(doc: &Html) -> Vec<String> {
    select(doc, "script")
        .into_iter()
        .filter(|script| script.value().attr("src").is_none())
        .map(|script| script.text().collect())
        .collect()
}

// Redirect detection ignores the trailing slash a client may add to a bare host.
fn same_location(requested: &str, final_url: &str) -> bool {
    match Url::parse(requested) {
        Ok(requested) => requested.as_str() == final_url,
        Err(_) => requested == final_url,
    }
}

#[cfg(test)]
pub(crate) fn header_map(pairs: &[(&'static str, &str)]) -> HeaderMap {
    use reqwest::header::{HeaderName, HeaderValue};

    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(value) {
            map.append(HeaderName::from_static(*name), value);
        }
    }
    map
}

#[cfg(test)]
pub(crate) fn fixture(url: &str, headers: &[(&'static str, &str)], body: &str) -> Page {
    Page::new(url, 200, header_map(headers), body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cookie_flags_case_insensitively() {
        let cookie = SetCookie::parse("sid=abc; Path=/; secure; HTTPONLY; SameSite=Strict").unwrap();
        assert_eq!(cookie.name, "sid");
        assert!(cookie.secure && cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("strict"));

        let bare = SetCookie::parse("theme=dark").unwrap();
        assert!(!bare.secure && !bare.http_only && bare.same_site.is_none());
        assert!(SetCookie::parse("=orphan").is_none());
    }

    #[test]
    fn page_collects_every_set_cookie_header() {
        let page = fixture(
            "https://example.com/",
            &[("set-cookie", "a=1; Secure"), ("set-cookie", "b=2; HttpOnly")],
            "",
        );
        let names: Vec<_> = page.cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn query_pairs_and_origin_come_from_the_submitted_url() {
        let page = fixture("https://shop.example:8443/item?id=4&q=boots#top", &[], "");
        assert_eq!(
            page.query_pairs(),
            vec![("id".to_string(), "4".to_string()), ("q".to_string(), "boots".to_string())]
        );
        assert_eq!(page.origin().as_deref(), Some("https://shop.example:8443"));
        assert_eq!(page.host().as_deref(), Some("shop.example"));
    }

    #[test]
    fn resolve_handles_relative_and_absolute_links() {
        let page = fixture("https://example.com/blog/post", &[], "");
        assert_eq!(page.resolve("/img/a.png").unwrap().as_str(), "https://example.com/img/a.png");
        assert_eq!(page.resolve("http://cdn.example/x.js").unwrap().scheme(), "http");
    }

    #[test]
    fn bare_host_is_not_a_redirect() {
        assert!(same_location("https://example.com", "https://example.com/"));
        assert!(!same_location("http://example.com/", "https://example.com/"));
    }
}
