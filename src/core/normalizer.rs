// src/core/normalizer.rs

//! Turns a submitted URL into the key used by the result store.

// Schemes whose key always carries a `//` authority part, even when empty.
const NETLOC_SCHEMES: &[&str] = &["http", "https", "ftp", "ws", "wss"];

/// Canonicalizes `raw_url` into a cache key.
///
/// * `file:` URLs reduce to the text after the last `/` of their path, which
///   is empty for a path ending in `/`.
/// * Everything else becomes `scheme://netloc/path` with query and fragment
///   dropped, trailing slashes removed and an empty path turned into `/`.
///   Text without an authority part keeps an empty path empty, so a file
///   key of `""` normalizes to itself.
///
/// The netloc and path are kept as written: no case folding, no default-port
/// removal, no percent-encoding. Only the scheme is lowercased. Surrounding
/// whitespace is ignored.
pub fn normalize(raw_url: &str) -> String {
    let raw_url = raw_url.trim();
    let end = raw_url.find(['?', '#']).unwrap_or(raw_url.len());
    let without_query = &raw_url[..end];

    let (scheme, rest) = split_scheme(without_query);
    let (netloc, path) = match rest.strip_prefix("//") {
        Some(authority) => {
            let split = authority.find('/').unwrap_or(authority.len());
            (Some(&authority[..split]), &authority[split..])
        }
        None => (None, rest),
    };

    if scheme.as_deref() == Some("file") {
        return path.rsplit('/').next().unwrap_or_default().to_string();
    }

    let wants_authority = netloc.is_some_and(|n| !n.is_empty())
        || scheme.as_deref().is_some_and(|s| NETLOC_SCHEMES.contains(&s));
    let path = match path.trim_end_matches('/') {
        "" if wants_authority => "/",
        trimmed => trimmed,
    };

    let mut key = String::new();
    if let Some(scheme) = &scheme {
        key.push_str(scheme);
        key.push(':');
    }
    if wants_authority {
        key.push_str("//");
        key.push_str(netloc.unwrap_or_default());
        if !path.starts_with('/') {
            key.push('/');
        }
    }
    key.push_str(path);
    key
}

/// Splits off a leading `scheme:`, lowercased. Text without a valid scheme
/// is returned whole as the remainder.
fn split_scheme(url: &str) -> (Option<String>, &str) {
    let Some((candidate, rest)) = url.split_once(':') else {
        return (None, url);
    };
    let mut chars = candidate.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if valid {
        (Some(candidate.to_ascii_lowercase()), rest)
    } else {
        (None, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_query_fragment_and_trailing_slash() {
        assert_eq!(normalize("https://example.com/docs/?page=2#top"), "https://example.com/docs");
        assert_eq!(normalize("https://example.com/docs"), "https://example.com/docs");
        assert_eq!(normalize("https://example.com/docs///"), "https://example.com/docs");
    }

    #[test]
    fn empty_path_becomes_root() {
        assert_eq!(normalize("https://example.com"), "https://example.com/");
        assert_eq!(normalize("https://example.com/?q=1"), "https://example.com/");
        assert_eq!(normalize("https://example.com#top"), "https://example.com/");
    }

    #[test]
    fn keeps_scheme_host_and_port() {
        assert_eq!(normalize("http://example.com:8000/login/"), "http://example.com:8000/login");
        assert_ne!(normalize("http://example.com/a"), normalize("https://example.com/a"));
    }

    #[test]
    fn netloc_and_path_are_kept_as_written() {
        assert_eq!(normalize("https://EXAMPLE.com:443/A/"), "https://EXAMPLE.com:443/A");
        assert_eq!(normalize("https://example.com/a b/"), "https://example.com/a b");
        assert_eq!(normalize("https://user@example.com/x"), "https://user@example.com/x");
        assert_eq!(normalize("HTTPS://example.com/"), "https://example.com/");
    }

    #[test]
    fn file_urls_reduce_to_basename() {
        assert_eq!(normalize("file:///home/user/site/index.html"), "index.html");
        assert_eq!(normalize("file:///home/user/site/index.html?x=1"), "index.html");
        assert_eq!(normalize("file:///home/user/site/"), "");
        assert_eq!(normalize("file:///"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "https://example.com/a/b/?x=1",
            "https://example.com",
            "http://EXAMPLE.com:8080/",
            "https://example.com/a b/",
            "file:///tmp/report.html",
            "file:///tmp/",
            "example.com/path/?q",
            "",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input}");
        }
    }

    #[test]
    fn equivalent_urls_share_a_key() {
        let key = normalize("https://example.com/shop");
        assert_eq!(normalize("https://example.com/shop/"), key);
        assert_eq!(normalize("https://example.com/shop?utm_source=mail"), key);
        assert_eq!(normalize("https://example.com/shop/#reviews"), key);
        assert_eq!(normalize("  https://example.com/shop  "), key);
    }
}
