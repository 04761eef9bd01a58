//! URL canonicalization and link filtering.
//!
//! Everything here is pure: no crawl state is touched, so these helpers can be
//! used from workers and from reporting code alike.

use url::Url;

/// Path suffixes that never lead to crawlable HTML.
pub const NON_CONTENT_SUFFIXES: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".zip", ".rar", ".jpg", ".jpeg", ".png", ".gif",
    ".bmp", ".svg", ".ico", ".css", ".js", ".xml", ".json", ".txt", ".log",
];

/// Schemes that are dropped outright when found in an href.
pub const NON_HTTP_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:", "data:", "file:"];

/// Canonical form of a URL: no `www.` host prefix, no fragment, no trailing slash.
///
/// Idempotent. The `www.` prefix is removed first (repeatedly) because the later
/// steps only ever shorten the tail of the string and so cannot reintroduce it.
pub fn normalize_url(url: &str) -> String {
    let mut url = lowercase_authority(url.trim());
    for scheme in ["https://", "http://"] {
        if url.starts_with(scheme) {
            let www = format!("{}www.", scheme);
            while url.starts_with(&www) {
                url.replace_range(scheme.len()..www.len(), "");
            }
        }
    }

    if let Some(idx) = url.find('#') {
        url.truncate(idx);
    }

    let trimmed = url
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace())
        .len();
    url.truncate(trimmed);
    url
}

/// `true` for URLs with an `http://` or `https://` scheme, in any letter case.
pub fn has_http_scheme(url: &str) -> bool {
    let starts_with = |prefix: &str| {
        url.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    starts_with("http://") || starts_with("https://")
}

/// Prepends `https://` when the URL has no http(s) scheme. Scheme and host
/// come back lowercased.
pub fn ensure_scheme(url: &str) -> String {
    let url = url.trim();
    if has_http_scheme(url) {
        lowercase_authority(url)
    } else {
        lowercase_authority(&format!("https://{}", url))
    }
}

/// Lowercases the scheme and host of an http(s) URL, matching what
/// `Url::join` produces for discovered links. Path, query and fragment keep
/// their case. Anything else is returned unchanged.
fn lowercase_authority(url: &str) -> String {
    if !has_http_scheme(url) {
        return url.to_string();
    }
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    format!(
        "{}://{}{}",
        url[..scheme_end].to_ascii_lowercase(),
        rest[..host_end].to_ascii_lowercase(),
        &rest[host_end..]
    )
}

/// Host (plus explicit port) of the URL without a leading `www.`, or an empty
/// string when the URL cannot be parsed or has no host.
pub fn domain_of(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let Some(host) = parsed.host_str() else {
        return String::new();
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Normalizes a user-supplied domain filter (`www.Example.com/`, `https://example.com`)
/// to the form produced by [`domain_of`].
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim();
    if domain.contains("://") {
        return domain_of(domain);
    }
    let lowered = domain.trim_end_matches('/').to_lowercase();
    lowered.strip_prefix("www.").unwrap_or(&lowered).to_string()
}

/// `true` when the link uses a non-http scheme or its path ends in a known
/// binary/asset extension. Matching is case-insensitive and ignores the query.
pub fn is_non_content_link(url: &str) -> bool {
    let lowered = url.to_lowercase();
    if NON_HTTP_SCHEMES.iter().any(|s| lowered.starts_with(s)) {
        return true;
    }
    let path = match Url::parse(&lowered) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => lowered,
    };
    NON_CONTENT_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Resolves an href against the page it was found on.
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let base_url = Url::parse(base).ok()?;
    base_url.join(href.trim()).ok().map(|u| u.to_string())
}
