use super::matcher::is_same_site;
use super::normalize::canonical_url;
use std::collections::HashSet;
use url::Url;

/// Schemes (and the anchor prefix) that never lead to a crawlable page
const SKIPPED_PREFIXES: &[&str] = &["#", "mailto:", "tel:", "javascript:", "data:"];

/// Path segments that mark login and account flows
const AUTH_SEGMENTS: &[&str] = &[
    "login",
    "log-in",
    "signin",
    "sign-in",
    "signup",
    "sign-up",
    "register",
    "auth",
    "authenticate",
    "oauth",
    "sso",
];

/// Extensions of static assets
const STATIC_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".json", ".xml",
    ".pdf", ".zip", ".rar", ".mp4", ".mp3", ".woff", ".woff2", ".ttf", ".eot",
];

/// Pages fetched first when the homepage links to them
const PREFERRED_PATHS: &[&str] = &["pricing", "about"];

/// Links discovered on a homepage, after filtering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredLinks {
    /// Same-site links, first-seen order
    pub internal: Vec<Url>,
    /// Links to other sites, first-seen order
    pub external: Vec<Url>,
}

/// Filters raw `href` values found on the page at `base`
///
/// Raw values are resolved against `base`, stripped of their fragment and
/// deduplicated by [`canonical_url`]. Links pointing back at `base` itself are
/// dropped.
pub fn filter_links<'a, I>(raw_links: I, base: &Url) -> DiscoveredLinks
where
    I: IntoIterator<Item = &'a str>,
{
    let base_host = base.host_str().unwrap_or_default();
    let base_canonical = canonical_url(base);
    let mut seen = HashSet::new();
    let mut links = DiscoveredLinks::default();

    for raw in raw_links {
        let Some(url) = resolve_candidate(raw, base) else {
            continue;
        };

        let canonical = canonical_url(&url);
        if canonical == base_canonical || !seen.insert(canonical) {
            continue;
        }

        let host = url.host_str().unwrap_or_default();
        if is_same_site(host, base_host) {
            links.internal.push(url);
        } else {
            links.external.push(url);
        }
    }

    links
}

/// Resolves one raw link, or `None` if it is not a crawlable page
fn resolve_candidate(raw: &str, base: &Url) -> Option<Url> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return None;
    }

    let lower = cleaned.to_lowercase();
    if SKIPPED_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return None;
    }

    let mut url = base.join(cleaned).ok()?;
    url.set_fragment(None);

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str().filter(|h| !h.is_empty())?;

    let path = url.path().to_lowercase();
    if is_auth_path(&path) || has_static_extension(&path) {
        return None;
    }

    Some(url)
}

fn is_auth_path(path: &str) -> bool {
    path.split('/')
        .any(|segment| AUTH_SEGMENTS.contains(&segment))
}

fn has_static_extension(path: &str) -> bool {
    STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Orders internal links for crawling and applies the page budget
///
/// `/pricing` and `/about` go first when present, then the rest in
/// first-seen order. When `wanted_pages` is non-empty and at least one link
/// matches it, only matching links are kept.
pub fn prioritize_links(internal: &[Url], wanted_pages: &[String], budget: usize) -> Vec<Url> {
    let mut ordered: Vec<Url> = Vec::with_capacity(internal.len());

    for preferred in PREFERRED_PATHS {
        if let Some(url) = internal.iter().find(|u| trimmed_path(u) == *preferred) {
            ordered.push(url.clone());
        }
    }
    for url in internal {
        if !ordered.contains(url) {
            ordered.push(url.clone());
        }
    }

    if !wanted_pages.is_empty() {
        let wanted: HashSet<String> = wanted_pages
            .iter()
            .map(|p| p.trim_matches('/').to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        let matching: Vec<Url> = ordered
            .iter()
            .filter(|u| wanted.contains(&trimmed_path(u)))
            .cloned()
            .collect();
        if !matching.is_empty() {
            ordered = matching;
        }
    }

    ordered.truncate(budget);
    ordered
}

fn trimmed_path(url: &Url) -> String {
    url.path().trim_matches('/').to_lowercase()
}
