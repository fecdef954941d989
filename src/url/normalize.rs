use url::Url;

/// Canonical form of a URL used for link deduplication
///
/// Keeps scheme, host, port and path; drops query, fragment and the trailing
/// slash (the root path stays `/`).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use scrape_bench::url::canonical_url;
///
/// let url = Url::parse("https://example.com/about/?ref=nav#team").unwrap();
/// assert_eq!(canonical_url(&url), "https://example.com/about");
/// ```
pub fn canonical_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let authority = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    };
    format!(
        "{}://{}{}",
        url.scheme(),
        authority,
        normalize_path(url.path())
    )
}

/// Collapses empty segments and removes the trailing slash
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}

/// Short page label: `homepage` for the root, otherwise the path (plus query)
pub fn page_name(url: &Url) -> String {
    let path = normalize_path(url.path());
    if path == "/" {
        return "homepage".to_string();
    }
    match url.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path,
    }
}

/// Replaces every character outside `[a-zA-Z0-9._-]` with `_`
///
/// Runs of replaced characters collapse into a single `_`.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut replaced = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
            out.push(c);
            replaced = false;
        } else if !replaced {
            out.push('_');
            replaced = true;
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}
