use super::domain::strip_www;

/// Checks whether `host` belongs to the site rooted at `base_host`
///
/// Both hosts are compared with a leading `www.` removed. The base host itself
/// and any of its subdomains match.
///
/// # Examples
///
/// ```
/// use scrape_bench::url::is_same_site;
///
/// assert!(is_same_site("www.example.com", "example.com"));
/// assert!(is_same_site("blog.example.com", "www.example.com"));
/// assert!(!is_same_site("example.org", "example.com"));
/// assert!(!is_same_site("notexample.com", "example.com"));
/// ```
pub fn is_same_site(host: &str, base_host: &str) -> bool {
    let host = host.to_lowercase();
    let base = base_host.to_lowercase();
    let host = strip_www(&host);
    let base = strip_www(&base);
    host == base || host.ends_with(&format!(".{}", base))
}
