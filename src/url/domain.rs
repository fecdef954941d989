use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A hostname under benchmark
///
/// Identity is the lowercased host (plus a non-default port, if any) with the
/// scheme, path, query, fragment and trailing slash removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Parses a domain from a bare hostname or a full URL
    ///
    /// # Examples
    ///
    /// ```
    /// use scrape_bench::url::Domain;
    ///
    /// let domain = Domain::parse("https://WWW.Example.com/about/#team").unwrap();
    /// assert_eq!(domain.as_str(), "www.example.com");
    /// assert_eq!(domain.site_key(), "example.com");
    /// ```
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UrlError::MissingDomain);
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(UrlError::MissingDomain)?
            .trim_end_matches('.')
            .to_lowercase();

        let identity = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };

        Ok(Self(identity))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host without port
    pub fn host(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }

    /// Host with a leading `www.` removed, used to match sites and ground truth
    pub fn site_key(&self) -> &str {
        strip_www(self.host())
    }

    /// Root URL of the site under the given scheme
    pub fn base_url(&self, scheme: &str) -> Result<Url, UrlError> {
        Url::parse(&format!("{}://{}/", scheme, self.0)).map_err(|e| UrlError::Parse(e.to_string()))
    }

    /// Filesystem-safe identifier for artifact paths
    pub fn slug(&self) -> String {
        super::slugify(&self.0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Domain {
    type Error = UrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

impl std::str::FromStr for Domain {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Removes a leading `www.` from a lowercase host
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
