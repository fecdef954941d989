//! Domain list loading from CSV

use crate::url::Domain;
use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use std::path::Path;

/// Loads the domains listed in a CSV file
pub fn load_domains(path: &Path) -> ConfigResult<Vec<Domain>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::DomainList(format!("{}: {}", path.display(), e)))?;
    parse_domains(&content)
}

/// Parses a domain CSV
///
/// The first non-blank line is the header. The `domain` column is used when
/// present, then `url`, then the first column. Blank cells, duplicates and
/// unparseable entries are skipped.
pub fn parse_domains(content: &str) -> ConfigResult<Vec<Domain>> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| ConfigError::DomainList("domain list is empty".to_string()))?;
    let columns: Vec<String> = split_row(header)
        .into_iter()
        .map(|c| c.to_lowercase())
        .collect();
    let column = columns
        .iter()
        .position(|c| c == "domain")
        .or_else(|| columns.iter().position(|c| c == "url"))
        .unwrap_or(0);

    let mut seen = HashSet::new();
    let mut domains = Vec::new();
    for (index, line) in lines.enumerate() {
        let row = split_row(line);
        let Some(cell) = row.get(column).filter(|c| !c.is_empty()) else {
            continue;
        };

        match Domain::parse(cell) {
            Ok(domain) => {
                if seen.insert(domain.clone()) {
                    domains.push(domain);
                }
            }
            Err(e) => tracing::warn!("Skipping domain list row {}: '{}': {}", index + 2, cell, e),
        }
    }

    if domains.is_empty() {
        return Err(ConfigError::DomainList(
            "no valid domains found".to_string(),
        ));
    }
    Ok(domains)
}

/// Splits one CSV row, honoring double-quoted cells
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names(domains: &[Domain]) -> Vec<&str> {
        domains.iter().map(|d| d.as_str()).collect()
    }

    #[test]
    fn test_domain_column() {
        let csv = "name,domain\nAcme,acme.com\nGlobex,https://globex.io/\n";
        let domains = parse_domains(csv).unwrap();
        assert_eq!(names(&domains), vec!["acme.com", "globex.io"]);
    }

    #[test]
    fn test_url_column() {
        let csv = "company,url\nAcme,https://www.acme.com/about\n";
        assert_eq!(names(&parse_domains(csv).unwrap()), vec!["www.acme.com"]);
    }

    #[test]
    fn test_first_column_fallback() {
        let csv = "site,notes\nacme.com,first\n\nglobex.io,second\n";
        assert_eq!(
            names(&parse_domains(csv).unwrap()),
            vec!["acme.com", "globex.io"]
        );
    }

    #[test]
    fn test_duplicates_and_blanks_skipped() {
        let csv = "domain\nacme.com\n\nACME.com\n  \nhttps://acme.com/\n";
        assert_eq!(names(&parse_domains(csv).unwrap()), vec!["acme.com"]);
    }

    #[test]
    fn test_quoted_cells() {
        let csv = "name,domain\n\"Acme, Inc.\",acme.com\n";
        assert_eq!(names(&parse_domains(csv).unwrap()), vec!["acme.com"]);
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(parse_domains(""), Err(ConfigError::DomainList(_))));
        assert!(matches!(parse_domains("domain\n\n"), Err(ConfigError::DomainList(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "domain\nexample.com").unwrap();
        let domains = load_domains(file.path()).unwrap();
        assert_eq!(names(&domains), vec!["example.com"]);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_domains(Path::new("/nonexistent/domains.csv")),
            Err(ConfigError::DomainList(_))
        ));
    }
}
