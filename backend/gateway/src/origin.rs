//! Allowed-origin policy for WebSocket upgrades.

use regex::Regex;

/// Which `Origin` headers may open a connection.
///
/// Parsed from `*` (anything) or a comma-separated list of origins where a
/// `*` stands for any run of characters within the host, for example
/// `https://*.example.com`.
#[derive(Debug, Clone, Default)]
pub enum OriginPolicy {
    #[default]
    Any,
    List(Vec<Regex>),
}

impl OriginPolicy {
    pub fn parse(pattern: &str) -> Result<Self, regex::Error> {
        let entries: Vec<&str> = pattern
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();
        if entries.is_empty() || entries.contains(&"*") {
            return Ok(OriginPolicy::Any);
        }
        let patterns = entries
            .into_iter()
            .map(|entry| {
                let body = entry
                    .trim_end_matches('/')
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join("[^/]*");
                Regex::new(&format!("(?i)^{body}$"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OriginPolicy::List(patterns))
    }

    /// Requests without an `Origin` header are not browser cross-origin
    /// requests and are always allowed.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (OriginPolicy::Any, _) | (_, None) => true,
            (OriginPolicy::List(patterns), Some(origin)) => {
                patterns.iter().any(|p| p.is_match(origin))
            }
        }
    }
}
