use std::path::Path;
use async_trait::async_trait;
use url::Url;
use ja_core::{Error, Result, SearchClient};
use crate::query::site_of;

/// Offline search: serves a fixed list of URLs, keeping those whose host
/// falls under the query's `site:` domain.
#[derive(Debug, Clone, Default)]
pub struct UrlListSearch {
    urls: Vec<String>,
}

impl UrlListSearch {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    /// One URL per line; blank lines and `#` comments are ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read URL list {}: {}", path.display(), e))
        })?;
        let urls = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Ok(Self::new(urls))
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// True when `url`'s host is `domain` or one of its subdomains.
pub fn host_matches(url: &str, domain: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let domain = domain.trim().trim_start_matches("www.").to_lowercase();
    let host = host.to_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

#[async_trait]
impl SearchClient for UrlListSearch {
    fn name(&self) -> &str {
        "url-list"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let site = site_of(query)
            .ok_or_else(|| Error::Search(format!("query '{}' has no site: filter", query)))?;
        Ok(self.urls
            .iter()
            .filter(|url| host_matches(url, site))
            .take(limit)
            .cloned()
            .collect())
    }
}
