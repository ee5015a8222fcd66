use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;
use ja_core::{Error, Result, SearchClient};
use crate::fetch::{build_client, describe};

pub const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

/// Scrapes the DuckDuckGo HTML results page.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("Invalid search URL '{}': {}", base_url, e)))?;
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchClient for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let response = self.client
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| Error::Search(format!("'{}': {}", query, describe(&e))))?;

        let status = response.status();
        // 202 is what the endpoint answers with when it throttles a client
        if !status.is_success() || status == reqwest::StatusCode::ACCEPTED {
            return Err(Error::Search(format!("'{}': provider returned {}", query, status)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::Search(format!("'{}': {}", query, describe(&e))))?;

        Ok(parse_results(&html, limit))
    }
}

/// Result links from a results page, redirect wrappers decoded, duplicates
/// and non-http links dropped.
pub(crate) fn parse_results(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a.result__a") else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    for href in document.select(&selector).filter_map(|el| el.value().attr("href")) {
        if urls.len() >= limit {
            break;
        }
        if let Some(url) = resolve_result_link(href) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

fn resolve_result_link(href: &str) -> Option<String> {
    let base = Url::parse("https://duckduckgo.com").ok()?;
    let link = base.join(href).ok()?;

    let target = if link.path() == "/l/" {
        let (_, target) = link.query_pairs().find(|(key, _)| key == "uddg")?;
        Url::parse(&target).ok()?
    } else {
        link
    };

    match target.scheme() {
        "http" | "https" if target.host_str() != Some("duckduckgo.com") => Some(target.to_string()),
        _ => None,
    }
}
