//! Site-restricted search queries.

/// Builds `site:<domain>` followed by every non-empty keyword. Keywords with
/// inner whitespace are quoted; quotes inside a keyword are dropped.
pub fn build_query(site: &str, keywords: &[String]) -> String {
    let mut query = format!("site:{}", site.trim());
    for keyword in keywords {
        let keyword = keyword.replace('"', "");
        let keyword = keyword.trim();
        if keyword.is_empty() {
            continue;
        }
        query.push(' ');
        if keyword.chars().any(char::is_whitespace) {
            query.push('"');
            query.push_str(keyword);
            query.push('"');
        } else {
            query.push_str(keyword);
        }
    }
    query
}

/// The domain of the first `site:` operator in `query`.
pub fn site_of(query: &str) -> Option<&str> {
    query
        .split_whitespace()
        .find_map(|token| token.strip_prefix("site:"))
        .filter(|site| !site.is_empty())
}

/// Queries to run against one board.
///
/// Each job title becomes its own query, combined with the shared keywords.
/// Without titles a single keyword query is issued.
#[derive(Debug, Clone, Default)]
pub struct SearchPlan {
    pub titles: Vec<String>,
    pub keywords: Vec<String>,
}

impl SearchPlan {
    pub fn new(titles: Vec<String>, keywords: Vec<String>) -> Self {
        Self { titles, keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.titles.iter().chain(self.keywords.iter()).all(|t| t.trim().is_empty())
    }

    pub fn queries_for(&self, site: &str) -> Vec<String> {
        let titles: Vec<&String> = self.titles.iter().filter(|t| !t.trim().is_empty()).collect();
        if titles.is_empty() {
            return vec![build_query(site, &self.keywords)];
        }

        let mut queries: Vec<String> = Vec::with_capacity(titles.len());
        for title in titles {
            let mut terms = Vec::with_capacity(self.keywords.len() + 1);
            terms.push(title.clone());
            terms.extend(self.keywords.iter().cloned());
            let query = build_query(site, &terms);
            if !queries.contains(&query) {
                queries.push(query);
            }
        }
        queries
    }
}
