use scraper::{Html, Selector};
use serde_json::Value;

/// The `JobPosting` fields published as schema.org JSON-LD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredPosting {
    pub title: Option<String>,
    pub company: Option<String>,
    pub date_posted: Option<String>,
    pub description: Option<String>,
}

/// Finds the first schema.org `JobPosting` in the document's JSON-LD blocks,
/// looking inside top-level arrays and `@graph` lists.
pub fn extract_job_posting(document: &Html) -> Option<StructuredPosting> {
    let script_selector = Selector::parse("script[type='application/ld+json']").ok()?;

    for script in document.select(&script_selector) {
        let Ok(json) = serde_json::from_str::<Value>(script.text().collect::<String>().trim()) else {
            continue;
        };
        if let Some(posting) = find_job_posting(&json) {
            return Some(read_posting(posting));
        }
    }
    None
}

fn find_job_posting(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_job_posting),
        Value::Object(obj) => {
            if is_job_posting(value) {
                return Some(value);
            }
            obj.get("@graph").and_then(find_job_posting)
        }
        _ => None,
    }
}

fn is_job_posting(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind == "JobPosting",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("JobPosting")),
        _ => false,
    }
}

fn read_posting(posting: &Value) -> StructuredPosting {
    let text = |key: &str| {
        posting
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let company = match posting.get("hiringOrganization") {
        Some(Value::Object(org)) => org.get("name").and_then(Value::as_str).map(str::trim).map(str::to_string),
        Some(Value::String(name)) => Some(name.trim().to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty());

    StructuredPosting {
        title: text("title"),
        company,
        date_posted: text("datePosted"),
        description: text("description").map(|html| strip_markup(&html)),
    }
}

/// Descriptions are usually embedded HTML; keep only the text.
fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(json: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><head><script type="application/ld+json">{}</script></head><body></body></html>"#,
            json
        ))
    }

    #[test]
    fn test_top_level_job_posting() {
        let doc = document(
            r#"{"@context":"https://schema.org","@type":"JobPosting","title":" Rust Engineer ",
                "hiringOrganization":{"@type":"Organization","name":"Acme"},
                "datePosted":"2024-03-05","description":"<p>Build <b>fast</b> things.</p>"}"#,
        );
        let posting = extract_job_posting(&doc).unwrap();
        assert_eq!(posting.title.as_deref(), Some("Rust Engineer"));
        assert_eq!(posting.company.as_deref(), Some("Acme"));
        assert_eq!(posting.date_posted.as_deref(), Some("2024-03-05"));
        assert_eq!(posting.description.as_deref(), Some("Build fast things."));
    }

    #[test]
    fn test_graph_and_arrays() {
        let doc = document(
            r#"{"@graph":[{"@type":"WebPage"},{"@type":["Thing","JobPosting"],"title":"SRE","hiringOrganization":"Initech"}]}"#,
        );
        let posting = extract_job_posting(&doc).unwrap();
        assert_eq!(posting.title.as_deref(), Some("SRE"));
        assert_eq!(posting.company.as_deref(), Some("Initech"));
        assert!(posting.date_posted.is_none());

        let doc = document(r#"[{"@type":"Organization"},{"@type":"JobPosting","title":"Data Engineer"}]"#);
        assert_eq!(extract_job_posting(&doc).unwrap().title.as_deref(), Some("Data Engineer"));
    }

    #[test]
    fn test_no_job_posting() {
        assert!(extract_job_posting(&document(r#"{"@type":"NewsArticle"}"#)).is_none());
        assert!(extract_job_posting(&document("not json")).is_none());
        assert!(extract_job_posting(&Html::parse_document("<p>plain</p>")).is_none());
    }
}
