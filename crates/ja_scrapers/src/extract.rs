use chrono::{NaiveDate, Utc};
use scraper::{ElementRef, Html, Node};
use ja_core::{Error, JobPosting, Result};
use crate::boards::{Board, CompiledRule, Field};
use crate::dates::parse_posted_date;
use crate::jsonld::{self, StructuredPosting};

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Turns a job page into a [`JobPosting`] using one board's rules.
///
/// Each field is looked up independently: the board's own rules first, then
/// schema.org JSON-LD, then the shared fallback rules. A field nothing
/// matches stays empty (or `None` for the date).
#[derive(Debug, Clone)]
pub struct JobExtractor<'b> {
    board: &'b Board,
    today: NaiveDate,
}

impl<'b> JobExtractor<'b> {
    pub fn new(board: &'b Board) -> Self {
        Self {
            board,
            today: Utc::now().date_naive(),
        }
    }

    /// Reference date for relative dates such as "3 days ago".
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn extract(&self, html: &str, url: &str) -> Result<JobPosting> {
        if !looks_like_html(html) {
            return Err(Error::Extraction(format!("{}: response is not an HTML document", url)));
        }

        let document = Html::parse_document(html);
        let structured = jsonld::extract_job_posting(&document).unwrap_or_default();

        let mut posting = JobPosting::new(url).with_board(self.board.name.clone());
        posting.title = self.text_field(&document, Field::Title, &structured).unwrap_or_default();
        posting.company = self.text_field(&document, Field::Company, &structured).unwrap_or_default();
        posting.description = self.text_field(&document, Field::Description, &structured).unwrap_or_default();
        posting.posted_date = self.posted_date(&document, &structured);

        Ok(posting)
    }

    fn text_field(&self, document: &Html, field: Field, structured: &StructuredPosting) -> Option<String> {
        first_value(document, self.board.rules.get(field))
            .or_else(|| structured_value(structured, field))
            .or_else(|| first_value(document, self.board.fallback.get(field)))
    }

    /// The first candidate that parses as a date wins.
    fn posted_date(&self, document: &Html, structured: &StructuredPosting) -> Option<NaiveDate> {
        let parse = |text: String| parse_posted_date(&text, self.today);

        values(document, self.board.rules.get(Field::PostedDate))
            .find_map(parse)
            .or_else(|| structured.date_posted.clone().and_then(parse))
            .or_else(|| values(document, self.board.fallback.get(Field::PostedDate)).find_map(parse))
    }
}

fn structured_value(structured: &StructuredPosting, field: Field) -> Option<String> {
    match field {
        Field::Title => structured.title.clone(),
        Field::Company => structured.company.clone(),
        Field::PostedDate => structured.date_posted.clone(),
        Field::Description => structured.description.clone(),
    }
}

fn first_value(document: &Html, rules: &[CompiledRule]) -> Option<String> {
    values(document, rules).next()
}

/// Non-empty values produced by `rules`, rule order then document order.
fn values<'a>(document: &'a Html, rules: &'a [CompiledRule]) -> impl Iterator<Item = String> + 'a {
    rules.iter().flat_map(move |rule| {
        document
            .select(&rule.selector)
            .filter_map(move |element| rule_value(element, rule))
    })
}

fn rule_value(element: ElementRef<'_>, rule: &CompiledRule) -> Option<String> {
    let value = match &rule.attribute {
        Some(attribute) => collapse_whitespace(element.value().attr(attribute)?),
        None => element_text(element),
    };
    (!value.is_empty()).then_some(value)
}

/// Visible text of an element with whitespace collapsed; script and style
/// contents are skipped.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut words = Vec::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `html5ever` accepts any input, so reject what clearly isn't a page:
/// blank bodies, binary data and text without a single tag.
pub fn looks_like_html(input: &str) -> bool {
    let trimmed = input.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() || trimmed.contains('\0') {
        return false;
    }
    trimmed
        .as_bytes()
        .windows(2)
        .any(|pair| pair[0] == b'<' && (pair[1].is_ascii_alphabetic() || pair[1] == b'!'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards::BoardRegistry;

    const GREENHOUSE_PAGE: &str = r#"
        <html>
          <head><title>Job Application for Rust Engineer at Acme</title></head>
          <body>
            <h1 class="app-title">Rust Engineer</h1>
            <span class="company-name">  at Acme Corp </span>
            <time datetime="2024-03-05T10:00:00Z">March 5</time>
            <div id="content">
              <p>Build   reliable
                 services.</p>
              <script>trackPageView();</script>
            </div>
          </body>
        </html>
    "#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn board(domain: &str) -> Board {
        BoardRegistry::builtin().unwrap().board_for_url(&format!("https://{}/x", domain))
    }

    #[test]
    fn test_board_rules() {
        let board = board("boards.greenhouse.io");
        let posting = JobExtractor::new(&board)
            .with_today(today())
            .extract(GREENHOUSE_PAGE, "https://boards.greenhouse.io/acme/jobs/1")
            .unwrap();

        assert_eq!(posting.title, "Rust Engineer");
        assert_eq!(posting.company, "at Acme Corp");
        assert_eq!(posting.description, "Build reliable services.");
        assert_eq!(posting.posted_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(posting.url, "https://boards.greenhouse.io/acme/jobs/1");
        assert_eq!(posting.board, "Greenhouse Boards");
    }

    #[test]
    fn test_missing_date_is_absent_not_error() {
        let html = r#"<html><body><h1>Platform Engineer</h1>
            <div class="job-description">Kubernetes all day.</div></body></html>"#;
        let board = board("jobs.lever.co");
        let posting = JobExtractor::new(&board)
            .with_today(today())
            .extract(html, "https://jobs.lever.co/acme/2")
            .unwrap();

        assert_eq!(posting.posted_date, None);
        assert_eq!(posting.title, "Platform Engineer");
        assert_eq!(posting.company, "");
        assert_eq!(posting.description, "Kubernetes all day.");
    }

    #[test]
    fn test_malformed_input_is_extraction_error() {
        let board = board("jobs.lever.co");
        let extractor = JobExtractor::new(&board);
        for input in ["", "   \n", "{\"error\": \"not found\"}", "plain text, no markup", "\0\u{1}\u{2}binary"] {
            let result = extractor.extract(input, "https://jobs.lever.co/acme/3");
            assert!(matches!(result, Err(Error::Extraction(_))), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_fallback_chain() {
        // no div.job-description: description falls through to posting-content
        let html = r#"<html><body><h1>SRE</h1>
            <div class="posting-content">On-call rotation.</div>
            <div class="company-name">Initech</div></body></html>"#;
        let board = board("careers.example.com");
        let posting = JobExtractor::new(&board).extract(html, "https://careers.example.com/1").unwrap();
        assert_eq!(posting.description, "On-call rotation.");
        assert_eq!(posting.company, "Initech");
        assert_eq!(posting.board, "generic");

        // and finally to the whole body
        let html = r#"<html><body><h1>SRE</h1><p>Pager duty.</p></body></html>"#;
        let posting = JobExtractor::new(&board).extract(html, "https://careers.example.com/2").unwrap();
        assert_eq!(posting.description, "SRE Pager duty.");
    }

    #[test]
    fn test_attribute_rules() {
        let html = r#"<html><head><meta property="og:site_name" content=" Globex "></head>
            <body><div class="main-header-logo"><img alt="Globex Corporation"></div>
            <div class="posting-headline"><h2>Data Engineer</h2></div></body></html>"#;

        let lever = board("jobs.lever.co");
        let posting = JobExtractor::new(&lever).extract(html, "https://jobs.lever.co/globex/1").unwrap();
        assert_eq!(posting.company, "Globex Corporation");
        assert_eq!(posting.title, "Data Engineer");

        let generic = board("careers.example.com");
        let posting = JobExtractor::new(&generic).extract(html, "https://careers.example.com/1").unwrap();
        assert_eq!(posting.company, "Globex");
    }

    #[test]
    fn test_json_ld_fills_gaps_before_fallback() {
        let html = r#"<html><head>
            <script type="application/ld+json">
              {"@type":"JobPosting","title":"Staff Engineer","datePosted":"2024-03-08",
               "hiringOrganization":{"name":"Hooli"},"description":"<p>Lead the storage team.</p>"}
            </script></head>
            <body><h1>Careers</h1><p>Apply today</p></body></html>"#;
        let board = board("careers.example.com");
        let posting = JobExtractor::new(&board)
            .with_today(today())
            .extract(html, "https://careers.example.com/9")
            .unwrap();

        assert_eq!(posting.title, "Staff Engineer");
        assert_eq!(posting.company, "Hooli");
        assert_eq!(posting.description, "Lead the storage team.");
        assert_eq!(posting.posted_date, NaiveDate::from_ymd_opt(2024, 3, 8));
    }

    #[test]
    fn test_unparseable_date_falls_through() {
        let html = r#"<html><body><h1>QA</h1>
            <time datetime="sometime">whenever</time>
            <time>2 days ago</time></body></html>"#;
        let board = board("careers.example.com");
        let posting = JobExtractor::new(&board)
            .with_today(today())
            .extract(html, "https://careers.example.com/3")
            .unwrap();
        assert_eq!(posting.posted_date, NaiveDate::from_ymd_opt(2024, 3, 8));

        let html = r#"<html><body><h1>QA</h1><time>someday</time></body></html>"#;
        let posting = JobExtractor::new(&board).extract(html, "https://careers.example.com/4").unwrap();
        assert_eq!(posting.posted_date, None);
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<!DOCTYPE html><html></html>"));
        assert!(looks_like_html("\u{feff}  <div>x</div>"));
        assert!(!looks_like_html("a < b"));
        assert!(!looks_like_html("<<<>>>"));
    }
}
