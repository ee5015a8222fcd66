use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ja_core::{Error, JobPosting, PageFetcher, Result, SearchClient, SimilarityModel};
use ja_inference::resume::load_resume;
use ja_inference::{match_resume, ResumeMatch, DEFAULT_SIMILARITY_THRESHOLD};
use crate::boards::BoardRegistry;
use crate::fetch::HttpFetcher;
use crate::manager::{self, AggregatorConfig, GroupingConfig, JobAggregator, RunOutcome, RunReport};
use crate::query::SearchPlan;
use crate::recency::{Recency, RecencyFilter};
use crate::search::{DuckDuckGoSearch, UrlListSearch};

const DAY: u64 = 86_400;

#[derive(Subcommand, Debug, Clone)]
pub enum AggregatorCommands {
    /// Search job boards for recent postings
    Search(SearchArgs),
    /// List the configured job boards
    Boards {
        /// JSON file with board selector rules (defaults to the built-in boards)
        #[arg(long)]
        boards_file: Option<PathBuf>,
    },
    /// Fetch and extract a single job posting
    Url {
        url: String,
        #[arg(long)]
        boards_file: Option<PathBuf>,
        #[arg(long, default_value = "10s", value_parser = parse_timeout)]
        timeout: Duration,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

impl AggregatorCommands {
    /// Whether running this command needs a similarity model.
    pub fn needs_model(&self) -> bool {
        match self {
            AggregatorCommands::Search(args) => args.group || args.similar_to.is_some(),
            _ => false,
        }
    }

    /// Checks the command's configuration without touching the network.
    pub fn validate(&self) -> Result<()> {
        match self {
            AggregatorCommands::Search(args) => args.config().map(|_| ()),
            AggregatorCommands::Boards { boards_file } => load_registry(boards_file.as_deref()).map(|_| ()),
            AggregatorCommands::Url { .. } => Ok(()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Job titles to search for, one query per title
    pub titles: Vec<String>,
    /// Extra keywords added to every query
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,
    /// Restrict the search to these boards (domain or name); repeatable
    #[arg(short, long = "board")]
    pub boards: Vec<String>,
    #[arg(long)]
    pub boards_file: Option<PathBuf>,
    /// Maximum posting age, e.g. 7d, 36h, 2w (a bare number is days)
    #[arg(long, default_value = "7d", value_parser = parse_max_age)]
    pub max_age: Duration,
    /// Search results requested per query
    #[arg(long, default_value_t = manager::DEFAULT_RESULTS_PER_QUERY)]
    pub results: usize,
    /// Per-request timeout, e.g. 10s (a bare number is seconds)
    #[arg(long, default_value = "10s", value_parser = parse_timeout)]
    pub timeout: Duration,
    /// Pages fetched at once
    #[arg(long, default_value_t = manager::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
    /// Group postings with similar descriptions
    #[arg(long)]
    pub group: bool,
    #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
    pub group_threshold: f32,
    /// Rank every posting by similarity to posting N (1-based)
    #[arg(long, value_name = "N")]
    pub similar_to: Option<usize>,
    /// Plain-text or PDF resume to score postings against
    #[arg(long)]
    pub resume: Option<PathBuf>,
    /// Read candidate URLs from a file instead of querying a search engine
    #[arg(long)]
    pub urls_file: Option<PathBuf>,
    /// Search engine base URL
    #[arg(long)]
    pub search_url: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Write results to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl SearchArgs {
    /// Builds and validates the run configuration. Loads the boards file
    /// but sends no requests.
    pub fn config(&self) -> Result<AggregatorConfig> {
        let registry = load_registry(self.boards_file.as_deref())?;
        let mut config = AggregatorConfig::new(
            registry.select(&self.boards)?,
            SearchPlan::new(self.titles.clone(), self.keywords.clone()),
        );
        config.results_per_query = self.results;
        config.max_concurrency = self.concurrency;
        config.recency = RecencyFilter::new(chrono::Duration::from_std(self.max_age).map_err(|e| {
            Error::Configuration(format!("max age is out of range: {}", e))
        })?)?;
        if self.group || self.similar_to.is_some() {
            let reference = match self.similar_to {
                Some(n) => Some(n.checked_sub(1).ok_or_else(|| {
                    Error::Configuration("--similar-to counts from 1".to_string())
                })?),
                None => None,
            };
            config.grouping = Some(GroupingConfig {
                threshold: self.group_threshold,
                group: self.group,
                reference,
            });
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub async fn handle_command(
    command: AggregatorCommands,
    model: Option<Arc<dyn SimilarityModel>>,
    cancel: CancellationToken,
) -> Result<RunOutcome> {
    match command {
        AggregatorCommands::Search(args) => search(args, model, cancel).await,
        AggregatorCommands::Boards { boards_file } => {
            let registry = load_registry(boards_file.as_deref())?;
            println!("Available boards:");
            for board in registry.boards() {
                println!("  {:<24} {}", board.name, board.domain);
            }
            Ok(RunOutcome::Found)
        }
        AggregatorCommands::Url { url, boards_file, timeout, format } => {
            let registry = load_registry(boards_file.as_deref())?;
            let fetcher = HttpFetcher::new(timeout)?;
            info!("Scraping single URL: {}", url);
            let posting = tokio::select! {
                posting = manager::scrape_url(&fetcher, &registry, &url) => posting?,
                _ = cancel.cancelled() => return Err(Error::Cancelled),
            };
            let output = match format {
                OutputFormat::Text => render_posting(&posting, RecencyFilter::default().classify(&posting)),
                OutputFormat::Json => serde_json::to_string_pretty(&posting)? + "\n",
            };
            write_output(&output, None)?;
            Ok(RunOutcome::Found)
        }
    }
}

async fn search(
    args: SearchArgs,
    model: Option<Arc<dyn SimilarityModel>>,
    cancel: CancellationToken,
) -> Result<RunOutcome> {
    let config = args.config()?;

    let search: Arc<dyn SearchClient> = match &args.urls_file {
        Some(path) => {
            let list = UrlListSearch::from_file(path)?;
            info!("📄 Using {} URLs from {}", list.len(), path.display());
            Arc::new(list)
        }
        None => match &args.search_url {
            Some(base) => Arc::new(DuckDuckGoSearch::with_base_url(base, args.timeout)?),
            None => Arc::new(DuckDuckGoSearch::new(args.timeout)?),
        },
    };
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(args.timeout)?);

    info!(
        "🦗 Searching {} for {}",
        config.boards.iter().map(|b| b.name.as_str()).collect::<Vec<_>>().join(", "),
        describe_plan(&config.plan)
    );

    let mut aggregator = JobAggregator::new(search, fetcher, config)?.with_cancellation(cancel);
    if let Some(model) = model {
        aggregator = aggregator.with_model(model);
    }
    let report = aggregator.run().await?;

    let resume_matches = match &args.resume {
        Some(path) => match load_resume(path) {
            Ok(Some(resume)) => Some(match_resume(&resume, &report.postings)),
            Ok(None) => None,
            Err(e) => {
                warn!("⚠️ Resume matching skipped: {}", e);
                None
            }
        },
        None => None,
    };

    let outcome = report.outcome();
    match outcome {
        RunOutcome::SearchUnavailable => {
            return Err(Error::Search(format!(
                "all {} searches failed; the search provider looks unreachable",
                report.stats.queries
            )));
        }
        RunOutcome::Empty => eprintln!("No matching job postings found."),
        RunOutcome::Found => {}
    }

    let output = match args.format {
        OutputFormat::Text => render_text(&report, resume_matches.as_deref(), &aggregator.config().recency),
        OutputFormat::Json => render_json(&report, resume_matches.as_deref())?,
    };
    write_output(&output, args.output.as_deref())?;

    Ok(outcome)
}

fn load_registry(path: Option<&Path>) -> Result<BoardRegistry> {
    match path {
        Some(path) => BoardRegistry::from_file(path),
        None => BoardRegistry::builtin(),
    }
}

fn describe_plan(plan: &SearchPlan) -> String {
    let mut terms: Vec<&str> = plan.titles.iter().map(String::as_str).collect();
    terms.extend(plan.keywords.iter().map(String::as_str));
    terms.join(", ")
}

fn write_output(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output)?;
            info!("💾 Results written to {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    resume_matches: Option<&'a [ResumeMatch]>,
}

pub fn render_json(report: &RunReport, resume_matches: Option<&[ResumeMatch]>) -> Result<String> {
    let output = SearchOutput { report, resume_matches };
    Ok(serde_json::to_string_pretty(&output)? + "\n")
}

fn heading(posting: &JobPosting) -> String {
    let title = if posting.title.is_empty() { "(untitled)" } else { posting.title.as_str() };
    if posting.company.is_empty() {
        title.to_string()
    } else {
        format!("{} - {}", title, posting.company)
    }
}

fn render_posting(posting: &JobPosting, recency: Recency) -> String {
    let posted = match (posting.posted_date, recency) {
        (Some(date), Recency::Stale) => format!("{} (stale)", date),
        (Some(date), _) => date.to_string(),
        (None, _) => "date unknown".to_string(),
    };
    let mut out = format!("{}\n  {}\n  {} | {}\n", heading(posting), posting.url, posted, posting.board);
    if !posting.description.is_empty() {
        let _ = writeln!(out, "\n{}", posting.description);
    }
    out
}

pub fn render_text(report: &RunReport, resume_matches: Option<&[ResumeMatch]>, recency: &RecencyFilter) -> String {
    let postings = &report.postings;
    let mut out = String::new();

    for (i, posting) in postings.iter().enumerate() {
        let posted = match posting.posted_date {
            Some(date) => date.to_string(),
            None => "date unknown".to_string(),
        };
        let _ = writeln!(out, "{:>3}. {}", i + 1, heading(posting));
        let _ = writeln!(out, "     {} | {} | {}", posting.board, posted, posting.url);
    }

    if let Some(groups) = &report.groups {
        let _ = writeln!(out, "\nSimilar postings:");
        if groups.is_empty() {
            let _ = writeln!(out, "  none");
        }
        for (n, group) in groups.iter().enumerate() {
            let members = group.members.iter().map(|i| format!("#{}", i + 1)).collect::<Vec<_>>().join(", ");
            let best = group.links.iter().map(|l| l.score).fold(0.0_f32, f32::max);
            let _ = writeln!(out, "  Group {}: {} (best match {:.2})", n + 1, members, best);
        }
    }

    if let Some(similar) = &report.similar {
        let _ = writeln!(out, "\nMost similar to #{}:", similar.reference + 1);
        for ranked in &similar.matches {
            if let Some(posting) = postings.get(ranked.index) {
                let _ = writeln!(out, "  #{:<3} {:.2}  {}", ranked.index + 1, ranked.score, heading(posting));
            }
        }
    }

    if let Some(matches) = resume_matches {
        let _ = writeln!(out, "\nResume match:");
        for m in matches {
            if let Some(posting) = postings.get(m.index) {
                let _ = writeln!(out, "  #{:<3} {:>6.2}%  {}", m.index + 1, m.percentage, heading(posting));
            }
        }
    }

    let stats = &report.stats;
    let _ = writeln!(
        out,
        "\n{} postings ({} older than {} dropped, {} undated, {} failed pages)",
        postings.len(),
        stats.stale,
        format_duration(recency.max_age()),
        stats.undated,
        stats.fetch_failures + stats.extraction_failures
    );
    out
}

/// Inverse of `parse_duration` for display: `1d12h`, `7d`, `0s`.
fn format_duration(duration: chrono::Duration) -> String {
    let mut seconds = duration.num_seconds().max(0);
    if seconds == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    for (unit, size) in [('d', DAY as i64), ('h', 3600), ('m', 60), ('s', 1)] {
        if seconds >= size {
            let _ = write!(out, "{}{}", seconds / size, unit);
            seconds %= size;
        }
    }
    out
}

/// Parses `1h30m`-style durations. Units are s, m, h, d and w; a trailing
/// bare number is counted in `bare_unit` seconds.
fn parse_duration(s: &str, bare_unit: u64) -> std::result::Result<Duration, String> {
    let mut total_seconds = 0u64;
    let mut current_number = String::new();
    let mut has_number = false;
    let mut gap = false;

    for c in s.trim().chars() {
        if c.is_whitespace() {
            gap = !current_number.is_empty();
        } else if c.is_ascii_digit() {
            if gap {
                return Err(format!("Missing unit after {} in duration", current_number));
            }
            current_number.push(c);
        } else if let Ok(num) = current_number.parse::<u64>() {
            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => DAY,
                'w' => 7 * DAY,
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total_seconds = num
                .checked_mul(unit)
                .and_then(|secs| total_seconds.checked_add(secs))
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            current_number.clear();
            has_number = true;
            gap = false;
        } else {
            return Err(format!("Invalid character in duration: {}", c));
        }
    }

    if !current_number.is_empty() {
        let num = current_number
            .parse::<u64>()
            .map_err(|_| "Invalid number in duration".to_string())?;
        total_seconds = num
            .checked_mul(bare_unit)
            .and_then(|secs| total_seconds.checked_add(secs))
            .ok_or_else(|| format!("Duration too large: {}", s))?;
        has_number = true;
    }

    if !has_number {
        return Err("Duration must include a number".to_string());
    }

    Ok(Duration::from_secs(total_seconds))
}

/// Recency threshold; `7` means seven days.
pub fn parse_max_age(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s, DAY)
}

pub fn parse_timeout(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s, 1)
}
