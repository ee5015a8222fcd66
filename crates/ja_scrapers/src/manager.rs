use std::collections::HashSet;
use std::sync::Arc;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;
use ja_core::{Error, JobPosting, PageFetcher, Result, SearchClient, SimilarityModel};
use ja_inference::grouping::validate_threshold;
use ja_inference::{RankedPosting, SimilarityGroup, SimilarityGrouper, DEFAULT_SIMILARITY_THRESHOLD};
use crate::boards::{Board, BoardRegistry};
use crate::extract::JobExtractor;
use crate::logging::Logger;
use crate::query::SearchPlan;
use crate::recency::{Recency, RecencyFilter};

pub const DEFAULT_RESULTS_PER_QUERY: usize = 5;
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct GroupingConfig {
    pub threshold: f32,
    /// Cluster all emitted postings
    pub group: bool,
    /// Rank every posting against the one at this index
    pub reference: Option<usize>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            group: true,
            reference: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub boards: Vec<Board>,
    pub plan: SearchPlan,
    pub results_per_query: usize,
    pub recency: RecencyFilter,
    pub max_concurrency: usize,
    pub grouping: Option<GroupingConfig>,
}

impl AggregatorConfig {
    pub fn new(boards: Vec<Board>, plan: SearchPlan) -> Self {
        Self {
            boards,
            plan,
            results_per_query: DEFAULT_RESULTS_PER_QUERY,
            recency: RecencyFilter::default(),
            max_concurrency: DEFAULT_CONCURRENCY,
            grouping: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.boards.is_empty() {
            return Err(Error::Configuration("no job boards selected".to_string()));
        }
        if self.plan.is_empty() {
            return Err(Error::Configuration(
                "nothing to search for: give at least one job title or keyword".to_string(),
            ));
        }
        if self.results_per_query == 0 {
            return Err(Error::Configuration("results per query must be at least 1".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(Error::Configuration("concurrency must be at least 1".to_string()));
        }
        if let Some(grouping) = &self.grouping {
            validate_threshold(grouping.threshold)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub queries: usize,
    pub failed_searches: usize,
    pub urls_found: usize,
    pub duplicate_urls: usize,
    pub fetch_failures: usize,
    pub extraction_failures: usize,
    pub stale: usize,
    pub undated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarTo {
    pub reference: usize,
    pub matches: Vec<RankedPosting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// At least one posting survived the filters
    Found,
    /// Searches worked but nothing matched
    Empty,
    /// Every query failed; likely a provider outage rather than no matches
    SearchUnavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub postings: Vec<JobPosting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<SimilarityGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar: Option<SimilarTo>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn outcome(&self) -> RunOutcome {
        if !self.postings.is_empty() {
            RunOutcome::Found
        } else if self.stats.queries > 0 && self.stats.failed_searches == self.stats.queries {
            RunOutcome::SearchUnavailable
        } else {
            RunOutcome::Empty
        }
    }
}

struct Target {
    url: String,
    board: usize,
}

/// Runs the search → fetch → extract → filter → group pipeline.
pub struct JobAggregator {
    search: Arc<dyn SearchClient>,
    fetcher: Arc<dyn PageFetcher>,
    model: Option<Arc<dyn SimilarityModel>>,
    config: AggregatorConfig,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl JobAggregator {
    pub fn new(
        search: Arc<dyn SearchClient>,
        fetcher: Arc<dyn PageFetcher>,
        config: AggregatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            search,
            fetcher,
            model: None,
            semaphore: Arc::new(Semaphore::new(config.max_concurrency)),
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// The similarity model used for grouping. Required when grouping is
    /// configured.
    pub fn with_model(mut self, model: Arc<dyn SimilarityModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.config.validate()?;
        if self.config.grouping.is_some() && self.model.is_none() {
            return Err(Error::Configuration(
                "similarity grouping requested but no similarity model was provided".to_string(),
            ));
        }

        let mut stats = RunStats::default();
        let targets = self.collect_urls(&mut stats).await?;
        stats.urls_found = targets.len();
        info!("🔗 {} unique job URLs found via {}", targets.len(), self.search.name());

        let pages = self.fetch_all(&targets).await;
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let today = self.config.recency.today();
        let mut postings = Vec::new();
        for (target, page) in targets.iter().zip(pages) {
            let board = &self.config.boards[target.board];
            let logger = Logger::new().with_prefix(format!("[{}]", board.name));

            let html = match page {
                Ok(html) => html,
                Err(e) if !e.is_item_error() => return Err(e),
                Err(e) => {
                    stats.fetch_failures += 1;
                    logger.warn(&format!("⚠️ Skipping {}: {}", target.url, e));
                    continue;
                }
            };

            let posting = match JobExtractor::new(board).with_today(today).extract(&html, &target.url) {
                Ok(posting) if posting.is_emittable() => posting,
                Ok(_) => continue,
                Err(e) => {
                    stats.extraction_failures += 1;
                    logger.warn(&format!("⚠️ Skipping {}: {}", target.url, e));
                    continue;
                }
            };

            match self.config.recency.classify(&posting) {
                Recency::Stale => {
                    stats.stale += 1;
                    logger.debug(&format!("⏭️ Too old: {} ({:?})", posting.url, posting.posted_date));
                    continue;
                }
                Recency::Undated => stats.undated += 1,
                Recency::Recent => {}
            }

            logger.info(&format!("🆕 {} - {}", posting.title, posting.url));
            postings.push(posting);
        }

        let (groups, similar) = self.compare(&postings).await;

        info!(
            "✅ {} postings kept ({} stale, {} fetch failures, {} unreadable pages)",
            postings.len(),
            stats.stale,
            stats.fetch_failures,
            stats.extraction_failures
        );

        Ok(RunReport {
            postings,
            groups,
            similar,
            stats,
        })
    }

    /// Result URLs in board, query, then rank order. Later duplicates of a
    /// URL are dropped.
    async fn collect_urls(&self, stats: &mut RunStats) -> Result<Vec<Target>> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        let mut logger = Logger::new();
        for (index, board) in self.config.boards.iter().enumerate() {
            logger = logger.with_new_prefixes(format!("[{}]", board.name));

            for query in self.config.plan.queries_for(&board.domain) {
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                stats.queries += 1;
                logger.info(&format!("🔍 Searching with query: {}", query));

                let result = tokio::select! {
                    result = self.search.search(&query, self.config.results_per_query) => result,
                    _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                };

                let urls = match result {
                    Ok(urls) => urls,
                    Err(e) => {
                        stats.failed_searches += 1;
                        logger.warn(&format!("⚠️ Search failed, skipping query: {}", e));
                        continue;
                    }
                };

                logger.debug(&format!("{} results", urls.len()));
                for url in urls.into_iter().take(self.config.results_per_query) {
                    let url = url.trim().to_string();
                    if url.is_empty() {
                        continue;
                    }
                    if seen.insert(url.clone()) {
                        let board = self.board_for_url(&url).unwrap_or(index);
                        targets.push(Target { url, board });
                    } else {
                        stats.duplicate_urls += 1;
                    }
                }
            }
        }

        Ok(targets)
    }

    /// Index of the configured board with the most specific domain for
    /// `url`. A search on one board can surface pages hosted by another.
    fn board_for_url(&self, url: &str) -> Option<usize> {
        self.config
            .boards
            .iter()
            .enumerate()
            .filter(|(_, b)| b.can_handle(url))
            .max_by_key(|(_, b)| b.domain.len())
            .map(|(index, _)| index)
    }

    /// Fetches every target with bounded concurrency. Results come back in
    /// target order.
    async fn fetch_all(&self, targets: &[Target]) -> Vec<Result<String>> {
        let fetches = targets.iter().map(|target| {
            let semaphore = self.semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| Error::External(e.into()))?;
                tokio::select! {
                    page = self.fetcher.fetch(&target.url) => page,
                    _ = self.cancel.cancelled() => Err(Error::Cancelled),
                }
            }
        });
        join_all(fetches).await
    }

    async fn compare(&self, postings: &[JobPosting]) -> (Option<Vec<SimilarityGroup>>, Option<SimilarTo>) {
        let (Some(grouping), Some(model)) = (&self.config.grouping, &self.model) else {
            return (None, None);
        };
        let logger = Logger::new().with_prefix(format!("[{}]", model.name()));
        let grouper = match SimilarityGrouper::new(model.as_ref(), grouping.threshold) {
            Ok(grouper) => grouper,
            Err(e) => {
                logger.error(&format!("Similarity grouping disabled: {}", e));
                return (None, None);
            }
        };

        let mut groups = None;
        if grouping.group {
            info!("🧠 Grouping {} postings with {} (threshold {:.2})", postings.len(), model.name(), grouping.threshold);
            match grouper.group(postings).await {
                Ok(found) => groups = Some(found),
                Err(e) => logger.error(&format!("Similarity grouping failed: {}", e)),
            }
        }

        let mut similar = None;
        if let Some(reference) = grouping.reference {
            match postings.get(reference) {
                Some(posting) => match grouper.rank_against(posting, postings).await {
                    Ok(matches) => similar = Some(SimilarTo { reference, matches }),
                    Err(e) => logger.error(&format!("Similarity ranking failed: {}", e)),
                },
                None => logger.warn(&format!(
                    "No posting #{} to compare against ({} postings kept)",
                    reference + 1,
                    postings.len()
                )),
            }
        }

        (groups, similar)
    }
}

/// Fetches one page and extracts it with the board that covers its URL.
pub async fn scrape_url(
    fetcher: &dyn PageFetcher,
    registry: &BoardRegistry,
    url: &str,
) -> Result<JobPosting> {
    let board = registry.board_for_url(url);
    let html = fetcher.fetch(url).await?;
    JobExtractor::new(&board).extract(&html, url)
}
