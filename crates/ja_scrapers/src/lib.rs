pub mod boards;
pub mod cli;
pub mod dates;
pub mod extract;
pub mod fetch;
pub mod jsonld;
pub mod logging;
pub mod manager;
pub mod query;
pub mod recency;
pub mod search;

pub use boards::{Board, BoardRegistry};
pub use cli::{AggregatorCommands, SearchArgs, handle_command};
pub use extract::JobExtractor;
pub use fetch::HttpFetcher;
pub use manager::{AggregatorConfig, GroupingConfig, JobAggregator, RunOutcome, RunReport, RunStats};
pub use query::{build_query, SearchPlan};
pub use recency::{Recency, RecencyFilter};
pub use search::{DuckDuckGoSearch, UrlListSearch};

pub mod prelude {
    pub use super::boards::{Board, BoardRegistry};
    pub use super::manager::{AggregatorConfig, JobAggregator, RunReport};
    pub use ja_core::{Error, JobPosting, PageFetcher, Result, SearchClient};
}
