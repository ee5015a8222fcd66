use async_trait::async_trait;
use crate::Result;

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Runs `query` and returns at most `limit` result URLs in rank order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the raw body of `url`.
    ///
    /// Timeouts, refused connections and non-success statuses are all
    /// reported as `Error::Fetch`.
    async fn fetch(&self, url: &str) -> Result<String>;
}
