use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use ja_core::{Error, JobPosting, Result};

pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// How a posting's date relates to the recency threshold.
///
/// Undated postings are kept on purpose: dropping them silently would hide
/// boards that don't publish dates at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recency {
    Recent,
    Stale,
    Undated,
}

impl Recency {
    pub fn keep(self) -> bool {
        match self {
            Recency::Recent | Recency::Undated => true,
            Recency::Stale => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecencyFilter {
    max_age: Duration,
    today: Option<NaiveDate>,
}

impl RecencyFilter {
    pub fn new(max_age: Duration) -> Result<Self> {
        if max_age < Duration::zero() {
            return Err(Error::Configuration(format!(
                "recency threshold must not be negative, got {}",
                max_age
            )));
        }
        Ok(Self { max_age, today: None })
    }

    pub fn days(days: i64) -> Result<Self> {
        let max_age = Duration::try_days(days).ok_or_else(|| {
            Error::Configuration(format!("recency threshold of {} days is out of range", days))
        })?;
        Self::new(max_age)
    }

    /// Pin the reference date instead of using the current UTC date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Ages are whole days; a posting exactly `max_age` old is still recent.
    pub fn classify(&self, posting: &JobPosting) -> Recency {
        match posting.posted_date {
            None => Recency::Undated,
            Some(date) if self.today() - date <= self.max_age => Recency::Recent,
            Some(_) => Recency::Stale,
        }
    }

    pub fn keep(&self, posting: &JobPosting) -> bool {
        self.classify(posting).keep()
    }
}

impl Default for RecencyFilter {
    fn default() -> Self {
        Self {
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
            today: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn posted(days_ago: i64) -> JobPosting {
        let mut posting = JobPosting::new("https://jobs.lever.co/acme/1");
        posting.posted_date = Some(today() - Duration::days(days_ago));
        posting
    }

    #[test]
    fn test_undated_always_kept() {
        let undated = JobPosting::new("https://jobs.lever.co/acme/1");
        for days in [0, 1, 7, 365] {
            let filter = RecencyFilter::days(days).unwrap().with_today(today());
            assert_eq!(filter.classify(&undated), Recency::Undated);
            assert!(filter.keep(&undated));
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let filter = RecencyFilter::days(7).unwrap().with_today(today());
        assert_eq!(filter.classify(&posted(7)), Recency::Recent);
        assert!(filter.keep(&posted(7)));
        assert_eq!(filter.classify(&posted(8)), Recency::Stale);
        assert!(!filter.keep(&posted(8)));
    }

    #[test]
    fn test_recent_and_future_dates() {
        let filter = RecencyFilter::days(7).unwrap().with_today(today());
        assert!(filter.keep(&posted(0)));
        assert!(filter.keep(&posted(2)));
        assert!(filter.keep(&posted(-3)));
        assert!(!filter.keep(&posted(30)));
    }

    #[test]
    fn test_zero_threshold_keeps_only_today() {
        let filter = RecencyFilter::days(0).unwrap().with_today(today());
        assert!(filter.keep(&posted(0)));
        assert!(!filter.keep(&posted(1)));
    }

    #[test]
    fn test_sub_day_threshold() {
        let filter = RecencyFilter::new(Duration::hours(36)).unwrap().with_today(today());
        assert!(filter.keep(&posted(1)));
        assert!(!filter.keep(&posted(2)));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        assert!(matches!(RecencyFilter::days(-1), Err(Error::Configuration(_))));
    }
}
