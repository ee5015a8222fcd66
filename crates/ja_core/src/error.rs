use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The search provider failed for one query. Skips that query only.
    #[error("Search error: {0}")]
    Search(String),

    /// A single page could not be retrieved. Skips that URL only.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A fetched document could not be read as HTML. Skips that URL only.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Invalid selectors, thresholds or board definitions. Fatal, raised
    /// before any network activity.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Per-item errors are logged and skipped; everything else ends the run.
    pub fn is_item_error(&self) -> bool {
        matches!(self, Error::Search(_) | Error::Fetch(_) | Error::Extraction(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
