pub mod error;
pub mod models;
pub mod search;
pub mod types;

pub use error::{Error, Result};
pub use models::SimilarityModel;
pub use search::{PageFetcher, SearchClient};
pub use types::{cosine_similarity, JobPosting};
