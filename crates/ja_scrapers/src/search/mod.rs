pub mod duckduckgo;
pub mod url_list;

pub use duckduckgo::DuckDuckGoSearch;
pub use url_list::{host_matches, UrlListSearch};
