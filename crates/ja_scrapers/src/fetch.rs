use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use ja_core::{Error, PageFetcher, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const USER_AGENT: &str = concat!("ja/", env!("CARGO_PKG_VERSION"), " (job board aggregator)");

/// HTTP GET over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    if timeout.is_zero() {
        return Err(Error::Configuration("request timeout must be greater than zero".to_string()));
    }
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, describe(&e))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{}: HTTP {}", url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, describe(&e))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/42")
            .with_status(200)
            .with_body("<html><h1>Rust Engineer</h1></html>")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT).unwrap();
        let body = fetcher.fetch(&format!("{}/jobs/42", server.url())).await.unwrap();
        assert!(body.contains("Rust Engineer"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/gone")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT).unwrap();
        let err = fetcher.fetch(&format!("{}/jobs/gone", server.url())).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_fetch_error() {
        // Bind and drop a listener to get a port nobody is serving.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher
            .fetch(&format!("http://127.0.0.1:{}/jobs/1", port))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = HttpFetcher::new(Duration::ZERO).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
