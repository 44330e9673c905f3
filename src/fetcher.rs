use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::fetch_error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://tempo.inmet.gov.br/TabelaEstacoes/";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fetches the station table page over plain HTTP.
///
/// The client is owned by this value and shared by clones; there is no
/// process-wide session.
#[derive(Clone)]
pub struct StationFetcher {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
}

impl StationFetcher {
    pub fn new(
        base_url: String,
        timeout: Duration,
        user_agent: &str,
        max_retries: usize,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url,
            max_retries,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(
            config.station_base_url.clone(),
            Duration::from_secs(config.request_timeout_seconds),
            &config.user_agent,
            config.fetch_max_retries,
        )
    }

    /// Fetcher pointed at another host, without retries (used against mock servers)
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            max_retries: 0,
        }
    }

    pub fn station_url(&self, station_id: &str) -> String {
        format!("{}{}", self.base_url, station_id)
    }

    /// Download the station page, retrying transient failures with backoff.
    #[instrument(skip(self), fields(base_url = %self.base_url, max_retries = self.max_retries))]
    pub async fn fetch_markup(&self, station_id: &str) -> Result<String, FetchError> {
        let url = self.station_url(station_id);

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(self.max_retries)
            .with_jitter();

        (|| self.fetch_once(&url))
            .retry(backoff)
            .when(FetchError::is_transient)
            .notify(|e: &FetchError, delay: Duration| {
                warn!("Fetch of {} failed ({}), retrying in {:?}", url, e, delay);
            })
            .await
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        debug!("Sending HTTP request to {}", url);
        let response = self.client.get(url).send().await.map_err(|e| classify(e, url))?;

        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if status.as_u16() == 404 {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if status.is_server_error() {
            return Err(FetchError::ServerError(format!(
                "Server error {status} while fetching {url}"
            )));
        }

        let response = response.error_for_status()?;
        let html = response.text().await.map_err(|e| classify(e, url))?;
        debug!("Retrieved HTML content, size: {} bytes", html.len());

        Ok(html)
    }
}

fn classify(error: reqwest::Error, url: &str) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Request(error)
    }
}
