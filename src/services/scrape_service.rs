use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::fetcher::StationFetcher;
use crate::models::{RawTable, WeatherRecord};
use crate::parse_error::ParseError;
use crate::scrape_error::{ErrorBody, ScrapeError};
use crate::table_parser::TableParser;
use crate::utils;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StationReport {
    pub station_id: String,
    pub extracted_at: DateTime<Utc>,
    pub record_count: usize,
    pub column_headers: Vec<String>,
    pub records: Vec<WeatherRecord>,
    /// True when served from the in-memory cache
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RawStationTable {
    pub station_id: String,
    pub extracted_at: DateTime<Utc>,
    pub table: RawTable,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MultiStationRequest {
    #[serde(default)]
    pub stations: Vec<String>,
}

/// Result for one station of a multi-station request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StationOutcome {
    pub station_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<StationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MultiStationResponse {
    pub total_stations: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<StationOutcome>,
}

struct CacheEntry {
    stored_at: Instant,
    report: StationReport,
}

/// Fetch + parse orchestration with a short-lived per-station cache.
#[derive(Clone)]
pub struct ScrapeService {
    fetcher: StationFetcher,
    parser: Arc<TableParser>,
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    cache_ttl: Duration,
    concurrency: usize,
}

impl ScrapeService {
    /// A zero `cache_ttl` disables caching
    pub fn new(
        fetcher: StationFetcher,
        parser: TableParser,
        cache_ttl: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            parser: Arc::new(parser),
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl,
            concurrency: concurrency.max(1),
        }
    }

    fn validate<'a>(station_id: &'a str) -> Result<&'a str, ScrapeError> {
        utils::validate_station_code(station_id).map_err(|reason| ScrapeError::InvalidStation {
            station_id: station_id.to_string(),
            reason,
        })
    }

    /// Current table for one station, from cache when still fresh
    #[instrument(skip(self))]
    pub async fn scrape_station(&self, station_id: &str) -> Result<StationReport, ScrapeError> {
        let station_id = Self::validate(station_id)?;

        if let Some(report) = self.cached(station_id).await {
            debug!("Serving station {} from cache", station_id);
            return Ok(report);
        }

        let markup = self.fetcher.fetch_markup(station_id).await?;
        let extracted_at = Utc::now();

        let report = match self.parser.parse(&markup, station_id) {
            Ok(parsed) => StationReport {
                station_id: station_id.to_string(),
                extracted_at,
                record_count: parsed.records.len(),
                column_headers: parsed.column_headers,
                records: parsed.records,
                cached: false,
                message: None,
            },
            Err(ParseError::EmptyResult { column_headers, .. }) => {
                warn!("Station {} returned a table without data rows", station_id);
                StationReport {
                    station_id: station_id.to_string(),
                    extracted_at,
                    record_count: 0,
                    column_headers,
                    records: Vec::new(),
                    cached: false,
                    message: Some("Table found but no observations are available yet".to_string()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "Scraped {} records for station {}",
            report.record_count, station_id
        );
        self.store(station_id, &report).await;

        Ok(report)
    }

    /// Header block and text rows without typing; never cached
    #[instrument(skip(self))]
    pub async fn scrape_raw(&self, station_id: &str) -> Result<RawStationTable, ScrapeError> {
        let station_id = Self::validate(station_id)?;
        let markup = self.fetcher.fetch_markup(station_id).await?;
        let table = self.parser.extract_raw(&markup, station_id)?;

        info!(
            "Extracted raw table for station {}: {} rows",
            station_id,
            table.rows.len()
        );

        Ok(RawStationTable {
            station_id: station_id.to_string(),
            extracted_at: Utc::now(),
            table,
        })
    }

    /// Scrape several stations with bounded concurrency, keeping input order.
    #[instrument(skip(self, station_ids), fields(stations = station_ids.len(), concurrency = self.concurrency))]
    pub async fn scrape_many(&self, station_ids: &[String]) -> MultiStationResponse {
        let results: Vec<StationOutcome> = stream::iter(station_ids.iter().cloned())
            .map(|station_id: String| {
                let service = self.clone();
                async move {
                    match service.scrape_station(&station_id).await {
                        Ok(report) => StationOutcome {
                            station_id,
                            report: Some(report),
                            error: None,
                        },
                        Err(e) => {
                            warn!("Station {} failed: {}", station_id, e);
                            StationOutcome {
                                error: Some(e.to_body()),
                                station_id,
                                report: None,
                            }
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let succeeded = results.iter().filter(|r| r.report.is_some()).count();
        info!(
            "Multi-station scrape finished: {} of {} succeeded",
            succeeded,
            results.len()
        );

        MultiStationResponse {
            total_stations: station_ids.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    pub async fn clear_cache(&self) -> usize {
        let mut cache = self.cache.write().await;
        let cleared = cache.len();
        cache.clear();
        info!("Cleared {} cached station reports", cleared);
        cleared
    }

    pub async fn cached_station_count(&self) -> usize {
        let cache = self.cache.read().await;
        cache
            .values()
            .filter(|entry| entry.stored_at.elapsed() < self.cache_ttl)
            .count()
    }

    async fn cached(&self, station_id: &str) -> Option<StationReport> {
        if self.cache_ttl.is_zero() {
            return None;
        }

        let cache = self.cache.read().await;
        cache
            .get(station_id)
            .filter(|entry| entry.stored_at.elapsed() < self.cache_ttl)
            .map(|entry| StationReport {
                cached: true,
                ..entry.report.clone()
            })
    }

    async fn store(&self, station_id: &str, report: &StationReport) {
        if self.cache_ttl.is_zero() {
            return;
        }

        let mut cache = self.cache.write().await;
        let ttl = self.cache_ttl;
        cache.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        cache.insert(
            station_id.to_string(),
            CacheEntry {
                stored_at: Instant::now(),
                report: report.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape_error::ErrorKind;

    fn service() -> ScrapeService {
        ScrapeService::new(
            StationFetcher::with_base_url("http://127.0.0.1:9/".to_string()),
            TableParser::default(),
            Duration::from_secs(60),
            2,
        )
    }

    #[tokio::test]
    async fn test_invalid_station_rejected_before_fetch() {
        let result = service().scrape_station("nope").await;
        match result {
            Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidStation),
            Ok(_) => panic!("Expected invalid station error"),
        }
    }

    #[tokio::test]
    async fn test_scrape_many_reports_invalid_codes_inline() {
        let stations = vec!["bad".to_string(), "A8".to_string()];
        let response = service().scrape_many(&stations).await;

        assert_eq!(response.total_stations, 2);
        assert_eq!(response.failed, 2);
        assert_eq!(response.results[0].station_id, "bad");
        assert_eq!(
            response.results[1].error.as_ref().unwrap().kind,
            ErrorKind::InvalidStation
        );
    }

    #[tokio::test]
    async fn test_empty_cache() {
        let service = service();
        assert_eq!(service.cached_station_count().await, 0);
        assert_eq!(service.clear_cache().await, 0);
    }
}
