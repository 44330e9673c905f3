use std::env;

use crate::fetcher::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::table_parser::{HeaderPolicy, ParserConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub station_base_url: String,
    pub request_timeout_seconds: u64,
    pub fetch_max_retries: usize,
    pub user_agent: String,
    pub cache_ttl_seconds: u64,
    pub station_concurrency: usize,
    pub api_key: Option<String>,
    pub header_policy: HeaderPolicy,
    pub table_selectors: Option<Vec<String>>,
    pub allowed_origins: Vec<String>,
}

/// Read an optional variable; only non-unicode values are an error
fn optional_var(name: &str) -> Result<Option<String>, env::VarError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            station_base_url: env::var("STATION_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            fetch_max_retries: env::var("FETCH_MAX_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            user_agent: env::var("USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            cache_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
            station_concurrency: env::var("STATION_CONCURRENCY")
                .unwrap_or_else(|_| "2".to_string())
                .parse::<usize>()
                .unwrap_or(2)
                .max(1),
            api_key: optional_var("API_KEY")?,
            header_policy: env::var("HEADER_POLICY")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
            table_selectors: optional_var("TABLE_SELECTORS")?.map(|raw| {
                raw.split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn parser_config(&self) -> ParserConfig {
        let defaults = ParserConfig::default();
        ParserConfig {
            table_selectors: self
                .table_selectors
                .clone()
                .filter(|selectors| !selectors.is_empty())
                .unwrap_or(defaults.table_selectors),
            header_policy: self.header_policy,
            ..defaults
        }
    }
}
