use serde::Serialize;
use utoipa::ToSchema;

use crate::fetch_error::FetchError;
use crate::parse_error::ParseError;

/// Stable, caller-facing classification of a failed request.
///
/// The HTTP layer picks a status code from this; the variant names are part of
/// the JSON error body (`{"kind": "table_not_found", ...}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TableNotFound,
    HeaderMismatch,
    EmptyResult,
    InvalidSelector,
    InvalidStation,
    UpstreamNotFound,
    UpstreamTimeout,
    UpstreamError,
    BadRequest,
    MissingApiKey,
    InvalidApiKey,
}

/// Everything that can fail one scrape invocation
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Invalid station code '{station_id}': {reason}")]
    InvalidStation {
        station_id: String,
        reason: &'static str,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::InvalidStation { .. } => ErrorKind::InvalidStation,
            ScrapeError::Fetch(FetchError::NotFound(_)) => ErrorKind::UpstreamNotFound,
            ScrapeError::Fetch(FetchError::Timeout(_)) => ErrorKind::UpstreamTimeout,
            ScrapeError::Fetch(FetchError::Request(e)) if e.is_timeout() => {
                ErrorKind::UpstreamTimeout
            }
            ScrapeError::Fetch(_) => ErrorKind::UpstreamError,
            ScrapeError::Parse(e) => e.kind(),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// JSON error envelope: `{"kind": "...", "message": "..."}`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}
