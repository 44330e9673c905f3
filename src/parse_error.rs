use crate::scrape_error::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No data table found for station {station_id}")]
    TableNotFound { station_id: String },

    #[error(
        "Header '{label}' spans {expected} columns but only {available} sub-headers remain (station {station_id})"
    )]
    HeaderMismatch {
        station_id: String,
        label: String,
        expected: usize,
        available: usize,
    },

    #[error("Table for station {station_id} has no data rows")]
    EmptyResult {
        station_id: String,
        column_headers: Vec<String>,
    },

    #[error("Invalid table selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::TableNotFound { .. } => ErrorKind::TableNotFound,
            ParseError::HeaderMismatch { .. } => ErrorKind::HeaderMismatch,
            ParseError::EmptyResult { .. } => ErrorKind::EmptyResult,
            ParseError::InvalidSelector { .. } => ErrorKind::InvalidSelector,
        }
    }
}
