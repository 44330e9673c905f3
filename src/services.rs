pub mod scrape_service;

pub use scrape_service::{
    MultiStationRequest, MultiStationResponse, RawStationTable, ScrapeService, StationOutcome,
    StationReport,
};
