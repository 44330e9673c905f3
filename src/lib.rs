pub mod api;
pub mod app;
pub mod config;
pub mod fetch_error;
pub mod fetcher;
pub mod models;
pub mod parse_error;
pub mod scrape_error;
pub mod services;
pub mod table_parser;
pub mod utils;
