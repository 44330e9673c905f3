//! Shared utility functions for the weather station service

use std::sync::LazyLock;

use regex::Regex;

static STATION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][0-9]{3}$").expect("invalid regex: station code"));

/// Validate an INMET automatic station code
///
/// Automatic stations are identified by one upper-case letter followed by
/// three digits ("A871", "B803"). Lower-case input is rejected.
///
/// # Examples
///
/// ```
/// use weather_station_service::utils::validate_station_code;
///
/// assert_eq!(validate_station_code("A871").unwrap(), "A871");
/// assert_eq!(validate_station_code(" A652 ").unwrap(), "A652");
/// assert!(validate_station_code("a871").is_err());
/// assert!(validate_station_code("A87").is_err());
/// ```
pub fn validate_station_code(value: &str) -> Result<&str, &'static str> {
    let code = value.trim();

    if STATION_CODE.is_match(code) {
        Ok(code)
    } else {
        Err("Invalid station code format (expected A999)")
    }
}
