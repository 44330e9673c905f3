use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

/// Instantaneous / maximum / minimum readings for one measured quantity.
///
/// `0.0` doubles as the "no observation" sentinel, so a genuine zero reading
/// and a missing one serialize the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct MeasurementGroup {
    pub current: f64,
    pub max: f64,
    pub min: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct Wind {
    pub speed: f64,
    pub direction: f64,
    /// Only present when the table carries a separate gust column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

/// One table row converted into typed measurements.
///
/// A field is `None` when its column is absent from the table or the row ended
/// before reaching it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct WeatherRecord {
    pub date: Option<String>,
    pub time: Option<String>,
    pub temperature: Option<MeasurementGroup>,
    pub humidity: Option<MeasurementGroup>,
    pub dew_point: Option<MeasurementGroup>,
    pub pressure: Option<MeasurementGroup>,
    pub wind: Option<Wind>,
    pub radiation: Option<f64>,
    pub rainfall: Option<f64>,
    /// Columns with no known meaning, keyed by normalized header label
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl WeatherRecord {
    /// True when the row produced no usable field at all
    pub fn is_degenerate(&self) -> bool {
        self.date.is_none()
            && self.time.is_none()
            && self.temperature.is_none()
            && self.humidity.is_none()
            && self.dew_point.is_none()
            && self.pressure.is_none()
            && self.wind.is_none()
            && self.radiation.is_none()
            && self.rainfall.is_none()
            && self.extra.is_empty()
    }
}

/// A first-row header cell and the number of columns it spans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HeaderCell {
    pub label: String,
    pub span: usize,
}

/// The located table reduced to text: header block plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RawTable {
    pub main_headers: Vec<HeaderCell>,
    pub sub_headers: Vec<String>,
    pub column_headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ParsedTable {
    pub records: Vec<WeatherRecord>,
    pub column_headers: Vec<String>,
}
